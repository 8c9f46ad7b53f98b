use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{SocialError, SocialResult};

/// Point in time after which a graph or filesystem call is abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    #[cfg(test)]
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    #[cfg(test)]
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Runs `fut` until it finishes or the deadline passes. Never retries.
    pub async fn bound<T, F>(self, what: &'static str, fut: F) -> SocialResult<T>
    where
        F: Future<Output = SocialResult<T>>,
    {
        match tokio::time::timeout_at(self.0, fut).await {
            Ok(res) => res,
            Err(_) => {
                tracing::warn!(operation = what, "deadline exceeded");
                Err(SocialError::DeadlineExceeded(what))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finishes_within_budget() {
        let dl = Deadline::after(Duration::from_secs(5));
        let v = dl.bound("noop", async { Ok::<_, SocialError>(7) }).await.unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn aborts_after_budget() {
        let dl = Deadline::after(Duration::from_millis(10));
        let err = dl
            .bound("sleep", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, SocialError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::DeadlineExceeded("sleep")));
    }

    #[tokio::test]
    async fn passed_deadline_has_no_budget_left() {
        let dl = Deadline::at(Instant::now() - Duration::from_secs(1));
        assert_eq!(dl.remaining(), Duration::ZERO);
    }
}
