use tracing::info;

use crate::deadline::Deadline;
use crate::error::{SocialError, SocialResult};
use crate::graph::statements::{self, Statement};
use crate::graph::{codec, run_one, GraphClient, Query};
use crate::posts::repo_types::PostId;
use crate::users::repo_types::UserId;

/// Edge kinds a user can create and remove on demand. POSTED is owned by posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Follows,
    Liked,
}

impl EdgeKind {
    pub fn label(self) -> &'static str {
        match self {
            EdgeKind::Follows => "FOLLOWS",
            EdgeKind::Liked => "LIKED",
        }
    }

    fn endpoints(self) -> &'static Statement {
        match self {
            EdgeKind::Follows => &statements::ENDPOINTS_USER_USER,
            EdgeKind::Liked => &statements::ENDPOINTS_USER_POST,
        }
    }

    fn merge(self) -> &'static Statement {
        match self {
            EdgeKind::Follows => &statements::FOLLOW_MERGE,
            EdgeKind::Liked => &statements::LIKE_MERGE,
        }
    }

    fn remove(self) -> &'static Statement {
        match self {
            EdgeKind::Follows => &statements::FOLLOW_DELETE,
            EdgeKind::Liked => &statements::LIKE_DELETE,
        }
    }

    fn target_name(self, id: i64) -> String {
        match self {
            EdgeKind::Follows => format!("user {id}"),
            EdgeKind::Liked => format!("post {id}"),
        }
    }
}

async fn check_endpoints(
    graph: &dyn GraphClient,
    dl: Deadline,
    kind: EdgeKind,
    from: UserId,
    to: i64,
) -> SocialResult<()> {
    let row = run_one(
        graph,
        dl,
        Query::new(kind.endpoints())
            .param("from", from)
            .param("to", to),
    )
    .await?
    .ok_or_else(|| SocialError::storage("endpoint check returned no row"))?;

    if !codec::boolean(&row, "fromExists")? {
        return Err(SocialError::not_found(format!("user {from}")));
    }
    if !codec::boolean(&row, "toExists")? {
        return Err(SocialError::not_found(kind.target_name(to)));
    }
    Ok(())
}

/// MERGE the edge. Creating it twice leaves a single edge.
pub async fn link(
    graph: &dyn GraphClient,
    dl: Deadline,
    kind: EdgeKind,
    from: UserId,
    to: i64,
) -> SocialResult<()> {
    check_endpoints(graph, dl, kind, from, to).await?;

    let row = run_one(
        graph,
        dl,
        Query::new(kind.merge()).param("from", from).param("to", to),
    )
    .await?;
    let count = match row {
        Some(r) => codec::int(&r, "count")?,
        None => 0,
    };
    // An endpoint vanished between the check and the merge.
    if count == 0 {
        return Err(SocialError::not_found(kind.target_name(to)));
    }
    info!(edge = kind.label(), from, to, "edge created");
    Ok(())
}

/// Remove the edge; fails with `NoRelationship` when there is none.
pub async fn unlink(
    graph: &dyn GraphClient,
    dl: Deadline,
    kind: EdgeKind,
    from: UserId,
    to: i64,
) -> SocialResult<()> {
    check_endpoints(graph, dl, kind, from, to).await?;

    let row = run_one(
        graph,
        dl,
        Query::new(kind.remove()).param("from", from).param("to", to),
    )
    .await?;
    let removed = match row {
        Some(r) => codec::int(&r, "count")?,
        None => 0,
    };
    if removed == 0 {
        return Err(SocialError::NoRelationship(kind.label()));
    }
    info!(edge = kind.label(), from, to, "edge removed");
    Ok(())
}

pub async fn follow(
    graph: &dyn GraphClient,
    dl: Deadline,
    follower: UserId,
    followed: UserId,
) -> SocialResult<()> {
    link(graph, dl, EdgeKind::Follows, follower, followed).await
}

pub async fn unfollow(
    graph: &dyn GraphClient,
    dl: Deadline,
    follower: UserId,
    followed: UserId,
) -> SocialResult<()> {
    unlink(graph, dl, EdgeKind::Follows, follower, followed).await
}

pub async fn like(
    graph: &dyn GraphClient,
    dl: Deadline,
    user: UserId,
    post: PostId,
) -> SocialResult<()> {
    link(graph, dl, EdgeKind::Liked, user, post).await
}

pub async fn dislike(
    graph: &dyn GraphClient,
    dl: Deadline,
    user: UserId,
    post: PostId,
) -> SocialResult<()> {
    unlink(graph, dl, EdgeKind::Liked, user, post).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryGraph;
    use crate::users::repo_types::{NewUser, User};
    use std::time::Duration;

    fn dl() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    async fn user(graph: &MemoryGraph, email: &str) -> UserId {
        User::create(
            graph,
            dl(),
            &NewUser {
                name: "n",
                email,
                password_hash: "h",
                image_pending: false,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn follow_is_idempotent() {
        let g = MemoryGraph::new();
        let a = user(&g, "a@x.io").await;
        let b = user(&g, "b@x.io").await;

        follow(&g, dl(), a, b).await.unwrap();
        follow(&g, dl(), a, b).await.unwrap();
        assert_eq!(g.edge_count("FOLLOWS", a), 1);

        unfollow(&g, dl(), a, b).await.unwrap();
        assert!(matches!(
            unfollow(&g, dl(), a, b).await,
            Err(SocialError::NoRelationship("FOLLOWS"))
        ));
    }

    #[tokio::test]
    async fn missing_endpoint_is_not_found() {
        let g = MemoryGraph::new();
        let a = user(&g, "a@x.io").await;

        let err = follow(&g, dl(), a, 999).await.unwrap_err();
        assert_eq!(err.to_string(), "user 999 not found");
        let err = like(&g, dl(), a, 999).await.unwrap_err();
        assert_eq!(err.to_string(), "post 999 not found");
        let err = dislike(&g, dl(), 998, 999).await.unwrap_err();
        assert_eq!(err.to_string(), "user 998 not found");
    }
}
