use time::OffsetDateTime;
use tracing::{info, warn};

use crate::deadline::Deadline;
use crate::error::{SocialError, SocialResult};
use crate::images::services::{store_post_images, validate_batch, UploadItem, POST_IMAGE_LIMIT};
use crate::posts::repo_types::{NewPost, Post, PostId};
use crate::state::AppState;
use crate::storage::MediaScope;
use crate::users::repo_types::UserId;

/// Creates a post and attaches its images.
///
/// The batch is validated before the node exists, so an oversized upload leaves
/// the graph untouched. Once the node is created a media failure no longer
/// fails the call: the post comes back with fewer images than it expected.
pub async fn create_post(
    state: &AppState,
    dl: Deadline,
    user_id: UserId,
    description: &str,
    images: Vec<UploadItem>,
) -> SocialResult<Post> {
    validate_batch(&images, POST_IMAGE_LIMIT)?;

    let expected_images = images.len();
    let post_id = Post::create(
        state.graph.as_ref(),
        dl,
        &NewPost {
            user_id,
            description,
            created_at: OffsetDateTime::now_utc(),
            expected_images,
        },
    )
    .await?;

    if expected_images > 0 {
        attach_images(state, dl, user_id, post_id, images).await?;
    }

    Post::find_by_id(state.graph.as_ref(), dl, post_id).await
}

async fn attach_images(
    state: &AppState,
    dl: Deadline,
    user_id: UserId,
    post_id: PostId,
    images: Vec<UploadItem>,
) -> SocialResult<()> {
    let paths = match store_post_images(state.media.as_ref(), dl, user_id, post_id, images).await {
        Ok(paths) => paths,
        Err(e @ SocialError::DeadlineExceeded(_)) => return Err(e),
        Err(e) => {
            warn!(error = %e, post_id, "post images not stored; post left without media");
            return Ok(());
        }
    };

    match Post::set_images(state.graph.as_ref(), dl, post_id, &paths).await {
        Ok(()) => Ok(()),
        Err(e @ SocialError::DeadlineExceeded(_)) => Err(e),
        Err(e) => {
            warn!(error = %e, post_id, "post images stored but not attached");
            Ok(())
        }
    }
}

/// Deletes the author's post, then its media directory. Media cleanup is best effort.
pub async fn delete_post(
    state: &AppState,
    dl: Deadline,
    user_id: UserId,
    post_id: PostId,
) -> SocialResult<()> {
    let images = Post::delete(state.graph.as_ref(), dl, user_id, post_id).await?;

    let cleanup = dl.bound(
        "media.remove",
        state.media.remove_scope(user_id, MediaScope::Post(post_id)),
    );
    match cleanup.await {
        Ok(()) => info!(post_id, removed = images.len(), "post media removed"),
        Err(e) => warn!(error = %e, post_id, "post media left on disk"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{memory::MemoryGraph, GraphClient, Query, Record};
    use crate::storage::MediaStore;
    use crate::users::repo_types::{NewUser, User};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;

    async fn alice(state: &AppState) -> UserId {
        User::create(
            state.graph.as_ref(),
            state.deadline(),
            &NewUser {
                name: "alice",
                email: "alice@example.com",
                password_hash: "h",
                image_pending: false,
            },
        )
        .await
        .unwrap()
    }

    fn jpegs(n: usize) -> Vec<UploadItem> {
        (0..n)
            .map(|i| UploadItem::new(Bytes::from(vec![i as u8; 8])))
            .collect()
    }

    #[tokio::test]
    async fn creates_post_with_images_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(dir.path()).await.unwrap();
        let uid = alice(&state).await;

        let post = create_post(&state, state.deadline(), uid, "hi", jpegs(2))
            .await
            .unwrap();
        assert_eq!(post.user_name, "alice");
        assert_eq!(
            post.images,
            vec![
                format!("imgs/user-{uid}/post{}/0.jpg", post.id),
                format!("imgs/user-{uid}/post{}/1.jpg", post.id),
            ]
        );
        assert!(!post.has_incomplete_media());
    }

    #[tokio::test]
    async fn rejected_batch_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(dir.path()).await.unwrap();
        let uid = alice(&state).await;

        let err = create_post(&state, state.deadline(), uid, "too many", jpegs(21))
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::InvalidInput(_)));
        assert!(Post::list(state.graph.as_ref(), state.deadline())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_removes_media_dir() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(dir.path()).await.unwrap();
        let uid = alice(&state).await;
        let post = create_post(&state, state.deadline(), uid, "bye", jpegs(1))
            .await
            .unwrap();
        let post_dir = dir.path().join(format!("imgs/user-{uid}/post{}", post.id));
        assert!(post_dir.exists());

        delete_post(&state, state.deadline(), uid, post.id).await.unwrap();
        assert!(!post_dir.exists());
        assert!(matches!(
            Post::find_by_id(state.graph.as_ref(), state.deadline(), post.id).await,
            Err(SocialError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_the_author_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(dir.path()).await.unwrap();
        let uid = alice(&state).await;
        let post = create_post(&state, state.deadline(), uid, "mine", vec![])
            .await
            .unwrap();

        let err = delete_post(&state, state.deadline(), uid + 100, post.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::NotFound(_)));
    }

    struct FailingMedia;

    #[async_trait]
    impl MediaStore for FailingMedia {
        async fn write(&self, path: &str, _body: Bytes) -> SocialResult<()> {
            Err(SocialError::storage(format!("disk full writing {path}")))
        }
        async fn read(&self, path: &str) -> SocialResult<Bytes> {
            Err(SocialError::not_found(path.to_string()))
        }
        async fn remove_scope(&self, _owner: UserId, _scope: MediaScope) -> SocialResult<()> {
            Ok(())
        }
    }

    struct SlowMedia;

    #[async_trait]
    impl MediaStore for SlowMedia {
        async fn write(&self, _path: &str, _body: Bytes) -> SocialResult<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
        async fn read(&self, path: &str) -> SocialResult<Bytes> {
            Err(SocialError::not_found(path.to_string()))
        }
        async fn remove_scope(&self, _owner: UserId, _scope: MediaScope) -> SocialResult<()> {
            Ok(())
        }
    }

    /// Memory graph that refuses to attach image paths to posts.
    struct NoAttachGraph(MemoryGraph);

    #[async_trait]
    impl GraphClient for NoAttachGraph {
        async fn execute(&self, query: Query) -> SocialResult<Vec<Record>> {
            if query.statement().name == "post.set_images" {
                return Err(SocialError::storage("connection reset"));
            }
            self.0.execute(query).await
        }
    }

    async fn state_with(
        graph: Option<Arc<dyn GraphClient>>,
        media: Option<Arc<dyn MediaStore>>,
    ) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let base = AppState::in_memory(dir.path()).await.unwrap();
        let state = AppState::from_parts(
            graph.unwrap_or(base.graph),
            media.unwrap_or(base.media),
            base.config,
        );
        (dir, state)
    }

    #[tokio::test]
    async fn failed_image_write_degrades() {
        let media: Arc<dyn MediaStore> = Arc::new(FailingMedia);
        let (_dir, state) = state_with(None, Some(media)).await;
        let uid = alice(&state).await;

        let post = create_post(&state, state.deadline(), uid, "hi", jpegs(2))
            .await
            .unwrap();
        assert!(post.images.is_empty());
        assert_eq!(post.expected_images, 2);
        assert!(post.has_incomplete_media());
    }

    #[tokio::test]
    async fn failed_attach_degrades() {
        let graph: Arc<dyn GraphClient> = Arc::new(NoAttachGraph(MemoryGraph::new()));
        let (dir, state) = state_with(Some(graph), None).await;
        let uid = alice(&state).await;

        let post = create_post(&state, state.deadline(), uid, "hi", jpegs(1))
            .await
            .unwrap();
        assert!(post.images.is_empty());
        assert!(post.has_incomplete_media());
        // the file was written but nothing references it
        assert!(dir
            .path()
            .join(format!("imgs/user-{uid}/post{}/0.jpg", post.id))
            .exists());
    }

    #[tokio::test]
    async fn deadline_during_image_write_is_an_error() {
        let media: Arc<dyn MediaStore> = Arc::new(SlowMedia);
        let (_dir, state) = state_with(None, Some(media)).await;
        let uid = alice(&state).await;

        let dl = Deadline::after(Duration::from_millis(50));
        let err = create_post(&state, dl, uid, "slow", jpegs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::DeadlineExceeded("media.write")));
    }

    #[tokio::test]
    async fn delete_drops_every_edge_of_the_post() {
        let graph = Arc::new(MemoryGraph::new());
        let shared: Arc<dyn GraphClient> = graph.clone();
        let (_dir, state) = state_with(Some(shared), None).await;
        let uid = alice(&state).await;
        let post = create_post(&state, state.deadline(), uid, "popular", vec![])
            .await
            .unwrap();

        for i in 0..3 {
            let fan = User::create(
                graph.as_ref(),
                state.deadline(),
                &NewUser {
                    name: "fan",
                    email: &format!("fan{i}@example.com"),
                    password_hash: "h",
                    image_pending: false,
                },
            )
            .await
            .unwrap();
            crate::relations::repo::like(graph.as_ref(), state.deadline(), fan, post.id)
                .await
                .unwrap();
        }
        assert_eq!(graph.edge_count("LIKED", post.id), 3);
        assert_eq!(graph.edge_count("POSTED", post.id), 1);

        delete_post(&state, state.deadline(), uid, post.id).await.unwrap();
        assert_eq!(graph.edge_count("LIKED", post.id), 0);
        assert_eq!(graph.edge_count("POSTED", post.id), 0);
    }
}
