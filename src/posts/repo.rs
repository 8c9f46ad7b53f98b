use tracing::{debug, info};

use crate::deadline::Deadline;
use crate::error::{SocialError, SocialResult};
use crate::graph::codec::{self, FromRecord};
use crate::graph::{run, run_one, statements, GraphClient, Query};
use crate::posts::repo_types::{NewPost, Post, PostId};
use crate::users::repo_types::{User, UserId};

impl Post {
    /// Creates the post node and its POSTED edge in one statement. Images are
    /// attached afterwards with [`Post::set_images`].
    pub async fn create(
        graph: &dyn GraphClient,
        dl: Deadline,
        new: &NewPost<'_>,
    ) -> SocialResult<PostId> {
        let row = run_one(graph, dl, codec::encode_new_post(new)?)
            .await?
            .ok_or_else(|| SocialError::not_found(format!("user {}", new.user_id)))?;
        let id = codec::int(&row, "id")?;
        info!(post_id = id, user_id = new.user_id, "post created");
        Ok(id)
    }

    pub async fn set_images(
        graph: &dyn GraphClient,
        dl: Deadline,
        id: PostId,
        images: &[String],
    ) -> SocialResult<()> {
        run_one(
            graph,
            dl,
            Query::new(&statements::POST_SET_IMAGES)
                .param("id", id)
                .param("images", images.to_vec()),
        )
        .await?
        .ok_or_else(|| SocialError::not_found(format!("post {id}")))?;
        debug!(post_id = id, count = images.len(), "post images attached");
        Ok(())
    }

    pub async fn find_by_id(graph: &dyn GraphClient, dl: Deadline, id: PostId) -> SocialResult<Post> {
        let row = run_one(graph, dl, Query::new(&statements::POST_BY_ID).param("id", id))
            .await?
            .ok_or_else(|| SocialError::not_found(format!("post {id}")))?;
        Post::from_record(&row)
    }

    /// Every post, newest first.
    pub async fn list(graph: &dyn GraphClient, dl: Deadline) -> SocialResult<Vec<Post>> {
        let rows = run(graph, dl, Query::new(&statements::POST_LIST)).await?;
        codec::decode_all(&rows)
    }

    pub async fn list_by_user(
        graph: &dyn GraphClient,
        dl: Deadline,
        user_id: UserId,
    ) -> SocialResult<Vec<Post>> {
        if !User::exists(graph, dl, user_id).await? {
            return Err(SocialError::not_found(format!("user {user_id}")));
        }
        let rows = run(
            graph,
            dl,
            Query::new(&statements::POST_LIST_BY_USER).param("userId", user_id),
        )
        .await?;
        codec::decode_all(&rows)
    }

    /// Removes a post owned by `user_id` with all its edges and returns the
    /// media paths it referenced.
    pub async fn delete(
        graph: &dyn GraphClient,
        dl: Deadline,
        user_id: UserId,
        post_id: PostId,
    ) -> SocialResult<Vec<String>> {
        let row = run_one(
            graph,
            dl,
            Query::new(&statements::POST_DELETE)
                .param("userId", user_id)
                .param("postId", post_id),
        )
        .await?
        .ok_or_else(|| SocialError::not_found(format!("post {post_id} of user {user_id}")))?;
        let images = codec::string_list(&row, "images")?;
        info!(post_id, user_id, "post deleted");
        Ok(images)
    }
}
