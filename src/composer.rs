//! Turns graph entities into response shapes, reading stored media back as base64.

use tracing::warn;

use crate::deadline::Deadline;
use crate::error::{SocialError, SocialResult};
use crate::images::services::{encode_image, encode_images};
use crate::posts::dto::PostResponse;
use crate::posts::repo_types::{Post, PostId};
use crate::state::AppState;
use crate::storage::MediaStore;
use crate::users::dto::UserResponse;
use crate::users::repo_types::{Profile, User, UserId, UserStats, UserWithStats};

async fn profile_picture(
    media: &dyn MediaStore,
    dl: Deadline,
    user: &User,
) -> SocialResult<Option<String>> {
    let Some(path) = user.image.as_deref() else {
        return Ok(None);
    };
    match encode_image(media, dl, path).await {
        Ok(b64) => Ok(Some(b64)),
        Err(e @ SocialError::DeadlineExceeded(_)) => Err(e),
        Err(e) => {
            warn!(error = %e, user_id = user.id, %path, "profile picture unreadable");
            Ok(None)
        }
    }
}

fn base_user(user: &User, image: Option<String>) -> UserResponse {
    UserResponse {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        image,
        follows: None,
        is_follower: None,
        followers: None,
        following: None,
        post_count: None,
        has_incomplete_media: user.has_incomplete_media(),
    }
}

fn with_stats(mut out: UserResponse, stats: UserStats) -> UserResponse {
    out.followers = Some(stats.followers);
    out.following = Some(stats.following);
    out.post_count = Some(stats.post_count);
    out
}

pub async fn render_user(
    media: &dyn MediaStore,
    dl: Deadline,
    user: &User,
) -> SocialResult<UserResponse> {
    let image = profile_picture(media, dl, user).await?;
    Ok(base_user(user, image))
}

pub async fn render_user_with_stats(
    media: &dyn MediaStore,
    dl: Deadline,
    entry: &UserWithStats,
) -> SocialResult<UserResponse> {
    let out = render_user(media, dl, &entry.user).await?;
    Ok(with_stats(out, entry.stats))
}

pub async fn render_users(
    media: &dyn MediaStore,
    dl: Deadline,
    users: &[User],
) -> SocialResult<Vec<UserResponse>> {
    let mut out = Vec::with_capacity(users.len());
    for u in users {
        out.push(render_user(media, dl, u).await?);
    }
    Ok(out)
}

pub async fn render_profile(
    media: &dyn MediaStore,
    dl: Deadline,
    profile: &Profile,
) -> SocialResult<UserResponse> {
    let mut out = with_stats(render_user(media, dl, &profile.user).await?, profile.stats);
    out.follows = Some(profile.follows);
    out.is_follower = Some(profile.is_follower);
    Ok(out)
}

pub async fn render_post(
    media: &dyn MediaStore,
    dl: Deadline,
    post: &Post,
) -> SocialResult<PostResponse> {
    let images = encode_images(media, dl, &post.images).await?;
    Ok(PostResponse {
        id: post.id,
        user_id: post.user_id,
        user_name: post.user_name.clone(),
        description: post.description.clone(),
        images,
        created_at: post.created_at,
        likes: post.likes.clone(),
        has_incomplete_media: post.has_incomplete_media(),
    })
}

pub async fn render_posts(
    media: &dyn MediaStore,
    dl: Deadline,
    posts: &[Post],
) -> SocialResult<Vec<PostResponse>> {
    let mut out = Vec::with_capacity(posts.len());
    for p in posts {
        out.push(render_post(media, dl, p).await?);
    }
    Ok(out)
}

/// `id` as seen by `viewer`, with counts and both follow flags.
pub async fn profile(
    state: &AppState,
    dl: Deadline,
    id: UserId,
    viewer: UserId,
) -> SocialResult<UserResponse> {
    let profile = User::profile(state.graph.as_ref(), dl, id, viewer).await?;
    render_profile(state.media.as_ref(), dl, &profile).await
}

/// Every post, newest first, with author and likers.
pub async fn feed(state: &AppState, dl: Deadline) -> SocialResult<Vec<PostResponse>> {
    let posts = Post::list(state.graph.as_ref(), dl).await?;
    render_posts(state.media.as_ref(), dl, &posts).await
}

pub async fn user_posts(
    state: &AppState,
    dl: Deadline,
    user_id: UserId,
) -> SocialResult<Vec<PostResponse>> {
    let posts = Post::list_by_user(state.graph.as_ref(), dl, user_id).await?;
    render_posts(state.media.as_ref(), dl, &posts).await
}

pub async fn post(state: &AppState, dl: Deadline, id: PostId) -> SocialResult<PostResponse> {
    let post = Post::find_by_id(state.graph.as_ref(), dl, id).await?;
    render_post(state.media.as_ref(), dl, &post).await
}

pub async fn user(state: &AppState, dl: Deadline, id: UserId) -> SocialResult<UserResponse> {
    let entry = User::find_by_id(state.graph.as_ref(), dl, id).await?;
    render_user_with_stats(state.media.as_ref(), dl, &entry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsMediaStore;
    use std::time::Duration;
    use time::macros::datetime;

    fn sample_user(image: Option<&str>, pending: bool) -> User {
        User {
            id: 1,
            name: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "h".into(),
            image: image.map(str::to_string),
            image_pending: pending,
        }
    }

    #[tokio::test]
    async fn missing_picture_is_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let media = FsMediaStore::new(dir.path()).await.unwrap();
        let dl = Deadline::after(Duration::from_secs(5));

        let gone = sample_user(Some("imgs/user-1/profile-picture/profile-picture.png"), false);
        let out = render_user(&media, dl, &gone).await.unwrap();
        assert_eq!(out.image, None);
        assert!(!out.has_incomplete_media);

        let pending = render_user(&media, dl, &sample_user(None, true)).await.unwrap();
        assert!(pending.has_incomplete_media);

        let json = serde_json::to_value(&pending).unwrap();
        assert!(json.get("image").is_none());
        assert!(json.get("postCount").is_none());
        assert_eq!(json["hasIncompleteMedia"], true);
    }

    #[tokio::test]
    async fn post_shape() {
        let dir = tempfile::tempdir().unwrap();
        let media = FsMediaStore::new(dir.path()).await.unwrap();
        let dl = Deadline::after(Duration::from_secs(5));
        let post = Post {
            id: 9,
            user_id: 1,
            user_name: "alice".into(),
            description: "hello".into(),
            images: vec![],
            expected_images: 2,
            created_at: datetime!(2024-05-01 10:00:00 UTC),
            likes: vec![2],
        };

        let json = serde_json::to_value(render_post(&media, dl, &post).await.unwrap()).unwrap();
        assert_eq!(json["userId"], 1);
        assert_eq!(json["userName"], "alice");
        assert_eq!(json["likes"], serde_json::json!([2]));
        assert_eq!(json["createdAt"], "2024-05-01T10:00:00Z");
        assert_eq!(json["hasIncompleteMedia"], true);
    }
}
