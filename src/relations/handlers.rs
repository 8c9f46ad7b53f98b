use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use tracing::instrument;

use crate::{
    error::SocialResult,
    posts::repo_types::PostId,
    relations::repo,
    state::AppState,
    users::repo_types::UserId,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/:id/follow/:other", post(follow).delete(unfollow))
        .route("/users/:id/like/:post_id", post(like).delete(dislike))
}

#[instrument(skip(state))]
pub async fn follow(
    State(state): State<AppState>,
    Path((id, other)): Path<(UserId, UserId)>,
) -> SocialResult<StatusCode> {
    repo::follow(state.graph.as_ref(), state.deadline(), id, other).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn unfollow(
    State(state): State<AppState>,
    Path((id, other)): Path<(UserId, UserId)>,
) -> SocialResult<StatusCode> {
    repo::unfollow(state.graph.as_ref(), state.deadline(), id, other).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn like(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(UserId, PostId)>,
) -> SocialResult<StatusCode> {
    repo::like(state.graph.as_ref(), state.deadline(), id, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn dislike(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(UserId, PostId)>,
) -> SocialResult<StatusCode> {
    repo::dislike(state.graph.as_ref(), state.deadline(), id, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
