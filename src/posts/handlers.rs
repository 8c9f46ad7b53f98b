use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    composer,
    error::{SocialError, SocialResult},
    images::services::{read_text, read_upload, UploadItem, MAX_IMAGE_BYTES, POST_IMAGE_LIMIT},
    posts::{dto::PostResponse, repo_types::PostId, services::create_post},
    state::AppState,
    users::repo_types::UserId,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/:id", get(get_post))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post_multipart)) // user_id, description, images[]
        .layer(DefaultBodyLimit::max(POST_IMAGE_LIMIT * MAX_IMAGE_BYTES + (1 << 20)))
}

/// POST /posts (multipart)
#[instrument(skip(state, mp))]
pub async fn create_post_multipart(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> SocialResult<impl IntoResponse> {
    let mut user_id: Option<UserId> = None;
    let mut description = String::new();
    let mut images: Vec<UploadItem> = Vec::new();

    while let Some(field) = mp.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("user_id") => {
                let raw = read_text(field).await?;
                let id = raw
                    .trim()
                    .parse::<UserId>()
                    .map_err(|_| SocialError::invalid(format!("user_id `{raw}` is not a number")))?;
                user_id = Some(id);
            }
            Some("description") => description = read_text(field).await?,
            Some("images") | Some("images[]") => {
                images.extend(read_upload(field).await?);
                if images.len() > POST_IMAGE_LIMIT {
                    return Err(SocialError::invalid(format!(
                        "Too many images (max {POST_IMAGE_LIMIT} allowed)"
                    )));
                }
            }
            _ => {}
        }
    }
    let user_id = user_id.ok_or_else(|| SocialError::invalid("user_id is required"))?;

    let dl = state.deadline();
    let post = create_post(&state, dl, user_id, &description, images).await?;
    let body = composer::render_post(state.media.as_ref(), dl, &post).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/posts/{}", body.id))],
        Json(body),
    ))
}

/// Feed: every post, newest first.
#[instrument(skip(state))]
pub async fn list_posts(State(state): State<AppState>) -> SocialResult<Json<Vec<PostResponse>>> {
    Ok(Json(composer::feed(&state, state.deadline()).await?))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> SocialResult<Json<PostResponse>> {
    Ok(Json(composer::post(&state, state.deadline(), id).await?))
}
