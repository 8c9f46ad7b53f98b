use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    composer,
    error::{SocialError, SocialResult},
    images::services::{read_text, read_upload, UploadItem, MAX_IMAGE_BYTES, PROFILE_IMAGE_LIMIT},
    posts::{dto::PostResponse, repo_types::PostId, services::delete_post},
    state::AppState,
    users::{
        dto::{ProfileQuery, UpdateUserRequest, UserResponse},
        repo_types::{User, UserId},
        services::{self, normalize_email},
    },
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).put(update_user))
        .route("/users/:id", get(get_user).delete(delete_user))
        .route("/users/email/:email", get(get_user_by_email))
        .route("/users/:id/profile", get(get_profile))
        .route("/users/:id/followers", get(list_followers))
        .route("/users/:id/following", get(list_following))
        .route("/users/:id/posts", get(list_user_posts))
        .route("/users/:id/posts/:post_id", delete(delete_user_post))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user_multipart)) // name, email, password, image?
        .layer(DefaultBodyLimit::max(PROFILE_IMAGE_LIMIT * MAX_IMAGE_BYTES + (1 << 20)))
}

/// POST /users (multipart)
#[instrument(skip(state, mp))]
pub async fn create_user_multipart(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> SocialResult<impl IntoResponse> {
    let (mut name, mut email, mut password) = (String::new(), String::new(), String::new());
    let mut images: Vec<UploadItem> = Vec::new();

    while let Some(field) = mp.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => name = read_text(field).await?,
            Some("email") => email = read_text(field).await?,
            Some("password") => password = read_text(field).await?,
            Some("image") => images.extend(read_upload(field).await?),
            _ => {}
        }
    }
    if images.len() > PROFILE_IMAGE_LIMIT {
        return Err(SocialError::invalid(format!(
            "Too many images ({} given, max {PROFILE_IMAGE_LIMIT} allowed)",
            images.len()
        )));
    }

    let dl = state.deadline();
    let created =
        services::create_user(&state, dl, &name, &email, &password, images.pop()).await?;
    let body = composer::render_user_with_stats(state.media.as_ref(), dl, &created).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/users/{}", body.id))],
        Json(body),
    ))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> SocialResult<Json<Vec<UserResponse>>> {
    let dl = state.deadline();
    let users = User::list(state.graph.as_ref(), dl).await?;
    let mut out = Vec::with_capacity(users.len());
    for u in &users {
        out.push(composer::render_user_with_stats(state.media.as_ref(), dl, u).await?);
    }
    Ok(Json(out))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Json(body): Json<UpdateUserRequest>,
) -> SocialResult<Json<UserResponse>> {
    let dl = state.deadline();
    let user = services::update_user(&state, dl, body.id, &body.name, &body.email).await?;
    Ok(Json(composer::render_user(state.media.as_ref(), dl, &user).await?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> SocialResult<Json<UserResponse>> {
    Ok(Json(composer::user(&state, state.deadline(), id).await?))
}

#[instrument(skip(state))]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> SocialResult<Json<UserResponse>> {
    let dl = state.deadline();
    let entry = User::get_by_email(state.graph.as_ref(), dl, &normalize_email(&email)).await?;
    Ok(Json(
        composer::render_user_with_stats(state.media.as_ref(), dl, &entry).await?,
    ))
}

/// GET /users/:id/profile?viewer=<id>
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Query(q): Query<ProfileQuery>,
) -> SocialResult<Json<UserResponse>> {
    Ok(Json(
        composer::profile(&state, state.deadline(), id, q.viewer).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> SocialResult<StatusCode> {
    User::delete(state.graph.as_ref(), state.deadline(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_followers(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> SocialResult<Json<Vec<UserResponse>>> {
    let dl = state.deadline();
    let users = User::followers(state.graph.as_ref(), dl, id).await?;
    Ok(Json(composer::render_users(state.media.as_ref(), dl, &users).await?))
}

#[instrument(skip(state))]
pub async fn list_following(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> SocialResult<Json<Vec<UserResponse>>> {
    let dl = state.deadline();
    let users = User::following(state.graph.as_ref(), dl, id).await?;
    Ok(Json(composer::render_users(state.media.as_ref(), dl, &users).await?))
}

#[instrument(skip(state))]
pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> SocialResult<Json<Vec<PostResponse>>> {
    Ok(Json(composer::user_posts(&state, state.deadline(), id).await?))
}

#[instrument(skip(state))]
pub async fn delete_user_post(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(UserId, PostId)>,
) -> SocialResult<StatusCode> {
    delete_post(&state, state.deadline(), id, post_id).await?;
    info!(user_id = id, post_id, "post removed by author");
    Ok(StatusCode::NO_CONTENT)
}
