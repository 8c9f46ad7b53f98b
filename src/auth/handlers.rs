use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse},
        jwt::{AuthUser, JwtKeys},
        password::verify_password,
    },
    composer,
    error::{SocialError, SocialResult},
    state::AppState,
    users::{dto::UserResponse, repo_types::User, services::normalize_email},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn invalid_credentials() -> SocialError {
    SocialError::Unauthorized("Invalid credentials".into())
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> SocialResult<Json<LoginResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(SocialError::invalid("email and password are required"));
    }

    let dl = state.deadline();
    let Some(entry) = User::find_by_email(state.graph.as_ref(), dl, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(&payload.password, &entry.user.password_hash)? {
        warn!(email = %email, user_id = entry.user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    let access_token = JwtKeys::from_ref(&state).sign_access(entry.user.id)?;
    let user = composer::render_user_with_stats(state.media.as_ref(), dl, &entry).await?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse { access_token, user }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> SocialResult<Json<UserResponse>> {
    let me = composer::user(&state, state.deadline(), user_id)
        .await
        .map_err(|e| match e {
            SocialError::NotFound(_) => SocialError::Unauthorized("User not found".into()),
            other => other,
        })?;
    Ok(Json(me))
}
