use serde::{Deserialize, Serialize};

use crate::users::repo_types::UserId;

/// User as returned to clients. Aggregates and viewer flags are present only
/// on the endpoints that compute them.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Profile picture, base64.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub follows: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_follower: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub followers: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub following: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post_count: Option<i64>,
    pub has_incomplete_media: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub viewer: UserId,
}
