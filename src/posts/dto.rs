use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::posts::repo_types::PostId;
use crate::users::repo_types::UserId;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: PostId,
    pub user_id: UserId,
    pub user_name: String,
    pub description: String,
    /// base64, upload order
    pub images: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub likes: Vec<UserId>,
    pub has_incomplete_media: bool,
}
