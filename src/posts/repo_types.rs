use time::OffsetDateTime;

use crate::users::repo_types::UserId;

pub type PostId = i64;

/// Post node joined with its author and likers.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub user_name: String,
    pub description: String,
    pub images: Vec<String>, // media store paths in upload order
    pub expected_images: usize,
    pub created_at: OffsetDateTime,
    pub likes: Vec<UserId>,
}

impl Post {
    /// True when fewer images were attached than the upload carried.
    pub fn has_incomplete_media(&self) -> bool {
        self.images.len() < self.expected_images
    }
}

#[derive(Debug, Clone)]
pub struct NewPost<'a> {
    pub user_id: UserId,
    pub description: &'a str,
    pub created_at: OffsetDateTime,
    pub expected_images: usize,
}
