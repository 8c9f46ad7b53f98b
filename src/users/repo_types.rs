use serde::Serialize;

pub type UserId = i64;

/// User node as stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string, never leaves the service
    pub image: Option<String>, // media store path, not bytes
    pub image_pending: bool,   // set at creation when a profile picture is on its way
}

impl User {
    /// True when the profile picture write or attach never completed.
    pub fn has_incomplete_media(&self) -> bool {
        self.image_pending && self.image.is_none()
    }
}

/// Relationship aggregates computed alongside a user fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub followers: i64,
    pub following: i64,
    pub post_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserWithStats {
    pub user: User,
    pub stats: UserStats,
}

/// A user seen by another user.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user: User,
    pub stats: UserStats,
    /// viewer -[:FOLLOWS]-> profile
    pub follows: bool,
    /// profile -[:FOLLOWS]-> viewer
    pub is_follower: bool,
}

/// Fields for a user node that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub image_pending: bool,
}
