//! Record ⇄ entity conversion. Every type assertion on a graph value happens
//! here; anything unexpected becomes `SocialError::EncodingFailure`.

use std::collections::BTreeMap;

use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, PrimitiveDateTime};

use super::{statements, GraphValue, NodeValue, Query, Record};
use crate::error::{SocialError, SocialResult};
use crate::posts::repo_types::{NewPost, Post};
use crate::users::repo_types::{NewUser, Profile, User, UserStats, UserWithStats};

/// Persisted form of `Post.created_at`.
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> SocialResult<Self>;
}

pub fn decode_all<T: FromRecord>(rows: &[Record]) -> SocialResult<Vec<T>> {
    rows.iter().map(T::from_record).collect()
}

// ---- column accessors ----

fn column<'r>(r: &'r Record, col: &str) -> SocialResult<&'r GraphValue> {
    r.get(col)
        .ok_or_else(|| SocialError::encoding(format!("missing column `{col}`")))
}

fn mismatch(what: &str, expected: &str, got: &GraphValue) -> SocialError {
    SocialError::encoding(format!("`{what}`: expected {expected}, got {}", got.kind()))
}

pub fn int(r: &Record, col: &str) -> SocialResult<i64> {
    match column(r, col)? {
        GraphValue::Int(v) => Ok(*v),
        other => Err(mismatch(col, "int", other)),
    }
}

pub fn boolean(r: &Record, col: &str) -> SocialResult<bool> {
    match column(r, col)? {
        GraphValue::Bool(v) => Ok(*v),
        other => Err(mismatch(col, "bool", other)),
    }
}

pub fn string(r: &Record, col: &str) -> SocialResult<String> {
    match column(r, col)? {
        GraphValue::String(v) => Ok(v.clone()),
        other => Err(mismatch(col, "string", other)),
    }
}

pub fn int_list(r: &Record, col: &str) -> SocialResult<Vec<i64>> {
    match column(r, col)? {
        GraphValue::List(items) => items
            .iter()
            .map(|v| match v {
                GraphValue::Int(i) => Ok(*i),
                other => Err(mismatch(col, "list of int", other)),
            })
            .collect(),
        GraphValue::Null => Ok(Vec::new()),
        other => Err(mismatch(col, "list", other)),
    }
}

pub fn string_list(r: &Record, col: &str) -> SocialResult<Vec<String>> {
    list_of_strings(col, column(r, col)?)
}

pub fn props<'r>(r: &'r Record, col: &str) -> SocialResult<Props<'r>> {
    match column(r, col)? {
        GraphValue::Map(map) => Ok(Props { map }),
        GraphValue::Node(node) => Ok(Props { map: &node.props }),
        other => Err(mismatch(col, "map", other)),
    }
}

pub fn opt_node<'r>(r: &'r Record, col: &str) -> SocialResult<Option<&'r NodeValue>> {
    match column(r, col)? {
        GraphValue::Node(node) => Ok(Some(node)),
        GraphValue::Null => Ok(None),
        other => Err(mismatch(col, "node", other)),
    }
}

fn list_of_strings(what: &str, value: &GraphValue) -> SocialResult<Vec<String>> {
    match value {
        GraphValue::List(items) => items
            .iter()
            .map(|v| match v {
                GraphValue::String(s) => Ok(s.clone()),
                other => Err(mismatch(what, "list of string", other)),
            })
            .collect(),
        GraphValue::Null => Ok(Vec::new()),
        other => Err(mismatch(what, "list", other)),
    }
}

/// Node property map view.
#[derive(Debug, Clone, Copy)]
pub struct Props<'a> {
    map: &'a BTreeMap<String, GraphValue>,
}

impl<'a> Props<'a> {
    pub fn string(&self, key: &str) -> SocialResult<String> {
        match self.map.get(key) {
            Some(GraphValue::String(s)) => Ok(s.clone()),
            Some(other) => Err(mismatch(key, "string", other)),
            None => Err(SocialError::encoding(format!("missing property `{key}`"))),
        }
    }

    pub fn opt_string(&self, key: &str) -> SocialResult<Option<String>> {
        match self.map.get(key) {
            Some(GraphValue::String(s)) => Ok(Some(s.clone())),
            Some(GraphValue::Null) | None => Ok(None),
            Some(other) => Err(mismatch(key, "string", other)),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> SocialResult<bool> {
        match self.map.get(key) {
            Some(GraphValue::Bool(b)) => Ok(*b),
            Some(GraphValue::Null) | None => Ok(default),
            Some(other) => Err(mismatch(key, "bool", other)),
        }
    }

    pub fn int_or(&self, key: &str, default: i64) -> SocialResult<i64> {
        match self.map.get(key) {
            Some(GraphValue::Int(i)) => Ok(*i),
            Some(GraphValue::Null) | None => Ok(default),
            Some(other) => Err(mismatch(key, "int", other)),
        }
    }

    pub fn string_list(&self, key: &str) -> SocialResult<Vec<String>> {
        match self.map.get(key) {
            Some(v) => list_of_strings(key, v),
            None => Ok(Vec::new()),
        }
    }
}

// ---- timestamps ----

pub fn format_timestamp(at: OffsetDateTime) -> SocialResult<String> {
    at.to_offset(time::UtcOffset::UTC)
        .format(TIMESTAMP_FORMAT)
        .map_err(|e| SocialError::encoding(format!("created_at: {e}")))
}

pub fn parse_timestamp(raw: &str) -> SocialResult<OffsetDateTime> {
    PrimitiveDateTime::parse(raw, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| SocialError::encoding(format!("created_at `{raw}`: {e}")))
}

// ---- entities ----

pub fn user_from_props(id: i64, p: Props<'_>) -> SocialResult<User> {
    Ok(User {
        id,
        name: p.string("name")?,
        email: p.string("email")?,
        password_hash: p.string("password")?,
        image: p.opt_string("image")?,
        image_pending: p.bool_or("image_pending", false)?,
    })
}

pub fn user_from_node(node: &NodeValue) -> SocialResult<User> {
    user_from_props(node.id, Props { map: &node.props })
}

fn user_stats(r: &Record) -> SocialResult<UserStats> {
    Ok(UserStats {
        followers: int(r, "followers")?,
        following: int(r, "following")?,
        post_count: int(r, "postCount")?,
    })
}

impl FromRecord for User {
    fn from_record(r: &Record) -> SocialResult<Self> {
        user_from_props(int(r, "id")?, props(r, "props")?)
    }
}

impl FromRecord for UserWithStats {
    fn from_record(r: &Record) -> SocialResult<Self> {
        Ok(UserWithStats {
            user: User::from_record(r)?,
            stats: user_stats(r)?,
        })
    }
}

impl FromRecord for Profile {
    fn from_record(r: &Record) -> SocialResult<Self> {
        Ok(Profile {
            user: User::from_record(r)?,
            stats: user_stats(r)?,
            follows: boolean(r, "follows")?,
            is_follower: boolean(r, "isFollower")?,
        })
    }
}

impl FromRecord for Post {
    fn from_record(r: &Record) -> SocialResult<Self> {
        let p = props(r, "props")?;
        let expected = p.int_or("expected_images", 0)?;
        Ok(Post {
            id: int(r, "id")?,
            user_id: int(r, "userId")?,
            user_name: string(r, "userName")?,
            description: p.string("description")?,
            images: p.string_list("images")?,
            expected_images: usize::try_from(expected)
                .map_err(|_| SocialError::encoding(format!("expected_images {expected}")))?,
            created_at: parse_timestamp(&p.string("created_at")?)?,
            likes: int_list(r, "likes")?,
        })
    }
}

// ---- entities back into statements ----

pub fn encode_new_user(new: &NewUser<'_>) -> Query {
    Query::new(&statements::USER_CREATE)
        .param("name", new.name)
        .param("email", new.email)
        .param("password", new.password_hash)
        .param("imagePending", new.image_pending)
}

pub fn encode_new_post(new: &NewPost<'_>) -> SocialResult<Query> {
    Ok(Query::new(&statements::POST_CREATE)
        .param("userId", new.user_id)
        .param("description", new.description)
        .param("createdAt", format_timestamp(new.created_at)?)
        .param("expectedImages", new.expected_images as i64))
}
