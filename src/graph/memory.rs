//! In-process graph store. It understands exactly the statements in
//! [`super::statements`] and reproduces their row shapes, so the service runs
//! without a Neo4j server (tests, local development with `GRAPH_BACKEND=memory`).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GraphClient, GraphValue, NodeValue, Query, Record};
use crate::error::{SocialError, SocialResult};

type Props = BTreeMap<String, GraphValue>;

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, Props>,
    posts: BTreeMap<i64, Props>,
    posted: BTreeSet<(i64, i64)>,
    follows: BTreeSet<(i64, i64)>,
    liked: BTreeSet<(i64, i64)>,
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<State>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of edges of `kind` (`POSTED`, `FOLLOWS`, `LIKED`) touching `node`.
    #[cfg(test)]
    pub fn edge_count(&self, kind: &str, node: i64) -> usize {
        let st = self.lock();
        let set = match kind {
            "POSTED" => &st.posted,
            "FOLLOWS" => &st.follows,
            "LIKED" => &st.liked,
            _ => return 0,
        };
        set.iter().filter(|(a, b)| *a == node || *b == node).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // statements apply all-or-nothing, so a poisoned guard is still consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl GraphClient for MemoryGraph {
    async fn execute(&self, query: Query) -> SocialResult<Vec<Record>> {
        let mut st = self.lock();
        st.apply(&query)
    }
}

fn param<'q>(q: &'q Query, key: &str) -> SocialResult<&'q GraphValue> {
    q.get(key)
        .ok_or_else(|| SocialError::storage(format!("parameter `{key}` not bound")))
}

fn int_param(q: &Query, key: &str) -> SocialResult<i64> {
    match param(q, key)? {
        GraphValue::Int(i) => Ok(*i),
        other => Err(SocialError::storage(format!(
            "parameter `{key}` is {}, expected int",
            other.kind()
        ))),
    }
}

fn str_param(q: &Query, key: &str) -> SocialResult<String> {
    match param(q, key)? {
        GraphValue::String(s) => Ok(s.clone()),
        other => Err(SocialError::storage(format!(
            "parameter `{key}` is {}, expected string",
            other.kind()
        ))),
    }
}

fn count_row(col: &str, n: usize) -> Vec<Record> {
    vec![Record::new().with(col, n as i64)]
}

impl State {
    fn alloc_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn apply(&mut self, q: &Query) -> SocialResult<Vec<Record>> {
        let rows = match q.statement().name {
            "health" => vec![Record::new().with("ok", 1)],

            "user.email_owners" => {
                let email = GraphValue::String(str_param(q, "email")?);
                self.users
                    .iter()
                    .filter(|(_, p)| p.get("email") == Some(&email))
                    .map(|(id, _)| Record::new().with("id", *id))
                    .collect()
            }
            "user.create" => {
                let mut props = Props::new();
                for key in ["name", "email", "password"] {
                    props.insert(key.to_string(), GraphValue::String(str_param(q, key)?));
                }
                props.insert("image_pending".into(), param(q, "imagePending")?.clone());
                let id = self.alloc_id();
                self.users.insert(id, props);
                vec![Record::new().with("id", id)]
            }
            "user.set_image" => {
                let id = int_param(q, "id")?;
                let image = param(q, "image")?.clone();
                match self.users.get_mut(&id) {
                    Some(p) => {
                        p.insert("image".into(), image);
                        p.insert("image_pending".into(), GraphValue::Bool(false));
                        vec![Record::new().with("id", id)]
                    }
                    None => vec![],
                }
            }
            "user.update" => {
                let id = int_param(q, "id")?;
                let name = str_param(q, "name")?;
                let email = str_param(q, "email")?;
                match self.users.get_mut(&id) {
                    Some(p) => {
                        p.insert("name".into(), GraphValue::String(name));
                        p.insert("email".into(), GraphValue::String(email));
                        vec![Record::new()
                            .with("id", id)
                            .with("props", GraphValue::Map(p.clone()))]
                    }
                    None => vec![],
                }
            }
            "user.delete" => {
                let id = int_param(q, "id")?;
                if !self.users.contains_key(&id) {
                    return Ok(count_row("deleted", 0));
                }
                if self.has_relationships(id) {
                    return Err(SocialError::storage(format!(
                        "Cannot delete node<{id}>, because it still has relationships"
                    )));
                }
                self.users.remove(&id);
                count_row("deleted", 1)
            }
            "user.exists" => {
                let id = int_param(q, "id")?;
                vec![Record::new().with("exists", self.users.contains_key(&id))]
            }
            "user.by_id" => {
                let id = int_param(q, "id")?;
                self.users
                    .contains_key(&id)
                    .then(|| self.user_row(id))
                    .into_iter()
                    .collect()
            }
            "user.by_email" => {
                let email = GraphValue::String(str_param(q, "email")?);
                let ids: Vec<i64> = self
                    .users
                    .iter()
                    .filter(|(_, p)| p.get("email") == Some(&email))
                    .map(|(id, _)| *id)
                    .collect();
                ids.into_iter().map(|id| self.user_row(id)).collect()
            }
            "user.list" => self.users.keys().map(|id| self.user_row(*id)).collect(),
            "user.profile" => {
                let id = int_param(q, "profileId")?;
                let viewer = int_param(q, "viewerId")?;
                if !self.users.contains_key(&id) {
                    return Ok(vec![]);
                }
                let viewer_exists = self.users.contains_key(&viewer);
                let mut row = self.user_row(id);
                row.insert(
                    "follows",
                    GraphValue::Bool(viewer_exists && self.follows.contains(&(viewer, id))),
                );
                row.insert(
                    "isFollower",
                    GraphValue::Bool(viewer_exists && self.follows.contains(&(id, viewer))),
                );
                vec![row]
            }
            "user.followers" | "user.following" => {
                let id = int_param(q, "id")?;
                if !self.users.contains_key(&id) {
                    return Ok(vec![]);
                }
                let incoming = q.statement().name == "user.followers";
                let others: Vec<i64> = self
                    .follows
                    .iter()
                    .filter_map(|&(a, b)| match incoming {
                        true if b == id => Some(a),
                        false if a == id => Some(b),
                        _ => None,
                    })
                    .collect();
                if others.is_empty() {
                    vec![Record::new().with("user", GraphValue::Null)]
                } else {
                    others
                        .into_iter()
                        .map(|o| Record::new().with("user", self.user_node(o)))
                        .collect()
                }
            }

            "edge.endpoints_user_user" | "edge.endpoints_user_post" => {
                let from = int_param(q, "from")?;
                let to = int_param(q, "to")?;
                let to_exists = if q.statement().name == "edge.endpoints_user_user" {
                    self.users.contains_key(&to)
                } else {
                    self.posts.contains_key(&to)
                };
                vec![Record::new()
                    .with("fromExists", self.users.contains_key(&from))
                    .with("toExists", to_exists)]
            }
            "edge.follow_merge" => {
                let (from, to) = (int_param(q, "from")?, int_param(q, "to")?);
                if self.users.contains_key(&from) && self.users.contains_key(&to) {
                    self.follows.insert((from, to));
                    count_row("count", 1)
                } else {
                    count_row("count", 0)
                }
            }
            "edge.follow_delete" => {
                let (from, to) = (int_param(q, "from")?, int_param(q, "to")?);
                count_row("count", usize::from(self.follows.remove(&(from, to))))
            }
            "edge.like_merge" => {
                let (from, to) = (int_param(q, "from")?, int_param(q, "to")?);
                if self.users.contains_key(&from) && self.posts.contains_key(&to) {
                    self.liked.insert((from, to));
                    count_row("count", 1)
                } else {
                    count_row("count", 0)
                }
            }
            "edge.like_delete" => {
                let (from, to) = (int_param(q, "from")?, int_param(q, "to")?);
                count_row("count", usize::from(self.liked.remove(&(from, to))))
            }

            "post.create" => {
                let user_id = int_param(q, "userId")?;
                if !self.users.contains_key(&user_id) {
                    return Ok(vec![]);
                }
                let mut props = Props::new();
                props.insert(
                    "description".into(),
                    GraphValue::String(str_param(q, "description")?),
                );
                props.insert(
                    "created_at".into(),
                    GraphValue::String(str_param(q, "createdAt")?),
                );
                props.insert("images".into(), GraphValue::List(vec![]));
                props.insert(
                    "expected_images".into(),
                    GraphValue::Int(int_param(q, "expectedImages")?),
                );
                let id = self.alloc_id();
                self.posts.insert(id, props);
                self.posted.insert((user_id, id));
                vec![Record::new().with("id", id)]
            }
            "post.set_images" => {
                let id = int_param(q, "id")?;
                let images = param(q, "images")?.clone();
                match self.posts.get_mut(&id) {
                    Some(p) => {
                        p.insert("images".into(), images);
                        vec![Record::new().with("id", id)]
                    }
                    None => vec![],
                }
            }
            "post.by_id" => {
                let id = int_param(q, "id")?;
                self.post_row(id).into_iter().collect()
            }
            "post.list" => self
                .posts
                .keys()
                .rev()
                .filter_map(|id| self.post_row(*id))
                .collect(),
            "post.list_by_user" => {
                let user_id = int_param(q, "userId")?;
                self.posted
                    .iter()
                    .filter(|(u, _)| *u == user_id)
                    .map(|(_, p)| *p)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .rev()
                    .filter_map(|id| self.post_row(id))
                    .collect()
            }
            "post.delete" => {
                let user_id = int_param(q, "userId")?;
                let post_id = int_param(q, "postId")?;
                if !self.posted.contains(&(user_id, post_id)) {
                    return Ok(vec![]);
                }
                let images = self
                    .posts
                    .remove(&post_id)
                    .and_then(|mut p| p.remove("images"))
                    .unwrap_or(GraphValue::Null);
                self.posted.retain(|(_, p)| *p != post_id);
                self.liked.retain(|(_, p)| *p != post_id);
                vec![Record::new().with("images", images)]
            }

            other => {
                return Err(SocialError::storage(format!(
                    "statement `{other}` is not supported by the in-memory graph"
                )))
            }
        };
        Ok(rows)
    }

    fn has_relationships(&self, id: i64) -> bool {
        self.posted.iter().any(|(u, _)| *u == id)
            || self.liked.iter().any(|(u, _)| *u == id)
            || self.follows.iter().any(|(a, b)| *a == id || *b == id)
    }

    fn user_node(&self, id: i64) -> GraphValue {
        GraphValue::Node(NodeValue {
            id,
            labels: vec!["User".into()],
            props: self.users.get(&id).cloned().unwrap_or_default(),
        })
    }

    fn user_row(&self, id: i64) -> Record {
        let followers = self.follows.iter().filter(|(_, b)| *b == id).count();
        let following = self.follows.iter().filter(|(a, _)| *a == id).count();
        let posts = self.posted.iter().filter(|(u, _)| *u == id).count();
        Record::new()
            .with("id", id)
            .with(
                "props",
                GraphValue::Map(self.users.get(&id).cloned().unwrap_or_default()),
            )
            .with("postCount", posts as i64)
            .with("followers", followers as i64)
            .with("following", following as i64)
    }

    fn post_row(&self, id: i64) -> Option<Record> {
        let props = self.posts.get(&id)?;
        let author = self
            .posted
            .iter()
            .find(|(_, p)| *p == id)
            .map(|(u, _)| *u)?;
        let author_name = self
            .users
            .get(&author)
            .and_then(|p| p.get("name").cloned())
            .unwrap_or(GraphValue::Null);
        let likes: Vec<i64> = self
            .liked
            .iter()
            .filter(|(_, p)| *p == id)
            .map(|(u, _)| *u)
            .collect();
        Some(
            Record::new()
                .with("id", id)
                .with("props", GraphValue::Map(props.clone()))
                .with("userId", author)
                .with("userName", author_name)
                .with("likes", likes),
        )
    }
}
