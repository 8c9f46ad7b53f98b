use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{SocialError, SocialResult};
use crate::posts::repo_types::PostId;
use crate::users::repo_types::UserId;

/// Directory a media payload belongs to, below its owner's root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaScope {
    Post(PostId),
    ProfilePicture,
}

/// Relative path persisted on graph nodes. The layout is part of the stored
/// data and must stay resolvable for existing nodes.
pub fn media_path(owner: UserId, scope: MediaScope, index: usize) -> String {
    match scope {
        MediaScope::Post(_) => format!("{}/{index}.jpg", scope_dir(owner, scope)),
        MediaScope::ProfilePicture => format!("{}/profile-picture.png", scope_dir(owner, scope)),
    }
}

fn scope_dir(owner: UserId, scope: MediaScope) -> String {
    match scope {
        MediaScope::Post(post) => format!("imgs/user-{owner}/post{post}"),
        MediaScope::ProfilePicture => format!("imgs/user-{owner}/profile-picture"),
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    fn allocate_path(&self, owner: UserId, scope: MediaScope, index: usize) -> String {
        media_path(owner, scope, index)
    }
    async fn write(&self, path: &str, body: Bytes) -> SocialResult<()>;
    async fn read(&self, path: &str) -> SocialResult<Bytes>;
    async fn remove_scope(&self, owner: UserId, scope: MediaScope) -> SocialResult<()>;
}

/// Media store on the local filesystem, rooted at `root`.
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create media root {}", root.display()))?;
        Ok(Self { root })
    }

    fn resolve(&self, rel: &str) -> SocialResult<PathBuf> {
        let rel_path = Path::new(rel);
        let escapes = rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if rel.is_empty() || escapes {
            return Err(SocialError::invalid(format!("media path `{rel}`")));
        }
        Ok(self.root.join(rel_path))
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn write(&self, path: &str, body: Bytes) -> SocialResult<()> {
        let full = self.resolve(path)?;
        if let Some(dir) = full.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SocialError::storage(format!("create {}: {e}", dir.display())))?;
        }
        tokio::fs::write(&full, &body)
            .await
            .map_err(|e| SocialError::storage(format!("write {path}: {e}")))?;
        Ok(())
    }

    async fn read(&self, path: &str) -> SocialResult<Bytes> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(buf) => Ok(Bytes::from(buf)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SocialError::not_found(format!("image {path}")))
            }
            Err(e) => Err(SocialError::storage(format!("read {path}: {e}"))),
        }
    }

    async fn remove_scope(&self, owner: UserId, scope: MediaScope) -> SocialResult<()> {
        let dir = self.resolve(&scope_dir(owner, scope))?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SocialError::storage(format!("remove {}: {e}", dir.display()))),
        }
    }
}
