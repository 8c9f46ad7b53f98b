use axum::extract::multipart::{Field, MultipartError};
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::deadline::Deadline;
use crate::error::{SocialError, SocialResult};
use crate::posts::repo_types::PostId;
use crate::storage::{MediaScope, MediaStore};
use crate::users::repo_types::UserId;

pub const POST_IMAGE_LIMIT: usize = 20;
pub const PROFILE_IMAGE_LIMIT: usize = 1;
pub const MAX_IMAGE_BYTES: usize = 50 << 20;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl UploadItem {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }
}

impl From<MultipartError> for SocialError {
    fn from(e: MultipartError) -> Self {
        SocialError::invalid(format!("multipart: {}", e.body_text()))
    }
}

/// Buffers one multipart file field. An empty file input (no filename or no
/// bytes) carries no image and yields `None`.
pub async fn read_upload(field: Field<'_>) -> SocialResult<Option<UploadItem>> {
    let has_name = field.file_name().is_some_and(|n| !n.is_empty());
    let content_type = field.content_type().map(str::to_string);
    let body = field.bytes().await?;
    if !has_name || body.is_empty() {
        return Ok(None);
    }
    Ok(Some(UploadItem { body, content_type }))
}

pub async fn read_text(field: Field<'_>) -> SocialResult<String> {
    Ok(field.text().await?)
}

/// Checks the whole batch up front so nothing is written when any item is out of bounds.
pub fn validate_batch(items: &[UploadItem], max_items: usize) -> SocialResult<()> {
    if items.len() > max_items {
        return Err(SocialError::invalid(format!(
            "Too many images ({} given, max {max_items} allowed)",
            items.len()
        )));
    }
    for (idx, item) in items.iter().enumerate() {
        if item.body.len() > MAX_IMAGE_BYTES {
            return Err(SocialError::invalid(format!(
                "image {idx} too large ({} bytes, max {MAX_IMAGE_BYTES})",
                item.body.len()
            )));
        }
        if let Some(ct) = item.content_type.as_deref() {
            if !is_image_mime(ct) {
                return Err(SocialError::invalid(format!("image {idx}: unsupported content type {ct}")));
            }
        }
    }
    Ok(())
}

fn is_image_mime(ct: &str) -> bool {
    ct.starts_with("image/") || ct == "application/octet-stream"
}

/// Writes a post's images in upload order and returns their paths.
/// A failed write stops the batch; earlier files stay on disk but are never referenced.
pub async fn store_post_images(
    store: &dyn MediaStore,
    deadline: Deadline,
    owner: UserId,
    post_id: PostId,
    images: Vec<UploadItem>,
) -> SocialResult<Vec<String>> {
    validate_batch(&images, POST_IMAGE_LIMIT)?;

    let mut paths = Vec::with_capacity(images.len());
    for (idx, img) in images.into_iter().enumerate() {
        let path = store.allocate_path(owner, MediaScope::Post(post_id), idx);
        deadline
            .bound("media.write", store.write(&path, img.body))
            .await?;
        paths.push(path);
    }
    debug!(user_id = owner, post_id, count = paths.len(), "post images stored");
    Ok(paths)
}

pub async fn store_profile_image(
    store: &dyn MediaStore,
    deadline: Deadline,
    owner: UserId,
    image: UploadItem,
) -> SocialResult<String> {
    validate_batch(std::slice::from_ref(&image), PROFILE_IMAGE_LIMIT)?;

    let path = store.allocate_path(owner, MediaScope::ProfilePicture, 0);
    deadline
        .bound("media.write", store.write(&path, image.body))
        .await?;
    debug!(user_id = owner, %path, "profile picture stored");
    Ok(path)
}

/// Reads one stored image back as base64.
pub async fn encode_image(
    store: &dyn MediaStore,
    deadline: Deadline,
    path: &str,
) -> SocialResult<String> {
    let bytes = deadline.bound("media.read", store.read(path)).await?;
    Ok(Base64::encode_string(&bytes))
}

/// Reads every path back as base64. Unreadable images are skipped, but a
/// passed deadline still aborts the whole render.
pub async fn encode_images(
    store: &dyn MediaStore,
    deadline: Deadline,
    paths: &[String],
) -> SocialResult<Vec<String>> {
    let mut out = Vec::with_capacity(paths.len());
    for p in paths {
        match encode_image(store, deadline, p).await {
            Ok(b64) => out.push(b64),
            Err(e @ SocialError::DeadlineExceeded(_)) => return Err(e),
            Err(e) => warn!(error = %e, path = %p, "skipping unreadable image"),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::storage::FsMediaStore;
    use std::time::Duration;

    fn items(n: usize) -> Vec<UploadItem> {
        (0..n).map(|i| UploadItem::new(vec![i as u8; 4])).collect()
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/jpeg"));
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("application/octet-stream"));
        assert!(!is_image_mime("text/html"));
    }

    #[test]
    fn batch_limits() {
        assert!(validate_batch(&items(20), POST_IMAGE_LIMIT).is_ok());
        assert!(matches!(
            validate_batch(&items(21), POST_IMAGE_LIMIT),
            Err(SocialError::InvalidInput(_))
        ));
        assert!(validate_batch(&items(2), PROFILE_IMAGE_LIMIT).is_err());

        let mut batch = items(3);
        batch[2] = UploadItem::new(vec![0u8; MAX_IMAGE_BYTES + 1]);
        assert!(validate_batch(&batch, POST_IMAGE_LIMIT).is_err());

        let mut typed = items(1);
        typed[0].content_type = Some("text/plain".into());
        assert!(validate_batch(&typed, POST_IMAGE_LIMIT).is_err());
    }

    #[tokio::test]
    async fn over_quota_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path()).await.unwrap();
        let err = store_post_images(&store, deadline(), 1, 2, items(21))
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::InvalidInput(_)));
        assert!(!dir.path().join("imgs").exists());
    }

    #[tokio::test]
    async fn stores_in_upload_order_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path()).await.unwrap();
        let paths = store_post_images(&store, deadline(), 1, 2, items(3))
            .await
            .unwrap();
        assert_eq!(
            paths,
            vec![
                "imgs/user-1/post2/0.jpg",
                "imgs/user-1/post2/1.jpg",
                "imgs/user-1/post2/2.jpg"
            ]
        );

        let mut with_missing = paths.clone();
        with_missing.push("imgs/user-1/post2/9.jpg".into());
        let encoded = encode_images(&store, deadline(), &with_missing).await.unwrap();
        assert_eq!(encoded.len(), 3);
        assert_eq!(encoded[1], Base64::encode_string(&[1u8; 4]));
    }

    #[tokio::test]
    async fn profile_picture_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path()).await.unwrap();
        let path = store_profile_image(&store, deadline(), 5, UploadItem::new(&b"png"[..]))
            .await
            .unwrap();
        assert_eq!(path, "imgs/user-5/profile-picture/profile-picture.png");
        assert!(dir.path().join(&path).exists());
    }
}
