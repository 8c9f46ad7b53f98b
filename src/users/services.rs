use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::auth::password::hash_password;
use crate::deadline::Deadline;
use crate::error::{SocialError, SocialResult};
use crate::images::services::{store_profile_image, validate_batch, UploadItem, PROFILE_IMAGE_LIMIT};
use crate::state::AppState;
use crate::users::repo_types::{NewUser, User, UserId, UserWithStats};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_identity(name: &str, email: &str) -> SocialResult<()> {
    if name.trim().is_empty() || email.is_empty() {
        return Err(SocialError::invalid("name and email are required"));
    }
    if !is_valid_email(email) {
        return Err(SocialError::invalid("Invalid email"));
    }
    Ok(())
}

/// Registers a user with an optional profile picture.
///
/// The picture is checked before the node is created. Storing and attaching it
/// happen after; if either fails the user is still returned, flagged as having
/// incomplete media.
pub async fn create_user(
    state: &AppState,
    dl: Deadline,
    name: &str,
    email: &str,
    password: &str,
    image: Option<UploadItem>,
) -> SocialResult<UserWithStats> {
    let email = normalize_email(email);
    check_identity(name, &email)?;
    if password.is_empty() {
        return Err(SocialError::invalid("password is required"));
    }
    if let Some(img) = &image {
        validate_batch(std::slice::from_ref(img), PROFILE_IMAGE_LIMIT)?;
    }

    let hash = hash_password(password)?;
    let id = User::create(
        state.graph.as_ref(),
        dl,
        &NewUser {
            name: name.trim(),
            email: &email,
            password_hash: &hash,
            image_pending: image.is_some(),
        },
    )
    .await?;

    if let Some(img) = image {
        attach_profile_image(state, dl, id, img).await?;
    }

    User::find_by_id(state.graph.as_ref(), dl, id).await
}

async fn attach_profile_image(
    state: &AppState,
    dl: Deadline,
    id: UserId,
    image: UploadItem,
) -> SocialResult<()> {
    let path = match store_profile_image(state.media.as_ref(), dl, id, image).await {
        Ok(path) => path,
        Err(e @ SocialError::DeadlineExceeded(_)) => return Err(e),
        Err(e) => {
            warn!(error = %e, user_id = id, "profile picture not stored");
            return Ok(());
        }
    };
    match User::set_image(state.graph.as_ref(), dl, id, &path).await {
        Ok(()) => Ok(()),
        Err(e @ SocialError::DeadlineExceeded(_)) => Err(e),
        Err(e) => {
            warn!(error = %e, user_id = id, %path, "profile picture stored but not attached");
            Ok(())
        }
    }
}

pub async fn update_user(
    state: &AppState,
    dl: Deadline,
    id: UserId,
    name: &str,
    email: &str,
) -> SocialResult<User> {
    let email = normalize_email(email);
    check_identity(name, &email)?;
    User::update(state.graph.as_ref(), dl, id, name.trim(), &email).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::storage::MediaStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("test@example.com"));
        assert!(!is_valid_email("invalid-email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("test@"));
    }

    #[tokio::test]
    async fn stores_hash_and_picture() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(dir.path()).await.unwrap();

        let created = create_user(
            &state,
            state.deadline(),
            "Alice",
            "  Alice@Example.com ",
            "secret",
            Some(UploadItem::new(Bytes::from_static(b"png"))),
        )
        .await
        .unwrap();

        let user = created.user;
        assert_eq!(user.email, "alice@example.com");
        assert!(verify_password("secret", &user.password_hash).unwrap());
        assert_eq!(
            user.image.as_deref(),
            Some(format!("imgs/user-{}/profile-picture/profile-picture.png", user.id).as_str())
        );
        assert!(!user.has_incomplete_media());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(dir.path()).await.unwrap();
        let dl = state.deadline();
        create_user(&state, dl, "a", "a@x.io", "pw", None).await.unwrap();
        let err = create_user(&state, dl, "b", "A@x.io", "pw", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::Conflict(_)));
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(dir.path()).await.unwrap();
        let dl = state.deadline();
        for (name, email, pw) in [("", "a@x.io", "pw"), ("a", "", "pw"), ("a", "a@x.io", "")] {
            let err = create_user(&state, dl, name, email, pw, None).await.unwrap_err();
            assert!(matches!(err, SocialError::InvalidInput(_)));
        }
    }

    struct BrokenMedia;

    #[async_trait]
    impl MediaStore for BrokenMedia {
        async fn write(&self, path: &str, _body: Bytes) -> SocialResult<()> {
            Err(SocialError::storage(format!("disk full writing {path}")))
        }
        async fn read(&self, path: &str) -> SocialResult<Bytes> {
            Err(SocialError::not_found(path.to_string()))
        }
        async fn remove_scope(
            &self,
            _owner: UserId,
            _scope: crate::storage::MediaScope,
        ) -> SocialResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_picture_write_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let base = AppState::in_memory(dir.path()).await.unwrap();
        let state = AppState::from_parts(base.graph.clone(), Arc::new(BrokenMedia), base.config);

        let created = create_user(
            &state,
            state.deadline(),
            "a",
            "a@x.io",
            "pw",
            Some(UploadItem::new(Bytes::from_static(b"png"))),
        )
        .await
        .unwrap();
        assert!(created.user.image.is_none());
        assert!(created.user.has_incomplete_media());
    }

    struct StalledMedia;

    #[async_trait]
    impl MediaStore for StalledMedia {
        async fn write(&self, _path: &str, _body: Bytes) -> SocialResult<()> {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            Ok(())
        }
        async fn read(&self, path: &str) -> SocialResult<Bytes> {
            Err(SocialError::not_found(path.to_string()))
        }
        async fn remove_scope(
            &self,
            _owner: UserId,
            _scope: crate::storage::MediaScope,
        ) -> SocialResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn deadline_during_picture_write_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let base = AppState::in_memory(dir.path()).await.unwrap();
        let state = AppState::from_parts(base.graph.clone(), Arc::new(StalledMedia), base.config);

        let dl = Deadline::after(std::time::Duration::from_millis(50));
        let err = create_user(
            &state,
            dl,
            "a",
            "a@x.io",
            "pw",
            Some(UploadItem::new(Bytes::from_static(b"png"))),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SocialError::DeadlineExceeded("media.write")));
    }

    #[tokio::test]
    async fn update_checks_other_owners() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(dir.path()).await.unwrap();
        let dl = state.deadline();
        let a = create_user(&state, dl, "a", "a@x.io", "pw", None).await.unwrap();
        create_user(&state, dl, "b", "b@x.io", "pw", None).await.unwrap();

        let same = update_user(&state, dl, a.user.id, "A", "a@x.io").await.unwrap();
        assert_eq!(same.name, "A");
        assert!(matches!(
            update_user(&state, dl, a.user.id, "A", "b@x.io").await,
            Err(SocialError::Conflict(_))
        ));
        assert!(matches!(
            update_user(&state, dl, 4242, "x", "x@x.io").await,
            Err(SocialError::NotFound(_))
        ));
    }
}
