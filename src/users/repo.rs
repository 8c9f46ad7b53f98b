use tracing::{debug, info};

use crate::deadline::Deadline;
use crate::error::{SocialError, SocialResult};
use crate::graph::codec::{self, FromRecord};
use crate::graph::{run, run_one, statements, GraphClient, Query};
use crate::users::repo_types::{NewUser, Profile, User, UserId, UserWithStats};

impl User {
    /// Ids of users registered with `email`.
    async fn email_owners(
        graph: &dyn GraphClient,
        dl: Deadline,
        email: &str,
    ) -> SocialResult<Vec<UserId>> {
        let rows = run(
            graph,
            dl,
            Query::new(&statements::USER_EMAIL_OWNERS).param("email", email),
        )
        .await?;
        rows.iter().map(|r| codec::int(r, "id")).collect()
    }

    /// Create a user node after checking the e-mail is free. The check and the
    /// create are separate statements; two concurrent calls can both pass.
    pub async fn create(
        graph: &dyn GraphClient,
        dl: Deadline,
        new: &NewUser<'_>,
    ) -> SocialResult<UserId> {
        if !Self::email_owners(graph, dl, new.email).await?.is_empty() {
            return Err(SocialError::Conflict("Email already in use".into()));
        }

        let row = run_one(graph, dl, codec::encode_new_user(new))
            .await?
            .ok_or_else(|| SocialError::storage("user create returned no row"))?;
        let id = codec::int(&row, "id")?;
        info!(user_id = id, email = %new.email, "user created");
        Ok(id)
    }

    pub async fn set_image(
        graph: &dyn GraphClient,
        dl: Deadline,
        id: UserId,
        path: &str,
    ) -> SocialResult<()> {
        run_one(
            graph,
            dl,
            Query::new(&statements::USER_SET_IMAGE)
                .param("id", id)
                .param("image", path),
        )
        .await?
        .ok_or_else(|| SocialError::not_found(format!("user {id}")))?;
        debug!(user_id = id, %path, "profile picture attached");
        Ok(())
    }

    /// Set name and e-mail. The e-mail must not belong to another user.
    pub async fn update(
        graph: &dyn GraphClient,
        dl: Deadline,
        id: UserId,
        name: &str,
        email: &str,
    ) -> SocialResult<User> {
        let owners = Self::email_owners(graph, dl, email).await?;
        if owners.iter().any(|owner| *owner != id) {
            return Err(SocialError::Conflict("Email already in use".into()));
        }

        let row = run_one(
            graph,
            dl,
            Query::new(&statements::USER_UPDATE)
                .param("id", id)
                .param("name", name)
                .param("email", email),
        )
        .await?
        .ok_or_else(|| SocialError::not_found(format!("user {id}")))?;
        info!(user_id = id, "user updated");
        User::from_record(&row)
    }

    /// Delete the node only; posts and edges are left alone.
    pub async fn delete(graph: &dyn GraphClient, dl: Deadline, id: UserId) -> SocialResult<()> {
        let row = run_one(
            graph,
            dl,
            Query::new(&statements::USER_DELETE).param("id", id),
        )
        .await?;
        let deleted = match row {
            Some(r) => codec::int(&r, "deleted")?,
            None => 0,
        };
        if deleted == 0 {
            return Err(SocialError::not_found(format!("user {id}")));
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }

    pub async fn exists(graph: &dyn GraphClient, dl: Deadline, id: UserId) -> SocialResult<bool> {
        match run_one(graph, dl, Query::new(&statements::USER_EXISTS).param("id", id)).await? {
            Some(r) => codec::boolean(&r, "exists"),
            None => Ok(false),
        }
    }

    pub async fn find_by_id(
        graph: &dyn GraphClient,
        dl: Deadline,
        id: UserId,
    ) -> SocialResult<UserWithStats> {
        let row = run_one(graph, dl, Query::new(&statements::USER_BY_ID).param("id", id))
            .await?
            .ok_or_else(|| SocialError::not_found(format!("user {id}")))?;
        UserWithStats::from_record(&row)
    }

    pub async fn find_by_email(
        graph: &dyn GraphClient,
        dl: Deadline,
        email: &str,
    ) -> SocialResult<Option<UserWithStats>> {
        let row = run_one(
            graph,
            dl,
            Query::new(&statements::USER_BY_EMAIL).param("email", email),
        )
        .await?;
        row.as_ref().map(UserWithStats::from_record).transpose()
    }

    pub async fn get_by_email(
        graph: &dyn GraphClient,
        dl: Deadline,
        email: &str,
    ) -> SocialResult<UserWithStats> {
        Self::find_by_email(graph, dl, email)
            .await?
            .ok_or_else(|| SocialError::not_found(format!("user with email {email}")))
    }

    /// Every user with aggregates, computed in one statement.
    pub async fn list(graph: &dyn GraphClient, dl: Deadline) -> SocialResult<Vec<UserWithStats>> {
        let rows = run(graph, dl, Query::new(&statements::USER_LIST)).await?;
        codec::decode_all(&rows)
    }

    /// `id` as seen by `viewer`. A viewer that does not exist simply follows nobody.
    pub async fn profile(
        graph: &dyn GraphClient,
        dl: Deadline,
        id: UserId,
        viewer: UserId,
    ) -> SocialResult<Profile> {
        let row = run_one(
            graph,
            dl,
            Query::new(&statements::USER_PROFILE)
                .param("profileId", id)
                .param("viewerId", viewer),
        )
        .await?
        .ok_or_else(|| SocialError::not_found(format!("user {id}")))?;
        Profile::from_record(&row)
    }

    pub async fn followers(
        graph: &dyn GraphClient,
        dl: Deadline,
        id: UserId,
    ) -> SocialResult<Vec<User>> {
        Self::neighbours(graph, dl, &statements::USER_FOLLOWERS, id).await
    }

    pub async fn following(
        graph: &dyn GraphClient,
        dl: Deadline,
        id: UserId,
    ) -> SocialResult<Vec<User>> {
        Self::neighbours(graph, dl, &statements::USER_FOLLOWING, id).await
    }

    // Zero rows: no such user. One row with a null `user`: no neighbours.
    async fn neighbours(
        graph: &dyn GraphClient,
        dl: Deadline,
        statement: &'static statements::Statement,
        id: UserId,
    ) -> SocialResult<Vec<User>> {
        let rows = run(graph, dl, Query::new(statement).param("id", id)).await?;
        if rows.is_empty() {
            return Err(SocialError::not_found(format!("user {id}")));
        }
        let mut users = Vec::with_capacity(rows.len());
        for r in &rows {
            if let Some(node) = codec::opt_node(r, "user")? {
                users.push(codec::user_from_node(node)?);
            }
        }
        Ok(users)
    }
}
