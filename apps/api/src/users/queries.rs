use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::admin::cascade::{self, CascadePlan, DeleteSummary};
use crate::models::user::{NewUser, ProfileUpdate, Role, User, UserStatus};
use crate::recordings::queries::get_recordings_by_user;
use crate::reviews::queries::get_all_reviews;

/// Emails are stored and compared lowercased and trimmed.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn create_user(pool: &PgPool, new_user: &NewUser) -> Result<User> {
    let now = Utc::now();
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users
            (id, email, password, role, status, profile_complete, name,
             created_at, updated_at, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(normalize_email(&new_user.email))
    .bind(&new_user.password)
    .bind(new_user.role.as_str())
    .bind(new_user.status.as_str())
    .bind(new_user.profile_complete)
    .bind(&new_user.name)
    .bind(now)
    .bind(new_user.is_active)
    .fetch_one(pool)
    .await
    .context("Failed to create user")?;

    info!(
        "Created {} account {} ({})",
        user.role.as_str(),
        user.id,
        user.status.as_str()
    );
    Ok(user)
}

/// True when the error came from a UNIQUE constraint, e.g. two signups racing
/// for the same email.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}

/// Returns `None` when no account uses the email.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    Ok(
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await
            .context("Failed to get user by email")?,
    )
}

pub async fn get_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by id")?)
}

/// Writes the provided profile columns and bumps `updated_at`.
/// Returns `None` when the user does not exist.
pub async fn update_user(
    pool: &PgPool,
    id: Uuid,
    update: &ProfileUpdate,
) -> Result<Option<User>> {
    Ok(sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            name                   = COALESCE($2, name),
            age                    = COALESCE($3, age),
            gender                 = COALESCE($4, gender),
            location               = COALESCE($5, location),
            constituency           = COALESCE($6, constituency),
            phone_number           = COALESCE($7, phone_number),
            educational_background = COALESCE($8, educational_background),
            employment_status      = COALESCE($9, employment_status),
            language_dialect       = COALESCE($10, language_dialect),
            languages              = COALESCE($11, languages),
            profile_complete       = COALESCE($12, profile_complete),
            updated_at             = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&update.name)
    .bind(&update.age)
    .bind(&update.gender)
    .bind(&update.location)
    .bind(&update.constituency)
    .bind(&update.phone_number)
    .bind(&update.educational_background)
    .bind(&update.employment_status)
    .bind(&update.language_dialect)
    .bind(&update.languages)
    .bind(update.profile_complete)
    .fetch_optional(pool)
    .await
    .context("Failed to update user profile")?)
}

pub async fn touch_last_login(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    Ok(sqlx::query_as::<_, User>(
        "UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to record last login")?)
}

/// Approval workflow for reviewer accounts. Returns `None` for unknown ids.
pub async fn set_user_status(
    pool: &PgPool,
    id: Uuid,
    status: UserStatus,
    is_active: bool,
) -> Result<Option<User>> {
    Ok(sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET status = $2, is_active = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(is_active)
    .fetch_optional(pool)
    .await
    .context("Failed to update user status")?)
}

/// All users, newest first.
pub async fn get_all_users(pool: &PgPool) -> Result<Vec<User>> {
    Ok(
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
            .context("Failed to get users")?,
    )
}

pub async fn get_users_by_role(pool: &PgPool, role: Role) -> Result<Vec<User>> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE role = $1 ORDER BY created_at DESC",
    )
    .bind(role.as_str())
    .fetch_all(pool)
    .await
    .context("Failed to get users by role")?)
}

/// Deletes the user together with their recordings, the reviews they wrote and
/// the reviews on their recordings. Returns `None` when the user does not exist.
pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<Option<DeleteSummary>> {
    if get_user_by_id(pool, id).await?.is_none() {
        return Ok(None);
    }
    let recordings = get_recordings_by_user(pool, id).await?;
    let reviews = get_all_reviews(pool).await?;
    cascade::execute(pool, &CascadePlan::build(id, &recordings, &reviews)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;

    use anyhow::anyhow;
    use sqlx::error::{DatabaseError, ErrorKind};

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Example.ORG "), "jane.doe@example.org");
    }

    #[derive(Debug)]
    struct FakeDbError(ErrorKind);

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "fake database error")
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint \"users_email_key\""
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    #[test]
    fn test_unique_violation_detected_through_context() {
        let err = anyhow::Error::new(sqlx::Error::Database(Box::new(FakeDbError(
            ErrorKind::UniqueViolation,
        ))))
        .context("Failed to create user");
        assert!(is_unique_violation(&err));

        let other = anyhow::Error::new(sqlx::Error::Database(Box::new(FakeDbError(
            ErrorKind::Other,
        ))));
        assert!(!is_unique_violation(&other));
        assert!(!is_unique_violation(&anyhow::Error::new(sqlx::Error::RowNotFound)));
        assert!(!is_unique_violation(&anyhow!("network down")));
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL at TEST_DATABASE_URL
    async fn test_concurrent_signups_with_same_email() {
        let url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must point at a scratch database");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let new_user = NewUser {
            email: format!("{}@example.org", Uuid::new_v4()),
            password: "secret1".to_string(),
            role: Role::Contributor,
            status: UserStatus::Active,
            profile_complete: false,
            name: None,
            is_active: true,
        };
        let (a, b) = tokio::join!(create_user(&pool, &new_user), create_user(&pool, &new_user));
        let errors: Vec<anyhow::Error> = [a, b].into_iter().filter_map(Result::err).collect();
        assert_eq!(errors.len(), 1);
        assert!(is_unique_violation(&errors[0]));
    }
}
