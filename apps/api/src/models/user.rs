use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Contributor,
    Reviewer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Contributor => "contributor",
            Role::Reviewer => "reviewer",
            Role::Admin => "admin",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "contributor" => Ok(Role::Contributor),
            "reviewer" => Ok(Role::Reviewer),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownVariant::new("role", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Pending,
    Rejected,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Pending => "pending",
            UserStatus::Rejected => "rejected",
        }
    }
}

impl TryFrom<String> for UserStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(UserStatus::Active),
            "pending" => Ok(UserStatus::Pending),
            "rejected" => Ok(UserStatus::Rejected),
            _ => Err(UnknownVariant::new("user status", value)),
        }
    }
}

/// A row of the `users` table. The password never leaves the server:
/// serializing a `User` yields the session view of the account.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    pub profile_complete: bool,
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub languages: Option<Vec<String>>,
    pub location: Option<String>,
    pub constituency: Option<String>,
    pub language_dialect: Option<String>,
    pub educational_background: Option<String>,
    pub employment_status: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl User {
    /// Reviewers only count as reviewers once an admin approved them.
    pub fn is_approved_reviewer(&self) -> bool {
        self.role == Role::Reviewer && self.status == UserStatus::Active
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Fields accepted when inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub status: UserStatus,
    pub profile_complete: bool,
    pub name: Option<String>,
    pub is_active: bool,
}

/// Partial update of the profile columns. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub constituency: Option<String>,
    pub phone_number: Option<String>,
    pub educational_background: Option<String>,
    pub employment_status: Option<String>,
    pub language_dialect: Option<String>,
    pub languages: Option<Vec<String>>,
    pub profile_complete: Option<bool>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        for role in [Role::Contributor, Role::Reviewer, Role::Admin] {
            assert_eq!(Role::try_from(role.as_str().to_string()).unwrap(), role);
        }
        assert!(Role::try_from("superuser".to_string()).is_err());
    }

    #[test]
    fn test_password_is_not_serialized() {
        let user = fixtures::user(Role::Contributor, UserStatus::Active);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "contributor");
    }

    #[test]
    fn test_pending_reviewer_is_not_approved() {
        let user = fixtures::user(Role::Reviewer, UserStatus::Pending);
        assert!(!user.is_approved_reviewer());
    }
}
