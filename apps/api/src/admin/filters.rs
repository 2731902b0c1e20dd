use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::models::recording::{Recording, RecordingStatus};
use crate::models::user::User;

fn is_all(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), None | Some("") | Some("all"))
}

fn search_term(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Admin user listing filters. `all` (or absence) disables a filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListFilter {
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

impl UserListFilter {
    pub fn matches(&self, user: &User) -> bool {
        let search_ok = match search_term(self.search.as_deref()) {
            Some(term) => {
                user.email.to_lowercase().contains(&term)
                    || user
                        .name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&term))
            }
            None => true,
        };
        let role_ok = is_all(self.role.as_deref())
            || self.role.as_deref() == Some(user.role.as_str());
        let status_ok = is_all(self.status.as_deref())
            || self.status.as_deref() == Some(user.status.as_str());
        search_ok && role_ok && status_ok
    }
}

/// Admin recording listing filters. Status accepts `reviewed` for approved
/// and rejected together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingListFilter {
    pub search: Option<String>,
    pub status: Option<String>,
}

impl RecordingListFilter {
    fn status_matches(&self, status: RecordingStatus) -> bool {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => true,
            Some("reviewed") => status != RecordingStatus::Pending,
            Some(wanted) => wanted == status.as_str(),
        }
    }

    /// `users` resolves contributors for the name/email search.
    pub fn matches(&self, recording: &Recording, users: &HashMap<Uuid, &User>) -> bool {
        if !self.status_matches(recording.status) {
            return false;
        }
        let Some(term) = search_term(self.search.as_deref()) else {
            return true;
        };
        if recording.sentence.to_lowercase().contains(&term) {
            return true;
        }
        users.get(&recording.user_id).is_some_and(|u| {
            u.email.to_lowercase().contains(&term)
                || u.name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&term))
        })
    }
}

pub fn users_by_id(users: &[User]) -> HashMap<Uuid, &User> {
    users.iter().map(|u| (u.id, u)).collect()
}
