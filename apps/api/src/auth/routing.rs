//! Role-based page routing. The browser asks where a session should land and
//! whether it may open a given page; the same rules back the API role checks.

use serde::Serialize;

use crate::models::user::{Role, User, UserStatus};

pub const SIGN_IN: &str = "/auth/signin";
pub const PROFILE_SETUP: &str = "/profile/setup";
pub const SPEAK: &str = "/speak";
pub const LISTEN: &str = "/listen";
pub const ADMIN: &str = "/admin";
pub const DASHBOARD: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Public,
    ProfileSetup,
    Speak,
    Listen,
    Admin,
    /// Any other page that needs a session (dashboard, profile, ...).
    Protected,
}

impl Page {
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        match path {
            "/" | "/auth/signin" | "/auth/signup" | "/admin/login" => Page::Public,
            "/profile/setup" => Page::ProfileSetup,
            "/speak" => Page::Speak,
            "/listen" => Page::Listen,
            p if p == ADMIN || p.starts_with("/admin/") => Page::Admin,
            _ => Page::Protected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum Access {
    Allow,
    Redirect { to: &'static str },
}

/// Sessions that must not use the app at all: deactivated accounts and
/// reviewers an admin has not approved.
fn is_locked_out(user: &User) -> bool {
    !user.is_active || (user.role == Role::Reviewer && user.status != UserStatus::Active)
}

/// Where a session lands after sign-in or on the home page.
pub fn landing_page(user: Option<&User>) -> &'static str {
    match user {
        None => SIGN_IN,
        Some(u) if is_locked_out(u) => SIGN_IN,
        Some(u) if !u.profile_complete => PROFILE_SETUP,
        Some(u) => match u.role {
            Role::Contributor => SPEAK,
            Role::Reviewer => LISTEN,
            Role::Admin => ADMIN,
        },
    }
}

pub fn check_access(user: Option<&User>, path: &str) -> Access {
    let page = Page::from_path(path);
    if page == Page::Public {
        return Access::Allow;
    }

    let redirect = |to| Access::Redirect { to };

    let Some(user) = user else {
        return redirect(SIGN_IN);
    };
    if is_locked_out(user) {
        return redirect(SIGN_IN);
    }
    if page == Page::ProfileSetup {
        return Access::Allow;
    }
    if !user.profile_complete {
        return redirect(PROFILE_SETUP);
    }

    match (page, user.role) {
        (Page::Speak, Role::Reviewer) => redirect(LISTEN),
        (Page::Listen, Role::Contributor) => redirect(SPEAK),
        (Page::Admin, role) if role != Role::Admin => redirect(DASHBOARD),
        _ => Access::Allow,
    }
}
