use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::AppError;
use crate::models::user::User;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// Checks the signup form. Errors carry the message shown to the user.
pub fn validate_signup(email: &str, password: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(())
}

/// Percentage of the nine required profile fields that are filled, rounded.
pub fn profile_completion(user: &User) -> u8 {
    let required = [
        &user.name,
        &user.age,
        &user.gender,
        &user.location,
        &user.constituency,
        &user.phone_number,
        &user.language_dialect,
        &user.educational_background,
        &user.employment_status,
    ];
    let filled = required
        .iter()
        .filter(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
        .count();
    ((filled as f64 / required.len() as f64) * 100.0).round() as u8
}
