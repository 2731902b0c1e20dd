use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::routing::{self, check_access, landing_page, Access};
use crate::auth::session::{CurrentUser, MaybeUser};
use crate::auth::validation::{profile_completion, validate_signup};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::user::{NewUser, ProfileUpdate, Role, User, UserStatus};
use crate::state::AppState;
use crate::users::queries::{
    create_user, get_user_by_email, is_unique_violation, normalize_email, touch_last_login,
    update_user,
};

const DUPLICATE_EMAIL: &str = "An account with this email already exists";

/// A concurrent signup can still hit the UNIQUE index after the lookup passed.
fn signup_error(err: anyhow::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(DUPLICATE_EMAIL.to_string())
    } else {
        AppError::Internal(err)
    }
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A signed-in session: the user (without password) and where to send them.
#[derive(Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub redirect: &'static str,
}

#[derive(Serialize)]
pub struct SignupResponse {
    /// Present only when the account was signed in straight away.
    pub user: Option<User>,
    pub redirect: &'static str,
    pub message: String,
}

const PENDING_REVIEWER_MESSAGE: &str = "Reviewer account created successfully! Please wait for admin approval before you can access the system.";

/// Status checks applied to a regular login once the password matched.
fn check_login_allowed(user: &User) -> Result<(), AppError> {
    if user.role == Role::Admin {
        return Err(AppError::Forbidden(
            "Admin users must use admin login".to_string(),
        ));
    }
    if user.role == Role::Reviewer {
        match user.status {
            UserStatus::Pending => {
                return Err(AppError::Forbidden(
                    "Your reviewer account is pending approval. Please wait for admin approval."
                        .to_string(),
                ))
            }
            UserStatus::Rejected => {
                return Err(AppError::Forbidden(
                    "Your reviewer application has been rejected.".to_string(),
                ))
            }
            UserStatus::Active => {}
        }
    }
    if !user.is_active {
        return Err(AppError::Forbidden(
            "Your account has been deactivated. Please contact support.".to_string(),
        ));
    }
    Ok(())
}

fn credentials_present(email: &str, password: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    Ok(())
}

/// True when the credentials match the configured bootstrap admin.
fn is_bootstrap_admin(config: &Config, email: &str, password: &str) -> bool {
    match (&config.admin_email, &config.admin_password) {
        (Some(admin_email), Some(admin_password)) => {
            normalize_email(email) == *admin_email && password == admin_password
        }
        _ => false,
    }
}

/// POST /api/v1/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    validate_signup(&req.email, &req.password)?;
    if req.role == Role::Admin {
        return Err(AppError::Validation(
            "Admin accounts cannot be created through signup".to_string(),
        ));
    }

    if get_user_by_email(&state.db, &req.email).await?.is_some() {
        return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
    }

    let status = match req.role {
        Role::Reviewer => UserStatus::Pending,
        _ => UserStatus::Active,
    };
    let user = create_user(
        &state.db,
        &NewUser {
            email: req.email,
            password: req.password,
            role: req.role,
            status,
            profile_complete: false,
            name: None,
            is_active: true,
        },
    )
    .await
    .map_err(signup_error)?;

    let response = if user.role == Role::Reviewer {
        SignupResponse {
            user: None,
            redirect: routing::SIGN_IN,
            message: PENDING_REVIEWER_MESSAGE.to_string(),
        }
    } else {
        let redirect = landing_page(Some(&user));
        SignupResponse {
            user: Some(user),
            redirect,
            message: "Account created successfully".to_string(),
        }
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    credentials_present(&req.email, &req.password)?;

    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());
    let user = get_user_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;
    if user.password != req.password {
        warn!("Rejected login for user {}: wrong password", user.id);
        return Err(invalid());
    }
    check_login_allowed(&user)?;

    let user = touch_last_login(&state.db, user.id)
        .await?
        .ok_or_else(invalid)?;
    info!("User {} signed in", user.id);

    let redirect = landing_page(Some(&user));
    Ok(Json(SessionResponse { user, redirect }))
}

/// POST /api/v1/auth/admin/login
pub async fn handle_admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    credentials_present(&req.email, &req.password)?;

    let existing = get_user_by_email(&state.db, &req.email).await?;
    let invalid = || AppError::Unauthorized("Invalid admin credentials".to_string());

    let user = if is_bootstrap_admin(&state.config, &req.email, &req.password) {
        match existing {
            Some(user) if user.role == Role::Admin => user,
            Some(user) => {
                warn!("Bootstrap admin email is held by non-admin {}", user.id);
                return Err(invalid());
            }
            None => {
                info!("Creating bootstrap admin account");
                create_user(
                    &state.db,
                    &NewUser {
                        email: req.email.clone(),
                        password: req.password.clone(),
                        role: Role::Admin,
                        status: UserStatus::Active,
                        profile_complete: true,
                        name: Some("System Administrator".to_string()),
                        is_active: true,
                    },
                )
                .await?
            }
        }
    } else {
        let user = existing.ok_or_else(invalid)?;
        if user.password != req.password || user.role != Role::Admin {
            warn!("Rejected admin login for {}", user.id);
            return Err(invalid());
        }
        user
    };

    if !user.is_active {
        return Err(AppError::Forbidden(
            "Admin account has been deactivated".to_string(),
        ));
    }

    let user = touch_last_login(&state.db, user.id)
        .await?
        .ok_or_else(invalid)?;
    info!("Admin {} signed in", user.id);

    let redirect = landing_page(Some(&user));
    Ok(Json(SessionResponse { user, redirect }))
}

/// GET /api/v1/auth/session
pub async fn handle_session(CurrentUser(user): CurrentUser) -> Json<SessionResponse> {
    let redirect = landing_page(Some(&user));
    Json(SessionResponse { user, redirect })
}

#[derive(Deserialize)]
pub struct RouteQuery {
    pub page: Option<String>,
}

#[derive(Serialize)]
pub struct RouteResponse {
    pub page: String,
    #[serde(flatten)]
    pub access: Access,
    pub landing: &'static str,
}

/// GET /api/v1/auth/route?page=
pub async fn handle_route(
    MaybeUser(user): MaybeUser,
    Query(params): Query<RouteQuery>,
) -> Json<RouteResponse> {
    let page = params.page.unwrap_or_else(|| "/".to_string());
    let access = check_access(user.as_ref(), &page);
    Json(RouteResponse {
        landing: landing_page(user.as_ref()),
        access,
        page,
    })
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub completion: u8,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(CurrentUser(user): CurrentUser) -> Json<ProfileResponse> {
    let completion = profile_completion(&user);
    Json(ProfileResponse { user, completion })
}

/// PATCH /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = update_user(&state.db, user.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;
    info!("Profile updated for user {}", user.id);

    let completion = profile_completion(&user);
    Ok(Json(ProfileResponse { user, completion }))
}
