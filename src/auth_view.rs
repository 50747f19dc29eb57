use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::{ApiError, FieldErrors};
use crate::manager::login_manager::{LoginManager, MAX_USERNAME_CHARS, MIN_PASSWORD_CHARS};
use crate::manager::session_manager::{session_cookie, AuthSession, SessionManager};
use crate::manager::MemberView;
use crate::AppState;

#[derive(Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Presence/blank checks shared by both credential bodies. Returns the
/// trimmed username alongside the untouched password.
fn validate_credentials(
    username: &Option<String>,
    password: &Option<String>,
    errors: &mut FieldErrors,
) -> (Option<String>, Option<String>) {
    let username = match username {
        None => {
            errors.push("username", "This field is required.");
            None
        }
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                errors.push("username", "This field may not be blank.");
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
    };

    let password = match password {
        None => {
            errors.push("password", "This field is required.");
            None
        }
        Some(raw) if raw.is_empty() => {
            errors.push("password", "This field may not be blank.");
            None
        }
        Some(raw) => Some(raw.clone()),
    };

    (username, password)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::new();
    let (username, password) = validate_credentials(&body.username, &body.password, &mut errors);
    let (Some(username), Some(password)) = (username, password) else {
        return Err(errors.into());
    };

    if username.chars().count() > MAX_USERNAME_CHARS {
        errors.push(
            "username",
            format!("Ensure this field has no more than {MAX_USERNAME_CHARS} characters."),
        );
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.push(
            "password",
            format!("Password must be at least {MIN_PASSWORD_CHARS} characters long."),
        );
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let member = LoginManager::new(&state.pool)
        .register(&username, &password)
        .await?;
    let session_id = SessionManager::new(&state.pool).create_for(&member).await?;
    tracing::info!(member_id = member.id, "registered new member");

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(&session_id)),
        Json(MemberView::from(&member)),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::new();
    let (username, password) = validate_credentials(&body.username, &body.password, &mut errors);
    let (Some(username), Some(password)) = (username, password) else {
        return Err(errors.into());
    };

    let member = LoginManager::new(&state.pool)
        .authenticate(&username, &password)
        .await?;
    let session_id = SessionManager::new(&state.pool).create_for(&member).await?;
    tracing::debug!(member_id = member.id, "member logged in");

    Ok((
        StatusCode::OK,
        jar.add(session_cookie(&session_id)),
        Json(MemberView::from(&member)),
    ))
}

pub async fn me(Extension(auth): Extension<AuthSession>) -> Result<Json<MemberView>, ApiError> {
    let member = auth.require_member()?;
    Ok(Json(MemberView::from(member)))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Result<StatusCode, ApiError> {
    auth.require_member()?;
    if let Some(session_id) = &auth.session_id {
        SessionManager::new(&state.pool).clear(session_id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
