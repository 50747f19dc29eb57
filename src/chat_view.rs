use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::error::{ApiError, FieldErrors};
use crate::manager::chat_manager::ChatManager;
use crate::manager::session_manager::AuthSession;
use crate::manager::ChatMessageView;
use crate::AppState;

fn empty_text() -> serde_json::Value {
    serde_json::Value::String(String::new())
}

/// `text` stays a raw JSON value so a non-string gets a field error instead
/// of a deserialization failure. An absent field counts as blank.
#[derive(Deserialize)]
pub struct PostMessageBody {
    #[serde(default = "empty_text")]
    text: serde_json::Value,
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Result<Json<Vec<ChatMessageView>>, ApiError> {
    auth.require_member()?;
    let messages = ChatManager::new(&state.pool).list().await?;
    Ok(Json(messages))
}

pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Json(body): Json<PostMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let member = auth.require_member()?;

    let serde_json::Value::String(text) = body.text else {
        return Err(FieldErrors::single("text", "This field must be a string.").into());
    };

    let message = ChatManager::new(&state.pool).post(member, &text).await?;
    tracing::debug!(member_id = member.id, message_id = message.id, "message posted");
    Ok((StatusCode::CREATED, Json(message)))
}
