use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod chat_manager;
pub mod login_manager;
pub mod password;
pub mod session_manager;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Member {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public shape of a member. Never carries the password hash.
#[derive(Serialize, Debug, Clone)]
pub struct MemberView {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Member> for MemberView {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            username: member.username.clone(),
            created_at: member.created_at,
        }
    }
}

/// A message annotated with its author, as returned by the chat endpoints.
#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct ChatMessageView {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub member_id: i64,
    pub member_username: String,
}
