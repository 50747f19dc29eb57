use std::fmt::Display;

use axum_extra::extract::cookie::Cookie;
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::Member;
use crate::error::ApiError;
use crate::SESSION_ID_KEY;

#[derive(sqlx::Type, Debug, Clone, PartialEq, Eq)]
#[sqlx(transparent)]
pub struct SessionId(pub String);

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub enum Error {
    DoesNotExist,
    Database(sqlx::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::DoesNotExist,
            _ => Error::Database(err),
        }
    }
}

fn random_session_id() -> SessionId {
    let mut rng = rand::thread_rng();
    SessionId(
        (0..32)
            .map(|_| rng.sample(Alphanumeric))
            .map(char::from)
            .collect::<String>(),
    )
}

/// The cookie carrying the session token. No max-age: lifetime is left to
/// the browser session and whatever sits in front of the server.
pub fn session_cookie(session_id: &SessionId) -> Cookie<'static> {
    Cookie::build(SESSION_ID_KEY, session_id.0.clone())
        .path("/")
        .http_only(true)
        .finish()
}

/// Per-request identity, resolved once by the session middleware and read
/// by every handler behind the auth gate.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    pub session_id: Option<SessionId>,
    pub member: Option<Member>,
}

impl AuthSession {
    pub fn require_member(&self) -> Result<&Member, ApiError> {
        self.member.as_ref().ok_or(ApiError::Unauthenticated)
    }
}

#[derive(Clone)]
pub struct SessionManager<'a> {
    pool: &'a sqlx::SqlitePool,
}

impl<'a> SessionManager<'a> {
    pub fn new(pool: &'a sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

impl SessionManager<'_> {
    /// A token that is unknown, or bound to a member that no longer exists,
    /// reports `DoesNotExist` either way.
    pub async fn get_member(&self, session_id: &SessionId) -> Result<Member, Error> {
        Ok(sqlx::query_as::<_, Member>(
            "SELECT id, username, password_hash, created_at FROM Member \
             WHERE id = (SELECT member_id FROM MemberSession WHERE session_id = ?)",
        )
        .bind(session_id)
        .fetch_one(self.pool)
        .await?)
    }

    pub async fn create_for(&self, member: &Member) -> Result<SessionId, sqlx::Error> {
        let sid = random_session_id();
        sqlx::query("INSERT INTO MemberSession (session_id, member_id) VALUES (?, ?)")
            .bind(&sid)
            .bind(member.id)
            .execute(self.pool)
            .await?;
        Ok(sid)
    }

    /// Drops the member binding. A cleared token afterwards resolves like
    /// any unknown one.
    pub async fn clear(&self, session_id: &SessionId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM MemberSession WHERE session_id = ?")
            .bind(session_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(fixtures("members", "sessions"))]
    async fn ok_get_member(pool: sqlx::SqlitePool) {
        let member = SessionManager::new(&pool)
            .get_member(&SessionId("f15wQrWboFNBWseGzfOgPzvzdIaXlK5x".into()))
            .await
            .unwrap();
        assert_eq!(member.username, "alice");
    }

    #[sqlx::test]
    async fn unknown_token_does_not_exist(pool: sqlx::SqlitePool) {
        assert!(matches!(
            SessionManager::new(&pool)
                .get_member(&SessionId("nope".into()))
                .await,
            Err(Error::DoesNotExist)
        ));
    }

    #[sqlx::test(fixtures("members", "sessions"))]
    async fn token_bound_to_vanished_member_does_not_exist(pool: sqlx::SqlitePool) {
        assert!(matches!(
            SessionManager::new(&pool)
                .get_member(&SessionId("dangling0000000000000000000000dd".into()))
                .await,
            Err(Error::DoesNotExist)
        ));
    }

    #[sqlx::test(fixtures("members"))]
    async fn ok_create_then_clear(pool: sqlx::SqlitePool) {
        let member = sqlx::query_as::<_, Member>("SELECT * FROM Member WHERE username = ?")
            .bind("alice")
            .fetch_one(&pool)
            .await
            .unwrap();

        let manager = SessionManager::new(&pool);
        let sid = manager.create_for(&member).await.unwrap();
        assert_eq!(manager.get_member(&sid).await.unwrap().id, member.id);

        manager.clear(&sid).await.unwrap();
        assert!(matches!(
            manager.get_member(&sid).await,
            Err(Error::DoesNotExist)
        ));
    }

    #[sqlx::test(fixtures("members"))]
    async fn each_login_gets_a_fresh_token(pool: sqlx::SqlitePool) {
        let member = sqlx::query_as::<_, Member>("SELECT * FROM Member WHERE username = ?")
            .bind("alice")
            .fetch_one(&pool)
            .await
            .unwrap();

        let manager = SessionManager::new(&pool);
        let first = manager.create_for(&member).await.unwrap();
        let second = manager.create_for(&member).await.unwrap();
        assert_ne!(first, second);
    }
}
