use chrono::Utc;
use sqlx::error::ErrorKind;

use super::{password, Member};

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_USERNAME_CHARS: usize = 150;

#[derive(Clone)]
pub struct LoginManager<'a> {
    pool: &'a sqlx::SqlitePool,
}

impl<'a> LoginManager<'a> {
    pub fn new(pool: &'a sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug)]
pub enum Error {
    UsernameTaken,
    WeakPassword,
    InvalidCredentials,
    Hash(argon2::password_hash::Error),
    Database(sqlx::Error),
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        Error::Database(value)
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(value: argon2::password_hash::Error) -> Self {
        Error::Hash(value)
    }
}

impl LoginManager<'_> {
    /// Creates a member with a hashed password. The EXISTS pre-check gives
    /// the common duplicate a clean answer; a racing insert still trips the
    /// unique index and maps to the same error.
    pub async fn register(&self, username: &str, password: &str) -> Result<Member, Error> {
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(Error::WeakPassword);
        }

        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT id FROM Member WHERE username = ?)",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?
            == 1;
        if taken {
            return Err(Error::UsernameTaken);
        }

        let password_hash = password::hash(password)?;
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO Member (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(&password_hash)
        .bind(created_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if matches!(
                e.as_database_error().map(|d| d.kind()),
                Some(ErrorKind::UniqueViolation)
            ) {
                Error::UsernameTaken
            } else {
                Error::Database(e)
            }
        })?;

        Ok(Member {
            id: result.last_insert_rowid(),
            username: username.to_owned(),
            password_hash,
            created_at,
        })
    }

    /// Unknown username and wrong password are indistinguishable to the
    /// caller, so a failed login never reveals which usernames exist.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Member, Error> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT id, username, password_hash, created_at FROM Member WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        match member {
            Some(member) if password::verify(password, &member.password_hash) => Ok(member),
            _ => Err(Error::InvalidCredentials),
        }
    }

    /// Removes a member together with their messages and sessions, in one
    /// transaction.
    pub async fn delete_member(&self, member: &Member) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM ChatMessage WHERE member_id = ?")
            .bind(member.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM MemberSession WHERE member_id = ?")
            .bind(member.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM Member WHERE id = ?")
            .bind(member.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    async fn ok_register_member(pool: sqlx::SqlitePool) {
        let member = LoginManager::new(&pool)
            .register("alice", "password1")
            .await
            .unwrap();
        assert_eq!(member.username, "alice");
        assert_ne!(member.password_hash, "password1");
        assert!(member.id > 0);
    }

    #[sqlx::test]
    async fn register_rejects_short_password(pool: sqlx::SqlitePool) {
        let manager = LoginManager::new(&pool);
        assert!(matches!(
            manager.register("alice", "seven77").await,
            Err(Error::WeakPassword)
        ));
        // Exactly eight characters is enough.
        assert!(manager.register("alice", "eight888").await.is_ok());
    }

    #[sqlx::test]
    async fn register_rejects_taken_username(pool: sqlx::SqlitePool) {
        let manager = LoginManager::new(&pool);
        manager.register("alice", "password1").await.unwrap();
        assert!(matches!(
            manager.register("alice", "password2").await,
            Err(Error::UsernameTaken)
        ));

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM Member WHERE username = ?")
            .bind("alice")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    async fn authenticate_unifies_unknown_and_wrong(pool: sqlx::SqlitePool) {
        let manager = LoginManager::new(&pool);
        manager.register("alice", "password1").await.unwrap();

        assert!(matches!(
            manager.authenticate("alice", "password2").await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            manager.authenticate("nobody", "password1").await,
            Err(Error::InvalidCredentials)
        ));
        assert!(manager.authenticate("alice", "password1").await.is_ok());
    }

    #[sqlx::test(fixtures("members", "messages", "sessions"))]
    async fn delete_member_removes_owned_rows(pool: sqlx::SqlitePool) {
        let member = sqlx::query_as::<_, Member>("SELECT * FROM Member WHERE username = ?")
            .bind("alice")
            .fetch_one(&pool)
            .await
            .unwrap();

        LoginManager::new(&pool).delete_member(&member).await.unwrap();

        let messages = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM ChatMessage WHERE member_id = ?",
        )
        .bind(member.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(messages, 0);

        let sessions = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM MemberSession WHERE member_id = ?",
        )
        .bind(member.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(sessions, 0);

        // Other members keep their messages.
        let remaining = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ChatMessage")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 2);
    }
}
