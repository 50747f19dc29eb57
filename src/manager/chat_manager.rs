use chrono::Utc;

use super::{ChatMessageView, Member};

pub const MAX_MESSAGE_CHARS: usize = 1000;

pub struct ChatManager<'a> {
    pool: &'a sqlx::SqlitePool,
}

impl<'a> ChatManager<'a> {
    pub fn new(pool: &'a sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug)]
pub enum Error {
    Blank,
    TooLong,
    Database(sqlx::Error),
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        Error::Database(value)
    }
}

impl ChatManager<'_> {
    /// Stores the trimmed text under the given author and echoes the
    /// denormalized view back without a second query.
    pub async fn post(&self, member: &Member, raw_text: &str) -> Result<ChatMessageView, Error> {
        let text = raw_text.trim();
        if text.is_empty() {
            return Err(Error::Blank);
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(Error::TooLong);
        }

        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO ChatMessage (member_id, text, created_at) VALUES (?, ?, ?)",
        )
        .bind(member.id)
        .bind(text)
        .bind(created_at)
        .execute(self.pool)
        .await?;

        Ok(ChatMessageView {
            id: result.last_insert_rowid(),
            text: text.to_owned(),
            created_at,
            member_id: member.id,
            member_username: member.username.clone(),
        })
    }

    /// Oldest first; id breaks timestamp ties so order follows creation.
    pub async fn list(&self) -> Result<Vec<ChatMessageView>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessageView>(
            "SELECT c.id, c.text, c.created_at, c.member_id, m.username AS member_username \
             FROM ChatMessage c JOIN Member m ON m.id = c.member_id \
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .fetch_all(self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn member(pool: &sqlx::SqlitePool, username: &str) -> Member {
        sqlx::query_as::<_, Member>("SELECT * FROM Member WHERE username = ?")
            .bind(username)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(fixtures("members"))]
    async fn post_trims_surrounding_whitespace(pool: sqlx::SqlitePool) {
        let alice = member(&pool, "alice").await;
        let posted = ChatManager::new(&pool).post(&alice, "  hi  ").await.unwrap();
        assert_eq!(posted.text, "hi");

        let listed = ChatManager::new(&pool).list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "hi");
        assert_eq!(listed[0].member_username, "alice");
    }

    #[sqlx::test(fixtures("members"))]
    async fn post_rejects_blank_text(pool: sqlx::SqlitePool) {
        let alice = member(&pool, "alice").await;
        assert!(matches!(
            ChatManager::new(&pool).post(&alice, "   ").await,
            Err(Error::Blank)
        ));
    }

    #[sqlx::test(fixtures("members"))]
    async fn post_enforces_length_boundary(pool: sqlx::SqlitePool) {
        let alice = member(&pool, "alice").await;
        let manager = ChatManager::new(&pool);

        assert!(matches!(
            manager.post(&alice, &"a".repeat(1001)).await,
            Err(Error::TooLong)
        ));

        let posted = manager.post(&alice, &"a".repeat(1000)).await.unwrap();
        assert_eq!(posted.text.chars().count(), 1000);
    }

    #[sqlx::test(fixtures("members", "messages"))]
    async fn list_orders_by_creation_time_with_id_tiebreak(pool: sqlx::SqlitePool) {
        let texts: Vec<String> = ChatManager::new(&pool)
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["first", "second", "third", "fourth"]);
    }
}
