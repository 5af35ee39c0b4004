use crate::error::{AppError, AppResult};
use crate::models::{ConversationKey, Message, ReadState};
use crate::repository::{InsertOutcome, MessageRepository, SingleReadOutcome, SummaryParts};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

macro_rules! message_columns {
    () => {
        "id, sender_username, recipient_username, content, sent_at, read_at"
    };
}

/// Message log stored in the `chat_messages` table.
///
/// Read transitions are single `UPDATE ... WHERE read_at IS NULL`
/// statements, so concurrent readers never both win the same row.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: Pool,
}

impl PgMessageRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn message_from_row(row: &Row) -> Message {
    Message {
        id: row.get("id"),
        sender_username: row.get("sender_username"),
        recipient_username: row.get("recipient_username"),
        text: row.get("content"),
        sent_at: row.get("sent_at"),
        read_state: ReadState::from(row.get::<_, Option<DateTime<Utc>>>("read_at")),
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: Message) -> AppResult<InsertOutcome> {
        let client = self.pool.get().await?;
        let key = message.conversation_key();

        let inserted = client
            .query_opt(
                concat!(
                    r#"
                    INSERT INTO chat_messages (
                        id, sender_username, recipient_username,
                        user_low, user_high, content, sent_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (id) DO NOTHING
                    RETURNING "#,
                    message_columns!()
                ),
                &[
                    &message.id,
                    &message.sender_username,
                    &message.recipient_username,
                    &key.low,
                    &key.high,
                    &message.text,
                    &message.sent_at,
                ],
            )
            .await
            .map_err(|e| {
                tracing::error!(message_id = %message.id, error = %e, "insert message failed");
                AppError::from(e)
            })?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Inserted(message_from_row(&row)));
        }

        let existing = client
            .query_opt(
                concat!("SELECT ", message_columns!(), " FROM chat_messages WHERE id = $1"),
                &[&message.id],
            )
            .await?
            .ok_or_else(|| {
                AppError::Database(format!("message {} conflicted but is missing", message.id))
            })?;

        Ok(InsertOutcome::Existing(message_from_row(&existing)))
    }

    async fn conversation(&self, key: &ConversationKey) -> AppResult<Vec<Message>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                concat!(
                    r#"
                    SELECT "#,
                    message_columns!(),
                    r#"
                    FROM chat_messages
                    WHERE user_low = $1 AND user_high = $2
                    ORDER BY sent_at ASC, id ASC
                    "#
                ),
                &[&key.low, &key.high],
            )
            .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn summary_parts(
        &self,
        key: &ConversationKey,
        viewer: &str,
    ) -> AppResult<Option<SummaryParts>> {
        let client = self.pool.get().await?;
        let Some(last) = client
            .query_opt(
                concat!(
                    r#"
                    SELECT "#,
                    message_columns!(),
                    r#"
                    FROM chat_messages
                    WHERE user_low = $1 AND user_high = $2
                    ORDER BY sent_at DESC, id DESC
                    LIMIT 1
                    "#
                ),
                &[&key.low, &key.high],
            )
            .await?
        else {
            return Ok(None);
        };

        // Served by the partial unread index
        let unread = client
            .query(
                concat!(
                    r#"
                    SELECT "#,
                    message_columns!(),
                    r#"
                    FROM chat_messages
                    WHERE recipient_username = $3
                      AND user_low = $1
                      AND user_high = $2
                      AND read_at IS NULL
                    ORDER BY sent_at ASC, id ASC
                    "#
                ),
                &[&key.low, &key.high, &viewer],
            )
            .await?;

        Ok(Some(SummaryParts {
            last_message: message_from_row(&last),
            unread_messages: unread.iter().map(message_from_row).collect(),
        }))
    }

    async fn peers_of(&self, username: &str) -> AppResult<Vec<String>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT DISTINCT
                    CASE WHEN user_low = $1 THEN user_high ELSE user_low END AS peer
                FROM chat_messages
                WHERE user_low = $1 OR user_high = $1
                ORDER BY peer
                "#,
                &[&username],
            )
            .await?;

        Ok(rows.iter().map(|row| row.get("peer")).collect())
    }

    async fn mark_conversation_read(
        &self,
        key: &ConversationKey,
        reader: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Message>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                concat!(
                    r#"
                    UPDATE chat_messages
                    SET read_at = GREATEST($4, sent_at)
                    WHERE user_low = $1
                      AND user_high = $2
                      AND recipient_username = $3
                      AND read_at IS NULL
                    RETURNING "#,
                    message_columns!()
                ),
                &[&key.low, &key.high, &reader, &at],
            )
            .await?;

        // RETURNING order is unspecified
        let mut transitioned: Vec<Message> = rows.iter().map(message_from_row).collect();
        transitioned.sort_by_key(|m| m.ordering_key());
        Ok(transitioned)
    }

    async fn mark_message_read(
        &self,
        key: &ConversationKey,
        reader: &str,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<SingleReadOutcome> {
        let client = self.pool.get().await?;
        let updated = client
            .query_opt(
                concat!(
                    r#"
                    UPDATE chat_messages
                    SET read_at = GREATEST($5, sent_at)
                    WHERE id = $1
                      AND user_low = $2
                      AND user_high = $3
                      AND recipient_username = $4
                      AND read_at IS NULL
                    RETURNING "#,
                    message_columns!()
                ),
                &[&message_id, &key.low, &key.high, &reader, &at],
            )
            .await?;

        if let Some(row) = updated {
            return Ok(SingleReadOutcome::Transitioned(message_from_row(&row)));
        }

        let existing = client
            .query_opt(
                concat!(
                    r#"
                    SELECT "#,
                    message_columns!(),
                    r#"
                    FROM chat_messages
                    WHERE id = $1
                      AND user_low = $2
                      AND user_high = $3
                      AND recipient_username = $4
                    "#
                ),
                &[&message_id, &key.low, &key.high, &reader],
            )
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(SingleReadOutcome::AlreadyRead(message_from_row(&existing)))
    }
}
