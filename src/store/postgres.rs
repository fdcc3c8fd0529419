use super::{MessagePage, MessageQuery, MessageStats, MessageStore, ReadFilter};
use crate::address::Address;
use crate::config::DbConfig;
use crate::error::{AppError, AppResult};
use crate::message::{Message, NewMessage};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};
use std::time::Duration;
use uuid::Uuid;

pub type DbPool = Pool<Postgres>;

/// Durable message store on Postgres.
///
/// The `seq` bigserial column records insertion order; ordering by
/// `(timestamp, seq)` gives the conversation order with stable tie-breaks.
pub struct PgMessageStore {
    pool: DbPool,
}

impl PgMessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, config: &DbConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    report_id: i64,
    sender: String,
    content: String,
    is_from_agent: bool,
    reporter_address: String,
    collected_by: Option<String>,
    timestamp: DateTime<Utc>,
    is_read: bool,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> Result<Self, AppError> {
        Ok(Message {
            id: row.id,
            report_id: row.report_id,
            sender: Address::parse(&row.sender)?,
            content: row.content,
            is_from_agent: row.is_from_agent,
            reporter_address: Address::parse(&row.reporter_address)?,
            collected_by: row.collected_by.as_deref().map(Address::parse).transpose()?,
            timestamp: row.timestamp,
            is_read: row.is_read,
        })
    }
}

#[async_trait::async_trait]
impl MessageStore for PgMessageStore {
    async fn append(&self, candidate: NewMessage) -> AppResult<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, report_id, sender, content, is_from_agent, reporter_address, collected_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, report_id, sender, content, is_from_agent, reporter_address, collected_by, timestamp, is_read
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(candidate.report_id)
        .bind(candidate.sender.as_str())
        .bind(&candidate.content)
        .bind(candidate.is_from_agent)
        .bind(candidate.reporter_address.as_str())
        .bind(candidate.collected_by.as_ref().map(|a| a.as_str()))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn query(&self, query: MessageQuery) -> AppResult<MessagePage> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, report_id, sender, content, is_from_agent, reporter_address, collected_by, timestamp, is_read
            FROM messages
            WHERE report_id = $1
              AND ($2::timestamptz IS NULL OR timestamp >= $2)
            ORDER BY timestamp ASC, seq ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.report_id)
        .bind(query.since)
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE report_id = $1
              AND ($2::timestamptz IS NULL OR timestamp >= $2)
            "#,
        )
        .bind(query.report_id)
        .bind(query.since)
        .fetch_one(&self.pool)
        .await?;

        let messages = rows
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MessagePage { messages, total: total as u64 })
    }

    async fn mark_read(&self, filter: ReadFilter, reader: &Address) -> AppResult<u64> {
        let result = match filter {
            ReadFilter::Report(report_id) => {
                sqlx::query(
                    r#"
                    UPDATE messages
                    SET is_read = TRUE
                    WHERE report_id = $1
                      AND is_read = FALSE
                      AND sender <> $2
                      AND (reporter_address = $2 OR collected_by = $2)
                    "#,
                )
                .bind(report_id)
                .bind(reader.as_str())
                .execute(&self.pool)
                .await?
            }
            ReadFilter::Ids(ids) => {
                sqlx::query(
                    r#"
                    UPDATE messages
                    SET is_read = TRUE
                    WHERE id = ANY($1)
                      AND is_read = FALSE
                      AND sender <> $2
                    "#,
                )
                .bind(&ids)
                .bind(reader.as_str())
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn count_unread(
        &self,
        participant: &Address,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE (reporter_address = $1 OR collected_by = $1)
              AND sender <> $1
              AND is_read = FALSE
              AND ($2::timestamptz IS NULL OR timestamp >= $2)
            "#,
        )
        .bind(participant.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn stats(&self, participant: &Address) -> AppResult<MessageStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE sender = $1) AS total_sent,
                COUNT(*) FILTER (
                    WHERE (reporter_address = $1 OR collected_by = $1) AND sender <> $1
                ) AS total_received,
                COUNT(*) FILTER (
                    WHERE (reporter_address = $1 OR collected_by = $1)
                      AND sender <> $1
                      AND is_read = FALSE
                ) AS unread_count
            FROM messages
            "#,
        )
        .bind(participant.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(MessageStats {
            total_sent: row.get::<i64, _>("total_sent") as u64,
            total_received: row.get::<i64, _>("total_received") as u64,
            unread_count: row.get::<i64, _>("unread_count") as u64,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
