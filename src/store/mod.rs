mod memory;
mod postgres;

pub use memory::MemoryMessageStore;
pub use postgres::PgMessageStore;

use crate::address::Address;
use crate::error::AppResult;
use crate::message::{Message, NewMessage};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// An ordered page of a conversation plus the total match count, so callers
/// can derive pagination metadata.
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: u64,
}

/// Query over one report's conversation. `limit` and `offset` are validated
/// at the gateway; `since` constrains both the page and the total count.
#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub report_id: i64,
    pub limit: u32,
    pub offset: u32,
    pub since: Option<DateTime<Utc>>,
}

/// Which messages a mark-as-read call targets.
#[derive(Debug, Clone)]
pub enum ReadFilter {
    /// All of a report's messages the reader participates in
    /// (reporter or collector per the message's own claims).
    Report(i64),
    /// An explicit id list.
    Ids(Vec<Uuid>),
}

/// Per-participant message counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStats {
    pub total_sent: u64,
    pub total_received: u64,
    pub unread_count: u64,
}

/// Durable, append-only message log.
///
/// Implementations must keep timestamps monotonically non-decreasing with
/// insertion order and preserve insertion order among equal timestamps, so
/// the conversation order is stable. Only the read flag is ever mutated,
/// and only false -> true.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Persists a new message, assigning id and timestamp.
    async fn append(&self, candidate: NewMessage) -> AppResult<Message>;

    /// Returns the ordered slice `[offset, offset + limit)` of the
    /// conversation, oldest first. An offset past the end yields an empty
    /// page, not an error.
    async fn query(&self, query: MessageQuery) -> AppResult<MessagePage>;

    /// Sets the read flag on matching, currently-unread messages not
    /// authored by `reader`. Idempotent; returns the number of messages
    /// actually modified.
    async fn mark_read(&self, filter: ReadFilter, reader: &Address) -> AppResult<u64>;

    /// Counts unread messages `participant` is eligible to read (reporter
    /// or collector per each message's claims) and did not author.
    async fn count_unread(
        &self,
        participant: &Address,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<u64>;

    /// Sent/received/unread counters for a participant.
    async fn stats(&self, participant: &Address) -> AppResult<MessageStats>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> AppResult<()>;
}
