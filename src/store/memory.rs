use super::{MessagePage, MessageQuery, MessageStats, MessageStore, ReadFilter};
use crate::address::Address;
use crate::error::AppResult;
use crate::message::{Message, NewMessage};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process message store.
///
/// Backs the server in development mode (no `DATABASE_URL`) and the
/// integration tests. The vector order is the conversation order: appends
/// clamp timestamps to be non-decreasing, so sorting is never needed.
#[derive(Default)]
pub struct MemoryMessageStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    messages: Vec<Message>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Whether `participant` may read this message: party to the conversation
/// per the message's own claims, and not its author.
fn received_by(msg: &Message, participant: &Address) -> bool {
    let is_party = &msg.reporter_address == participant
        || msg.collected_by.as_ref() == Some(participant);
    is_party && &msg.sender != participant
}

fn matches_since(msg: &Message, since: Option<DateTime<Utc>>) -> bool {
    since.map_or(true, |s| msg.timestamp >= s)
}

#[async_trait::async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, candidate: NewMessage) -> AppResult<Message> {
        let mut inner = self.inner.write().await;

        // Clock time, clamped so timestamps never go backwards within the
        // store. Ties are fine; insertion order breaks them.
        let now = Utc::now();
        let timestamp = match inner.last_timestamp {
            Some(last) if now < last => last,
            _ => now,
        };
        inner.last_timestamp = Some(timestamp);

        let message = Message {
            id: Uuid::new_v4(),
            report_id: candidate.report_id,
            sender: candidate.sender,
            content: candidate.content,
            is_from_agent: candidate.is_from_agent,
            reporter_address: candidate.reporter_address,
            collected_by: candidate.collected_by,
            timestamp,
            is_read: false,
        };
        inner.messages.push(message.clone());

        Ok(message)
    }

    async fn query(&self, query: MessageQuery) -> AppResult<MessagePage> {
        let inner = self.inner.read().await;

        let matching: Vec<&Message> = inner
            .messages
            .iter()
            .filter(|m| m.report_id == query.report_id && matches_since(m, query.since))
            .collect();

        let total = matching.len() as u64;
        let messages = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(MessagePage { messages, total })
    }

    async fn mark_read(&self, filter: ReadFilter, reader: &Address) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let mut modified = 0u64;

        for msg in inner.messages.iter_mut() {
            if msg.is_read || &msg.sender == reader {
                continue;
            }
            let matches = match &filter {
                ReadFilter::Report(report_id) => {
                    msg.report_id == *report_id && received_by(msg, reader)
                }
                ReadFilter::Ids(ids) => ids.contains(&msg.id),
            };
            if matches {
                msg.is_read = true;
                modified += 1;
            }
        }

        Ok(modified)
    }

    async fn count_unread(
        &self,
        participant: &Address,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .iter()
            .filter(|m| !m.is_read && received_by(m, participant) && matches_since(m, since))
            .count() as u64)
    }

    async fn stats(&self, participant: &Address) -> AppResult<MessageStats> {
        let inner = self.inner.read().await;

        let mut stats = MessageStats {
            total_sent: 0,
            total_received: 0,
            unread_count: 0,
        };
        for msg in &inner.messages {
            if &msg.sender == participant {
                stats.total_sent += 1;
            }
            if received_by(msg, participant) {
                stats.total_received += 1;
                if !msg.is_read {
                    stats.unread_count += 1;
                }
            }
        }

        Ok(stats)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
