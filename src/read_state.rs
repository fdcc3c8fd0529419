use crate::address::Address;
use crate::error::{AppError, AppResult};
use crate::store::{MessageStats, MessageStore, ReadFilter};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Read-state facade over the message store.
///
/// Holds no state of its own; its job is to enforce that a caller can only
/// query counts or mark messages as read for themself.
#[derive(Clone)]
pub struct ReadStateTracker {
    store: Arc<dyn MessageStore>,
}

impl ReadStateTracker {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    fn require_self(caller: &Address, requested: &Address) -> AppResult<()> {
        if caller != requested {
            return Err(AppError::forbidden(format!(
                "caller {} requested read state of {}",
                caller, requested
            )));
        }
        Ok(())
    }

    /// Unread count for `requested`, which must be the caller's own address.
    pub async fn unread_count(
        &self,
        caller: &Address,
        requested: &Address,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        Self::require_self(caller, requested)?;
        self.store.count_unread(caller, since).await
    }

    /// Marks matching unread messages as read on behalf of the caller.
    /// Idempotent; a repeat call modifies nothing.
    pub async fn mark_read(&self, caller: &Address, filter: ReadFilter) -> AppResult<u64> {
        self.store.mark_read(filter, caller).await
    }

    /// Message statistics for `requested`, which must be the caller's own
    /// address.
    pub async fn stats(&self, caller: &Address, requested: &Address) -> AppResult<MessageStats> {
        Self::require_self(caller, requested)?;
        self.store.stats(caller).await
    }
}
