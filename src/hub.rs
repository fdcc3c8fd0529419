use crate::message::ServerEvent;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Room-scoped broadcast hub for the realtime channel.
///
/// One room exists implicitly per report id; membership is a connection's
/// outbound event channel keyed by its connection id. Delivery is
/// at-most-once and best-effort: a member whose channel is closed is
/// silently pruned, and clients recover missed events by re-fetching
/// history. The lock serializes membership changes against publishes;
/// different rooms carry no ordering dependency on each other.
#[derive(Default)]
pub struct BroadcastHub {
    rooms: RwLock<HashMap<i64, HashMap<Uuid, mpsc::UnboundedSender<ServerEvent>>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins a connection to a report's room, creating the room if needed.
    pub async fn join(
        &self,
        report_id: i64,
        conn_id: Uuid,
        tx: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let mut rooms = self.rooms.write().await;
        rooms.entry(report_id).or_default().insert(conn_id, tx);
        tracing::debug!(report_id = report_id, conn_id = %conn_id, "Joined report room");
    }

    /// Removes a connection from a report's room; empty rooms are dropped.
    pub async fn leave(&self, report_id: i64, conn_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(&report_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                rooms.remove(&report_id);
            }
            tracing::debug!(report_id = report_id, conn_id = %conn_id, "Left report room");
        }
    }

    /// Fans an event out to every current member of the report's room.
    /// Returns the number of members the event was handed to; send failures
    /// mean the connection is gone and its membership is pruned.
    pub async fn publish(&self, report_id: i64, event: ServerEvent) -> usize {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(&report_id) else {
            return 0;
        };

        let mut delivered = 0;
        members.retain(|_, tx| match tx.send(event.clone()) {
            Ok(_) => {
                delivered += 1;
                true
            }
            Err(_) => false,
        });
        if members.is_empty() {
            rooms.remove(&report_id);
        }

        delivered
    }

    /// Current member count of a room; zero if the room does not exist.
    pub async fn room_size(&self, report_id: i64) -> usize {
        self.rooms
            .read()
            .await
            .get(&report_id)
            .map_or(0, |members| members.len())
    }
}
