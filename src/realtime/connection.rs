use crate::error::AppResult;
use crate::message::ServerEvent;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::collections::HashSet;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

pub type WebSocketStreamType = WebSocketStream<TcpStream>;

/// Per-connection state: the outbound socket half, the hub-facing event
/// channel, and the set of rooms this connection has joined (for cleanup
/// when the socket goes away).
pub struct ConnectionHandler {
    ws_sender: SplitSink<WebSocketStreamType, WsMessage>,
    tx: mpsc::UnboundedSender<ServerEvent>,
    conn_id: Uuid,
    joined: HashSet<i64>,
    addr: SocketAddr,
}

impl ConnectionHandler {
    pub fn new(
        ws_sender: SplitSink<WebSocketStreamType, WsMessage>,
        tx: mpsc::UnboundedSender<ServerEvent>,
        addr: SocketAddr,
    ) -> Self {
        Self {
            ws_sender,
            tx,
            conn_id: Uuid::new_v4(),
            joined: HashSet::new(),
            addr,
        }
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    pub fn tx(&self) -> &mpsc::UnboundedSender<ServerEvent> {
        &self.tx
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn track_join(&mut self, report_id: i64) {
        self.joined.insert(report_id);
    }

    pub fn track_leave(&mut self, report_id: i64) {
        self.joined.remove(&report_id);
    }

    /// Rooms still joined when the connection drops.
    pub fn joined_rooms(&self) -> impl Iterator<Item = i64> + '_ {
        self.joined.iter().copied()
    }

    pub async fn send_event(&mut self, event: &ServerEvent) -> AppResult<()> {
        let text = serde_json::to_string(event)?;
        self.ws_sender.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    pub async fn send_error(&mut self, code: &str, message: &str) {
        let error = ServerEvent::Error {
            code: code.to_string(),
            message: message.to_string(),
        };
        if self.send_event(&error).await.is_err() {
            tracing::debug!("Failed to send error to disconnected client {}", self.addr);
        }
    }

    pub fn ws_sender_mut(&mut self) -> &mut SplitSink<WebSocketStreamType, WsMessage> {
        &mut self.ws_sender
    }
}
