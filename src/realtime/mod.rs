// ============================================================================
// Realtime Channel - Room-Scoped Live Fan-Out
// ============================================================================
//
// One WebSocket connection per client. Clients join and leave report rooms
// explicitly; the gateway publishes each persisted message to its report's
// room. Delivery is at-most-once and best-effort - a client that is not
// joined misses the event and recovers by re-fetching history over REST.
// Dropping the socket revokes all room memberships; no explicit leave is
// required for cleanup.
//
// ============================================================================

mod connection;

pub use connection::{ConnectionHandler, WebSocketStreamType};

use crate::config::MAX_REALTIME_FRAME_SIZE;
use crate::context::AppContext;
use crate::message::ClientEvent;
use crate::metrics;
use futures_util::StreamExt;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Accept loop for the realtime listener.
pub async fn run_realtime_server(ctx: AppContext, listener: TcpListener) {
    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to accept socket: {}", e);
                continue;
            }
        };

        let ctx = ctx.clone();

        tokio::spawn(async move {
            if let Ok(ws_stream) = accept_async(socket).await {
                handle_connection(ws_stream, addr, ctx).await;
            }
        });
    }
}

pub async fn handle_connection(ws_stream: WebSocketStreamType, addr: SocketAddr, ctx: AppContext) {
    metrics::CONNECTIONS_TOTAL.inc();
    tracing::info!("New connection from: {}", addr);

    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut handler = ConnectionHandler::new(ws_sender, tx, addr);

    loop {
        tokio::select! {
            Some(msg) = ws_receiver.next() => {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        if text.len() > MAX_REALTIME_FRAME_SIZE {
                            tracing::warn!("Oversized frame from {}", addr);
                            handler.send_error("FRAME_TOO_LARGE", "Frame exceeds size limit").await;
                            continue;
                        }

                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(ClientEvent::JoinReport { report_id }) => {
                                if report_id < 1 {
                                    handler.send_error("INVALID_REPORT_ID", "reportId must be a positive integer").await;
                                    continue;
                                }
                                ctx.hub.join(report_id, handler.conn_id(), handler.tx().clone()).await;
                                handler.track_join(report_id);
                            }

                            Ok(ClientEvent::LeaveReport { report_id }) => {
                                ctx.hub.leave(report_id, handler.conn_id()).await;
                                handler.track_leave(report_id);
                            }

                            Err(e) => {
                                tracing::warn!("Failed to parse event from {}: {}", addr, e);
                                handler.send_error("INVALID_FORMAT", "Invalid event format").await;
                            }
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        tracing::info!("Connection closed by client: {}", addr);
                        break;
                    }
                    Ok(WsMessage::Ping(data)) => {
                        use futures_util::SinkExt;
                        let _ = handler.ws_sender_mut().send(WsMessage::Pong(data)).await;
                    }
                    Err(e) => {
                        tracing::error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    _ => {}
                }
            }

            Some(event) = rx.recv() => {
                if handler.send_event(&event).await.is_err() {
                    break;
                }
            }
        }
    }

    // Socket is gone; revoke whatever memberships are left.
    let joined: Vec<i64> = handler.joined_rooms().collect();
    for report_id in joined {
        ctx.hub.leave(report_id, handler.conn_id()).await;
    }
    tracing::info!("Connection closed: {}", addr);
}
