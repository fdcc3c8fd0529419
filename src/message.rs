use crate::address::Address;
use crate::config::MAX_CONTENT_CHARS;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored conversation message.
///
/// Immutable once created, except `is_read` which only ever transitions
/// false -> true through the read-state tracker. `reporter_address`,
/// `collected_by` and `is_from_agent` are caller-supplied claims carried
/// alongside the message; access decisions are recomputed from them.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub report_id: i64,
    pub sender: Address,
    pub content: String,
    pub is_from_agent: bool,
    pub reporter_address: Address,
    pub collected_by: Option<Address>,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    /// The claim set this message carries, used for access decisions.
    pub fn claims(&self) -> crate::acl::ReportClaims {
        crate::acl::ReportClaims {
            reporter_address: self.reporter_address.clone(),
            collected_by: self.collected_by.clone(),
        }
    }

    /// The public wire form of this message.
    pub fn view(&self) -> MessageView {
        MessageView {
            message_id: self.id,
            report_id: self.report_id,
            sender: self.sender.clone(),
            content: self.content.clone(),
            is_from_agent: self.is_from_agent,
            timestamp: self.timestamp,
        }
    }
}

/// A validated message candidate, ready for the store to persist.
///
/// The store assigns `id` and `timestamp` at append time.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub report_id: i64,
    pub sender: Address,
    pub content: String,
    pub is_from_agent: bool,
    pub reporter_address: Address,
    pub collected_by: Option<Address>,
}

impl NewMessage {
    /// Validates report id and content bounds; stores the content trimmed.
    pub fn new(
        report_id: i64,
        sender: Address,
        content: &str,
        is_from_agent: bool,
        reporter_address: Address,
        collected_by: Option<Address>,
    ) -> AppResult<Self> {
        if report_id < 1 {
            return Err(AppError::validation("reportId must be a positive integer"));
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::validation("content must not be empty"));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(AppError::validation(format!(
                "content must be at most {} characters",
                MAX_CONTENT_CHARS
            )));
        }

        Ok(Self {
            report_id,
            sender,
            content: content.to_string(),
            is_from_agent,
            reporter_address,
            collected_by,
        })
    }
}

/// Public wire form of a message. The read flag and the access claims stay
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub message_id: Uuid,
    pub report_id: i64,
    pub sender: Address,
    pub content: String,
    pub is_from_agent: bool,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Realtime Events
// ============================================================================

/// Client -> server frames on the realtime channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinReport { report_id: i64 },
    #[serde(rename_all = "camelCase")]
    LeaveReport { report_id: i64 },
}

/// Server -> client frames on the realtime channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    NewMessage { message: MessageView },
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(fill: char) -> Address {
        Address::parse(&format!("0x{}", fill.to_string().repeat(40))).unwrap()
    }

    fn candidate(content: &str) -> AppResult<NewMessage> {
        NewMessage::new(1, addr('1'), content, false, addr('1'), None)
    }

    #[test]
    fn content_is_stored_trimmed() {
        let msg = candidate("  hello there  ").unwrap();
        assert_eq!(msg.content, "hello there");
    }

    #[test]
    fn rejects_empty_and_whitespace_only_content() {
        assert!(candidate("").is_err());
        assert!(candidate("   \n\t ").is_err());
    }

    #[test]
    fn content_boundary_at_500_chars() {
        let ok = "a".repeat(500);
        let too_long = "a".repeat(501);
        assert!(candidate(&ok).is_ok());
        assert!(candidate(&too_long).is_err());
    }

    #[test]
    fn rejects_non_positive_report_id() {
        assert!(NewMessage::new(0, addr('1'), "hi", false, addr('1'), None).is_err());
        assert!(NewMessage::new(-7, addr('1'), "hi", false, addr('1'), None).is_err());
    }

    #[test]
    fn client_events_use_kebab_case_tags() {
        let join: ClientEvent =
            serde_json::from_str(r#"{"event":"join-report","reportId":42}"#).unwrap();
        assert!(matches!(join, ClientEvent::JoinReport { report_id: 42 }));

        let leave: ClientEvent =
            serde_json::from_str(r#"{"event":"leave-report","reportId":7}"#).unwrap();
        assert!(matches!(leave, ClientEvent::LeaveReport { report_id: 7 }));
    }

    #[test]
    fn new_message_event_serializes_with_view_payload() {
        let event = ServerEvent::NewMessage {
            message: MessageView {
                message_id: Uuid::nil(),
                report_id: 42,
                sender: addr('2'),
                content: "Front gate ok?".to_string(),
                is_from_agent: true,
                timestamp: Utc::now(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "new-message");
        assert_eq!(json["message"]["reportId"], 42);
        assert_eq!(json["message"]["isFromAgent"], true);
        assert!(json["message"].get("isRead").is_none());
    }
}
