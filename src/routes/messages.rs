// ============================================================================
// Messages Routes
// ============================================================================
//
// Endpoints:
// - POST  /messages                    - Send a message to a report's conversation
// - GET   /messages/report/:report_id  - Page through a conversation
// - GET   /messages/unread/:address    - Unread count for the caller
// - PATCH /messages/read               - Mark messages as read
// - GET   /messages/stats/:address     - Message statistics for the caller
//
// ============================================================================

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::acl::{self, Participant};
use crate::address::Address;
use crate::config::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::context::AppContext;
use crate::error::AppError;
use crate::message::{MessageView, NewMessage, ServerEvent};
use crate::metrics;
use crate::routes::extractors::{AuthenticatedAddress, Json};
use crate::store::{MessageQuery, ReadFilter};
use crate::utils::log_safe_id;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub report_id: i64,
    pub sender: Address,
    pub content: String,
    pub is_from_agent: bool,
    pub reporter_address: Address,
    #[serde(default)]
    pub collected_by: Option<Address>,
}

/// POST /messages
/// Validates, authorizes, persists, then broadcasts. The broadcast only
/// happens after the append has durably succeeded.
pub async fn send_message(
    State(ctx): State<Arc<AppContext>>,
    caller: AuthenticatedAddress,
    Json(body): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let candidate = NewMessage::new(
        body.report_id,
        body.sender,
        &body.content,
        body.is_from_agent,
        body.reporter_address,
        body.collected_by,
    )?;

    if candidate.sender != caller.0 {
        return Err(AppError::forbidden(format!(
            "sender {} does not match authenticated address {}",
            candidate.sender, caller.0
        )));
    }

    let claims = acl::ReportClaims {
        reporter_address: candidate.reporter_address.clone(),
        collected_by: candidate.collected_by.clone(),
    };
    let participant = Participant {
        address: &candidate.sender,
        is_agent: candidate.is_from_agent,
    };
    if !acl::can_participate(&claims, &participant) {
        return Err(AppError::forbidden(format!(
            "{} is not a participant of report {}",
            candidate.sender, candidate.report_id
        )));
    }

    let report_id = candidate.report_id;
    let message = ctx.store.append(candidate).await?;
    metrics::MESSAGES_SENT_TOTAL.inc();

    let view = message.view();
    let delivered = ctx
        .hub
        .publish(report_id, ServerEvent::NewMessage { message: view.clone() })
        .await;
    metrics::BROADCASTS_TOTAL.inc_by(delivered as u64);

    let salt = &ctx.config.logging.hash_salt;
    if ctx.config.logging.enable_address_logging {
        tracing::info!(
            message_id = %message.id,
            report_id = report_id,
            sender = %message.sender,
            delivered = delivered,
            "Message sent"
        );
    } else {
        tracing::info!(
            message_id = %message.id,
            report_id = report_id,
            sender_hash = %log_safe_id(message.sender.as_str(), salt),
            delivered = delivered,
            "Message sent"
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": view,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub since: Option<DateTime<Utc>>,
    /// Asserted agent role for access evaluation, the read-side analogue
    /// of isFromAgent on sends.
    #[serde(default)]
    pub agent: bool,
}

/// GET /messages/report/:report_id
/// Ordered conversation page, oldest first, with pagination metadata.
pub async fn list_messages(
    State(ctx): State<Arc<AppContext>>,
    caller: AuthenticatedAddress,
    Path(report_id): Path<i64>,
    Query(params): Query<ListMessagesParams>,
) -> Result<impl IntoResponse, AppError> {
    if report_id < 1 {
        return Err(AppError::validation("reportId must be a positive integer"));
    }

    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit < 1 || limit > MAX_PAGE_LIMIT {
        return Err(AppError::validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    let offset = params.offset.unwrap_or(0);

    // Eligibility is evaluated against the first message's claims. An empty
    // conversation has nothing to protect and reads as an empty page.
    let first = ctx
        .store
        .query(MessageQuery { report_id, limit: 1, offset: 0, since: None })
        .await?;
    if let Some(first_message) = first.messages.first() {
        let participant = Participant {
            address: &caller.0,
            is_agent: params.agent,
        };
        if !acl::can_participate(&first_message.claims(), &participant) {
            return Err(AppError::forbidden(format!(
                "{} is not a participant of report {}",
                caller.0, report_id
            )));
        }
    }

    let page = ctx
        .store
        .query(MessageQuery { report_id, limit, offset, since: params.since })
        .await?;

    let messages: Vec<MessageView> = page.messages.iter().map(|m| m.view()).collect();
    let has_more = u64::from(offset) + u64::from(limit) < page.total;

    Ok(Json(json!({
        "success": true,
        "messages": messages,
        "pagination": {
            "total": page.total,
            "limit": limit,
            "offset": offset,
            "hasMore": has_more,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct UnreadParams {
    pub since: Option<DateTime<Utc>>,
}

/// GET /messages/unread/:address
pub async fn unread_count(
    State(ctx): State<Arc<AppContext>>,
    caller: AuthenticatedAddress,
    Path(address): Path<String>,
    Query(params): Query<UnreadParams>,
) -> Result<impl IntoResponse, AppError> {
    let requested = Address::parse(&address)?;
    let count = ctx
        .read_state
        .unread_count(&caller.0, &requested, params.since)
        .await?;

    Ok(Json(json!({
        "success": true,
        "unreadCount": count,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub report_id: Option<i64>,
    pub message_ids: Option<Vec<Uuid>>,
}

/// PATCH /messages/read
/// Marks matching, currently-unread, not-self-authored messages as read.
/// reportId takes precedence when both fields are present.
pub async fn mark_read(
    State(ctx): State<Arc<AppContext>>,
    caller: AuthenticatedAddress,
    Json(body): Json<MarkReadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let filter = match (body.report_id, body.message_ids) {
        (Some(report_id), _) => {
            if report_id < 1 {
                return Err(AppError::validation("reportId must be a positive integer"));
            }
            ReadFilter::Report(report_id)
        }
        (None, Some(ids)) => ReadFilter::Ids(ids),
        (None, None) => {
            return Err(AppError::validation(
                "Either reportId or messageIds must be provided",
            ));
        }
    };

    let modified = ctx.read_state.mark_read(&caller.0, filter).await?;

    Ok(Json(json!({
        "success": true,
        "modifiedCount": modified,
    })))
}

/// GET /messages/stats/:address
pub async fn message_stats(
    State(ctx): State<Arc<AppContext>>,
    caller: AuthenticatedAddress,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let requested = Address::parse(&address)?;
    let stats = ctx.read_state.stats(&caller.0, &requested).await?;

    Ok(Json(json!({
        "success": true,
        "stats": {
            "totalSent": stats.total_sent,
            "totalReceived": stats.total_received,
            "unreadCount": stats.unread_count,
        },
    })))
}
