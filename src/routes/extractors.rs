// ============================================================================
// Axum Extractors
// ============================================================================
//
// Custom extractors for Axum routes:
// - AuthenticatedAddress: the caller's wallet address, as validated by the
//   upstream wallet-auth layer and forwarded in the x-wallet-address header
// - Json: request body extractor with validation-error semantics
//
// ============================================================================

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::address::Address;
use crate::error::AppError;

/// Header carrying the caller's authenticated wallet address.
///
/// Signature verification lives in the upstream auth collaborator; this
/// subsystem trusts the header completely and only normalizes its shape.
pub const WALLET_ADDRESS_HEADER: &str = "x-wallet-address";

/// Extractor for the caller's authenticated address.
///
/// Usage:
/// ```ignore
/// async fn handler(caller: AuthenticatedAddress, ...) -> Result<...> {
///     let address = caller.0;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedAddress(pub Address);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedAddress
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(WALLET_ADDRESS_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::validation(format!("{} header is required", WALLET_ADDRESS_HEADER))
            })?;

        Ok(AuthenticatedAddress(Address::parse(raw)?))
    }
}

/// JSON body extractor.
///
/// Wraps `axum::Json` so that an undeserializable body (a malformed address
/// field, a bad message id) surfaces as a validation error with a 400 status
/// and the usual error body, rather than axum's stock 422 rejection.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(AppError::validation(rejection.body_text())),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
