//! Authenticated-identity extractor for Axum handlers.
//!
//! Authentication itself happens upstream at the API gateway, which strips
//! any client-supplied identity headers and injects `x-user-id` for
//! authenticated requests. This extractor only reads that trusted header;
//! requests reaching the service without it are rejected as unauthorized.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use opsdesk_core::error::CoreError;
use opsdesk_core::types::DbId;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the gateway-authenticated user id.
const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user identity, extracted from the gateway header.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The user's internal database id.
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<DbId>().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing or invalid x-user-id header".into(),
                ))
            })?;

        Ok(AuthUser { user_id })
    }
}
