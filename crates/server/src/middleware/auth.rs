//! Bearer token extractors.
//!
//! Handlers that need a caller take one of these extractors and pass the
//! [`Principal`] it yields into the tracking service.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use crate::models::Principal;
use crate::services::auth::{AuthError, bearer_token};
use crate::state::AppState;

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(
///     State(state): State<AppState>,
///     RequireAuth(principal): RequireAuth,
/// ) -> Result<Json<Vec<OrderView>>> {
///     let orders = state.tracking().orders_for(&principal).await?;
///     // ...
/// }
/// ```
pub struct RequireAuth(pub Principal);

/// Extractor that requires a valid access token with the admin role.
pub struct RequireAdmin(pub Principal);

/// Error returned when the caller is not authenticated or not allowed.
#[derive(Debug)]
pub enum AuthRejection {
    /// Missing, malformed, forged or expired token.
    Unauthorized(AuthError),
    /// Valid token without the admin role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized(err) => {
                tracing::debug!(error = %err, "Rejected access token");
                let mut response = (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Authentication required" })),
                )
                    .into_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer"),
                );
                response
            }
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Admin role required" })),
            )
                .into_response(),
        }
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<Principal, AuthRejection> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthRejection::Unauthorized(AuthError::Missing))?
        .to_str()
        .map_err(|e| AuthRejection::Unauthorized(AuthError::Malformed(e.to_string())))?;

    let token = bearer_token(header_value).map_err(AuthRejection::Unauthorized)?;
    let principal = state
        .tokens()
        .verify(token, Utc::now())
        .map_err(AuthRejection::Unauthorized)?;

    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(principal.user_id.to_string()),
            ..Default::default()
        }));
    });
    tracing::Span::current().record("user_id", principal.user_id.as_i32());

    Ok(principal)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, state)?;
        if principal.is_admin() {
            Ok(Self(principal))
        } else {
            tracing::warn!(user_id = %principal.user_id, path = %parts.uri.path(), "Non-admin denied");
            Err(AuthRejection::Forbidden)
        }
    }
}
