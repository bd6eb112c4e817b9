//! Authentication extractor.
//!
//! Usage: Add `AuthUser` as an extractor parameter to require authentication.
//! The identity comes from session claims left by the session layer, or else
//! from a bearer token.
//!
//! ```ignore
//! async fn my_handler(user: AuthUser, ...) -> ... {
//!     // user.id is available here
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, services::SessionClaims, state::AppState};

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let session = parts.extensions.get::<SessionClaims>();
        let id = state.auth.resolve(session, &parts.headers).await?;

        let user = AuthUser { id };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
