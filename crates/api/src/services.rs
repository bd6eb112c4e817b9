//! External service abstractions.
//!
//! Each service the API depends on sits behind a trait so handlers and the
//! story lifecycle can be tested with mocks.
//!
//! ## Services
//!
//! - **auth** - Caller identity from session cookies or bearer tokens (Clerk)
//! - **media** - File uploads and delivery URLs (ImageKit)
//!
//! ## Usage in Handlers
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let uploaded = state.media.upload(request).await?;
//!     let thumb = state.media.optimized_url(&uploaded.file_path, 1280);
//! }
//! ```

mod auth;
mod media;

pub use auth::{AuthFailure, AuthResolver, ClerkTokenVerifier, SessionClaims};
pub use media::{ImageKitMediaStore, MediaStore, UploadRequest};

#[cfg(test)]
pub use auth::{MockTokenVerifier, VerifiedToken};
#[cfg(test)]
pub use media::{MockMediaStore, UploadedMedia};
