//! Session cookie layer.
//!
//! Reads the `__session` cookie set by the Clerk frontend SDK, verifies it and
//! leaves [`SessionClaims`] in the request extensions for the `AuthUser`
//! extractor. Requests without a valid cookie pass through untouched.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "__session";

pub async fn attach_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());

    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && !cookie.value().is_empty()
        && let Some(claims) = state.auth.session_from_cookie(cookie.value()).await
    {
        request.extensions_mut().insert(claims);
    }

    next.run(request).await
}
