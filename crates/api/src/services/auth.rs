//! Caller identity resolution.
//!
//! A caller proves who they are in one of two ways:
//! 1. a Clerk session cookie, verified upstream by the session middleware
//!    which leaves [`SessionClaims`] on the request, or
//! 2. an `Authorization: Bearer <token>` header carrying a session token.
//!
//! Session claims win when both are present. Failing both, the caller is
//! unauthenticated; the reason is logged, never returned.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::clerk;

/// Identity carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
}

/// Verifies session tokens issued by the identity provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a token and return the identity it names.
    async fn verify(&self, token: &str) -> Result<VerifiedToken>;
}

/// Clerk implementation of TokenVerifier.
pub struct ClerkTokenVerifier {
    client: clerk::Client,
}

impl ClerkTokenVerifier {
    pub fn new(client: clerk::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenVerifier for ClerkTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let claims = self
            .client
            .verify_token(token)
            .map_err(|e| anyhow::anyhow!("Clerk verification failed: {}", e))?;

        Ok(VerifiedToken {
            subject: claims.sub,
        })
    }
}

/// Claims established by the session middleware from the `__session` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("user not authenticated")]
    Unauthenticated,
}

#[derive(Clone)]
pub struct AuthResolver {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthResolver {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Turn a session cookie value into claims, or `None` if it does not verify.
    pub async fn session_from_cookie(&self, token: &str) -> Option<SessionClaims> {
        match self.verifier.verify(token).await {
            Ok(verified) => Some(SessionClaims {
                user_id: verified.subject,
            }),
            Err(e) => {
                tracing::debug!(error = %e, "session cookie rejected");
                None
            }
        }
    }

    /// Resolve the caller's identity.
    ///
    /// Non-empty session claims are returned as-is without touching the
    /// verifier. Otherwise a `Bearer ` token (case-sensitive prefix) is
    /// verified. Everything else is `Unauthenticated`.
    pub async fn resolve(
        &self,
        session: Option<&SessionClaims>,
        headers: &HeaderMap,
    ) -> Result<String, AuthFailure> {
        if let Some(claims) = session
            && !claims.user_id.is_empty()
        {
            return Ok(claims.user_id.clone());
        }

        let Some(token) = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            tracing::debug!("no session and no bearer token");
            return Err(AuthFailure::Unauthenticated);
        };

        match self.verifier.verify(token).await {
            Ok(verified) if !verified.subject.is_empty() => Ok(verified.subject),
            Ok(_) => {
                tracing::warn!("bearer token verified without a subject");
                Err(AuthFailure::Unauthenticated)
            }
            Err(e) => {
                tracing::warn!(error = %e, "bearer token verification failed");
                Err(AuthFailure::Unauthenticated)
            }
        }
    }
}
