//! Clerk session token verification.
//!
//! Session tokens are RS256 JWTs signed by the Clerk instance. They are
//! verified locally against the instance's PEM public key ("networkless"
//! verification), so no request leaves the process.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

#[derive(Clone)]
pub struct Client {
    key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl Client {
    pub fn new(
        public_key_pem: &str,
        issuer: Option<&str>,
        authorized_parties: Vec<String>,
    ) -> Result<Self, Error> {
        let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| Error::Key(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 5;
        validation.validate_nbf = true;
        // Clerk scopes tokens with `azp`, not `aud`.
        validation.validate_aud = false;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            key,
            validation,
            authorized_parties,
        })
    }

    /// Verify a session token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, Error> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| Error::Invalid(e.to_string()))?;
        let claims = data.claims;

        if !self.authorized_parties.is_empty()
            && let Some(azp) = claims.azp.as_deref()
            && !self.authorized_parties.iter().any(|p| p == azp)
        {
            return Err(Error::UnauthorizedParty(azp.to_string()));
        }

        if claims.sub.is_empty() {
            return Err(Error::Invalid("empty subject".to_string()));
        }

        Ok(claims)
    }
}

#[derive(Debug)]
pub enum Error {
    Key(String),
    Invalid(String),
    UnauthorizedParty(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Key(e) => write!(f, "invalid public key: {}", e),
            Error::Invalid(e) => write!(f, "invalid token: {}", e),
            Error::UnauthorizedParty(azp) => write!(f, "unauthorized party: {}", azp),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Clerk user id.
    pub sub: String,
    /// Session id.
    pub sid: Option<String>,
    /// Origin that requested the token.
    pub azp: Option<String>,
}
