//! Credential issuance and verification.
//!
//! # Responsibilities
//! - Define the verification capability the authenticator depends on
//! - Define the issuance capability used by the sign-in flow
//! - Provide an HS256 JWT implementation of both
//!
//! # Design Decisions
//! - The authenticator only sees `TokenVerifier`; the signing scheme can change
//!   without touching the pipeline
//! - Verification errors stay internal; callers only learn "unauthenticated"

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::identity::CallerIdentity;
use crate::config::AuthConfig;

/// Token claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: u64,
    pub exp: u64,
    pub iss: String,
}

/// Why a credential was rejected. Logged, never rendered.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("credential expired")]
    Expired,
    #[error("invalid signature")]
    BadSignature,
    #[error("malformed credential: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => VerificationError::Expired,
            ErrorKind::InvalidSignature => VerificationError::BadSignature,
            _ => VerificationError::Malformed(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to issue credential: {0}")]
pub struct IssueError(#[from] jsonwebtoken::errors::Error);

/// Verification capability consumed by the authenticator.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<CallerIdentity, VerificationError>;
}

/// Issuance capability consumed by the sign-in flow.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: &str, name: Option<&str>) -> Result<String, IssueError>;
}

/// HS256 signer/verifier over a shared secret.
pub struct JwtAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    issuer: String,
}

impl JwtAuthority {
    pub fn new(secret: &[u8], ttl: Duration, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
            issuer,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            Duration::from_secs(config.token_ttl_secs),
            config.issuer.clone(),
        )
    }

    fn issue_at(&self, user_id: &str, name: Option<&str>, now: u64) -> Result<String, IssueError> {
        let claims = Claims {
            sub: user_id.to_string(),
            name: name.map(str::to_string),
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
            iss: self.issuer.clone(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl TokenIssuer for JwtAuthority {
    fn issue(&self, user_id: &str, name: Option<&str>) -> Result<String, IssueError> {
        self.issue_at(user_id, name, unix_now())
    }
}

impl TokenVerifier for JwtAuthority {
    fn verify(&self, token: &str) -> Result<CallerIdentity, VerificationError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(VerificationError::Malformed("empty subject".to_string()));
        }
        Ok(CallerIdentity::new(data.claims.sub, data.claims.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> JwtAuthority {
        JwtAuthority::new(b"test-secret", Duration::from_secs(3600), "movies-api")
    }

    #[test]
    fn test_issue_then_verify() {
        let auth = authority();
        let token = auth.issue("user-1", Some("Alice")).unwrap();
        let identity = auth.verify(&token).unwrap();
        assert_eq!(identity.id(), "user-1");
        assert_eq!(identity.name(), Some("Alice"));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let auth = authority();
        let token = auth.issue("user-1", None).unwrap();
        // Flip a character well inside the signature segment.
        let mut chars: Vec<char> = token.chars().collect();
        let i = chars.len() - 10;
        chars[i] = if chars[i] == 'x' { 'y' } else { 'x' };
        let tampered: String = chars.into_iter().collect();
        assert!(auth.verify(&tampered).is_err());
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = authority().issue("user-1", None).unwrap();
        let other = JwtAuthority::new(b"another-secret", Duration::from_secs(3600), "movies-api");
        assert!(matches!(other.verify(&token), Err(VerificationError::BadSignature)));
    }

    #[test]
    fn test_expired_rejected() {
        let auth = authority();
        let token = auth.issue_at("user-1", None, unix_now() - 7200).unwrap();
        assert!(matches!(auth.verify(&token), Err(VerificationError::Expired)));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = JwtAuthority::new(b"test-secret", Duration::from_secs(3600), "someone-else")
            .issue("user-1", None)
            .unwrap();
        assert!(authority().verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(authority().verify("garbage"), Err(VerificationError::Malformed(_))));
    }

    #[test]
    fn test_huge_ttl_saturates_expiry() {
        let auth = JwtAuthority::new(b"test-secret", Duration::from_secs(u64::MAX), "movies-api");
        let token = auth.issue("user-1", None).unwrap();
        assert_eq!(auth.verify(&token).unwrap().id(), "user-1");
    }
}
