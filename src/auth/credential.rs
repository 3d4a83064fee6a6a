//! Bearer credential decoding and development token minting.
//!
//! Credentials are JWT-shaped bearer tokens:
//!
//! ```text
//! base64url(header) . base64url(claims) . base64url(signature)
//! ```
//!
//! The client only ever reads the claims segment, and only to learn the
//! expiry (`exp`, Unix epoch seconds) and the principal. The signature is
//! never checked here: the local expiry check keeps obviously stale requests
//! from leaving the client, and the backend re-validates every token.
//!
//! # Example
//!
//! ```rust
//! use ledgerdesk::auth::{decode_claims, TokenMinter};
//! use std::time::Duration;
//!
//! let minter = TokenMinter::new("dev-secret");
//! let (token, expiry) = minter.mint("42", Some("Ada"), Duration::from_secs(3600));
//!
//! let claims = decode_claims(&token).unwrap();
//! assert_eq!(claims.exp, expiry);
//! assert_eq!(claims.sub.as_deref(), Some("42"));
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CredentialError;

type HmacSha256 = Hmac<Sha256>;

/// Current time as Unix epoch seconds.
pub fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// Claims
// =============================================================================

/// Claims carried in a credential's payload segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry timestamp (Unix epoch seconds)
    pub exp: u64,

    /// Subject (principal identifier)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    /// Whether the claims are expired at `now`.
    ///
    /// A credential whose `exp` equals `now` is still valid.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp < now
    }

    /// The principal these claims identify.
    pub fn principal(&self) -> Principal {
        Principal {
            subject: self.sub.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Identity associated with a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Decode the claims segment of a bearer token without verifying it.
pub fn decode_claims(token: &str) -> Result<Claims, CredentialError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(CredentialError::SegmentCount(segments.len()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| CredentialError::Encoding(e.to_string()))?;

    serde_json::from_slice(&payload).map_err(|e| CredentialError::Claims(e.to_string()))
}

/// Short, non-reversible identifier for a token, safe to print or log.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}

// =============================================================================
// Token Minting
// =============================================================================

/// Mints HS256-signed tokens for development backends and tests.
#[derive(Clone)]
pub struct TokenMinter {
    secret_key: Vec<u8>,
}

impl TokenMinter {
    /// Create a minter with the given signing secret.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Mint a token for `subject` that expires `ttl` from now.
    ///
    /// Returns the token and its expiry timestamp.
    pub fn mint(&self, subject: &str, name: Option<&str>, ttl: Duration) -> (String, u64) {
        let expiry = now_epoch_secs() + ttl.as_secs();
        let claims = Claims {
            exp: expiry,
            sub: Some(subject.to_string()),
            name: name.map(str::to_string),
            email: None,
        };
        (self.mint_claims(&claims), expiry)
    }

    /// Mint a token carrying exactly `claims`.
    pub fn mint_claims(&self, claims: &Claims) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        // Claims has no map keys or floats, serialization cannot fail.
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap_or_default());
        let signing_input = format!("{}.{}", header, payload);

        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }
}

// =============================================================================
// Tests
// =============================================================================
