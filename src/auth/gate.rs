//! Request-authorization gate.
//!
//! Every outbound backend request passes through [`AuthGate::authorize`]
//! before it is sent:
//!
//! ```text
//! stored token? ──no──▶ Unauthenticated
//!      │yes
//!      ▼
//! decode claims ──fails──▶ purge ──▶ CredentialExpired
//!      │
//!      ▼
//! exp < now? ──yes──▶ purge ──▶ CredentialExpired
//!      │no
//!      ▼
//! Authorization: Bearer <token>
//! ```
//!
//! The gate has no UI side effects. Redirecting to login and notifying the
//! user is the caller's job (see [`crate::feedback::handle_api_error`]).

use http::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, warn};

use crate::error::AuthError;

use super::credential::{decode_claims, now_epoch_secs, token_fingerprint, Principal};
use super::store::SessionStore;

/// Gate that attaches the stored bearer credential to outbound requests.
#[derive(Debug, Clone)]
pub struct AuthGate {
    store: SessionStore,
}

impl AuthGate {
    /// Create a gate reading credentials from `store`.
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// The underlying session store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Authorize a request against the current time.
    pub fn authorize(&self, headers: &mut HeaderMap) -> Result<Principal, AuthError> {
        self.authorize_at(headers, now_epoch_secs())
    }

    /// Authorize a request as of `now` (Unix epoch seconds).
    ///
    /// On success the `Authorization` header is set, replacing any previous
    /// value, and stored state is left untouched. On an expired or
    /// malformed credential the credential, profile and selected company are
    /// purged before the error is returned.
    pub fn authorize_at(&self, headers: &mut HeaderMap, now: u64) -> Result<Principal, AuthError> {
        let token = self.store.credential()?.ok_or_else(|| {
            debug!("No stored credential, blocking request");
            AuthError::Unauthenticated
        })?;

        let claims = match decode_claims(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(
                    fingerprint = %token_fingerprint(&token),
                    "Stored credential is malformed ({}), purging session",
                    e
                );
                self.purge_quietly();
                return Err(AuthError::CredentialExpired {
                    expired_at: None,
                    current_time: now,
                });
            }
        };

        if claims.is_expired_at(now) {
            debug!(
                fingerprint = %token_fingerprint(&token),
                expired_at = claims.exp,
                current_time = now,
                "Stored credential expired, purging session"
            );
            self.purge_quietly();
            return Err(AuthError::CredentialExpired {
                expired_at: Some(claims.exp),
                current_time: now,
            });
        }

        // A token that is not a valid header value cannot be sent at all.
        let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            self.purge_quietly();
            AuthError::CredentialExpired {
                expired_at: None,
                current_time: now,
            }
        })?;
        headers.insert(AUTHORIZATION, value);

        Ok(claims.principal())
    }

    /// Purge without masking the auth error that triggered it.
    fn purge_quietly(&self) {
        if let Err(e) = self.store.purge() {
            warn!("Failed to purge session state: {}", e);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
