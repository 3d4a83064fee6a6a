//! Credential handling and the request-authorization gate.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  ApiClient                    │
//! └───────────────────────┬───────────────────────┘
//!                         │ authorize(&mut headers)
//!                         ▼
//! ┌───────────────────────────────────────────────┐
//! │                   AuthGate                    │
//! │  decode_claims ─▶ expiry check ─▶ header      │
//! └───────────────────────┬───────────────────────┘
//!                         │
//!                         ▼
//! ┌───────────────────────────────────────────────┐
//! │                 SessionStore                  │
//! │   FileStore (token, user)                     │
//! │   MemoryStore (selectedCompany)               │
//! └───────────────────────────────────────────────┘
//! ```

mod credential;
mod gate;
mod store;

pub use credential::{
    decode_claims, now_epoch_secs, token_fingerprint, Claims, Principal, TokenMinter,
};
pub use gate::AuthGate;
pub use store::{
    FileStore, KeyValueStore, MemoryStore, SessionStore, UserProfile, PROFILE_KEY,
    SELECTED_COMPANY_KEY, STORAGE_FILE_NAME, TOKEN_KEY,
};
