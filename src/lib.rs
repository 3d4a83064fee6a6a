//! # ledgerdesk
//!
//! Client for a small-business accounting backend.
//!
//! The library carries the two pieces of client behaviour that need care:
//!
//! - **Request authorization**: every backend call passes through an
//!   [`AuthGate`] that attaches the stored bearer token, or rejects the call
//!   locally (and purges the credential) when the token is missing, expired
//!   or unreadable.
//! - **Paginated export**: a rendered report region is rasterized at device
//!   scale, sliced into page-height bands and written out as a multi-page
//!   PDF by the [`ExportPipeline`].
//!
//! ## Architecture
//!
//! - [`auth`] - Credential decoding, storage and the request gate
//! - [`api`] - Typed REST client and backend schemas
//! - [`export`] - Capture, slicing and PDF assembly
//! - [`views`] - View state and the employee form
//! - [`feedback`] - Notices and navigation for whoever owns the UI
//! - [`report`] - Report kinds and amount formatting
//! - [`context`] - Construction and teardown of shared client state
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use ledgerdesk::{AppContext, ConsoleFeedback};
//! use ledgerdesk::config::ClientConfig;
//! use ledgerdesk::views::load;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig {
//!         api_url: "http://localhost:5000".to_string(),
//!         state_dir: ".ledgerdesk".into(),
//!         timeout: 30,
//!         verbose: false,
//!     };
//!     let ctx = AppContext::init(&config).unwrap();
//!
//!     let employees = load(ctx.client().list_employees(), &ConsoleFeedback).await;
//!     println!("{:?}", employees);
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod feedback;
pub mod report;
pub mod views;

// Re-export commonly used types
pub use api::{error_message, ApiClient, DEFAULT_TIMEOUT};
pub use auth::{
    decode_claims, now_epoch_secs, AuthGate, Claims, FileStore, KeyValueStore, MemoryStore,
    Principal, SessionStore, TokenMinter, UserProfile,
};
pub use config::{
    Cli, ClientConfig, Command, ExportConfig, FetchConfig, FetchTarget, LoginConfig, MintConfig,
};
pub use context::{AppContext, ExportOptions};
pub use error::{ApiError, AuthError, CredentialError, ExportError, StoreError};
pub use export::{
    assemble, export_file_name, export_in_background, plan_bands, AssetFetcher, Band,
    BandEncoder, ExportPipeline, ExportReport, ExportRequest, ExportStage, HttpAssetFetcher,
    Overlay, PageLayout, PageSize, PdfDocument, Rasterizer, Region, RegionManifest,
};
pub use feedback::{
    handle_api_error, handle_export_error, ConsoleFeedback, Feedback, Notice, RecordingFeedback,
    Route,
};
pub use report::{format_amount, ReportKind};
pub use views::{load, EmployeeForm, FormMode, ViewState};
