//! User-facing notification and navigation.
//!
//! The auth gate, API client and export pipeline only return errors. The
//! layer that owns the user's attention implements [`Feedback`] and turns
//! those errors into notices and redirects through [`handle_api_error`] and
//! [`handle_export_error`].

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{error, info, warn};

use crate::error::{ApiError, AuthError, ExportError};

/// Where the caller should navigate next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Login entry point
    Login,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No credential was stored
    SignInRequired,
    /// Credential was past its expiry and has been removed
    SessionExpired,
    /// Backend rejected input; message is shown verbatim
    Validation(String),
    /// Backend failed or was unreachable
    RequestFailed(String),
    /// Export finished and the file was saved
    ExportSaved(PathBuf),
    /// Export was aborted; nothing was saved
    ExportFailed(String),
}

impl Notice {
    /// Text shown to the user.
    pub fn text(&self) -> String {
        match self {
            Notice::SignInRequired => "Please sign in to continue.".to_string(),
            Notice::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Notice::Validation(message) => message.clone(),
            Notice::RequestFailed(message) => format!("Something went wrong: {}", message),
            Notice::ExportSaved(path) => format!("Saved {}", path.display()),
            Notice::ExportFailed(reason) => format!("Export failed: {}", reason),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::ExportSaved(_))
    }
}

/// Sink for notices and navigation requests.
pub trait Feedback: Send + Sync {
    fn notify(&self, notice: Notice);
    fn redirect(&self, route: Route);
}

/// Turn an API error into the matching notice and, for auth failures, a
/// redirect to login.
pub fn handle_api_error(err: &ApiError, feedback: &dyn Feedback) {
    match err {
        ApiError::Auth(AuthError::Unauthenticated) => {
            feedback.redirect(Route::Login);
            feedback.notify(Notice::SignInRequired);
        }
        ApiError::Auth(AuthError::CredentialExpired { .. }) => {
            feedback.redirect(Route::Login);
            feedback.notify(Notice::SessionExpired);
        }
        ApiError::Validation { message, .. } => {
            feedback.notify(Notice::Validation(message.clone()));
        }
        other => feedback.notify(Notice::RequestFailed(other.to_string())),
    }
}

/// Turn an export error into a single failure notice.
pub fn handle_export_error(err: &ExportError, feedback: &dyn Feedback) {
    feedback.notify(Notice::ExportFailed(err.to_string()));
}

// =============================================================================
// Console Feedback
// =============================================================================

/// Feedback for the command-line client: notices go to stderr, redirects
/// print how to sign in.
#[derive(Debug, Clone, Default)]
pub struct ConsoleFeedback;

impl Feedback for ConsoleFeedback {
    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            warn!("{}", notice.text());
            eprintln!("{}", notice.text());
        } else {
            info!("{}", notice.text());
            println!("{}", notice.text());
        }
    }

    fn redirect(&self, route: Route) {
        match route {
            Route::Login => eprintln!("Run `ledgerdesk login --token <token>` to sign in."),
        }
    }
}

// =============================================================================
// Recording Feedback
// =============================================================================

/// Feedback that records everything it receives.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    notices: Mutex<Vec<Notice>>,
    redirects: Mutex<Vec<Route>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn redirects(&self) -> Vec<Route> {
        self.redirects.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Feedback for RecordingFeedback {
    fn notify(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(_) => error!("Notice log poisoned, dropping {:?}", notice),
        }
    }

    fn redirect(&self, route: Route) {
        match self.redirects.lock() {
            Ok(mut redirects) => redirects.push(route),
            Err(_) => error!("Redirect log poisoned, dropping {:?}", route),
        }
    }
}
