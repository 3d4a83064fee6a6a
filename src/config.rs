//! Command-line configuration for the ledgerdesk client.
//!
//! Options can be given as flags or as environment variables with the
//! `LEDGER_` prefix:
//!
//! - `LEDGER_API_URL` - Backend base URL (default: http://localhost:5000)
//! - `LEDGER_STATE_DIR` - Directory holding `storage.json` (default: .ledgerdesk)
//! - `LEDGER_TIMEOUT` - Request timeout in seconds (default: 30)
//! - `LEDGER_TOKEN` - Bearer token for `login`
//! - `LEDGER_COMPANY` - Company id for company-scoped requests
//! - `LEDGER_SIGNING_SECRET` - Secret for `mint`
//! - `LEDGER_OUTPUT_DIR` - Where `export` writes PDFs (default: .)

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::export::{
    is_valid_quality, PageSize, DEFAULT_JPEG_QUALITY, DEFAULT_MARGIN_MM, DEFAULT_SCALE,
    MAX_JPEG_QUALITY, MAX_SCALE, MIN_JPEG_QUALITY, MIN_SCALE,
};
use crate::report::ReportKind;

// =============================================================================
// Default Values
// =============================================================================

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Default directory for persistent client state.
pub const DEFAULT_STATE_DIR: &str = ".ledgerdesk";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default lifetime of minted development tokens (1 hour).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Default directory for exported files.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

// =============================================================================
// CLI
// =============================================================================

/// ledgerdesk - client for a small-business accounting backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "ledgerdesk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Store a bearer token and profile for subsequent requests
    Login(LoginConfig),

    /// Remove the stored credential
    Logout(ClientConfig),

    /// Show the stored credential and whether it is still valid
    Status(ClientConfig),

    /// Mint a signed development token
    Mint(MintConfig),

    /// Fetch a resource or report from the backend and print it as JSON
    Fetch(FetchConfig),

    /// Export a rendered report region to a paginated PDF
    Export(ExportConfig),
}

// =============================================================================
// Shared Client Options
// =============================================================================

/// Options shared by every command that touches client state.
#[derive(Args, Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL.
    #[arg(long, default_value = DEFAULT_API_URL, env = "LEDGER_API_URL")]
    pub api_url: String,

    /// Directory holding persistent client state.
    #[arg(long, default_value = DEFAULT_STATE_DIR, env = "LEDGER_STATE_DIR")]
    pub state_dir: PathBuf,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "LEDGER_TIMEOUT")]
    pub timeout: u64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.trim().is_empty() {
            return Err("API URL is required. Set --api-url or LEDGER_API_URL".to_string());
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(format!(
                "API URL must start with http:// or https://, got '{}'",
                self.api_url
            ));
        }
        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

// =============================================================================
// Login
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct LoginConfig {
    #[command(flatten)]
    pub client: ClientConfig,

    /// Bearer token issued by the backend.
    #[arg(long, env = "LEDGER_TOKEN")]
    pub token: String,

    /// Display name; defaults to the token's `name` claim.
    #[arg(long)]
    pub name: Option<String>,

    /// Email; defaults to the token's `email` claim.
    #[arg(long)]
    pub email: Option<String>,
}

impl LoginConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.client.validate()?;
        if self.token.trim().is_empty() {
            return Err("token is required. Set --token or LEDGER_TOKEN".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Mint
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct MintConfig {
    /// HMAC secret shared with the backend.
    #[arg(long, env = "LEDGER_SIGNING_SECRET")]
    pub secret: String,

    /// Subject (user id) of the token.
    #[arg(long)]
    pub subject: String,

    /// Display name claim.
    #[arg(long)]
    pub name: Option<String>,

    /// Time-to-live in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub ttl: u64,
}

impl MintConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("secret is required. Set --secret or LEDGER_SIGNING_SECRET".to_string());
        }
        if self.subject.trim().is_empty() {
            return Err("subject must not be empty".to_string());
        }
        if self.ttl == 0 {
            return Err("ttl must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Fetch
// =============================================================================

/// Resources the `fetch` command can retrieve.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    PaymentMethods,
    Employees,
    Invoices,
    Payments,
    BalanceSheet,
    InventoryValuation,
    StockTake,
    ApAging,
    CustomerBalanceDetail,
    SupplierBalanceDetail,
}

impl FetchTarget {
    /// The report this target renders, if it is a report.
    pub fn report(self) -> Option<ReportKind> {
        match self {
            FetchTarget::BalanceSheet => Some(ReportKind::BalanceSheet),
            FetchTarget::InventoryValuation => Some(ReportKind::InventoryValuation),
            FetchTarget::StockTake => Some(ReportKind::StockTake),
            FetchTarget::ApAging => Some(ReportKind::ApAging),
            FetchTarget::CustomerBalanceDetail => Some(ReportKind::CustomerBalanceDetail),
            FetchTarget::SupplierBalanceDetail => Some(ReportKind::SupplierBalanceDetail),
            _ => None,
        }
    }

    pub fn needs_company(self) -> bool {
        !matches!(self, FetchTarget::PaymentMethods | FetchTarget::Employees)
    }
}

#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    #[command(flatten)]
    pub client: ClientConfig,

    /// What to fetch.
    #[arg(value_enum)]
    pub target: FetchTarget,

    /// Company id for company-scoped resources; selected for the session.
    #[arg(long, env = "LEDGER_COMPANY")]
    pub company: Option<String>,

    /// Report date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Customer or supplier id for balance detail reports.
    #[arg(long)]
    pub entity: Option<i64>,
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.client.validate()?;
        if self.target.needs_company() && self.company.as_deref().map_or(true, str::is_empty) {
            return Err("company is required. Set --company or LEDGER_COMPANY".to_string());
        }
        let needs_entity = self.target.report().is_some_and(ReportKind::needs_entity);
        if needs_entity && self.entity.is_none() {
            return Err("entity is required for balance detail reports. Set --entity".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Export
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ExportConfig {
    /// Region manifest (JSON) naming the snapshot and its overlays.
    #[arg(long)]
    pub manifest: PathBuf,

    /// Report being exported; determines the file name.
    #[arg(long)]
    pub report: ReportKind,

    /// Report date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Customer or supplier name, included in the file name.
    #[arg(long)]
    pub entity: Option<String>,

    /// Directory the PDF is written to.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "LEDGER_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Page format (a4 or letter).
    #[arg(long, default_value_t = PageSize::A4)]
    pub page: PageSize,

    /// Page margin in millimetres.
    #[arg(long, default_value_t = DEFAULT_MARGIN_MM)]
    pub margin: f64,

    /// Device-pixel scale for the capture (1-4).
    #[arg(long, default_value_t = DEFAULT_SCALE)]
    pub scale: f64,

    /// JPEG quality for page images (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.scale.is_finite() || !(MIN_SCALE..=MAX_SCALE).contains(&self.scale) {
            return Err(format!(
                "scale must be between {} and {}",
                MIN_SCALE, MAX_SCALE
            ));
        }
        if !is_valid_quality(self.jpeg_quality) {
            return Err(format!(
                "jpeg_quality must be between {} and {}",
                MIN_JPEG_QUALITY, MAX_JPEG_QUALITY
            ));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err("margin must be a non-negative number".to_string());
        }
        if self.report.needs_entity() && self.entity.as_deref().map_or(true, str::is_empty) {
            return Err(format!("{} exports require --entity", self.report.slug()));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
