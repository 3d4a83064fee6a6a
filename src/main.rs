//! ledgerdesk - command-line client for the accounting backend.

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerdesk::{
    config::{
        Cli, ClientConfig, Command, ExportConfig, FetchConfig, FetchTarget, LoginConfig,
        MintConfig,
    },
    decode_claims, export_file_name, handle_api_error, handle_export_error, load, now_epoch_secs,
    ApiError, AppContext, ConsoleFeedback, ExportOptions, ExportRequest, Feedback,
    HttpAssetFetcher, Notice, RegionManifest, TokenMinter, UserProfile, ViewState,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Login(config) => run_login(config),
        Command::Logout(config) => run_logout(config),
        Command::Status(config) => run_status(config),
        Command::Mint(config) => run_mint(config),
        Command::Fetch(config) => run_fetch(config).await,
        Command::Export(config) => run_export(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "ledgerdesk=debug"
    } else {
        "ledgerdesk=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Validate client options and build the context.
fn open_context(config: &ClientConfig) -> Result<AppContext, ExitCode> {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return Err(ExitCode::FAILURE);
    }

    AppContext::init(config).map_err(|e| {
        error!("Failed to initialize client: {}", e);
        ExitCode::FAILURE
    })
}

/// Tear the context down, logging rather than failing on errors.
fn close_context(ctx: AppContext) {
    if let Err(e) = ctx.teardown() {
        error!("Failed to clear session state: {}", e);
    }
}

// =============================================================================
// Login / Logout / Status
// =============================================================================

fn run_login(config: LoginConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    let ctx = match open_context(&config.client) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let token = config.token.trim();
    let claims = match decode_claims(token) {
        Ok(claims) => claims,
        Err(e) => {
            eprintln!("Error: token cannot be used: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if claims.is_expired_at(now_epoch_secs()) {
        eprintln!("Error: token expired at {}", claims.exp);
        return ExitCode::FAILURE;
    }

    let principal = claims.principal();
    let profile = UserProfile {
        name: config
            .name
            .or(principal.name)
            .or(principal.subject)
            .unwrap_or_default(),
        email: config.email.or(principal.email),
    };

    if let Err(e) = ctx.store().save_login(token, &profile) {
        error!("Failed to store credential: {}", e);
        return ExitCode::FAILURE;
    }

    println!("Signed in as {} (token expires at {})", profile.name, claims.exp);
    close_context(ctx);
    ExitCode::SUCCESS
}

fn run_logout(config: ClientConfig) -> ExitCode {
    let ctx = match open_context(&config) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    if let Err(e) = ctx.store().purge() {
        error!("Failed to remove credential: {}", e);
        return ExitCode::FAILURE;
    }

    println!("Signed out");
    close_context(ctx);
    ExitCode::SUCCESS
}

fn run_status(config: ClientConfig) -> ExitCode {
    let ctx = match open_context(&config) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let profile = ctx.store().profile().ok().flatten();
    let expiry = ctx
        .store()
        .credential()
        .ok()
        .flatten()
        .and_then(|token| decode_claims(&token).ok())
        .map(|claims| claims.exp);

    let mut headers = http::HeaderMap::new();
    let code = match ctx.gate().authorize(&mut headers) {
        Ok(principal) => {
            let name = profile
                .map(|p| p.name)
                .or(principal.name)
                .or(principal.subject)
                .unwrap_or_else(|| "unknown user".to_string());
            println!("Signed in as {}", name);
            if let Some(exp) = expiry {
                let remaining = exp.saturating_sub(now_epoch_secs());
                println!("Token expires in {}s", remaining);
            }
            println!("Backend: {}", ctx.client().base_url());
            ExitCode::SUCCESS
        }
        Err(e) => {
            handle_api_error(&ApiError::Auth(e), &ConsoleFeedback);
            ExitCode::FAILURE
        }
    };

    close_context(ctx);
    code
}

// =============================================================================
// Mint Command
// =============================================================================

fn run_mint(config: MintConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let minter = TokenMinter::new(&config.secret);
    let (token, expiry) = minter.mint(
        &config.subject,
        config.name.as_deref(),
        Duration::from_secs(config.ttl),
    );

    let json = serde_json::json!({
        "token": token,
        "expiry": expiry,
        "subject": config.subject,
        "ttl": config.ttl,
    });
    match serde_json::to_string_pretty(&json) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: FetchConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    let ctx = match open_context(&config.client) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    if let Some(ref company) = config.company {
        if let Err(e) = ctx.store().select_company(company) {
            error!("Failed to select company: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let feedback = ConsoleFeedback;
    let company = ctx
        .store()
        .selected_company()
        .ok()
        .flatten()
        .unwrap_or_default();
    let as_of = config
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let entity = config.entity.unwrap_or_default();
    let client = ctx.client();

    debug!(resource = ?config.target, company = %company, "Fetching");

    let code = match config.target {
        FetchTarget::PaymentMethods => print_view(load(client.payment_methods(), &feedback).await),
        FetchTarget::Employees => print_view(load(client.list_employees(), &feedback).await),
        FetchTarget::Invoices => print_view(load(client.list_invoices(&company), &feedback).await),
        FetchTarget::Payments => print_view(load(client.list_payments(&company), &feedback).await),
        FetchTarget::BalanceSheet => {
            print_view(load(client.balance_sheet(&company, as_of), &feedback).await)
        }
        FetchTarget::InventoryValuation => {
            print_view(load(client.inventory_valuation(&company, as_of), &feedback).await)
        }
        FetchTarget::StockTake => print_view(load(client.stock_take(&company), &feedback).await),
        FetchTarget::ApAging => print_view(load(client.ap_aging(&company, as_of), &feedback).await),
        FetchTarget::CustomerBalanceDetail => print_view(
            load(
                client.customer_balance_detail(&company, entity, as_of),
                &feedback,
            )
            .await,
        ),
        FetchTarget::SupplierBalanceDetail => print_view(
            load(
                client.supplier_balance_detail(&company, entity, as_of),
                &feedback,
            )
            .await,
        ),
    };

    close_context(ctx);
    code
}

/// Print a loaded view as JSON, or its inline error.
fn print_view<T: Serialize>(state: ViewState<T>) -> ExitCode {
    match state {
        ViewState::Loaded(data) => match serde_json::to_string_pretty(&data) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        ViewState::Failed(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
        ViewState::Idle => ExitCode::FAILURE,
    }
}

// =============================================================================
// Export Command
// =============================================================================

async fn run_export(config: ExportConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let feedback = ConsoleFeedback;

    let fetcher = match HttpAssetFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(e) => {
            handle_export_error(&e, &feedback);
            return ExitCode::FAILURE;
        }
    };
    let options = ExportOptions {
        output_dir: config.output_dir.clone(),
        page: config.page,
        margin_mm: config.margin,
        scale: config.scale,
        jpeg_quality: config.jpeg_quality,
    };
    let pipeline = match options.build(fetcher) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            handle_export_error(&e, &feedback);
            return ExitCode::FAILURE;
        }
    };

    let region = match RegionManifest::load(&config.manifest).await {
        Ok(region) => region,
        Err(e) => {
            handle_export_error(&e, &feedback);
            return ExitCode::FAILURE;
        }
    };

    let as_of = config
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let file_name = export_file_name(config.report, as_of, config.entity.as_deref());
    info!(report = %config.report, file = %file_name, "Exporting");

    match pipeline.run(&ExportRequest::new(region, file_name)).await {
        Ok(report) => {
            feedback.notify(Notice::ExportSaved(report.path));
            ExitCode::SUCCESS
        }
        Err(e) => {
            handle_export_error(&e, &feedback);
            ExitCode::FAILURE
        }
    }
}
