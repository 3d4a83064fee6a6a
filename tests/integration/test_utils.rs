//! Test utilities for integration tests.
//!
//! This module provides a mock accounting backend served by axum on a local
//! port, token helpers, and raster builders for export tests.

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ledgerdesk::error::ExportError;
use ledgerdesk::export::AssetFetcher;
use ledgerdesk::{now_epoch_secs, AppContext, Claims, MemoryStore, TokenMinter, UserProfile};

// =============================================================================
// Tokens
// =============================================================================

/// Secret used for every token minted in tests.
pub const TEST_SECRET: &str = "integration-secret";

/// A token expiring `offset_secs` from now (negative = already expired).
pub fn token_expiring_in(offset_secs: i64) -> String {
    let exp = (now_epoch_secs() as i64 + offset_secs).max(0) as u64;
    TokenMinter::new(TEST_SECRET).mint_claims(&Claims {
        exp,
        sub: Some("user-1".to_string()),
        name: Some("Ada Lovelace".to_string()),
        email: Some("ada@example.com".to_string()),
    })
}

pub fn profile() -> UserProfile {
    UserProfile {
        name: "Ada Lovelace".to_string(),
        email: Some("ada@example.com".to_string()),
    }
}

/// A context talking to `base_url`, with in-memory persistent storage.
pub fn context_for(base_url: &str) -> AppContext {
    AppContext::with_persistent(
        base_url,
        Arc::new(MemoryStore::new()),
        Duration::from_secs(5),
    )
    .unwrap()
}

/// A context already signed in with a token valid for an hour.
pub fn signed_in_context(base_url: &str) -> AppContext {
    let ctx = context_for(base_url);
    ctx.store()
        .save_login(&token_expiring_in(3600), &profile())
        .unwrap();
    ctx
}

// =============================================================================
// Mock Backend
// =============================================================================

/// What the mock backend observed.
#[derive(Default)]
pub struct BackendLog {
    hits: AtomicUsize,
    authorization: Mutex<Vec<Vec<String>>>,
}

impl BackendLog {
    fn record(&self, headers: &HeaderMap) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let values = headers
            .get_all("authorization")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        self.authorization.lock().unwrap().push(values);
    }

    /// Number of requests that reached the backend.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Authorization header values of each request, in arrival order.
    pub fn authorization(&self) -> Vec<Vec<String>> {
        self.authorization.lock().unwrap().clone()
    }
}

/// A mock accounting backend listening on an ephemeral local port.
pub struct MockBackend {
    pub base_url: String,
    pub log: Arc<BackendLog>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let log = Arc::new(BackendLog::default());

        let router = Router::new()
            .route("/getPaymentMethods", get(payment_methods))
            .route("/api/employees", get(list_employees).post(create_employee))
            .route("/api/balance-sheet/{company}", get(balance_sheet))
            .route("/api/stock-take/{company}", get(stock_take_down))
            .route("/api/ap-aging/{company}", get(ap_aging_malformed))
            .route("/api/invoices/{company}", get(invoices_revoked))
            .route("/assets/logo.png", get(logo))
            .route("/assets/blocked.png", get(blocked_logo))
            .with_state(log.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            log,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

type Log = State<Arc<BackendLog>>;

async fn payment_methods(State(log): Log, headers: HeaderMap) -> Json<Value> {
    log.record(&headers);
    Json(json!([{ "id": 1, "name": "Cash" }, { "id": 2, "name": "Bank Transfer" }]))
}

async fn list_employees(State(log): Log, headers: HeaderMap) -> Json<Value> {
    log.record(&headers);
    Json(json!([{ "id": 1, "firstName": "Grace", "lastName": "Hopper" }]))
}

async fn create_employee(State(log): Log, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    log.record(&headers);

    let salary = body.get("salary").and_then(Value::as_f64).unwrap_or(0.0);
    if salary < 0.0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Salary must be a positive number" })),
        )
            .into_response();
    }

    let mut employee = body;
    employee["id"] = json!(42);
    (StatusCode::CREATED, Json(employee)).into_response()
}

async fn balance_sheet(
    State(log): Log,
    headers: HeaderMap,
    Path(company): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    log.record(&headers);

    if company != "7" {
        return (StatusCode::NOT_FOUND, "Company not found").into_response();
    }
    let as_of = query.get("asOfDate").cloned().unwrap_or_default();
    Json(json!({
        "asOfDate": as_of,
        "assets": [{ "title": "Current Assets", "lines": [{ "account": "Cash", "amount": 1500.0 }], "total": 1500.0 }],
        "liabilities": [],
        "equity": [{ "title": "Owner's Equity", "total": 1500.0 }],
        "totalAssets": 1500.0,
        "totalLiabilities": 0.0,
        "totalEquity": 1500.0
    }))
    .into_response()
}

async fn stock_take_down(State(log): Log, headers: HeaderMap) -> Response {
    log.record(&headers);
    (StatusCode::SERVICE_UNAVAILABLE, "database offline").into_response()
}

async fn ap_aging_malformed(State(log): Log, headers: HeaderMap) -> Json<Value> {
    log.record(&headers);
    Json(json!({ "asOfDate": "2024-03-31", "rows": "not a list" }))
}

async fn invoices_revoked(State(log): Log, headers: HeaderMap) -> Response {
    log.record(&headers);
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Token has been revoked" })),
    )
        .into_response()
}

async fn logo(State(log): Log, headers: HeaderMap) -> Response {
    log.record(&headers);
    let image = RgbaImage::from_pixel(4, 4, Rgba([200, 0, 0, 255]));
    ([("content-type", "image/png")], png_bytes(&image).to_vec()).into_response()
}

async fn blocked_logo(State(log): Log, headers: HeaderMap) -> Response {
    log.record(&headers);
    (StatusCode::FORBIDDEN, "cross-origin request blocked").into_response()
}

// =============================================================================
// Export Helpers
// =============================================================================

/// Encode an image as PNG.
pub fn png_bytes(image: &RgbaImage) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    Bytes::from(out.into_inner())
}

/// An opaque raster with a distinct gray level per row band of 100 rows.
pub fn report_raster(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |_, y| {
        let level = 255 - ((y / 100) % 8) as u8 * 20;
        Rgba([level, level, level, 255])
    })
}

/// Asset fetcher serving images from memory and counting fetches.
#[derive(Default, Clone)]
pub struct MemoryAssets {
    assets: HashMap<String, Bytes>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryAssets {
    pub fn with_asset(mut self, src: &str, data: Bytes) -> Self {
        self.assets.insert(src.to_string(), data);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for MemoryAssets {
    async fn fetch(&self, src: &str) -> Result<Bytes, ExportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.assets
            .get(src)
            .cloned()
            .ok_or_else(|| ExportError::CaptureFailed {
                reason: format!("asset {} is not available", src),
            })
    }
}

/// Count occurrences of `needle` in `haystack`.
pub fn count_occurrences(haystack: &[u8], needle: &str) -> usize {
    haystack
        .windows(needle.len())
        .filter(|w| *w == needle.as_bytes())
        .count()
}
