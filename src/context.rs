//! Application context.
//!
//! Everything a running client shares (credential storage, the auth gate
//! and the API client) is built once by [`AppContext::init`] and handed to
//! the code that needs it. There are no process-wide defaults to mutate.
//! [`AppContext::teardown`] drops session-scoped state explicitly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::api::ApiClient;
use crate::auth::{AuthGate, FileStore, KeyValueStore, MemoryStore, SessionStore};
use crate::config::ClientConfig;
use crate::error::{ApiError, ExportError, StoreError};
use crate::export::{
    AssetFetcher, BandEncoder, ExportPipeline, PageLayout, PageSize, Rasterizer,
    DEFAULT_JPEG_QUALITY, DEFAULT_MARGIN_MM, DEFAULT_SCALE,
};

/// Shared client state for one run of the application.
#[derive(Debug, Clone)]
pub struct AppContext {
    store: SessionStore,
    session: Arc<MemoryStore>,
    gate: AuthGate,
    client: ApiClient,
}

impl AppContext {
    /// Build the context from client configuration.
    ///
    /// The credential lives in `<state_dir>/storage.json`; session-scoped
    /// values live in memory for the lifetime of the context.
    pub fn init(config: &ClientConfig) -> Result<Self, ApiError> {
        let persistent = Arc::new(FileStore::in_dir(&config.state_dir));
        info!(
            api_url = %config.api_url,
            storage = %persistent.path().display(),
            "Initializing client context"
        );
        Self::with_persistent(&config.api_url, persistent, config.request_timeout())
    }

    /// Build a context over an explicit persistent store.
    pub fn with_persistent(
        api_url: &str,
        persistent: Arc<dyn KeyValueStore>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let session = Arc::new(MemoryStore::new());
        let store = SessionStore::new(persistent, session.clone());
        let gate = AuthGate::new(store.clone());
        let client = ApiClient::with_timeout(api_url, gate.clone(), timeout)?;

        Ok(Self {
            store,
            session,
            gate,
            client,
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Build an export pipeline for this client.
    pub fn export_pipeline<F: AssetFetcher>(
        &self,
        fetcher: F,
        options: ExportOptions,
    ) -> Result<ExportPipeline<F>, ExportError> {
        options.build(fetcher)
    }

    /// Clear session-scoped state. The persistent credential is kept.
    pub fn teardown(self) -> Result<(), StoreError> {
        debug!("Tearing down client context");
        self.session.clear()
    }
}

/// Parameters for [`AppContext::export_pipeline`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub page: PageSize,
    pub margin_mm: f64,
    pub scale: f64,
    pub jpeg_quality: u8,
}

impl ExportOptions {
    /// Validate the options and build a pipeline around `fetcher`.
    pub fn build<F: AssetFetcher>(self, fetcher: F) -> Result<ExportPipeline<F>, ExportError> {
        let layout = PageLayout::new(self.page, self.margin_mm)?;
        let rasterizer = Rasterizer::new(fetcher, self.scale)?;
        Ok(ExportPipeline::new(rasterizer, layout, self.output_dir)
            .with_encoder(BandEncoder::new(self.jpeg_quality)))
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            page: PageSize::A4,
            margin_mm: DEFAULT_MARGIN_MM,
            scale: DEFAULT_SCALE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}
