//! Region rasterization.
//!
//! A report region is a base snapshot (the rendered report at 1 CSS pixel
//! per image pixel) plus overlay images positioned on top of it, such as the
//! company logo. Capturing renders both into one raster at the device scale.
//!
//! Overlay assets are fetched without credentials: they are public static
//! files, often on another origin, and must never carry the bearer token.
//! An overlay that cannot be fetched or decoded fails the whole capture.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ExportError;

/// Default device-pixel scale for captures.
pub const DEFAULT_SCALE: f64 = 2.0;

/// Smallest accepted capture scale.
pub const MIN_SCALE: f64 = 1.0;

/// Largest accepted capture scale.
pub const MAX_SCALE: f64 = 4.0;

/// Timeout for fetching one overlay asset.
const ASSET_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// Region
// =============================================================================

/// An image placed over the base snapshot, in unscaled pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// URL or file path of the image
    pub src: String,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// A renderable report region.
#[derive(Debug, Clone)]
pub struct Region {
    pub base: RgbaImage,
    pub overlays: Vec<Overlay>,
}

impl Region {
    pub fn new(base: RgbaImage) -> Self {
        Self {
            base,
            overlays: Vec::new(),
        }
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlays.push(overlay);
        self
    }
}

/// On-disk description of a region: a snapshot image and its overlays.
///
/// ```json
/// {
///   "snapshot": "balance-sheet.png",
///   "overlays": [
///     { "src": "https://cdn.example.com/logo.png", "x": 24, "y": 16, "width": 120, "height": 40 }
///   ]
/// }
/// ```
///
/// Relative file paths are resolved against the manifest's directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionManifest {
    pub snapshot: PathBuf,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
}

impl RegionManifest {
    /// Read a manifest and the snapshot it names.
    pub async fn load(path: &Path) -> Result<Region, ExportError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| capture_failed(format!("cannot read {}: {}", path.display(), e)))?;
        let manifest: RegionManifest = serde_json::from_slice(&raw)
            .map_err(|e| capture_failed(format!("invalid manifest {}: {}", path.display(), e)))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.resolve(dir).await
    }

    async fn resolve(self, dir: &Path) -> Result<Region, ExportError> {
        let snapshot = dir.join(&self.snapshot);
        let bytes = tokio::fs::read(&snapshot)
            .await
            .map_err(|e| capture_failed(format!("cannot read {}: {}", snapshot.display(), e)))?;
        let base = decode_rgba(&bytes, &snapshot.display().to_string())?;

        let overlays = self
            .overlays
            .into_iter()
            .map(|mut overlay| {
                if !is_remote(&overlay.src) && Path::new(&overlay.src).is_relative() {
                    overlay.src = dir.join(&overlay.src).display().to_string();
                }
                overlay
            })
            .collect();

        Ok(Region { base, overlays })
    }
}

// =============================================================================
// Asset Fetching
// =============================================================================

/// Source of overlay image bytes.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch the raw bytes of `src`.
    async fn fetch(&self, src: &str) -> Result<Bytes, ExportError>;
}

/// Fetches `http(s)://` assets anonymously and everything else from disk.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    http: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Result<Self, ExportError> {
        let http = reqwest::Client::builder()
            .timeout(ASSET_TIMEOUT)
            .build()
            .map_err(|e| capture_failed(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, src: &str) -> Result<Bytes, ExportError> {
        if !is_remote(src) {
            let data = tokio::fs::read(src)
                .await
                .map_err(|e| capture_failed(format!("cannot read {}: {}", src, e)))?;
            return Ok(Bytes::from(data));
        }

        let response = self
            .http
            .get(src)
            .send()
            .await
            .map_err(|e| capture_failed(format!("cannot fetch {}: {}", src, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(capture_failed(format!(
                "cannot fetch {}: status {}",
                src,
                status.as_u16()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| capture_failed(format!("cannot fetch {}: {}", src, e)))
    }
}

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

// =============================================================================
// Rasterizer
// =============================================================================

/// A captured raster at device scale.
#[derive(Debug, Clone)]
pub struct RasterCapture {
    pub image: RgbaImage,
    pub scale: f64,
}

impl RasterCapture {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Renders regions into rasters at a fixed device-pixel scale.
#[derive(Debug, Clone)]
pub struct Rasterizer<F> {
    fetcher: F,
    scale: f64,
}

impl<F: AssetFetcher> Rasterizer<F> {
    /// Create a rasterizer; `scale` must lie in `MIN_SCALE..=MAX_SCALE`.
    pub fn new(fetcher: F, scale: f64) -> Result<Self, ExportError> {
        if !scale.is_finite() || !(MIN_SCALE..=MAX_SCALE).contains(&scale) {
            return Err(ExportError::InvalidLayout(format!(
                "capture scale must be between {} and {}, got {}",
                MIN_SCALE, MAX_SCALE, scale
            )));
        }
        Ok(Self { fetcher, scale })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Render `region` and its overlays into one raster.
    pub async fn capture(&self, region: &Region) -> Result<RasterCapture, ExportError> {
        let (width, height) = region.base.dimensions();
        if width == 0 || height == 0 {
            return Err(capture_failed("region is empty".to_string()));
        }

        let mut image = if self.scale == 1.0 {
            region.base.clone()
        } else {
            imageops::resize(
                &region.base,
                self.scaled(width).max(1),
                self.scaled(height).max(1),
                FilterType::Triangle,
            )
        };

        for overlay in &region.overlays {
            let bytes = self.fetcher.fetch(&overlay.src).await.map_err(|e| {
                warn!(src = %overlay.src, "Overlay asset unavailable: {}", e);
                e
            })?;
            let decoded = decode_rgba(&bytes, &overlay.src)?;

            let target_width = self.scaled(overlay.width);
            let target_height = self.scaled(overlay.height);
            if target_width == 0 || target_height == 0 {
                continue;
            }

            let scaled = imageops::resize(&decoded, target_width, target_height, FilterType::Triangle);
            imageops::overlay(
                &mut image,
                &scaled,
                (overlay.x as f64 * self.scale).round() as i64,
                (overlay.y as f64 * self.scale).round() as i64,
            );
        }

        debug!(
            width = image.width(),
            height = image.height(),
            scale = self.scale,
            overlays = region.overlays.len(),
            "Captured region"
        );

        Ok(RasterCapture {
            image,
            scale: self.scale,
        })
    }

    fn scaled(&self, px: u32) -> u32 {
        (f64::from(px) * self.scale).round() as u32
    }
}

fn decode_rgba(bytes: &[u8], source: &str) -> Result<RgbaImage, ExportError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| capture_failed(format!("cannot decode {}: {}", source, e)))
}

fn capture_failed(reason: String) -> ExportError {
    ExportError::CaptureFailed { reason }
}
