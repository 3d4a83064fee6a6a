//! Paginated PDF export.
//!
//! This module turns a rendered report region into a multi-page PDF:
//!
//! - [`Rasterizer`] renders the region and its overlays at device scale
//! - [`plan_bands`] cuts the raster into page-height bands
//! - [`assemble`] encodes each band and places it on its own page
//! - [`ExportPipeline`] drives the stages and writes the file
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌────────────┐   ┌─────────────┐
//! │  Region  │──▶│ Rasterizer │──▶│ plan_bands │──▶│  assemble   │──▶ file.pdf
//! │ +overlays│   │  (scale)   │   │ (layout)   │   │ (JPEG+PDF)  │
//! └──────────┘   └─────┬──────┘   └────────────┘   └─────────────┘
//!                      │
//!                      ▼
//!               AssetFetcher (no credentials)
//! ```

mod capture;
mod document;
mod encoder;
mod layout;
mod naming;
mod pipeline;

pub use capture::{
    AssetFetcher, HttpAssetFetcher, Overlay, RasterCapture, Rasterizer, Region, RegionManifest,
    DEFAULT_SCALE, MAX_SCALE, MIN_SCALE,
};
pub use document::{Page, PdfDocument, Placement, POINTS_PER_MM};
pub use encoder::{
    clamp_quality, is_valid_quality, BandEncoder, EncodedBand, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use layout::{plan_bands, Band, PageLayout, PageSize, DEFAULT_MARGIN_MM};
pub use naming::export_file_name;
pub use pipeline::{
    assemble, export_in_background, save_document, ExportPipeline, ExportReport, ExportRequest,
    ExportStage,
};
