//! Export pipeline orchestration.
//!
//! ```text
//!   Idle ──▶ Capturing ──▶ Slicing ──▶ Assembling ──▶ Done
//!               │             │            │
//!               └─────────────┴────────────┴────────▶ Failed
//! ```
//!
//! 1. **Capturing**: rasterize the region at the device scale
//! 2. **Slicing**: cut the raster into page-height bands
//! 3. **Assembling**: encode each band and draw it on its own page
//! 4. **Done**: write `<output_dir>/<file name>` through a `.part` file
//!
//! Any error moves to `Failed`. No partial file is left behind and the
//! pipeline can be run again from `Idle`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use image::imageops;
use image::RgbaImage;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::ExportError;
use crate::feedback::{handle_export_error, Feedback, Notice};

use super::capture::{AssetFetcher, Rasterizer, Region};
use super::document::PdfDocument;
use super::encoder::BandEncoder;
use super::layout::{plan_bands, Band, PageLayout};

// =============================================================================
// Stage
// =============================================================================

/// Observable state of one export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Idle,
    Capturing,
    Slicing,
    Assembling,
    Done,
    Failed,
}

impl ExportStage {
    /// `Done` and `Failed` end a run; a new run starts again from `Idle`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStage::Done | ExportStage::Failed)
    }
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportStage::Idle => "idle",
            ExportStage::Capturing => "capturing",
            ExportStage::Slicing => "slicing",
            ExportStage::Assembling => "assembling",
            ExportStage::Done => "done",
            ExportStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Request / Report
// =============================================================================

/// What to export and where to put it.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub region: Region,
    /// Bare file name, created inside the pipeline's output directory
    pub file_name: String,
}

impl ExportRequest {
    pub fn new(region: Region, file_name: impl Into<String>) -> Self {
        Self {
            region,
            file_name: file_name.into(),
        }
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub pages: usize,
    pub raster_width: u32,
    pub raster_height: u32,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Captures regions and writes them out as paginated PDFs.
pub struct ExportPipeline<F> {
    rasterizer: Rasterizer<F>,
    layout: PageLayout,
    encoder: BandEncoder,
    output_dir: PathBuf,
}

impl<F: AssetFetcher> ExportPipeline<F> {
    pub fn new(rasterizer: Rasterizer<F>, layout: PageLayout, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            rasterizer,
            layout,
            encoder: BandEncoder::default(),
            output_dir: output_dir.into(),
        }
    }

    pub fn with_encoder(mut self, encoder: BandEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn rasterizer(&self) -> &Rasterizer<F> {
        &self.rasterizer
    }

    /// Run one export to completion.
    pub async fn run(&self, request: &ExportRequest) -> Result<ExportReport, ExportError> {
        let (stage, _rx) = watch::channel(ExportStage::Idle);
        self.run_observed(request, &stage).await
    }

    /// Run one export, publishing each stage transition on `stage`.
    ///
    /// The final value is always `Done` or `Failed`.
    pub async fn run_observed(
        &self,
        request: &ExportRequest,
        stage: &watch::Sender<ExportStage>,
    ) -> Result<ExportReport, ExportError> {
        let result = self.execute(request, stage).await;
        match &result {
            Ok(report) => {
                stage.send_replace(ExportStage::Done);
                info!(
                    path = %report.path.display(),
                    pages = report.pages,
                    "Export saved"
                );
            }
            Err(e) => {
                stage.send_replace(ExportStage::Failed);
                warn!(file = %request.file_name, "Export failed: {}", e);
            }
        }
        result
    }

    async fn execute(
        &self,
        request: &ExportRequest,
        stage: &watch::Sender<ExportStage>,
    ) -> Result<ExportReport, ExportError> {
        let target = self.target_path(&request.file_name)?;

        stage.send_replace(ExportStage::Capturing);
        let capture = self.rasterizer.capture(&request.region).await?;

        stage.send_replace(ExportStage::Slicing);
        let content_height = self.layout.content_height_px(capture.width())?;
        let bands = plan_bands(capture.height(), content_height)?;
        debug!(
            raster_height = capture.height(),
            content_height,
            bands = bands.len(),
            "Sliced raster"
        );

        stage.send_replace(ExportStage::Assembling);
        let document = assemble(&capture.image, &bands, &self.layout, &self.encoder)?;
        save_document(&document, &target).await?;

        Ok(ExportReport {
            path: target,
            pages: document.page_count(),
            raster_width: capture.width(),
            raster_height: capture.height(),
        })
    }

    fn target_path(&self, file_name: &str) -> Result<PathBuf, ExportError> {
        let is_bare = !file_name.is_empty()
            && Path::new(file_name).file_name().and_then(|n| n.to_str()) == Some(file_name);
        if !is_bare {
            return Err(ExportError::Save {
                path: file_name.to_string(),
                message: "file name must not be empty or contain path separators".to_string(),
            });
        }
        Ok(self.output_dir.join(file_name))
    }
}

/// Encode each band and draw it on its own page.
///
/// Band `i` lands on page `i` at the top-left margin, scaled to exactly the
/// printable width with height following the raster's aspect ratio.
pub fn assemble(
    raster: &RgbaImage,
    bands: &[Band],
    layout: &PageLayout,
    encoder: &BandEncoder,
) -> Result<PdfDocument, ExportError> {
    let mut document = PdfDocument::new(layout.page());
    let width = raster.width();

    for band in bands {
        if band.y.saturating_add(band.height) > raster.height() {
            return Err(ExportError::InvalidLayout(format!(
                "band {} (rows {}..{}) exceeds raster height {}",
                band.index,
                band.y,
                band.y.saturating_add(band.height),
                raster.height()
            )));
        }

        let slice = imageops::crop_imm(raster, 0, band.y, width, band.height).to_image();
        let encoded = encoder.encode(&slice)?;

        if band.index > 0 {
            document.add_page();
        }
        document.draw_image(
            encoded,
            layout.margin_mm(),
            layout.margin_mm(),
            layout.printable_width_mm(),
            layout.band_height_mm(band.height, width),
        );
    }

    Ok(document)
}

/// Write `document` to `target` via `<target>.part`, removing the temporary
/// file if anything fails.
pub async fn save_document(document: &PdfDocument, target: &Path) -> Result<(), ExportError> {
    let save_error = |e: std::io::Error| ExportError::Save {
        path: target.display().to_string(),
        message: e.to_string(),
    };

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(save_error)?;
    }

    let mut part = target.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let bytes = document.to_bytes();
    let written = match tokio::fs::write(&part, &bytes).await {
        Ok(()) => tokio::fs::rename(&part, target).await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&part).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %part.display(), "Failed to remove partial export: {}", cleanup);
            }
        }
        return Err(save_error(e));
    }

    Ok(())
}

/// Run an export on a background task and report the outcome to `feedback`.
///
/// The caller does not wait. If `feedback` has been dropped by the time the
/// export finishes (the view that requested it is gone), the outcome is only
/// logged.
pub fn export_in_background<F>(
    pipeline: Arc<ExportPipeline<F>>,
    request: ExportRequest,
    feedback: Weak<dyn Feedback>,
) -> JoinHandle<Result<ExportReport, ExportError>>
where
    F: AssetFetcher + 'static,
{
    tokio::spawn(async move {
        let result = pipeline.run(&request).await;

        match feedback.upgrade() {
            Some(feedback) => match &result {
                Ok(report) => feedback.notify(Notice::ExportSaved(report.path.clone())),
                Err(e) => handle_export_error(e, feedback.as_ref()),
            },
            None => {
                if let Err(e) = &result {
                    error!(file = %request.file_name, "Export failed with no one to notify: {}", e);
                }
            }
        }

        result
    })
}
