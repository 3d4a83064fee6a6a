//! Page geometry and band slicing.
//!
//! A raster is mapped onto pages by width: the raster's full pixel width
//! always spans the printable width of the page. That fixes how many raster
//! pixels fit in the printable height of one page:
//!
//! ```text
//! content_height_px = floor(printable_height_mm * raster_width_px / printable_width_mm)
//! ```
//!
//! The raster is then cut into horizontal bands of at most that height:
//!
//! ```text
//! ┌──────────────┐ y = 0
//! │    band 0    │ height = P
//! ├──────────────┤ y = P
//! │    band 1    │ height = P
//! ├──────────────┤ y = 2P
//! │    band 2    │ height = H - 2P  (≤ P)
//! └──────────────┘ y = H
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ExportError;

/// Default margin on every side of the page, in millimetres.
pub const DEFAULT_MARGIN_MM: f64 = 10.0;

// =============================================================================
// Page Size
// =============================================================================

/// Physical page formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    pub fn width_mm(self) -> f64 {
        match self {
            PageSize::A4 => 210.0,
            PageSize::Letter => 215.9,
        }
    }

    pub fn height_mm(self) -> f64 {
        match self {
            PageSize::A4 => 297.0,
            PageSize::Letter => 279.4,
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::A4 => f.write_str("a4"),
            PageSize::Letter => f.write_str("letter"),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            other => Err(format!("unknown page size '{}' (expected a4 or letter)", other)),
        }
    }
}

// =============================================================================
// Page Layout
// =============================================================================

/// A page format with a uniform margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    page: PageSize,
    margin_mm: f64,
}

impl PageLayout {
    /// Create a layout, rejecting margins that leave no printable area.
    pub fn new(page: PageSize, margin_mm: f64) -> Result<Self, ExportError> {
        if !margin_mm.is_finite() || margin_mm < 0.0 {
            return Err(ExportError::InvalidLayout(format!(
                "margin must be a non-negative number, got {}",
                margin_mm
            )));
        }

        let layout = Self { page, margin_mm };
        if layout.printable_width_mm() <= 0.0 || layout.printable_height_mm() <= 0.0 {
            return Err(ExportError::InvalidLayout(format!(
                "{}mm margins leave no printable area on {}",
                margin_mm, page
            )));
        }
        Ok(layout)
    }

    pub fn page(&self) -> PageSize {
        self.page
    }

    pub fn margin_mm(&self) -> f64 {
        self.margin_mm
    }

    pub fn printable_width_mm(&self) -> f64 {
        self.page.width_mm() - 2.0 * self.margin_mm
    }

    pub fn printable_height_mm(&self) -> f64 {
        self.page.height_mm() - 2.0 * self.margin_mm
    }

    /// Raster pixels that fit in one page's printable height when the
    /// raster's width spans the printable width.
    pub fn content_height_px(&self, raster_width: u32) -> Result<u32, ExportError> {
        if raster_width == 0 {
            return Err(ExportError::InvalidLayout(
                "raster has zero width".to_string(),
            ));
        }

        let height = (self.printable_height_mm() * f64::from(raster_width)
            / self.printable_width_mm())
        .floor();

        if height < 1.0 {
            return Err(ExportError::InvalidLayout(format!(
                "a {}px wide raster leaves no rows per page",
                raster_width
            )));
        }
        Ok(height as u32)
    }

    /// Drawn height of a band, in millimetres, at full printable width.
    pub fn band_height_mm(&self, band_height_px: u32, raster_width: u32) -> f64 {
        f64::from(band_height_px) * self.printable_width_mm() / f64::from(raster_width.max(1))
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page: PageSize::A4,
            margin_mm: DEFAULT_MARGIN_MM,
        }
    }
}

// =============================================================================
// Bands
// =============================================================================

/// One horizontal slice of a raster, destined for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    /// Page index (0-based)
    pub index: usize,
    /// First raster row of the band
    pub y: u32,
    /// Number of rows in the band
    pub height: u32,
}

/// Slice `raster_height` rows into bands of at most `page_content_height`.
///
/// Produces `ceil(raster_height / page_content_height)` contiguous bands
/// whose heights sum to `raster_height`. Only the last band may be shorter.
pub fn plan_bands(raster_height: u32, page_content_height: u32) -> Result<Vec<Band>, ExportError> {
    if page_content_height == 0 {
        return Err(ExportError::InvalidLayout(
            "page content height must be positive".to_string(),
        ));
    }

    let total_pages = raster_height.div_ceil(page_content_height) as usize;
    let bands = (0..total_pages)
        .map(|index| {
            let y = index as u32 * page_content_height;
            Band {
                index,
                y,
                height: page_content_height.min(raster_height - y),
            }
        })
        .collect();

    Ok(bands)
}

// =============================================================================
// Tests
// =============================================================================
