//! Minimal multi-page PDF writer for JPEG page images.
//!
//! The output is a PDF 1.4 file with one object graph per page:
//!
//! ```text
//! 1  Catalog ─▶ 2 Pages ─┬─▶ Page ─┬─▶ Contents   (q w 0 0 h x y cm /Im0 Do Q)
//!                        │         └─▶ XObject     (/DCTDecode JPEG)
//!                        └─▶ Page ─ ...
//! ```
//!
//! Placement coordinates are given in millimetres from the page's top-left
//! corner and converted to PDF points from the bottom-left.
//!
//! Like a freshly opened print document, a new [`PdfDocument`] already holds
//! one blank page; callers draw onto it and call [`PdfDocument::add_page`]
//! before each subsequent page.

use std::fmt::Write as _;

use super::encoder::EncodedBand;
use super::layout::PageSize;

/// PDF points per millimetre.
pub const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// An image drawn at a fixed position on a page.
#[derive(Debug, Clone)]
pub struct Placement {
    pub image: EncodedBand,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// One physical page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub placements: Vec<Placement>,
}

/// An in-memory PDF document.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    size: PageSize,
    pages: Vec<Page>,
}

impl PdfDocument {
    /// A document with one blank page of `size`.
    pub fn new(size: PageSize) -> Self {
        Self {
            size,
            pages: vec![Page::default()],
        }
    }

    pub fn page_size(&self) -> PageSize {
        self.size
    }

    /// Append a blank page; subsequent drawing targets it.
    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Draw `image` on the current (last) page.
    pub fn draw_image(
        &mut self,
        image: EncodedBand,
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
    ) {
        let placement = Placement {
            image,
            x_mm,
            y_mm,
            width_mm,
            height_mm,
        };
        match self.pages.last_mut() {
            Some(page) => page.placements.push(placement),
            None => self.pages.push(Page {
                placements: vec![placement],
            }),
        }
    }

    /// Serialize the document.
    pub fn to_bytes(&self) -> Vec<u8> {
        let page_width = self.size.width_mm() * POINTS_PER_MM;
        let page_height = self.size.height_mm() * POINTS_PER_MM;

        // Object ids: 1 catalog, 2 page tree, then per page:
        // page, contents, one XObject per placement.
        let mut page_ids = Vec::with_capacity(self.pages.len());
        let mut next_id = 3;
        for page in &self.pages {
            page_ids.push(next_id);
            next_id += 2 + page.placements.len();
        }
        let object_count = next_id - 1;

        let mut writer = ObjectWriter::new(object_count);

        writer.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");

        let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        writer.object(
            2,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                self.pages.len()
            )
            .as_bytes(),
        );

        for (page, &page_id) in self.pages.iter().zip(&page_ids) {
            let contents_id = page_id + 1;
            let first_image_id = page_id + 2;

            let mut resources = String::new();
            let mut contents = String::new();
            for (i, placement) in page.placements.iter().enumerate() {
                let _ = write!(resources, " /Im{} {} 0 R", i, first_image_id + i);

                let width = placement.width_mm * POINTS_PER_MM;
                let height = placement.height_mm * POINTS_PER_MM;
                let x = placement.x_mm * POINTS_PER_MM;
                let y = page_height - placement.y_mm * POINTS_PER_MM - height;
                let _ = writeln!(
                    contents,
                    "q {:.3} 0 0 {:.3} {:.3} {:.3} cm /Im{} Do Q",
                    width, height, x, y, i
                );
            }

            writer.object(
                page_id,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.3} {:.3}] \
                     /Resources << /XObject <<{} >> >> /Contents {} 0 R >>",
                    page_width, page_height, resources, contents_id
                )
                .as_bytes(),
            );
            writer.stream(contents_id, "", contents.as_bytes());

            for (i, placement) in page.placements.iter().enumerate() {
                writer.stream(
                    first_image_id + i,
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode",
                        placement.image.width, placement.image.height
                    ),
                    &placement.image.data,
                );
            }
        }

        writer.finish()
    }
}

/// Appends numbered objects and tracks their byte offsets for the xref table.
struct ObjectWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn new(object_count: usize) -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: vec![0; object_count],
        }
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets[id - 1] = self.buf.len();
        self.buf.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, dict_entries: &str, data: &[u8]) {
        self.offsets[id - 1] = self.buf.len();
        let separator = if dict_entries.is_empty() { "" } else { " " };
        self.buf.extend_from_slice(
            format!(
                "{} 0 obj\n<< {}{}/Length {} >>\nstream\n",
                id,
                dict_entries,
                separator,
                data.len()
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = writeln!(xref, "{:010} 00000 n ", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            xref_offset
        );
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}
