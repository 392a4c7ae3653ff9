//! PDF access: embedded text per page and page rasters for OCR.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use image::DynamicImage;

/// What a document is made of, judged from its text and image content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfKind {
    /// Selectable text, no images.
    Digital,
    /// Page images only; every page needs OCR.
    Scanned,
    /// Both text and images.
    Mixed,
    /// Neither.
    Empty,
}

impl PdfKind {
    /// Whether some pages will likely have to be recognized.
    pub fn needs_ocr(self) -> bool {
        matches!(self, PdfKind::Scanned | PdfKind::Mixed)
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// Source of page text and page rasters. Pages are numbered from 1.
pub trait PdfProcessor {
    fn load(&mut self, data: &[u8]) -> Result<()>;

    fn page_count(&self) -> u32;

    fn analyze(&self) -> PdfKind;

    /// Text of the whole document in reading order.
    fn document_text(&self) -> Result<String>;

    /// Selectable text of one page; empty for image-only pages.
    fn page_text(&self, page: u32) -> Result<String>;

    /// Raster of one page at `dpi`.
    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage>;

    /// Decodable images placed on one page.
    fn page_images(&self, page: u32) -> Result<Vec<DynamicImage>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_ocr() {
        assert!(PdfKind::Scanned.needs_ocr());
        assert!(PdfKind::Mixed.needs_ocr());
        assert!(!PdfKind::Digital.needs_ocr());
        assert!(!PdfKind::Empty.needs_ocr());
    }
}
