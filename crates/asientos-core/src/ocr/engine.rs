//! The OCR engine seam: request/response types and the engine trait.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Page segmentation hypothesis handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Automatic segmentation with orientation and script detection.
    AutoOsd,
    /// Fully automatic page segmentation, no OSD.
    Auto,
    /// A single column of text of variable sizes.
    SingleColumn,
    /// A single uniform block of text.
    SingleBlock,
    /// As much text as possible in no particular order.
    SparseText,
    /// Sparse text with orientation and script detection.
    SparseTextOsd,
}

impl SegmentationMode {
    /// Tesseract `tessedit_pageseg_mode` value.
    pub fn psm(self) -> u8 {
        match self {
            SegmentationMode::AutoOsd => 1,
            SegmentationMode::Auto => 3,
            SegmentationMode::SingleColumn => 4,
            SegmentationMode::SingleBlock => 6,
            SegmentationMode::SparseText => 11,
            SegmentationMode::SparseTextOsd => 12,
        }
    }
}

impl fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentationMode::AutoOsd => "auto+osd",
            SegmentationMode::Auto => "auto",
            SegmentationMode::SingleColumn => "column",
            SegmentationMode::SingleBlock => "block",
            SegmentationMode::SparseText => "sparse",
            SegmentationMode::SparseTextOsd => "sparse+osd",
        };
        write!(f, "{} (psm {})", name, self.psm())
    }
}

/// Recognition engine mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    TesseractOnly,
    LstmOnly,
    TesseractAndLstm,
    Default,
}

impl EngineMode {
    /// Tesseract `tessedit_ocr_engine_mode` value.
    pub fn oem(self) -> u8 {
        match self {
            EngineMode::TesseractOnly => 0,
            EngineMode::LstmOnly => 1,
            EngineMode::TesseractAndLstm => 2,
            EngineMode::Default => 3,
        }
    }
}

/// One engine invocation.
#[derive(Debug, Clone)]
pub struct OcrRequest {
    /// Language code, e.g. "spa".
    pub language: String,
    pub engine_mode: EngineMode,
    pub segmentation_mode: SegmentationMode,
    /// Named engine variables, applied in key order.
    pub variables: BTreeMap<String, String>,
    /// Resolution the raster was rendered at.
    pub dpi: u32,
    /// Language data directory, if not the engine default.
    pub data_dir: Option<PathBuf>,
}

/// Text recognized from one raster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    /// Mean confidence in [0, 1].
    pub confidence: f32,
}

/// An OCR engine capability.
///
/// Implementations must not retain the raster beyond the call.
pub trait OcrEngine {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Recognize text in `image` with the given configuration.
    fn recognize(&self, image: &RgbImage, request: &OcrRequest) -> Result<OcrOutput, OcrError>;
}

impl<E: OcrEngine + ?Sized> OcrEngine for &E {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image: &RgbImage, request: &OcrRequest) -> Result<OcrOutput, OcrError> {
        (**self).recognize(image, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psm_values() {
        assert_eq!(SegmentationMode::SingleBlock.psm(), 6);
        assert_eq!(SegmentationMode::SingleColumn.psm(), 4);
        assert_eq!(SegmentationMode::SparseTextOsd.psm(), 12);
        assert_eq!(SegmentationMode::Auto.psm(), 3);
    }

    #[test]
    fn test_mode_serde_names() {
        let json = serde_json::to_string(&SegmentationMode::SparseTextOsd).unwrap();
        assert_eq!(json, "\"sparse_text_osd\"");
        let mode: EngineMode = serde_json::from_str("\"tesseract_and_lstm\"").unwrap();
        assert_eq!(mode.oem(), 2);
    }
}
