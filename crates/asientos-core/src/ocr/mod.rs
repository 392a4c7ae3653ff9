//! Raster enhancement and multi-pass OCR.

mod engine;
mod enhance;
mod orchestrator;
mod rotation;
#[cfg(feature = "tesseract")]
mod tesseract;

pub use engine::{EngineMode, OcrEngine, OcrOutput, OcrRequest, SegmentationMode};
pub use enhance::{adjust_contrast, is_watermark, luma, stretch_contrast, PixelEnhancer};
pub use orchestrator::{is_better, select_best, Hypothesis, OcrAttempt, OcrOrchestrator, Recognition};
pub use rotation::{rotate, rotated_dimensions};

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;
