//! Core library for extracting registry entries ("asientos") from legal
//! registry PDFs.
//!
//! This crate provides:
//! - PDF processing (embedded text and page rasterization)
//! - Watermark-aware image enhancement before recognition
//! - Multi-pass OCR orchestration over segmentation modes and rotations
//! - OCR text normalization and fuzzy target-clause detection
//! - A paragraph state machine producing structured registry entries

pub mod error;
pub mod models;
pub mod pdf;
pub mod ocr;
pub mod registry;
pub mod pipeline;

pub use error::{AsientosError, Result};
pub use models::config::AsientosConfig;
pub use models::entry::RegistryEntry;
pub use pdf::{PdfExtractor, PdfProcessor, PdfKind};
pub use ocr::{EngineMode, OcrEngine, OcrOrchestrator, OcrOutput, OcrRequest, PixelEnhancer, SegmentationMode};
pub use registry::{EntryExtractor, FuzzyMatcher, PageExtraction, TextNormalizer};
pub use pipeline::{DocumentPipeline, DocumentResult, PageText, TextSource};

#[cfg(feature = "tesseract")]
pub use ocr::TesseractEngine;
