//! Error taxonomy: document, recognition and extraction failures.

use thiserror::Error;

/// Top-level error returned by the pipeline entry points.
#[derive(Error, Debug)]
pub enum AsientosError {
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Raster encode/decode failure (debug dumps, page images).
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A setting the pipeline cannot run with.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Document-level and page-level PDF failures.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("not a readable PDF: {0}")]
    Parse(String),

    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    /// No raster could be produced for a page.
    #[error("cannot render page {page}: {reason}")]
    Render { page: u32, reason: String },

    /// Encrypted with a non-empty password.
    #[error("PDF is password protected")]
    Encrypted,

    #[error("PDF has no pages")]
    NoPages,

    #[error("page {0} does not exist")]
    InvalidPage(u32),
}

/// Failures of a single recognition attempt or of engine setup.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The engine could not be initialized (missing language data, bad data dir).
    #[error("failed to initialize OCR engine: {0}")]
    EngineInit(String),

    /// An engine variable was rejected.
    #[error("invalid OCR variable {name}={value}")]
    Variable { name: String, value: String },

    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("raster rejected by engine: {0}")]
    InvalidImage(String),

    /// No OCR engine is available in this build.
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),
}

/// Unusable extraction settings.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A configured target phrase is unusable.
    #[error("invalid target phrase: {0:?}")]
    InvalidPhrase(String),

    /// Similarity threshold outside 0-100.
    #[error("similarity threshold out of range: {0}")]
    InvalidThreshold(f64),
}

pub type Result<T> = std::result::Result<T, AsientosError>;
