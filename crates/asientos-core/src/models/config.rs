//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::ocr::{EngineMode, SegmentationMode};

/// Characters the recognizer may emit: Spanish letters, digits, and the
/// punctuation that shows up in registry certificates.
pub const DEFAULT_CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNÑOPQRSTUVWXYZabcdefghijklmnñopqrstuvwxyzáéíóúÁÉÍÓÚüÜ0123456789.,;:!?()[]{}¿¡\"'$%&/\\-_@<>*+=#°º";

/// Main configuration for the asientos pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AsientosConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Raster enhancement configuration.
    pub enhance: EnhanceConfig,

    /// Registry entry extraction configuration.
    pub extraction: ExtractionConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Pages whose trimmed embedded text is shorter than this are OCR'd.
    pub min_direct_text_length: usize,

    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,

    /// When a page is OCR'd, keep whichever of direct/OCR text is longer.
    pub prefer_longer_text: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 300,
            min_direct_text_length: 100,
            max_pages: 0,
            prefer_longer_text: true,
        }
    }
}

/// OCR engine and search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition language (Tesseract language code, e.g. "spa" or "spa+eng").
    pub language: String,

    /// Engine mode passed with every request.
    pub engine_mode: EngineMode,

    /// Segmentation hypotheses, tried in order.
    pub segmentation_modes: Vec<SegmentationMode>,

    /// Rotation angles (degrees) tried when recognition comes up short.
    pub rotation_angles: Vec<f32>,

    /// Below this many recognized characters, rotations are tried.
    pub min_text_length: usize,

    /// Extra engine variables applied to every request.
    pub variables: BTreeMap<String, String>,

    /// Directory holding `*.traineddata` files. Resolved once by the caller.
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        let mut variables = BTreeMap::new();
        variables.insert(
            "tessedit_char_whitelist".to_string(),
            DEFAULT_CHAR_WHITELIST.to_string(),
        );
        variables.insert("preserve_interword_spaces".to_string(), "1".to_string());
        variables.insert("textord_heavy_nr".to_string(), "1".to_string());
        variables.insert(
            "language_model_penalty_non_dict_word".to_string(),
            "0.5".to_string(),
        );
        variables.insert(
            "language_model_penalty_non_freq_dict_word".to_string(),
            "0.5".to_string(),
        );

        Self {
            language: "spa".to_string(),
            engine_mode: EngineMode::TesseractAndLstm,
            segmentation_modes: vec![
                SegmentationMode::SingleBlock,
                SegmentationMode::SingleColumn,
                SegmentationMode::SparseTextOsd,
                SegmentationMode::Auto,
            ],
            rotation_angles: vec![90.0, 180.0, 270.0, 5.0, 355.0],
            min_text_length: 200,
            variables,
            tessdata_dir: None,
        }
    }
}

/// Raster enhancement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Run the watermark/contrast/sharpen stages before OCR.
    pub enabled: bool,

    /// Contrast boost in [-100, 100] applied before enhancement.
    pub pre_contrast: Option<f32>,

    /// Directory for intermediate raster dumps (off when unset).
    pub debug_dir: Option<PathBuf>,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pre_contrast: Some(40.0),
            debug_dir: None,
        }
    }
}

/// Registry entry extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Target clause phrases checked on every page.
    pub target_phrases: Vec<String>,

    /// Minimum fuzzy similarity (percent) to count as a hit.
    pub similarity_threshold: f64,

    /// Emit a synthetic entry when the target clause is found but no
    /// structured entry could be parsed from the page.
    pub fallback_entry: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            target_phrases: vec![
                "A FAVOR DEL BANCO DE RESERVAS".to_string(),
                "BANCO DE RESERVAS".to_string(),
                "A FAVOR DEL BANCO RESERVAS".to_string(),
            ],
            similarity_threshold: 75.0,
            fallback_entry: true,
        }
    }
}

impl AsientosConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = AsientosConfig::default();
        assert_eq!(config.pdf.min_direct_text_length, 100);
        assert_eq!(config.ocr.min_text_length, 200);
        assert_eq!(config.ocr.segmentation_modes.len(), 4);
        assert_eq!(config.extraction.similarity_threshold, 75.0);
        assert!(config.enhance.debug_dir.is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "ocr": { "language": "spa+eng" }, "pdf": { "render_dpi": 600 } }"#;
        let config: AsientosConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.ocr.language, "spa+eng");
        assert_eq!(config.pdf.render_dpi, 600);
        assert_eq!(config.pdf.min_direct_text_length, 100);
        assert_eq!(config.ocr.rotation_angles, vec![90.0, 180.0, 270.0, 5.0, 355.0]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AsientosConfig::default();
        config.extraction.similarity_threshold = 80.0;
        config.ocr.segmentation_modes = vec![SegmentationMode::Auto];
        config.save(&path).unwrap();

        let loaded = AsientosConfig::from_file(&path).unwrap();
        assert_eq!(loaded.extraction.similarity_threshold, 80.0);
        assert_eq!(loaded.ocr.segmentation_modes, vec![SegmentationMode::Auto]);
    }
}
