//! CLI subcommands and the setup they share.

pub mod batch;
pub mod config;
pub mod doctor;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use asientos_core::models::config::AsientosConfig;
use asientos_core::OcrEngine;

use crate::discovery::discover_tessdata;

/// Default configuration file under the platform config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("asientos")
        .join("config.json")
}

/// Load the configuration: explicit path, then the default file, then defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<AsientosConfig> {
    if let Some(path) = config_path {
        let path = Path::new(path);
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(AsientosConfig::from_file(path)?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(AsientosConfig::from_file(&default_path)?)
    } else {
        Ok(AsientosConfig::default())
    }
}

/// Resolve language data once and inject it into the OCR configuration.
pub fn apply_tessdata(config: &mut AsientosConfig, flag: Option<&Path>) {
    match discover_tessdata(flag, config.ocr.tessdata_dir.as_deref()) {
        Some(found) => {
            info!("Tessdata: {} ({})", found.path.display(), found.origin);
            if !found.has_language(&config.ocr.language) {
                warn!(
                    "Language '{}' not found in {}",
                    config.ocr.language,
                    found.path.display()
                );
            }
            config.ocr.tessdata_dir = Some(found.path);
        }
        None => {
            debug!("No tessdata directory found, using the engine default");
            config.ocr.tessdata_dir = None;
        }
    }
}

/// The OCR engine compiled into this binary, if any.
#[cfg(feature = "tesseract")]
pub fn ocr_engine() -> Option<Box<dyn OcrEngine>> {
    Some(Box::new(asientos_core::TesseractEngine::new()))
}

/// The OCR engine compiled into this binary, if any.
#[cfg(not(feature = "tesseract"))]
pub fn ocr_engine() -> Option<Box<dyn OcrEngine>> {
    warn!("Built without the `tesseract` feature; scanned pages cannot be recognized");
    None
}

pub fn ocr_available() -> bool {
    cfg!(feature = "tesseract")
}
