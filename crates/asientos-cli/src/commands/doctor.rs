//! Doctor command - report the OCR setup this binary would use.

use std::path::PathBuf;

use asientos_core::EngineMode;
use clap::Args;
use console::style;

use crate::discovery::discover_tessdata;

use super::{default_config_path, load_config, ocr_available};

#[derive(Args)]
pub struct DoctorArgs {
    /// Directory containing *.traineddata files
    #[arg(long)]
    tessdata: Option<PathBuf>,
}

pub async fn run(args: DoctorArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let language = config.ocr.language.clone();

    println!("asientos {}", env!("CARGO_PKG_VERSION"));
    println!();

    let config_file = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    println!(
        "Config:     {} ({})",
        config_file.display(),
        if config_file.exists() { "found" } else { "defaults" }
    );

    if ocr_available() {
        println!("OCR engine: {}", style("tesseract").green());
    } else {
        println!(
            "OCR engine: {} (rebuild with --features tesseract)",
            style("not compiled in").yellow()
        );
    }

    println!(
        "OCR mode:   {:?} (oem {})",
        config.ocr.engine_mode,
        config.ocr.engine_mode.oem()
    );

    let tessdata = discover_tessdata(args.tessdata.as_deref(), config.ocr.tessdata_dir.as_deref());
    match &tessdata {
        Some(found) => {
            println!("Tessdata:   {} (from {})", found.path.display(), found.origin);
            let languages = found.languages();
            if languages.is_empty() {
                println!("Languages:  {}", style("none").yellow());
            } else {
                println!("Languages:  {}", languages.join(", "));
            }

            if found.has_language(&language) {
                println!("Language '{}': {}", language, style("installed").green());
            } else {
                println!("Language '{}': {}", language, style("missing").red());
            }
        }
        None => {
            println!(
                "Tessdata:   {} (set TESSDATA_PREFIX or pass --tessdata)",
                style("not found").yellow()
            );
        }
    }

    check_engine(tessdata.map(|t| t.path), &language, config.ocr.engine_mode);

    Ok(())
}

#[cfg(feature = "tesseract")]
fn check_engine(data_dir: Option<PathBuf>, language: &str, engine_mode: EngineMode) {
    match asientos_core::TesseractEngine::check_init(data_dir.as_ref(), language, engine_mode) {
        Ok(()) => println!("Engine init: {}", style("ok").green()),
        Err(e) => println!("Engine init: {} ({})", style("failed").red(), e),
    }
}

#[cfg(not(feature = "tesseract"))]
fn check_engine(_data_dir: Option<PathBuf>, _language: &str, _engine_mode: EngineMode) {}
