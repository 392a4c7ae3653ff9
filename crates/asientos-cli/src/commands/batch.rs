//! Batch processing command for multiple registry PDFs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use asientos_core::models::config::AsientosConfig;
use asientos_core::pdf::{PdfExtractor, PdfProcessor};
use asientos_core::{DocumentPipeline, DocumentResult};

use super::process::{format_entries, OutputFormat};
use super::{apply_tessdata, load_config, ocr_engine};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input PDFs (e.g. "scans/*.pdf")
    #[arg(required = true)]
    input: String,

    /// Output directory (default: next to each PDF)
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Skip OCR and use only embedded PDF text
    #[arg(long)]
    text_only: bool,

    /// Directory containing *.traineddata files
    #[arg(long)]
    tessdata: Option<PathBuf>,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    document: Option<DocumentResult>,
    error: Option<String>,
    processing_time_ms: u64,
    processed_at: String,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if !args.text_only {
        apply_tessdata(&mut config, args.tessdata.as_deref());
    }

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching PDF files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(output_dir) = &args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let job = BatchJob {
        files,
        config,
        format: args.format,
        output_dir: args.output_dir.clone(),
        text_only: args.text_only,
        continue_on_error: args.continue_on_error,
    };
    let pb = overall_pb.clone();
    let results = tokio::task::spawn_blocking(move || job.run(&pb)).await??;

    overall_pb.finish_and_clear();

    let successful = results.iter().filter(|r| r.document.is_some()).count();
    let failed: Vec<&FileResult> = results.iter().filter(|r| r.error.is_some()).collect();
    let entries: usize = results
        .iter()
        .filter_map(|r| r.document.as_ref())
        .map(|d| d.entries.len())
        .sum();

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} entries",
        style(successful).green(),
        style(failed.len()).red(),
        entries
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Everything the blocking worker needs, moved off the async runtime.
struct BatchJob {
    files: Vec<PathBuf>,
    config: AsientosConfig,
    format: OutputFormat,
    output_dir: Option<PathBuf>,
    text_only: bool,
    continue_on_error: bool,
}

impl BatchJob {
    fn run(self, pb: &ProgressBar) -> anyhow::Result<Vec<FileResult>> {
        // One engine for the whole batch so language data loads once
        let engine = if self.text_only { None } else { ocr_engine() };

        let mut pipeline = DocumentPipeline::new(self.config.clone())?;
        if let Some(engine) = engine.as_deref() {
            pipeline = pipeline.with_engine(engine);
        }

        let mut results = Vec::with_capacity(self.files.len());

        for path in &self.files {
            pb.set_message(
                path.file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("")
                    .to_string(),
            );

            let file_start = Instant::now();
            let outcome = process_file(path, &pipeline)
                .and_then(|document| self.write_output(path, &document).map(|_| document));
            let processing_time_ms = file_start.elapsed().as_millis() as u64;
            let processed_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

            match outcome {
                Ok(document) => results.push(FileResult {
                    path: path.clone(),
                    document: Some(document),
                    error: None,
                    processing_time_ms,
                    processed_at,
                }),
                Err(e) => {
                    let error_msg = e.to_string();
                    if !self.continue_on_error {
                        error!("Failed to process {}: {}", path.display(), error_msg);
                        anyhow::bail!("Processing failed: {}", error_msg);
                    }
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(FileResult {
                        path: path.clone(),
                        document: None,
                        error: Some(error_msg),
                        processing_time_ms,
                        processed_at,
                    });
                }
            }

            pb.inc(1);
        }

        Ok(results)
    }

    fn write_output(&self, path: &Path, document: &DocumentResult) -> anyhow::Result<()> {
        let output_path = output_path_for(path, self.output_dir.as_deref(), self.format);
        let content = format_entries(document, self.format, path)?;
        fs::write(&output_path, content)?;
        debug!("Wrote output to {}", output_path.display());
        Ok(())
    }
}

fn process_file(path: &Path, pipeline: &DocumentPipeline<'_>) -> anyhow::Result<DocumentResult> {
    let data = fs::read(path)?;
    let mut pdf = PdfExtractor::new();
    pdf.load(&data)?;
    Ok(pipeline.process(&pdf))
}

/// `<stem>_asientos.<ext>` in `output_dir`, or next to the input.
fn output_path_for(input: &Path, output_dir: Option<&Path>, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let name = format!("{}_asientos.{}", stem, format.extension());

    match output_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "pages",
        "ocr_pages",
        "entries",
        "target_detected",
        "scanned",
        "processing_time_ms",
        "processed_at",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(document) = &result.document {
            wtr.write_record([
                filename,
                "success",
                &document.pages.len().to_string(),
                &document.ocr_page_count().to_string(),
                &document.entries.len().to_string(),
                if document.target_pages.is_empty() { "false" } else { "true" },
                if document.scanned { "true" } else { "false" },
                &result.processing_time_ms.to_string(),
                &result.processed_at,
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                &result.processed_at,
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
