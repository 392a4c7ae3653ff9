//! Process command - extract registry entries from a single PDF.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use asientos_core::models::config::AsientosConfig;
use asientos_core::pdf::{PdfExtractor, PdfProcessor};
use asientos_core::{DocumentPipeline, DocumentResult};

use super::{apply_tessdata, load_config, ocr_engine};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also write the normalized text of every page to this file
    #[arg(long)]
    text_output: Option<PathBuf>,

    /// Skip OCR and use only embedded PDF text
    #[arg(long)]
    text_only: bool,

    /// Directory containing *.traineddata files
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// Save rendered and enhanced page rasters to this directory
    #[arg(long)]
    debug_images: Option<PathBuf>,

    /// Rendering resolution for OCR
    #[arg(long)]
    dpi: Option<u32>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array of entries
    Json,
    /// CSV, one row per entry
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    ensure_pdf(&args.input)?;

    if let Some(dpi) = args.dpi {
        config.pdf.render_dpi = dpi;
    }
    if let Some(dir) = &args.debug_images {
        config.enhance.debug_dir = Some(dir.clone());
    }
    if !args.text_only {
        apply_tessdata(&mut config, args.tessdata.as_deref());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} pages {msg}")?
            .progress_chars("##-"),
    );

    let input = args.input.clone();
    let text_only = args.text_only;
    let page_pb = pb.clone();
    let result = tokio::task::spawn_blocking(move || {
        process_document(&input, config, text_only, &page_pb)
    })
    .await??;

    pb.finish_and_clear();

    let output = format_entries(&result, args.format, &args.input)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} {} entries written to {}",
            style("✓").green(),
            result.entries.len(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if let Some(text_path) = &args.text_output {
        fs::write(text_path, result.combined_text())?;
        println!(
            "{} Page text written to {}",
            style("✓").green(),
            text_path.display()
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn ensure_pdf(path: &Path) -> anyhow::Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if extension != "pdf" {
        anyhow::bail!("Unsupported file format: '{}' (expected a PDF)", extension);
    }
    Ok(())
}

/// Load and run the page pipeline over one PDF. Blocking.
pub fn process_document(
    path: &Path,
    config: AsientosConfig,
    text_only: bool,
    pb: &ProgressBar,
) -> anyhow::Result<DocumentResult> {
    let data = fs::read(path)?;
    let mut pdf = PdfExtractor::new();
    pdf.load(&data)?;

    let engine = if text_only { None } else { ocr_engine() };

    let mut pipeline = DocumentPipeline::new(config)?;
    if let Some(engine) = engine.as_deref() {
        pipeline = pipeline.with_engine(engine);
    }

    let result = pipeline.process_with_progress(&pdf, |page, total| {
        pb.set_length(total as u64);
        pb.set_position(page.saturating_sub(1) as u64);
        pb.set_message(format!("page {}", page));
    });
    pb.set_position(pb.length().unwrap_or(0));

    Ok(result)
}

pub fn format_entries(
    result: &DocumentResult,
    format: OutputFormat,
    source: &Path,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(result.to_json()?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result, source)),
    }
}

fn format_csv(result: &DocumentResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "inscriptionRecord",
        "originReference",
        "identification",
        "description",
        "isSimilarityMatch",
    ])?;

    for entry in &result.entries {
        wtr.write_record([
            entry.inscription_record.as_str(),
            entry.origin_reference.as_deref().unwrap_or(""),
            entry.identification.as_deref().unwrap_or(""),
            entry.description.as_deref().unwrap_or(""),
            if entry.is_similarity_match { "true" } else { "false" },
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &DocumentResult, source: &Path) -> String {
    let mut output = String::new();

    output.push_str(&format!("Document: {}\n", source.display()));
    output.push_str(&format!(
        "Pages: {} ({} recognized by OCR)\n",
        result.pages.len(),
        result.ocr_page_count()
    ));
    if result.scanned {
        output.push_str("Embedded text: too little, treated as scanned\n");
    }
    output.push_str(&format!("Entries: {}\n", result.entries.len()));
    if !result.target_pages.is_empty() {
        let pages: Vec<String> = result.target_pages.iter().map(|p| p.to_string()).collect();
        output.push_str(&format!("Target clause on pages: {}\n", pages.join(", ")));
    }

    for (i, entry) in result.entries.iter().enumerate() {
        output.push('\n');
        output.push_str(&format!("Entry {}\n", i + 1));
        output.push_str(&format!("  Inscription:    {}\n", entry.inscription_record));
        if let Some(reference) = &entry.origin_reference {
            output.push_str(&format!("  Reference:      {}\n", reference));
        }
        if let Some(id) = &entry.identification {
            output.push_str(&format!("  Identification: {}\n", id));
        }
        if entry.is_similarity_match {
            output.push_str("  Matched by similarity\n");
        }
        if let Some(description) = &entry.description {
            output.push_str("  Description:\n");
            for line in description.lines() {
                output.push_str(&format!("    {}\n", line));
            }
        }
    }

    output
}
