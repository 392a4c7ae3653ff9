//! Per-page document pipeline: direct text, OCR fallback, normalization and
//! entry extraction.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AsientosError, PdfError, Result};
use crate::models::config::AsientosConfig;
use crate::models::entry::{entries_to_json, RegistryEntry};
use crate::ocr::{adjust_contrast, OcrEngine, OcrOrchestrator, PixelEnhancer, Recognition};
use crate::pdf::{PdfExtractor, PdfProcessor};
use crate::registry::EntryExtractor;

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Embedded selectable text.
    Direct,
    /// Recognized from the page raster.
    Ocr,
    /// Nothing usable.
    Empty,
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::Direct => write!(f, "direct"),
            TextSource::Ocr => write!(f, "ocr"),
            TextSource::Empty => write!(f, "empty"),
        }
    }
}

/// Normalized text of one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageText {
    /// Page number (1-indexed).
    pub page: u32,
    pub source: TextSource,
    pub text: String,
    /// OCR confidence in [0, 1] when the text was recognized.
    pub confidence: Option<f32>,
}

/// Entries and page texts of one document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentResult {
    pub entries: Vec<RegistryEntry>,
    pub pages: Vec<PageText>,
    /// Pages on which the target clause was detected.
    pub target_pages: Vec<u32>,
    /// The whole document carried too little embedded text to be read directly.
    pub scanned: bool,
    pub processing_time_ms: u64,
}

impl DocumentResult {
    /// Entry list as a pretty JSON array (`[]` when empty).
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        entries_to_json(&self.entries)
    }

    /// All page texts with page separators.
    pub fn combined_text(&self) -> String {
        let mut out = String::new();
        for page in &self.pages {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("--- Página {} ({}) ---\n", page.page, page.source));
            out.push_str(&page.text);
            out.push('\n');
        }
        out
    }

    pub fn ocr_page_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.source == TextSource::Ocr)
            .count()
    }
}

/// Runs the page pipeline over a loaded PDF.
pub struct DocumentPipeline<'a> {
    config: AsientosConfig,
    engine: Option<&'a dyn OcrEngine>,
    enhancer: PixelEnhancer,
    extractor: EntryExtractor,
}

impl<'a> DocumentPipeline<'a> {
    /// Create a pipeline without an OCR engine.
    pub fn new(config: AsientosConfig) -> Result<Self> {
        if config.pdf.render_dpi == 0 {
            return Err(AsientosError::Config("pdf.render_dpi must be positive".to_string()));
        }
        if config.ocr.segmentation_modes.is_empty() {
            return Err(AsientosError::Config(
                "ocr.segmentation_modes must not be empty".to_string(),
            ));
        }

        let extractor = EntryExtractor::new(&config.extraction)?;
        Ok(Self {
            config,
            engine: None,
            enhancer: PixelEnhancer::new(),
            extractor,
        })
    }

    /// Use `engine` for pages without enough embedded text.
    pub fn with_engine(mut self, engine: &'a dyn OcrEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn config(&self) -> &AsientosConfig {
        &self.config
    }

    /// Load a PDF file and process it.
    pub fn process_file(&self, path: &Path) -> Result<DocumentResult> {
        let data = std::fs::read(path)?;
        let mut pdf = PdfExtractor::new();
        pdf.load(&data)?;
        Ok(self.process(&pdf))
    }

    /// Process every page of a loaded PDF.
    pub fn process(&self, pdf: &dyn PdfProcessor) -> DocumentResult {
        self.process_with_progress(pdf, |_, _| {})
    }

    /// Process every page, calling `on_page(page, total)` before each one.
    ///
    /// Page failures are logged and yield empty page text; they never
    /// abort the document.
    pub fn process_with_progress(
        &self,
        pdf: &dyn PdfProcessor,
        mut on_page: impl FnMut(u32, u32),
    ) -> DocumentResult {
        let start = Instant::now();

        let mut total = pdf.page_count();
        if self.config.pdf.max_pages > 0 {
            total = total.min(self.config.pdf.max_pages as u32);
        }
        let kind = pdf.analyze();
        info!("Processing {} pages ({:?} PDF)", total, kind);
        if kind.needs_ocr() && self.engine.is_none() {
            warn!("Document has page images but no OCR engine is configured");
        }

        let mut result = DocumentResult {
            scanned: self.looks_scanned(pdf),
            ..DocumentResult::default()
        };

        for page in 1..=total {
            on_page(page, total);

            let page_text = self.read_page(pdf, page);
            let extraction = self.extractor.extract_normalized(&page_text.text);

            info!(
                "Page {}: {} chars ({}), {} entries",
                page,
                page_text.text.chars().count(),
                page_text.source,
                extraction.entries.len()
            );

            if extraction.target_detected() {
                result.target_pages.push(page);
            }
            result.entries.extend(extraction.entries);
            result.pages.push(page_text);
        }

        result.processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Found {} entries in {} pages ({}ms)",
            result.entries.len(),
            total,
            result.processing_time_ms
        );
        result
    }

    /// Whole-document check on the embedded text, ahead of the per-page decisions.
    fn looks_scanned(&self, pdf: &dyn PdfProcessor) -> bool {
        let text_len = match pdf.document_text() {
            Ok(text) => text.trim().chars().count(),
            Err(e) => {
                warn!("Document text extraction failed: {}", e);
                0
            }
        };

        let scanned = text_len < self.config.pdf.min_direct_text_length;
        if scanned {
            info!(
                "Document has {} chars of embedded text, looks scanned",
                text_len
            );
        } else {
            debug!("Document has {} chars of embedded text", text_len);
        }
        scanned
    }

    /// Produce the normalized text of one page.
    fn read_page(&self, pdf: &dyn PdfProcessor, page: u32) -> PageText {
        let direct = match pdf.page_text(page) {
            Ok(text) => text,
            Err(e) => {
                warn!("Page {}: text extraction failed: {}", page, e);
                String::new()
            }
        };
        let direct_len = direct.trim().chars().count();

        let (raw, source, confidence) = if direct_len >= self.config.pdf.min_direct_text_length {
            debug!("Page {}: using {} chars of embedded text", page, direct_len);
            (direct, TextSource::Direct, None)
        } else {
            match self.engine {
                Some(engine) => {
                    info!(
                        "Page {}: {} chars of embedded text, running OCR",
                        page, direct_len
                    );
                    let recognition = match self.recognize_page(engine, pdf, page) {
                        Ok(recognition) => recognition,
                        Err(e) => {
                            warn!("Page {}: OCR skipped: {}", page, e);
                            Recognition::default()
                        }
                    };
                    self.choose_text(direct, recognition)
                }
                None => {
                    debug!("Page {}: no OCR engine, keeping embedded text", page);
                    (direct, TextSource::Direct, None)
                }
            }
        };

        let text = self.extractor.normalizer().normalize(&raw);
        let source = if text.is_empty() { TextSource::Empty } else { source };

        PageText {
            page,
            source,
            text,
            confidence,
        }
    }

    fn choose_text(
        &self,
        direct: String,
        recognition: Recognition,
    ) -> (String, TextSource, Option<f32>) {
        let direct_len = direct.trim().chars().count();
        let ocr_len = recognition.text.trim().chars().count();

        let use_ocr = if self.config.pdf.prefer_longer_text {
            ocr_len > direct_len
        } else {
            ocr_len > 0
        };

        if use_ocr {
            (recognition.text, TextSource::Ocr, Some(recognition.confidence))
        } else {
            (direct, TextSource::Direct, None)
        }
    }

    /// Render, enhance and recognize one page.
    fn recognize_page(
        &self,
        engine: &dyn OcrEngine,
        pdf: &dyn PdfProcessor,
        page: u32,
    ) -> Result<Recognition> {
        let dpi = self.config.pdf.render_dpi;
        let rendered = pdf.render_page(page, dpi)?.to_rgb8();
        if rendered.width() == 0 || rendered.height() == 0 {
            return Err(PdfError::Render {
                page,
                reason: "empty raster".to_string(),
            }
            .into());
        }
        self.dump(&rendered, page, "original");

        let raster = self.prepare(rendered);
        self.dump(&raster, page, "enhanced");

        let orchestrator = OcrOrchestrator::new(engine, self.config.ocr.clone()).with_dpi(dpi);
        Ok(orchestrator.recognize(&raster))
    }

    /// Pre-contrast and enhancement, each consuming the previous raster.
    fn prepare(&self, raster: RgbImage) -> RgbImage {
        let enhance = &self.config.enhance;

        let raster = match enhance.pre_contrast {
            Some(amount) if amount != 0.0 => adjust_contrast(&raster, amount),
            _ => raster,
        };

        if enhance.enabled {
            self.enhancer.enhance(&raster)
        } else {
            raster
        }
    }

    fn dump(&self, raster: &RgbImage, page: u32, stage: &str) {
        let Some(dir) = &self.config.enhance.debug_dir else {
            return;
        };

        let path = dir.join(format!("page_{}_{}.png", page, stage));
        let saved = std::fs::create_dir_all(dir)
            .map_err(AsientosError::from)
            .and_then(|_| raster.save(&path).map_err(AsientosError::from));

        match saved {
            Ok(()) => debug!("Saved {}", path.display()),
            Err(e) => warn!("Could not save debug raster {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::{OcrOutput, OcrRequest};
    use crate::pdf::{self, PdfKind};
    use image::{DynamicImage, Rgb};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    /// In-memory PDF: per-page embedded text, optional raster.
    struct FakePdf {
        pages: Vec<(String, bool)>,
    }

    impl PdfProcessor for FakePdf {
        fn load(&mut self, _data: &[u8]) -> pdf::Result<()> {
            Ok(())
        }

        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn analyze(&self) -> PdfKind {
            PdfKind::Mixed
        }

        fn document_text(&self) -> pdf::Result<String> {
            Ok(self
                .pages
                .iter()
                .map(|(t, _)| t.as_str())
                .collect::<Vec<_>>()
                .join("\n"))
        }

        fn page_text(&self, page: u32) -> pdf::Result<String> {
            self.pages
                .get(page as usize - 1)
                .map(|(t, _)| t.clone())
                .ok_or(PdfError::InvalidPage(page))
        }

        fn render_page(&self, page: u32, _dpi: u32) -> pdf::Result<DynamicImage> {
            match self.pages.get(page as usize - 1) {
                Some((_, true)) => Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                    40,
                    30,
                    Rgb([250, 250, 250]),
                ))),
                _ => Err(PdfError::Render {
                    page,
                    reason: "no image".to_string(),
                }),
            }
        }

        fn page_images(&self, _page: u32) -> pdf::Result<Vec<DynamicImage>> {
            Ok(Vec::new())
        }
    }

    /// Returns the same text for every request.
    struct FixedEngine {
        text: String,
        calls: Cell<usize>,
    }

    impl FixedEngine {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: Cell::new(0),
            }
        }
    }

    impl OcrEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _image: &RgbImage, _request: &OcrRequest) -> std::result::Result<OcrOutput, OcrError> {
            self.calls.set(self.calls.get() + 1);
            Ok(OcrOutput {
                text: self.text.clone(),
                confidence: 0.8,
            })
        }
    }

    fn long_registry_text() -> String {
        format!(
            "Inscrito el: 01/02/2020\nNo. 123456789 Hipoteca a favor de BANCO DE RESERVAS\n{}",
            "continuación de texto ".repeat(20)
        )
    }

    fn quick_config() -> AsientosConfig {
        let mut config = AsientosConfig::default();
        config.ocr.rotation_angles = Vec::new();
        config
    }

    #[test]
    fn test_direct_text_skips_ocr() {
        let pdf = FakePdf {
            pages: vec![(long_registry_text(), true)],
        };
        let engine = FixedEngine::new("ignored");
        let pipeline = DocumentPipeline::new(quick_config()).unwrap().with_engine(&engine);

        let result = pipeline.process(&pdf);

        assert_eq!(engine.calls.get(), 0);
        assert_eq!(result.pages[0].source, TextSource::Direct);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].identification.as_deref(), Some("123456789"));
        assert_eq!(result.target_pages, vec![1]);
    }

    #[test]
    fn test_document_level_scanned_check() {
        let pipeline = DocumentPipeline::new(quick_config()).unwrap();

        let digital = FakePdf {
            pages: vec![(long_registry_text(), false)],
        };
        assert!(!pipeline.process(&digital).scanned);

        // Two short pages: each under the limit, and so is their sum
        let scanned = FakePdf {
            pages: vec![
                ("Inscrito".to_string(), true),
                ("   \n".to_string(), true),
            ],
        };
        assert!(pipeline.process(&scanned).scanned);
        assert!(pipeline.process(&FakePdf { pages: Vec::new() }).scanned);
    }

    #[test]
    fn test_unreadable_document_text_counts_as_scanned() {
        struct NoText(FakePdf);

        impl PdfProcessor for NoText {
            fn load(&mut self, data: &[u8]) -> pdf::Result<()> {
                self.0.load(data)
            }
            fn page_count(&self) -> u32 {
                self.0.page_count()
            }
            fn analyze(&self) -> PdfKind {
                self.0.analyze()
            }
            fn document_text(&self) -> pdf::Result<String> {
                Err(PdfError::TextExtraction("broken font".to_string()))
            }
            fn page_text(&self, page: u32) -> pdf::Result<String> {
                self.0.page_text(page)
            }
            fn render_page(&self, page: u32, dpi: u32) -> pdf::Result<DynamicImage> {
                self.0.render_page(page, dpi)
            }
            fn page_images(&self, page: u32) -> pdf::Result<Vec<DynamicImage>> {
                self.0.page_images(page)
            }
        }

        let pdf = NoText(FakePdf {
            pages: vec![(long_registry_text(), false)],
        });
        let result = DocumentPipeline::new(quick_config()).unwrap().process(&pdf);

        assert!(result.scanned);
        // Page text is still read on its own
        assert_eq!(result.pages[0].source, TextSource::Direct);
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn test_short_page_uses_ocr_text() {
        let pdf = FakePdf {
            pages: vec![("Inscrito".to_string(), true)],
        };
        let engine = FixedEngine::new(&long_registry_text());
        let pipeline = DocumentPipeline::new(quick_config()).unwrap().with_engine(&engine);

        let result = pipeline.process(&pdf);

        assert_eq!(engine.calls.get(), 4);
        assert_eq!(result.pages[0].source, TextSource::Ocr);
        assert_eq!(result.pages[0].confidence, Some(0.8));
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.ocr_page_count(), 1);
    }

    #[test]
    fn test_render_failure_keeps_direct_text() {
        let pdf = FakePdf {
            pages: vec![
                ("a favor de BANCO RESERVAS".to_string(), false),
                (String::new(), false),
            ],
        };
        let engine = FixedEngine::new("never used");
        let pipeline = DocumentPipeline::new(quick_config()).unwrap().with_engine(&engine);

        let result = pipeline.process(&pdf);

        assert_eq!(engine.calls.get(), 0);
        assert_eq!(result.pages.len(), 2);
        assert_eq!(result.pages[0].source, TextSource::Direct);
        assert_eq!(result.pages[1].source, TextSource::Empty);
        // Synthetic entry from the detected clause on page 1
        assert_eq!(result.entries.len(), 1);
        assert!(!result.entries[0].is_similarity_match);
    }

    #[test]
    fn test_without_engine_and_max_pages() {
        let pdf = FakePdf {
            pages: vec![
                ("Inscrito 01/02/2020".to_string(), true),
                ("Inscrito 03/04/2021".to_string(), true),
            ],
        };
        let mut config = quick_config();
        config.pdf.max_pages = 1;
        let pipeline = DocumentPipeline::new(config).unwrap();

        let result = pipeline.process(&pdf);

        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].inscription_record, "Inscrito 01/02/2020");
    }

    #[test]
    fn test_empty_document_serializes_to_empty_array() {
        let pdf = FakePdf { pages: Vec::new() };
        let result = DocumentPipeline::new(quick_config()).unwrap().process(&pdf);
        assert_eq!(result.to_json().unwrap(), "[]");
        assert_eq!(result.combined_text(), "");
    }

    #[test]
    fn test_combined_text_headers() {
        let pdf = FakePdf {
            pages: vec![("uno".to_string(), false), ("dos".to_string(), false)],
        };
        let result = DocumentPipeline::new(quick_config()).unwrap().process(&pdf);
        assert_eq!(
            result.combined_text(),
            "--- Página 1 (direct) ---\nuno\n\n--- Página 2 (direct) ---\ndos\n"
        );
    }

    #[test]
    fn test_debug_rasters_written() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = FakePdf {
            pages: vec![(String::new(), true)],
        };
        let engine = FixedEngine::new("texto");
        let mut config = quick_config();
        config.enhance.debug_dir = Some(dir.path().to_path_buf());

        DocumentPipeline::new(config).unwrap().with_engine(&engine).process(&pdf);

        assert!(dir.path().join("page_1_original.png").exists());
        assert!(dir.path().join("page_1_enhanced.png").exists());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = AsientosConfig::default();
        config.extraction.similarity_threshold = 150.0;
        assert!(matches!(
            DocumentPipeline::new(config),
            Err(AsientosError::Extraction(_))
        ));
    }

    #[test]
    fn test_unusable_ocr_settings_rejected() {
        let mut config = AsientosConfig::default();
        config.pdf.render_dpi = 0;
        assert!(matches!(
            DocumentPipeline::new(config),
            Err(AsientosError::Config(_))
        ));

        let mut config = AsientosConfig::default();
        config.ocr.segmentation_modes.clear();
        assert!(matches!(
            DocumentPipeline::new(config),
            Err(AsientosError::Config(_))
        ));
    }
}
