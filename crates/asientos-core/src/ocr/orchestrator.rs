//! Multi-pass OCR: segmentation-mode search, rotation search, best-of selection.

use std::fmt;
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::models::config::OcrConfig;

use super::engine::{OcrEngine, OcrRequest, SegmentationMode};
use super::rotation::rotate;

/// Candidate must be this much longer than the best to win on length alone.
const LENGTH_GAIN: f64 = 1.2;
/// Candidate must be at least this fraction of the best length to win on confidence.
const LENGTH_FLOOR: f64 = 0.8;
/// Confidence gain needed to win at comparable length.
const CONFIDENCE_GAIN: f64 = 1.1;

/// Configuration an attempt was run under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hypothesis {
    /// Unrotated raster with the given segmentation mode.
    Segmentation(SegmentationMode),
    /// Raster rotated by `angle` degrees, then segmented.
    Rotated { angle: f32, mode: SegmentationMode },
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hypothesis::Segmentation(mode) => write!(f, "{}", mode),
            Hypothesis::Rotated { angle, mode } => write!(f, "{} @ {}°", mode, angle),
        }
    }
}

/// One recognized (hypothesis, text, confidence) tuple.
#[derive(Debug, Clone)]
pub struct OcrAttempt {
    /// Position in the fixed hypothesis order; breaks ties.
    pub order: usize,
    pub hypothesis: Hypothesis,
    pub text: String,
    pub confidence: f32,
}

impl OcrAttempt {
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Outcome of recognizing one raster.
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    /// Best text found, empty when nothing was recognized.
    pub text: String,
    /// Confidence of the winning attempt, in [0, 1].
    pub confidence: f32,
    /// Winning configuration.
    pub hypothesis: Option<Hypothesis>,
    /// Engine calls that returned a result.
    pub attempts: usize,
    /// Engine calls that failed and were skipped.
    pub failures: usize,
    pub processing_time_ms: u64,
}

impl Recognition {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Whether a candidate (length, confidence) beats the current best.
///
/// A candidate wins when it is meaningfully longer, or comparable in
/// length with materially higher confidence.
pub fn is_better(candidate_len: usize, candidate_conf: f32, best_len: usize, best_conf: f32) -> bool {
    let (cl, bl) = (candidate_len as f64, best_len as f64);
    let (cc, bc) = (candidate_conf as f64, best_conf as f64);

    cl > bl * LENGTH_GAIN || (cl >= bl * LENGTH_FLOOR && cc > bc * CONFIDENCE_GAIN)
}

/// Pick the winning attempt.
///
/// Attempts are reduced in hypothesis order regardless of the order they
/// arrive in, so the winner depends only on the set of attempts.
pub fn select_best(attempts: &[OcrAttempt]) -> Option<&OcrAttempt> {
    let mut ordered: Vec<&OcrAttempt> = attempts.iter().collect();
    ordered.sort_by_key(|a| a.order);

    let mut best: Option<&OcrAttempt> = None;
    for attempt in ordered {
        let (best_len, best_conf) = best.map(|b| (b.len(), b.confidence)).unwrap_or((0, 0.0));
        if is_better(attempt.len(), attempt.confidence, best_len, best_conf) {
            best = Some(attempt);
        }
    }
    best
}

/// Runs the segmentation and rotation search against an OCR engine.
pub struct OcrOrchestrator<'a> {
    engine: &'a dyn OcrEngine,
    config: OcrConfig,
    dpi: u32,
}

impl<'a> OcrOrchestrator<'a> {
    /// Create an orchestrator over `engine`.
    pub fn new(engine: &'a dyn OcrEngine, config: OcrConfig) -> Self {
        Self {
            engine,
            config,
            dpi: 300,
        }
    }

    /// Set the resolution rasters were rendered at.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Recognize text in a raster.
    ///
    /// Never fails: engine errors drop the affected attempt, and a raster
    /// on which every attempt failed yields an empty recognition.
    pub fn recognize(&self, raster: &RgbImage) -> Recognition {
        let start = Instant::now();
        let modes = &self.config.segmentation_modes;
        let stride = modes.len().max(1);

        let mut attempts = Vec::new();
        let mut failures = 0;

        failures += self.run_modes(raster, None, 0, &mut attempts);
        let mut best_len = select_best(&attempts).map(|a| a.len()).unwrap_or(0);

        if best_len < self.config.min_text_length {
            debug!(
                "Best text has {} chars (< {}), trying rotations",
                best_len, self.config.min_text_length
            );

            for (i, &angle) in self.config.rotation_angles.iter().enumerate() {
                let rotated = rotate(raster, angle);
                failures += self.run_modes(&rotated, Some(angle), (i + 1) * stride, &mut attempts);
                drop(rotated);

                best_len = select_best(&attempts).map(|a| a.len()).unwrap_or(0);
                if best_len >= self.config.min_text_length {
                    debug!("Rotation {}° reached {} chars, stopping search", angle, best_len);
                    break;
                }
            }
        }

        let processing_time_ms = start.elapsed().as_millis() as u64;
        let attempt_count = attempts.len();

        match select_best(&attempts) {
            Some(best) => {
                info!(
                    "OCR selected {}: {} chars, confidence {:.1}% ({} attempts, {} failed)",
                    best.hypothesis,
                    best.len(),
                    best.confidence * 100.0,
                    attempt_count,
                    failures
                );
                Recognition {
                    text: best.text.clone(),
                    confidence: best.confidence,
                    hypothesis: Some(best.hypothesis),
                    attempts: attempt_count,
                    failures,
                    processing_time_ms,
                }
            }
            None => {
                warn!(
                    "OCR recognized no text ({} attempts, {} failed)",
                    attempt_count, failures
                );
                Recognition {
                    attempts: attempt_count,
                    failures,
                    processing_time_ms,
                    ..Recognition::default()
                }
            }
        }
    }

    /// Try every segmentation mode on one raster. Returns the failure count.
    fn run_modes(
        &self,
        raster: &RgbImage,
        angle: Option<f32>,
        base_order: usize,
        attempts: &mut Vec<OcrAttempt>,
    ) -> usize {
        let mut failures = 0;

        for (i, &mode) in self.config.segmentation_modes.iter().enumerate() {
            let hypothesis = match angle {
                Some(angle) => Hypothesis::Rotated { angle, mode },
                None => Hypothesis::Segmentation(mode),
            };
            let request = self.request(mode);

            match self.engine.recognize(raster, &request) {
                Ok(output) => {
                    let text = output.text.trim().to_string();
                    debug!(
                        "{} {}: {} chars, confidence {:.1}%",
                        self.engine.name(),
                        hypothesis,
                        text.chars().count(),
                        output.confidence * 100.0
                    );
                    attempts.push(OcrAttempt {
                        order: base_order + i,
                        hypothesis,
                        text,
                        confidence: output.confidence.clamp(0.0, 1.0),
                    });
                }
                Err(e) => {
                    warn!("{} {} failed: {}", self.engine.name(), hypothesis, e);
                    failures += 1;
                }
            }
        }

        failures
    }

    fn request(&self, mode: SegmentationMode) -> OcrRequest {
        let mut variables = self.config.variables.clone();
        variables.insert("tessedit_pageseg_mode".to_string(), mode.psm().to_string());
        variables.insert("user_defined_dpi".to_string(), self.dpi.to_string());

        OcrRequest {
            language: self.config.language.clone(),
            engine_mode: self.config.engine_mode,
            segmentation_mode: mode,
            variables,
            dpi: self.dpi,
            data_dir: self.config.tessdata_dir.clone(),
        }
    }
}
