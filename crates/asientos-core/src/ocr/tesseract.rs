//! Tesseract-backed OCR engine (leptess).

use std::cell::RefCell;
use std::ffi::CString;
use std::path::PathBuf;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use leptess::leptonica;
use leptess::tesseract::TessApi;
use tracing::{debug, info};

use crate::error::OcrError;

use super::engine::{EngineMode, OcrEngine, OcrOutput, OcrRequest};

/// Settings that can only be applied when the API is initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InitKey {
    data_dir: Option<PathBuf>,
    language: String,
    engine_mode: EngineMode,
}

impl InitKey {
    fn from_request(request: &OcrRequest) -> Self {
        Self {
            data_dir: request.data_dir.clone(),
            language: request.language.clone(),
            engine_mode: request.engine_mode,
        }
    }
}

struct LoadedApi {
    key: InitKey,
    api: TessApi,
}

/// OCR engine over the Tesseract C API.
///
/// The API handle is created lazily and reused while requests keep the
/// same language, data directory and engine mode.
pub struct TesseractEngine {
    loaded: RefCell<Option<LoadedApi>>,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self {
            loaded: RefCell::new(None),
        }
    }

    /// Check that Tesseract can initialize `language` from `data_dir` in `engine_mode`.
    pub fn check_init(
        data_dir: Option<&PathBuf>,
        language: &str,
        engine_mode: EngineMode,
    ) -> Result<(), OcrError> {
        init_api(data_dir, language, engine_mode).map(|_| ())
    }

    fn with_api<T>(
        &self,
        request: &OcrRequest,
        f: impl FnOnce(&mut TessApi) -> Result<T, OcrError>,
    ) -> Result<T, OcrError> {
        let mut slot = self.loaded.borrow_mut();

        let key = InitKey::from_request(request);
        let reusable = slot.as_ref().map(|l| l.key == key).unwrap_or(false);

        if !reusable {
            let api = init_api(key.data_dir.as_ref(), &key.language, key.engine_mode)?;
            info!(
                "Tesseract initialized (language: {}, oem: {}, data: {})",
                key.language,
                key.engine_mode.oem(),
                key.data_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "default".to_string())
            );
            *slot = Some(LoadedApi { key, api });
        }

        match slot.as_mut() {
            Some(loaded) => f(&mut loaded.api),
            None => Err(OcrError::Unavailable("Tesseract API not initialized".to_string())),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &RgbImage, request: &OcrRequest) -> Result<OcrOutput, OcrError> {
        let png = encode_png(image)?;
        let pix = leptonica::pix_read_mem(&png)
            .map_err(|e| OcrError::InvalidImage(format!("Failed to load raster: {}", e)))?;

        self.with_api(request, |api| {
            for (name, value) in &request.variables {
                set_variable(api, name, value)?;
            }
            debug!("Recognizing with psm {}", request.segmentation_mode.psm());

            api.set_image(&pix);
            api.set_source_resolution(request.dpi as i32);

            let text = api
                .get_utf8_text()
                .map_err(|e| OcrError::Recognition(format!("Failed to extract text: {}", e)))?;
            let confidence = (api.mean_text_conf().max(0) as f32 / 100.0).min(1.0);

            Ok(OcrOutput { text, confidence })
        })
    }
}

fn init_api(
    data_dir: Option<&PathBuf>,
    language: &str,
    engine_mode: EngineMode,
) -> Result<TessApi, OcrError> {
    let init_failed = |reason: String| {
        OcrError::EngineInit(format!(
            "Failed to initialize Tesseract for '{}': {}",
            language, reason
        ))
    };

    let data_path = data_dir.map(|p| p.to_string_lossy().into_owned());
    let mut api = TessApi::new(data_path.as_deref(), language)
        .map_err(|e| init_failed(e.to_string()))?;
    if engine_mode == EngineMode::Default {
        return Ok(api);
    }

    // TessApi::new always uses the default OEM; re-initialize with the requested one
    let c_data = data_path
        .map(CString::new)
        .transpose()
        .map_err(|_| init_failed("data path contains a NUL byte".to_string()))?;
    let c_language = CString::new(language)
        .map_err(|_| init_failed("language contains a NUL byte".to_string()))?;
    api.raw
        .init_4(
            c_data.as_deref(),
            Some(c_language.as_c_str()),
            u32::from(engine_mode.oem()),
        )
        .map_err(|e| init_failed(format!("oem {}: {}", engine_mode.oem(), e)))?;
    Ok(api)
}

fn set_variable(api: &mut TessApi, name: &str, value: &str) -> Result<(), OcrError> {
    let invalid = || OcrError::Variable {
        name: name.to_string(),
        value: value.to_string(),
    };
    let c_name = CString::new(name).map_err(|_| invalid())?;
    let c_value = CString::new(value).map_err(|_| invalid())?;
    api.raw
        .set_variable(&c_name, &c_value)
        .map_err(|_| invalid())
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, OcrError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| OcrError::InvalidImage(e.to_string()))?;
    Ok(buf)
}
