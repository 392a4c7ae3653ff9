//! PDF text and page-raster extraction using lopdf and pdf-extract.

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Rgb};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, trace};

use super::{PdfProcessor, PdfKind, Result};
use crate::error::PdfError;

/// US Letter, used when a page carries no readable MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Nested form XObjects deeper than this are not searched for images.
const MAX_FORM_DEPTH: usize = 4;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or(PdfError::Parse("No document loaded".to_string()))
    }

    fn page_id(&self, doc: &Document, page: u32) -> Result<ObjectId> {
        doc.get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    /// Count image XObjects anywhere in the document.
    fn count_all_images(&self) -> usize {
        let doc = match self.document.as_ref() {
            Some(d) => d,
            None => return 0,
        };

        doc.objects
            .values()
            .filter(|object| match object {
                Object::Stream(stream) => is_image_dict(&stream.dict),
                _ => false,
            })
            .count()
    }

    /// Collect decodable images reachable from a resources dictionary,
    /// descending into form XObjects.
    fn collect_images(
        &self,
        doc: &Document,
        resources: &Dictionary,
        depth: usize,
        seen: &mut HashSet<ObjectId>,
        images: &mut Vec<DynamicImage>,
    ) {
        let xobjects = match resources.get(b"XObject") {
            Ok(obj) => obj,
            Err(_) => return,
        };
        let xobj_dict = match doc.dereference(xobjects) {
            Ok((_, Object::Dictionary(dict))) => dict,
            _ => return,
        };

        for (_name, obj_ref) in xobj_dict.iter() {
            if let Object::Reference(id) = obj_ref {
                if !seen.insert(*id) {
                    continue;
                }
            }

            let stream = match doc.dereference(obj_ref) {
                Ok((_, Object::Stream(stream))) => stream,
                _ => continue,
            };

            if is_image_dict(&stream.dict) {
                if let Some(img) = self.decode_image(doc, stream) {
                    images.push(img);
                }
            } else if is_form_dict(&stream.dict) && depth < MAX_FORM_DEPTH {
                if let Ok(res) = stream.dict.get(b"Resources") {
                    if let Ok((_, Object::Dictionary(form_resources))) = doc.dereference(res) {
                        self.collect_images(doc, form_resources, depth + 1, seen, images);
                    }
                }
            }
        }
    }

    fn decode_image(&self, doc: &Document, stream: &lopdf::Stream) -> Option<DynamicImage> {
        let dict = &stream.dict;

        let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
        let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;

        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) if !arr.is_empty() => {
                    arr.last().and_then(|o| o.as_name().ok())
                }
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    trace!("Decoding JPEG image");
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") => {
                    trace!("Found JPEG2000 image (not supported)");
                    return None;
                }
                Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Found fax/JBIG2 image (not supported)");
                    return None;
                }
                _ => {}
            }
        }

        let data = match stream.decompressed_content() {
            Ok(d) => d,
            Err(_) => stream.content.clone(),
        };

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = match dict.get(b"BitsPerComponent").ok().and_then(|o| o.as_i64().ok()) {
            Some(bits) => u8::try_from(bits).ok()?,
            None => 8,
        };

        image_from_samples(&data, width, height, color_space, bits)
    }

    /// Page size in points, inherited from the page tree when absent.
    fn page_size(&self, doc: &Document, page_id: ObjectId) -> (f32, f32) {
        let mut node_id = Some(page_id);
        let mut hops = 0;

        while let Some(id) = node_id {
            let dict = match doc.get_object(id) {
                Ok(Object::Dictionary(dict)) => dict,
                _ => break,
            };

            if let Some(size) = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| doc.dereference(obj).ok())
                .and_then(|(_, obj)| media_box_size(obj))
            {
                return size;
            }

            node_id = match dict.get(b"Parent") {
                Ok(Object::Reference(parent)) => Some(*parent),
                _ => None,
            };
            hops += 1;
            if hops > 32 {
                break;
            }
        }

        DEFAULT_PAGE_SIZE
    }

    /// Get resources dictionary for a page, handling inheritance.
    fn get_page_resources(&self, doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
        let node = doc.get_object(page_id).ok()?;
        if let Object::Dictionary(dict) = node {
            if let Ok(resources) = dict.get(b"Resources") {
                if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                    return Some(res_dict.clone());
                }
            }

            if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
                return self.get_page_resources(doc, *parent_id);
            }
        }
        None
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Registry certificates are often "protected" with an empty user password
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn analyze(&self) -> PdfKind {
        let page_count = self.page_count();
        let text_len: usize = (1..=page_count)
            .filter_map(|page| self.page_text(page).ok())
            .map(|text| text.trim().len())
            .sum();
        let has_text = text_len > 50;
        let has_images = self.count_all_images() > 0;

        let kind = match (has_text, has_images) {
            (true, false) => PdfKind::Digital,
            (false, true) => PdfKind::Scanned,
            (true, true) => PdfKind::Mixed,
            (false, false) => PdfKind::Empty,
        };

        debug!(
            "PDF analysis: {} chars text, has_images={} -> {:?}",
            text_len, has_images, kind
        );
        kind
    }

    fn document_text(&self) -> Result<String> {
        self.document()?;
        // pdf-extract panics on some malformed fonts and content streams
        let extracted = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&self.raw_data)
        }));
        match extracted {
            Ok(text) => text.map_err(|e| PdfError::TextExtraction(e.to_string())),
            Err(_) => Err(PdfError::TextExtraction(
                "text extractor panicked on this document".to_string(),
            )),
        }
    }

    fn page_text(&self, page: u32) -> Result<String> {
        let doc = self.document()?;
        self.page_id(doc, page)?;

        doc.extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction(format!("page {}: {}", page, e)))
    }

    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let doc = self.document()?;
        let page_id = self.page_id(doc, page)?;

        let largest = self
            .page_images(page)?
            .into_iter()
            .max_by_key(|img| img.width() as u64 * img.height() as u64)
            .ok_or(PdfError::Render {
                page,
                reason: "page has no decodable embedded image".to_string(),
            })?;

        let (width_pt, height_pt) = self.page_size(doc, page_id);
        let (target_w, target_h) = target_dimensions(width_pt, height_pt, dpi);

        if largest.width() > target_w && largest.height() > target_h {
            debug!(
                "Page {}: scaling {}x{} scan to {}x{} ({} dpi)",
                page,
                largest.width(),
                largest.height(),
                target_w,
                target_h,
                dpi
            );
            Ok(largest.resize(target_w, target_h, FilterType::Triangle))
        } else {
            debug!(
                "Page {}: using {}x{} scan as-is ({} dpi target {}x{})",
                page,
                largest.width(),
                largest.height(),
                dpi,
                target_w,
                target_h
            );
            Ok(largest)
        }
    }

    fn page_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let doc = self.document()?;
        let page_id = self.page_id(doc, page)?;

        let mut images = Vec::new();
        if let Some(resources) = self.get_page_resources(doc, page_id) {
            let mut seen = HashSet::new();
            self.collect_images(doc, &resources, 0, &mut seen, &mut images);
        }

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }
}

fn is_image_dict(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(|o| o.as_name())
        .map(|name| name == b"Image")
        .unwrap_or(false)
}

fn is_form_dict(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(|o| o.as_name())
        .map(|name| name == b"Form")
        .unwrap_or(false)
}

fn media_box_size(obj: &Object) -> Option<(f32, f32)> {
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let coords: Vec<f32> = arr.iter().filter_map(|o| o.as_float().ok()).collect();
    if coords.len() != 4 {
        return None;
    }
    let width = (coords[2] - coords[0]).abs();
    let height = (coords[3] - coords[1]).abs();
    if width > 0.0 && height > 0.0 {
        Some((width, height))
    } else {
        None
    }
}

/// Pixel size of a page of `width_pt` x `height_pt` points at `dpi`.
fn target_dimensions(width_pt: f32, height_pt: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / 72.0;
    (
        ((width_pt * scale).round() as u32).max(1),
        ((height_pt * scale).round() as u32).max(1),
    )
}

/// Build an RGB image from raw 8-bit samples.
fn image_from_samples(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    trace!(
        "Creating image from raw data: {}x{}, colorspace={:?}, bits={}",
        width,
        height,
        String::from_utf8_lossy(color_space),
        bits_per_component
    );

    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = (width as usize).checked_mul(height as usize)?;
    let components = match color_space {
        b"DeviceGray" | b"G" | b"CalGray" => 1,
        b"DeviceRGB" | b"RGB" | b"CalRGB" => 3,
        b"DeviceCMYK" | b"CMYK" => 4,
        // ICC-based and other spaces: infer from the sample count
        _ if data.len() / 4 >= pixels => 4,
        _ if data.len() / 3 >= pixels => 3,
        _ => 1,
    };

    let expected = pixels.checked_mul(components)?;
    if data.len() < expected {
        trace!(
            "Could not decode image: data_len={}, expected={}",
            data.len(),
            expected
        );
        return None;
    }

    let mut rgb = Vec::with_capacity(pixels.checked_mul(3)?);
    for chunk in data[..expected].chunks_exact(components) {
        match components {
            1 => rgb.extend_from_slice(&[chunk[0], chunk[0], chunk[0]]),
            3 => rgb.extend_from_slice(chunk),
            _ => rgb.extend_from_slice(&cmyk_to_rgb(chunk[0], chunk[1], chunk[2], chunk[3])),
        }
    }

    ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let white = 255 - k as u32;
    [
        ((255 - c as u32) * white / 255) as u8,
        ((255 - m as u32) * white / 255) as u8,
        ((255 - y as u32) * white / 255) as u8,
    ]
}
