use crate::{
    Bitmap, CancelSignal, EngineError, PageDescriptor, PageSize, PdfDecoder, PdfDocument,
    RgbaImage, DEFAULT_PAGE_SIZE,
};
use image::Rgba;
use lopdf::{Dictionary, Document, ObjectId};
use std::sync::Arc;

/// Rows rasterised between two cancellation checks.
const ROW_BAND: u32 = 64;

/// Upper bound on a single page raster (64 megapixels).
const MAX_RENDER_PIXELS: u64 = 64 * 1024 * 1024;

/// Parent chain depth limit when resolving inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 32;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const EDGE: Rgba<u8> = Rgba([220, 220, 220, 255]);

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfDecoder;

impl LopdfDecoder {
    pub fn new() -> Self {
        Self
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, EngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(EngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (page_number, object_id) in pages {
            let size = page_size(&doc, object_id).unwrap_or_else(|| {
                log::debug!("page {page_number} has no usable MediaBox, assuming US Letter");
                DEFAULT_PAGE_SIZE
            });
            sizes.push(size);
        }

        Ok(sizes)
    }
}

impl PdfDecoder for LopdfDecoder {
    fn decode(&self, bytes: Vec<u8>) -> Result<Arc<dyn PdfDocument>, EngineError> {
        let page_sizes = Self::parse_sizes(&bytes)?;
        log::info!("decoded PDF: {} pages, {} bytes", page_sizes.len(), bytes.len());
        Ok(Arc::new(LopdfDocument { page_sizes }))
    }
}

fn page_size(doc: &Document, page_id: ObjectId) -> Option<PageSize> {
    let dict = doc.get_dictionary(page_id).ok()?;
    let media_box = inherited(doc, dict, b"MediaBox")?.as_array().ok()?;
    if media_box.len() != 4 {
        return None;
    }

    let x0 = media_box[0].as_float().ok()?;
    let y0 = media_box[1].as_float().ok()?;
    let x1 = media_box[2].as_float().ok()?;
    let y1 = media_box[3].as_float().ok()?;
    let width_pt = (x1 - x0).abs();
    let height_pt = (y1 - y0).abs();
    if width_pt <= 0.0 || height_pt <= 0.0 {
        return None;
    }

    let rotate = inherited(doc, dict, b"Rotate").and_then(|obj| obj.as_i64().ok()).unwrap_or(0);
    if rotate.rem_euclid(180) == 90 {
        Some(PageSize { width_pt: height_pt, height_pt: width_pt })
    } else {
        Some(PageSize { width_pt, height_pt })
    }
}

/// Resolve an attribute that may be inherited from the page tree.
fn inherited<'a>(
    doc: &'a Document,
    mut dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a lopdf::Object> {
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Page geometry of a decoded document.
#[derive(Debug, Clone)]
pub struct LopdfDocument {
    page_sizes: Vec<PageSize>,
}

impl LopdfDocument {
    pub fn from_page_sizes(page_sizes: Vec<PageSize>) -> Self {
        Self { page_sizes }
    }
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    fn get_page(&self, page_number: u32) -> Result<PageDescriptor, EngineError> {
        let page_count = self.page_count();
        if page_number == 0 || page_number > page_count {
            return Err(EngineError::PageOutOfRange { page_number, page_count });
        }

        let index = page_number - 1;
        Ok(PageDescriptor::new(index, self.page_sizes[index as usize]))
    }

    fn render_page(
        &self,
        page: &PageDescriptor,
        scale: f32,
        cancel: &dyn CancelSignal,
    ) -> Result<Bitmap, EngineError> {
        let page_index = page.index;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(EngineError::RenderFailure {
                page_index,
                reason: format!("invalid scale {scale}"),
            });
        }

        let (width, height) = page.pixel_size(scale);
        if u64::from(width) * u64::from(height) > MAX_RENDER_PIXELS {
            return Err(EngineError::RenderFailure {
                page_index,
                reason: format!("{width}x{height} exceeds the raster size limit"),
            });
        }

        let mut image = RgbaImage::new(width, height);
        let framed = width >= 4 && height >= 4;

        for band_start in (0..height).step_by(ROW_BAND as usize) {
            if cancel.is_cancelled() {
                return Err(EngineError::RenderCancelled { page_index });
            }

            let band_end = (band_start + ROW_BAND).min(height);
            for y in band_start..band_end {
                for x in 0..width {
                    let on_edge = framed && (x == 0 || y == 0 || x == width - 1 || y == height - 1);
                    image.put_pixel(x, y, if on_edge { EDGE } else { PAPER });
                }
            }
        }

        Ok(Bitmap { page_index, scale, image })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blank_pdf;
    use crate::NeverCancel;
    use std::cell::Cell;

    struct CancelAfter {
        checks: Cell<u32>,
        limit: u32,
    }

    impl CancelSignal for CancelAfter {
        fn is_cancelled(&self) -> bool {
            let seen = self.checks.get() + 1;
            self.checks.set(seen);
            seen > self.limit
        }
    }

    #[test]
    fn decodes_page_count_and_sizes() {
        let bytes = blank_pdf(&[(612, 792), (842, 595), (300, 300)]);
        let doc = LopdfDecoder::new().decode(bytes).expect("decode should succeed");

        assert_eq!(doc.page_count(), 3);
        let second = doc.get_page(2).expect("page 2 exists");
        assert_eq!(second.index, 1);
        assert_eq!(second.natural_width, 842.0);
        assert_eq!(second.natural_height, 595.0);
    }

    #[test]
    fn malformed_bytes_fail_with_decode_error() {
        let err = LopdfDecoder::new()
            .decode(b"definitely not a pdf".to_vec())
            .err()
            .expect("garbage must not decode");
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn page_numbers_are_range_checked() {
        let doc = LopdfDocument::from_page_sizes(vec![DEFAULT_PAGE_SIZE; 2]);

        assert!(matches!(
            doc.get_page(0),
            Err(EngineError::PageOutOfRange { page_number: 0, page_count: 2 })
        ));
        assert!(matches!(
            doc.get_page(3),
            Err(EngineError::PageOutOfRange { page_number: 3, page_count: 2 })
        ));
    }

    #[test]
    fn renders_bitmap_at_requested_scale() {
        let doc = LopdfDocument::from_page_sizes(vec![PageSize { width_pt: 100.0, height_pt: 50.0 }]);
        let page = doc.get_page(1).expect("page exists");

        let bitmap = doc.render_page(&page, 2.0, &NeverCancel).expect("render succeeds");
        assert_eq!((bitmap.width(), bitmap.height()), (200, 100));
        assert_eq!(bitmap.scale, 2.0);
        assert_eq!(*bitmap.image.get_pixel(0, 0), EDGE);
        assert_eq!(*bitmap.image.get_pixel(100, 50), PAPER);
    }

    #[test]
    fn cancel_signal_stops_render_between_bands() {
        let doc = LopdfDocument::from_page_sizes(vec![PageSize { width_pt: 100.0, height_pt: 1000.0 }]);
        let page = doc.get_page(1).expect("page exists");
        let cancel = CancelAfter { checks: Cell::new(0), limit: 2 };

        let err = doc.render_page(&page, 1.0, &cancel).expect_err("render should be cancelled");
        assert!(err.is_cancelled());
        assert_eq!(cancel.checks.get(), 3);
    }

    #[test]
    fn oversized_render_is_a_page_failure() {
        let doc = LopdfDocument::from_page_sizes(vec![DEFAULT_PAGE_SIZE]);
        let page = doc.get_page(1).expect("page exists");

        let err = doc.render_page(&page, 100.0, &NeverCancel).expect_err("too large");
        assert!(matches!(err, EngineError::RenderFailure { page_index: 0, .. }));
    }
}
