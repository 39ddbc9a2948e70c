//! Document decoding collaborator for the pdfmask viewer.
//!
//! The viewer core treats decoding and rasterisation as an opaque capability:
//! "decode a document" and "render page at scale to bitmap". This crate defines
//! that capability ([`PdfDecoder`], [`PdfDocument`]) and ships a lopdf-backed
//! implementation that reads page geometry and rasterises page placeholders.

use image::{ImageBuffer, Rgba};
use std::fs;
use std::path::Path;
use std::sync::Arc;

mod lopdf_backend;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use lopdf_backend::{LopdfDecoder, LopdfDocument};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// US Letter, used when a page carries no readable MediaBox.
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Geometry of a single page in document units (PDF points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDescriptor {
    /// Zero-based page index.
    pub index: u32,
    pub natural_width: f32,
    pub natural_height: f32,
}

impl PageDescriptor {
    pub fn new(index: u32, size: PageSize) -> Self {
        Self { index, natural_width: size.width_pt, natural_height: size.height_pt }
    }

    /// One-based page number, as shown to users.
    pub fn page_number(&self) -> u32 {
        self.index + 1
    }

    /// Pixel dimensions of this page when rendered at `scale`.
    pub fn pixel_size(&self, scale: f32) -> (u32, u32) {
        let width = (self.natural_width * scale).round().max(1.0) as u32;
        let height = (self.natural_height * scale).round().max(1.0) as u32;
        (width, height)
    }
}

/// A raster produced for one page at one scale.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub page_index: u32,
    pub scale: f32,
    pub image: RgbaImage,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Engine-side view of a cancel token.
///
/// Renderers poll this between units of work; once it reports `true` the render
/// stops and returns [`EngineError::RenderCancelled`].
pub trait CancelSignal {
    fn is_cancelled(&self) -> bool;
}

/// A signal that never fires, for one-shot renders nobody will cancel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode PDF: {0}")]
    Decode(#[from] lopdf::Error),
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("page {page_number} out of range (page_count={page_count})")]
    PageOutOfRange { page_number: u32, page_count: u32 },
    #[error("render of page index {page_index} was cancelled")]
    RenderCancelled { page_index: u32 },
    #[error("render of page index {page_index} failed: {reason}")]
    RenderFailure { page_index: u32, reason: String },
    #[error("backend error: {0}")]
    Backend(String),
}

impl EngineError {
    /// Cancellation is an expected outcome, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::RenderCancelled { .. })
    }

    /// Whether this error condemns the whole document rather than one page.
    pub fn is_document_level(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Decode(_) | Self::EncryptedUnsupported | Self::Backend(_)
        )
    }
}

/// A decoded, immutable paginated document.
pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> u32;

    /// Look up a page by its one-based page number.
    fn get_page(&self, page_number: u32) -> Result<PageDescriptor, EngineError>;

    /// Rasterise `page` at `scale`, polling `cancel` between units of work.
    fn render_page(
        &self,
        page: &PageDescriptor,
        scale: f32,
        cancel: &dyn CancelSignal,
    ) -> Result<Bitmap, EngineError>;
}

pub trait PdfDecoder {
    fn decode(&self, bytes: Vec<u8>) -> Result<Arc<dyn PdfDocument>, EngineError>;

    fn open(&self, path: &Path) -> Result<Arc<dyn PdfDocument>, EngineError> {
        let bytes = fs::read(path)?;
        self.decode(bytes)
    }
}

pub fn default_decoder() -> LopdfDecoder {
    LopdfDecoder::new()
}
