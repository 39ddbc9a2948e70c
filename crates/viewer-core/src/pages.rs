//! Lazily fetched page descriptors.

use pdfmask_engine::{EngineError, PageDescriptor, PdfDocument};
use std::collections::HashMap;

/// Page descriptors fetched so far, keyed by zero-based index.
///
/// Descriptors are created on first use and reused for the document's lifetime.
#[derive(Debug, Default)]
pub struct PageCache {
    pages: HashMap<u32, PageDescriptor>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached descriptor for the zero-based `index`, asking `document` on a miss.
    ///
    /// Failed lookups are not cached.
    pub fn get_or_fetch(
        &mut self,
        document: &dyn PdfDocument,
        index: u32,
    ) -> Result<PageDescriptor, EngineError> {
        if let Some(page) = self.pages.get(&index) {
            return Ok(*page);
        }
        let page = document.get_page(index.saturating_add(1))?;
        self.pages.insert(index, page);
        Ok(page)
    }

    /// Cached descriptor only, without touching the document.
    pub fn get(&self, index: u32) -> Option<&PageDescriptor> {
        self.pages.get(&index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Forget every descriptor, e.g. when the document is replaced.
    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfmask_engine::{LopdfDocument, PageSize};

    #[test]
    fn fetches_once_and_reuses() {
        let document = LopdfDocument::from_page_sizes(vec![
            PageSize { width_pt: 100.0, height_pt: 200.0 },
            PageSize { width_pt: 300.0, height_pt: 400.0 },
        ]);
        let mut cache = PageCache::new();

        let page = cache.get_or_fetch(&document, 1).expect("page exists");
        assert_eq!(page.index, 1);
        assert_eq!((page.natural_width, page.natural_height), (300.0, 400.0));
        assert_eq!(cache.get_or_fetch(&document, 1).expect("cached"), page);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let document = LopdfDocument::from_page_sizes(vec![PageSize { width_pt: 1.0, height_pt: 1.0 }]);
        let mut cache = PageCache::new();
        let err = cache.get_or_fetch(&document, 4).expect_err("out of range");
        assert!(matches!(err, EngineError::PageOutOfRange { page_number: 5, page_count: 1 }));
        assert!(cache.get(4).is_none());
    }
}
