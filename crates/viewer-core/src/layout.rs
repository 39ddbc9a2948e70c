//! Vertical stacking of pages in the scroll container.
//!
//! Pages are laid out top to bottom, centred horizontally, with a fixed pixel
//! gap around each. Natural sizes are in document units; offsets returned here
//! are viewport pixels at the given scale.

use crate::geometry::{binary_search_first, Rect};
use pdfmask_engine::{PageDescriptor, PageSize};
use std::ops::Range;

pub const DEFAULT_PAGE_GAP: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    /// Sum of the natural heights of all earlier pages.
    offset: f32,
    width: f32,
    height: f32,
    index: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    slots: Vec<Slot>,
    max_width: f32,
    gap: f32,
}

impl PageLayout {
    /// Layout where every page assumes `estimate` until its real size is known.
    pub fn uniform(page_count: u32, estimate: PageSize, gap: f32) -> Self {
        let sizes = vec![(estimate.width_pt, estimate.height_pt); page_count as usize];
        Self::from_sizes(&sizes, gap)
    }

    /// Layout from known `(width, height)` sizes in points. Negative sizes count as zero.
    pub fn from_sizes(sizes: &[(f32, f32)], gap: f32) -> Self {
        let mut layout = Self {
            slots: sizes
                .iter()
                .enumerate()
                .map(|(index, &(width, height))| Slot {
                    offset: 0.0,
                    width: width.max(0.0),
                    height: height.max(0.0),
                    index: index as u32,
                })
                .collect(),
            max_width: 0.0,
            gap: gap.max(0.0),
        };
        layout.recompute(0);
        layout
    }

    pub fn empty(gap: f32) -> Self {
        Self::from_sizes(&[], gap)
    }

    fn recompute(&mut self, from: usize) {
        let mut offset = match from.checked_sub(1).and_then(|i| self.slots.get(i)) {
            Some(prev) => prev.offset + prev.height,
            None => 0.0,
        };
        for slot in &mut self.slots[from..] {
            slot.offset = offset;
            offset += slot.height;
        }
        self.max_width = self.slots.iter().map(|slot| slot.width).fold(0.0, f32::max);
    }

    /// Replace a page's estimated size with its real one.
    ///
    /// Returns `true` if anything moved.
    pub fn set_page_size(&mut self, page: &PageDescriptor) -> bool {
        let Some(slot) = self.slots.get_mut(page.index as usize) else {
            return false;
        };
        if slot.width == page.natural_width && slot.height == page.natural_height {
            return false;
        }
        slot.width = page.natural_width.max(0.0);
        slot.height = page.natural_height.max(0.0);
        self.recompute(page.index as usize);
        true
    }

    pub fn page_count(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn gap(&self) -> f32 {
        self.gap
    }

    /// Natural size of a page in document units.
    pub fn natural_size(&self, index: u32) -> Option<(f32, f32)> {
        self.slots.get(index as usize).map(|slot| (slot.width, slot.height))
    }

    /// Widest page in document units.
    pub fn max_natural_width(&self) -> f32 {
        self.max_width
    }

    fn slot_top(&self, slot: &Slot, scale: f32) -> f32 {
        self.gap * (slot.index as f32 + 1.0) + slot.offset * scale
    }

    fn slot_bottom(&self, slot: &Slot, scale: f32) -> f32 {
        self.slot_top(slot, scale) + slot.height * scale
    }

    fn slot_rect(&self, slot: &Slot, scale: f32) -> Rect {
        let x = self.gap + (self.max_width - slot.width) * scale / 2.0;
        Rect::new(x, self.slot_top(slot, scale), slot.width * scale, slot.height * scale)
    }

    /// Top edge of a page in content pixels at `scale`.
    pub fn page_top(&self, index: u32, scale: f32) -> Option<f32> {
        self.slots.get(index as usize).map(|slot| self.slot_top(slot, scale))
    }

    /// Page rectangle in content coordinates.
    pub fn page_rect(&self, index: u32, scale: f32) -> Option<Rect> {
        self.slots.get(index as usize).map(|slot| self.slot_rect(slot, scale))
    }

    pub fn content_width(&self, scale: f32) -> f32 {
        self.max_width * scale + self.gap * 2.0
    }

    /// Scrollable height: every page plus a gap above each and one below the last.
    pub fn content_height(&self, scale: f32) -> f32 {
        match self.slots.last() {
            Some(last) => self.slot_bottom(last, scale) + self.gap,
            None => self.gap,
        }
    }

    /// Page at vertical content offset `y`; a gap belongs to the page below it.
    pub fn page_at_offset(&self, y: f32, scale: f32) -> Option<u32> {
        let position = binary_search_first(&self.slots, |slot| self.slot_bottom(slot, scale) > y);
        self.slots.get(position).map(|slot| slot.index)
    }

    /// Indices of pages intersecting the vertical band `[top, bottom)`.
    pub fn pages_in_range(&self, top: f32, bottom: f32, scale: f32) -> Range<u32> {
        let first = binary_search_first(&self.slots, |slot| self.slot_bottom(slot, scale) > top);
        let end = binary_search_first(&self.slots, |slot| self.slot_top(slot, scale) >= bottom);
        let first = first as u32;
        first..(end as u32).max(first)
    }
}
