//! Redaction masks and page deletion marks.
//!
//! Mask geometry is stored in document units relative to the page's top-left
//! corner, so it survives any zoom. Pointer input arrives in viewport pixels
//! and is divided by the scale on the way in.

use crate::error::{Result, ViewerError};
use crate::geometry::{to_document, Point, Rect};
use std::collections::BTreeSet;

pub type MaskId = u64;

/// Smallest mask edge, in document units.
pub const MIN_MASK_SIZE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mask {
    pub id: MaskId,
    pub page_index: u32,
    /// Document units, page-relative.
    pub rect: Rect,
}

impl Mask {
    /// Mask rectangle in page-relative viewport pixels at `scale`.
    pub fn viewport_rect(&self, scale: f32) -> Rect {
        self.rect.scaled(scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Pending edits for one document.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    page_count: u32,
    masks: Vec<Mask>,
    deleted: BTreeSet<u32>,
    next_id: MaskId,
}

impl EditSession {
    pub fn new(page_count: u32) -> Self {
        Self { page_count, ..Self::default() }
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    fn check_page(&self, page_index: u32) -> Result<()> {
        if page_index >= self.page_count {
            return Err(ViewerError::PageOutOfRange {
                page_number: page_index.saturating_add(1),
                page_count: self.page_count,
            });
        }
        Ok(())
    }

    fn mask_mut(&mut self, id: MaskId) -> Result<&mut Mask> {
        self.masks.iter_mut().find(|mask| mask.id == id).ok_or(ViewerError::UnknownMask(id))
    }

    /// Add a mask in document units. Inverted rectangles are normalised and
    /// edges are grown to [`MIN_MASK_SIZE`].
    pub fn add_mask(&mut self, page_index: u32, rect: Rect) -> Result<MaskId> {
        self.check_page(page_index)?;
        let rect = rect.normalized();
        let rect = Rect::new(
            rect.x.max(0.0),
            rect.y.max(0.0),
            rect.width.max(MIN_MASK_SIZE),
            rect.height.max(MIN_MASK_SIZE),
        );

        self.next_id += 1;
        let id = self.next_id;
        self.masks.push(Mask { id, page_index, rect });
        log::debug!("added mask {id} on page index {page_index}");
        Ok(id)
    }

    /// Add a mask drawn in viewport pixels, e.g. by dragging out a rectangle.
    pub fn add_mask_from_viewport(&mut self, page_index: u32, rect: Rect, scale: f32) -> Result<MaskId> {
        self.add_mask(page_index, rect.scaled(to_document(1.0, scale)))
    }

    /// Move by a viewport-pixel delta. The mask's origin stays on the page.
    pub fn move_mask(&mut self, id: MaskId, dx: f32, dy: f32, scale: f32) -> Result<Mask> {
        let mask = self.mask_mut(id)?;
        mask.rect.x = (mask.rect.x + to_document(dx, scale)).max(0.0);
        mask.rect.y = (mask.rect.y + to_document(dy, scale)).max(0.0);
        Ok(*mask)
    }

    /// Drag one corner by a viewport-pixel delta.
    pub fn resize_mask(
        &mut self,
        id: MaskId,
        handle: ResizeHandle,
        dx: f32,
        dy: f32,
        scale: f32,
    ) -> Result<Mask> {
        let mask = self.mask_mut(id)?;
        let (dx, dy) = (to_document(dx, scale), to_document(dy, scale));
        let Rect { x, y, width, height } = mask.rect;
        let (mut left, mut top, mut right, mut bottom) = (x, y, x + width, y + height);

        match handle {
            ResizeHandle::TopLeft => {
                left = (left + dx).min(right - MIN_MASK_SIZE);
                top = (top + dy).min(bottom - MIN_MASK_SIZE);
            }
            ResizeHandle::TopRight => {
                right = (right + dx).max(left + MIN_MASK_SIZE);
                top = (top + dy).min(bottom - MIN_MASK_SIZE);
            }
            ResizeHandle::BottomLeft => {
                left = (left + dx).min(right - MIN_MASK_SIZE);
                bottom = (bottom + dy).max(top + MIN_MASK_SIZE);
            }
            ResizeHandle::BottomRight => {
                right = (right + dx).max(left + MIN_MASK_SIZE);
                bottom = (bottom + dy).max(top + MIN_MASK_SIZE);
            }
        }

        mask.rect = Rect::new(left, top, right - left, bottom - top);
        Ok(*mask)
    }

    pub fn remove_mask(&mut self, id: MaskId) -> Result<Mask> {
        let position = self
            .masks
            .iter()
            .position(|mask| mask.id == id)
            .ok_or(ViewerError::UnknownMask(id))?;
        Ok(self.masks.remove(position))
    }

    pub fn mask(&self, id: MaskId) -> Option<&Mask> {
        self.masks.iter().find(|mask| mask.id == id)
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    pub fn masks_on_page(&self, page_index: u32) -> impl Iterator<Item = &Mask> + '_ {
        self.masks.iter().filter(move |mask| mask.page_index == page_index)
    }

    /// Topmost mask under a page-relative point given in viewport pixels.
    pub fn mask_at(&self, page_index: u32, point: Point, scale: f32) -> Option<MaskId> {
        let point = Point::new(to_document(point.x, scale), to_document(point.y, scale));
        self.masks
            .iter()
            .rev()
            .find(|mask| mask.page_index == page_index && mask.rect.contains(point))
            .map(|mask| mask.id)
    }

    /// Mark a one-based page for deletion, dropping its masks.
    ///
    /// Returns `false` if the page was already marked.
    pub fn delete_page(&mut self, page_number: u32) -> Result<bool> {
        let index = page_number.checked_sub(1).ok_or(ViewerError::PageOutOfRange {
            page_number,
            page_count: self.page_count,
        })?;
        self.check_page(index)?;
        if !self.deleted.insert(index) {
            return Ok(false);
        }
        self.masks.retain(|mask| mask.page_index != index);
        Ok(true)
    }

    pub fn restore_page(&mut self, page_number: u32) -> bool {
        page_number.checked_sub(1).is_some_and(|index| self.deleted.remove(&index))
    }

    pub fn is_deleted(&self, page_number: u32) -> bool {
        page_number.checked_sub(1).is_some_and(|index| self.deleted.contains(&index))
    }

    /// One-based numbers of the pages that survive deletion, in order.
    pub fn remaining_page_numbers(&self) -> Vec<u32> {
        (0..self.page_count)
            .filter(|index| !self.deleted.contains(index))
            .map(|index| index + 1)
            .collect()
    }

    pub fn has_edits(&self) -> bool {
        !self.masks.is_empty() || !self.deleted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_normalises_and_enforces_minimum() {
        let mut edits = EditSession::new(3);
        let id = edits.add_mask(0, Rect::new(50.0, 50.0, -20.0, 1.0)).unwrap();
        assert_eq!(edits.mask(id).unwrap().rect, Rect::new(30.0, 50.0, 20.0, MIN_MASK_SIZE));

        assert!(matches!(
            edits.add_mask(3, Rect::new(0.0, 0.0, 10.0, 10.0)),
            Err(ViewerError::PageOutOfRange { page_number: 4, page_count: 3 })
        ));
    }

    #[test]
    fn viewport_input_is_converted_to_document_units() {
        let mut edits = EditSession::new(1);
        let id = edits.add_mask_from_viewport(0, Rect::new(20.0, 40.0, 100.0, 60.0), 2.0).unwrap();
        let mask = *edits.mask(id).unwrap();
        assert_eq!(mask.rect, Rect::new(10.0, 20.0, 50.0, 30.0));
        assert_eq!(mask.viewport_rect(4.0), Rect::new(40.0, 80.0, 200.0, 120.0));

        let moved = edits.move_mask(id, 10.0, -100.0, 2.0).unwrap();
        assert_eq!(moved.rect, Rect::new(15.0, 0.0, 50.0, 30.0));
    }

    #[test]
    fn resize_keeps_opposite_corner_and_minimum_size() {
        let mut edits = EditSession::new(1);
        let id = edits.add_mask(0, Rect::new(10.0, 10.0, 20.0, 20.0)).unwrap();

        let mask = edits.resize_mask(id, ResizeHandle::BottomRight, 10.0, 20.0, 1.0).unwrap();
        assert_eq!(mask.rect, Rect::new(10.0, 10.0, 30.0, 40.0));

        let mask = edits.resize_mask(id, ResizeHandle::TopLeft, 100.0, 0.0, 1.0).unwrap();
        assert_eq!(mask.rect, Rect::new(36.0, 10.0, MIN_MASK_SIZE, 40.0));
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let mut edits = EditSession::new(2);
        let below = edits.add_mask(0, Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        let above = edits.add_mask(0, Rect::new(50.0, 50.0, 100.0, 100.0)).unwrap();

        assert_eq!(edits.mask_at(0, Point::new(150.0, 150.0), 2.0), Some(above));
        assert_eq!(edits.mask_at(0, Point::new(20.0, 20.0), 2.0), Some(below));
        assert_eq!(edits.mask_at(1, Point::new(20.0, 20.0), 2.0), None);

        edits.remove_mask(above).unwrap();
        assert_eq!(edits.mask_at(0, Point::new(150.0, 150.0), 2.0), Some(below));
        assert!(matches!(edits.remove_mask(above), Err(ViewerError::UnknownMask(_))));
    }

    #[test]
    fn deleting_pages_drops_their_masks() {
        let mut edits = EditSession::new(4);
        edits.add_mask(1, Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        edits.add_mask(2, Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();

        assert!(edits.delete_page(2).unwrap());
        assert!(!edits.delete_page(2).unwrap());
        assert!(edits.is_deleted(2));
        assert_eq!(edits.masks_on_page(1).count(), 0);
        assert_eq!(edits.masks().len(), 1);
        assert_eq!(edits.remaining_page_numbers(), vec![1, 3, 4]);

        assert!(edits.restore_page(2));
        assert_eq!(edits.remaining_page_numbers(), vec![1, 2, 3, 4]);
        assert!(edits.delete_page(0).is_err());
        assert!(edits.delete_page(5).is_err());
        assert!(edits.has_edits());
    }
}
