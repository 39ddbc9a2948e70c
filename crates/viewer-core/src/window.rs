//! Which pages are mounted.

use std::collections::BTreeSet;

/// Pages mounted on each side of the current page.
pub const DEFAULT_OVERSCAN: u32 = 5;
/// Lower bound on the number of pages mounted right after load.
pub const INITIAL_WINDOW_MIN: u32 = 3;

/// Indices of mounted pages, always a subset of `0..page_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderWindow {
    indices: BTreeSet<u32>,
}

/// Change between two render windows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowDiff {
    /// Pages to mount, ascending.
    pub added: Vec<u32>,
    /// Pages to unmount, ascending.
    pub removed: Vec<u32>,
}

impl WindowDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl RenderWindow {
    pub fn contains(&self, index: u32) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.indices.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    pub fn remove(&mut self, index: u32) -> bool {
        self.indices.remove(&index)
    }

    /// Pages to mount and unmount to go from `self` to `next`.
    pub fn diff(&self, next: &RenderWindow) -> WindowDiff {
        WindowDiff {
            added: next.indices.difference(&self.indices).copied().collect(),
            removed: self.indices.difference(&next.indices).copied().collect(),
        }
    }
}

impl FromIterator<u32> for RenderWindow {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self { indices: iter.into_iter().collect() }
    }
}

/// Derives the render window from visibility and the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindowManager {
    overscan: u32,
}

impl PageWindowManager {
    pub fn new(overscan: u32) -> Self {
        Self { overscan }
    }

    pub fn overscan(&self) -> u32 {
        self.overscan
    }

    /// Visible pages plus `current ± i` for every `i` in `0..=overscan`,
    /// clipped to `[0, page_count - 1]`.
    ///
    /// ```
    /// use pdfmask_viewer::PageWindowManager;
    ///
    /// let window = PageWindowManager::new(5).compute(&[0, 1], 0, 20);
    /// assert_eq!(window.to_vec(), vec![0, 1, 2, 3, 4, 5]);
    /// ```
    pub fn compute(&self, visible: &[u32], current: u32, page_count: u32) -> RenderWindow {
        if page_count == 0 {
            return RenderWindow::default();
        }
        let last = page_count - 1;
        let current = current.min(last);

        let mut indices = BTreeSet::new();
        for &index in visible {
            if index <= last {
                indices.insert(index);
            } else {
                log::warn!("visible page index {index} is outside a {page_count}-page document");
            }
        }
        // Offsets past the page count add nothing.
        for offset in 0..=self.overscan.min(page_count) {
            indices.insert(current.saturating_add(offset).min(last));
            indices.insert(current.saturating_sub(offset));
        }
        RenderWindow { indices }
    }

    /// The first `max(3, overscan)` pages, mounted before any visibility is known.
    pub fn initial(&self, page_count: u32) -> RenderWindow {
        let count = INITIAL_WINDOW_MIN.max(self.overscan).min(page_count);
        (0..count).collect()
    }
}

impl Default for PageWindowManager {
    fn default() -> Self {
        Self::new(DEFAULT_OVERSCAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_covers_overscan_around_current() {
        let window = PageWindowManager::new(2).compute(&[10, 11], 10, 50);
        assert_eq!(window.to_vec(), vec![8, 9, 10, 11, 12]);
    }

    #[test]
    fn window_is_clipped_at_both_ends() {
        let manager = PageWindowManager::new(5);
        assert_eq!(manager.compute(&[0], 0, 3).to_vec(), vec![0, 1, 2]);
        assert_eq!(manager.compute(&[9], 9, 10).to_vec(), vec![4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn out_of_range_inputs_are_dropped() {
        let window = PageWindowManager::new(1).compute(&[2, 40], 99, 4);
        assert_eq!(window.to_vec(), vec![2, 3]);
    }

    #[test]
    fn empty_document_has_empty_window() {
        let manager = PageWindowManager::default();
        assert!(manager.compute(&[0], 0, 0).is_empty());
        assert!(manager.initial(0).is_empty());
    }

    #[test]
    fn zero_overscan_keeps_visible_and_current() {
        let window = PageWindowManager::new(0).compute(&[3, 4], 3, 10);
        assert_eq!(window.to_vec(), vec![3, 4]);
    }

    #[test]
    fn huge_overscan_does_not_overflow() {
        let window = PageWindowManager::new(u32::MAX).compute(&[], 2, 6);
        assert_eq!(window.len(), 6);
    }

    #[test]
    fn initial_window_size() {
        assert_eq!(PageWindowManager::new(5).initial(20).to_vec(), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageWindowManager::new(1).initial(20).to_vec(), vec![0, 1, 2]);
        assert_eq!(PageWindowManager::new(5).initial(2).to_vec(), vec![0, 1]);
    }

    #[test]
    fn diff_reports_mounts_and_unmounts() {
        let before: RenderWindow = [0, 1, 2, 3].into_iter().collect();
        let after: RenderWindow = [2, 3, 4, 5].into_iter().collect();
        let diff = before.diff(&after);
        assert_eq!(diff.added, vec![4, 5]);
        assert_eq!(diff.removed, vec![0, 1]);
        assert!(after.diff(&after).is_empty());
    }
}
