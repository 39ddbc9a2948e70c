//! Current-page selection from measured visibility.

use crate::geometry::{rank_by_visibility, visible_percent, Rect, VisibilityEntry};

/// One-based page numbers; `previous_page_number` is the page current before the last change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentPageState {
    pub current_page_number: u32,
    pub previous_page_number: u32,
}

impl Default for CurrentPageState {
    fn default() -> Self {
        Self { current_page_number: 1, previous_page_number: 1 }
    }
}

/// Result of measuring one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilitySnapshot {
    /// Every measured page in document order.
    pub entries: Vec<VisibilityEntry>,
    /// Indices with a non-zero visible percent, ascending.
    pub visible: Vec<u32>,
    pub current_index: u32,
}

#[derive(Debug, Clone, Default)]
pub struct VisibilityTracker {
    state: CurrentPageState,
    measured: bool,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CurrentPageState {
        self.state
    }

    /// Forget everything, e.g. when a new document loads.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Measure `pages` (index, content rect) against `viewport` and pick the
    /// current page.
    ///
    /// A page that is current and still fully visible stays current as long as
    /// no partially visible page precedes it. Otherwise the best-ranked
    /// visible page wins, falling back to page 0 when nothing was measured.
    pub fn update(&mut self, viewport: &Rect, pages: &[(u32, Rect)]) -> VisibilitySnapshot {
        let mut entries: Vec<VisibilityEntry> = pages
            .iter()
            .map(|(index, rect)| VisibilityEntry::new(*index, visible_percent(viewport, rect)))
            .collect();
        entries.sort_unstable_by_key(|entry| entry.index);

        let visible_entries: Vec<VisibilityEntry> =
            entries.iter().copied().filter(VisibilityEntry::is_visible).collect();
        let current_index = self.state.current_page_number.saturating_sub(1);

        let keep_current = self.measured && self.current_is_stable(&visible_entries, current_index);
        let next_index = if keep_current {
            current_index
        } else {
            let ranked = if visible_entries.is_empty() { &entries } else { &visible_entries };
            rank_by_visibility(ranked).first().copied().unwrap_or(0)
        };

        let next_number = next_index + 1;
        if next_number != self.state.current_page_number {
            self.state = CurrentPageState {
                current_page_number: next_number,
                previous_page_number: self.state.current_page_number,
            };
        }
        self.measured = true;

        VisibilitySnapshot {
            visible: visible_entries.iter().map(|entry| entry.index).collect(),
            entries,
            current_index: next_index,
        }
    }

    fn current_is_stable(&self, visible: &[VisibilityEntry], current_index: u32) -> bool {
        for entry in visible {
            if entry.index == current_index && entry.is_fully_visible() {
                return true;
            }
            if !entry.is_fully_visible() {
                return false;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: u32, top: f32) -> (u32, Rect) {
        (index, Rect::new(0.0, top, 100.0, 100.0))
    }

    fn viewport(top: f32, height: f32) -> Rect {
        Rect::new(0.0, top, 100.0, height)
    }

    #[test]
    fn first_measurement_picks_best_ranked() {
        let mut tracker = VisibilityTracker::new();
        let snapshot = tracker.update(&viewport(0.0, 250.0), &[page(0, 0.0), page(1, 100.0), page(2, 200.0)]);

        assert_eq!(snapshot.current_index, 0);
        assert_eq!(snapshot.visible, vec![0, 1, 2]);
        assert_eq!(tracker.state().current_page_number, 1);
    }

    #[test]
    fn fully_visible_current_page_stays_current() {
        let mut tracker = VisibilityTracker::new();
        // Make page 2 (index 1) current.
        tracker.update(&viewport(100.0, 100.0), &[page(1, 100.0)]);
        assert_eq!(tracker.state().current_page_number, 2);

        // Pages 0 and 1 both fully visible, page 2 partially: ranking alone would pick 0.
        let snapshot = tracker
            .update(&viewport(0.0, 250.0), &[page(0, 0.0), page(1, 100.0), page(2, 200.0)]);
        assert_eq!(snapshot.current_index, 1);
        assert_eq!(tracker.state().current_page_number, 2);
    }

    #[test]
    fn partially_visible_page_before_current_forces_reranking() {
        let mut tracker = VisibilityTracker::new();
        tracker.update(&viewport(100.0, 100.0), &[page(1, 100.0)]);
        assert_eq!(tracker.state().current_page_number, 2);

        // Page 0 is half visible ahead of the current page, so the rule re-ranks.
        let snapshot = tracker
            .update(&viewport(150.0, 200.0), &[page(0, 100.0), page(1, 200.0), page(2, 300.0)]);
        assert_eq!(snapshot.current_index, 1);
        assert_eq!(tracker.state(), CurrentPageState { current_page_number: 2, previous_page_number: 1 });
    }

    #[test]
    fn change_records_previous_page() {
        let mut tracker = VisibilityTracker::new();
        tracker.update(&viewport(0.0, 100.0), &[page(0, 0.0)]);
        tracker.update(&viewport(300.0, 100.0), &[page(2, 300.0), page(3, 400.0)]);

        assert_eq!(tracker.state(), CurrentPageState { current_page_number: 3, previous_page_number: 1 });
    }

    #[test]
    fn nothing_measured_defaults_to_first_page() {
        let mut tracker = VisibilityTracker::new();
        tracker.update(&viewport(500.0, 100.0), &[page(5, 500.0)]);
        assert_eq!(tracker.state().current_page_number, 6);

        let snapshot = tracker.update(&viewport(0.0, 100.0), &[]);
        assert_eq!(snapshot.current_index, 0);
        assert!(snapshot.visible.is_empty());
        assert_eq!(tracker.state().current_page_number, 1);
    }

    #[test]
    fn reset_forgets_current_page() {
        let mut tracker = VisibilityTracker::new();
        tracker.update(&viewport(500.0, 100.0), &[page(5, 500.0)]);
        tracker.reset();
        assert_eq!(tracker.state(), CurrentPageState::default());
    }
}
