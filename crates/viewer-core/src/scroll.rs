//! Scroll host abstraction, frame-throttled tick bookkeeping and zoom anchoring.

use crate::events::ScrollDirection;
use crate::geometry::{to_document, visible_percent, Point, Rect};
use crate::layout::PageLayout;
use pdfmask_scheduler::FrameThrottle;
use std::time::{Duration, Instant};

/// The scrollable surface the viewer lives in.
pub trait ScrollHost {
    /// Top-left of the viewport in content coordinates.
    fn scroll_offset(&self) -> Point;

    /// Viewport width and height in pixels.
    fn viewport_size(&self) -> (f32, f32);

    fn set_scroll_offset(&mut self, offset: Point);

    /// The scrollable content changed size.
    fn content_resized(&mut self, _width: f32, _height: f32) {}

    fn viewport(&self) -> Rect {
        let offset = self.scroll_offset();
        let (width, height) = self.viewport_size();
        Rect::new(offset.x, offset.y, width, height)
    }
}

/// In-memory scroll container that clamps offsets to its content size.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedScrollHost {
    offset: Point,
    viewport: (f32, f32),
    content: (f32, f32),
}

impl SimulatedScrollHost {
    pub fn new(width: f32, height: f32) -> Self {
        Self { offset: Point::ORIGIN, viewport: (width, height), content: (width, height) }
    }

    pub fn content_size(&self) -> (f32, f32) {
        self.content
    }

    /// Scroll by a pixel delta, as a wheel or drag would.
    pub fn scroll_by(&mut self, dx: f32, dy: f32) {
        let offset = Point::new(self.offset.x + dx, self.offset.y + dy);
        self.set_scroll_offset(offset);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
        self.set_scroll_offset(self.offset);
    }

    fn max_offset(&self) -> Point {
        Point::new(
            (self.content.0 - self.viewport.0).max(0.0),
            (self.content.1 - self.viewport.1).max(0.0),
        )
    }
}

impl ScrollHost for SimulatedScrollHost {
    fn scroll_offset(&self) -> Point {
        self.offset
    }

    fn viewport_size(&self) -> (f32, f32) {
        self.viewport
    }

    fn set_scroll_offset(&mut self, offset: Point) {
        let max = self.max_offset();
        let clamp = |value: f32, max: f32| if value.is_finite() { value.clamp(0.0, max) } else { 0.0 };
        self.offset = Point::new(clamp(offset.x, max.x), clamp(offset.y, max.y));
    }

    fn content_resized(&mut self, width: f32, height: f32) {
        self.content = (width, height);
        self.set_scroll_offset(self.offset);
    }
}

/// A document-space point pinned to a viewport position across a scale change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomAnchor {
    pub page_index: u32,
    /// Offset inside the page, in document units.
    pub document_point: Point,
    /// Where that point sat in the viewport, in pixels.
    pub viewport_point: Point,
}

/// Coalesces scroll and layout-mutation notifications into at most one
/// processing tick per frame, and derives direction and page-change events.
#[derive(Debug)]
pub struct ScrollCoordinator {
    throttle: FrameThrottle,
    scroll_pending: bool,
    mutation_pending: bool,
    last_offset: Option<Point>,
    last_page_number: Option<u32>,
}

impl ScrollCoordinator {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            throttle: FrameThrottle::new(frame_interval),
            scroll_pending: false,
            mutation_pending: false,
            last_offset: None,
            last_page_number: None,
        }
    }

    pub fn on_scroll(&mut self) {
        self.scroll_pending = true;
    }

    /// Layout changed under the viewport; handled exactly like a scroll.
    pub fn on_mutation(&mut self) {
        self.mutation_pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.scroll_pending || self.mutation_pending
    }

    /// Claim a processing tick. Returns `false` if nothing is pending or the
    /// frame has already been used; pending work stays queued for the next frame.
    pub fn begin_tick(&mut self, now: Instant) -> bool {
        if !self.is_pending() || !self.throttle.try_acquire(now) {
            return false;
        }
        self.scroll_pending = false;
        self.mutation_pending = false;
        true
    }

    /// When the next pending tick may run.
    pub fn next_tick_at(&self, now: Instant) -> Option<Instant> {
        if !self.is_pending() {
            return None;
        }
        Some(self.throttle.next_frame_at().map_or(now, |at| at.max(now)))
    }

    /// Direction relative to the offset seen on the previous tick.
    pub fn observe_offset(&mut self, offset: Point) -> Option<ScrollDirection> {
        let previous = self.last_offset.replace(offset)?;
        if offset.y > previous.y {
            Some(ScrollDirection::Down)
        } else if offset.y < previous.y {
            Some(ScrollDirection::Up)
        } else {
            None
        }
    }

    /// `(current, previous)` when the current page differs from the last tick's.
    pub fn page_change(&mut self, current_page_number: u32) -> Option<(u32, u32)> {
        match self.last_page_number.replace(current_page_number) {
            Some(previous) if previous != current_page_number => Some((current_page_number, previous)),
            _ => None,
        }
    }

    /// Forget offsets and page history; pending work is dropped.
    pub fn reset(&mut self) {
        self.throttle.reset();
        self.scroll_pending = false;
        self.mutation_pending = false;
        self.last_offset = None;
        self.last_page_number = None;
    }

    pub fn skipped_frames(&self) -> u64 {
        self.throttle.skipped()
    }

    /// Pick the point to hold still while the scale changes.
    ///
    /// With a pointer, the document point under it. Otherwise the top of the
    /// first fully visible page, or the viewport's top-left if no page is
    /// fully visible.
    pub fn capture_anchor(
        layout: &PageLayout,
        scale: f32,
        viewport: &Rect,
        pointer: Option<Point>,
    ) -> Option<ZoomAnchor> {
        if let Some(pointer) = pointer {
            let content = Point::new(viewport.x + pointer.x, viewport.y + pointer.y);
            let index = layout
                .page_at_offset(content.y, scale)
                .or_else(|| layout.page_count().checked_sub(1))?;
            return Self::anchor_at(layout, scale, index, content, pointer);
        }

        let range = layout.pages_in_range(viewport.y, viewport.bottom(), scale);
        let fully_visible = range.clone().find(|&index| {
            layout
                .page_rect(index, scale)
                .is_some_and(|rect| visible_percent(viewport, &rect) >= 100.0)
        });
        match fully_visible {
            Some(index) => {
                let rect = layout.page_rect(index, scale)?;
                let viewport_point = Point::new(0.0, rect.y - viewport.y);
                Some(ZoomAnchor {
                    page_index: index,
                    document_point: Point::new(to_document(viewport.x - rect.x, scale), 0.0),
                    viewport_point,
                })
            }
            None => {
                let index = range.start.min(layout.page_count().checked_sub(1)?);
                Self::anchor_at(layout, scale, index, Point::new(viewport.x, viewport.y), Point::ORIGIN)
            }
        }
    }

    fn anchor_at(
        layout: &PageLayout,
        scale: f32,
        index: u32,
        content: Point,
        viewport_point: Point,
    ) -> Option<ZoomAnchor> {
        let rect = layout.page_rect(index, scale)?;
        Some(ZoomAnchor {
            page_index: index,
            document_point: Point::new(
                to_document(content.x - rect.x, scale),
                to_document(content.y - rect.y, scale),
            ),
            viewport_point,
        })
    }

    /// Scroll offset that puts `anchor` back at its viewport position at `scale`.
    pub fn restore_anchor(anchor: &ZoomAnchor, layout: &PageLayout, scale: f32) -> Option<Point> {
        let rect = layout.page_rect(anchor.page_index, scale)?;
        let x = rect.x + anchor.document_point.x * scale - anchor.viewport_point.x;
        let y = rect.y + anchor.document_point.y * scale - anchor.viewport_point.y;
        Some(Point::new(x.max(0.0), y.max(0.0)))
    }
}

impl Default for ScrollCoordinator {
    fn default() -> Self {
        Self::new(pdfmask_scheduler::timing::FRAME_INTERVAL_60FPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn layout() -> PageLayout {
        PageLayout::from_sizes(&[(100.0, 100.0); 10], 10.0)
    }

    #[test]
    fn ticks_are_throttled_and_coalesced() {
        let mut scroll = ScrollCoordinator::new(ms(16));
        let start = Instant::now();
        assert!(!scroll.begin_tick(start));

        scroll.on_scroll();
        scroll.on_mutation();
        assert!(scroll.begin_tick(start));
        assert!(!scroll.is_pending());

        scroll.on_scroll();
        assert!(!scroll.begin_tick(start + ms(5)));
        assert!(scroll.is_pending());
        assert_eq!(scroll.next_tick_at(start + ms(5)), Some(start + ms(16)));
        assert!(scroll.begin_tick(start + ms(16)));
        assert_eq!(scroll.next_tick_at(start + ms(16)), None);
    }

    #[test]
    fn mutation_alone_triggers_a_tick() {
        let mut scroll = ScrollCoordinator::default();
        scroll.on_mutation();
        assert!(scroll.begin_tick(Instant::now()));
    }

    #[test]
    fn direction_follows_vertical_offset() {
        let mut scroll = ScrollCoordinator::default();
        assert_eq!(scroll.observe_offset(Point::new(0.0, 0.0)), None);
        assert_eq!(scroll.observe_offset(Point::new(0.0, 40.0)), Some(ScrollDirection::Down));
        assert_eq!(scroll.observe_offset(Point::new(0.0, 40.0)), None);
        assert_eq!(scroll.observe_offset(Point::new(0.0, 10.0)), Some(ScrollDirection::Up));
    }

    #[test]
    fn page_change_only_on_difference() {
        let mut scroll = ScrollCoordinator::default();
        assert_eq!(scroll.page_change(1), None);
        assert_eq!(scroll.page_change(1), None);
        assert_eq!(scroll.page_change(3), Some((3, 1)));
        scroll.reset();
        assert_eq!(scroll.page_change(3), None);
    }

    #[test]
    fn pointer_anchor_holds_still_across_zoom() {
        let layout = layout();
        let viewport = Rect::new(0.0, 150.0, 120.0, 200.0);
        let pointer = Point::new(60.0, 50.0);

        let anchor = ScrollCoordinator::capture_anchor(&layout, 1.0, &viewport, Some(pointer))
            .expect("anchor");
        assert_eq!(anchor.page_index, 1);
        assert_eq!(anchor.document_point, Point::new(50.0, 80.0));

        let offset = ScrollCoordinator::restore_anchor(&anchor, &layout, 2.0).expect("offset");
        // The same document point is under the pointer at the new scale.
        let content = Point::new(offset.x + pointer.x, offset.y + pointer.y);
        let rect = layout.page_rect(1, 2.0).expect("page");
        assert_eq!((content.x - rect.x) / 2.0, 50.0);
        assert_eq!((content.y - rect.y) / 2.0, 80.0);
    }

    #[test]
    fn anchor_without_pointer_uses_first_fully_visible_page() {
        let layout = layout();
        // Page 1 is cut off at the top; page 2 (index 2, top 230) is fully visible.
        let viewport = Rect::new(0.0, 150.0, 120.0, 200.0);
        let anchor =
            ScrollCoordinator::capture_anchor(&layout, 1.0, &viewport, None).expect("anchor");
        assert_eq!(anchor.page_index, 2);
        assert_eq!(anchor.viewport_point, Point::new(0.0, 80.0));

        let offset = ScrollCoordinator::restore_anchor(&anchor, &layout, 2.0).expect("offset");
        let top = layout.page_top(2, 2.0).expect("page");
        assert_eq!(top - offset.y, 80.0);
    }

    #[test]
    fn anchor_when_zoomed_past_page_size() {
        let layout = layout();
        let viewport = Rect::new(0.0, 500.0, 100.0, 100.0);
        let anchor =
            ScrollCoordinator::capture_anchor(&layout, 3.0, &viewport, None).expect("anchor");
        assert_eq!(anchor.page_index, 1);
        assert_eq!(anchor.viewport_point, Point::ORIGIN);
    }

    #[test]
    fn empty_layout_has_no_anchor() {
        let layout = PageLayout::empty(10.0);
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(ScrollCoordinator::capture_anchor(&layout, 1.0, &viewport, None).is_none());
        assert!(ScrollCoordinator::capture_anchor(&layout, 1.0, &viewport, Some(Point::ORIGIN))
            .is_none());
    }

    #[test]
    fn simulated_host_clamps_offsets() {
        let mut host = SimulatedScrollHost::new(100.0, 100.0);
        host.content_resized(300.0, 1000.0);
        host.scroll_by(0.0, 2000.0);
        assert_eq!(host.scroll_offset(), Point::new(0.0, 900.0));
        host.scroll_by(-50.0, -100.0);
        assert_eq!(host.scroll_offset(), Point::new(0.0, 800.0));
        host.content_resized(100.0, 500.0);
        assert_eq!(host.scroll_offset(), Point::new(0.0, 400.0));
        assert_eq!(host.viewport(), Rect::new(0.0, 400.0, 100.0, 100.0));
    }
}
