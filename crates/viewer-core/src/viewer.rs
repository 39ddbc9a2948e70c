//! The viewer instance: one document, one scale, one render window.
//!
//! A host drives the viewer from its event loop:
//!
//! 1. forward scroll and layout notifications with [`Viewer::on_scroll`] and
//!    [`Viewer::on_mutation`],
//! 2. call [`Viewer::tick`] once per frame,
//! 3. call [`Viewer::pump_renders`] to apply finished renders and start
//!    debounced ones.
//!
//! [`Viewer::next_wakeup`] reports when the next call can do useful work.

use crate::config::ViewerConfig;
use crate::edits::EditSession;
use crate::error::{Result, ViewerError};
use crate::events::{EventBus, SubscriptionId, ViewerEvent};
use crate::geometry::{Point, Rect};
use crate::layout::PageLayout;
use crate::pages::PageCache;
use crate::scale::{fit_page_scale, fit_width_scale, ScaleChange, ScaleController};
use crate::scroll::{ScrollCoordinator, ScrollHost};
use crate::visibility::{CurrentPageState, VisibilityTracker};
use crate::window::{PageWindowManager, RenderWindow};
use pdfmask_engine::{default_decoder, PageSize, PdfDecoder, PdfDocument, DEFAULT_PAGE_SIZE};
use pdfmask_scheduler::{
    CompletionKind, PageRenderScheduler, PageSurface, RenderExecutor, RenderJob, RenderTicket,
    SchedulerStats,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Empty,
    Loaded { page_count: u32 },
    /// Decoding failed; the host shows an error instead of the viewport.
    Failed { reason: String },
}

pub struct Viewer {
    config: ViewerConfig,
    decoder: Box<dyn PdfDecoder>,
    executor: Box<dyn RenderExecutor>,
    document: Option<Arc<dyn PdfDocument>>,
    load_state: LoadState,
    pages: PageCache,
    layout: PageLayout,
    scale: ScaleController,
    window_manager: PageWindowManager,
    window: RenderWindow,
    visibility: VisibilityTracker,
    scroll: ScrollCoordinator,
    scheduler: PageRenderScheduler,
    edits: EditSession,
    events: EventBus<ViewerEvent>,
}

impl Viewer {
    /// Viewer backed by the default decoder.
    pub fn new(config: ViewerConfig, executor: Box<dyn RenderExecutor>) -> Result<Self> {
        Self::with_decoder(config, Box::new(default_decoder()), executor)
    }

    pub fn with_decoder(
        config: ViewerConfig,
        decoder: Box<dyn PdfDecoder>,
        executor: Box<dyn RenderExecutor>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scale: ScaleController::with_bounds(config.default_scale, config.min_scale, config.max_scale)
                .with_tick_factor(config.tick_factor),
            window_manager: PageWindowManager::new(config.overscan),
            scroll: ScrollCoordinator::new(config.frame_interval()),
            scheduler: PageRenderScheduler::with_debounce(config.zoom_debounce()),
            layout: PageLayout::empty(config.page_gap),
            decoder,
            executor,
            document: None,
            load_state: LoadState::Empty,
            pages: PageCache::new(),
            window: RenderWindow::default(),
            visibility: VisibilityTracker::new(),
            edits: EditSession::new(0),
            events: EventBus::new(),
            config,
        })
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ViewerEvent) + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Decode `bytes` and show the result, replacing any current document.
    ///
    /// On failure the previous document is gone too and the viewer is in
    /// [`LoadState::Failed`].
    pub fn load_bytes(
        &mut self,
        bytes: Vec<u8>,
        host: &mut dyn ScrollHost,
        now: Instant,
    ) -> Result<u32> {
        let decoded = self.decoder.decode(bytes);
        self.finish_load(decoded, host, now)
    }

    pub fn load_file(&mut self, path: &Path, host: &mut dyn ScrollHost, now: Instant) -> Result<u32> {
        let decoded = self.decoder.open(path);
        self.finish_load(decoded, host, now)
    }

    fn finish_load(
        &mut self,
        decoded: std::result::Result<Arc<dyn PdfDocument>, pdfmask_engine::EngineError>,
        host: &mut dyn ScrollHost,
        now: Instant,
    ) -> Result<u32> {
        match decoded {
            Ok(document) => Ok(self.load_document(document, host, now)),
            Err(err) => {
                self.close();
                log::warn!("failed to load document: {err}");
                self.load_state = LoadState::Failed { reason: err.to_string() };
                Err(err.into())
            }
        }
    }

    /// Show an already decoded document. Returns its page count.
    pub fn load_document(
        &mut self,
        document: Arc<dyn PdfDocument>,
        host: &mut dyn ScrollHost,
        now: Instant,
    ) -> u32 {
        self.close();
        let page_count = document.page_count();

        let estimate = match page_count {
            0 => DEFAULT_PAGE_SIZE,
            _ => match self.pages.get_or_fetch(document.as_ref(), 0) {
                Ok(first) => PageSize { width_pt: first.natural_width, height_pt: first.natural_height },
                Err(err) => {
                    log::warn!("first page unreadable, assuming default size: {err}");
                    DEFAULT_PAGE_SIZE
                }
            },
        };
        self.layout = PageLayout::uniform(page_count, estimate, self.config.page_gap);
        self.edits = EditSession::new(page_count);
        self.document = Some(document.clone());
        self.load_state = LoadState::Loaded { page_count };

        self.sync_content_size(host);
        host.set_scroll_offset(Point::ORIGIN);

        let initial = self.window_manager.initial(page_count);
        self.apply_window(&document, initial, host, now);
        self.scroll.on_mutation();

        log::info!("loaded document with {page_count} pages");
        self.events.emit(&ViewerEvent::DocumentLoaded {
            page_count,
            page_numbers: (1..=page_count).collect(),
        });
        page_count
    }

    /// Drop the document and every render for it.
    pub fn close(&mut self) {
        let cancelled = self.scheduler.clear();
        if cancelled > 0 {
            log::debug!("closed document with {cancelled} mounted pages");
        }
        self.document = None;
        self.load_state = LoadState::Empty;
        self.pages.clear();
        self.layout = PageLayout::empty(self.config.page_gap);
        self.window = RenderWindow::default();
        self.visibility.reset();
        self.scroll.reset();
        self.edits = EditSession::new(0);
    }

    /// The host scrolled.
    pub fn on_scroll(&mut self) {
        self.scroll.on_scroll();
    }

    /// Layout changed under the viewport, e.g. the host resized it.
    pub fn on_mutation(&mut self) {
        self.scroll.on_mutation();
    }

    /// Process pending scroll and mutation notifications, at most once per frame.
    ///
    /// Measures visibility, picks the current page, mounts and unmounts pages
    /// to match the new render window, and emits scroll and page-change events.
    /// Returns `false` if the tick was skipped.
    pub fn tick(&mut self, host: &mut dyn ScrollHost, now: Instant) -> bool {
        if !self.scroll.begin_tick(now) {
            return false;
        }
        let Some(document) = self.document.clone() else {
            return false;
        };

        let scale = self.scale.scale();
        let viewport = host.viewport();
        let measured: Vec<(u32, Rect)> = self
            .layout
            .pages_in_range(viewport.y, viewport.bottom(), scale)
            .filter_map(|index| self.layout.page_rect(index, scale).map(|rect| (index, rect)))
            .collect();
        let snapshot = self.visibility.update(&viewport, &measured);

        let next =
            self.window_manager.compute(&snapshot.visible, snapshot.current_index, document.page_count());
        self.apply_window(&document, next, host, now);

        let current = self.visibility.state().current_page_number;
        if let Some(direction) = self.scroll.observe_offset(Point::new(viewport.x, viewport.y)) {
            self.events.emit(&ViewerEvent::Scrolled { current_page_number: current, direction });
        }
        if let Some((current_page_number, previous_page_number)) = self.scroll.page_change(current) {
            log::debug!("current page {previous_page_number} -> {current_page_number}");
            self.events.emit(&ViewerEvent::PageChanged { current_page_number, previous_page_number });
        }
        true
    }

    fn apply_window(
        &mut self,
        document: &Arc<dyn PdfDocument>,
        next: RenderWindow,
        host: &mut dyn ScrollHost,
        now: Instant,
    ) {
        let diff = self.window.diff(&next);
        if diff.is_empty() {
            return;
        }
        self.window = next;

        for index in diff.removed {
            self.scheduler.unmount(index);
        }

        let scale = self.scale.scale();
        let mut layout_changed = false;
        for index in diff.added {
            match self.pages.get_or_fetch(document.as_ref(), index) {
                Ok(page) => {
                    layout_changed |= self.layout.set_page_size(&page);
                    if let Some(ticket) = self.scheduler.mount(page, scale, now) {
                        self.submit(document, ticket);
                    }
                }
                Err(err) => {
                    log::warn!("dropping page index {index} from the render window: {err}");
                    self.window.remove(index);
                }
            }
        }

        if layout_changed {
            self.sync_content_size(host);
            self.scroll.on_mutation();
        }
    }

    fn submit(&self, document: &Arc<dyn PdfDocument>, ticket: RenderTicket) {
        self.executor.submit(RenderJob::new(ticket, document.clone()));
    }

    fn sync_content_size(&self, host: &mut dyn ScrollHost) {
        let scale = self.scale.scale();
        host.content_resized(self.layout.content_width(scale), self.layout.content_height(scale));
    }

    /// Apply finished renders and start debounced ones that are due.
    ///
    /// Returns the number of completions consumed.
    pub fn pump_renders(&mut self, now: Instant) -> usize {
        self.pump(now).0
    }

    /// Pump until a round neither consumes a completion nor starts a render.
    ///
    /// With a synchronous executor this applies every render that can finish
    /// without waiting for a debounce.
    pub fn pump_until_idle(&mut self, now: Instant) -> usize {
        let mut total = 0;
        loop {
            let (completed, started) = self.pump(now);
            total += completed;
            if completed == 0 && started == 0 {
                return total;
            }
        }
    }

    fn pump(&mut self, now: Instant) -> (usize, usize) {
        let outcomes = self.executor.drain_completed();
        let completed = outcomes.len();
        let document = self.document.clone();
        let mut started = 0;

        for outcome in outcomes {
            let completion = self.scheduler.complete(outcome);
            if completion.kind == CompletionKind::Failed {
                let reason = match self.scheduler.surface(completion.page_index) {
                    Some(PageSurface::Failed { reason, .. }) => reason.clone(),
                    _ => String::new(),
                };
                self.events.emit(&ViewerEvent::PageRenderFailed {
                    page_number: completion.page_index + 1,
                    reason,
                });
            }
            if let (Some(ticket), Some(document)) = (completion.next, document.as_ref()) {
                self.submit(document, ticket);
                started += 1;
            }
        }

        if let Some(document) = document.as_ref() {
            for ticket in self.scheduler.poll(now) {
                self.submit(document, ticket);
                started += 1;
            }
        }
        (completed, started)
    }

    /// Earliest instant at which [`Self::tick`] or [`Self::pump_renders`] has work.
    pub fn next_wakeup(&self, now: Instant) -> Option<Instant> {
        match (self.scroll.next_tick_at(now), self.scheduler.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn page_index(&self, page_number: u32) -> Result<u32> {
        if self.document.is_none() {
            return Err(ViewerError::NoDocument);
        }
        let page_count = self.layout.page_count();
        match page_number.checked_sub(1) {
            Some(index) if index < page_count => Ok(index),
            _ => Err(ViewerError::PageOutOfRange { page_number, page_count }),
        }
    }

    /// Scroll so the page's top edge sits one gap below the viewport top.
    pub fn scroll_to_page(&mut self, page_number: u32, host: &mut dyn ScrollHost) -> Result<()> {
        let index = self.page_index(page_number)?;
        let scale = self.scale.scale();
        let top = self
            .layout
            .page_top(index, scale)
            .ok_or(ViewerError::PageOutOfRange { page_number, page_count: self.layout.page_count() })?;
        let x = host.scroll_offset().x;
        host.set_scroll_offset(Point::new(x, (top - self.layout.gap()).max(0.0)));
        self.scroll.on_scroll();
        Ok(())
    }

    pub fn first_page(&mut self, host: &mut dyn ScrollHost) -> Result<u32> {
        self.scroll_to_page(1, host)?;
        Ok(1)
    }

    pub fn last_page(&mut self, host: &mut dyn ScrollHost) -> Result<u32> {
        let last = self.page_count().ok_or(ViewerError::NoDocument)?;
        self.scroll_to_page(last, host)?;
        Ok(last)
    }

    /// Scroll to the page after the current one, staying put on the last page.
    pub fn next_page(&mut self, host: &mut dyn ScrollHost) -> Result<u32> {
        let count = self.page_count().ok_or(ViewerError::NoDocument)?;
        let target = (self.current_page().current_page_number + 1).min(count.max(1));
        self.scroll_to_page(target, host)?;
        Ok(target)
    }

    pub fn previous_page(&mut self, host: &mut dyn ScrollHost) -> Result<u32> {
        let target = self.current_page().current_page_number.saturating_sub(1).max(1);
        self.scroll_to_page(target, host)?;
        Ok(target)
    }

    pub fn current_scale(&self) -> f32 {
        self.scale.scale()
    }

    /// Zoom in by `ticks` steps (default 1) of `factor` (default the tick factor).
    pub fn increase_scale(
        &mut self,
        ticks: Option<u32>,
        factor: Option<f32>,
        host: &mut dyn ScrollHost,
        now: Instant,
    ) -> f32 {
        let ticks = i32::try_from(ticks.unwrap_or(1)).unwrap_or(i32::MAX);
        self.change_scale(host, None, now, |scale| scale.zoom_by_ticks(ticks, factor))
    }

    pub fn decrease_scale(
        &mut self,
        ticks: Option<u32>,
        factor: Option<f32>,
        host: &mut dyn ScrollHost,
        now: Instant,
    ) -> f32 {
        let ticks = i32::try_from(ticks.unwrap_or(1)).unwrap_or(i32::MAX);
        self.change_scale(host, None, now, |scale| scale.zoom_by_ticks(-ticks, factor))
    }

    /// Wheel zoom keeping the content under `pointer` (viewport pixels) still.
    pub fn zoom_at(&mut self, ticks: i32, pointer: Point, host: &mut dyn ScrollHost, now: Instant) -> f32 {
        self.change_scale(host, Some(pointer), now, |scale| scale.zoom_by_ticks(ticks, None))
    }

    /// Continuous zoom from a pinch gesture. Ignored when pinch zoom is disabled.
    pub fn pinch(&mut self, factor: f32, pointer: Point, host: &mut dyn ScrollHost, now: Instant) -> f32 {
        if !self.config.pinch_zoom {
            return self.scale.scale();
        }
        self.change_scale(host, Some(pointer), now, |scale| scale.zoom_by_factor(factor))
    }

    pub fn set_scale(&mut self, value: f32, host: &mut dyn ScrollHost, now: Instant) -> f32 {
        self.change_scale(host, None, now, |scale| scale.set_scale(value))
    }

    /// Scale the current page to the viewport width.
    pub fn fit_width(&mut self, host: &mut dyn ScrollHost, now: Instant) -> f32 {
        let (viewport_width, _) = host.viewport_size();
        let target = self
            .current_natural_size()
            .and_then(|(width, _)| fit_width_scale(viewport_width, width, self.layout.gap()));
        match target {
            Some(target) => self.set_scale(target, host, now),
            None => self.scale.scale(),
        }
    }

    /// Scale so the whole current page fits in the viewport.
    pub fn fit_page(&mut self, host: &mut dyn ScrollHost, now: Instant) -> f32 {
        let (viewport_width, viewport_height) = host.viewport_size();
        let target = self.current_natural_size().and_then(|(width, height)| {
            fit_page_scale(viewport_width, viewport_height, width, height, self.layout.gap())
        });
        match target {
            Some(target) => self.set_scale(target, host, now),
            None => self.scale.scale(),
        }
    }

    fn current_natural_size(&self) -> Option<(f32, f32)> {
        let index = self.current_page().current_page_number.checked_sub(1)?;
        self.layout.natural_size(index)
    }

    fn change_scale<F>(
        &mut self,
        host: &mut dyn ScrollHost,
        pointer: Option<Point>,
        now: Instant,
        apply: F,
    ) -> f32
    where
        F: FnOnce(&mut ScaleController) -> Option<ScaleChange>,
    {
        let pointer = pointer.filter(|_| self.config.anchor_to_pointer);
        let anchor =
            ScrollCoordinator::capture_anchor(&self.layout, self.scale.scale(), &host.viewport(), pointer);

        let Some(change) = apply(&mut self.scale) else {
            return self.scale.scale();
        };

        self.sync_content_size(host);
        if let Some(offset) =
            anchor.and_then(|anchor| ScrollCoordinator::restore_anchor(&anchor, &self.layout, change.current))
        {
            host.set_scroll_offset(offset);
        }

        if let Some(document) = self.document.clone() {
            for ticket in self.scheduler.rescale_all(change.current, now) {
                self.submit(&document, ticket);
            }
        }

        self.events.emit(&ViewerEvent::ScaleChanged { previous: change.previous, current: change.current });
        self.scroll.on_mutation();
        change.current
    }

    /// Re-render a page immediately, e.g. after a render failure.
    pub fn retry_page(&mut self, page_number: u32, now: Instant) -> Result<bool> {
        let index = self.page_index(page_number)?;
        let Some(document) = self.document.clone() else {
            return Err(ViewerError::NoDocument);
        };
        if !self.window.contains(index) {
            return Ok(false);
        }

        let page = self.pages.get_or_fetch(document.as_ref(), index)?;
        self.scheduler.unmount(index);
        match self.scheduler.mount(page, self.scale.scale(), now) {
            Some(ticket) => {
                self.submit(&document, ticket);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mark a page for deletion. Returns `false` if it was already marked.
    pub fn delete_page(&mut self, page_number: u32) -> Result<bool> {
        self.page_index(page_number)?;
        let deleted = self.edits.delete_page(page_number)?;
        if deleted {
            self.events.emit(&ViewerEvent::PageDeleted { page_number });
        }
        Ok(deleted)
    }

    /// Page under a viewport-pixel point, with the point made page-relative.
    pub fn page_point_at(&self, host: &dyn ScrollHost, pointer: Point) -> Option<(u32, Point)> {
        let scale = self.scale.scale();
        let offset = host.scroll_offset();
        let content = Point::new(offset.x + pointer.x, offset.y + pointer.y);
        let index = self.layout.page_at_offset(content.y, scale)?;
        let rect = self.layout.page_rect(index, scale)?;
        rect.contains(content).then(|| (index, Point::new(content.x - rect.x, content.y - rect.y)))
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn document(&self) -> Option<&Arc<dyn PdfDocument>> {
        self.document.as_ref()
    }

    pub fn page_count(&self) -> Option<u32> {
        self.document.as_ref().map(|document| document.page_count())
    }

    pub fn current_page(&self) -> CurrentPageState {
        self.visibility.state()
    }

    pub fn render_window(&self) -> &RenderWindow {
        &self.window
    }

    /// What to draw for a mounted page.
    pub fn surface(&self, page_number: u32) -> Option<&PageSurface> {
        self.scheduler.surface(page_number.checked_sub(1)?)
    }

    /// Page rectangle in content pixels at the current scale.
    pub fn page_rect(&self, page_number: u32) -> Option<Rect> {
        self.layout.page_rect(page_number.checked_sub(1)?, self.scale.scale())
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn scale_controller(&self) -> &ScaleController {
        &self.scale
    }

    pub fn edits(&self) -> &EditSession {
        &self.edits
    }

    pub fn edits_mut(&mut self) -> &mut EditSession {
        &mut self.edits
    }

    pub fn scheduler(&self) -> &PageRenderScheduler {
        &self.scheduler
    }

    pub fn scheduler_stats(&self) -> &SchedulerStats {
        self.scheduler.stats()
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("load_state", &self.load_state)
            .field("scale", &self.scale.scale())
            .field("current_page", &self.visibility.state())
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ScrollDirection;
    use crate::scroll::SimulatedScrollHost;
    use pdfmask_engine::testing::letter_pdf;
    use pdfmask_scheduler::InlineExecutor;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn viewer(config: ViewerConfig) -> Viewer {
        Viewer::new(config, Box::new(InlineExecutor::new())).unwrap()
    }

    fn recorder(viewer: &mut Viewer) -> Rc<RefCell<Vec<ViewerEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        viewer.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        events
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ViewerConfig::default().with_scale_bounds(2.0, 1.0);
        assert!(matches!(
            Viewer::new(config, Box::new(InlineExecutor::new())),
            Err(ViewerError::Config(_))
        ));
    }

    #[test]
    fn load_mounts_initial_window_and_announces_pages() {
        let mut viewer = viewer(ViewerConfig::default());
        let events = recorder(&mut viewer);
        let mut host = SimulatedScrollHost::new(800.0, 600.0);

        let count = viewer.load_bytes(letter_pdf(10), &mut host, Instant::now()).unwrap();
        assert_eq!(count, 10);
        assert_eq!(viewer.render_window().to_vec(), vec![0, 1, 2, 3, 4]);
        assert_eq!(viewer.load_state(), &LoadState::Loaded { page_count: 10 });
        assert_eq!(
            events.borrow()[0],
            ViewerEvent::DocumentLoaded { page_count: 10, page_numbers: (1..=10).collect() }
        );
    }

    #[test]
    fn failed_load_enters_error_state() {
        let mut viewer = viewer(ViewerConfig::default());
        let mut host = SimulatedScrollHost::new(800.0, 600.0);
        viewer.load_bytes(letter_pdf(2), &mut host, Instant::now()).unwrap();

        let err = viewer.load_bytes(b"not a pdf".to_vec(), &mut host, Instant::now());
        assert!(matches!(err, Err(ViewerError::Engine(_))));
        assert!(matches!(viewer.load_state(), LoadState::Failed { .. }));
        assert!(viewer.document().is_none());
        assert!(viewer.render_window().is_empty());
        assert!(viewer.scheduler().is_empty());
    }

    #[test]
    fn first_tick_grows_window_to_overscan() {
        let mut viewer = viewer(ViewerConfig::default());
        let mut host = SimulatedScrollHost::new(800.0, 600.0);
        let now = Instant::now();
        viewer.load_bytes(letter_pdf(10), &mut host, now).unwrap();

        assert!(viewer.tick(&mut host, now));
        assert_eq!(viewer.render_window().to_vec(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(viewer.current_page().current_page_number, 1);

        viewer.pump_until_idle(now);
        for page_number in 1..=6 {
            assert!(viewer.surface(page_number).and_then(PageSurface::bitmap).is_some());
        }
    }

    #[test]
    fn scrolling_emits_direction_and_page_change() {
        let mut viewer = viewer(ViewerConfig::default());
        let events = recorder(&mut viewer);
        let mut host = SimulatedScrollHost::new(800.0, 600.0);
        let start = Instant::now();
        viewer.load_bytes(letter_pdf(20), &mut host, start).unwrap();
        viewer.tick(&mut host, start);

        viewer.scroll_to_page(8, &mut host).unwrap();
        assert!(viewer.tick(&mut host, start + ms(20)));
        assert_eq!(viewer.current_page(), CurrentPageState { current_page_number: 8, previous_page_number: 1 });

        let events = events.borrow();
        assert!(events.contains(&ViewerEvent::Scrolled {
            current_page_number: 8,
            direction: ScrollDirection::Down
        }));
        assert!(events.contains(&ViewerEvent::PageChanged {
            current_page_number: 8,
            previous_page_number: 1
        }));
        assert!(viewer.render_window().contains(12));
        assert!(!viewer.render_window().contains(0));
    }

    #[test]
    fn ticks_are_frame_throttled() {
        let mut viewer = viewer(ViewerConfig::default());
        let mut host = SimulatedScrollHost::new(800.0, 600.0);
        let start = Instant::now();
        viewer.load_bytes(letter_pdf(5), &mut host, start).unwrap();

        assert!(viewer.tick(&mut host, start));
        viewer.on_scroll();
        assert!(!viewer.tick(&mut host, start + ms(4)));
        assert_eq!(viewer.next_wakeup(start + ms(4)), Some(start + ms(16)));
        assert!(viewer.tick(&mut host, start + ms(16)));
        assert!(!viewer.tick(&mut host, start + ms(40)));
    }

    #[test]
    fn zoom_rerenders_after_debounce() {
        let mut viewer = viewer(ViewerConfig::default());
        let events = recorder(&mut viewer);
        let mut host = SimulatedScrollHost::new(800.0, 600.0);
        let start = Instant::now();
        viewer.load_bytes(letter_pdf(3), &mut host, start).unwrap();
        viewer.pump_until_idle(start);

        assert_eq!(viewer.increase_scale(Some(2), None, &mut host, start), 1.21);
        assert!(events
            .borrow()
            .contains(&ViewerEvent::ScaleChanged { previous: 1.0, current: 1.21 }));

        // Still showing the old bitmap until the quiet window passes.
        viewer.pump_until_idle(start + ms(100));
        assert_eq!(viewer.surface(1).and_then(PageSurface::displayed_scale), Some(1.0));

        assert_eq!(viewer.pump_until_idle(start + ms(400)), 3);
        for page_number in 1..=3 {
            assert_eq!(viewer.surface(page_number).and_then(PageSurface::displayed_scale), Some(1.21));
        }
        assert!(viewer.scheduler().is_quiescent());
    }

    #[test]
    fn pinch_can_be_disabled() {
        let mut viewer = viewer(ViewerConfig::default().with_pinch_zoom(false));
        let mut host = SimulatedScrollHost::new(800.0, 600.0);
        let now = Instant::now();
        viewer.load_bytes(letter_pdf(1), &mut host, now).unwrap();

        assert_eq!(viewer.pinch(2.0, Point::new(10.0, 10.0), &mut host, now), 1.0);
        assert_eq!(viewer.decrease_scale(None, Some(2.0), &mut host, now), 0.5);
    }

    #[test]
    fn fit_width_uses_current_page() {
        let mut viewer = viewer(ViewerConfig::default());
        let mut host = SimulatedScrollHost::new(644.0, 600.0);
        let now = Instant::now();
        viewer.load_bytes(letter_pdf(2), &mut host, now).unwrap();

        assert_eq!(viewer.fit_width(&mut host, now), 1.0);
        host.resize(1256.0, 600.0);
        assert_eq!(viewer.fit_width(&mut host, now), 2.0);
    }

    #[test]
    fn navigation_is_bounded() {
        let mut viewer = viewer(ViewerConfig::default());
        let mut host = SimulatedScrollHost::new(800.0, 600.0);
        let now = Instant::now();
        assert!(matches!(viewer.next_page(&mut host), Err(ViewerError::NoDocument)));

        viewer.load_bytes(letter_pdf(3), &mut host, now).unwrap();
        assert_eq!(viewer.previous_page(&mut host).unwrap(), 1);
        assert_eq!(viewer.next_page(&mut host).unwrap(), 2);
        assert!(matches!(
            viewer.scroll_to_page(4, &mut host),
            Err(ViewerError::PageOutOfRange { page_number: 4, page_count: 3 })
        ));
        assert!(viewer.scroll_to_page(0, &mut host).is_err());
    }

    #[test]
    fn deleting_a_page_is_announced_once() {
        let mut viewer = viewer(ViewerConfig::default());
        let events = recorder(&mut viewer);
        let mut host = SimulatedScrollHost::new(800.0, 600.0);
        viewer.load_bytes(letter_pdf(3), &mut host, Instant::now()).unwrap();

        assert!(viewer.delete_page(2).unwrap());
        assert!(!viewer.delete_page(2).unwrap());
        assert_eq!(viewer.edits().remaining_page_numbers(), vec![1, 3]);
        let deletions = events
            .borrow()
            .iter()
            .filter(|event| matches!(event, ViewerEvent::PageDeleted { .. }))
            .count();
        assert_eq!(deletions, 1);
    }

    #[test]
    fn pointer_maps_to_page_coordinates() {
        let mut viewer = viewer(ViewerConfig::default());
        let mut host = SimulatedScrollHost::new(800.0, 600.0);
        viewer.load_bytes(letter_pdf(2), &mut host, Instant::now()).unwrap();

        let (index, point) = viewer.page_point_at(&host, Point::new(26.0, 26.0)).expect("on page 1");
        assert_eq!(index, 0);
        assert_eq!(point, Point::new(10.0, 10.0));
        assert!(viewer.page_point_at(&host, Point::new(4.0, 4.0)).is_none());
    }
}
