//! Per-page render scheduling
//!
//! One [`RenderTask`] exists per mounted page. Each task is a small state machine
//! (`Idle -> Rendering -> Idle | Rendering`) bound to the latest requested scale:
//!
//! - at most one render is in flight per page index;
//! - a scale request that arrives while a render is in flight cancels it and is
//!   parked as the pending scale, started as soon as the in-flight task reports back;
//! - scale requests on an idle page that already shows a bitmap are debounced so a
//!   continuous zoom gesture does not fire a raster per event;
//! - completions are matched against the task that is current for the page, so a
//!   stale result is never applied over a newer one.

use crate::cancel::{CancellationRegistry, CancellationToken};
use crate::timing::{Debouncer, DEFAULT_ZOOM_DEBOUNCE};
use pdfmask_engine::{Bitmap, EngineError, PageDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scales closer than this are treated as equal.
pub const SCALE_EPSILON: f32 = 1e-4;

pub type TaskId = u64;

fn same_scale(a: f32, b: f32) -> bool {
    (a - b).abs() < SCALE_EPSILON
}

/// Instruction to rasterise one page at one scale.
#[derive(Debug, Clone)]
pub struct RenderTicket {
    pub task_id: TaskId,
    pub page: PageDescriptor,
    pub scale: f32,
    pub token: CancellationToken,
}

impl RenderTicket {
    pub fn page_index(&self) -> u32 {
        self.page.index
    }
}

/// Result of executing a [`RenderTicket`].
#[derive(Debug)]
pub struct RenderOutcome {
    pub page_index: u32,
    pub task_id: TaskId,
    pub result: Result<Bitmap, EngineError>,
}

/// What the host should draw for a mounted page.
#[derive(Debug, Clone, Default)]
pub enum PageSurface {
    /// Nothing rendered yet.
    #[default]
    Blank,
    Ready(Arc<Bitmap>),
    /// The last render failed; show an inline placeholder.
    Failed { scale: f32, reason: String },
}

impl PageSurface {
    /// The painted bitmap, if the last render succeeded.
    pub fn bitmap(&self) -> Option<&Arc<Bitmap>> {
        match self {
            Self::Ready(bitmap) => Some(bitmap),
            _ => None,
        }
    }

    /// Scale of the bitmap on screen. Failed and blank surfaces show none.
    pub fn displayed_scale(&self) -> Option<f32> {
        self.bitmap().map(|bitmap| bitmap.scale)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderState {
    Idle,
    Rendering { scale: f32 },
}

/// How a completion was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// The bitmap replaced the page's surface.
    Applied,
    /// A newer scale was requested while rendering; the bitmap was dropped.
    Superseded,
    /// The render observed its cancel token.
    Cancelled,
    /// The raster engine failed for this page.
    Failed,
    /// The page was unmounted or the task is no longer current.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub page_index: u32,
    pub kind: CompletionKind,
    /// Follow-up render to submit, if a pending scale was waiting.
    pub next: Option<RenderTicket>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub renders_started: u64,
    pub renders_applied: u64,
    pub renders_superseded: u64,
    pub renders_cancelled: u64,
    pub renders_failed: u64,
    pub stale_completions: u64,
}

impl SchedulerStats {
    /// Renders started but not yet reported back.
    pub fn in_flight(&self) -> u64 {
        let finished = self.renders_applied
            + self.renders_superseded
            + self.renders_cancelled
            + self.renders_failed
            + self.stale_completions;
        self.renders_started.saturating_sub(finished)
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    task_id: TaskId,
    scale: f32,
}

#[derive(Debug)]
struct RenderTask {
    page: PageDescriptor,
    requested_scale: f32,
    in_flight: Option<InFlight>,
    pending_scale: Option<f32>,
    debounce: Debouncer,
    surface: PageSurface,
}

/// Issues task ids and cancel tokens, and counts what it launched.
#[derive(Debug, Default)]
struct Launcher {
    next_task_id: TaskId,
    cancellation: CancellationRegistry,
    stats: SchedulerStats,
}

impl Launcher {
    fn start(&mut self, task: &mut RenderTask, scale: f32) -> RenderTicket {
        self.next_task_id += 1;
        let task_id = self.next_task_id;
        let token = self.cancellation.register(task.page.index);
        self.stats.renders_started += 1;

        task.in_flight = Some(InFlight { task_id, scale });
        task.pending_scale = None;
        task.requested_scale = scale;
        task.debounce.clear();

        RenderTicket { task_id, page: task.page, scale, token }
    }
}

/// Owns the render tasks of every mounted page.
///
/// The scheduler never renders anything itself: it hands out [`RenderTicket`]s
/// for an executor to run and consumes the resulting [`RenderOutcome`]s.
///
/// # Example
///
/// ```
/// use pdfmask_engine::{PageDescriptor, DEFAULT_PAGE_SIZE};
/// use pdfmask_scheduler::PageRenderScheduler;
/// use std::time::Instant;
///
/// let mut scheduler = PageRenderScheduler::new();
/// let now = Instant::now();
///
/// let ticket = scheduler.mount(PageDescriptor::new(0, DEFAULT_PAGE_SIZE), 1.0, now);
/// assert!(ticket.is_some());
///
/// // A second scale while the first render is in flight is parked, not started.
/// assert!(scheduler.request_render(0, 1.5, now).is_none());
/// assert_eq!(scheduler.pending_scale(0), Some(1.5));
/// ```
#[derive(Debug)]
/// Owns one [`RenderTask`] per mounted page and hands out [`RenderTicket`]s.
///
/// The scheduler never runs a raster itself. Tickets go to a
/// [`crate::RenderExecutor`] and come back through [`Self::complete`].
pub struct PageRenderScheduler {
    tasks: HashMap<u32, RenderTask>,
    launcher: Launcher,
    debounce: Duration,
}

impl PageRenderScheduler {
    /// Scheduler with the default 400 ms zoom debounce.
    pub fn new() -> Self {
        Self::with_debounce(DEFAULT_ZOOM_DEBOUNCE)
    }

    /// Scheduler whose re-renders of already painted pages wait `debounce`.
    pub fn with_debounce(debounce: Duration) -> Self {
        Self { tasks: HashMap::new(), launcher: Launcher::default(), debounce }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Register a page that entered the render window and start its first render.
    ///
    /// Mounting an already-mounted page behaves like [`Self::request_render`].
    pub fn mount(&mut self, page: PageDescriptor, scale: f32, now: Instant) -> Option<RenderTicket> {
        if self.tasks.contains_key(&page.index) {
            return self.request_render(page.index, scale, now);
        }
        if !scale.is_finite() || scale <= 0.0 {
            log::warn!("refusing to mount page index {} at scale {scale}", page.index);
            return None;
        }

        let task = self.tasks.entry(page.index).or_insert(RenderTask {
            page,
            requested_scale: scale,
            in_flight: None,
            pending_scale: None,
            debounce: Debouncer::new(self.debounce),
            surface: PageSurface::Blank,
        });
        Some(self.launcher.start(task, scale))
    }

    /// Remove a page that left the render window, cancelling its render.
    ///
    /// Any later completion for the page is reported as [`CompletionKind::Stale`].
    pub fn unmount(&mut self, page_index: u32) -> bool {
        let Some(task) = self.tasks.remove(&page_index) else {
            return false;
        };

        if task.in_flight.is_some() {
            self.launcher.cancellation.cancel(page_index);
            log::debug!("cancelled in-flight render for unmounted page index {page_index}");
        }
        self.launcher.cancellation.unregister(page_index);
        true
    }

    /// Ask for `page_index` to be shown at `scale`.
    ///
    /// Returns a ticket only when a render can start right away, which is the
    /// case for a page that has never painted. A request that differs from an
    /// in-flight render cancels it and waits as the pending scale. A page that
    /// already shows a bitmap waits for the debounce, see [`Self::poll`].
    /// Requests for unmounted pages and non-positive scales are ignored.
    pub fn request_render(
        &mut self,
        page_index: u32,
        scale: f32,
        now: Instant,
    ) -> Option<RenderTicket> {
        if !scale.is_finite() || scale <= 0.0 {
            log::warn!("ignoring render request for page index {page_index} at scale {scale}");
            return None;
        }
        let Some(task) = self.tasks.get_mut(&page_index) else {
            log::debug!("render request for unmounted page index {page_index} ignored");
            return None;
        };
        task.requested_scale = scale;

        if let Some(in_flight) = task.in_flight {
            if same_scale(in_flight.scale, scale) {
                task.pending_scale = None;
            } else {
                task.pending_scale = Some(scale);
                self.launcher.cancellation.cancel(page_index);
                log::debug!(
                    "page index {page_index}: superseding render at {} with {scale}",
                    in_flight.scale
                );
            }
            return None;
        }

        let already_shown =
            task.surface.displayed_scale().is_some_and(|shown| same_scale(shown, scale));
        if already_shown {
            task.pending_scale = None;
            task.debounce.clear();
            None
        } else if matches!(task.surface, PageSurface::Blank) {
            Some(self.launcher.start(task, scale))
        } else {
            task.pending_scale = Some(scale);
            task.debounce.trigger(now);
            None
        }
    }

    /// Request `scale` for every mounted page. Returns the renders that can start now.
    pub fn rescale_all(&mut self, scale: f32, now: Instant) -> Vec<RenderTicket> {
        self.mounted()
            .into_iter()
            .filter_map(|index| self.request_render(index, scale, now))
            .collect()
    }

    /// Start every debounced render whose quiet window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Vec<RenderTicket> {
        let mut due: Vec<(u32, f32)> = self
            .tasks
            .iter()
            .filter(|(_, task)| task.in_flight.is_none() && task.debounce.is_settled(now))
            .filter_map(|(&index, task)| task.pending_scale.map(|scale| (index, scale)))
            .collect();
        due.sort_unstable_by_key(|(index, _)| *index);

        let mut tickets = Vec::with_capacity(due.len());
        for (index, scale) in due {
            if let Some(task) = self.tasks.get_mut(&index) {
                tickets.push(self.launcher.start(task, scale));
            }
        }
        tickets
    }

    /// Consume the outcome of a previously issued ticket.
    pub fn complete(&mut self, outcome: RenderOutcome) -> Completion {
        let RenderOutcome { page_index, task_id, result } = outcome;

        let task = match self.tasks.get_mut(&page_index) {
            Some(task) if task.in_flight.is_some_and(|f| f.task_id == task_id) => task,
            _ => {
                self.launcher.stats.stale_completions += 1;
                log::debug!(
                    "discarding stale completion of task {task_id} for page index {page_index}"
                );
                return Completion { page_index, kind: CompletionKind::Stale, next: None };
            }
        };
        let Some(in_flight) = task.in_flight.take() else {
            return Completion { page_index, kind: CompletionKind::Stale, next: None };
        };
        self.launcher.cancellation.unregister(page_index);

        let pending =
            task.pending_scale.take().filter(|scale| !same_scale(*scale, in_flight.scale));
        task.debounce.clear();

        let stats = &mut self.launcher.stats;
        let kind = match result {
            Ok(_) if pending.is_some() => {
                stats.renders_superseded += 1;
                log::debug!(
                    "page index {page_index}: dropping bitmap at {} in favour of pending scale",
                    in_flight.scale
                );
                CompletionKind::Superseded
            }
            Ok(bitmap) => {
                task.surface = PageSurface::Ready(Arc::new(bitmap));
                stats.renders_applied += 1;
                CompletionKind::Applied
            }
            Err(err) if err.is_cancelled() => {
                stats.renders_cancelled += 1;
                log::debug!("page index {page_index}: render at {} cancelled", in_flight.scale);
                CompletionKind::Cancelled
            }
            Err(err) => {
                stats.renders_failed += 1;
                log::warn!("page index {page_index}: render at {} failed: {err}", in_flight.scale);
                task.surface =
                    PageSurface::Failed { scale: in_flight.scale, reason: err.to_string() };
                CompletionKind::Failed
            }
        };

        // A cancelled render whose page is still mounted was cancelled on behalf
        // of a request that may since have been withdrawn; render what is wanted now.
        let retry = match kind {
            CompletionKind::Cancelled if pending.is_none() => {
                let shown = task
                    .surface
                    .displayed_scale()
                    .is_some_and(|shown| same_scale(shown, task.requested_scale));
                (!shown).then_some(task.requested_scale)
            }
            _ => None,
        };

        let next = pending.or(retry).map(|scale| self.launcher.start(task, scale));
        Completion { page_index, kind, next }
    }

    /// Cancel and forget every task, e.g. when the document is replaced.
    pub fn clear(&mut self) -> usize {
        let cancelled = self.launcher.cancellation.cancel_all();
        if cancelled > 0 {
            log::debug!("cancelled {cancelled} in-flight renders");
        }
        let count = self.tasks.len();
        self.tasks.clear();
        count
    }

    /// The page is inside the render window.
    pub fn is_mounted(&self, page_index: u32) -> bool {
        self.tasks.contains_key(&page_index)
    }

    /// Mounted page indices in ascending order.
    pub fn mounted(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = self.tasks.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// `None` for pages that are not mounted.
    pub fn state(&self, page_index: u32) -> Option<RenderState> {
        self.tasks.get(&page_index).map(|task| match task.in_flight {
            Some(in_flight) => RenderState::Rendering { scale: in_flight.scale },
            None => RenderState::Idle,
        })
    }

    /// What the page currently paints.
    pub fn surface(&self, page_index: u32) -> Option<&PageSurface> {
        self.tasks.get(&page_index).map(|task| &task.surface)
    }

    /// Scale waiting on the debounce or on the in-flight render to finish.
    pub fn pending_scale(&self, page_index: u32) -> Option<f32> {
        self.tasks.get(&page_index).and_then(|task| task.pending_scale)
    }

    /// Most recent scale requested for the page, whether or not it has rendered.
    pub fn requested_scale(&self, page_index: u32) -> Option<f32> {
        self.tasks.get(&page_index).map(|task| task.requested_scale)
    }

    /// Earliest instant at which [`Self::poll`] will start a debounced render.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks
            .values()
            .filter(|task| task.in_flight.is_none() && task.pending_scale.is_some())
            .filter_map(|task| task.debounce.deadline())
            .min()
    }

    /// No render is in flight and none is waiting on a debounce.
    pub fn is_quiescent(&self) -> bool {
        self.tasks.values().all(|task| task.in_flight.is_none() && task.pending_scale.is_none())
    }

    /// Lifetime counters, kept across [`Self::clear`].
    pub fn stats(&self) -> &SchedulerStats {
        &self.launcher.stats
    }
}

impl Default for PageRenderScheduler {
    fn default() -> Self {
        Self::new()
    }
}
