//! pdfmask render scheduling
//!
//! Per-page render tasks with cancellation, debouncing and stale-result
//! protection, plus the executors that run them.
//!
//! The scheduler is driven from a single event loop: it issues
//! [`RenderTicket`]s, an executor rasterises them (inline or on a worker pool),
//! and the event loop feeds the [`RenderOutcome`]s back through
//! [`PageRenderScheduler::complete`].
//!
//! # Example
//!
//! ```
//! use pdfmask_engine::{LopdfDocument, PdfDocument, DEFAULT_PAGE_SIZE};
//! use pdfmask_scheduler::{InlineExecutor, PageRenderScheduler, RenderExecutor, RenderJob};
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! let document: Arc<dyn PdfDocument> =
//!     Arc::new(LopdfDocument::from_page_sizes(vec![DEFAULT_PAGE_SIZE; 3]));
//! let mut scheduler = PageRenderScheduler::new();
//! let executor = InlineExecutor::new();
//!
//! let page = document.get_page(1).unwrap();
//! if let Some(ticket) = scheduler.mount(page, 0.25, Instant::now()) {
//!     executor.submit(RenderJob::new(ticket, document.clone()));
//! }
//!
//! for outcome in executor.drain_completed() {
//!     scheduler.complete(outcome);
//! }
//! assert!(scheduler.surface(0).unwrap().bitmap().is_some());
//! ```

mod cancel;
mod executor;
mod render;
pub mod timing;
mod worker;

pub use cancel::{CancellationRegistry, CancellationToken};
pub use executor::{InlineExecutor, RenderExecutor, RenderJob};
pub use render::{
    Completion, CompletionKind, PageRenderScheduler, PageSurface, RenderOutcome, RenderState,
    RenderTicket, SchedulerStats, TaskId, SCALE_EPSILON,
};
pub use timing::{Debouncer, FrameThrottle};
pub use worker::{RenderWorkerPool, WorkerPoolConfig};
