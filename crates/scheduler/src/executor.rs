//! Execution seam between the scheduler and the raster engine.

use crate::render::{RenderOutcome, RenderTicket};
use pdfmask_engine::{EngineError, PdfDocument};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A ticket bound to the document it renders from.
#[derive(Clone)]
pub struct RenderJob {
    pub ticket: RenderTicket,
    pub document: Arc<dyn PdfDocument>,
}

impl RenderJob {
    pub fn new(ticket: RenderTicket, document: Arc<dyn PdfDocument>) -> Self {
        Self { ticket, document }
    }

    /// Rasterise the page. A job cancelled before it starts does no work.
    pub fn run(&self) -> RenderOutcome {
        let ticket = &self.ticket;
        let result = if ticket.token.is_cancelled() {
            Err(EngineError::RenderCancelled { page_index: ticket.page.index })
        } else {
            self.document.render_page(&ticket.page, ticket.scale, &ticket.token)
        };

        RenderOutcome { page_index: ticket.page.index, task_id: ticket.task_id, result }
    }
}

impl std::fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderJob").field("ticket", &self.ticket).finish_non_exhaustive()
    }
}

/// Runs render jobs and hands their outcomes back to the event loop.
///
/// Outcomes are collected by [`RenderExecutor::drain_completed`] on the thread
/// that owns the scheduler, so completions are always applied there.
pub trait RenderExecutor {
    fn submit(&self, job: RenderJob);

    fn drain_completed(&self) -> Vec<RenderOutcome>;
}

/// Renders synchronously inside `submit`.
///
/// Useful for command-line tools and deterministic tests.
#[derive(Debug, Default)]
pub struct InlineExecutor {
    completed: Mutex<VecDeque<RenderOutcome>>,
}

impl InlineExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderExecutor for InlineExecutor {
    fn submit(&self, job: RenderJob) {
        let outcome = job.run();
        self.completed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(outcome);
    }

    fn drain_completed(&self) -> Vec<RenderOutcome> {
        self.completed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PageRenderScheduler;
    use pdfmask_engine::{LopdfDocument, PageSize};
    use std::time::Instant;

    fn document() -> Arc<dyn PdfDocument> {
        Arc::new(LopdfDocument::from_page_sizes(vec![
            PageSize { width_pt: 10.0, height_pt: 20.0 };
            3
        ]))
    }

    #[test]
    fn test_inline_executor_renders_on_submit() {
        let document = document();
        let mut scheduler = PageRenderScheduler::new();
        let page = document.get_page(2).expect("page exists");
        let ticket = scheduler.mount(page, 2.0, Instant::now()).expect("ticket");

        let executor = InlineExecutor::new();
        executor.submit(RenderJob::new(ticket, document));

        let outcomes = executor.drain_completed();
        assert_eq!(outcomes.len(), 1);
        let bitmap = outcomes[0].result.as_ref().expect("render succeeds");
        assert_eq!((bitmap.width(), bitmap.height()), (20, 40));
        assert!(executor.drain_completed().is_empty());
    }

    #[test]
    fn test_cancelled_job_skips_raster() {
        let document = document();
        let mut scheduler = PageRenderScheduler::new();
        let page = document.get_page(1).expect("page exists");
        let ticket = scheduler.mount(page, 1.0, Instant::now()).expect("ticket");
        ticket.token.cancel();

        let outcome = RenderJob::new(ticket, document).run();
        assert!(outcome.result.expect_err("cancelled").is_cancelled());
    }
}
