#![allow(dead_code)]

use pdfmask_scheduler::{RenderExecutor, RenderJob, RenderOutcome};
use std::sync::{Arc, Mutex};

/// Holds jobs until the test runs them, like a slow raster backend.
#[derive(Clone, Default)]
pub struct DeferredExecutor {
    queued: Arc<Mutex<Vec<RenderJob>>>,
    done: Arc<Mutex<Vec<RenderOutcome>>>,
}

impl DeferredExecutor {
    pub fn run_all(&self) -> usize {
        let jobs: Vec<RenderJob> = self.queued.lock().unwrap().drain(..).collect();
        let count = jobs.len();
        let mut done = self.done.lock().unwrap();
        done.extend(jobs.iter().map(RenderJob::run));
        count
    }

    pub fn queued(&self) -> usize {
        self.queued.lock().unwrap().len()
    }
}

impl RenderExecutor for DeferredExecutor {
    fn submit(&self, job: RenderJob) {
        self.queued.lock().unwrap().push(job);
    }

    fn drain_completed(&self) -> Vec<RenderOutcome> {
        self.done.lock().unwrap().drain(..).collect()
    }
}
