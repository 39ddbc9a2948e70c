//! Render worker pool for off-thread rasterisation.
//!
//! Workers pull [`RenderJob`]s from a shared queue, rasterise them while polling
//! the job's cancellation token, and post the outcome to a completion channel that
//! the owning event loop drains. Workers never touch scheduler state directly.

use crate::executor::{RenderExecutor, RenderJob};
use crate::render::RenderOutcome;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the render worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads to spawn.
    /// Default: number of logical CPU cores.
    pub num_workers: usize,

    /// Maximum time a worker waits for a job before checking shutdown.
    /// Default: 100ms.
    pub poll_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { num_workers: num_cpus(), poll_interval: Duration::from_millis(100) }
    }
}

impl WorkerPoolConfig {
    pub fn new(num_workers: usize) -> Self {
        Self { num_workers: num_workers.max(1), poll_interval: Duration::from_millis(100) }
    }

    /// How often idle workers wake to check the shutdown flag.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Render worker pool.
///
/// # Example
///
/// ```
/// use pdfmask_engine::{LopdfDocument, PdfDocument, DEFAULT_PAGE_SIZE};
/// use pdfmask_scheduler::{PageRenderScheduler, RenderExecutor, RenderJob, RenderWorkerPool, WorkerPoolConfig};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let document: Arc<dyn PdfDocument> = Arc::new(LopdfDocument::from_page_sizes(vec![DEFAULT_PAGE_SIZE]));
/// let mut scheduler = PageRenderScheduler::new();
/// let pool = RenderWorkerPool::new(WorkerPoolConfig::new(1)).unwrap();
///
/// let page = document.get_page(1).unwrap();
/// let ticket = scheduler.mount(page, 0.5, Instant::now()).unwrap();
/// pool.submit(RenderJob::new(ticket, document));
///
/// let outcome = pool.wait_completed(Duration::from_secs(5)).unwrap();
/// assert!(outcome.result.is_ok());
/// pool.shutdown();
/// ```
pub struct RenderWorkerPool {
    workers: Vec<Worker>,
    jobs: Sender<RenderJob>,
    completed: Mutex<Receiver<RenderOutcome>>,
    shutdown: Arc<AtomicBool>,
}

impl RenderWorkerPool {
    /// Spawn the worker threads.
    pub fn new(config: WorkerPoolConfig) -> std::io::Result<Self> {
        let (jobs, job_rx) = mpsc::channel::<RenderJob>();
        let (done_tx, completed) = mpsc::channel::<RenderOutcome>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.num_workers);
        for id in 0..config.num_workers.max(1) {
            workers.push(Worker::spawn(
                id,
                job_rx.clone(),
                done_tx.clone(),
                shutdown.clone(),
                config.poll_interval,
            )?);
        }

        Ok(Self { workers, jobs, completed: Mutex::new(completed), shutdown })
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Block until one outcome arrives or `timeout` elapses.
    pub fn wait_completed(&self, timeout: Duration) -> Option<RenderOutcome> {
        self.completed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .recv_timeout(timeout)
            .ok()
    }

    /// Signal all workers to stop and wait for them to exit.
    ///
    /// Jobs still queued are dropped; a job being rasterised finishes its current
    /// band and its outcome is discarded.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Release);
        for worker in self.workers {
            worker.join();
        }
    }
}

impl RenderExecutor for RenderWorkerPool {
    fn submit(&self, job: RenderJob) {
        if self.jobs.send(job).is_err() {
            log::warn!("render worker pool is gone; dropping job");
        }
    }

    fn drain_completed(&self) -> Vec<RenderOutcome> {
        let completed = self.completed.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        completed.try_iter().collect()
    }
}

struct Worker {
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(
        id: usize,
        jobs: Arc<Mutex<Receiver<RenderJob>>>,
        done: Sender<RenderOutcome>,
        shutdown: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> std::io::Result<Self> {
        let thread = thread::Builder::new()
            .name(format!("pdfmask-render-{id}"))
            .spawn(move || Self::run(id, jobs, done, shutdown, poll_interval))?;

        Ok(Self { thread: Some(thread) })
    }

    fn run(
        id: usize,
        jobs: Arc<Mutex<Receiver<RenderJob>>>,
        done: Sender<RenderOutcome>,
        shutdown: Arc<AtomicBool>,
        poll_interval: Duration,
    ) {
        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            let next = {
                let receiver = jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                receiver.recv_timeout(poll_interval)
            };

            match next {
                Ok(job) => {
                    let outcome = job.run();
                    if done.send(outcome).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::debug!("render worker {id} exiting");
    }

    fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("render worker panicked");
            }
        }
    }
}

/// Number of logical CPU cores, the default worker count.
fn num_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}
