//! Fixed-size worker pool with a FIFO job queue and a completion barrier.
//!
//! Workers live inside a [`std::thread::scope`], so jobs may borrow data
//! owned by the caller, including disjoint mutable slices of one buffer.
//! The pool is one-shot: [`Scheduler::wait_for_completion`] drains the queue,
//! stops every worker and joins them.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{Scope, ScopedJoinHandle};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Jobs a worker takes from the queue per lock acquisition.
pub const BATCH_SIZE: usize = 10;

/// A unit of work.
pub type Job<'scope> = Box<dyn FnOnce() + Send + 'scope>;

/// Errors reported by the job system.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("failed to spawn worker thread")]
    Spawn(#[from] std::io::Error),

    #[error("{count} job(s) panicked")]
    JobPanicked { count: usize },

    #[error("{count} worker thread(s) panicked")]
    WorkerPanicked { count: usize },
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

struct Queue<'scope> {
    jobs: VecDeque<Job<'scope>>,
    /// Cleared when no more jobs will be submitted
    running: bool,
    /// Workers that have left their loop
    finished: usize,
    /// Jobs that panicked instead of returning
    panicked: usize,
}

struct Shared<'scope> {
    queue: Mutex<Queue<'scope>>,
    /// Signalled when jobs arrive or `running` is cleared
    work_available: Condvar,
    /// Signalled when a worker exits
    worker_finished: Condvar,
}

/// Counts the worker as finished when its loop ends, even by unwinding.
struct FinishGuard<'a, 'scope> {
    shared: &'a Shared<'scope>,
}

impl Drop for FinishGuard<'_, '_> {
    fn drop(&mut self) {
        let mut queue = self.shared.queue.lock();
        queue.finished += 1;
        self.shared.worker_finished.notify_all();
    }
}

/// A pool of worker threads consuming a shared FIFO queue.
pub struct Scheduler<'scope> {
    shared: Arc<Shared<'scope>>,
    workers: Vec<ScopedJoinHandle<'scope, ()>>,
}

impl<'scope> Scheduler<'scope> {
    /// Spawn `workers` threads (at least one) inside `scope`.
    pub fn start<'env>(scope: &'scope Scope<'scope, 'env>, workers: usize) -> SchedulerResult<Self> {
        let count = workers.max(1);
        log::info!("Starting job system with {} workers", count);

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                running: true,
                finished: 0,
                panicked: 0,
            }),
            work_available: Condvar::new(),
            worker_finished: Condvar::new(),
        });

        let mut scheduler = Self {
            shared,
            workers: Vec::with_capacity(count),
        };
        for index in 0..count {
            let shared = Arc::clone(&scheduler.shared);
            let handle = std::thread::Builder::new()
                .name(format!("glint-worker-{index}"))
                .spawn_scoped(scope, move || worker_loop(&shared))?;
            scheduler.workers.push(handle);
        }
        Ok(scheduler)
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Append a job to the tail of the queue.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        let mut queue = self.shared.queue.lock();
        queue.jobs.push_back(Box::new(job));
        self.shared.work_available.notify_one();
    }

    /// Block until every submitted job has run and all workers have exited.
    ///
    /// A panicking job does not stop its worker; the remaining jobs still run
    /// and the panics are reported here.
    pub fn wait_for_completion(mut self) -> SchedulerResult<()> {
        let panicked = {
            let mut queue = self.shared.queue.lock();
            queue.running = false;
            self.shared.work_available.notify_all();
            while queue.finished < self.workers.len() {
                self.shared.worker_finished.wait(&mut queue);
            }
            queue.panicked
        };

        let count = self
            .workers
            .drain(..)
            .map(|handle| handle.join())
            .filter(Result::is_err)
            .count();
        if count > 0 {
            return Err(SchedulerError::WorkerPanicked { count });
        }
        if panicked > 0 {
            return Err(SchedulerError::JobPanicked { count: panicked });
        }
        Ok(())
    }
}

impl Drop for Scheduler<'_> {
    fn drop(&mut self) {
        // Let workers drain and exit if the barrier was never reached
        let mut queue = self.shared.queue.lock();
        queue.running = false;
        self.shared.work_available.notify_all();
    }
}

fn worker_loop(shared: &Shared<'_>) {
    let _guard = FinishGuard { shared };
    let mut batch: Vec<Job<'_>> = Vec::with_capacity(BATCH_SIZE);

    loop {
        {
            let mut queue = shared.queue.lock();
            while queue.jobs.is_empty() && queue.running {
                shared.work_available.wait(&mut queue);
            }
            if queue.jobs.is_empty() {
                return;
            }
            let take = queue.jobs.len().min(BATCH_SIZE);
            batch.extend(queue.jobs.drain(..take));
        }

        let mut panicked = 0;
        for job in batch.drain(..) {
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            log::error!("{} job(s) panicked on {}", panicked, thread_name());
            shared.queue.lock().panicked += panicked;
        }
    }
}

fn thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("worker")
        .to_string()
}
