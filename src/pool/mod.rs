//! Elastic job pool with a drain-and-shutdown barrier
//!
//! A [`JobPool`] runs submitted jobs on OS-thread workers. It starts with a
//! minimum worker set and grows on demand, when a submission finds every
//! existing worker busy, up to a ceiling. [`JobPool::shutdown`] is a
//! barrier: it returns only after every job submitted before it has run to
//! completion and every worker has been joined.
//!
//! Two locks, never held at the same time: one over the worker list, one
//! over the queue/busy/shutdown group with its condition variable.
//! Submission snapshots the busy count under the queue lock and releases
//! it before touching the worker list, which is what rules out the
//! producer-grows-pool versus worker-pops-queue deadlock.

use crate::defer::defer;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// A unit of work. Owned by the queue, executed exactly once by one
/// worker, dropped afterwards.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Everything guarded by the queue lock.
struct QueueState {
    jobs: VecDeque<Job>,
    busy: usize,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<QueueState>,
    job_ready: Condvar,
}

impl Shared {
    /// Queue-lock acquisition used everywhere.
    ///
    /// Jobs run panic-isolated and nothing panics while holding the lock,
    /// so a poisoned mutex still carries consistent state; recover it
    /// instead of cascading the failure.
    fn lock_queue(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bounded-parallelism worker set over a FIFO job queue.
pub struct JobPool {
    max_workers: usize,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobPool {
    /// Creates a pool with `min_workers` threads started immediately and
    /// at most `max_workers` ever running; `None` means unbounded.
    ///
    /// The ceiling is clamped to at least one worker; a pool that can
    /// never run anything would turn [`shutdown`](Self::shutdown) into a
    /// job leak.
    pub fn new(min_workers: usize, max_workers: Option<usize>) -> Self {
        let max_workers = max_workers.unwrap_or(usize::MAX).max(1);
        let pool = Self {
            max_workers,
            shared: Arc::new(Shared {
                queue: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    busy: 0,
                    shutdown: false,
                }),
                job_ready: Condvar::new(),
            }),
            workers: Mutex::new(Vec::new()),
        };

        {
            let mut workers = pool.lock_workers();
            for _ in 0..min_workers.min(max_workers) {
                pool.start_worker(&mut workers);
            }
        }

        pool
    }

    /// Submits a job for execution.
    ///
    /// Returns `false` (dropping the job) once shutdown has started.
    /// If the submission finds every current worker busy, one more worker
    /// is started, up to the ceiling.
    pub fn submit<J>(&self, job: J) -> bool
    where
        J: FnOnce() + Send + 'static,
    {
        let busy_snapshot = {
            let mut state = self.shared.lock_queue();
            if state.shutdown {
                return false;
            }
            state.jobs.push_back(Box::new(job));
            self.shared.job_ready.notify_one();
            state.busy
        };

        // Queue lock released; now, and only now, the worker-list lock.
        let mut workers = self.lock_workers();
        if workers.len() == busy_snapshot && workers.len() < self.max_workers {
            self.start_worker(&mut workers);
        }

        true
    }

    /// Drains the queue and stops the pool.
    ///
    /// Blocks until every previously submitted job has been executed and
    /// all workers have been joined. Idempotent; also invoked on drop.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock_queue();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            self.shared.job_ready.notify_all();
        }

        let mut workers = self.lock_workers();
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("pool worker terminated abnormally");
            }
        }
    }

    /// Number of worker threads currently started.
    pub fn worker_count(&self) -> usize {
        self.lock_workers().len()
    }

    /// Number of workers currently executing a job.
    pub fn busy(&self) -> usize {
        self.shared.lock_queue().busy
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts one worker. Caller holds the worker-list lock.
    fn start_worker(&self, workers: &mut Vec<JoinHandle<()>>) {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("fcrawl-worker".to_string())
            .spawn(move || worker_routine(shared));
        match spawned {
            Ok(handle) => workers.push(handle),
            Err(e) => tracing::warn!("failed to start pool worker: {}", e),
        }
    }
}

impl Drop for JobPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The worker loop: drain the queue, then exit on shutdown or wait for
/// the next signal.
///
/// Draining before the shutdown check is what makes `shutdown` a barrier:
/// a worker woken by the shutdown broadcast still empties the queue before
/// it leaves.
fn worker_routine(shared: Arc<Shared>) {
    let mut state = shared.lock_queue();

    loop {
        while let Some(job) = state.jobs.pop_front() {
            state.busy += 1;
            drop(state);

            {
                // The busy count must drop on every exit path, a panicking
                // job included; the worker itself survives the panic.
                let _busy_release = defer(|| {
                    shared.lock_queue().busy -= 1;
                });

                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("pool job panicked");
                }
            }

            state = shared.lock_queue();
        }

        if state.shutdown {
            return;
        }

        state = shared
            .job_ready
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner);
    }
}
