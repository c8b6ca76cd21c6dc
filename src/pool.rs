// src/pool.rs
//! Fixed-size worker pool with two dispatch modes.
//!
//! Workers drain a FIFO queue of one-shot jobs first; when the queue is
//! empty and an installed task is set they run it in a tight loop (the task
//! is responsible for its own pacing, e.g. yielding while the ring is
//! empty). With neither available, workers park on a condvar. `stop` is
//! idempotent and joins every worker before returning.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;
type InstalledTask = Arc<dyn Fn() + Send + Sync + 'static>;

enum Work {
    Once(Job),
    Repeat(InstalledTask),
}

struct PoolState {
    jobs: VecDeque<Job>,
    task: Option<InstalledTask>,
}

struct Shared {
    state: Mutex<PoolState>,
    available: Condvar,
    stop: AtomicBool,
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `count` workers (at least one).
    pub fn new(count: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                jobs: VecDeque::new(),
                task: None,
            }),
            available: Condvar::new(),
            stop: AtomicBool::new(false),
        });

        let count = count.max(1);
        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            let shared = Arc::clone(&shared);
            workers.push(
                thread::Builder::new()
                    .name(format!("ingest-worker-{id}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("spawning pool worker"),
            );
        }
        debug!(workers = count, "worker pool started");

        Self {
            shared,
            workers: Mutex::new(workers),
        }
    }

    /// Pool sized to the machine's hardware parallelism.
    pub fn with_default_parallelism() -> Self {
        let count = thread::available_parallelism().map(|n| n.get()).unwrap_or(2);
        Self::new(count)
    }

    /// Queues a one-shot job, consumed FIFO by any free worker.
    pub fn enqueue(&self, job: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.shared.state.lock().expect("pool mutex poisoned");
            state.jobs.push_back(Box::new(job));
        }
        self.shared.available.notify_one();
    }

    /// Installs the repeating task every worker executes until shutdown.
    /// Replaces any previously installed task.
    pub fn install_task(&self, task: impl Fn() + Send + Sync + 'static) {
        {
            let mut state = self.shared.state.lock().expect("pool mutex poisoned");
            state.task = Some(Arc::new(task));
        }
        self.shared.available.notify_all();
    }

    /// Cooperative shutdown: flags workers, wakes parked ones, joins all.
    /// Safe to call more than once; later calls are no-ops.
    pub fn stop(&self) {
        if self.shared.stop.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.available.notify_all();
        let mut workers = self.workers.lock().expect("pool mutex poisoned");
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
        debug!("worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let work = {
            let mut state = shared.state.lock().expect("pool mutex poisoned");
            loop {
                if shared.stop.load(Ordering::Acquire) {
                    return;
                }
                if let Some(job) = state.jobs.pop_front() {
                    break Work::Once(job);
                }
                if let Some(task) = &state.task {
                    break Work::Repeat(Arc::clone(task));
                }
                state = shared
                    .available
                    .wait(state)
                    .expect("pool condvar poisoned");
            }
        };
        match work {
            Work::Once(job) => job(),
            Work::Repeat(task) => task(),
        }
    }
}
