//! Job queue and worker threads.
//!
//! Workers pull jobs from a shared FIFO in chunks (one lock per chunk), run
//! them with a per-worker random generator and publish lock-free counters the
//! frame polls for progress.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Idle workers re-check the queue at this interval.
const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Mutex-protected FIFO with a lock-free length.
#[derive(Debug)]
pub struct JobQueue<T> {
    jobs: Mutex<VecDeque<T>>,
    len: AtomicUsize,
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            len: AtomicUsize::new(0),
        }
    }
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, job: T) {
        let mut jobs = self.lock();
        jobs.push_back(job);
        self.len.store(jobs.len(), Ordering::Release);
    }

    pub fn push_all(&self, items: impl IntoIterator<Item = T>) {
        let mut jobs = self.lock();
        jobs.extend(items);
        self.len.store(jobs.len(), Ordering::Release);
    }

    /// Push items in random order.
    pub fn push_shuffled(&self, items: Vec<T>, rng: &mut dyn RngCore) {
        let mut items = items;
        items.shuffle(rng);
        self.push_all(items);
    }

    /// Take up to `n` jobs from the front under a single lock.
    pub fn pop_chunk(&self, n: usize) -> VecDeque<T> {
        if self.is_empty() {
            return VecDeque::new();
        }

        let mut jobs = self.lock();
        let take = n.min(jobs.len());
        let chunk: VecDeque<T> = jobs.drain(..take).collect();
        self.len.store(jobs.len(), Ordering::Release);
        chunk
    }

    /// Drop all queued jobs.
    pub fn clear(&self) {
        let mut jobs = self.lock();
        jobs.clear();
        self.len.store(0, Ordering::Release);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-worker state handed to a running job.
pub struct JobContext {
    rng: StdRng,
    progress: Arc<AtomicU32>,
}

impl JobContext {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            progress: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Report progress through the current job, in [0, 1].
    pub fn set_progress(&self, progress: f32) {
        self.progress
            .store(progress.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }
}

/// A unit of work.
pub trait Job: Send {
    fn run(&mut self, ctx: &mut JobContext);
}

impl<J: Job + ?Sized> Job for Box<J> {
    fn run(&mut self, ctx: &mut JobContext) {
        (**self).run(ctx)
    }
}

/// Counters shared between a worker thread and its owner.
#[derive(Debug, Default)]
struct WorkerState {
    running: AtomicBool,
    completed: AtomicUsize,
    active: AtomicUsize,
    failed: AtomicUsize,
}

/// An OS thread draining a [`JobQueue`].
///
/// Stopping is cooperative: the thread exits after its current job.
/// Dropping a worker stops and joins it.
pub struct Worker {
    index: usize,
    state: Arc<WorkerState>,
    progress: Arc<AtomicU32>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn worker `index` with a generator seeded from `seed` and its index.
    pub fn spawn<J: Job + 'static>(
        index: usize,
        queue: Arc<JobQueue<J>>,
        chunk_size: usize,
        seed: u64,
    ) -> std::io::Result<Self> {
        let state = Arc::new(WorkerState {
            running: AtomicBool::new(true),
            ..Default::default()
        });
        let mut ctx = JobContext::new(StdRng::seed_from_u64(worker_seed(seed, index)));
        let progress = Arc::clone(&ctx.progress);

        let thread_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name(format!("umbra-worker-{index}"))
            .spawn(move || {
                log::debug!("Worker {index} started");
                run_worker(index, &queue, chunk_size.max(1), &thread_state, &mut ctx);
                log::debug!("Worker {index} stopped");
            })?;

        Ok(Self {
            index,
            state,
            progress,
            handle: Some(handle),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Jobs finished, including failed ones.
    pub fn completed_jobs(&self) -> usize {
        self.state.completed.load(Ordering::Acquire)
    }

    /// 1 while a job is running, else 0.
    pub fn active_jobs(&self) -> usize {
        self.state.active.load(Ordering::Acquire)
    }

    /// Jobs that panicked.
    pub fn failed_jobs(&self) -> usize {
        self.state.failed.load(Ordering::Acquire)
    }

    /// Progress through the current job, in [0, 1].
    pub fn job_progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Ask the thread to exit after its current job.
    pub fn stop(&self) {
        self.state.running.store(false, Ordering::Release);
    }

    /// Stop and wait for the thread to exit.
    pub fn join(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Worker {} thread panicked", self.index);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.join();
    }
}

/// Distinct, reproducible seed per worker.
fn worker_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn run_worker<J: Job>(
    index: usize,
    queue: &JobQueue<J>,
    chunk_size: usize,
    state: &WorkerState,
    ctx: &mut JobContext,
) {
    let mut chunk: VecDeque<J> = VecDeque::new();

    while state.running.load(Ordering::Acquire) {
        if chunk.is_empty() {
            chunk = queue.pop_chunk(chunk_size);
        }
        let Some(mut job) = chunk.pop_front() else {
            thread::sleep(IDLE_SLEEP);
            continue;
        };

        ctx.set_progress(0.0);
        state.active.store(1, Ordering::Release);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run(ctx)));
        if outcome.is_err() {
            log::error!("Worker {index}: job panicked");
            state.failed.fetch_add(1, Ordering::AcqRel);
        }

        state.active.store(0, Ordering::Release);
        state.completed.fetch_add(1, Ordering::AcqRel);
    }

    // Jobs taken but not started go back for other workers
    if !chunk.is_empty() {
        queue.push_all(chunk);
    }
}
