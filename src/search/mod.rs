//! Lazy-SMP search. Every worker runs its own iterative deepening over a
//! private copy of the position; the only thing they share is the
//! transposition table, the limiter and the stop token.

mod pvs;
mod qsearch;
mod report;
mod root;
mod stack;

pub use report::format_score;
pub use stack::{SearchData, SearchStackEntry, ThreadData};

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::error::SearchError;
use crate::history::HistoryTable;
use crate::parameters::SearchParameters;
use crate::pawn::PawnCache;
use crate::position::Position;
use crate::time::{Clock, InfiniteLimiter, Limiter, SystemClock};
use crate::tt::{TranspositionTable, DEFAULT_HASH_MB};
use crate::types::*;

pub const DEFAULT_THREAD_COUNT: usize = 1;
pub const MAX_THREADS: usize = 2048;

const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

// --- CANCELLATION ---

/// Shared stop flag. Polled by every worker; once set, searches unwind
/// through sentinel scores.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

#[derive(Clone, Debug, Default)]
pub struct BenchData {
    pub search: SearchData,
    /// Seconds.
    pub time: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchFlag {
    Idle,
    Searching,
    Quit,
}

/// What thread 0 settled on at the end of a search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub score: Score,
    pub depth: i32,
    pub nodes: u64,
}

// --- SHARED STATE ---

/// Inputs of one search, shared read-only by every worker.
pub(crate) struct SearchJob {
    pub tt: Arc<TranspositionTable>,
    pub params: Arc<SearchParameters>,
    pub limiter: Arc<dyn Limiter>,
    pub clock: Arc<dyn Clock>,
    pub start_time: f64,
    pub token: CancellationToken,
    /// One counter per worker, published for the reporter.
    pub nodes: Box<[AtomicU64]>,
    pub report: bool,
}

impl SearchJob {
    pub fn total_nodes(&self) -> u64 {
        self.nodes.iter().map(|counter| counter.load(Ordering::Relaxed)).sum()
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.now() - self.start_time
    }
}

struct Control {
    flag: SearchFlag,
    generation: u64,
    outcome: Option<SearchOutcome>,
}

struct Shared {
    /// Guards the flag. Thread 0 holds it while printing the final result.
    control: Mutex<Control>,
    start: Condvar,
    stop: Condvar,
    running: AtomicUsize,
    job: Mutex<Option<Arc<SearchJob>>>,
    token: CancellationToken,
}

struct WorkerHandle {
    data: Arc<Mutex<ThreadData>>,
    thread: Option<JoinHandle<()>>,
}

// --- WORKER VIEW ---

/// Borrowed view of one thread's state for the duration of a search pass.
/// The position is passed separately so moves can be applied through a
/// guard while the rest stays reachable.
pub(crate) struct Worker<'a> {
    pub id: usize,
    pub max_depth: i32,
    pub data: &'a mut SearchData,
    pub stack: &'a mut [SearchStackEntry],
    pub history: &'a mut HistoryTable,
    pub pawn_cache: &'a mut PawnCache,
    pub job: &'a SearchJob,
}

impl<'a> Worker<'a> {
    pub fn split(td: &'a mut ThreadData, job: &'a SearchJob) -> (Self, &'a mut Position) {
        let ThreadData { id, max_depth, search, stack, history, pawn_cache, pos } = td;
        let worker = Worker {
            id: *id,
            max_depth: *max_depth,
            data: search,
            stack: stack.as_mut_slice(),
            history,
            pawn_cache,
            job,
        };
        (worker, pos)
    }

    /// Polls the token, then the limiter. A limiter stop is broadcast to
    /// every other worker through the token.
    #[inline(always)]
    pub fn should_stop(&self, allow_soft_timeout: bool) -> bool {
        if self.job.token.is_cancelled() {
            return true;
        }
        let stop = self.job.limiter.stop(&*self.data, allow_soft_timeout);
        if stop {
            self.job.token.cancel();
        }
        stop
    }

    #[inline(always)]
    pub fn stopped(&self) -> bool {
        self.job.token.is_cancelled()
    }

    #[inline(always)]
    pub fn count_node(&mut self) {
        self.data.nodes += 1;
        if let Some(counter) = self.job.nodes.get(self.id) {
            counter.store(self.data.nodes, Ordering::Relaxed);
        }
    }
}

// --- SEARCHER ---

/// Owns the worker pool and the shared transposition table.
pub struct Searcher {
    shared: Arc<Shared>,
    workers: Vec<WorkerHandle>,
    tt: Arc<TranspositionTable>,
    params: Arc<SearchParameters>,
    clock: Arc<dyn Clock>,
}

impl Searcher {
    pub fn new() -> Result<Self, SearchError> {
        Self::with_config(DEFAULT_HASH_MB, DEFAULT_THREAD_COUNT, SearchParameters::default(), Arc::new(SystemClock::new()))
    }

    pub fn with_config(
        hash_mb: usize,
        threads: usize,
        mut params: SearchParameters,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SearchError> {
        params.validate()?;
        params.recalculate_tables();

        let shared = Arc::new(Shared {
            control: Mutex::new(Control { flag: SearchFlag::Idle, generation: 0, outcome: None }),
            start: Condvar::new(),
            stop: Condvar::new(),
            running: AtomicUsize::new(0),
            job: Mutex::new(None),
            token: CancellationToken::new(),
        });

        let mut searcher = Self {
            shared,
            workers: Vec::new(),
            tt: Arc::new(TranspositionTable::new(hash_mb)),
            params: Arc::new(params),
            clock,
        };
        searcher.set_threads(threads)?;
        Ok(searcher)
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    pub fn tt(&self) -> &Arc<TranspositionTable> {
        &self.tt
    }

    pub fn params(&self) -> &SearchParameters {
        &self.params
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Takes effect from the next search. Invalid values leave the current
    /// parameters in place.
    pub fn set_params(&mut self, mut params: SearchParameters) -> Result<(), SearchError> {
        params.validate()?;
        params.recalculate_tables();
        self.params = Arc::new(params);
        Ok(())
    }

    /// Wakes every worker on `pos`. Returns once the pool is running; the
    /// result is printed by thread 0 and kept in `last_outcome`.
    pub fn start_search(
        &mut self,
        pos: &Position,
        max_depth: i32,
        limiter: Option<Box<dyn Limiter>>,
    ) -> Result<(), SearchError> {
        let Some(limiter) = limiter else {
            log::error!("search started without a limiter");
            return Err(SearchError::MissingLimiter);
        };
        if self.workers.is_empty() {
            log::error!("search started with an empty thread pool");
            return Err(SearchError::InvalidThreadCount);
        }

        if self.shared.running.load(Ordering::Acquire) > 0 {
            self.stop();
        }

        for worker in &self.workers {
            worker.data.lock().prepare(pos, max_depth);
        }

        let job = SearchJob {
            tt: self.tt.clone(),
            params: self.params.clone(),
            limiter: Arc::from(limiter),
            clock: self.clock.clone(),
            start_time: self.clock.now(),
            token: self.shared.token.clone(),
            nodes: (0..self.workers.len()).map(|_| AtomicU64::new(0)).collect(),
            report: true,
        };
        *self.shared.job.lock() = Some(Arc::new(job));

        self.shared.token.reset();
        self.shared.running.store(self.workers.len(), Ordering::Release);

        log::info!("starting search: {} threads, max depth {}", self.workers.len(), max_depth);

        let mut control = self.shared.control.lock();
        control.flag = SearchFlag::Searching;
        control.generation += 1;
        control.outcome = None;
        self.shared.start.notify_all();
        Ok(())
    }

    /// Cancels the running search and blocks until every worker has
    /// finished its pass.
    pub fn stop(&self) {
        let mut control = self.shared.control.lock();
        self.shared.token.cancel();
        if control.flag == SearchFlag::Searching {
            control.flag = SearchFlag::Idle;
        }
        while self.shared.running.load(Ordering::Acquire) > 0 {
            self.shared.stop.wait(&mut control);
        }
    }

    /// Blocks until the running search finishes on its own.
    pub fn wait(&self) {
        let mut control = self.shared.control.lock();
        while self.shared.running.load(Ordering::Acquire) > 0 {
            self.shared.stop.wait(&mut control);
        }
    }

    pub fn searching(&self) -> bool {
        self.shared.control.lock().flag == SearchFlag::Searching
    }

    pub fn last_outcome(&self) -> Option<SearchOutcome> {
        self.shared.control.lock().outcome.clone()
    }

    /// Node counts of the latest search, one per worker.
    pub fn thread_nodes(&self) -> Vec<u64> {
        match self.shared.job.lock().as_ref() {
            Some(job) => job.nodes.iter().map(|counter| counter.load(Ordering::Relaxed)).collect(),
            None => Vec::new(),
        }
    }

    /// Rebuilds the pool with `threads` fresh workers. The old pool is
    /// fully drained first.
    pub fn set_threads(&mut self, threads: usize) -> Result<(), SearchError> {
        if threads == 0 {
            return Err(SearchError::InvalidThreadCount);
        }
        let threads = if threads > MAX_THREADS {
            log::warn!("clamping thread count {} to {}", threads, MAX_THREADS);
            MAX_THREADS
        } else {
            threads
        };
        if threads == self.workers.len() {
            return Ok(());
        }

        self.stop();
        self.join_workers();

        let generation = self.shared.control.lock().generation;
        for id in 0..threads {
            match spawn_worker(self.shared.clone(), id, generation) {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    log::error!("failed to spawn search thread {}: {}", id, e);
                    self.join_workers();
                    return Err(SearchError::Io(e));
                }
            }
        }

        log::info!("search pool resized to {} threads", threads);
        Ok(())
    }

    fn join_workers(&mut self) {
        {
            let mut control = self.shared.control.lock();
            control.flag = SearchFlag::Quit;
            self.shared.start.notify_all();
        }
        for worker in self.workers.iter_mut() {
            if let Some(handle) = worker.thread.take() {
                if handle.join().is_err() {
                    log::error!("search thread panicked");
                }
            }
        }
        self.workers.clear();
        self.shared.control.lock().flag = SearchFlag::Idle;
    }

    /// Reallocates the table. Every entry is lost.
    pub fn set_hash_size(&mut self, mb: usize) {
        self.stop();
        self.tt = Arc::new(TranspositionTable::new(mb));
    }

    pub fn clear_hash(&self) {
        self.stop();
        self.tt.clear();
    }

    pub fn new_game(&mut self) {
        self.stop();
        self.tt.clear();
        for worker in &self.workers {
            worker.data.lock().clear();
        }
        log::debug!("new game: table and histories cleared");
    }

    /// Fixed-depth search on the calling thread with thread 0's state.
    /// Prints nothing.
    pub fn run_bench(&mut self, pos: &Position, depth: i32) -> Result<BenchData, SearchError> {
        self.stop();
        let Some(worker) = self.workers.first() else {
            return Err(SearchError::InvalidThreadCount);
        };

        let job = SearchJob {
            tt: self.tt.clone(),
            params: self.params.clone(),
            limiter: Arc::new(InfiniteLimiter),
            clock: self.clock.clone(),
            start_time: self.clock.now(),
            token: CancellationToken::new(),
            nodes: Box::new([AtomicU64::new(0)]),
            report: false,
        };

        let mut td = worker.data.lock();
        td.prepare(pos, depth);

        let (mut search, pos) = Worker::split(&mut td, &job);
        search.search_root(pos);

        let time = job.elapsed();
        self.tt.age();
        Ok(BenchData { search: td.search.clone(), time })
    }
}

impl Drop for Searcher {
    fn drop(&mut self) {
        self.stop();
        self.join_workers();
    }
}

// --- WORKER THREADS ---

fn spawn_worker(shared: Arc<Shared>, id: usize, generation: u64) -> std::io::Result<WorkerHandle> {
    let data = Arc::new(Mutex::new(ThreadData::new(id)));
    let thread_data = data.clone();

    let handle = thread::Builder::new()
        .name(format!("search_worker_{}", id))
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || worker_loop(shared, thread_data, generation))?;

    Ok(WorkerHandle { data, thread: Some(handle) })
}

fn worker_loop(shared: Arc<Shared>, data: Arc<Mutex<ThreadData>>, mut served: u64) {
    loop {
        {
            let mut control = shared.control.lock();
            while control.flag != SearchFlag::Quit && control.generation == served {
                shared.start.wait(&mut control);
            }
            if control.flag == SearchFlag::Quit {
                return;
            }
            served = control.generation;
        }

        let job = shared.job.lock().clone();
        let mut main_thread = false;

        if let Some(job) = job {
            let mut td = data.lock();
            main_thread = td.id == 0;

            let (mut worker, pos) = Worker::split(&mut td, &job);
            let result = worker.search_root(pos);

            if main_thread {
                let mut control = shared.control.lock();
                worker.publish(pos, &result);
                control.outcome = Some(SearchOutcome {
                    best_move: result.best,
                    score: result.score,
                    depth: result.depth,
                    nodes: job.total_nodes(),
                });
                job.tt.age();
                job.token.cancel();
                control.flag = SearchFlag::Idle;
            }

            td.history.age();
        }

        let _control = shared.control.lock();
        shared.running.fetch_sub(1, Ordering::AcqRel);
        shared.stop.notify_all();
        if main_thread {
            log::debug!("search pass finished");
        }
    }
}
