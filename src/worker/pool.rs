use crate::numeric::RandomSource;
use crate::worker::progress::ProgressReporter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

/// Names a single unit of work in a numbered range.
/// `no` is monotone in dispatch order; workers may finish in any order, so
/// no ordering is implied between completion times of different tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub no: usize,
    pub thread_id: u16,
}

/// N-way rendezvous inside a task body. Thin wrapper over
/// `std::sync::Barrier` so call sites read in the vocabulary of the
/// specification rather than the standard library's.
pub struct Barrier {
    inner: std::sync::Barrier,
}

impl Barrier {
    pub fn new(n: usize) -> Self {
        Self {
            inner: std::sync::Barrier::new(n),
        }
    }

    /// Blocks until all `n` participants have called `wait`.
    pub fn wait(&self) {
        let _ = self.inner.wait();
    }
}

/// Outcome of a bounded/early-stop run: how many task invocations actually
/// happened, and (for the early-stop form) how many reported success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub dispatched: usize,
    pub succeeded: usize,
}

static GLOBAL_POOL: OnceLock<WorkerPool> = OnceLock::new();

/// A fixed-size set of OS threads dispatching numbered tasks from a single
/// atomic counter.
///
/// - No ordering is guaranteed between tasks; side effects into shared
///   state must be serialised by the caller, typically via [`Self::proc_mutex`].
/// - Cancellation is cooperative only: the early-stop form lets task
///   bodies already in flight finish.
pub struct WorkerPool {
    num_threads: usize,
    proc_mx: Mutex<()>,
    rngs: Vec<Mutex<RandomSource>>,
}

impl WorkerPool {
    /// Builds a pool with an explicit thread count, capped at 1 (a pool of
    /// zero threads could never make progress).
    pub fn with_threads(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let rngs = (0..num_threads)
            .map(|i| Mutex::new(RandomSource::from_seed(0xC0FF_EE00, i as u16)))
            .collect();
        Self {
            num_threads,
            proc_mx: Mutex::new(()),
            rngs,
        }
    }

    /// Sizes a pool from the host's available parallelism, as §5 requires
    /// ("an explicit worker pool with N OS-level threads created once at
    /// initialisation").
    fn from_host_parallelism() -> Self {
        let n = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self::with_threads(n)
    }

    /// Called once by `nibrary::init()`. Idempotent because the
    /// `OnceLock` itself is idempotent; calling `global()` before `init()`
    /// is also safe and bootstraps on first access.
    pub(crate) fn bootstrap_global() {
        let _ = GLOBAL_POOL.get_or_init(Self::from_host_parallelism);
    }

    /// The process-wide pool, lazily sized on first use and never resized
    /// afterwards.
    pub fn global() -> &'static WorkerPool {
        GLOBAL_POOL.get_or_init(Self::from_host_parallelism)
    }

    /// Number of worker threads this pool will use for a run whose `range`
    /// is at least this large. Never exceeds `range` itself.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// The pool's shared mutex for rare consolidation writes into shared
    /// state from inside task bodies.
    pub fn proc_mutex(&self) -> &Mutex<()> {
        &self.proc_mx
    }

    /// Exclusive access to the random source dedicated to `thread_id`. In
    /// practice this is never contended: only the worker thread currently
    /// running with that `thread_id` ever calls this during a `run`.
    pub fn rng(&self, thread_id: u16) -> std::sync::MutexGuard<'_, RandomSource> {
        self.rngs[thread_id as usize % self.rngs.len()]
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    pub(crate) fn worker_count_for(&self, range: usize) -> usize {
        self.num_threads.min(range.max(1))
    }

    /// Runs `f` once for every `no` in `0..range`, across up to
    /// `self.num_threads()` workers. No task is skipped; no ordering is
    /// guaranteed between tasks.
    pub fn run<F>(&self, range: usize, message: Option<&str>, f: F)
    where
        F: Fn(Task) + Sync,
    {
        if range == 0 {
            return;
        }
        let workers = self.worker_count_for(range);
        let counter = Arc::new(AtomicUsize::new(0));
        let reporter = message.map(|m| ProgressReporter::start(m, &counter, range, None));

        thread::scope(|scope| {
            for worker_idx in 0..workers {
                let counter = &counter;
                let f = &f;
                scope.spawn(move || {
                    let thread_id = worker_idx as u16;
                    loop {
                        let no = counter.fetch_add(1, Ordering::SeqCst);
                        if no >= range {
                            break;
                        }
                        f(Task { no, thread_id });
                    }
                });
            }
        });

        if let Some(reporter) = reporter {
            reporter.finish();
        }
    }

    /// Runs `f` (which reports success via its `bool` return) over
    /// `0..range`, stopping dispatch as soon as either the full range has
    /// been dispatched or `stop_lim` successes have been recorded. Tasks
    /// already in flight when the limit is reached always finish
    ///.
    pub fn run_until<F>(&self, range: usize, stop_lim: usize, message: Option<&str>, f: F) -> RunSummary
    where
        F: Fn(Task) -> bool + Sync,
    {
        if range == 0 || stop_lim == 0 {
            return RunSummary {
                dispatched: 0,
                succeeded: 0,
            };
        }
        let workers = self.worker_count_for(range);
        let no_counter = AtomicUsize::new(0);
        let invoked_counter = Arc::new(AtomicUsize::new(0));
        let success_counter = Arc::new(AtomicUsize::new(0));
        let reporter = message.map(|m| {
            ProgressReporter::start(m, &invoked_counter, range, Some((&success_counter, stop_lim)))
        });

        thread::scope(|scope| {
            for worker_idx in 0..workers {
                let no_counter = &no_counter;
                let invoked_counter = &invoked_counter;
                let success_counter = &success_counter;
                let f = &f;
                scope.spawn(move || {
                    let thread_id = worker_idx as u16;
                    loop {
                        if success_counter.load(Ordering::SeqCst) >= stop_lim {
                            break;
                        }
                        let no = no_counter.fetch_add(1, Ordering::SeqCst);
                        if no >= range {
                            break;
                        }
                        let _ = invoked_counter.fetch_add(1, Ordering::SeqCst);
                        if f(Task { no, thread_id }) {
                            let _ = success_counter.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        if let Some(reporter) = reporter {
            reporter.finish();
        }

        RunSummary {
            dispatched: invoked_counter.load(Ordering::SeqCst),
            succeeded: success_counter.load(Ordering::SeqCst),
        }
    }
}
