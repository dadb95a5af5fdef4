use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chess::Board;
use parking_lot::Mutex;
use rand::Rng;

use crate::position::Position;
use crate::search::searcher::{RootOutcome, Searcher};
use crate::search::tt::Tt;
use crate::search::{SearchOptions, SearchResult, MAX_EVAL, MIN_EVAL};

/// Iterative-deepening driver running N independent searchers against
/// one shared table.
///
/// Per depth it resets the stop flag, hands every worker its own clone
/// of the board, and waits for the workers to race each other; the
/// first one through the root loop publishes the iteration's outcome.
/// The table is carried across depths and across calls, so earlier
/// iterations seed later ones.
pub struct LazySmp {
    tt: Arc<Tt>,
    pub threads: usize,
    pub options: SearchOptions,
    seed: u64,
}

impl LazySmp {
    pub fn new(tt: Arc<Tt>, threads: usize) -> Self {
        Self {
            tt,
            threads: threads.max(1),
            options: SearchOptions::default(),
            seed: rand::thread_rng().gen(),
        }
    }

    /// Fixes the base seed workers derive their shuffle order from.
    /// With a single thread this makes the whole search reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn tt(&self) -> &Arc<Tt> {
        &self.tt
    }

    /// Searches every depth from 1 to `up_to_depth`, returning one
    /// result row per completed iteration.
    pub fn search_to_depth(&self, board: &Board, up_to_depth: u8) -> Vec<SearchResult> {
        debug_assert!(up_to_depth >= 1);
        let mut rows = Vec::with_capacity(up_to_depth as usize);
        let mut carried: Option<RootOutcome> = None;
        let stop = Arc::new(AtomicBool::new(false));

        for depth in 1..=up_to_depth {
            stop.store(false, Ordering::Relaxed);
            let node_count = Arc::new(AtomicU64::new(0));
            let outcome: Arc<Mutex<Option<RootOutcome>>> = Arc::new(Mutex::new(None));
            let start = Instant::now();

            let mut handles = Vec::with_capacity(self.threads);
            for id in 0..self.threads {
                let tt = Arc::clone(&self.tt);
                let stop = Arc::clone(&stop);
                let node_count = Arc::clone(&node_count);
                let outcome = Arc::clone(&outcome);
                let pos = Position::new(*board);
                let opts = self.options;
                let seed = worker_seed(self.seed, id);
                handles.push(thread::spawn(move || {
                    let mut searcher = Searcher::new(pos, tt, stop, opts, seed);
                    searcher.root_max(MIN_EVAL, MAX_EVAL, depth, &outcome, &node_count);
                }));
            }
            for handle in handles {
                handle.join().expect("search worker panicked");
            }

            let duration = start.elapsed().as_secs_f64();
            // When every worker hit a root cutoff (the position was
            // already searched to this depth), the answer lives in the
            // table instead of the outcome slot.
            let published = outcome
                .lock()
                .take()
                .or_else(|| self.recover_from_table(board, depth))
                .or(carried);
            carried = published;

            let (mv, eval) = match published {
                Some(o) => (o.mv, o.eval),
                None => (None, 0),
            };
            rows.push(SearchResult {
                mv,
                eval,
                depth: depth as u16,
                nodes: node_count.load(Ordering::Relaxed),
                duration,
            });
        }
        rows
    }

    /// Convenience wrapper returning only the deepest iteration's row.
    pub fn search(&self, board: &Board, depth: u8) -> SearchResult {
        self.search_to_depth(board, depth)
            .pop()
            .unwrap_or(SearchResult {
                mv: None,
                eval: 0,
                depth: 0,
                nodes: 0,
                duration: 0.0,
            })
    }

    fn recover_from_table(&self, board: &Board, depth: u8) -> Option<RootOutcome> {
        self.tt.probe(board.get_hash(), depth).map(|info| RootOutcome {
            mv: info.mv,
            eval: info.eval,
            depth,
        })
    }
}

/// Splitmix of the worker index folded into the base seed. Every worker
/// must shuffle from its own stream; a shared generator would serialize
/// the one thing Lazy SMP relies on being independent.
fn worker_seed(base: u64, id: usize) -> u64 {
    let mut z = (id as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    base ^ (z ^ (z >> 31))
}
