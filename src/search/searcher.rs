use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chess::ChessMove;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::position::{MoveKind, Position};
use crate::search::tt::{Bound, Tt, TtInfo};
use crate::search::{SearchOptions, MIN_EVAL};

/// What the winning worker of an iteration publishes.
#[derive(Clone, Copy, Debug)]
pub struct RootOutcome {
    pub mv: Option<ChessMove>,
    pub eval: i32,
    pub depth: u8,
}

/// One search worker: an owned position, a handle on the shared table,
/// the shared stop flag, and a private move-shuffling generator.
///
/// Several workers run the same root concurrently. They never exchange
/// messages; the table is the only channel through which one worker's
/// results speed up another.
pub struct Searcher {
    pos: Position,
    tt: Arc<Tt>,
    stop: Arc<AtomicBool>,
    opts: SearchOptions,
    rng: SmallRng,
    nodes: u64,
}

impl Searcher {
    pub fn new(
        pos: Position,
        tt: Arc<Tt>,
        stop: Arc<AtomicBool>,
        opts: SearchOptions,
        seed: u64,
    ) -> Self {
        Self {
            pos,
            tt,
            stop,
            opts,
            rng: SmallRng::seed_from_u64(seed),
            nodes: 0,
        }
    }

    /// Leaf evals counted since the last `root_max` entry.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    #[inline]
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Probes the table at the current position, adjusting the window in
    /// place.
    ///
    /// Returns true when the probe produced a cutoff: the entry's eval
    /// has been left in `alpha` and the caller returns it directly.
    /// Otherwise `hint` receives the stored move, falling back to the
    /// entry one depth shallower for the hint alone - a shallower entry
    /// never touches the window.
    fn tt_probe(
        &self,
        hint: &mut Option<ChessMove>,
        alpha: &mut i32,
        beta: &mut i32,
        depth: u8,
    ) -> bool {
        debug_assert!(depth >= 1);
        let key = self.pos.hash_key();
        if let Some(info) = self.tt.probe(key, depth) {
            match info.bound {
                Bound::Exact => {
                    *alpha = info.eval;
                    return true;
                }
                Bound::Upper => *beta = (*beta).min(info.eval),
                Bound::Lower => *alpha = (*alpha).max(info.eval),
            }
            if *alpha >= *beta {
                // The hit emptied our window.
                *alpha = info.eval;
                return true;
            }
            *hint = info.mv;
        }
        if hint.is_none() {
            if let Some(info) = self.tt.probe(key, depth - 1) {
                *hint = info.mv;
            }
        }
        false
    }

    /// All legal moves in an order private to this worker. Each worker
    /// shuffling differently is what spreads Lazy SMP workers across
    /// different subtrees.
    fn shuffled_moves(&mut self) -> Vec<ChessMove> {
        let mut moves = self.pos.legal_moves(MoveKind::All);
        moves.shuffle(&mut self.rng);
        moves
    }

    fn promote_hint(moves: &mut [ChessMove], hint: Option<ChessMove>) {
        if let Some(hint) = hint {
            if let Some(at) = moves.iter().position(|&m| m == hint) {
                moves.swap(0, at);
            }
        }
    }

    /// Full-window quiescence: stand pat, then captures only.
    pub fn q_search(&mut self, mut alpha: i32, beta: i32) -> i32 {
        let mut q_eval = self.pos.eval();
        if q_eval < MIN_EVAL {
            // Keep the negated value representable.
            q_eval = MIN_EVAL;
        }
        self.nodes += 1;
        if !self.opts.use_qsearch {
            return q_eval;
        }

        if q_eval >= beta {
            return q_eval;
        }
        if q_eval > alpha {
            alpha = q_eval;
        }

        for capture in self.pos.legal_moves(MoveKind::Captures) {
            self.pos.make(capture);
            let inner_eval = -self.q_search(-beta, -alpha);
            self.pos.unmake();
            if self.stopped() {
                // The child may have been cut short; its value is not a
                // real bound, so it never enters the running best.
                return q_eval;
            }
            if inner_eval > q_eval {
                q_eval = inner_eval;
                if q_eval >= beta {
                    break;
                }
                if q_eval > alpha {
                    alpha = q_eval;
                }
            }
        }

        q_eval
    }

    /// Null-window quiescence; only ever answers "above or below beta".
    pub fn nw_q_search(&mut self, beta: i32) -> i32 {
        let mut q_eval = self.pos.eval();
        if q_eval < MIN_EVAL {
            q_eval = MIN_EVAL;
        }
        self.nodes += 1;
        if !self.opts.use_qsearch {
            return q_eval;
        }

        if q_eval >= beta {
            return q_eval;
        }

        for capture in self.pos.legal_moves(MoveKind::Captures) {
            self.pos.make(capture);
            let inner_eval = -self.nw_q_search(-beta + 1);
            self.pos.unmake();
            if self.stopped() {
                return q_eval;
            }
            if inner_eval > q_eval {
                q_eval = inner_eval;
                if q_eval >= beta {
                    break;
                }
            }
        }

        q_eval
    }

    /// Scout search over the window `(beta - 1, beta)`. Can only fail
    /// low or high, so it never records an exact entry.
    pub fn null_window_search(&mut self, mut beta: i32, depth: u8) -> i32 {
        let mut eval = MIN_EVAL;
        let mut hint = None;
        let mut alpha = beta - 1;
        if self.tt_probe(&mut hint, &mut alpha, &mut beta, depth) {
            return alpha;
        }

        // Seed the entry with the probed move so a fail-low store keeps
        // the old table move.
        let mut entry = TtInfo {
            eval,
            mv: hint,
            depth,
            bound: Bound::Upper,
        };
        let mut moves = self.shuffled_moves();
        Self::promote_hint(&mut moves, hint);
        for mv in moves {
            self.pos.make(mv);
            let inner_eval = if depth > 1 {
                -self.null_window_search(-beta + 1, depth - 1)
            } else {
                -self.nw_q_search(-beta + 1)
            };
            self.pos.unmake();
            if self.stopped() {
                // Someone already finished the iteration; this node's
                // result is partial, so it stays out of the table.
                return eval;
            }

            if inner_eval > eval {
                eval = inner_eval;
                entry.mv = Some(mv);
                if eval >= beta {
                    entry.bound = Bound::Lower;
                    break;
                }
            }
        }
        entry.eval = eval;
        self.tt.store(self.pos.hash_key(), entry, depth);
        eval
    }

    /// Principal-variation search: the first child gets the full window,
    /// later children are scouted with a null window and only re-searched
    /// when the scout beats alpha.
    pub fn pv_search(&mut self, mut alpha: i32, mut beta: i32, depth: u8) -> i32 {
        debug_assert!(alpha < beta);
        let mut eval = MIN_EVAL;
        let mut hint = None;
        if self.tt_probe(&mut hint, &mut alpha, &mut beta, depth) {
            return alpha;
        }

        let mut entry = TtInfo {
            eval,
            mv: hint,
            depth,
            bound: Bound::Upper,
        };
        let mut moves = self.shuffled_moves();
        Self::promote_hint(&mut moves, hint);

        let mut search_full_window = true;
        for mv in moves {
            self.pos.make(mv);
            let inner_eval = if depth == 1 {
                -self.q_search(-beta, -alpha)
            } else if search_full_window {
                search_full_window = false;
                -self.pv_search(-beta, -alpha, depth - 1)
            } else {
                let scout = -self.null_window_search(-alpha, depth - 1);
                if scout > alpha {
                    -self.pv_search(-beta, -alpha, depth - 1)
                } else {
                    scout
                }
            };
            self.pos.unmake();
            if self.stopped() {
                return eval;
            }

            if inner_eval > eval {
                eval = inner_eval;
                entry.mv = Some(mv);
                if eval >= beta {
                    entry.bound = Bound::Lower;
                    break;
                }
                if eval > alpha {
                    alpha = eval;
                    // Alpha was raised, so this is no longer an upper
                    // bound; exact unless a later child fails high.
                    entry.bound = Bound::Exact;
                }
            }
        }
        entry.eval = eval;
        self.tt.store(self.pos.hash_key(), entry, depth);
        eval
    }

    /// Plain negamax over the full window.
    pub fn nega_max(&mut self, mut alpha: i32, mut beta: i32, depth: u8) -> i32 {
        debug_assert!(alpha < beta);
        let mut eval = MIN_EVAL;
        let mut hint = None;
        if self.tt_probe(&mut hint, &mut alpha, &mut beta, depth) {
            return alpha;
        }

        let mut entry = TtInfo {
            eval,
            mv: hint,
            depth,
            bound: Bound::Upper,
        };
        let moves = self.shuffled_moves();
        // TODO: hoist the table move to the front here like the other
        // variants do.
        for mv in moves {
            self.pos.make(mv);
            let inner_eval = if depth > 1 {
                -self.nega_max(-beta, -alpha, depth - 1)
            } else {
                -self.q_search(-beta, -alpha)
            };
            self.pos.unmake();
            if self.stopped() {
                return eval;
            }

            if inner_eval > eval {
                eval = inner_eval;
                entry.mv = Some(mv);
                if eval >= beta {
                    entry.bound = Bound::Lower;
                    break;
                }
                if eval > alpha {
                    alpha = eval;
                    entry.bound = Bound::Exact;
                }
            }
        }
        entry.eval = eval;
        self.tt.store(self.pos.hash_key(), entry, depth);
        eval
    }

    /// Root loop of one worker for one iteration.
    ///
    /// Like the interior variants but with the Lazy SMP extras: the move
    /// list is shuffled per worker before the table move is promoted, the
    /// node count is flushed into the shared counter on every exit, and
    /// the first worker through the loop raises the stop flag and
    /// publishes the outcome. Late finishers keep their result to
    /// themselves.
    pub fn root_max(
        &mut self,
        mut alpha: i32,
        mut beta: i32,
        depth: u8,
        outcome: &Mutex<Option<RootOutcome>>,
        total_nodes: &AtomicU64,
    ) {
        self.nodes = 0;
        debug_assert!(depth > 0);
        let mut eval = MIN_EVAL;
        let mut hint = None;
        if self.tt_probe(&mut hint, &mut alpha, &mut beta, depth) {
            // The root was already searched to this depth; whoever wrote
            // that entry published the answer, or the driver recovers it
            // from the table.
            total_nodes.fetch_add(self.nodes, Ordering::Relaxed);
            return;
        }

        let mut moves = self.shuffled_moves();
        Self::promote_hint(&mut moves, hint);

        let mut best_move: Option<ChessMove> = None;
        let mut search_full_window = true;
        for mv in moves {
            self.pos.make(mv);
            let inner_eval = if depth == 1 {
                -self.q_search(-beta, -alpha)
            } else if !self.opts.pv_root {
                -self.nega_max(-beta, -alpha, depth - 1)
            } else if search_full_window {
                search_full_window = false;
                -self.pv_search(-beta, -alpha, depth - 1)
            } else {
                let scout = -self.null_window_search(-alpha, depth - 1);
                if scout > alpha {
                    -self.pv_search(-beta, -alpha, depth - 1)
                } else {
                    scout
                }
            };
            self.pos.unmake();
            if self.stopped() {
                total_nodes.fetch_add(self.nodes, Ordering::Relaxed);
                return;
            }

            if inner_eval > eval {
                eval = inner_eval;
                best_move = Some(mv);
                if eval >= beta {
                    break;
                }
                if eval > alpha {
                    alpha = eval;
                }
            }
        }
        self.tt.store(
            self.pos.hash_key(),
            TtInfo {
                eval,
                mv: best_move,
                depth,
                bound: Bound::Exact,
            },
            depth,
        );

        // Raising the flag tells every other worker to wind down; the
        // swap also decides who gets to publish.
        let first = !self.stop.swap(true, Ordering::SeqCst);
        if first {
            *outcome.lock() = Some(RootOutcome {
                mv: best_move,
                eval,
                depth,
            });
        }
        total_nodes.fetch_add(self.nodes, Ordering::Relaxed);
    }
}
