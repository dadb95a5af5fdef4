pub mod driver;
pub mod searcher;
pub mod tt;

use chess::ChessMove;

pub use driver::LazySmp;
pub use searcher::{RootOutcome, Searcher};
pub use tt::{Bound, Tt, TtInfo};

/// Largest score the search ever produces. Well clear of `i32` overflow
/// so a window can be negated without wrapping.
pub const MAX_EVAL: i32 = i32::MAX / 2;
pub const MIN_EVAL: i32 = -MAX_EVAL;

/// Runtime selection of the search flavour.
#[derive(Clone, Copy, Debug)]
pub struct SearchOptions {
    /// Resolve captures at the horizon instead of trusting the static
    /// eval of a possibly mid-exchange leaf.
    pub use_qsearch: bool,
    /// Drive the root with principal-variation search; when false the
    /// root runs plain negamax children.
    pub pv_root: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            use_qsearch: true,
            pv_root: true,
        }
    }
}

/// One completed iteration of the deepening loop.
#[derive(Clone, Debug)]
pub struct SearchResult {
    pub mv: Option<ChessMove>,
    pub eval: i32,
    pub depth: u16,
    pub nodes: u64,
    pub duration: f64,
}
