//! Parallel alpha-beta chess search over a shared transposition table.
//!
//! The engine runs many independent searchers against a single racy
//! transposition table (Lazy SMP). Workers coordinate through exactly
//! three things: the table itself, a stop flag the first finisher of an
//! iteration raises, and a shared node counter. Everything else is
//! per-worker state.

pub mod eval;
pub mod position;
pub mod search;

pub use position::{MoveKind, Position};
pub use search::{LazySmp, SearchOptions, SearchResult};
