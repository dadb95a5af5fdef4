use std::sync::atomic::{AtomicU64, Ordering};

use chess::{ChessMove, Piece, Square};

use crate::position::Position;
use crate::search::{MAX_EVAL, MIN_EVAL};

// Slot data layout (64 bits):
// - Eval (32 bits, signed)
// - Move (16 bits)
// - Depth (8 bits)
// - Bound (2 bits)
// - Unused (6 bits)
//
// The companion word holds `key ^ data`. A reader reconstructs the key
// from the pair, so a torn write shows up as a key mismatch and reads as
// a miss instead of corrupt data. No slot access ever blocks.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    /// The true value is at most the stored eval (search failed low).
    Upper = 0,
    /// The true value is at least the stored eval (beta cutoff).
    Lower = 1,
    /// The stored eval is the minimax value of the node.
    Exact = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtInfo {
    pub eval: i32,
    pub mv: Option<ChessMove>,
    pub depth: u8,
    pub bound: Bound,
}

impl TtInfo {
    /// Replacement rank: exact entries outrank bounds, deeper outranks
    /// shallower within the same class.
    #[inline]
    fn rank(&self) -> (bool, u8) {
        (self.bound == Bound::Exact, self.depth)
    }

    fn pack(&self) -> u64 {
        let eval_part = (self.eval as u32) as u64;
        let move_part = self.mv.map(encode_move).unwrap_or(0) as u64;
        let depth_part = self.depth as u64;
        let bound_part = self.bound as u64;
        (bound_part << 56) | (depth_part << 48) | (move_part << 32) | eval_part
    }

    fn unpack(data: u64) -> Self {
        let eval = (data & 0xFFFF_FFFF) as u32 as i32;
        let move_part = ((data >> 32) & 0xFFFF) as u16;
        let depth = ((data >> 48) & 0xFF) as u8;
        let bound = match (data >> 56) & 0x3 {
            1 => Bound::Lower,
            2 => Bound::Exact,
            _ => Bound::Upper,
        };
        Self {
            eval,
            mv: if move_part != 0 {
                Some(decode_move(move_part))
            } else {
                None
            },
            depth,
            bound,
        }
    }
}

fn encode_move(m: ChessMove) -> u16 {
    let src = m.get_source().to_index() as u16;
    let dst = m.get_dest().to_index() as u16;
    let promo = match m.get_promotion() {
        Some(Piece::Knight) => 1,
        Some(Piece::Bishop) => 2,
        Some(Piece::Rook) => 3,
        Some(Piece::Queen) => 4,
        _ => 0,
    };
    // A real move never encodes to 0: source and destination differ, so
    // 0 is free to mean "no move".
    (promo << 12) | (dst << 6) | src
}

fn decode_move(val: u16) -> ChessMove {
    let src = unsafe {
        // SAFETY: val & 0x3F is always 0-63, valid for Square
        Square::new((val & 0x3F) as u8)
    };
    let dst = unsafe {
        // SAFETY: (val >> 6) & 0x3F is always 0-63, valid for Square
        Square::new(((val >> 6) & 0x3F) as u8)
    };
    let promo = match (val >> 12) & 0x7 {
        1 => Some(Piece::Knight),
        2 => Some(Piece::Bishop),
        3 => Some(Piece::Rook),
        4 => Some(Piece::Queen),
        _ => None,
    };
    ChessMove::new(src, dst, promo)
}

struct Slot {
    check: AtomicU64,
    data: AtomicU64,
}

impl Slot {
    const fn empty() -> Self {
        Self {
            check: AtomicU64::new(0),
            data: AtomicU64::new(0),
        }
    }

    fn read(&self) -> Option<(u64, TtInfo)> {
        let check = self.check.load(Ordering::Relaxed);
        let data = self.data.load(Ordering::Relaxed);
        if check == 0 && data == 0 {
            return None;
        }
        Some((check ^ data, TtInfo::unpack(data)))
    }

    fn write(&self, key: u64, info: TtInfo) {
        let data = info.pack();
        self.check.store(key ^ data, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }

    fn wipe(&self) {
        self.check.store(0, Ordering::Relaxed);
        self.data.store(0, Ordering::Relaxed);
    }
}

const SLOTS_PER_BUCKET: usize = 4;

/// One cache line worth of slots; the unit of addressing.
#[repr(align(64))]
struct Bucket {
    slots: [Slot; SLOTS_PER_BUCKET],
}

impl Bucket {
    const fn empty() -> Self {
        Self {
            slots: [
                Slot::empty(),
                Slot::empty(),
                Slot::empty(),
                Slot::empty(),
            ],
        }
    }
}

/// Fixed-size, depth-keyed transposition table shared by every worker.
///
/// A position searched to depth `d` lives in bucket `(key + d) & mask`,
/// so the same position at two depths occupies two buckets and a probe
/// only ever sees exact-depth matches. Reads and writes are relaxed
/// atomics with no locking; the table is a heuristic cache and a lost or
/// torn write costs speed, never correctness.
pub struct Tt {
    buckets: Box<[Bucket]>,
    mask: u64,
}

impl Tt {
    /// Table of roughly `size_mb` megabytes, rounded down to a
    /// power-of-two bucket count so indexing is a mask.
    pub fn new(size_mb: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let mut num_buckets = (bytes / std::mem::size_of::<Bucket>()).next_power_of_two();
        if num_buckets * std::mem::size_of::<Bucket>() > bytes {
            num_buckets /= 2;
        }
        let num_buckets = num_buckets.max(1);
        let mut buckets = Vec::with_capacity(num_buckets);
        for _ in 0..num_buckets {
            buckets.push(Bucket::empty());
        }
        Self {
            buckets: buckets.into_boxed_slice(),
            mask: (num_buckets - 1) as u64,
        }
    }

    #[inline]
    fn index(&self, key: u64, depth: u8) -> usize {
        (key.wrapping_add(depth as u64) & self.mask) as usize
    }

    /// Looks up the entry stored for `(key, depth)`, if any.
    pub fn probe(&self, key: u64, depth: u8) -> Option<TtInfo> {
        let bucket = &self.buckets[self.index(key, depth)];
        for slot in &bucket.slots {
            if let Some((slot_key, info)) = slot.read() {
                if slot_key == key {
                    debug_assert_eq!(info.depth, depth);
                    return Some(info);
                }
            }
        }
        None
    }

    /// Inserts `(key, info)` into the bucket for `(key, depth)`.
    ///
    /// An existing entry for the same key is overwritten in place.
    /// Otherwise the new entry bubbles down the bucket, displacing each
    /// slot it strictly outranks; the displaced entry continues down and
    /// whatever is left in hand after the last slot is dropped. Higher
    /// ranked entries therefore collect toward the front of the bucket.
    pub fn store(&self, key: u64, info: TtInfo, depth: u8) {
        debug_assert_eq!(info.depth, depth);
        debug_assert!((MIN_EVAL..=MAX_EVAL).contains(&info.eval));
        let bucket = &self.buckets[self.index(key, depth)];

        for slot in &bucket.slots {
            if let Some((slot_key, _)) = slot.read() {
                if slot_key == key {
                    slot.write(key, info);
                    return;
                }
            }
        }

        let mut pending_key = key;
        let mut pending = info;
        for slot in &bucket.slots {
            match slot.read() {
                None => {
                    slot.write(pending_key, pending);
                    return;
                }
                Some((slot_key, slot_info)) => {
                    if slot_info.rank() < pending.rank() {
                        slot.write(pending_key, pending);
                        pending_key = slot_key;
                        pending = slot_info;
                    }
                }
            }
        }
    }

    /// Recovers the principal variation by walking stored moves at
    /// decreasing depth from `pos`. Stops at depth zero, on a miss, or
    /// when a stored move is not legal in the reconstructed position
    /// (a colliding or torn entry).
    pub fn extract_pv(&self, pos: &Position, depth: u8) -> Vec<ChessMove> {
        let mut walk = pos.clone();
        let mut line = Vec::with_capacity(depth as usize);
        let mut d = depth;
        while d > 0 {
            let Some(info) = self.probe(walk.hash_key(), d) else {
                break;
            };
            let Some(mv) = info.mv else {
                break;
            };
            if !walk.is_legal(mv) {
                break;
            }
            line.push(mv);
            walk.make(mv);
            d -= 1;
        }
        line
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total slot capacity of the table.
    pub fn entry_count(&self) -> usize {
        self.buckets.len() * SLOTS_PER_BUCKET
    }

    /// Number of non-empty slots, for occupancy reporting.
    pub fn occupied(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|b| b.slots.iter())
            .filter(|s| s.read().is_some())
            .count()
    }

    pub fn clear(&self) {
        for bucket in self.buckets.iter() {
            for slot in &bucket.slots {
                slot.wipe();
            }
        }
    }
}
