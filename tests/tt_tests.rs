use chess::{ChessMove, Square};
use skein::position::Position;
use skein::search::{Bound, Tt, TtInfo};

fn info(eval: i32, mv: Option<ChessMove>, depth: u8, bound: Bound) -> TtInfo {
    TtInfo {
        eval,
        mv,
        depth,
        bound,
    }
}

#[test]
fn store_then_probe_round_trips() {
    let tt = Tt::new(1);
    let entry = info(
        42,
        Some(ChessMove::new(Square::E2, Square::E4, None)),
        5,
        Bound::Exact,
    );
    tt.store(0xDEAD_BEEF_0123_4567, entry, 5);
    let got = tt.probe(0xDEAD_BEEF_0123_4567, 5).expect("entry should be found");
    assert_eq!(got, entry);
}

#[test]
fn different_depths_live_in_different_buckets() {
    let tt = Tt::new(1);
    let key = 0x1234_5678_9ABC_DEF0;
    tt.store(key, info(10, None, 3, Bound::Exact), 3);
    assert!(tt.probe(key, 4).is_none());
    assert!(tt.probe(key, 2).is_none());
    assert_eq!(tt.probe(key, 3).unwrap().eval, 10);

    // Both depths can coexist; neither hides the other.
    tt.store(key, info(-7, None, 4, Bound::Upper), 4);
    assert_eq!(tt.probe(key, 3).unwrap().eval, 10);
    assert_eq!(tt.probe(key, 4).unwrap().eval, -7);
}

#[test]
fn same_key_overwrites_in_place() {
    let tt = Tt::new(1);
    let key = 0xABCD_EF01_2345_6789;
    tt.store(key, info(10, None, 6, Bound::Upper), 6);
    let before = tt.occupied();
    tt.store(
        key,
        info(99, Some(ChessMove::new(Square::D2, Square::D4, None)), 6, Bound::Exact),
        6,
    );
    assert_eq!(tt.occupied(), before);
    let got = tt.probe(key, 6).unwrap();
    assert_eq!(got.eval, 99);
    assert_eq!(got.bound, Bound::Exact);
}

/// Distinct `(key, depth)` pairs that all index the same bucket: the key
/// compensates for the depth so `key + depth` stays congruent.
fn colliding_entries(tt: &Tt, base: u64, depths: &[u8]) -> Vec<(u64, u8)> {
    let spacing = tt.bucket_count() as u64;
    depths
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            let key = base
                .wrapping_add(i as u64 * spacing)
                .wrapping_sub(d as u64);
            (key, d)
        })
        .collect()
}

#[test]
fn bucket_keeps_the_four_highest_ranked_entries() {
    let depths: Vec<u8> = (1..=8).collect();

    // Ascending rank: each newcomer displaces the weakest.
    let tt = Tt::new(1);
    let entries = colliding_entries(&tt, 0x4242, &depths);
    for &(key, d) in &entries {
        tt.store(key, info(d as i32, None, d, Bound::Upper), d);
    }
    for (i, &(key, d)) in entries.iter().enumerate() {
        let found = tt.probe(key, d).is_some();
        assert_eq!(found, i >= 4, "entry {} of ascending fill", i);
    }

    // Descending rank: the first four deep entries survive, the shallow
    // tail never gets a slot.
    let tt = Tt::new(1);
    let entries = colliding_entries(&tt, 0x4242, &depths);
    for &(key, d) in entries.iter().rev() {
        tt.store(key, info(d as i32, None, d, Bound::Upper), d);
    }
    for (i, &(key, d)) in entries.iter().enumerate() {
        let found = tt.probe(key, d).is_some();
        assert_eq!(found, i >= 4, "entry {} of descending fill", i);
    }
}

#[test]
fn exact_entry_displaces_deeper_bounds() {
    let tt = Tt::new(1);
    let entries = colliding_entries(&tt, 0x1000, &[50, 50, 50, 50, 1]);

    // Fill one bucket with deep non-exact entries.
    for &(key, d) in entries.iter().take(4) {
        tt.store(key, info(0, None, d, Bound::Lower), d);
    }
    // A shallow exact entry must still claim a slot.
    let (exact_key, exact_depth) = entries[4];
    tt.store(exact_key, info(123, None, exact_depth, Bound::Exact), exact_depth);
    assert_eq!(tt.probe(exact_key, exact_depth).unwrap().eval, 123);
}

#[test]
fn clear_empties_the_table() {
    let tt = Tt::new(1);
    tt.store(0x77, info(5, None, 2, Bound::Exact), 2);
    assert_eq!(tt.occupied(), 1);
    tt.clear();
    assert_eq!(tt.occupied(), 0);
    assert!(tt.probe(0x77, 2).is_none());
}

#[test]
fn extract_pv_walks_decreasing_depths() {
    let tt = Tt::new(1);
    let mut pos = Position::startpos();

    let line = [
        ChessMove::new(Square::E2, Square::E4, None),
        ChessMove::new(Square::E7, Square::E5, None),
        ChessMove::new(Square::G1, Square::F3, None),
    ];
    for (i, &mv) in line.iter().enumerate() {
        let depth = (line.len() - i) as u8;
        tt.store(pos.hash_key(), info(0, Some(mv), depth, Bound::Exact), depth);
        pos.make(mv);
    }

    let pv = tt.extract_pv(&Position::startpos(), 3);
    assert_eq!(pv, line);

    // The line was stored against depths 3/2/1 along the walk, so a
    // depth-1 request from the root misses outright.
    let pv = tt.extract_pv(&Position::startpos(), 1);
    assert!(pv.is_empty());
}

#[test]
fn extract_pv_rejects_moves_that_are_not_legal() {
    let tt = Tt::new(1);
    let pos = Position::startpos();
    // A move that is never legal from the start position.
    let bogus = ChessMove::new(Square::A1, Square::H8, None);
    tt.store(pos.hash_key(), info(0, Some(bogus), 2, Bound::Exact), 2);
    assert!(tt.extract_pv(&pos, 2).is_empty());
}
