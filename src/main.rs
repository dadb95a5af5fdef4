use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chess::Board;

use skein::position::Position;
use skein::search::{LazySmp, Tt};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let fen = args.next();
    let depth: u8 = match args.next() {
        Some(d) => d.parse()?,
        None => 7,
    };
    let threads: usize = match args.next() {
        Some(t) => t.parse()?,
        None => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    };

    let board = match fen.as_deref() {
        Some(fen) => Board::from_str(fen).map_err(|e| anyhow::anyhow!("bad FEN: {:?}", e))?,
        None => Board::default(),
    };

    let tt = Arc::new(Tt::new(256));
    let driver = LazySmp::new(Arc::clone(&tt), threads);

    println!("searching to depth {} with {} threads", depth, threads);
    let rows = driver.search_to_depth(&board, depth);
    for row in &rows {
        let pv = tt.extract_pv(&Position::new(board), row.depth as u8);
        let pv: Vec<String> = pv.iter().map(|m| m.to_string()).collect();
        println!(
            "depth {:2}  eval {:7}  nodes {:10}  time {:8.3}s  pv {}",
            row.depth,
            row.eval,
            row.nodes,
            row.duration,
            pv.join(" ")
        );
    }

    if let Some(last) = rows.last() {
        match last.mv {
            Some(mv) => println!("bestmove {}  eval {}", mv, last.eval),
            None => println!("no legal move"),
        }
    }
    println!(
        "table occupancy: {} of {} entries",
        tt.occupied(),
        tt.entry_count()
    );
    Ok(())
}
