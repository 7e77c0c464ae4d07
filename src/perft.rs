use std::time::Instant;

use crate::movegen::{generate_all, MoveList};
use crate::position::Position;

pub const PERFT_SUITE: [(&str, &str, [u64; 5]); 5] = [
    (
        "Start Position",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        [1, 20, 400, 8902, 197281], // Depths 0-4
    ),
    (
        "Kiwipete",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        [1, 48, 2039, 97862, 4085603],
    ),
    (
        "Position 3",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        [1, 14, 191, 2812, 43238],
    ),
    (
        "Position 4",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        [1, 6, 264, 9467, 422333],
    ),
    (
        "Position 5",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        [1, 44, 1486, 62379, 2103487],
    ),
];

/// Leaf count of the legal move tree below `pos`.
pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut list = MoveList::new();
    generate_all(&mut list, pos);

    let us = pos.to_move();
    let mut nodes = 0;

    for &mv in list.iter() {
        let mut guard = pos.apply_move(mv, None);
        if guard.is_attacked(guard.king(us), guard.to_move()) {
            continue;
        }
        nodes += if depth == 1 { 1 } else { perft(&mut guard, depth - 1) };
    }
    nodes
}

/// Per-root-move breakdown, for hunting movegen bugs.
pub fn split_perft(pos: &mut Position, depth: u32) -> u64 {
    let mut list = MoveList::new();
    generate_all(&mut list, pos);

    let us = pos.to_move();
    let mut total = 0;

    for &mv in list.iter() {
        let mut guard = pos.apply_move(mv, None);
        if guard.is_attacked(guard.king(us), guard.to_move()) {
            continue;
        }
        let count = perft(&mut guard, depth.saturating_sub(1));
        println!("{}: {}", mv, count);
        total += count;
    }

    println!();
    println!("total {}", total);
    total
}

/// Runs the standard suite to `depth` (capped at 4). Returns true if every
/// count matched.
pub fn run_perft_suite(depth: u32) -> bool {
    println!("--- Aether Perft Suite ---");

    let depth = depth.min(4) as usize;
    let mut total_nodes = 0;
    let mut total_time = 0;
    let mut all_passed = true;

    for (name, fen, expected) in PERFT_SUITE.iter() {
        println!("\nTesting: {}", name);
        let mut pos = match Position::from_fen(fen) {
            Ok(pos) => pos,
            Err(e) => {
                log::error!("bad suite fen {}: {}", fen, e);
                all_passed = false;
                continue;
            }
        };

        let start = Instant::now();
        let nodes = perft(&mut pos, depth as u32);
        let elapsed = start.elapsed().as_millis();

        total_nodes += nodes;
        total_time += elapsed;

        println!("Depth {}: Nodes: {} Time: {}ms", depth, nodes, elapsed);

        if nodes == expected[depth] {
            println!("RESULT: PASS");
        } else {
            println!("RESULT: FAIL (Expected {})", expected[depth]);
            all_passed = false;
            split_perft(&mut pos, depth as u32);
        }
    }

    println!("\n--- SUITE COMPLETE ---");
    println!("Total Nodes: {}", total_nodes);
    println!("Total Time:  {}ms", total_time);
    if total_time > 0 {
        println!("NPS:         {}", (total_nodes as u128 * 1000) / total_time);
    }
    all_passed
}
