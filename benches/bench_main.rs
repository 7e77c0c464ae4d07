use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use aether_search::movegen::{generate_all, MoveList};
use aether_search::position::START_FEN;
use aether_search::tt::{Bound, TranspositionTable};
use aether_search::{init_tables, ManualClock, Position, SearchParameters, Searcher};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_movegen(c: &mut Criterion) {
    init_tables();
    let mut group = c.benchmark_group("movegen");
    let pos = Position::from_fen(KIWIPETE).expect("valid fen");

    group.bench_function("generate_all_kiwipete", |b| {
        b.iter(|| {
            let mut list = MoveList::new();
            generate_all(&mut list, black_box(&pos));
            list.len()
        })
    });
    group.finish();
}

fn bench_make_move(c: &mut Criterion) {
    init_tables();
    let mut group = c.benchmark_group("make_move");
    let mut pos = Position::from_fen(START_FEN).expect("valid fen");
    let mv = pos.move_from_uci("e2e4").expect("legal");

    group.bench_function("make_unmake_startpos", |b| {
        b.iter(|| {
            let guard = pos.apply_move(black_box(mv), None);
            guard.key()
        })
    });
    group.finish();
}

fn bench_tt(c: &mut Criterion) {
    init_tables();
    let mut group = c.benchmark_group("tt");
    let tt = TranspositionTable::new(16);
    let key = Position::startpos().key();

    group.bench_function("tt_probe_empty", |b| b.iter(|| tt.probe(black_box(key), 5, 0, -100, 100)));

    tt.put(key, 100, None, 5, 0, Bound::Exact);
    group.bench_function("tt_probe_hit", |b| b.iter(|| tt.probe(black_box(key), 5, 0, -100, 100)));
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    init_tables();
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    let mut searcher = Searcher::with_config(16, 1, SearchParameters::default(), Arc::new(ManualClock::new()))
        .expect("pool starts");
    let pos = Position::from_fen(KIWIPETE).expect("valid fen");

    group.bench_function("kiwipete_depth_6", |b| {
        b.iter(|| {
            searcher.new_game();
            searcher.run_bench(black_box(&pos), 6).map(|d| d.search.nodes)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_movegen, bench_make_move, bench_tt, bench_search);
criterion_main!(benches);
