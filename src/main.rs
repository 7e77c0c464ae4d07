use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use log::LevelFilter;

use aether_search::logging::{init_logging, DEFAULT_LOG_FILE};
use aether_search::perft::{run_perft_suite, split_perft};
use aether_search::position::START_FEN;
use aether_search::search::DEFAULT_THREAD_COUNT;
use aether_search::time::DEFAULT_MOVES_TO_GO;
use aether_search::tt::DEFAULT_HASH_MB;
use aether_search::types::{MAX_DEPTH, WHITE};
use aether_search::{
    init_tables, Clock, InfiniteLimiter, Limiter, MoveTimeLimiter, NodeLimiter, Position, SearchParameters, Searcher,
    SystemClock, TimeManager,
};

const DEFAULT_BENCH_DEPTH: i32 = 10;

const BENCH_FENS: [&str; 8] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1",
    "8/8/1k6/8/2P5/8/5K2/8 w - - 0 1",
];

fn main() -> ExitCode {
    init_logging(DEFAULT_LOG_FILE, LevelFilter::Info);
    init_tables();

    let args: Vec<String> = env::args().collect();
    let result = match args.get(1).map(String::as_str) {
        Some("bench") => run_bench(&args[2..]),
        Some("perft") => run_perft(&args[2..]),
        Some("search") => run_search(&args[2..]),
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  aether-search bench [depth]");
    println!("  aether-search perft <depth> [fen]");
    println!("  aether-search perft suite [depth]");
    println!(
        "  aether-search search [--depth D] [--nodes N] [--movetime MS] [--wtime MS --winc MS --movestogo N] \
         [--threads T] [--hash MB] [--config file.json] [fen]"
    );
}

fn parse<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("{} needs a value", flag))?;
    value.parse().map_err(|_| format!("invalid value for {}: {}", flag, value))
}

// --- BENCH ---

fn run_bench(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let depth = match args.first() {
        Some(d) => d.parse().map_err(|_| format!("invalid bench depth: {}", d))?,
        None => DEFAULT_BENCH_DEPTH,
    };

    let mut searcher = Searcher::with_config(16, 1, SearchParameters::default(), Arc::new(SystemClock::new()))?;

    let mut total_nodes = 0u64;
    let mut total_time = 0.0;

    for fen in BENCH_FENS {
        let pos = Position::from_fen(fen)?;
        searcher.new_game();
        let data = searcher.run_bench(&pos, depth)?;

        println!(
            "{:<75} nodes {:>10} time {:>8.0}ms",
            fen,
            data.search.nodes,
            data.time * 1000.0
        );
        total_nodes += data.search.nodes;
        total_time += data.time;
    }

    let nps = if total_time > 0.0 { (total_nodes as f64 / total_time) as u64 } else { 0 };
    println!();
    println!("{} nodes {} nps", total_nodes, nps);
    log::info!("bench depth {}: {} nodes {} nps", depth, total_nodes, nps);
    Ok(())
}

// --- PERFT ---

fn run_perft(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.first().map(String::as_str) == Some("suite") {
        let depth = match args.get(1) {
            Some(d) => d.parse().map_err(|_| format!("invalid perft depth: {}", d))?,
            None => 4,
        };
        return if run_perft_suite(depth) { Ok(()) } else { Err("perft suite failed".into()) };
    }

    let depth: u32 = parse("perft", args.first())?;
    let fen = if args.len() > 1 { args[1..].join(" ") } else { START_FEN.to_string() };

    let mut pos = Position::from_fen(&fen)?;
    let start = std::time::Instant::now();
    let nodes = split_perft(&mut pos, depth);
    let elapsed = start.elapsed().as_secs_f64();

    if elapsed > 0.0 {
        println!("{:.0} nps", nodes as f64 / elapsed);
    }
    Ok(())
}

// --- SEARCH ---

#[derive(Default)]
struct SearchArgs {
    depth: Option<i32>,
    nodes: Option<u64>,
    movetime: Option<u64>,
    wtime: Option<u64>,
    btime: Option<u64>,
    winc: u64,
    binc: u64,
    movestogo: u32,
    threads: Option<usize>,
    hash: Option<usize>,
    config: Option<String>,
    fen: Vec<String>,
}

impl SearchArgs {
    /// Remaining time and increment of the side to move.
    fn clock_for(&self, side: usize) -> (Option<u64>, u64) {
        if side == WHITE {
            (self.wtime, self.winc)
        } else {
            (self.btime, self.binc)
        }
    }
}

fn parse_search_args(args: &[String]) -> Result<SearchArgs, String> {
    let mut parsed = SearchArgs::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--depth" => parsed.depth = Some(parse(arg, iter.next())?),
            "--nodes" => parsed.nodes = Some(parse(arg, iter.next())?),
            "--movetime" => parsed.movetime = Some(parse(arg, iter.next())?),
            "--wtime" => parsed.wtime = Some(parse(arg, iter.next())?),
            "--btime" => parsed.btime = Some(parse(arg, iter.next())?),
            "--winc" => parsed.winc = parse(arg, iter.next())?,
            "--binc" => parsed.binc = parse(arg, iter.next())?,
            "--movestogo" => parsed.movestogo = parse(arg, iter.next())?,
            "--threads" => parsed.threads = Some(parse(arg, iter.next())?),
            "--hash" => parsed.hash = Some(parse(arg, iter.next())?),
            "--config" => parsed.config = Some(parse(arg, iter.next())?),
            flag if flag.starts_with("--") => return Err(format!("unknown flag {}", flag)),
            word => parsed.fen.push(word.to_string()),
        }
    }
    Ok(parsed)
}

fn run_search(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_search_args(args)?;

    let params = match &args.config {
        Some(path) => SearchParameters::load_from_json(path)?,
        None => SearchParameters::default(),
    };
    let overhead = params.move_overhead_ms;

    let fen = if args.fen.is_empty() { START_FEN.to_string() } else { args.fen.join(" ") };
    let pos = Position::from_fen(&fen)?;

    let clock = Arc::new(SystemClock::new());
    let mut searcher = Searcher::with_config(
        args.hash.unwrap_or(DEFAULT_HASH_MB),
        args.threads.unwrap_or(DEFAULT_THREAD_COUNT),
        params,
        clock.clone(),
    )?;

    let (remaining, increment) = args.clock_for(pos.to_move());

    let limiter: Box<dyn Limiter> = if let Some(ms) = args.movetime {
        Box::new(MoveTimeLimiter::new(ms, overhead, clock.clone()))
    } else if let Some(nodes) = args.nodes {
        Box::new(NodeLimiter::new(nodes))
    } else if let Some(ms) = remaining {
        let to_go = if args.movestogo == 0 { DEFAULT_MOVES_TO_GO } else { args.movestogo };
        Box::new(TimeManager::new(clock.now(), ms, increment, to_go, overhead, clock.clone()))
    } else {
        Box::new(InfiniteLimiter)
    };

    // without any limit, fall back to the bench depth
    let timed = args.movetime.is_some() || args.nodes.is_some() || remaining.is_some();
    let depth = args.depth.unwrap_or(if timed { MAX_DEPTH } else { DEFAULT_BENCH_DEPTH });

    searcher.start_search(&pos, depth, Some(limiter))?;
    searcher.wait();
    Ok(())
}
