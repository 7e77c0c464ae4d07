#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aether_search::types::{SCORE_MATE, SCORE_WIN};
    use aether_search::{ManualClock, Position, SearchParameters, Searcher};

    fn searcher(params: SearchParameters) -> Searcher {
        Searcher::with_config(4, 1, params, Arc::new(ManualClock::new())).expect("pool starts")
    }

    fn bench(fen: &str, depth: i32) -> (Option<String>, aether_search::BenchData) {
        let mut s = searcher(SearchParameters::default());
        let pos = Position::from_fen(fen).expect("valid fen");
        let data = s.run_bench(&pos, depth).expect("bench");
        (data.search.best_move.map(|m| m.to_uci()), data)
    }

    fn outcome(fen: &str, depth: i32, params: SearchParameters) -> aether_search::SearchOutcome {
        let mut s = searcher(params);
        let pos = Position::from_fen(fen).expect("valid fen");
        s.start_search(&pos, depth, Some(Box::new(aether_search::InfiniteLimiter))).expect("started");
        s.wait();
        s.last_outcome().expect("outcome")
    }

    #[test]
    fn test_mate_in_one_found() {
        let result = outcome("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1", 5, SearchParameters::default());
        assert_eq!(result.best_move.map(|m| m.to_uci()), Some("d1d8".to_string()));
        assert_eq!(result.score, SCORE_MATE - 1);
    }

    #[test]
    fn test_mate_scores_shrink_with_distance() {
        let mate_in_one = outcome("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1", 6, SearchParameters::default());
        // no mate in one here: Kg6 then Rd8
        let mate_in_two = outcome("7k/8/5K2/8/8/8/8/3R4 w - - 0 1", 6, SearchParameters::default());

        assert!(mate_in_one.score > mate_in_two.score);
        assert!(mate_in_two.score > SCORE_WIN);
        assert!(mate_in_one.score <= SCORE_MATE);
    }

    #[test]
    fn test_stalemate_and_checkmate_roots() {
        let stalemate = outcome("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 4, SearchParameters::default());
        assert!(stalemate.best_move.is_none());

        let mated = outcome("3R2k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1", 4, SearchParameters::default());
        assert!(mated.best_move.is_none());
    }

    fn full_width_params() -> SearchParameters {
        let mut params = SearchParameters::default();
        params.min_asp_depth = 100;
        params
    }

    #[test]
    fn test_aspiration_agrees_with_full_width() {
        let fen = "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1";

        let aspiration = outcome(fen, 8, SearchParameters::default());
        let full_width = outcome(fen, 8, full_width_params());

        assert_eq!(aspiration.best_move, full_width.best_move);
        assert_eq!(aspiration.score, full_width.score);
        assert_eq!(aspiration.depth, 8);
    }

    #[test]
    fn test_aspiration_agrees_with_full_width_in_middlegame() {
        // the queen on d4 hangs to Nf3
        let fen = "rnb1kbnr/ppp1pppp/8/8/3q4/2N2N2/PPPP1PPP/R1BQKB1R w KQkq - 0 4";

        let aspiration = outcome(fen, 7, SearchParameters::default());
        let full_width = outcome(fen, 7, full_width_params());

        assert_eq!(aspiration.depth, 7);
        assert_eq!(full_width.depth, 7);
        assert_eq!(aspiration.best_move.map(|m| m.to_uci()), Some("f3d4".to_string()));
        assert_eq!(aspiration.best_move, full_width.best_move);
        assert!(aspiration.score > 600);
        assert!((aspiration.score - full_width.score).abs() <= 75);
    }

    #[test]
    fn test_pawn_endings_never_try_null_moves() {
        let (_, data) = bench("8/5kpp/8/3p4/3P4/8/5PPP/6K1 w - - 0 1", 8);
        assert_eq!(data.search.null_move_attempts, 0);

        let (_, data) = bench("4k3/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQ - 0 1", 6);
        assert!(data.search.null_move_attempts > 0);
    }

    #[test]
    fn test_wins_material() {
        let (best, data) = bench("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1", 6);
        assert_eq!(best.as_deref(), Some("d2d5"));
        assert!(data.search.nodes > 0);
        assert_eq!(data.search.depth, 6);
        assert!(data.search.seldepth > 0);
    }

    #[test]
    fn test_search_is_deterministic_single_threaded() {
        let (a, da) = bench(aether_search::position::START_FEN, 5);
        let (b, db) = bench(aether_search::position::START_FEN, 5);
        assert_eq!(a, b);
        assert_eq!(da.search.nodes, db.search.nodes);
    }
}
