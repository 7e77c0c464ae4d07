#[cfg(test)]
mod tests {
    use aether_search::perft::{perft, PERFT_SUITE};
    use aether_search::Position;

    #[test]
    fn test_suite_to_depth_three() {
        for (name, fen, expected) in PERFT_SUITE.iter() {
            let mut pos = Position::from_fen(fen).expect("valid fen");
            for depth in 1..=3 {
                assert_eq!(perft(&mut pos, depth), expected[depth as usize], "{} depth {}", name, depth);
            }
        }
    }

    #[test]
    fn test_en_passant_and_pins() {
        // en passant would expose the king along the rank
        let mut pos = Position::from_fen("8/8/8/K2pP2r/8/8/8/7k w - d6 0 1").expect("valid fen");
        let moves = perft(&mut pos, 1);
        let ep = pos.move_from_uci("e5d6");
        assert!(ep.is_err());
        assert_eq!(moves, 6);
    }

    #[test]
    fn test_promotions_counted_per_piece() {
        let mut pos = Position::from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").expect("valid fen");
        // four promotions plus three king moves
        assert_eq!(perft(&mut pos, 1), 7);
    }
}
