#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aether_search::time::{Clock, Limiter, ManualClock, MoveTimeLimiter, NodeLimiter, TimeManager};
    use aether_search::types::MAX_DEPTH;
    use aether_search::{Position, SearchData, SearchParameters, Searcher};

    fn data(depth: i32, nodes: u64) -> SearchData {
        SearchData { depth, nodes, ..SearchData::default() }
    }

    #[test]
    fn test_sixty_second_scenario() {
        let clock = Arc::new(ManualClock::new());
        let tm = TimeManager::new(clock.now(), 60_000, 0, 0, 50, clock.clone());

        assert_eq!(tm.to_go(), 25);
        assert!(tm.soft_time() <= tm.max_time());
        assert!((tm.max_time() - 29.975).abs() < 1e-9);
        assert!((tm.scale() - 1.32).abs() < 1e-9);

        for depth in 4..13 {
            tm.update(&data(depth, 1), true);
        }
        assert_eq!(tm.stability(), 9);
        assert!((tm.scale() - 0.78).abs() < 1e-9);

        // stability is capped
        tm.update(&data(13, 1), true);
        assert!((tm.scale() - 0.78).abs() < 1e-9);
    }

    #[test]
    fn test_stable_move_shortens_the_soft_bound() {
        let clock = Arc::new(ManualClock::new());
        let tm = TimeManager::new(0.0, 60_000, 0, 0, 50, clock.clone());

        // 0.6 * 59.95 / 25 = 1.4388s soft, so 1.2s is inside even the stable bound
        clock.set_ms(1_200);
        assert!(!tm.stop(&data(10, 5), true));

        // 1.4388 * 1.32 = 1.899s while unstable
        clock.set_ms(1_600);
        assert!(!tm.stop(&data(10, 5), true));

        for depth in 4..13 {
            tm.update(&data(depth, 1), true);
        }
        // 1.4388 * 0.78 = 1.122s once stable
        assert!(tm.stop(&data(10, 5), true));
        // hard checks only land on the node cadence
        assert!(!tm.stop(&data(10, 5), false));
    }

    #[test]
    fn test_increment_raises_budget() {
        let clock = Arc::new(ManualClock::new());
        let without = TimeManager::new(0.0, 10_000, 0, 20, 0, clock.clone());
        let with = TimeManager::new(0.0, 10_000, 1_000, 20, 0, clock);
        assert!(with.soft_time() > without.soft_time());
        assert_eq!(with.max_time(), without.max_time());
    }

    #[test]
    fn test_tiny_remaining_time_still_positive() {
        let clock = Arc::new(ManualClock::new());
        let tm = TimeManager::new(0.0, 10, 0, 0, 50, clock);
        assert!(tm.max_time() > 0.0);
        assert!(tm.soft_time() > 0.0);
        assert!(tm.soft_time() <= tm.max_time());
    }

    #[test]
    fn test_move_time_deadline() {
        let clock = Arc::new(ManualClock::new());
        clock.set_ms(500);
        let limiter = MoveTimeLimiter::new(1_000, 10, clock.clone());

        clock.set_ms(1_480);
        assert!(!limiter.stop(&data(6, 2048), false));
        clock.set_ms(1_491);
        assert!(limiter.stop(&data(6, 2048), false));
    }

    #[test]
    fn test_node_limit_threshold() {
        let limiter = NodeLimiter::new(10_000);
        assert!(!limiter.stop(&data(1, 0), true));
        assert!(!limiter.stop(&data(9, 9_999), false));
        assert!(limiter.stop(&data(9, 10_000), false));
        assert!(limiter.stop(&data(2, 10_001), true));
    }

    #[test]
    fn test_node_limited_search_stops() {
        let mut searcher = Searcher::with_config(4, 1, SearchParameters::default(), Arc::new(ManualClock::new()))
            .expect("pool starts");
        let limiter = Box::new(NodeLimiter::new(20_000));

        searcher.start_search(&Position::startpos(), MAX_DEPTH, Some(limiter)).expect("started");
        searcher.wait();

        let outcome = searcher.last_outcome().expect("outcome");
        assert!(outcome.best_move.is_some());
        assert!(outcome.nodes >= 20_000);
        assert!(outcome.nodes < 100_000, "overshot to {} nodes", outcome.nodes);
        assert!(outcome.depth < MAX_DEPTH);
    }
}
