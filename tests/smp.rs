#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use aether_search::types::MAX_DEPTH;
    use aether_search::{InfiniteLimiter, Position, SearchError, SearchParameters, Searcher, SystemClock};

    fn searcher(threads: usize) -> Searcher {
        Searcher::with_config(4, threads, SearchParameters::default(), Arc::new(SystemClock::new()))
            .expect("pool starts")
    }

    #[test]
    fn test_stop_waits_for_every_worker() {
        let mut s = searcher(4);
        s.start_search(&Position::startpos(), MAX_DEPTH, Some(Box::new(InfiniteLimiter)))
            .expect("started");
        assert!(s.searching());

        thread::sleep(Duration::from_millis(100));
        s.stop();

        assert!(!s.searching());
        let outcome = s.last_outcome().expect("thread 0 published");
        assert!(outcome.best_move.is_some());
    }

    #[test]
    fn test_resize_uses_exactly_the_new_pool() {
        let mut s = searcher(2);
        s.set_threads(3).expect("resize");
        assert_eq!(s.thread_count(), 3);

        s.start_search(&Position::startpos(), MAX_DEPTH, Some(Box::new(InfiniteLimiter)))
            .expect("started");
        thread::sleep(Duration::from_millis(300));
        s.stop();

        let nodes = s.thread_nodes();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|&n| n > 0), "idle worker: {:?}", nodes);

        s.set_threads(1).expect("shrink");
        s.start_search(&Position::startpos(), 3, Some(Box::new(InfiniteLimiter)))
            .expect("started");
        s.wait();
        assert_eq!(s.thread_nodes().len(), 1);
    }

    #[test]
    fn test_restart_while_running() {
        let mut s = searcher(2);
        s.start_search(&Position::startpos(), MAX_DEPTH, Some(Box::new(InfiniteLimiter)))
            .expect("started");
        thread::sleep(Duration::from_millis(20));

        let pos = Position::from_fen("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1").expect("valid fen");
        s.start_search(&pos, 4, Some(Box::new(InfiniteLimiter))).expect("restarted");
        s.wait();

        let outcome = s.last_outcome().expect("outcome");
        assert_eq!(outcome.best_move.map(|m| m.to_uci()), Some("d1d8".to_string()));
    }

    #[test]
    fn test_missing_limiter_leaves_pool_idle() {
        let mut s = searcher(2);
        assert!(matches!(
            s.start_search(&Position::startpos(), 5, None),
            Err(SearchError::MissingLimiter)
        ));
        assert!(!s.searching());
        assert!(s.last_outcome().is_none());
    }

    #[test]
    fn test_new_game_after_search() {
        let mut s = searcher(2);
        s.start_search(&Position::startpos(), 5, Some(Box::new(InfiniteLimiter)))
            .expect("started");
        s.wait();
        assert!(s.tt().full() > 0);

        s.new_game();
        assert_eq!(s.tt().full(), 0);
    }

    #[test]
    fn test_drop_while_searching() {
        let mut s = searcher(3);
        s.start_search(&Position::startpos(), MAX_DEPTH, Some(Box::new(InfiniteLimiter)))
            .expect("started");
        thread::sleep(Duration::from_millis(20));
        drop(s);
    }
}
