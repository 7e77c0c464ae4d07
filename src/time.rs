use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::search::SearchData;

pub const DEFAULT_MOVES_TO_GO: u32 = 25;

// --- CLOCK ---

/// Time source in seconds since the clock's own origin. Injected into every
/// limiter and the reporter so tests can drive time by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ms(&self, ms: u64) {
        self.micros.fetch_add(ms * 1000, Ordering::Relaxed);
    }

    pub fn set_ms(&self, ms: u64) {
        self.micros.store(ms * 1000, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}

// --- LIMITERS ---

/// Decides when a search stops. Only thread 0 calls `update`; every thread
/// may call `stop`.
pub trait Limiter: Send + Sync {
    fn stop(&self, data: &SearchData, allow_soft_timeout: bool) -> bool;

    fn update(&self, _data: &SearchData, _stable_best_move: bool) {}
}

/// Never stops on its own. Used for depth-limited and bench searches.
pub struct InfiniteLimiter;

impl Limiter for InfiniteLimiter {
    fn stop(&self, _data: &SearchData, _allow_soft_timeout: bool) -> bool {
        false
    }
}

/// Stops once this thread has searched `max_nodes` nodes.
pub struct NodeLimiter {
    max_nodes: u64,
}

impl NodeLimiter {
    pub fn new(max_nodes: u64) -> Self {
        Self { max_nodes }
    }
}

impl Limiter for NodeLimiter {
    fn stop(&self, data: &SearchData, _allow_soft_timeout: bool) -> bool {
        data.nodes >= self.max_nodes
    }
}

pub struct MoveTimeLimiter {
    clock: Arc<dyn Clock>,
    max_time: f64,
}

impl MoveTimeLimiter {
    pub fn new(time_ms: u64, overhead_ms: u64, clock: Arc<dyn Clock>) -> Self {
        let budget = time_ms.saturating_sub(overhead_ms).max(1);
        let max_time = clock.now() + budget as f64 / 1000.0;
        Self { clock, max_time }
    }
}

impl Limiter for MoveTimeLimiter {
    fn stop(&self, data: &SearchData, _allow_soft_timeout: bool) -> bool {
        data.depth > 2
            && data.nodes > 0
            && data.nodes % 1024 == 0
            && self.clock.now() >= self.max_time
    }
}

/// Clock-based limiter with a soft bound that shrinks as the best move
/// stays stable across iterations.
pub struct TimeManager {
    clock: Arc<dyn Clock>,
    start_time: f64,
    to_go: u32,
    max_time: f64,
    soft_time: f64,
    stability: AtomicU32,
}

impl TimeManager {
    pub fn new(
        start_time: f64,
        remaining_ms: u64,
        increment_ms: u64,
        to_go: u32,
        overhead_ms: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let remaining = remaining_ms as f64 / 1000.0;
        let increment = increment_ms as f64 / 1000.0;
        let overhead = overhead_ms as f64 / 1000.0;

        let limit = (remaining - overhead).max(0.001);
        let to_go = if to_go == 0 { DEFAULT_MOVES_TO_GO } else { to_go };

        let base_time = limit / to_go as f64 + increment * 0.75;
        let max_time = limit / 2.0;
        let soft_time = (base_time * 0.6).min(max_time);

        log::debug!("time manager: soft {:.3}s max {:.3}s (to go {})", soft_time, max_time, to_go);

        Self {
            clock,
            start_time,
            to_go,
            max_time,
            soft_time,
            stability: AtomicU32::new(0),
        }
    }

    pub fn to_go(&self) -> u32 {
        self.to_go
    }

    pub fn max_time(&self) -> f64 {
        self.max_time
    }

    pub fn soft_time(&self) -> f64 {
        self.soft_time
    }

    pub fn stability(&self) -> u32 {
        self.stability.load(Ordering::Relaxed)
    }

    /// Multiplier on the soft bound.
    pub fn scale(&self) -> f64 {
        1.32 - self.stability() as f64 * 0.06
    }
}

impl Limiter for TimeManager {
    fn update(&self, data: &SearchData, stable_best_move: bool) {
        if data.depth < 4 {
            return;
        }
        let next = if stable_best_move { (self.stability() + 1).min(9) } else { 0 };
        self.stability.store(next, Ordering::Relaxed);
    }

    fn stop(&self, data: &SearchData, allow_soft_timeout: bool) -> bool {
        if data.depth < 5 || data.nodes == 0 || (!allow_soft_timeout && data.nodes % 1024 != 0) {
            return false;
        }

        let elapsed = self.clock.now() - self.start_time;
        elapsed > self.max_time || (allow_soft_timeout && elapsed > self.soft_time * self.scale())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(depth: i32, nodes: u64) -> SearchData {
        SearchData { depth, nodes, ..SearchData::default() }
    }

    #[test]
    fn test_move_time_checks_on_cadence() {
        let clock = Arc::new(ManualClock::new());
        let limiter = MoveTimeLimiter::new(100, 10, clock.clone());

        clock.advance_ms(89);
        assert!(!limiter.stop(&data(5, 1024), false));
        clock.advance_ms(2);
        assert!(limiter.stop(&data(5, 1024), false));
        assert!(!limiter.stop(&data(5, 1025), false));
        assert!(!limiter.stop(&data(2, 1024), false));
        assert!(!limiter.stop(&data(5, 0), false));
    }

    #[test]
    fn test_move_time_never_below_one_ms() {
        let clock = Arc::new(ManualClock::new());
        let limiter = MoveTimeLimiter::new(5, 50, clock.clone());
        assert!(!limiter.stop(&data(3, 1024), false));
        clock.advance_ms(2);
        assert!(limiter.stop(&data(3, 1024), false));
    }

    #[test]
    fn test_time_manager_soft_and_hard() {
        let clock = Arc::new(ManualClock::new());
        let tm = TimeManager::new(clock.now(), 10_000, 0, 10, 0, clock.clone());
        // soft = 0.6 * 1.0 = 0.6s, scaled by 1.32 while unstable
        assert!((tm.soft_time() - 0.6).abs() < 1e-9);

        clock.set_ms(700);
        assert!(!tm.stop(&data(6, 1000), true));
        clock.set_ms(800);
        assert!(tm.stop(&data(6, 1000), true));
        assert!(!tm.stop(&data(6, 1000), false));
        assert!(!tm.stop(&data(4, 1024), true));

        clock.set_ms(5_001);
        assert!(tm.stop(&data(6, 2048), false));
    }

    #[test]
    fn test_instability_resets() {
        let clock = Arc::new(ManualClock::new());
        let tm = TimeManager::new(0.0, 60_000, 0, 0, 50, clock);
        tm.update(&data(3, 1), true);
        assert_eq!(tm.stability(), 0);
        tm.update(&data(4, 1), true);
        tm.update(&data(5, 1), true);
        assert_eq!(tm.stability(), 2);
        tm.update(&data(6, 1), false);
        assert_eq!(tm.stability(), 0);
    }
}
