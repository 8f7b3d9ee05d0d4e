//! Room timing configuration
//!
//! Every value defaults to the contract constant in `tetris_arena_types`. Individual
//! values can be overridden from the environment, mostly so that tests and local
//! play do not have to wait out a real countdown:
//!
//! - `TETRIS_ARENA_TICK_MS`
//! - `TETRIS_ARENA_AUTO_DROP_MS`
//! - `TETRIS_ARENA_COUNTDOWN_MS`
//! - `TETRIS_ARENA_FORCED_START_MS`
//! - `TETRIS_ARENA_IDLE_TIMEOUT_MS`
//! - `TETRIS_ARENA_CLEANUP_INTERVAL_MS`

use std::env;
use std::time::Duration;

use tetris_arena_core::types::{
    AUTO_DROP_MS, CLEANUP_INTERVAL_MS, FORCED_START_MS, IDLE_ROOM_TIMEOUT_MS, MAX_SEATED_PLAYERS,
    START_COUNTDOWN_MS, TICK_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomTimings {
    pub tick: Duration,
    /// Gravity period per player
    pub auto_drop: Duration,
    pub start_countdown: Duration,
    /// Wait after the first join before a lone player is started anyway
    pub forced_start: Duration,
    /// Idle time after which an empty room may be reclaimed
    pub idle_timeout: Duration,
    pub cleanup_interval: Duration,
    pub max_players: usize,
}

impl Default for RoomTimings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(TICK_MS),
            auto_drop: Duration::from_millis(AUTO_DROP_MS),
            start_countdown: Duration::from_millis(START_COUNTDOWN_MS),
            forced_start: Duration::from_millis(FORCED_START_MS),
            idle_timeout: Duration::from_millis(IDLE_ROOM_TIMEOUT_MS),
            cleanup_interval: Duration::from_millis(CLEANUP_INTERVAL_MS),
            max_players: MAX_SEATED_PLAYERS,
        }
    }
}

impl RoomTimings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick: millis_var("TETRIS_ARENA_TICK_MS").unwrap_or(defaults.tick),
            auto_drop: millis_var("TETRIS_ARENA_AUTO_DROP_MS").unwrap_or(defaults.auto_drop),
            start_countdown: millis_var("TETRIS_ARENA_COUNTDOWN_MS")
                .unwrap_or(defaults.start_countdown),
            forced_start: millis_var("TETRIS_ARENA_FORCED_START_MS")
                .unwrap_or(defaults.forced_start),
            idle_timeout: millis_var("TETRIS_ARENA_IDLE_TIMEOUT_MS")
                .unwrap_or(defaults.idle_timeout),
            cleanup_interval: millis_var("TETRIS_ARENA_CLEANUP_INTERVAL_MS")
                .unwrap_or(defaults.cleanup_interval),
            max_players: defaults.max_players,
        }
    }
}

/// Positive millisecond value from the environment; zero and garbage are ignored
fn millis_var(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis)
}
