use std::time::Duration;

use crate::gateway::heartbeat::{Heartbeat, HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT};

pub const DEFAULT_PORT: u16 = 39100;

pub struct Config {
    pub port: u16,
    pub heartbeat: Heartbeat,
}

impl Config {
    pub fn from_env() -> Self {
        let interval = secs_from_env("GATEWAY_HEARTBEAT_INTERVAL_SECS").unwrap_or(HEARTBEAT_INTERVAL);
        let timeout = secs_from_env("GATEWAY_HEARTBEAT_TIMEOUT_SECS").unwrap_or(HEARTBEAT_TIMEOUT);

        // Timeout is at least one check interval.
        let timeout = timeout.max(interval);

        Self {
            port: env_parse("PORT").unwrap_or(DEFAULT_PORT),
            heartbeat: Heartbeat { interval, timeout },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Whole seconds from `key`; zero counts as unset.
fn secs_from_env(key: &str) -> Option<Duration> {
    env_parse::<u64>(key)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
