use std::env;
use std::str::FromStr;
use std::time::Duration;

use draw_core::LifecycleConfig;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub host_password: Option<String>,
    pub reconnect_delay_ms: u64,
    pub request_timeout_seconds: u64,
    pub draw_deadline_seconds: u64,
    pub armed_deadline_seconds: u64,
    pub display_window_seconds: u64,
    pub whole_turns: u32,
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_base: env::var("DRAW_API_BASE")
                .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string()),
            host_password: env::var("DRAW_HOST_PASSWORD")
                .ok()
                .filter(|password| !password.is_empty()),
            reconnect_delay_ms: env_or("DRAW_RECONNECT_DELAY_MS", 1500),
            request_timeout_seconds: env_or("DRAW_REQUEST_TIMEOUT_SECONDS", 10),
            draw_deadline_seconds: env_or("DRAW_DEADLINE_SECONDS", 15),
            armed_deadline_seconds: env_or("DRAW_ARMED_DEADLINE_SECONDS", 15),
            display_window_seconds: env_or("DRAW_DISPLAY_WINDOW_SECONDS", 8),
            whole_turns: env_or("DRAW_WHOLE_TURNS", draw_core::WHOLE_TURNS),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            draw_deadline: Duration::from_secs(self.draw_deadline_seconds),
            armed_deadline: Duration::from_secs(self.armed_deadline_seconds),
            display_window: Duration::from_secs(self.display_window_seconds),
            whole_turns: self.whole_turns,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(key, env::var(key).ok(), default)
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid {}={:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}
