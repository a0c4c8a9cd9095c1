use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Everything the hosting environment supplies once at load.
///
/// Missing fields fall back to defaults; a missing or unparseable file falls
/// back to the full default config. Configuration is never a fatal error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Score endpoint the reconciliation engine posts deltas to.
    #[serde(default = "default_sync_url")]
    pub sync_url: String,
    /// Where "go to leaderboard" navigates after the pre-navigation flush.
    #[serde(default = "default_leaderboard_url")]
    pub leaderboard_url: String,
    /// Last total the authority confirmed for this user, shown immediately.
    #[serde(default)]
    pub initial_score: u64,
    /// Credential forwarded with every sync request; the authority ties the
    /// score to the cookie session.
    #[serde(default)]
    pub session_cookie: Option<String>,
    /// Minimum interval between two accepted increments.
    #[serde(default = "default_cooldown", with = "crate::serde_duration")]
    pub cooldown: Duration,
    /// Cadence of the periodic reconciliation timer.
    #[serde(default = "default_sync_interval", with = "crate::serde_duration")]
    pub sync_interval: Duration,
    /// Largest delta the authority accepts in one request.
    #[serde(default = "default_max_batch")]
    pub max_batch: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            sync_url: default_sync_url(),
            leaderboard_url: default_leaderboard_url(),
            initial_score: 0,
            session_cookie: None,
            cooldown: default_cooldown(),
            sync_interval: default_sync_interval(),
            max_batch: default_max_batch(),
        }
    }
}

impl SessionConfig {
    /// Clamps values a hand-edited file could break. A zero sync interval
    /// would spin the timer; a zero batch could never drain the buffer.
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        if self.sync_interval.is_zero() {
            self.sync_interval = default_sync_interval();
        }
        if self.max_batch == 0 {
            self.max_batch = default_max_batch();
        }
        self
    }
}

fn default_version() -> u32 {
    1
}

fn default_sync_url() -> String {
    "http://127.0.0.1:8080/tap/sync".to_string()
}

fn default_leaderboard_url() -> String {
    "/tap/leaderboard".to_string()
}

fn default_cooldown() -> Duration {
    counter::score::DEFAULT_COOLDOWN
}

fn default_sync_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_max_batch() -> u64 {
    1000
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("TAPGAME_CONFIG_PATH") {
            return Self {
                path: PathBuf::from(explicit),
            };
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("tapgame");
        path.push("session.json");
        Self { path }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> SessionConfig {
        let Ok(bytes) = fs::read(&self.path) else {
            return SessionConfig::default();
        };
        serde_json::from_slice::<SessionConfig>(&bytes)
            .map(SessionConfig::sanitized)
            .unwrap_or_else(|_| SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let parsed: SessionConfig =
            serde_json::from_str(r#"{"sync_url":"http://example.test/tap/sync"}"#)
                .expect("config JSON should parse");
        assert_eq!(parsed.sync_url, "http://example.test/tap/sync");
        assert_eq!(parsed.leaderboard_url, default_leaderboard_url());
        assert_eq!(parsed.initial_score, 0);
        assert_eq!(parsed.cooldown, Duration::from_millis(50));
        assert_eq!(parsed.sync_interval, Duration::from_secs(10));
        assert_eq!(parsed.max_batch, 1000);
    }

    #[test]
    fn sanitized_clamps_zero_interval_and_batch() {
        let config = SessionConfig {
            version: 9,
            sync_interval: Duration::ZERO,
            max_batch: 0,
            ..SessionConfig::default()
        }
        .sanitized();

        assert_eq!(config.version, 1);
        assert_eq!(config.sync_interval, default_sync_interval());
        assert_eq!(config.max_batch, default_max_batch());
    }

    #[test]
    fn durations_serialize_as_millis() {
        let config = SessionConfig {
            cooldown: Duration::from_millis(75),
            sync_interval: Duration::from_secs(5),
            ..SessionConfig::default()
        };
        let json = serde_json::to_value(&config).expect("serialize config");
        assert_eq!(json["cooldown"], 75);
        assert_eq!(json["sync_interval"], 5000);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let store = ConfigStore::at(PathBuf::from("/nonexistent/tapgame/session.json"));
        assert_eq!(store.load(), SessionConfig::default());
    }
}
