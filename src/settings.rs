use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::device::FreeboxConfig;
use crate::polling::Cadence;
use crate::schedule::{oqee, CacheConfig};

/// Environment variable naming the JSON settings file.
pub const CONFIG_PATH_VAR: &str = "ADMUTE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "admute.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceSettings {
    pub host: String,
    pub port: u16,
    pub app_id: String,
    pub app_token: String,
    pub accept_invalid_certs: bool,
    pub player_id: Option<i64>,
    pub request_timeout_secs: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            host: "mafreebox.freebox.fr".into(),
            port: 443,
            app_id: "fr.freebox.admute".into(),
            app_token: String::new(),
            accept_invalid_certs: true,
            player_id: None,
            request_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingSettings {
    pub fast_interval_secs: u64,
    pub slow_interval_secs: u64,
    pub cycle_timeout_secs: u64,
    /// Redraw the terminal status view after every cycle
    pub show_status: bool,
    /// Log destination while the status view owns the terminal
    pub log_file: PathBuf,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            fast_interval_secs: 1,
            slow_interval_secs: 5,
            cycle_timeout_secs: 10,
            show_status: true,
            log_file: PathBuf::from("admute.log"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    pub window_ttl_secs: u64,
    pub program_ttl_secs: u64,
    pub lookahead_secs: u64,
    pub max_merge_gap_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            window_ttl_secs: 3,
            program_ttl_secs: 30,
            lookahead_secs: 10,
            max_merge_gap_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            base_url: oqee::DEFAULT_BASE_URL.into(),
            request_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub device: DeviceSettings,
    pub polling: PollingSettings,
    pub cache: CacheSettings,
    pub schedule: ScheduleSettings,
    /// Extra or corrected channel mappings, player id -> schedule id
    pub channels: HashMap<String, String>,
}

impl Settings {
    /// Defaults, then the JSON file (if present), then environment overrides.
    ///
    /// Also returns the environment values that were ignored, since logging
    /// is not set up until the settings are known.
    pub fn load() -> Result<(Self, Vec<String>)> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut settings = Self::from_file(Path::new(&path))?;
        let ignored = settings.apply_env(|key| std::env::var(key).ok());
        Ok((settings, ignored))
    }

    /// Reads settings from `path`; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    /// Applies known environment overrides, returning a message for each
    /// value that could not be parsed.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut ignored = Vec::new();
        if let Some(host) = lookup("FREEBOX_HOST") {
            self.device.host = host;
        }
        if let Some(app_id) = lookup("FREEBOX_APP_ID") {
            self.device.app_id = app_id;
        }
        if let Some(app_token) = lookup("FREEBOX_APP_TOKEN") {
            self.device.app_token = app_token;
        }
        override_parsed(&lookup, &mut ignored, "FREEBOX_PORT", &mut self.device.port);
        override_parsed(&lookup, &mut ignored, "CHECK_INTERVAL", &mut self.polling.fast_interval_secs);
        override_parsed(&lookup, &mut ignored, "CHECK_INTERVAL_TV_OFF", &mut self.polling.slow_interval_secs);
        override_parsed(&lookup, &mut ignored, "AD_BREAKS_CACHE_TTL", &mut self.cache.window_ttl_secs);
        override_parsed(&lookup, &mut ignored, "PROGRAM_CACHE_TTL", &mut self.cache.program_ttl_secs);
        override_parsed(&lookup, &mut ignored, "UNMUTE_BUFFER", &mut self.cache.lookahead_secs);
        override_parsed(&lookup, &mut ignored, "AD_MERGE_MAX_GAP", &mut self.cache.max_merge_gap_secs);
        ignored
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            window_ttl: secs(self.cache.window_ttl_secs),
            program_ttl: secs(self.cache.program_ttl_secs),
            max_merge_gap: secs(self.cache.max_merge_gap_secs),
            lookahead: secs(self.cache.lookahead_secs),
        }
    }

    pub fn freebox_config(&self) -> FreeboxConfig {
        FreeboxConfig {
            base_url: FreeboxConfig::base_url_for(&self.device.host, self.device.port),
            app_id: self.device.app_id.clone(),
            app_token: self.device.app_token.clone(),
            accept_invalid_certs: self.device.accept_invalid_certs,
            player_id: self.device.player_id,
            request_timeout: Duration::from_secs(self.device.request_timeout_secs),
        }
    }

    /// Where logs go: a file while the status view redraws the terminal,
    /// stderr otherwise.
    pub fn log_file(&self) -> Option<&Path> {
        self.polling
            .show_status
            .then_some(self.polling.log_file.as_path())
    }

    pub fn cadence(&self) -> Cadence {
        Cadence {
            fast: self.fast_interval(),
            slow: self.slow_interval(),
            cycle_timeout: self.cycle_timeout(),
            show_status: self.polling.show_status,
        }
    }

    pub fn fast_interval(&self) -> Duration {
        Duration::from_secs(self.polling.fast_interval_secs)
    }

    pub fn slow_interval(&self) -> Duration {
        Duration::from_secs(self.polling.slow_interval_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.polling.cycle_timeout_secs)
    }

    pub fn schedule_timeout(&self) -> Duration {
        Duration::from_secs(self.schedule.request_timeout_secs)
    }
}

fn secs(value: u64) -> chrono::Duration {
    chrono::Duration::seconds(value.min(u64::from(u32::MAX)) as i64)
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    ignored: &mut Vec<String>,
    key: &str,
    target: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => ignored.push(format!("ignoring {key}={raw:?}: not a valid number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.device.host, "mafreebox.freebox.fr");
        assert_eq!(settings.device.port, 443);
        assert_eq!(settings.polling.fast_interval_secs, 1);
        assert_eq!(settings.polling.slow_interval_secs, 5);
        assert!(settings.polling.show_status);
        let cache = settings.cache_config();
        assert_eq!(cache.window_ttl.num_seconds(), 3);
        assert_eq!(cache.program_ttl.num_seconds(), 30);
        assert_eq!(cache.lookahead.num_seconds(), 10);
        assert_eq!(cache.max_merge_gap.num_seconds(), 60);
    }

    #[test]
    fn env_overrides_known_keys() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[
            ("FREEBOX_HOST", "192.168.1.254"),
            ("FREEBOX_PORT", "80"),
            ("UNMUTE_BUFFER", "15"),
            ("AD_MERGE_MAX_GAP", " 30 "),
        ]));
        assert_eq!(settings.device.host, "192.168.1.254");
        assert_eq!(settings.device.port, 80);
        assert_eq!(settings.cache.lookahead_secs, 15);
        assert_eq!(settings.cache.max_merge_gap_secs, 30);
        assert_eq!(
            settings.freebox_config().base_url,
            "http://192.168.1.254:80/api/v4"
        );
    }

    #[test]
    fn bad_numbers_are_ignored() {
        let mut settings = Settings::default();
        let ignored = settings.apply_env(env(&[("CHECK_INTERVAL", "fast"), ("FREEBOX_PORT", "-1")]));
        assert_eq!(ignored.len(), 2);
        assert!(ignored.iter().any(|msg| msg.contains("CHECK_INTERVAL")));
        assert_eq!(settings.polling.fast_interval_secs, 1);
        assert_eq!(settings.device.port, 443);
    }

    #[test]
    fn cadence_follows_polling_section() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("CHECK_INTERVAL", "2"), ("CHECK_INTERVAL_TV_OFF", "30")]));
        let cadence = settings.cadence();
        assert_eq!(cadence.fast, Duration::from_secs(2));
        assert_eq!(cadence.slow, Duration::from_secs(30));
        assert_eq!(cadence.cycle_timeout, Duration::from_secs(10));
    }

    #[test]
    fn logs_leave_the_terminal_while_status_view_is_on() {
        let mut settings = Settings::default();
        assert_eq!(settings.log_file(), Some(Path::new("admute.log")));

        settings.polling.show_status = false;
        assert_eq!(settings.log_file(), None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::from_file(Path::new("/nonexistent/admute.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admute.json");
        fs::write(
            &path,
            r#"{ "cache": { "lookahead_secs": 20 }, "channels": { "uuid-webtv-1": "42" } }"#,
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();

        assert_eq!(settings.cache.lookahead_secs, 20);
        assert_eq!(settings.cache.window_ttl_secs, 3);
        assert_eq!(settings.channels.get("uuid-webtv-1").map(String::as_str), Some("42"));
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse settings"));
    }
}
