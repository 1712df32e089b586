use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::models::{AdWindow, MergedWindowSet, ProgramInfo};

use super::channels::ChannelMap;
use super::config::CacheConfig;
use super::merge::merge;
use super::source::ScheduleSource;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Why the ad windows are being refetched this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    FirstFetch,
    ChannelChanged,
    NoWindows,
    Expired,
    AllConsumed,
}

/// Cached schedule data for the tuned channel.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub channel_id: String,
    pub windows: MergedWindowSet,
    pub windows_fetched_at: Option<DateTime<Utc>>,
    pub program: Option<ProgramInfo>,
    pub program_fetched_at: Option<DateTime<Utc>>,
    /// Set once a refresh has been spent on a window set whose windows have
    /// all started; cleared as soon as a future window shows up.
    pub all_future_windows_consumed_notified: bool,
}

impl CacheEntry {
    fn new(channel_id: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            windows: MergedWindowSet::empty(),
            windows_fetched_at: None,
            program: None,
            program_fetched_at: None,
            all_future_windows_consumed_notified: false,
        }
    }
}

/// Single-slot cache of ad windows and programme info for the tuned channel.
///
/// Changing channel drops the slot wholesale. Windows and programme have
/// independent lifetimes; fetch failures degrade to "no data" and are retried
/// on a later tick.
pub struct AdCache {
    source: Arc<dyn ScheduleSource>,
    channels: ChannelMap,
    config: CacheConfig,
    entry: Option<CacheEntry>,
}

impl AdCache {
    pub fn new(source: Arc<dyn ScheduleSource>, channels: ChannelMap, config: CacheConfig) -> Self {
        Self {
            source,
            channels,
            config,
            entry: None,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn entry(&self) -> Option<&CacheEntry> {
        self.entry.as_ref()
    }

    /// Refresh whatever is stale for `channel_id`.
    pub async fn update(&mut self, channel_id: &str, now: DateTime<Utc>) {
        let first_fetch = self.entry.is_none();
        let channel_changed = self
            .entry
            .as_ref()
            .is_some_and(|entry| entry.channel_id != channel_id);

        if first_fetch || channel_changed {
            if channel_changed {
                log_info!("channel changed to {channel_id}, dropping cached schedule");
            }
            self.entry = Some(CacheEntry::new(channel_id));
        }

        let external_id = self.channels.external_id(channel_id).map(str::to_string);
        let source = Arc::clone(&self.source);
        let config = self.config;
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let reason = if first_fetch {
            Some(RefreshReason::FirstFetch)
        } else if channel_changed {
            Some(RefreshReason::ChannelChanged)
        } else {
            window_refresh_reason(entry, &config, now)
        };

        if let Some(reason) = reason {
            match external_id.as_deref() {
                Some(external_id) => {
                    log_debug!("refreshing ad windows for {channel_id} ({reason:?})");
                    let raw = match source.ad_windows(external_id).await {
                        Ok(raw) => raw,
                        Err(err) => {
                            log_warn!("ad schedule fetch failed for {external_id}: {err:#}");
                            Vec::new()
                        }
                    };
                    entry.windows = merge(&raw, config.max_merge_gap);
                    entry.windows_fetched_at = Some(now);
                    entry.all_future_windows_consumed_notified = entry.windows.all_started(now);
                }
                None => {
                    entry.windows = MergedWindowSet::empty();
                }
            }
        }

        if program_needs_refresh(entry, &config, now) {
            match external_id.as_deref() {
                Some(external_id) => {
                    entry.program = match source.current_program(external_id, now).await {
                        Ok(program) => program,
                        Err(err) => {
                            log_warn!("program fetch failed for {external_id}: {err:#}");
                            None
                        }
                    };
                    entry.program_fetched_at = Some(now);
                }
                None => {
                    entry.program = None;
                }
            }
        }
    }

    /// First cached window containing `now`.
    pub fn active_window(&self, now: DateTime<Utc>) -> Option<AdWindow> {
        self.entry.as_ref()?.windows.active_at(now)
    }

    /// Earliest cached window starting strictly after `now`.
    pub fn next_window(&self, now: DateTime<Utc>) -> Option<AdWindow> {
        self.entry.as_ref()?.windows.next_after(now)
    }

    pub fn current_program(&self) -> Option<&ProgramInfo> {
        self.entry.as_ref()?.program.as_ref()
    }

    pub fn windows(&self) -> &[AdWindow] {
        self.entry
            .as_ref()
            .map(|entry| entry.windows.as_slice())
            .unwrap_or(&[])
    }

    pub fn windows_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref()?.windows_fetched_at
    }
}

fn window_refresh_reason(
    entry: &mut CacheEntry,
    config: &CacheConfig,
    now: DateTime<Utc>,
) -> Option<RefreshReason> {
    if entry.windows.future_count(now) > 0 {
        entry.all_future_windows_consumed_notified = false;
    }

    if entry.windows.is_empty() {
        return Some(RefreshReason::NoWindows);
    }

    let expired = entry
        .windows_fetched_at
        .map_or(true, |fetched| now - fetched > config.window_ttl);
    if expired {
        return Some(RefreshReason::Expired);
    }

    if entry.windows.all_started(now) && !entry.all_future_windows_consumed_notified {
        return Some(RefreshReason::AllConsumed);
    }

    None
}

fn program_needs_refresh(entry: &CacheEntry, config: &CacheConfig, now: DateTime<Utc>) -> bool {
    entry.program.is_none()
        || entry
            .program_fetched_at
            .map_or(true, |fetched| now - fetched > config.program_ttl)
}
