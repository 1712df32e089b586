use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Duration assumed for an ad break whose end time the schedule omits.
pub const ESTIMATED_WINDOW_SECS: i64 = 300;

/// A scheduled advertisement interval. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct AdWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AdWindow {
    /// Builds a window, clamping `end` up to `start` so zero-length or
    /// inverted input still yields a valid interval.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Window for a schedule entry without an end time.
    pub fn estimated(start: DateTime<Utc>) -> Self {
        Self::new(start, start + Duration::seconds(ESTIMATED_WINDOW_SECS))
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_secs(&self) -> i64 {
        self.duration().num_seconds()
    }

    /// Negative once the window has started.
    pub fn time_until_start(&self, now: DateTime<Utc>) -> Duration {
        self.start - now
    }

    /// Negative once the window has ended.
    pub fn time_until_end(&self, now: DateTime<Utc>) -> Duration {
        self.end - now
    }

    /// Windows of exactly the fallback length were most likely synthesized
    /// from an entry with no end time. Only the display cares.
    pub fn is_estimated(&self) -> bool {
        self.duration_secs() == ESTIMATED_WINDOW_SECS
    }
}

impl fmt::Display for AdWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.start.with_timezone(&Local).format("%H:%M:%S");
        let end = self.end.with_timezone(&Local).format("%H:%M:%S");
        write!(f, "{start} -> {end}")
    }
}

/// Sorted, non-overlapping ad windows produced by [`crate::schedule::merge`].
///
/// The only way to build one from raw data is through the merger, so holders
/// can rely on the ordering invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MergedWindowSet {
    windows: Vec<AdWindow>,
}

impl MergedWindowSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_sorted(windows: Vec<AdWindow>) -> Self {
        Self { windows }
    }

    pub fn as_slice(&self) -> &[AdWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// First window containing `now`, bounds inclusive.
    pub fn active_at(&self, now: DateTime<Utc>) -> Option<AdWindow> {
        self.windows.iter().copied().find(|w| w.contains(now))
    }

    /// Window with the smallest start strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<AdWindow> {
        self.windows
            .iter()
            .copied()
            .filter(|w| w.start > now)
            .min_by_key(|w| w.start)
    }

    pub fn future_count(&self, now: DateTime<Utc>) -> usize {
        self.windows.iter().filter(|w| w.start > now).count()
    }

    /// True when there is at least one window and none starts after `now`.
    pub fn all_started(&self, now: DateTime<Utc>) -> bool {
        !self.windows.is_empty() && self.future_count(now) == 0
    }
}

#[cfg(test)]
pub(crate) fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}
