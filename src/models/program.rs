use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The programme currently airing on a channel, as reported by the EPG.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgramInfo {
    pub title: String,
    pub category: String,
    pub sub_category: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: i64,
    pub description: String,
}

impl ProgramInfo {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.end - now).max(Duration::zero())
    }

    /// Elapsed share of the programme, clamped to `0.0..=100.0`.
    pub fn progress_percentage(&self, now: DateTime<Utc>) -> f64 {
        if self.duration_seconds <= 0 {
            return 0.0;
        }
        let elapsed = (now - self.start).num_seconds() as f64;
        (elapsed / self.duration_seconds as f64 * 100.0).clamp(0.0, 100.0)
    }
}
