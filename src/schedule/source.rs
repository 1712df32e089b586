use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{AdWindow, ProgramInfo};

/// Remote ad-break schedule and EPG.
///
/// Implementations return raw, unmerged windows; entries missing an end time
/// are expected to be normalized with [`AdWindow::estimated`].
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn ad_windows(&self, external_id: &str) -> Result<Vec<AdWindow>>;

    /// Programme airing at `now`, or `None` when the EPG has nothing for it.
    async fn current_program(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ProgramInfo>>;
}
