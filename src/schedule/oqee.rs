use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::{AdWindow, ProgramInfo};

use super::source::ScheduleSource;

pub const DEFAULT_BASE_URL: &str = "https://api.oqee.net/api/v1";

/// EPG requests are anchored to these bucket boundaries.
const EPG_BUCKET_SECS: i64 = 6 * 60 * 60;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct AdSchedule {
    #[serde(default)]
    periods: Vec<Period>,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "type", default)]
    kind: String,
    start_time: Option<i64>,
    end_time: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct EpgPage {
    #[serde(default)]
    entries: Vec<EpgEntry>,
}

#[derive(Debug, Deserialize)]
struct EpgEntry {
    #[serde(rename = "type", default)]
    kind: String,
    live: Option<LiveProgram>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LiveProgram {
    title: Option<String>,
    category: String,
    sub_category: String,
    start: i64,
    end: i64,
    duration_seconds: i64,
    description: String,
}

/// HTTP client for the OQEE anti-adskipping and EPG endpoints.
pub struct OqeeClient {
    http: Client,
    base_url: String,
}

impl OqeeClient {
    pub fn new(base_url: impl Into<String>, request_timeout: std::time::Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build schedule HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned + Default>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{url} returned HTTP {status}");
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("invalid JSON from {url}"))?;
        if !envelope.success {
            bail!("{url} reported success=false");
        }
        Ok(envelope.result.unwrap_or_default())
    }
}

#[async_trait]
impl ScheduleSource for OqeeClient {
    async fn ad_windows(&self, external_id: &str) -> Result<Vec<AdWindow>> {
        let url = format!("{}/live/anti_adskipping/{external_id}", self.base_url);
        let schedule: AdSchedule = self.get(&url).await?;
        Ok(ad_windows_from_periods(schedule.periods))
    }

    async fn current_program(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ProgramInfo>> {
        let anchor = epg_anchor(now);
        let url = format!("{}/epg/by_channel/{external_id}/{anchor}", self.base_url);
        let page: EpgPage = self.get(&url).await?;
        Ok(program_airing_at(page.entries, now))
    }
}

fn ad_windows_from_periods(periods: Vec<Period>) -> Vec<AdWindow> {
    periods
        .into_iter()
        .filter(|p| p.kind == "ad_break")
        .filter_map(|p| {
            let start = DateTime::from_timestamp(p.start_time?, 0)?;
            let window = match p.end_time.and_then(|end| DateTime::from_timestamp(end, 0)) {
                Some(end) => AdWindow::new(start, end),
                None => AdWindow::estimated(start),
            };
            Some(window)
        })
        .collect()
}

fn program_airing_at(entries: Vec<EpgEntry>, now: DateTime<Utc>) -> Option<ProgramInfo> {
    let now_secs = now.timestamp();
    entries
        .into_iter()
        .filter(|e| e.kind == "live")
        .filter_map(|e| e.live)
        .find(|live| live.start <= now_secs && now_secs <= live.end)
        .and_then(|live| {
            let duration = live.end - live.start;
            Some(ProgramInfo {
                title: live
                    .title
                    .unwrap_or_else(|| "Programme inconnu".to_string()),
                category: live.category,
                sub_category: live.sub_category,
                start: DateTime::from_timestamp(live.start, 0)?,
                end: DateTime::from_timestamp(live.end, 0)?,
                duration_seconds: if duration > 0 {
                    duration
                } else {
                    live.duration_seconds
                },
                description: live.description,
            })
        })
}

/// Start of the EPG bucket containing `now`, as a unix timestamp.
pub fn epg_anchor(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(EPG_BUCKET_SECS) * EPG_BUCKET_SECS
}
