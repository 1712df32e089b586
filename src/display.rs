//! Plain-text status summary of what the muter sees.
//!
//! Nothing here feeds back into mute decisions; missing data renders as an
//! idle or "waiting" state rather than stale output.

use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;
use std::fmt::Write;

use crate::models::{AdWindow, PlayerStatus, ProgramInfo, VolumeState};

/// Estimated breaks snap to the programme end when it is closer than this.
const PROGRAM_END_SNAP_SECS: i64 = 15 * 60;
const AGENDA_LEN: usize = 3;
const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub now: DateTime<Utc>,
    pub player: Option<PlayerStatus>,
    pub volume: Option<VolumeState>,
    pub windows: Vec<AdWindow>,
    pub active_window: Option<AdWindow>,
    pub next_window: Option<AdWindow>,
    pub program: Option<ProgramInfo>,
    pub windows_fetched_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub window_ttl: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdProgress {
    /// Window with a known end.
    Exact { remaining_secs: i64, duration_secs: i64, percent: f64 },
    /// Estimated window, shown against the imminent end of the programme.
    UntilProgramEnd { program_end: DateTime<Utc>, percent: f64 },
    /// Estimated window with nothing better to anchor on.
    Elapsed { elapsed_secs: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdStatus {
    Active(AdProgress),
    Upcoming { in_secs: i64, at: DateTime<Utc> },
    /// Every known window is behind us.
    Calm,
    NoData,
    Clear,
}

impl StatusSnapshot {
    pub fn is_tv_off(&self) -> bool {
        self.player.as_ref().is_some_and(|p| !p.is_powered_on())
    }

    pub fn future_count(&self) -> usize {
        self.windows.iter().filter(|w| w.start > self.now).count()
    }

    pub fn ad_status(&self) -> AdStatus {
        if let Some(active) = self.active_window {
            return AdStatus::Active(ad_progress(&active, self.program.as_ref(), self.now));
        }
        if let Some(next) = self.next_window {
            return AdStatus::Upcoming {
                in_secs: next.time_until_start(self.now).num_seconds(),
                at: next.start,
            };
        }
        match (self.windows.len(), self.future_count()) {
            (0, _) => AdStatus::NoData,
            (_, 0) => AdStatus::Calm,
            _ => AdStatus::Clear,
        }
    }

    /// Seconds until the window cache is due for a refresh.
    pub fn refresh_in_secs(&self) -> i64 {
        let age = self
            .windows_fetched_at
            .map(|fetched| self.now - fetched)
            .unwrap_or(self.window_ttl);
        (self.window_ttl - age).num_seconds().max(0)
    }
}

pub fn ad_progress(window: &AdWindow, program: Option<&ProgramInfo>, now: DateTime<Utc>) -> AdProgress {
    let duration = window.duration_secs();
    let remaining = window.time_until_end(now).num_seconds();
    let elapsed = duration - remaining;

    if !window.is_estimated() {
        let percent = if duration > 0 {
            elapsed as f64 / duration as f64 * 100.0
        } else {
            0.0
        };
        return AdProgress::Exact {
            remaining_secs: remaining,
            duration_secs: duration,
            percent,
        };
    }

    match program {
        Some(program) => {
            let program_left = program.time_remaining(now).num_seconds();
            if program_left > 0 && program_left < PROGRAM_END_SNAP_SECS {
                let total = (elapsed + program_left).max(1);
                AdProgress::UntilProgramEnd {
                    program_end: program.end,
                    percent: elapsed as f64 / total as f64 * 100.0,
                }
            } else {
                AdProgress::Elapsed { elapsed_secs: elapsed }
            }
        }
        None => AdProgress::Elapsed { elapsed_secs: elapsed },
    }
}

/// `1h05`, `4m07`, `42s`.
pub fn fmt_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs >= 3600 {
        format!("{}h{:02}", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

fn clock(at: DateTime<Utc>, pattern: &str) -> String {
    at.with_timezone(&Local).format(pattern).to_string()
}

fn bar(percent: f64, fill: char, empty: char) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64) as usize;
    let mut out = String::with_capacity(BAR_WIDTH * 3);
    out.extend(std::iter::repeat(fill).take(filled));
    out.extend(std::iter::repeat(empty).take(BAR_WIDTH - filled));
    out
}

pub fn render(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();

    if snapshot.is_tv_off() {
        let _ = writeln!(out, "Freebox Player | TV off, no channel watched");
        let _ = writeln!(out, "Waiting for activity...");
        return out;
    }

    match (&snapshot.player, &snapshot.program) {
        (Some(player), Some(program)) => {
            let _ = writeln!(
                out,
                "{} | channel {} | LIVE",
                player.channel_name, player.channel_number
            );
            let _ = writeln!(out, "{}", program.title);
            let mut meta = program.category.clone();
            if !program.sub_category.is_empty() {
                let _ = write!(meta, " > {}", program.sub_category);
            }
            let _ = writeln!(out, "{meta} | ends {}", clock(program.end, "%H:%M"));
            let pct = program.progress_percentage(snapshot.now);
            let _ = writeln!(out, "{} {pct:.0}%", bar(pct, '━', '─'));
        }
        (Some(player), None) => {
            let _ = writeln!(out, "{} | #{}", player.channel_name, player.channel_number);
        }
        _ => {}
    }
    out.push('\n');

    let volume = match snapshot.volume {
        Some(v) if v.mute => format!("MUTED ({})", v.level),
        Some(v) => format!("on ({})", v.level),
        None => "unknown".to_string(),
    };
    let total = snapshot.windows.len();
    let future = snapshot.future_count();
    let _ = writeln!(out, "Volume : {volume}");
    let _ = writeln!(out, "Ads    : {total} detected ({} past, {future} upcoming)", total - future);

    let status = snapshot.ad_status();
    let line = match &status {
        AdStatus::Active(AdProgress::Exact { remaining_secs, duration_secs, .. }) => {
            format!("AD BREAK | {remaining_secs}s left of {duration_secs}s")
        }
        AdStatus::Active(AdProgress::UntilProgramEnd { program_end, .. }) => {
            format!("AD BREAK | until programme end ({})", clock(*program_end, "%H:%M"))
        }
        AdStatus::Active(AdProgress::Elapsed { elapsed_secs }) => {
            format!("AD BREAK | elapsed {}m {:02}s", elapsed_secs / 60, elapsed_secs % 60)
        }
        AdStatus::Upcoming { in_secs, at } => format!(
            "next ad in {} | scheduled {}",
            fmt_duration(*in_secs),
            clock(*at, "%H:%M:%S")
        ),
        AdStatus::Calm => "all clear | no more ads detected for this programme".to_string(),
        AdStatus::NoData => "no ad info | waiting for data...".to_string(),
        AdStatus::Clear => "no ad | programme playing".to_string(),
    };
    let _ = writeln!(out, "Status : {line}");

    if let AdStatus::Active(progress) = &status {
        let rendered = match progress {
            AdProgress::Exact { percent, .. } => format!("{} {percent:.0}%", bar(*percent, '█', '░')),
            AdProgress::UntilProgramEnd { percent, .. } => {
                format!("{} {percent:.0}%", bar(*percent, '▓', '░'))
            }
            AdProgress::Elapsed { .. } => format!("{} ...", bar(100.0, '▓', '░')),
        };
        let _ = writeln!(out, "{rendered}");
    }
    out.push('\n');

    let _ = writeln!(out, " {} | now", clock(snapshot.now, "%H:%M"));
    for window in snapshot
        .windows
        .iter()
        .filter(|w| w.start > snapshot.now)
        .take(AGENDA_LEN)
    {
        let wait = window.time_until_start(snapshot.now).num_seconds();
        let marker = if wait < 60 { "!!" } else { "--" };
        let _ = writeln!(
            out,
            " {} | {marker} ad in {} ({})",
            clock(window.start, "%H:%M"),
            fmt_duration(wait),
            fmt_duration(window.duration_secs())
        );
    }
    if let Some(program) = &snapshot.program {
        let _ = writeln!(out, " {} | end: {}", clock(program.end, "%H:%M"), program.title);
    }

    if snapshot.active_window.is_none() && future == 0 {
        let _ = writeln!(out, "\nauto refresh in {}s...", snapshot.refresh_in_secs());
    }

    out
}
