use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    device::DeviceClient,
    display::{self, StatusSnapshot},
    models::{PlayerStatus, VolumeState},
    mute::{MuteEngine, MuteInputs},
    schedule::AdCache,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// ANSI: clear screen, cursor home.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Player on and playing a channel; cache and mute logic ran.
    Watching,
    /// Player off, paused or on a non-channel app; nothing fetched.
    Idle,
    /// The player could not be reached this tick.
    Unavailable,
}

#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub fast: Duration,
    pub slow: Duration,
    pub cycle_timeout: Duration,
    pub show_status: bool,
}

impl Cadence {
    pub fn delay_after(&self, outcome: CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Watching => self.fast,
            CycleOutcome::Idle | CycleOutcome::Unavailable => self.slow,
        }
    }
}

/// Owns everything one polling cycle touches. Driven by a single task, so
/// nothing here needs locking.
pub struct PollWorker {
    device: Arc<dyn DeviceClient>,
    cache: AdCache,
    engine: MuteEngine,
    last_status: Option<PlayerStatus>,
    last_volume: Option<VolumeState>,
}

impl PollWorker {
    pub fn new(device: Arc<dyn DeviceClient>, cache: AdCache) -> Self {
        Self {
            device,
            cache,
            engine: MuteEngine::new(),
            last_status: None,
            last_volume: None,
        }
    }

    pub fn engine(&self) -> &MuteEngine {
        &self.engine
    }

    pub fn cache(&self) -> &AdCache {
        &self.cache
    }

    /// One status -> cache -> decision -> command pass. Failures are logged
    /// and degrade to "no data"; nothing escapes.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleOutcome {
        let status = match self.device.status().await {
            Ok(status) => status,
            Err(err) => {
                log_warn!("player status unavailable: {err}");
                self.last_status = None;
                self.last_volume = None;
                return CycleOutcome::Unavailable;
            }
        };
        let watching = status.is_watching();
        let channel_id = status.channel_id.clone();
        self.last_status = Some(status);

        if !watching {
            log_debug!("player idle, skipping schedule checks");
            return CycleOutcome::Idle;
        }

        self.cache.update(&channel_id, now).await;

        let volume = match self.device.volume().await {
            Ok(volume) => volume,
            Err(err) => {
                log_warn!("player volume unavailable: {err}");
                self.last_volume = None;
                return CycleOutcome::Watching;
            }
        };
        self.last_volume = Some(volume);

        let inputs = MuteInputs {
            now,
            active_window: self.cache.active_window(now),
            next_window: self.cache.next_window(now),
            lookahead: self.cache.config().lookahead,
            device_muted: volume.mute,
        };

        if let Some(command) = self.engine.evaluate(&inputs) {
            let mute = command.mute();
            match self.device.set_mute(mute).await {
                Ok(()) => {
                    self.engine.command_applied(command);
                    if !mute {
                        log_info!("ad break over, unmuted");
                    } else if let Some(window) = inputs.active_window.or(inputs.next_window) {
                        log_info!("muted for ad break {window}");
                    }
                    self.last_volume = Some(VolumeState { mute, ..volume });
                }
                // Ownership is left as is; the next tick re-evaluates
                // against the observed device state.
                Err(err) => log_error!("failed to set mute={mute}: {err}"),
            }
        }

        CycleOutcome::Watching
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> StatusSnapshot {
        StatusSnapshot {
            now,
            player: self.last_status.clone(),
            volume: self.last_volume,
            windows: self.cache.windows().to_vec(),
            active_window: self.cache.active_window(now),
            next_window: self.cache.next_window(now),
            program: self.cache.current_program().cloned(),
            windows_fetched_at: self.cache.windows_fetched_at(),
            window_ttl: self.cache.config().window_ttl,
        }
    }
}

pub async fn polling_loop(mut worker: PollWorker, cadence: Cadence, cancel_token: CancellationToken) {
    while !cancel_token.is_cancelled() {
        let now = Utc::now();
        let outcome = match tokio::time::timeout(cadence.cycle_timeout, worker.run_cycle(now)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                log_warn!("poll cycle timed out (> {:?})", cadence.cycle_timeout);
                CycleOutcome::Unavailable
            }
        };

        if cadence.show_status {
            print_status(&worker.snapshot(Utc::now()));
        }

        tokio::select! {
            _ = tokio::time::sleep(cadence.delay_after(outcome)) => {}
            _ = cancel_token.cancelled() => {
                log_info!("polling loop shutting down");
                break;
            }
        }
    }
}

fn print_status(snapshot: &StatusSnapshot) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "{CLEAR_SCREEN}{}", display::render(snapshot));
    let _ = stdout.flush();
}
