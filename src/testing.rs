//! Call-counting fakes for the schedule service and the player.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::device::{DeviceClient, DeviceError};
use crate::models::{AdWindow, PlayerStatus, ProgramInfo, VolumeState};
use crate::schedule::ScheduleSource;

pub const TRACKED: &str = "uuid-webtv-612";
pub const OTHER_TRACKED: &str = "uuid-webtv-613";

#[derive(Default)]
pub struct FakeSource {
    pub windows: Mutex<Vec<AdWindow>>,
    pub program: Mutex<Option<ProgramInfo>>,
    pub fail: Mutex<bool>,
    window_calls: AtomicUsize,
    program_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_windows(windows: Vec<AdWindow>) -> Arc<Self> {
        let source = Self::default();
        *source.windows.lock().unwrap() = windows;
        Arc::new(source)
    }

    pub fn set_windows(&self, windows: Vec<AdWindow>) {
        *self.windows.lock().unwrap() = windows;
    }

    pub fn set_program(&self, program: Option<ProgramInfo>) {
        *self.program.lock().unwrap() = program;
    }

    pub fn window_calls(&self) -> usize {
        self.window_calls.load(Ordering::SeqCst)
    }

    pub fn program_calls(&self) -> usize {
        self.program_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduleSource for FakeSource {
    async fn ad_windows(&self, _external_id: &str) -> Result<Vec<AdWindow>> {
        self.window_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            bail!("schedule unavailable");
        }
        Ok(self.windows.lock().unwrap().clone())
    }

    async fn current_program(
        &self,
        _external_id: &str,
        _now: DateTime<Utc>,
    ) -> Result<Option<ProgramInfo>> {
        self.program_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.program.lock().unwrap().clone())
    }
}

/// Player whose status, mute flag and failures are scripted by the test.
pub struct FakeDevice {
    pub status: Mutex<Option<PlayerStatus>>,
    pub muted: Mutex<bool>,
    pub fail_volume: Mutex<bool>,
    pub fail_set_mute: Mutex<bool>,
    set_mute_delay: Mutex<Option<Duration>>,
    status_calls: AtomicUsize,
    mute_commands: Mutex<Vec<bool>>,
}

impl FakeDevice {
    pub fn watching(channel_id: &str) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(Some(player("running", "playing", channel_id))),
            muted: Mutex::new(false),
            fail_volume: Mutex::new(false),
            fail_set_mute: Mutex::new(false),
            set_mute_delay: Mutex::new(None),
            status_calls: AtomicUsize::new(0),
            mute_commands: Mutex::new(Vec::new()),
        })
    }

    pub fn set_status(&self, status: Option<PlayerStatus>) {
        *self.status.lock().unwrap() = status;
    }

    /// Makes `set_mute` take this long before it touches the device.
    pub fn set_mute_delay(&self, delay: Option<Duration>) {
        *self.set_mute_delay.lock().unwrap() = delay;
    }

    pub fn set_muted(&self, muted: bool) {
        *self.muted.lock().unwrap() = muted;
    }

    pub fn is_muted(&self) -> bool {
        *self.muted.lock().unwrap()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn mute_commands(&self) -> Vec<bool> {
        self.mute_commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceClient for FakeDevice {
    async fn status(&self) -> Result<PlayerStatus, DeviceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status.lock().unwrap().clone().ok_or(DeviceError::NoPlayer)
    }

    async fn volume(&self) -> Result<VolumeState, DeviceError> {
        if *self.fail_volume.lock().unwrap() {
            return Err(DeviceError::Malformed("volume".into()));
        }
        Ok(VolumeState {
            mute: self.is_muted(),
            level: 20,
        })
    }

    async fn set_mute(&self, mute: bool) -> Result<(), DeviceError> {
        self.mute_commands.lock().unwrap().push(mute);
        let delay = *self.set_mute_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_set_mute.lock().unwrap() {
            return Err(DeviceError::Api {
                code: "internal_error".into(),
                message: "player busy".into(),
            });
        }
        self.set_muted(mute);
        Ok(())
    }
}

pub fn player(power_state: &str, playback_state: &str, channel_id: &str) -> PlayerStatus {
    PlayerStatus {
        power_state: power_state.into(),
        playback_state: playback_state.into(),
        channel_id: channel_id.into(),
        channel_number: 1,
        channel_name: "TF1".into(),
    }
}
