use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AdWindow;

/// Whether the mute currently on the device belongs to us.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MuteState {
    #[default]
    Unmuted,
    /// We issued the mute and are responsible for lifting it.
    Muted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MuteCommand {
    SetMute(bool),
}

impl MuteCommand {
    pub fn mute(self) -> bool {
        match self {
            MuteCommand::SetMute(mute) => mute,
        }
    }
}

/// Inputs to one evaluation. The device's observed mute is input only; the
/// engine never stores it.
#[derive(Debug, Clone, Copy)]
pub struct MuteInputs {
    pub now: DateTime<Utc>,
    pub active_window: Option<AdWindow>,
    pub next_window: Option<AdWindow>,
    pub lookahead: Duration,
    pub device_muted: bool,
}

impl MuteInputs {
    /// Muted during a window, and ahead of one starting within the
    /// look-ahead. A window starting exactly now is already active.
    pub fn should_be_muted(&self) -> bool {
        if self.active_window.is_some() {
            return true;
        }
        self.next_window.is_some_and(|next| {
            let until = next.start - self.now;
            until > Duration::zero() && until <= self.lookahead
        })
    }
}

/// Two-state machine that mutes around ad windows and only ever lifts a mute
/// it applied itself.
#[derive(Debug, Clone, Default)]
pub struct MuteEngine {
    state: MuteState,
}

impl MuteEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MuteState {
        self.state
    }

    pub fn muted_by_system(&self) -> bool {
        self.state == MuteState::Muted
    }

    /// Decide which command, if any, the device needs this tick.
    ///
    /// Ownership is taken as soon as a mute is proposed and only released
    /// once an unmute is confirmed by [`MuteEngine::command_applied`] or the
    /// device is seen unmuted. A command that fails or is abandoned mid-flight
    /// therefore leaves the engine still responsible for the mute.
    pub fn evaluate(&mut self, inputs: &MuteInputs) -> Option<MuteCommand> {
        let should_mute = inputs.should_be_muted();

        match (should_mute, inputs.device_muted, self.state) {
            (true, false, _) => {
                self.state = MuteState::Muted;
                Some(MuteCommand::SetMute(true))
            }
            (false, true, MuteState::Muted) => Some(MuteCommand::SetMute(false)),
            // Someone lifted our mute; a later manual mute is theirs.
            (false, false, MuteState::Muted) => {
                self.state = MuteState::Unmuted;
                None
            }
            _ => None,
        }
    }

    /// The device accepted `command`.
    pub fn command_applied(&mut self, command: MuteCommand) {
        self.state = match command {
            MuteCommand::SetMute(true) => MuteState::Muted,
            MuteCommand::SetMute(false) => MuteState::Unmuted,
        };
    }
}
