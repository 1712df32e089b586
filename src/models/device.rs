use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of what the player reports about itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub power_state: String,
    pub playback_state: String,
    pub channel_id: String,
    pub channel_number: i64,
    pub channel_name: String,
}

impl PlayerStatus {
    /// Parses the player's status payload. Every field is optional upstream
    /// and falls back to a neutral default.
    pub fn from_api(result: &Value) -> Self {
        let channel = &result["foreground_app"]["context"]["channel"];
        Self {
            power_state: str_or(&result["power_state"], "unknown"),
            playback_state: str_or(&result["player"]["state"]["playback_state"], "stopped"),
            channel_id: str_or(&channel["channelUuid"], ""),
            channel_number: channel["channelNumber"].as_i64().unwrap_or(0),
            channel_name: str_or(&channel["channelName"], ""),
        }
    }

    pub fn is_powered_on(&self) -> bool {
        self.power_state == "running"
    }

    pub fn is_playing(&self) -> bool {
        self.playback_state == "playing"
    }

    /// Whether the player is on and showing live content worth tracking.
    pub fn is_watching(&self) -> bool {
        self.is_powered_on() && self.is_playing() && !self.channel_id.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeState {
    pub mute: bool,
    pub level: i64,
}

impl VolumeState {
    pub fn from_api(result: &Value) -> Self {
        Self {
            mute: result["mute"].as_bool().unwrap_or(false),
            level: result["volume"].as_i64().unwrap_or(0),
        }
    }
}

fn str_or(value: &Value, default: &str) -> String {
    value.as_str().unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_status() {
        let payload = json!({
            "power_state": "running",
            "player": { "state": { "playback_state": "playing" } },
            "foreground_app": { "context": { "channel": {
                "channelUuid": "uuid-webtv-612",
                "channelNumber": 1,
                "channelName": "TF1"
            }}}
        });
        let status = PlayerStatus::from_api(&payload);
        assert!(status.is_watching());
        assert_eq!(status.channel_id, "uuid-webtv-612");
        assert_eq!(status.channel_number, 1);
        assert_eq!(status.channel_name, "TF1");
    }

    #[test]
    fn missing_fields_default_to_idle() {
        let status = PlayerStatus::from_api(&json!({}));
        assert_eq!(status.power_state, "unknown");
        assert_eq!(status.playback_state, "stopped");
        assert!(!status.is_watching());
    }

    #[test]
    fn standby_player_is_not_watching() {
        let payload = json!({
            "power_state": "standby",
            "player": { "state": { "playback_state": "playing" } },
            "foreground_app": { "context": { "channel": { "channelUuid": "uuid-webtv-612" }}}
        });
        assert!(!PlayerStatus::from_api(&payload).is_watching());
    }

    #[test]
    fn volume_defaults_unmuted() {
        assert_eq!(
            VolumeState::from_api(&json!({ "volume": 42 })),
            VolumeState { mute: false, level: 42 }
        );
    }
}
