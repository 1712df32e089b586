pub mod freebox;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PlayerStatus, VolumeState};

pub use freebox::{FreeboxClient, FreeboxConfig};

/// Steps shown to the operator when the app token lacks player control.
pub const PERMISSION_HELP: &str = "\
The application is not allowed to control the Freebox Player.

  1. Open http://mafreebox.freebox.fr (or http://192.168.1.254) and log in
  2. Go to Freebox settings > Access management > Applications
  3. Find this application and enable \"Freebox Player control\"
  4. Save and restart admute";

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("missing device permission '{0}'")]
    PermissionDenied(String),

    #[error("device authentication failed: {0}")]
    Auth(String),

    #[error("device request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("device API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("unexpected device response: {0}")]
    Malformed(String),

    #[error("no player found on the device")]
    NoPlayer,
}

impl DeviceError {
    /// Errors that should stop the process rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeviceError::PermissionDenied(_))
    }
}

/// Control surface of the set-top box player.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    async fn status(&self) -> Result<PlayerStatus, DeviceError>;

    async fn volume(&self) -> Result<VolumeState, DeviceError>;

    async fn set_mute(&self, mute: bool) -> Result<(), DeviceError>;
}
