use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::{polling_loop, Cadence, PollWorker};

pub struct PollingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl PollingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self, worker: PollWorker, cadence: Cadence) -> Result<()> {
        if self.handle.is_some() {
            bail!("polling already active");
        }

        info!(
            "Starting polling loop (every {:?} while watching, {:?} otherwise)",
            cadence.fast, cadence.slow
        );

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(worker, cadence, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancels the loop and waits for the current cycle to finish.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("polling loop task failed to join")
        } else {
            Ok(())
        }
    }
}

impl Default for PollingController {
    fn default() -> Self {
        Self::new()
    }
}
