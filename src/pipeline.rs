//! Pipeline assembly and lifecycle.
//!
//! Wires the capture loop and the dispatch loop to one shutdown signal and
//! keeps their join handles. The two loops never share anything except the
//! [`SharedColorState`](crate::state::SharedColorState) handle baked into
//! them at construction, so stopping is just: flip the signal, join both.

use crate::capture::FrameGrabber;
use crate::dispatch::{LightController, LightDispatcher};
use crate::sampler::ScreenSampler;
use crate::types::DispatchError;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A running capture/dispatch pair.
///
/// [`shutdown`](Self::shutdown) is idempotent; the first call signals both
/// loops, waits for them to finish, and reports the dispatch loop's terminal
/// error if it had one (including a fail-fast exit that happened long before
/// the shutdown).
pub struct Pipeline {
    shutdown_tx: watch::Sender<bool>,
    capture_task: Option<JoinHandle<()>>,
    dispatch_task: Option<JoinHandle<Result<(), DispatchError>>>,
}

impl Pipeline {
    /// Spawn both loops on the current runtime
    pub fn start<G, C>(
        sampler: ScreenSampler<G>,
        dispatcher: LightDispatcher<C>,
        capture_period: Duration,
        dispatch_period: Duration,
    ) -> Self
    where
        G: FrameGrabber + 'static,
        C: LightController + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let capture_task = tokio::spawn(sampler.run(capture_period, shutdown_rx.clone()));
        let dispatch_task = tokio::spawn(dispatcher.run(dispatch_period, shutdown_rx));

        info!(
            "Pipeline started (capture {}ms, dispatch {}ms)",
            capture_period.as_millis(),
            dispatch_period.as_millis()
        );

        Self {
            shutdown_tx,
            capture_task: Some(capture_task),
            dispatch_task: Some(dispatch_task),
        }
    }

    /// Whether the dispatch loop has already stopped on its own, which after
    /// startup only happens on a fail-fast send error
    pub fn is_dispatch_finished(&self) -> bool {
        self.dispatch_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(true)
    }

    /// Signal both loops and wait for them to exit.
    ///
    /// Safe to call again after the first completed call; later calls return
    /// `Ok` immediately.
    pub async fn shutdown(&mut self) -> Result<(), DispatchError> {
        // send only fails when every receiver is gone, i.e. the loops have
        // already exited on their own
        let _ = self.shutdown_tx.send(true);

        if let Some(task) = self.capture_task.take() {
            if task.await.is_err() {
                warn!("Capture task panicked");
            }
        }

        if let Some(task) = self.dispatch_task.take() {
            match task.await {
                Ok(result) => return result,
                Err(_) => warn!("Dispatch task panicked"),
            }
        }

        Ok(())
    }
}
