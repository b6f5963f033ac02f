//! Fixture-side loop: classify the latest colors and fan commands out.
//!
//! Every dispatch tick snapshots the shared pair, converts both sides to HSL,
//! decides between "render the hue" and "effectively off", and sends one
//! command per side to its fixture group. Both sends run concurrently and the
//! tick waits for both. A failed send ends the loop; a dead loop is treated
//! as better than one silently hammering an unreachable bridge.

use crate::color::rgb_to_hsl;
use crate::config::DispatchConfig;
use crate::state::SharedColorState;
use crate::types::{DispatchError, FixtureId, FixtureTarget, Hsl};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

/// Effect field understood by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    None,
    ColorLoop,
}

/// One state change for a set of fixtures.
///
/// Serializes to the bridge's JSON body shape; unset fields are omitted so a
/// command only touches the attributes it names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LightCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<Effect>,

    /// Transition time in the bridge's 100 ms steps
    #[serde(rename = "transitiontime", skip_serializing_if = "Option::is_none")]
    pub transition_time: Option<u16>,

    /// Hue on the bridge's 16-bit wheel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,

    #[serde(rename = "sat", skip_serializing_if = "Option::is_none")]
    pub saturation: Option<u8>,

    #[serde(rename = "bri", skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
}

/// True when a color is too dark or too washed out to render as a hue
pub fn is_near_black(hsl: Hsl, lightness_threshold: u8, saturation_threshold: u8) -> bool {
    hsl.l <= lightness_threshold || hsl.s <= saturation_threshold
}

/// Rescale a byte hue onto the bridge's 16-bit hue wheel
pub fn hue_to_wire(hue: u8) -> u16 {
    (hue as f64 / 255.0 * u16::MAX as f64) as u16
}

/// Transport seam to the lights.
///
/// One call applies one command to every fixture in the slice. Implementations
/// own addressing and authentication; the dispatcher never sees either.
#[async_trait::async_trait]
pub trait LightController: Send + Sync {
    async fn send_command(
        &self,
        command: &LightCommand,
        fixture_ids: &[FixtureId],
    ) -> Result<(), DispatchError>;
}

/// Dry-run controller: logs each command's JSON body instead of sending it.
///
/// Keeps the daemon runnable with no bridge on the network, and makes the
/// exact wire shape visible at debug level.
pub struct TraceController;

#[async_trait::async_trait]
impl LightController for TraceController {
    async fn send_command(
        &self,
        command: &LightCommand,
        fixture_ids: &[FixtureId],
    ) -> Result<(), DispatchError> {
        let body = serde_json::to_string(command)
            .map_err(|e| DispatchError::Send(format!("command serialization: {}", e)))?;
        debug!("Dry-run command to {:?}: {}", fixture_ids, body);
        Ok(())
    }
}

/// Periodic consumer of the shared color pair.
///
/// Owns the controller and both fixture groups. [`run`](Self::run) sends one
/// reset command before the first tick, then mirrors colors until shutdown or
/// the first send failure.
pub struct LightDispatcher<C: LightController> {
    controller: C,
    state: SharedColorState,
    left: FixtureTarget,
    right: FixtureTarget,
    config: DispatchConfig,
}

impl<C: LightController> LightDispatcher<C> {
    pub fn new(
        controller: C,
        state: SharedColorState,
        left: FixtureTarget,
        right: FixtureTarget,
        config: DispatchConfig,
    ) -> Self {
        Self {
            controller,
            state,
            left,
            right,
            config,
        }
    }

    /// Build the per-tick command for one side's HSL color.
    ///
    /// Near-black colors keep their hue but force saturation and brightness
    /// to zero; anything else gets the fixed on-levels.
    fn command_for(&self, hsl: Hsl) -> LightCommand {
        let dark = is_near_black(
            hsl,
            self.config.near_black_lightness,
            self.config.near_black_saturation,
        );

        LightCommand {
            hue: Some(hue_to_wire(hsl.h)),
            saturation: Some(if dark { 0 } else { self.config.on_saturation }),
            brightness: Some(if dark { 0 } else { self.config.on_brightness }),
            ..LightCommand::default()
        }
    }

    /// Clear effects and make transitions instant on every fixture of both
    /// groups before mirroring starts
    async fn send_reset(&self) -> Result<(), DispatchError> {
        let reset = LightCommand {
            effect: Some(Effect::None),
            transition_time: Some(0),
            ..LightCommand::default()
        };

        let all: Vec<FixtureId> = self
            .left
            .fixture_ids
            .iter()
            .chain(self.right.fixture_ids.iter())
            .cloned()
            .collect();

        debug!("Resetting {} fixtures", all.len());
        self.controller.send_command(&reset, &all).await
    }

    /// One dispatch tick: snapshot the pair, send both side commands
    /// concurrently, wait for both
    pub async fn tick(&self) -> Result<(), DispatchError> {
        let (left_color, right_color) = self.state.load();
        let left_cmd = self.command_for(rgb_to_hsl(left_color));
        let right_cmd = self.command_for(rgb_to_hsl(right_color));

        trace!(
            "Dispatching left={:?} right={:?}",
            left_cmd.hue,
            right_cmd.hue
        );

        let (left_sent, right_sent) = tokio::join!(
            self.controller.send_command(&left_cmd, &self.left.fixture_ids),
            self.controller.send_command(&right_cmd, &self.right.fixture_ids),
        );
        left_sent?;
        right_sent?;
        Ok(())
    }

    /// Run ticks every `period` until `shutdown` fires or a send fails.
    ///
    /// The failure policy is fail-fast: the first send error ends the loop
    /// and surfaces through the returned `Result`. An in-flight tick is never
    /// interrupted; a shutdown that lands mid-tick takes effect right after
    /// the tick completes.
    pub async fn run(
        self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), DispatchError> {
        self.send_reset().await?;
        info!(
            "Light dispatch started ({}ms period, left fixtures {:?}, right fixtures {:?})",
            period.as_millis(),
            self.left.fixture_ids,
            self.right.fixture_ids
        );

        let mut ticks = tokio::time::interval(period);
        // A slow bridge pushes the next tick out rather than causing a burst
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticks.tick() => self.tick().await?,
            }
        }
        debug!("Light dispatch stopped");
        Ok(())
    }
}
