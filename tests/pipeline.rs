//! End-to-end tests for the capture-to-dispatch pipeline.
//!
//! These tests run the real [`Pipeline`] over scripted capture backends and a
//! recording light controller, checking the whole path from pixels in a
//! frame to commands at the fixture groups, plus the shutdown and failure
//! behavior in between.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use edgelight::config::DispatchConfig;
use edgelight::types::BYTES_PER_PIXEL;
use edgelight::{
    hue_to_wire, make_reducer, CaptureError, DispatchError, Effect, FixtureId, FixtureTarget,
    FrameGrabber, FrameSource, LightCommand, LightController, LightDispatcher, Pipeline,
    ReducerKind, Rgb, ScreenSampler, SharedColorState, Side,
};
use tokio::sync::Barrier;

/// Paint a packed BGRA frame with solid left and right halves
fn halves_frame(width: u32, height: u32, left: Rgb, right: Rgb) -> Vec<u8> {
    let mut frame = vec![0; width as usize * height as usize * BYTES_PER_PIXEL];
    for y in 0..height {
        for x in 0..width {
            let color = if x < width / 2 { left } else { right };
            let offset = (y as usize * width as usize + x as usize) * BYTES_PER_PIXEL;
            frame[offset] = color.b;
            frame[offset + 1] = color.g;
            frame[offset + 2] = color.r;
            frame[offset + 3] = 255;
        }
    }
    frame
}

/// Backend that serves the same two-tone frame forever
struct HalvesGrabber {
    width: u32,
    height: u32,
    frame: Vec<u8>,
}

impl HalvesGrabber {
    fn new(width: u32, height: u32, left: Rgb, right: Rgb) -> Self {
        Self {
            width,
            height,
            frame: halves_frame(width, height, left, right),
        }
    }
}

impl FrameGrabber for HalvesGrabber {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn acquire_next_frame(&mut self) -> Result<bool, CaptureError> {
        Ok(true)
    }

    fn frame_bytes(&self) -> &[u8] {
        &self.frame
    }

    fn release_frame(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}

/// Backend that swaps its two halves on every acquired frame
struct FlipFlopGrabber {
    width: u32,
    height: u32,
    first: Rgb,
    second: Rgb,
    frame: Vec<u8>,
    flipped: bool,
}

impl FlipFlopGrabber {
    fn new(width: u32, height: u32, first: Rgb, second: Rgb) -> Self {
        Self {
            width,
            height,
            first,
            second,
            frame: halves_frame(width, height, first, second),
            flipped: false,
        }
    }
}

impl FrameGrabber for FlipFlopGrabber {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn acquire_next_frame(&mut self) -> Result<bool, CaptureError> {
        self.flipped = !self.flipped;
        let (left, right) = if self.flipped {
            (self.second, self.first)
        } else {
            (self.first, self.second)
        };
        self.frame = halves_frame(self.width, self.height, left, right);
        Ok(true)
    }

    fn frame_bytes(&self) -> &[u8] {
        &self.frame
    }

    fn release_frame(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}

/// Controller that records every send and can be scripted to fail
#[derive(Clone, Default)]
struct RecordingController {
    sent: Arc<Mutex<Vec<(LightCommand, Vec<FixtureId>)>>>,
    /// Fail every send once this many commands were recorded
    fail_from: Option<usize>,
    /// Fail sends addressed to exactly these fixtures
    fail_for: Option<Vec<FixtureId>>,
    /// Rendezvous point entered by color commands before recording
    barrier: Option<Arc<Barrier>>,
}

impl RecordingController {
    fn new() -> Self {
        Self::default()
    }

    fn sent(&self) -> Vec<(LightCommand, Vec<FixtureId>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LightController for RecordingController {
    async fn send_command(
        &self,
        command: &LightCommand,
        fixture_ids: &[FixtureId],
    ) -> Result<(), DispatchError> {
        if let Some(barrier) = &self.barrier {
            // Only color commands rendezvous; the reset is a single send
            if command.hue.is_some() {
                barrier.wait().await;
            }
        }

        let mut sent = self.sent.lock().unwrap();
        if let Some(n) = self.fail_from {
            if sent.len() >= n {
                return Err(DispatchError::Send("bridge unreachable".to_string()));
            }
        }
        if let Some(fail_ids) = &self.fail_for {
            if fixture_ids == fail_ids.as_slice() {
                return Err(DispatchError::Rejected(format!(
                    "fixtures {:?} offline",
                    fixture_ids
                )));
            }
        }

        sent.push((command.clone(), fixture_ids.to_vec()));
        Ok(())
    }
}

fn left_ids() -> Vec<FixtureId> {
    vec!["7".to_string()]
}

fn right_ids() -> Vec<FixtureId> {
    vec!["9".to_string()]
}

/// Assemble and start a pipeline over the given backend and controller
fn start_pipeline<G: FrameGrabber + 'static>(
    grabber: G,
    controller: RecordingController,
    capture_ms: u64,
    dispatch_ms: u64,
) -> Pipeline {
    let source = FrameSource::new(grabber, 0.125, 0.66);
    let state = SharedColorState::new();
    let sampler = ScreenSampler::new(source, make_reducer(ReducerKind::Average), state.clone());
    let dispatcher = LightDispatcher::new(
        controller,
        state,
        FixtureTarget::new(Side::Left, left_ids()),
        FixtureTarget::new(Side::Right, right_ids()),
        DispatchConfig::default(),
    );

    Pipeline::start(
        sampler,
        dispatcher,
        Duration::from_millis(capture_ms),
        Duration::from_millis(dispatch_ms),
    )
}

/// A red-left, blue-right screen ends up as one reset plus per-side color
/// commands carrying the right hues and the fixed on-levels.
#[tokio::test]
async fn test_red_blue_screen_reaches_both_fixture_groups() {
    let controller = RecordingController::new();
    let grabber = HalvesGrabber::new(640, 360, Rgb::new(255, 0, 0), Rgb::new(0, 0, 255));

    let mut pipeline = start_pipeline(grabber, controller.clone(), 5, 20);
    tokio::time::sleep(Duration::from_millis(100)).await;
    pipeline.shutdown().await.unwrap();

    let sent = controller.sent();
    assert!(sent.len() >= 5, "expected reset plus ticks, got {}", sent.len());

    // The reset goes out first, to every fixture of both groups
    let (reset, reset_ids) = &sent[0];
    assert_eq!(reset.effect, Some(Effect::None));
    assert_eq!(reset.transition_time, Some(0));
    assert_eq!(reset_ids, &vec!["7".to_string(), "9".to_string()]);

    // Once the sampler has published, the left group mirrors red and the
    // right group mirrors blue with the configured on-levels
    let last_left = sent.iter().rev().find(|(_, ids)| ids == &left_ids()).unwrap();
    let last_right = sent.iter().rev().find(|(_, ids)| ids == &right_ids()).unwrap();

    assert_eq!(
        last_left.0,
        LightCommand {
            hue: Some(hue_to_wire(0)),
            saturation: Some(254),
            brightness: Some(200),
            ..LightCommand::default()
        }
    );
    assert_eq!(
        last_right.0,
        LightCommand {
            hue: Some(hue_to_wire(170)),
            saturation: Some(254),
            brightness: Some(200),
            ..LightCommand::default()
        }
    );
}

/// Both side commands of one tick must be in flight at the same time; a
/// two-party barrier inside the controller deadlocks if they are sequential.
#[tokio::test]
async fn test_tick_dispatches_both_sides_concurrently() {
    let controller = RecordingController {
        barrier: Some(Arc::new(Barrier::new(2))),
        ..RecordingController::default()
    };

    let state = SharedColorState::new();
    state.store(Rgb::new(255, 0, 0), Rgb::new(0, 0, 255));
    let dispatcher = LightDispatcher::new(
        controller.clone(),
        state,
        FixtureTarget::new(Side::Left, left_ids()),
        FixtureTarget::new(Side::Right, right_ids()),
        DispatchConfig::default(),
    );

    tokio::time::timeout(Duration::from_secs(1), dispatcher.tick())
        .await
        .expect("sequential sends would deadlock on the barrier")
        .unwrap();

    assert_eq!(controller.sent().len(), 2);
}

/// After shutdown returns, no further commands reach the controller.
#[tokio::test]
async fn test_shutdown_stops_all_commands() {
    let controller = RecordingController::new();
    let grabber = HalvesGrabber::new(640, 360, Rgb::new(200, 200, 200), Rgb::new(30, 30, 30));

    let mut pipeline = start_pipeline(grabber, controller.clone(), 5, 10);
    tokio::time::sleep(Duration::from_millis(50)).await;
    pipeline.shutdown().await.unwrap();

    let count_after_shutdown = controller.sent().len();
    assert!(count_after_shutdown > 0);

    // Several dispatch periods later the count has not moved
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(controller.sent().len(), count_after_shutdown);
}

#[tokio::test]
async fn test_shutdown_twice_returns_immediately() {
    let controller = RecordingController::new();
    let grabber = HalvesGrabber::new(640, 360, Rgb::BLACK, Rgb::BLACK);

    let mut pipeline = start_pipeline(grabber, controller, 5, 10);
    pipeline.shutdown().await.unwrap();
    pipeline.shutdown().await.unwrap();
}

/// A send failure ends the dispatch loop on its own; the error surfaces
/// from shutdown and nothing is sent afterwards.
#[tokio::test]
async fn test_send_failure_ends_dispatch_loop() {
    let controller = RecordingController {
        fail_from: Some(5),
        ..RecordingController::default()
    };
    let grabber = HalvesGrabber::new(640, 360, Rgb::new(255, 0, 0), Rgb::new(0, 0, 255));

    let mut pipeline = start_pipeline(grabber, controller.clone(), 5, 10);

    // Reset + two full ticks succeed; the loop must stop by itself on the
    // third tick's failure
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !pipeline.is_dispatch_finished() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "dispatch loop did not fail fast"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let count_at_failure = controller.sent().len();
    assert_eq!(count_at_failure, 5);

    let result = pipeline.shutdown().await;
    assert!(matches!(result, Err(DispatchError::Send(_))));
    assert_eq!(controller.sent().len(), count_at_failure);
}

/// One unreachable group is enough to end the loop, even though the other
/// side's send succeeded.
#[tokio::test]
async fn test_single_group_failure_is_fatal() {
    let controller = RecordingController {
        fail_for: Some(right_ids()),
        ..RecordingController::default()
    };
    let grabber = HalvesGrabber::new(640, 360, Rgb::new(255, 0, 0), Rgb::new(0, 0, 255));

    let mut pipeline = start_pipeline(grabber, controller.clone(), 5, 10);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !pipeline.is_dispatch_finished() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "dispatch loop did not fail fast"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let result = pipeline.shutdown().await;
    assert!(matches!(result, Err(DispatchError::Rejected(_))));
}

/// With the screen flipping red/blue between frames, every dispatched tick
/// still carries one red and one blue side; a torn pair would repeat the
/// same hue on both.
#[tokio::test]
async fn test_sides_never_tear_through_the_pipeline() {
    let controller = RecordingController::new();
    let grabber = FlipFlopGrabber::new(640, 360, Rgb::new(255, 0, 0), Rgb::new(0, 0, 255));

    let mut pipeline = start_pipeline(grabber, controller.clone(), 2, 5);
    tokio::time::sleep(Duration::from_millis(100)).await;
    pipeline.shutdown().await.unwrap();

    let sent = controller.sent();
    // Skip the reset, then walk tick pairs
    let ticks = sent[1..].chunks_exact(2);
    let mut color_pairs = 0;
    for pair in ticks {
        let (first, second) = (&pair[0], &pair[1]);
        // Each tick addresses both groups exactly once
        let mut ids: Vec<_> = vec![first.1.clone(), second.1.clone()];
        ids.sort();
        assert_eq!(ids, vec![left_ids(), right_ids()]);

        // Both sides saturated means both came from real frame colors; the
        // two hues must then differ (one red side, one blue side)
        if first.0.saturation == Some(254) && second.0.saturation == Some(254) {
            assert_ne!(first.0.hue, second.0.hue, "torn pair: {:?} / {:?}", first, second);
            color_pairs += 1;
        }
    }
    assert!(color_pairs >= 5, "expected several color ticks, got {}", color_pairs);
}
