//! Edgelight - Ambient screen lighting engine
//!
//! This crate mirrors the colors at the left and right edges of a screen
//! onto two groups of light fixtures:
//!
//! - **Capture**: a [`FrameGrabber`] backend hands frames to a
//!   [`FrameSource`], which extracts two fixed edge regions
//! - **Reduction**: a [`RegionReducer`] collapses each region to one color
//! - **Handoff**: the latest `(left, right)` pair sits in [`SharedColorState`]
//! - **Dispatch**: a [`LightDispatcher`] classifies both colors and drives
//!   the fixture groups through a [`LightController`]
//!
//! # Architecture
//!
//! Capture and dispatch run as independently clocked loops; the screen is
//! sampled faster than the lights can follow, and unconsumed colors are
//! simply overwritten. The loops share nothing but the color pair and a
//! shutdown signal, both owned by [`Pipeline`].

pub mod capture;
pub mod color;
pub mod config;
pub mod dispatch;
pub mod pipeline;
pub mod reducer;
pub mod sampler;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use capture::synthetic::SyntheticGrabber;
pub use capture::{derive_regions, open_backend, FrameGrabber, FrameSource};
pub use color::{hsl_to_rgb, rgb_to_hsl};
pub use config::Config;
pub use dispatch::{
    hue_to_wire, is_near_black, Effect, LightCommand, LightController, LightDispatcher,
    TraceController,
};
pub use pipeline::Pipeline;
pub use reducer::{make_reducer, AverageReducer, DominantBinReducer, ReducerKind, RegionReducer};
pub use sampler::ScreenSampler;
pub use state::SharedColorState;
pub use types::{
    CaptureError, DispatchError, FixtureId, FixtureTarget, Hsl, PixelBuffer, Region, Rgb, Side,
};
