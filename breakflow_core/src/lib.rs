#![forbid(unsafe_code)]

//! Core domain model and timing engine for the Breakflow break reminder.
//!
//! This crate provides:
//! - Domain types (phases, exercises, sessions, snapshots)
//! - Drift-free countdowns and a clock abstraction
//! - Exercise catalog and rotation
//! - Camera attachment broker
//! - The phase engine that ties them together

pub mod types;
pub mod error;
pub mod clock;
pub mod countdown;
pub mod catalog;
pub mod rotator;
pub mod break_session;
pub mod media;
pub mod config;
pub mod logging;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{format_mmss, Countdown, Tick};
pub use rotator::{ExerciseCursor, ExerciseRotator};
pub use break_session::{AdvanceCause, BreakSession};
pub use media::{
    CameraStats, CaptureStream, ConsumerId, FeedbackFeed, MediaBroker, MediaError, MediaEvent,
    MediaSource, SimulatedCamera,
};
pub use config::{Config, Preset, SessionSettings};
pub use engine::{BreakEngine, EngineEvent, EngineOptions, TransitionCause};
