//! Core library for the arm motion playback engine.
//!
//! The crate implements the temporal heart of an SO-101 servo-arm
//! controller: easing curves, pose-to-pose interpolation, resampling of
//! hand-recorded trajectories, loudness-envelope extraction and the
//! pulse state machine that syncs a jaw servo to speech, all driven by a
//! single-threaded cooperative playback loop. Register programming, the
//! serial wire protocol and terminal UI are external collaborators reached
//! through the traits in [`io`].

pub mod config;
pub mod easing;
pub mod envelope;
pub mod error;
pub mod interp;
pub mod io;
pub mod playback;
pub mod pose;
pub mod pulse;

pub use config::{AppConfig, EnvelopeConfig, FollowConfig, JawConfig, MotionConfig, PulseConfig};
pub use easing::EasingMode;
pub use envelope::{AmplitudeEnvelope, EnvelopePoint};
pub use error::{ArmMotionError, Result};
pub use interp::{interpolate, sample_segment, FrameResampler, ResampledFrame};
pub use io::{
    clamp_position, Actuator, AudioLiveness, CancelSource, ManualClock, NeverCancel, SharedCancel,
    SimulatedArm, TickSource, TimedPlayback, WallClock,
};
pub use playback::{
    AudioSyncSettings, NullObserver, PlaybackEngine, SyncMode, TerminalReason, TickObserver,
    TickUpdate,
};
pub use pose::{MotionFrame, MotionRecorder, Pose, RecordedMotion, SavedPoseList};
pub use pulse::{AmplitudeFollower, JawState, PulseTrigger};
