//! Edge-triggered pulse detection and continuous amplitude following for
//! jaw synchronization.

use crate::config::{FollowConfig, PulseConfig};

/// Jaw position state for one output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JawState {
    Closed,
    Open,
}

/// Converts envelope threshold crossings into percussive open/close pulses.
///
/// Detection and release are decoupled: a pulse fires on a rising edge of the
/// amplitude (previous sample below the threshold, current at or above it)
/// gated by a cooldown since the last trigger, while the jaw closes again on
/// a pure timer once the open duration has passed, independent of whatever
/// the amplitude does in the meantime. The cooldown prevents re-triggering
/// mid-syllable; the timed release is what makes the motion look like chomps
/// instead of tracking.
#[derive(Debug)]
pub struct PulseTrigger {
    config: PulseConfig,
    state: JawState,
    opened_at: f64,
    last_trigger: f64,
    was_above: bool,
}

impl PulseTrigger {
    pub fn new(config: PulseConfig) -> Self {
        Self {
            config,
            state: JawState::Closed,
            opened_at: 0.0,
            // Backdate so an edge right at t = 0 can fire.
            last_trigger: -config.cooldown,
            was_above: false,
        }
    }

    pub fn state(&self) -> JawState {
        self.state
    }

    /// Advances the machine to time `now` with the current envelope
    /// amplitude. Returns the new state when a transition fires, `None` when
    /// the jaw should stay where it is.
    ///
    /// `now` must be monotonically non-decreasing across calls.
    pub fn update(&mut self, now: f64, amplitude: f32) -> Option<JawState> {
        let above = amplitude >= self.config.threshold;
        let mut transition = None;

        if self.state == JawState::Open && now - self.opened_at >= self.config.open_duration {
            self.state = JawState::Closed;
            transition = Some(JawState::Closed);
        }

        if above
            && !self.was_above
            && self.state == JawState::Closed
            && now - self.last_trigger >= self.config.cooldown
        {
            self.state = JawState::Open;
            self.opened_at = now;
            self.last_trigger = now;
            transition = Some(JawState::Open);
        }

        self.was_above = above;
        transition
    }
}

/// Smoothly tracks the envelope instead of pulsing (AMPLITUDE mode).
///
/// The amplitude is shaped by `gamma` to boost quiet content and compress
/// peaks, then exponentially smoothed to suppress chunk-boundary jitter.
#[derive(Debug)]
pub struct AmplitudeFollower {
    config: FollowConfig,
    output: f32,
}

impl AmplitudeFollower {
    pub fn new(config: FollowConfig) -> Self {
        Self {
            config,
            output: 0.0,
        }
    }

    /// Feeds one envelope sample and returns the smoothed jaw openness.
    pub fn update(&mut self, amplitude: f32) -> f32 {
        let target = amplitude.clamp(0.0, 1.0).powf(self.config.gamma);
        self.output =
            self.output * self.config.smoothing + target * (1.0 - self.config.smoothing);
        self.output
    }

    pub fn output(&self) -> f32 {
        self.output
    }
}
