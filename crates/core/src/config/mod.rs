use serde::{Deserialize, Serialize};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub motion: MotionConfig,
    pub envelope: EnvelopeConfig,
    pub pulse: PulseConfig,
    pub follow: FollowConfig,
    pub jaw: JawConfig,
}

/// Timing parameters for the playback loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Seconds between ticks of the playback loop.
    pub tick_period: f64,
    /// Default seconds per interpolation segment.
    pub default_duration: f64,
    /// Lower bound for the user-set segment duration.
    pub min_duration: f64,
    /// Upper bound for the user-set segment duration.
    pub max_duration: f64,
    /// Seconds to hold each pose under instant playback before advancing.
    pub instant_dwell: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tick_period: 0.01,
            default_duration: 1.0,
            min_duration: 0.1,
            max_duration: 5.0,
            instant_dwell: 1.0,
        }
    }
}

impl MotionConfig {
    /// Clamps a requested segment duration into the configured bounds.
    /// A non-positive duration is passed through unchanged so the segment
    /// completes instantly instead of being stretched to the minimum.
    pub fn clamp_duration(&self, duration: f64) -> f64 {
        if duration <= 0.0 {
            return duration;
        }
        duration.clamp(self.min_duration, self.max_duration)
    }
}

/// Parameters for amplitude envelope construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Analysis chunk size in milliseconds.
    pub chunk_ms: u32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self { chunk_ms: 30 }
    }
}

/// Parameters for the percussive jaw pulse state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Normalized amplitude at or above which a rising edge fires a pulse.
    pub threshold: f32,
    /// Seconds the jaw stays open once a pulse fires.
    pub open_duration: f64,
    /// Minimum seconds between consecutive pulses.
    pub cooldown: f64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            open_duration: 0.10,
            cooldown: 0.05,
        }
    }
}

/// Parameters for the continuous amplitude-follow jaw mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FollowConfig {
    /// Exponent applied to the amplitude; below 1.0 boosts quiet content and
    /// compresses peaks.
    pub gamma: f32,
    /// Exponential smoothing weight kept from the previous output, in [0, 1).
    pub smoothing: f32,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            gamma: 0.7,
            smoothing: 0.3,
        }
    }
}

/// Maps jaw openness onto a servo channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JawConfig {
    /// Actuator channel driven as the jaw (the SO-101 gripper).
    pub channel: usize,
    /// Device position for a fully closed jaw.
    pub closed: u16,
    /// Device position for a fully open jaw.
    pub open: u16,
}

impl Default for JawConfig {
    fn default() -> Self {
        Self {
            channel: 5,
            closed: 1945,
            open: 2600,
        }
    }
}

impl JawConfig {
    /// Converts openness in [0, 1] to a device position between the closed
    /// and open endpoints. The endpoints may be in either order.
    pub fn position_for(&self, openness: f32) -> u16 {
        let openness = openness.clamp(0.0, 1.0);
        let closed = f32::from(self.closed);
        let open = f32::from(self.open);
        (closed + (open - closed) * openness).round() as u16
    }
}
