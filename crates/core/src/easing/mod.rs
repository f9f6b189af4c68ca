use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ArmMotionError;

/// Selects the blend law applied while moving between two poses.
///
/// Every curve maps progress in [0, 1] to eased progress in [0, 1], is
/// monotonically non-decreasing and hits both endpoints exactly. Inputs
/// outside the unit interval are clamped first. [`EasingMode::Instant`] is a
/// playback-mode flag rather than a curve: the playback loop skips
/// interpolation entirely and jumps straight to each pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EasingMode {
    /// Smootherstep: slow start, fast middle, slow end. 6t⁵ − 15t⁴ + 10t³.
    Smooth,
    /// Quartic ease-in: slow start, accelerates, snaps into place. t⁴.
    Snap,
    /// Quartic ease-out: fast start, decelerates, gentle landing. 1 − (1−t)⁴.
    Gentle,
    /// Constant speed, no easing.
    Linear,
    /// Jump straight to each pose without interpolating.
    Instant,
}

impl EasingMode {
    /// All modes in cycling order.
    pub const ALL: [EasingMode; 5] = [
        EasingMode::Smooth,
        EasingMode::Snap,
        EasingMode::Gentle,
        EasingMode::Linear,
        EasingMode::Instant,
    ];

    /// Returns the next mode in cycling order, wrapping around at the end.
    pub fn cycle(self) -> EasingMode {
        let index = Self::ALL.iter().position(|mode| *mode == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Whether the playback loop should bypass interpolation for this mode.
    pub fn is_instant(self) -> bool {
        self == EasingMode::Instant
    }

    /// Applies the curve to `t`, clamping the input to [0, 1] first.
    ///
    /// `Instant` degrades to the clamped identity so that callers which do
    /// interpolate under it anyway still get sane output.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingMode::Smooth => smootherstep(t),
            EasingMode::Snap => ease_in_quartic(t),
            EasingMode::Gentle => ease_out_quartic(t),
            EasingMode::Linear | EasingMode::Instant => t,
        }
    }

    /// Short human-readable description of the motion character.
    pub fn describe(self) -> &'static str {
        match self {
            EasingMode::Smooth => "ease-in-out (slow - fast - slow)",
            EasingMode::Snap => "ease-in (slow - snap!)",
            EasingMode::Gentle => "ease-out (fast - gentle stop)",
            EasingMode::Linear => "constant (robotic)",
            EasingMode::Instant => "no interpolation (jump to pose)",
        }
    }
}

impl fmt::Display for EasingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EasingMode::Smooth => "smooth",
            EasingMode::Snap => "snap",
            EasingMode::Gentle => "gentle",
            EasingMode::Linear => "linear",
            EasingMode::Instant => "instant",
        };
        f.write_str(name)
    }
}

impl FromStr for EasingMode {
    type Err = ArmMotionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "smooth" => Ok(EasingMode::Smooth),
            "snap" => Ok(EasingMode::Snap),
            "gentle" => Ok(EasingMode::Gentle),
            "linear" => Ok(EasingMode::Linear),
            "instant" => Ok(EasingMode::Instant),
            other => Err(ArmMotionError::msg(format!(
                "unknown easing mode `{other}` (expected smooth, snap, gentle, linear or instant)"
            ))),
        }
    }
}

fn smootherstep(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn ease_in_quartic(t: f32) -> f32 {
    t * t * t * t
}

fn ease_out_quartic(t: f32) -> f32 {
    let inverse = 1.0 - t;
    1.0 - inverse * inverse * inverse * inverse
}
