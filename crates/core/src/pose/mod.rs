use serde::{Deserialize, Serialize};

use crate::{ArmMotionError, Result};

/// One fixed-length vector of servo channel positions.
///
/// Positions use the raw device scale (0–4095 on the SO-101). A pose is
/// immutable once captured; playback components only ever read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose {
    positions: Vec<u16>,
}

impl Pose {
    pub fn new(positions: Vec<u16>) -> Self {
        Self { positions }
    }

    /// A pose with every channel at zero, used as a read-failure fallback.
    pub fn zeros(channels: usize) -> Self {
        Self {
            positions: vec![0; channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[u16] {
        &self.positions
    }
}

/// Ordered collection of poses captured between playback sessions.
///
/// Mutated only by append and clear; a playback session treats the list as a
/// read-only input. Empty and single-pose lists are valid and play back as
/// trivial immediately-complete sessions.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedPoseList {
    poses: Vec<Pose>,
}

impl SavedPoseList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pose, rejecting one whose channel count differs from the
    /// poses already saved.
    pub fn save(&mut self, pose: Pose) -> Result<()> {
        if let Some(first) = self.poses.first() {
            if first.channels() != pose.channels() {
                return Err(ArmMotionError::ChannelMismatch {
                    expected: first.channels(),
                    actual: pose.channels(),
                });
            }
        }
        self.poses.push(pose);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.poses.clear();
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    /// Parses a list from a JSON array of position arrays, validating that all
    /// poses share one channel count.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let poses: Vec<Pose> = serde_json::from_str(json)?;
        let mut list = Self::new();
        for pose in poses {
            list.save(pose)?;
        }
        Ok(list)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One captured frame of a recorded motion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionFrame {
    /// Seconds since the recording started.
    pub time: f64,
    pub pose: Pose,
}

/// A captured, irregularly-timestamped trajectory of poses.
///
/// Frozen after recording: timestamps are strictly increasing with the first
/// at (approximately) zero. Zero- and one-frame recordings are valid
/// degenerates that play back as immediate completion.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordedMotion {
    frames: Vec<MotionFrame>,
}

impl RecordedMotion {
    /// Builds a motion from pre-existing frames, validating the timestamp
    /// invariant and that every frame shares one channel count.
    pub fn from_frames(frames: Vec<MotionFrame>) -> Result<Self> {
        for (index, window) in frames.windows(2).enumerate() {
            if window[1].time <= window[0].time {
                return Err(ArmMotionError::NonMonotonicTimestamps { frame: index + 1 });
            }
        }
        if let Some(first) = frames.first() {
            let expected = first.pose.channels();
            for frame in &frames {
                if frame.pose.channels() != expected {
                    return Err(ArmMotionError::ChannelMismatch {
                        expected,
                        actual: frame.pose.channels(),
                    });
                }
            }
        }
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[MotionFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Intrinsic duration of the trajectory: the timestamp of its last frame.
    pub fn duration(&self) -> f64 {
        self.frames.last().map(|frame| frame.time).unwrap_or(0.0)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let frames: Vec<MotionFrame> = serde_json::from_str(json)?;
        Self::from_frames(frames)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Incrementally builds a [`RecordedMotion`] while the arm is moved by hand.
///
/// Timestamps are taken relative to the recorder's start instant so the first
/// frame lands near zero. Frames that would violate the strictly-increasing
/// invariant, or that change channel count mid-recording, are dropped rather
/// than poisoning the motion.
#[derive(Debug)]
pub struct MotionRecorder {
    origin: f64,
    frames: Vec<MotionFrame>,
}

impl MotionRecorder {
    /// Starts a recording whose timestamps are measured from `origin`
    /// (a clock reading in seconds).
    pub fn new(origin: f64) -> Self {
        Self {
            origin,
            frames: Vec::new(),
        }
    }

    /// Captures one frame at clock reading `now`.
    pub fn record(&mut self, now: f64, pose: Pose) {
        let time = now - self.origin;
        if let Some(last) = self.frames.last() {
            if time <= last.time {
                tracing::trace!(time, "dropping non-advancing frame");
                return;
            }
            if pose.channels() != last.pose.channels() {
                tracing::warn!(
                    expected = last.pose.channels(),
                    actual = pose.channels(),
                    "dropping frame with mismatched channel count"
                );
                return;
            }
        }
        self.frames.push(MotionFrame { time, pose });
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Seconds of motion captured so far.
    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.origin
    }

    /// Freezes the recording into a read-only motion.
    pub fn finish(self) -> RecordedMotion {
        RecordedMotion {
            frames: self.frames,
        }
    }
}
