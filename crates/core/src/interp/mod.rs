//! Pose blending: fixed-segment interpolation and variable-timestep
//! resampling of recorded motions.

use crate::{EasingMode, Pose, RecordedMotion};

/// Converts elapsed time over a segment into raw progress in [0, 1].
///
/// A non-positive duration completes instantly (progress 1) so zero-length
/// segments never divide by zero.
pub fn segment_progress(elapsed: f64, duration: f64) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (elapsed / duration).clamp(0.0, 1.0) as f32
}

/// Blends two equal-length poses at eased progress `t`.
///
/// `t` is clamped and eased by `easing` before the per-channel blend; each
/// output channel is rounded to the nearest device unit.
pub fn interpolate(start: &Pose, end: &Pose, t: f32, easing: EasingMode) -> Pose {
    debug_assert_eq!(start.channels(), end.channels());
    let eased = easing.apply(t);

    let positions = start
        .positions()
        .iter()
        .zip(end.positions())
        .map(|(&from, &to)| {
            let blended = f32::from(from) + (f32::from(to) - f32::from(from)) * eased;
            blended.round() as u16
        })
        .collect();
    Pose::new(positions)
}

/// Samples one interpolation segment at `elapsed` seconds into its duration.
///
/// Returns the output pose and whether the segment is finished. The endpoints
/// are returned verbatim (a clone, not a float round-trip) at `elapsed <= 0`
/// and `elapsed >= duration`, so a finished segment lands on the target with
/// no drift.
pub fn sample_segment(
    start: &Pose,
    end: &Pose,
    elapsed: f64,
    duration: f64,
    easing: EasingMode,
) -> (Pose, bool) {
    let t = segment_progress(elapsed, duration);
    if t >= 1.0 {
        (end.clone(), true)
    } else if t <= 0.0 {
        (start.clone(), false)
    } else {
        (interpolate(start, end, t, easing), false)
    }
}

/// One output of [`FrameResampler::sample`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledFrame {
    pub pose: Pose,
    /// Set once the end of the recording has been reached; the pose is then
    /// the final frame verbatim.
    pub finished: bool,
}

/// Blends between the frames of an irregularly-timestamped recording.
///
/// The resampler keeps a cursor into the frame list and resumes the bracket
/// search from it, since elapsed time is monotonically increasing within one
/// pass; a full pass is therefore linear in the frame count. Call
/// [`FrameResampler::reset`] before replaying the motion from the start.
#[derive(Debug)]
pub struct FrameResampler<'a> {
    motion: &'a RecordedMotion,
    cursor: usize,
}

impl<'a> FrameResampler<'a> {
    pub fn new(motion: &'a RecordedMotion) -> Self {
        Self { motion, cursor: 0 }
    }

    /// Rewinds the cursor for another pass over the same motion.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Samples the recording at `elapsed` seconds from the start of the pass.
    ///
    /// Returns `None` only for an empty recording. A single-frame recording
    /// yields that frame, immediately finished. Elapsed times at or past the
    /// last timestamp yield the last frame verbatim, finished; times before
    /// the first frame clamp to the first frame.
    pub fn sample(&mut self, elapsed: f64, easing: EasingMode) -> Option<ResampledFrame> {
        let frames = self.motion.frames();
        let last = frames.last()?;

        if frames.len() == 1 || elapsed >= last.time {
            return Some(ResampledFrame {
                pose: last.pose.clone(),
                finished: true,
            });
        }

        while self.cursor + 2 < frames.len() && frames[self.cursor + 1].time <= elapsed {
            self.cursor += 1;
        }

        let from = &frames[self.cursor];
        let to = &frames[self.cursor + 1];
        let span = to.time - from.time;
        // Equal bracket timestamps cannot come out of the recorder, but a
        // hand-edited file could contain them; hold the earlier frame.
        let t = if span > 0.0 {
            ((elapsed - from.time) / span) as f32
        } else {
            0.0
        };

        Some(ResampledFrame {
            pose: interpolate(&from.pose, &to.pose, t, easing),
            finished: false,
        })
    }
}
