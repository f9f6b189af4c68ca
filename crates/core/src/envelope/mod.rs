use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// One normalized loudness sample tagged with its chunk start time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    /// Seconds from the start of the audio.
    pub time: f64,
    /// Normalized loudness in [0, 1].
    pub amplitude: f32,
}

/// Loudness-over-time trajectory derived from raw audio.
///
/// Built once, off the real-time path, and never mutated afterwards: the
/// audio is partitioned into fixed-duration chunks, each chunk reduced to its
/// RMS amplitude, and the sequence normalized so the single loudest chunk
/// reads exactly 1.0. Silent audio stays all-zero rather than dividing by
/// zero and drives a jaw that simply never opens.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AmplitudeEnvelope {
    points: Vec<EnvelopePoint>,
    duration: f64,
}

impl AmplitudeEnvelope {
    /// Builds an envelope from mono samples in [-1, 1].
    ///
    /// `chunk_ms` is the analysis window; 20–50 ms resolves syllables well.
    pub fn from_samples(samples: &[f32], sample_rate: u32, chunk_ms: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let chunk_samples = ((sample_rate as u64 * chunk_ms.max(1) as u64) / 1000).max(1) as usize;

        let mut points: Vec<EnvelopePoint> = samples
            .chunks(chunk_samples)
            .enumerate()
            .map(|(index, chunk)| {
                let sum_squares: f32 = chunk.iter().map(|sample| sample * sample).sum();
                EnvelopePoint {
                    time: (index * chunk_samples) as f64 / sample_rate as f64,
                    amplitude: (sum_squares / chunk.len() as f32).sqrt(),
                }
            })
            .collect();

        let peak = points
            .iter()
            .map(|point| point.amplitude)
            .fold(0.0_f32, f32::max);
        if peak > 0.0 {
            for point in &mut points {
                point.amplitude /= peak;
            }
        }

        Self {
            points,
            duration: samples.len() as f64 / sample_rate as f64,
        }
    }

    /// Decodes a WAV file and builds the envelope from its samples.
    ///
    /// Handles integer (8/16/24/32-bit) and float formats; multi-channel
    /// audio is averaged down to mono before chunking.
    pub fn from_wav_file(path: impl AsRef<Path>, chunk_ms: u32) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1u32 << (spec.bits_per_sample.saturating_sub(1).min(31))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let mono = downmix(&samples, channels);
        Ok(Self::from_samples(&mono, spec.sample_rate, chunk_ms))
    }

    /// Interpolated amplitude at time `t`.
    ///
    /// Linear between the two bracketing chunk samples; 0 before the first
    /// sample, and the last sample's amplitude at or beyond its time (no
    /// extrapolation).
    pub fn amplitude_at(&self, t: f64) -> f32 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        if t < first.time {
            return 0.0;
        }

        let upper = self.points.partition_point(|point| point.time <= t);
        if upper >= self.points.len() {
            return self.points[self.points.len() - 1].amplitude;
        }

        let before = self.points[upper - 1];
        let after = self.points[upper];
        let span = after.time - before.time;
        if span <= 0.0 {
            return before.amplitude;
        }
        let factor = ((t - before.time) / span) as f32;
        before.amplitude + (after.amplitude - before.amplitude) * factor
    }

    /// Total duration of the analysed audio in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn points(&self) -> &[EnvelopePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loudest_chunk_normalizes_to_one() {
        // 100 Hz sample rate, 10 ms chunks: one sample per chunk.
        let samples = [0.1, 0.5, 0.25, 0.05];
        let envelope = AmplitudeEnvelope::from_samples(&samples, 100, 10);

        let peak = envelope
            .points()
            .iter()
            .map(|point| point.amplitude)
            .fold(0.0_f32, f32::max);
        assert!((peak - 1.0).abs() <= f32::EPSILON);
        assert!((envelope.duration() - 0.04).abs() < 1e-9);
    }

    #[test]
    fn silence_stays_all_zero() {
        let samples = vec![0.0; 480];
        let envelope = AmplitudeEnvelope::from_samples(&samples, 48_000, 30);
        assert!(!envelope.is_empty());
        assert!(envelope.points().iter().all(|point| point.amplitude == 0.0));
        assert_eq!(envelope.amplitude_at(0.0), 0.0);
    }

    #[test]
    fn empty_audio_yields_empty_envelope() {
        let envelope = AmplitudeEnvelope::from_samples(&[], 48_000, 30);
        assert!(envelope.is_empty());
        assert_eq!(envelope.amplitude_at(1.0), 0.0);
        assert_eq!(envelope.duration(), 0.0);
    }

    #[test]
    fn amplitude_interpolates_between_chunks() {
        // Two chunks: (0.0, 0.5 normalized to 0.5) and (0.01, 1.0).
        let samples = [0.5, 1.0];
        let envelope = AmplitudeEnvelope::from_samples(&samples, 100, 10);

        let mid = envelope.amplitude_at(0.005);
        assert!((mid - 0.75).abs() <= 1e-6, "got {mid}");
    }

    #[test]
    fn amplitude_holds_last_value_past_the_end() {
        let samples = [1.0, 0.25];
        let envelope = AmplitudeEnvelope::from_samples(&samples, 100, 10);
        let last = envelope.points().last().unwrap().amplitude;
        assert_eq!(envelope.amplitude_at(10.0), last);
    }

    #[test]
    fn amplitude_is_zero_before_the_first_point() {
        let samples = [1.0];
        let envelope = AmplitudeEnvelope::from_samples(&samples, 100, 10);
        assert_eq!(envelope.amplitude_at(-0.5), 0.0);
    }

    #[test]
    fn downmix_averages_interleaved_channels() {
        let stereo = [1.0, 0.0, 0.5, 0.5, 0.0, 1.0];
        let mono = downmix(&stereo, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn rms_of_constant_signal_is_its_magnitude() {
        let samples = vec![-0.5; 100];
        let envelope = AmplitudeEnvelope::from_samples(&samples, 100, 1000);
        // Single chunk, so normalization maps it to 1.0.
        assert_eq!(envelope.points().len(), 1);
        assert!((envelope.points()[0].amplitude - 1.0).abs() <= f32::EPSILON);
    }
}
