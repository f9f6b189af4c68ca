//! The playback loop: a single-threaded cooperative scheduler that ticks at a
//! fixed cadence, asks the active blending component for the current output
//! vector, writes it to the actuator and handles loop/cancel state.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, FollowConfig, JawConfig, MotionConfig, PulseConfig},
    interp::{sample_segment, FrameResampler},
    io::{clamp_position, Actuator, AudioLiveness, CancelSource, TickSource},
    pose::MotionRecorder,
    pulse::{AmplitudeFollower, JawState, PulseTrigger},
    AmplitudeEnvelope, ArmMotionError, EasingMode, Pose, RecordedMotion, Result, SavedPoseList,
};

/// Why a session stopped. Cancellation and natural completion halt the tick
/// loop identically from the hardware's point of view, but callers must be
/// able to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalReason {
    Cancelled,
    Completed,
}

/// How audio-sync sessions drive the jaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Snap open/closed on syllables via the pulse state machine.
    Pulse,
    /// Smoothly follow the loudness envelope.
    Amplitude,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Pulse => f.write_str("pulse"),
            SyncMode::Amplitude => f.write_str("amplitude"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = ArmMotionError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pulse" => Ok(SyncMode::Pulse),
            "amplitude" => Ok(SyncMode::Amplitude),
            other => Err(ArmMotionError::msg(format!(
                "unknown sync mode `{other}` (expected pulse or amplitude)"
            ))),
        }
    }
}

/// Parameters for one audio-sync session.
#[derive(Debug, Clone, Copy)]
pub struct AudioSyncSettings {
    pub mode: SyncMode,
    pub pulse: PulseConfig,
    pub follow: FollowConfig,
    pub jaw: JawConfig,
}

impl AudioSyncSettings {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            pulse: PulseConfig::default(),
            follow: FollowConfig::default(),
            jaw: JawConfig::default(),
        }
    }

    pub fn from_config(config: &AppConfig, mode: SyncMode) -> Self {
        Self {
            mode,
            pulse: config.pulse,
            follow: config.follow,
            jaw: config.jaw,
        }
    }
}

/// Per-tick snapshot handed to a [`TickObserver`].
#[derive(Debug)]
pub struct TickUpdate<'a> {
    /// Seconds since the current segment or pass started.
    pub elapsed: f64,
    /// The positions just transmitted, post-clamping.
    pub positions: &'a [u16],
}

/// Receives a notification after every actuator write so an external
/// renderer can redraw without the engine knowing about screens.
pub trait TickObserver {
    fn on_tick(&mut self, update: &TickUpdate<'_>) {
        let _ = update;
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Default)]
pub struct NullObserver;

impl TickObserver for NullObserver {}

/// Owns one playback session at a time and is the sole writer of actuator
/// output while it runs.
///
/// Scheduling is single-threaded and cooperative: each tick polls
/// cancellation, computes the output vector for the elapsed time, writes it,
/// then sleeps for the configured tick period. Cancellation latency is
/// therefore bounded by one tick. Starting any session implicitly stops an
/// active hand-recording, since recording and playback are mutually
/// exclusive over the same channels.
pub struct PlaybackEngine<A, C, T> {
    actuator: A,
    cancel: C,
    clock: T,
    config: MotionConfig,
    recorder: Option<MotionRecorder>,
    observer: Box<dyn TickObserver>,
}

impl<A, C, T> PlaybackEngine<A, C, T>
where
    A: Actuator,
    C: CancelSource,
    T: TickSource,
{
    pub fn new(actuator: A, cancel: C, clock: T, config: MotionConfig) -> Self {
        Self {
            actuator,
            cancel,
            clock,
            config,
            recorder: None,
            observer: Box::new(NullObserver),
        }
    }

    /// Installs an observer notified after every actuator write.
    pub fn set_observer(&mut self, observer: Box<dyn TickObserver>) {
        self.observer = observer;
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Begins capturing frames for a new recorded motion, replacing any
    /// recording already in progress.
    pub fn start_recording(&mut self) {
        let origin = self.clock.now();
        self.recorder = Some(MotionRecorder::new(origin));
        tracing::info!("recording started");
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Captures the arm's present pose into the active recording. A read
    /// failure drops the frame and keeps recording.
    pub fn record_frame(&mut self) {
        if self.recorder.is_none() {
            return;
        }
        let now = self.clock.now();
        match self.actuator.read_all() {
            Ok(pose) => {
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.record(now, pose);
                }
            }
            Err(error) => tracing::warn!(%error, "position read failed, frame dropped"),
        }
    }

    /// Stops recording and freezes the captured motion, if one was active.
    pub fn stop_recording(&mut self) -> Option<RecordedMotion> {
        let motion = self.recorder.take().map(MotionRecorder::finish);
        if let Some(motion) = &motion {
            tracing::info!(
                frames = motion.len(),
                duration = motion.duration(),
                "recording stopped"
            );
        }
        motion
    }

    /// Plays the saved poses as consecutive interpolation segments.
    ///
    /// The first segment anchors on a live readout of the arm's present
    /// positions; each subsequent segment blends from the previous target.
    /// Under [`EasingMode::Instant`] each pose is written once and the loop
    /// idles for the configured dwell instead of interpolating. With `looped`
    /// set the list repeats until cancelled; the restart blends from the
    /// final pose back to the first.
    pub fn run_pose_list(
        &mut self,
        poses: &SavedPoseList,
        duration: f64,
        easing: EasingMode,
        looped: bool,
    ) -> Result<TerminalReason> {
        self.end_recording_for_playback();

        if poses.is_empty() {
            tracing::info!("no poses saved, nothing to play");
            return Ok(TerminalReason::Completed);
        }

        let channels = poses.poses()[0].channels();
        for pose in poses.poses() {
            if pose.channels() != channels {
                return Err(ArmMotionError::ChannelMismatch {
                    expected: channels,
                    actual: pose.channels(),
                });
            }
        }

        tracing::info!(
            poses = poses.len(),
            %easing,
            duration,
            looped,
            "starting pose list session"
        );

        if easing.is_instant() {
            return self.run_pose_list_instant(poses, looped);
        }

        let duration = self.config.clamp_duration(duration);
        let mut current = match self.actuator.read_all() {
            Ok(pose) => pose,
            Err(error) => {
                tracing::warn!(%error, "position read failed, anchoring at zero");
                Pose::zeros(channels)
            }
        };
        if current.channels() != channels {
            return Err(ArmMotionError::ChannelMismatch {
                expected: channels,
                actual: current.channels(),
            });
        }

        loop {
            for target in poses.poses() {
                let origin = self.clock.now();
                loop {
                    if self.poll_cancel() {
                        return Ok(TerminalReason::Cancelled);
                    }
                    let elapsed = self.clock.now() - origin;
                    let (pose, finished) =
                        sample_segment(&current, target, elapsed, duration, easing);
                    self.write_pose(&pose, elapsed);
                    if finished {
                        break;
                    }
                    self.clock.sleep(self.config.tick_period);
                }
                current = target.clone();
            }

            if !looped {
                break;
            }
            tracing::debug!("looping pose list");
        }

        tracing::info!("pose list session completed");
        Ok(TerminalReason::Completed)
    }

    fn run_pose_list_instant(
        &mut self,
        poses: &SavedPoseList,
        looped: bool,
    ) -> Result<TerminalReason> {
        loop {
            for target in poses.poses() {
                if self.poll_cancel() {
                    return Ok(TerminalReason::Cancelled);
                }
                self.write_pose(target, 0.0);

                let dwell_start = self.clock.now();
                while self.clock.now() - dwell_start < self.config.instant_dwell {
                    if self.poll_cancel() {
                        return Ok(TerminalReason::Cancelled);
                    }
                    self.clock.sleep(self.config.tick_period);
                }
            }

            if !looped {
                break;
            }
            tracing::debug!("looping pose list");
        }

        tracing::info!("pose list session completed");
        Ok(TerminalReason::Completed)
    }

    /// Replays a recorded motion along its own timeline.
    ///
    /// The duration is intrinsic to the recording; easing shapes each
    /// frame-to-frame blend. With `looped` set the trajectory repeats from
    /// its first frame until cancelled.
    pub fn run_recorded_motion(
        &mut self,
        motion: &RecordedMotion,
        easing: EasingMode,
        looped: bool,
    ) -> Result<TerminalReason> {
        self.end_recording_for_playback();

        if motion.is_empty() {
            tracing::info!("no recorded motion, nothing to play");
            return Ok(TerminalReason::Completed);
        }
        let channels = motion.frames()[0].pose.channels();
        for frame in motion.frames() {
            if frame.pose.channels() != channels {
                return Err(ArmMotionError::ChannelMismatch {
                    expected: channels,
                    actual: frame.pose.channels(),
                });
            }
        }

        tracing::info!(
            frames = motion.len(),
            duration = motion.duration(),
            %easing,
            looped,
            "starting recorded motion session"
        );

        let mut resampler = FrameResampler::new(motion);
        loop {
            resampler.reset();
            let origin = self.clock.now();
            loop {
                if self.poll_cancel() {
                    return Ok(TerminalReason::Cancelled);
                }
                let elapsed = self.clock.now() - origin;
                let Some(frame) = resampler.sample(elapsed, easing) else {
                    break;
                };
                self.write_pose(&frame.pose, elapsed);
                if frame.finished {
                    break;
                }
                self.clock.sleep(self.config.tick_period);
            }

            if !looped {
                break;
            }
            tracing::debug!("looping recorded motion");
        }

        tracing::info!("recorded motion session completed");
        Ok(TerminalReason::Completed)
    }

    /// Drives the jaw channel from a loudness envelope while the audio
    /// liveness signal reports playing.
    ///
    /// Pulse mode runs the edge/cooldown state machine and writes only on
    /// transitions; amplitude mode writes the smoothed follower output every
    /// tick. The observer hears every tick in both modes, carrying the jaw
    /// position currently held. On natural completion the jaw is closed;
    /// cancellation leaves it
    /// wherever it was, matching the pose-playback cancel rule.
    pub fn run_audio_sync<L>(
        &mut self,
        envelope: &AmplitudeEnvelope,
        liveness: &L,
        settings: &AudioSyncSettings,
    ) -> Result<TerminalReason>
    where
        L: AudioLiveness + ?Sized,
    {
        self.end_recording_for_playback();

        tracing::info!(
            mode = %settings.mode,
            duration = envelope.duration(),
            points = envelope.points().len(),
            "starting audio sync session"
        );

        let origin = self.clock.now();
        let reason = match settings.mode {
            SyncMode::Pulse => {
                let mut trigger = PulseTrigger::new(settings.pulse);
                // The jaw starts closed; the observer still hears every tick
                // even when no transition writes.
                let mut position = clamp_position(settings.jaw.position_for(0.0));
                loop {
                    if self.poll_cancel() {
                        break TerminalReason::Cancelled;
                    }
                    if !liveness.is_playing() {
                        break TerminalReason::Completed;
                    }
                    let elapsed = self.clock.now() - origin;
                    let amplitude = envelope.amplitude_at(elapsed);
                    if let Some(state) = trigger.update(elapsed, amplitude) {
                        let openness = match state {
                            JawState::Open => 1.0,
                            JawState::Closed => 0.0,
                        };
                        position = self.write_jaw(&settings.jaw, openness);
                    }
                    self.notify_jaw(elapsed, position);
                    self.clock.sleep(self.config.tick_period);
                }
            }
            SyncMode::Amplitude => {
                let mut follower = AmplitudeFollower::new(settings.follow);
                loop {
                    if self.poll_cancel() {
                        break TerminalReason::Cancelled;
                    }
                    if !liveness.is_playing() {
                        break TerminalReason::Completed;
                    }
                    let elapsed = self.clock.now() - origin;
                    let openness = follower.update(envelope.amplitude_at(elapsed));
                    let position = self.write_jaw(&settings.jaw, openness);
                    self.notify_jaw(elapsed, position);
                    self.clock.sleep(self.config.tick_period);
                }
            }
        };

        if reason == TerminalReason::Completed {
            let elapsed = self.clock.now() - origin;
            let position = self.write_jaw(&settings.jaw, 0.0);
            self.notify_jaw(elapsed, position);
            tracing::info!("audio sync session completed");
        }
        Ok(reason)
    }

    fn end_recording_for_playback(&mut self) {
        if self.recorder.is_some() {
            tracing::warn!("active recording stopped by playback session");
            self.stop_recording();
        }
    }

    fn poll_cancel(&mut self) -> bool {
        if self.cancel.cancel_requested() {
            tracing::info!("cancellation requested, stopping session");
            true
        } else {
            false
        }
    }

    fn write_pose(&mut self, pose: &Pose, elapsed: f64) {
        let positions: Vec<u16> = pose.positions().iter().map(|&p| clamp_position(p)).collect();
        if let Err(error) = self.actuator.write_all(&positions) {
            tracing::warn!(%error, "actuator write failed, continuing");
        }
        self.observer.on_tick(&TickUpdate {
            elapsed,
            positions: &positions,
        });
    }

    fn write_jaw(&mut self, jaw: &JawConfig, openness: f32) -> u16 {
        let position = clamp_position(jaw.position_for(openness));
        if let Err(error) = self.actuator.write(jaw.channel, position) {
            tracing::warn!(%error, "jaw write failed, continuing");
        }
        position
    }

    fn notify_jaw(&mut self, elapsed: f64, position: u16) {
        self.observer.on_tick(&TickUpdate {
            elapsed,
            positions: std::slice::from_ref(&position),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ManualClock, NeverCancel, SimulatedArm};

    /// Cancel source that fires once on its nth poll.
    struct CancelOnPoll {
        fire_on: usize,
        polls: usize,
    }

    impl CancelOnPoll {
        fn new(fire_on: usize) -> Self {
            Self { fire_on, polls: 0 }
        }
    }

    impl CancelSource for CancelOnPoll {
        fn cancel_requested(&mut self) -> bool {
            self.polls += 1;
            self.polls == self.fire_on
        }
    }

    /// Liveness that reports playing for a fixed number of checks.
    struct PlaysForChecks {
        remaining: std::cell::Cell<usize>,
    }

    impl PlaysForChecks {
        fn new(checks: usize) -> Self {
            Self {
                remaining: std::cell::Cell::new(checks),
            }
        }
    }

    impl AudioLiveness for PlaysForChecks {
        fn is_playing(&self) -> bool {
            let remaining = self.remaining.get();
            if remaining == 0 {
                return false;
            }
            self.remaining.set(remaining - 1);
            true
        }
    }

    fn config() -> MotionConfig {
        MotionConfig {
            tick_period: 0.1,
            default_duration: 1.0,
            min_duration: 0.1,
            max_duration: 5.0,
            instant_dwell: 0.3,
        }
    }

    fn engine<C: CancelSource>(
        channels: usize,
        cancel: C,
    ) -> PlaybackEngine<SimulatedArm, C, ManualClock> {
        PlaybackEngine::new(
            SimulatedArm::new(channels),
            cancel,
            ManualClock::new(),
            config(),
        )
    }

    fn pose_list(poses: &[&[u16]]) -> SavedPoseList {
        let mut list = SavedPoseList::new();
        for positions in poses {
            list.save(Pose::new(positions.to_vec())).unwrap();
        }
        list
    }

    #[test]
    fn empty_pose_list_completes_immediately() {
        let mut engine = engine(2, NeverCancel);
        let reason = engine
            .run_pose_list(&SavedPoseList::new(), 1.0, EasingMode::Smooth, false)
            .unwrap();
        assert_eq!(reason, TerminalReason::Completed);
        assert!(engine.actuator().writes().is_empty());
    }

    #[test]
    fn pose_list_lands_exactly_on_each_target() {
        let mut engine = engine(2, NeverCancel);
        let poses = pose_list(&[&[100, 200], &[300, 400]]);
        let reason = engine
            .run_pose_list(&poses, 0.5, EasingMode::Smooth, false)
            .unwrap();

        assert_eq!(reason, TerminalReason::Completed);
        assert_eq!(engine.actuator().positions(), &[300, 400]);
        // The first target must have been hit verbatim on the way.
        let hits: Vec<&[(usize, u16)]> = engine
            .actuator()
            .writes()
            .chunks(2)
            .filter(|chunk| chunk[0].1 == 100 && chunk[1].1 == 200)
            .collect();
        assert!(!hits.is_empty(), "first pose never written exactly");
    }

    #[test]
    fn zero_duration_completes_each_segment_instantly() {
        let mut engine = engine(1, NeverCancel);
        let poses = pose_list(&[&[1000]]);
        let reason = engine
            .run_pose_list(&poses, 0.0, EasingMode::Linear, false)
            .unwrap();

        assert_eq!(reason, TerminalReason::Completed);
        // One write per pose, landing on the target, no interpolated ramp.
        assert_eq!(engine.actuator().writes(), &[(0, 1000)]);
    }

    #[test]
    fn first_segment_anchors_on_live_readout() {
        let arm = SimulatedArm::with_positions(vec![1000]);
        let mut engine = PlaybackEngine::new(arm, NeverCancel, ManualClock::new(), config());
        let poses = pose_list(&[&[2000]]);
        engine
            .run_pose_list(&poses, 0.5, EasingMode::Linear, false)
            .unwrap();

        // The first write happens at elapsed 0 and equals the readout.
        assert_eq!(engine.actuator().writes()[0], (0, 1000));
    }

    #[test]
    fn looped_playback_cancels_mid_second_pass() {
        // Duration 0.2 with tick 0.1 means 3 polls per segment, 6 per pass.
        // Poll 8 lands inside the first segment of the second pass.
        let mut engine = engine(1, CancelOnPoll::new(8));
        let poses = pose_list(&[&[100], &[200]]);
        let reason = engine
            .run_pose_list(&poses, 0.2, EasingMode::Linear, true)
            .unwrap();

        assert_eq!(reason, TerminalReason::Cancelled);
        // The full first pass reached both targets before cancellation.
        let writes = engine.actuator().writes();
        assert!(writes.iter().any(|&(_, position)| position == 100));
        assert!(writes.iter().any(|&(_, position)| position == 200));
    }

    #[test]
    fn cancellation_does_not_snap_to_target() {
        // Fire on the second poll, mid-segment.
        let mut engine = engine(1, CancelOnPoll::new(2));
        let poses = pose_list(&[&[1000]]);
        let reason = engine
            .run_pose_list(&poses, 1.0, EasingMode::Linear, false)
            .unwrap();

        assert_eq!(reason, TerminalReason::Cancelled);
        let last = engine.actuator().writes().last().copied();
        assert_ne!(last, Some((0, 1000)), "cancel must not jump to the target");
    }

    #[test]
    fn instant_mode_writes_each_pose_once_and_dwells() {
        let mut engine = engine(1, NeverCancel);
        let poses = pose_list(&[&[500], &[600]]);
        let reason = engine
            .run_pose_list(&poses, 1.0, EasingMode::Instant, false)
            .unwrap();

        assert_eq!(reason, TerminalReason::Completed);
        assert_eq!(engine.actuator().writes(), &[(0, 500), (0, 600)]);
    }

    #[test]
    fn instant_mode_polls_cancellation_during_dwell() {
        // Poll 1 passes before the first write; poll 2 is the first dwell check.
        let mut engine = engine(1, CancelOnPoll::new(2));
        let poses = pose_list(&[&[500], &[600]]);
        let reason = engine
            .run_pose_list(&poses, 1.0, EasingMode::Instant, false)
            .unwrap();

        assert_eq!(reason, TerminalReason::Cancelled);
        assert_eq!(engine.actuator().writes(), &[(0, 500)]);
    }

    #[test]
    fn recorded_motion_plays_through_and_finishes_on_last_frame() {
        let motion = RecordedMotion::from_json_str("[{\"time\":0.0,\"pose\":[0]},{\"time\":0.2,\"pose\":[100]}]").unwrap();
        let mut engine = engine(1, NeverCancel);
        let reason = engine
            .run_recorded_motion(&motion, EasingMode::Linear, false)
            .unwrap();

        assert_eq!(reason, TerminalReason::Completed);
        let writes = engine.actuator().writes();
        assert_eq!(writes.first(), Some(&(0, 0)));
        assert_eq!(writes.last(), Some(&(0, 100)));
        // Midpoint tick blends halfway.
        assert!(writes.iter().any(|&(_, position)| position == 50));
    }

    #[test]
    fn empty_recorded_motion_completes_immediately() {
        let mut engine = engine(1, NeverCancel);
        let reason = engine
            .run_recorded_motion(&RecordedMotion::default(), EasingMode::Smooth, false)
            .unwrap();
        assert_eq!(reason, TerminalReason::Completed);
        assert!(engine.actuator().writes().is_empty());
    }

    #[test]
    fn looped_recorded_motion_restarts_from_the_first_frame() {
        let motion = RecordedMotion::from_json_str("[{\"time\":0.0,\"pose\":[10]},{\"time\":0.1,\"pose\":[90]}]").unwrap();
        // One pass is 2 polls; cancel on poll 5, partway through pass 2.
        let mut engine = engine(1, CancelOnPoll::new(5));
        let reason = engine
            .run_recorded_motion(&motion, EasingMode::Linear, true)
            .unwrap();

        assert_eq!(reason, TerminalReason::Cancelled);
        let writes = engine.actuator().writes();
        let first_frame_writes = writes
            .iter()
            .filter(|&&(_, position)| position == 10)
            .count();
        assert!(
            first_frame_writes >= 2,
            "second pass should rewind to the first frame"
        );
    }

    #[test]
    fn pulse_sync_opens_and_closes_the_jaw() {
        // 10 Hz envelope samples: silence, then a loud burst, then silence.
        let samples = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let envelope = AmplitudeEnvelope::from_samples(&samples, 10, 100);
        let liveness = PlaysForChecks::new(8);

        let mut engine = engine(6, NeverCancel);
        let mut settings = AudioSyncSettings::new(SyncMode::Pulse);
        settings.pulse = PulseConfig {
            threshold: 0.5,
            open_duration: 0.2,
            cooldown: 0.05,
        };
        let reason = engine
            .run_audio_sync(&envelope, &liveness, &settings)
            .unwrap();

        assert_eq!(reason, TerminalReason::Completed);
        let jaw = settings.jaw;
        let writes = engine.actuator().writes();
        assert!(writes.contains(&(jaw.channel, jaw.position_for(1.0))));
        // Closed again at the end of the session.
        assert_eq!(writes.last(), Some(&(jaw.channel, jaw.position_for(0.0))));
    }

    /// Observer that counts notifications into a shared cell.
    struct CountingObserver {
        ticks: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl TickObserver for CountingObserver {
        fn on_tick(&mut self, _update: &TickUpdate<'_>) {
            self.ticks.set(self.ticks.get() + 1);
        }
    }

    #[test]
    fn pulse_observer_hears_every_tick_during_silence() {
        let envelope = AmplitudeEnvelope::from_samples(&[0.0; 40], 10, 100);
        let liveness = PlaysForChecks::new(5);

        let ticks = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut engine = engine(6, NeverCancel);
        engine.set_observer(Box::new(CountingObserver {
            ticks: std::rc::Rc::clone(&ticks),
        }));

        let settings = AudioSyncSettings::new(SyncMode::Pulse);
        let reason = engine
            .run_audio_sync(&envelope, &liveness, &settings)
            .unwrap();

        assert_eq!(reason, TerminalReason::Completed);
        // Five silent ticks plus the final close notification.
        assert_eq!(ticks.get(), 6);
        // Silence still produces no pulse writes, only the final close.
        let jaw = settings.jaw;
        assert_eq!(
            engine.actuator().writes(),
            &[(jaw.channel, jaw.position_for(0.0))]
        );
    }

    #[test]
    fn silent_audio_keeps_the_jaw_closed() {
        let envelope = AmplitudeEnvelope::from_samples(&[0.0; 40], 10, 100);
        let liveness = PlaysForChecks::new(5);

        let mut engine = engine(6, NeverCancel);
        let settings = AudioSyncSettings::new(SyncMode::Pulse);
        let reason = engine
            .run_audio_sync(&envelope, &liveness, &settings)
            .unwrap();

        assert_eq!(reason, TerminalReason::Completed);
        // Only the final close write; no pulse ever fired.
        let jaw = settings.jaw;
        assert_eq!(
            engine.actuator().writes(),
            &[(jaw.channel, jaw.position_for(0.0))]
        );
    }

    #[test]
    fn amplitude_sync_writes_every_tick_and_closes_at_the_end() {
        let samples = [1.0, 1.0, 1.0, 1.0];
        let envelope = AmplitudeEnvelope::from_samples(&samples, 10, 100);
        let liveness = PlaysForChecks::new(4);

        let mut engine = engine(6, NeverCancel);
        let settings = AudioSyncSettings::new(SyncMode::Amplitude);
        let reason = engine
            .run_audio_sync(&envelope, &liveness, &settings)
            .unwrap();

        assert_eq!(reason, TerminalReason::Completed);
        let jaw = settings.jaw;
        let writes = engine.actuator().writes();
        // Four tick writes plus the final close.
        assert_eq!(writes.len(), 5);
        assert!(writes.iter().all(|&(channel, _)| channel == jaw.channel));
        assert_eq!(writes.last(), Some(&(jaw.channel, jaw.position_for(0.0))));
    }

    #[test]
    fn cancelled_audio_sync_leaves_the_jaw_alone() {
        let envelope = AmplitudeEnvelope::from_samples(&[1.0; 10], 10, 100);
        let liveness = PlaysForChecks::new(100);

        let mut engine = engine(6, CancelOnPoll::new(3));
        let settings = AudioSyncSettings::new(SyncMode::Amplitude);
        let reason = engine
            .run_audio_sync(&envelope, &liveness, &settings)
            .unwrap();

        assert_eq!(reason, TerminalReason::Cancelled);
        let jaw = settings.jaw;
        // No trailing close write after cancellation.
        assert_ne!(
            engine.actuator().writes().last(),
            Some(&(jaw.channel, jaw.position_for(0.0)))
        );
    }

    #[test]
    fn starting_playback_stops_an_active_recording() {
        let mut engine = engine(1, NeverCancel);
        engine.start_recording();
        engine.record_frame();
        assert!(engine.is_recording());

        engine
            .run_pose_list(&pose_list(&[&[100]]), 0.2, EasingMode::Linear, false)
            .unwrap();
        assert!(!engine.is_recording());
    }

    #[test]
    fn recording_captures_relative_timestamps() {
        let mut engine = engine(2, NeverCancel);
        engine.start_recording();
        engine.record_frame();
        engine.actuator_mut().write_all(&[7, 8]).unwrap();
        // ManualClock only advances when slept; nudge it between frames.
        engine.clock.advance(0.05);
        engine.record_frame();

        let motion = engine.stop_recording().unwrap();
        assert_eq!(motion.len(), 2);
        assert!((motion.frames()[0].time - 0.0).abs() < 1e-9);
        assert!((motion.frames()[1].time - 0.05).abs() < 1e-9);
        assert_eq!(motion.frames()[1].pose.positions(), &[7, 8]);
    }
}
