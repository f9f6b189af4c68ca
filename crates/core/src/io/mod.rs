//! Collaborator interfaces for the playback loop: actuator output, clock,
//! cancellation and audio liveness, plus the in-crate implementations used by
//! tests and the command line demo.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crate::{Pose, Result};

/// Largest valid device position on the SO-101 bus.
pub const POSITION_MAX: u16 = 4095;

/// Clamps a position into the valid device range before transmission.
pub fn clamp_position(position: u16) -> u16 {
    position.min(POSITION_MAX)
}

/// Servo output and readback. The wire protocol behind these calls is an
/// external collaborator; implementations report transmission failures but
/// the playback loop treats them as best-effort telemetry.
pub trait Actuator {
    /// Writes a goal position to a single channel.
    fn write(&mut self, channel: usize, position: u16) -> Result<()>;

    /// Writes goal positions to all channels at once.
    fn write_all(&mut self, positions: &[u16]) -> Result<()>;

    /// Reads the present position of every channel. Consulted once at session
    /// start to anchor the first interpolation segment.
    fn read_all(&mut self) -> Result<Pose>;
}

/// Non-blocking cancellation poll. A poll drains the underlying trigger so a
/// request is observed exactly once.
pub trait CancelSource {
    fn cancel_requested(&mut self) -> bool;
}

/// Monotone liveness signal from a concurrently playing audio activity:
/// either still playing or finished, never "not yet started".
pub trait AudioLiveness {
    fn is_playing(&self) -> bool;
}

/// Time source driving the playback loop. Sessions measure elapsed time as
/// differences of `now` readings and suspend between ticks via `sleep`.
pub trait TickSource {
    /// Seconds since an arbitrary fixed origin.
    fn now(&mut self) -> f64;

    /// Suspends for the given number of seconds.
    fn sleep(&mut self, seconds: f64);
}

/// Wall-clock [`TickSource`] used against real hardware.
#[derive(Debug)]
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for WallClock {
    fn now(&mut self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(&mut self, seconds: f64) {
        if seconds > 0.0 {
            thread::sleep(Duration::from_secs_f64(seconds));
        }
    }
}

/// Deterministic [`TickSource`] that only advances when slept, so loop tests
/// run instantly and reproducibly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: f64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds.max(0.0);
    }
}

impl TickSource for ManualClock {
    fn now(&mut self) -> f64 {
        self.now
    }

    fn sleep(&mut self, seconds: f64) {
        self.advance(seconds);
    }
}

/// Cancel source that never fires; used when a session should run to
/// completion unconditionally.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl CancelSource for NeverCancel {
    fn cancel_requested(&mut self) -> bool {
        false
    }
}

/// Cancellation flag shareable with another thread (a keyboard listener, a
/// signal handler). Polling drains the request.
#[derive(Debug, Default, Clone)]
pub struct SharedCancel {
    requested: Arc<AtomicBool>,
}

impl SharedCancel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the next poll observes and drains it.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}

impl CancelSource for SharedCancel {
    fn cancel_requested(&mut self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

/// Liveness signal for audio of a known duration, anchored to the wall clock
/// when started.
#[derive(Debug)]
pub struct TimedPlayback {
    started: Instant,
    duration: Duration,
}

impl TimedPlayback {
    /// Starts the countdown now for audio lasting `seconds`.
    pub fn start(seconds: f64) -> Self {
        Self {
            started: Instant::now(),
            duration: Duration::from_secs_f64(seconds.max(0.0)),
        }
    }
}

impl AudioLiveness for TimedPlayback {
    fn is_playing(&self) -> bool {
        self.started.elapsed() < self.duration
    }
}

/// In-memory actuator capturing every write, standing in for the serial bus
/// in tests and the demo CLI.
#[derive(Debug)]
pub struct SimulatedArm {
    positions: Vec<u16>,
    writes: Vec<(usize, u16)>,
}

impl SimulatedArm {
    pub fn new(channels: usize) -> Self {
        Self {
            positions: vec![0; channels],
            writes: Vec::new(),
        }
    }

    /// Seeds the present positions reported by `read_all`.
    pub fn with_positions(positions: Vec<u16>) -> Self {
        Self {
            positions,
            writes: Vec::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.positions.len()
    }

    /// Latest goal position per channel.
    pub fn positions(&self) -> &[u16] {
        &self.positions
    }

    /// Every `(channel, position)` write in order of transmission.
    pub fn writes(&self) -> &[(usize, u16)] {
        &self.writes
    }
}

impl Actuator for SimulatedArm {
    fn write(&mut self, channel: usize, position: u16) -> Result<()> {
        if let Some(slot) = self.positions.get_mut(channel) {
            *slot = position;
        }
        self.writes.push((channel, position));
        Ok(())
    }

    fn write_all(&mut self, positions: &[u16]) -> Result<()> {
        for (channel, &position) in positions.iter().enumerate() {
            self.write(channel, position)?;
        }
        Ok(())
    }

    fn read_all(&mut self) -> Result<Pose> {
        Ok(Pose::new(self.positions.clone()))
    }
}
