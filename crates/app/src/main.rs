use std::{fs, path::PathBuf};

use arm_motion_core::{
    AmplitudeEnvelope, AppConfig, AudioSyncSettings, EasingMode, NeverCancel, PlaybackEngine,
    RecordedMotion, SavedPoseList, SimulatedArm, SyncMode, TickObserver, TickUpdate,
    TimedPlayback, WallClock,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const ARM_CHANNELS: usize = 6;

fn main() -> arm_motion_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::default();

    match cli.command {
        Commands::Play {
            poses,
            duration,
            easing,
            looped,
        } => run_play(&config, &poses, duration, easing, looped),
        Commands::Motion {
            recording,
            easing,
            looped,
        } => run_motion(&config, &recording, easing, looped),
        Commands::Talk { wav, mode } => run_talk(&config, &wav, mode),
    }
}

fn run_play(
    config: &AppConfig,
    path: &PathBuf,
    duration: Option<f64>,
    easing: EasingMode,
    looped: bool,
) -> arm_motion_core::Result<()> {
    let poses = SavedPoseList::from_json_str(&fs::read_to_string(path)?)?;
    let duration = duration.unwrap_or(config.motion.default_duration);
    tracing::info!(?path, poses = poses.len(), "loaded pose list");

    let mut engine = build_engine(config);
    let reason = engine.run_pose_list(&poses, duration, easing, looped)?;
    tracing::info!(?reason, "session finished");
    Ok(())
}

fn run_motion(
    config: &AppConfig,
    path: &PathBuf,
    easing: EasingMode,
    looped: bool,
) -> arm_motion_core::Result<()> {
    let motion = RecordedMotion::from_json_str(&fs::read_to_string(path)?)?;
    tracing::info!(
        ?path,
        frames = motion.len(),
        duration = motion.duration(),
        "loaded recorded motion"
    );

    let mut engine = build_engine(config);
    let reason = engine.run_recorded_motion(&motion, easing, looped)?;
    tracing::info!(?reason, "session finished");
    Ok(())
}

fn run_talk(config: &AppConfig, wav: &PathBuf, mode: SyncMode) -> arm_motion_core::Result<()> {
    let envelope = AmplitudeEnvelope::from_wav_file(wav, config.envelope.chunk_ms)?;
    tracing::info!(
        ?wav,
        duration = envelope.duration(),
        points = envelope.points().len(),
        "analysed audio"
    );

    // The real audio output device is an external collaborator; the demo
    // paces the session on the clip's duration instead.
    let liveness = TimedPlayback::start(envelope.duration());
    let settings = AudioSyncSettings::from_config(config, mode);

    let mut engine = build_engine(config);
    let reason = engine.run_audio_sync(&envelope, &liveness, &settings)?;
    tracing::info!(?reason, "session finished");
    Ok(())
}

fn build_engine(config: &AppConfig) -> PlaybackEngine<SimulatedArm, NeverCancel, WallClock> {
    let mut engine = PlaybackEngine::new(
        SimulatedArm::new(ARM_CHANNELS),
        NeverCancel,
        WallClock::new(),
        config.motion.clone(),
    );
    engine.set_observer(Box::new(LogObserver));
    engine
}

/// Traces every transmitted output vector in place of a terminal renderer.
struct LogObserver;

impl TickObserver for LogObserver {
    fn on_tick(&mut self, update: &TickUpdate<'_>) {
        tracing::debug!(elapsed = update.elapsed, positions = ?update.positions, "tick");
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Servo-arm trajectory playback demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a saved pose list with interpolation between poses.
    Play {
        /// Path to a JSON array of poses (arrays of channel positions).
        poses: PathBuf,
        /// Seconds per segment; defaults to the configured duration.
        #[arg(short, long)]
        duration: Option<f64>,
        /// Easing mode: smooth, snap, gentle, linear or instant.
        #[arg(short, long, default_value = "smooth")]
        easing: EasingMode,
        /// Repeat the list until interrupted.
        #[arg(short, long)]
        looped: bool,
    },
    /// Replay a hand-recorded motion along its own timeline.
    Motion {
        /// Path to a JSON array of {time, pose} frames.
        recording: PathBuf,
        /// Easing mode applied between frames.
        #[arg(short, long, default_value = "smooth")]
        easing: EasingMode,
        /// Repeat the trajectory until interrupted.
        #[arg(short, long)]
        looped: bool,
    },
    /// Sync the jaw channel to the loudness of a WAV file.
    Talk {
        /// Path to the WAV file to analyse.
        wav: PathBuf,
        /// Jaw sync mode: pulse or amplitude.
        #[arg(short, long, default_value = "pulse")]
        mode: SyncMode,
    },
}
