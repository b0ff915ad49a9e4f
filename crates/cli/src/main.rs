// mrl-info: print what a media locator resolves to

mod report;

use clap::Parser;
use mrlkit_session::{
    init_logging, AudioOutput, EngineKind, PlayerConfig, Result, Session, SessionState,
    Verbosity, VideoOutput,
};
use report::MediaReport;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "mrl-info")]
#[command(about = "Describe the media behind a file path or URI", version)]
struct Args {
    /// File path or URI (file://, http://, https://, ...)
    uri: String,

    /// Backend engine: symphonia or dummy
    #[arg(long, default_value = "symphonia")]
    engine: EngineKind,

    /// Audio output: null or auto
    #[arg(long, default_value = "null")]
    ao: AudioOutput,

    /// Video output: null, auto, x11, xv, gl or fb
    #[arg(long, default_value = "null")]
    vo: VideoOutput,

    /// Log level: none, info, warning, error or critical
    #[arg(long, default_value = "error")]
    verbosity: Verbosity,

    /// How long to wait for properties before reporting them unknown
    #[arg(long, default_value_t = 2000)]
    wait_ms: u64,

    /// Play the media for this many seconds after the report
    #[arg(long)]
    play_secs: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbosity);

    let config = PlayerConfig::new(args.engine)
        .with_audio_output(args.ao)
        .with_video_output(args.vo)
        .with_verbosity(args.verbosity)
        .with_resolve_timeout(Duration::from_millis(args.wait_ms));

    let session = match Session::open(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to open a {} session: {}", args.engine, e);
            eprintln!("Try --engine dummy, or --ao null --vo null");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = activate(&session, &args.uri) {
        eprintln!("Cannot open {}: {}", args.uri, e);
        eprintln!("Check that the path exists or the URL is reachable");
        return ExitCode::from(1);
    }

    // One bounded wait covers every property in the report
    print!("{}", MediaReport::collect(&session));

    if let Some(secs) = args.play_secs {
        if let Err(e) = play_for(&session, Duration::from_secs(secs)) {
            eprintln!("Playback failed: {}", e);
            return ExitCode::from(1);
        }
    }

    session.close();
    ExitCode::SUCCESS
}

fn activate(session: &Session, uri: &str) -> Result<()> {
    let locator = session.create_locator(uri)?;
    session.set_active(&locator)
}

fn play_for(session: &Session, duration: Duration) -> Result<()> {
    session.play()?;
    let started = Instant::now();
    while started.elapsed() < duration && session.state() == SessionState::Playing {
        thread::sleep(Duration::from_millis(100));
    }
    log::info!("Played {} ms", session.position_ms());
    session.stop()
}
