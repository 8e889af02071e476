//! mdspeak main entry point
//!
//! Loads a document, starts one playback session and prints the reading
//! cursor as lines are spoken. Ctrl+C stops playback.

use anyhow::{bail, Context};
use log::{debug, error, info};
use mdspeak::config::{Config, MAX_RATE, MIN_RATE};
use mdspeak::document::Document;
use mdspeak::playback::{ChannelSink, PlaybackController, PlaybackEvent, SessionState};
use mdspeak::speech::{create_backend, voices, ProcessRegistry};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// How often the event loop checks for Ctrl+C
const TICK: Duration = Duration::from_millis(50);

/// Global flag set by SIGINT handler
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// SIGINT handler - sets flag when the user presses Ctrl+C
extern "C" fn handle_sigint(_: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::Relaxed);
}

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    debug: bool,
    json: bool,
    list_voices: bool,
    start: usize,
    voice: Option<String>,
    rate: Option<u32>,
    file: Option<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut parsed = Args::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--debug" | "-d" => parsed.debug = true,
                "--json" => parsed.json = true,
                "--list-voices" => parsed.list_voices = true,
                "--start" => {
                    let value = args.next().context("--start needs a line number")?;
                    parsed.start = value
                        .parse()
                        .with_context(|| format!("invalid start line '{}'", value))?;
                }
                "--voice" => {
                    parsed.voice = Some(args.next().context("--voice needs a name")?);
                }
                "--rate" => {
                    let value = args.next().context("--rate needs words per minute")?;
                    let rate: u32 = value
                        .parse()
                        .with_context(|| format!("invalid rate '{}'", value))?;
                    if !(MIN_RATE..=MAX_RATE).contains(&rate) {
                        bail!("rate must be between {} and {}", MIN_RATE, MAX_RATE);
                    }
                    parsed.rate = Some(rate);
                }
                other if other.starts_with('-') => bail!("unknown option '{}'", other),
                other => {
                    if parsed.file.is_some() {
                        bail!("only one file can be read at a time");
                    }
                    parsed.file = Some(PathBuf::from(other));
                }
            }
        }

        Ok(parsed)
    }
}

fn init_logging(debug_mode: bool) {
    if debug_mode {
        // Debug mode: write to mdspeak.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("mdspeak.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open mdspeak.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "mdspeak version {} starting (debug mode, logging to mdspeak.log)",
            mdspeak::VERSION
        );
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }
}

fn main() {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!(
                "Usage: {} [--debug] [--start N] [--voice NAME] [--rate WPM] [--json] FILE",
                mdspeak::APP_NAME
            );
            eprintln!("       {} --list-voices", mdspeak::APP_NAME);
            process::exit(2);
        }
    };

    init_logging(args.debug);

    match run(args) {
        Ok(SessionState::Failed) => process::exit(1),
        Ok(_) => {}
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(args: Args) -> anyhow::Result<SessionState> {
    if args.list_voices {
        for voice in voices::list_voices().context("listing voices")? {
            println!("{}", voice);
        }
        return Ok(SessionState::Finished);
    }

    let path = args.file.context("no file given")?;
    let document = Document::load(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    info!("Loaded {} lines from {}", document.len(), path.display());

    let config = Config::load().context("loading configuration")?;
    debug!("Configuration from {:?}", config.path());

    let mut params = config.voice_params();
    if let Some(voice) = args.voice {
        params.voice = voice;
    }
    if let Some(rate) = args.rate {
        params.rate_wpm = rate;
    }

    let registry = ProcessRegistry::new();
    let backend = create_backend(&config, &registry).context("initialising speech")?;

    let (tx, rx) = mpsc::channel();
    let mut controller = PlaybackController::from_backend(backend, Arc::new(ChannelSink::new(tx)))
        .with_line_pause(config.line_pause());
    if config.hard_kill_on_stop() {
        controller = controller.with_hard_kill(registry);
    }

    // Ctrl+C stops playback instead of killing the process
    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::Handler(handle_sigint))
            .context("installing SIGINT handler")?;
    }

    let document = Arc::new(document);
    controller
        .start(Arc::clone(&document), args.start, params)
        .context("starting playback")?;

    let state = follow(&controller, &rx, &STOP_REQUESTED, |event| {
        print_event(event, &document, args.json)
    });
    Ok(state)
}

/// Hand every event of the running session to `on_event` until it ends
///
/// `stop` is polled between events and turns into `controller.stop()`.
/// Events still queued when the session thread exits are delivered too.
fn follow(
    controller: &PlaybackController,
    rx: &Receiver<PlaybackEvent>,
    stop: &AtomicBool,
    mut on_event: impl FnMut(&PlaybackEvent),
) -> SessionState {
    loop {
        if stop.swap(false, Ordering::Relaxed) {
            info!("Stop requested from keyboard");
            controller.stop();
        }

        match rx.recv_timeout(TICK) {
            Ok(event) => on_event(&event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if controller.status().state.is_terminal() && !controller.is_speaking() {
            break;
        }
    }

    // The session thread has sent everything once it is joined
    let state = controller.wait().unwrap_or(SessionState::Failed);
    while let Ok(event) = rx.try_recv() {
        on_event(&event);
    }
    state
}

fn print_event(event: &PlaybackEvent, document: &Document, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to encode event: {}", e),
        }
        return;
    }

    match event {
        PlaybackEvent::CursorMoved { line } => {
            println!("{:>5}  {}", line + 1, document.line(*line).unwrap_or(""));
        }
        PlaybackEvent::Error { kind, line, message } => {
            eprintln!("{:>5}  ! {:?} error: {}", line + 1, kind, message);
        }
        PlaybackEvent::Finished => println!("-- end of document --"),
        PlaybackEvent::StatusChanged { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdspeak::playback::Activity;
    use mdspeak::speech::{AudioArtifact, AudioPlayer, SpeechRenderer, VoiceParams};

    struct SilentRenderer(tempfile::TempDir);

    impl SpeechRenderer for SilentRenderer {
        fn render(&self, _utterance: &str, _params: &VoiceParams) -> mdspeak::Result<AudioArtifact> {
            AudioArtifact::create_in(self.0.path(), "wav")
        }
    }

    struct SilentPlayer;

    impl AudioPlayer for SilentPlayer {
        fn play(&self, _artifact: &AudioArtifact) -> mdspeak::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_args() {
        let args = Args::parse(
            ["-d", "--start", "3", "--rate", "200", "--json", "notes.md"]
                .iter()
                .map(|s| s.to_string()),
        )
        .unwrap();
        assert!(args.debug && args.json);
        assert_eq!(args.start, 3);
        assert_eq!(args.rate, Some(200));
        assert_eq!(args.file, Some(PathBuf::from("notes.md")));

        assert!(Args::parse(["--rate", "5"].iter().map(|s| s.to_string())).is_err());
        assert!(Args::parse(["--bogus"].iter().map(|s| s.to_string())).is_err());
    }

    #[test]
    fn test_follow_delivers_final_events() {
        for _ in 0..20 {
            let (tx, rx) = mpsc::channel();
            let controller = PlaybackController::new(
                Arc::new(SilentRenderer(tempfile::tempdir().unwrap())),
                Arc::new(SilentPlayer),
                Arc::new(ChannelSink::new(tx)),
            )
            .with_line_pause(Duration::ZERO);

            controller
                .start(Document::from_lines(["one", "two"]), 0, VoiceParams::default())
                .unwrap();

            let mut seen = Vec::new();
            let stop = AtomicBool::new(false);
            let state = follow(&controller, &rx, &stop, |event| seen.push(event.clone()));

            assert_eq!(state, SessionState::Finished);
            assert_eq!(
                seen[seen.len() - 2..],
                [
                    PlaybackEvent::Finished,
                    PlaybackEvent::StatusChanged {
                        activity: Activity::Idle
                    }
                ]
            );
        }
    }

    #[test]
    fn test_follow_honours_stop_flag() {
        let (tx, rx) = mpsc::channel();
        let controller = PlaybackController::new(
            Arc::new(SilentRenderer(tempfile::tempdir().unwrap())),
            Arc::new(SilentPlayer),
            Arc::new(ChannelSink::new(tx)),
        )
        .with_line_pause(Duration::from_millis(200));

        controller
            .start(Document::from_lines(["a", "b", "c", "d"]), 0, VoiceParams::default())
            .unwrap();

        let stop = AtomicBool::new(true);
        let state = follow(&controller, &rx, &stop, |_| {});
        assert_eq!(state, SessionState::Cancelled);
    }
}
