use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::terminal;
use env_logger::Env;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use taploop::bounce::{self, BounceOptions};
use taploop::config::{self, SessionConfig};
use taploop::middle::Middle;
use taploop::pipeline::persistence;
use taploop::session::Session;
use taploop::shared::InputEvent;
use taploop::{audio, tui};

struct Args {
    project_dir: PathBuf,
    bounce: Option<PathBuf>,
    loops: u32,
    delay: bool,
    reverb: bool,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        project_dir: std::env::current_dir().unwrap_or_default(),
        bounce: None,
        loops: BounceOptions::default().loops,
        delay: false,
        reverb: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bounce" => {
                let path = it.next().context("--bounce needs an output file")?;
                args.bounce = Some(PathBuf::from(path));
            }
            "--loops" => {
                let n = it.next().context("--loops needs a count")?;
                args.loops = n.parse().with_context(|| format!("bad loop count {n:?}"))?;
            }
            "--delay" => args.delay = true,
            "--reverb" => args.reverb = true,
            _ => args.project_dir = PathBuf::from(arg),
        }
    }
    Ok(args)
}

fn run() -> anyhow::Result<()> {
    let args = parse_args()?;
    let config = config::load_config(&args.project_dir).unwrap_or_else(|e| {
        log::warn!("{e:#}, using default config");
        SessionConfig::default()
    });

    if let Some(out) = &args.bounce {
        return bounce_to(out, &args, &config);
    }

    let audio = audio::start_audio(&config.effects)?;
    let mut session = Session::new(&config);
    if let Some(snapshot) = persistence::load_snapshot(&args.project_dir) {
        session.restore(&snapshot);
    }
    session.attach_audio(audio.context());
    let mut middle = Middle::new(session, args.project_dir.clone());

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps, well under the poll interval
    loop {
        middle.tick(Instant::now());
        let ds = middle.display_state();
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        // wake early for a pending flash or playhead move
        let timeout = middle
            .next_deadline()
            .map_or(tick_rate, |due| due.saturating_duration_since(Instant::now()).min(tick_rate));
        for event in tui::input::poll_input(timeout)? {
            if event == InputEvent::Quit {
                // save before quitting
                if let Err(e) = middle.save() {
                    log::error!("failed to save pattern: {e:#}");
                }
                drop(term);
                drop(audio);
                return Ok(());
            }
            middle.handle_input(event, Instant::now());
        }
    }
}

fn bounce_to(out: &Path, args: &Args, config: &SessionConfig) -> anyhow::Result<()> {
    let snapshot = persistence::load_snapshot(&args.project_dir)
        .with_context(|| format!("no saved pattern in {}", args.project_dir.display()))?;
    let options = BounceOptions {
        loops: args.loops,
        delay: args.delay,
        reverb: args.reverb,
        seed: fastrand::u64(..),
        ..BounceOptions::default()
    };
    let frames = bounce::render_loops(config, &snapshot, &options)?;
    bounce::write_wav(out, &frames, options.sample_rate)?;
    println!("wrote {} ({} frames)", out.display(), frames.len());
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
