//! Interactive session
//!
//! A single-threaded tokio loop multiplexes two sources: lines typed on
//! stdin, parsed into intents, and a one-second clock that drives the
//! countdown timer and resolves pending track starts.

use std::io::Write;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};

use crate::cli::commands::{open_mixer, Mixer};
use crate::config::Config;
use crate::engine::ToggleOutcome;
use crate::error::{MixerError, Result};
use crate::orchestrator::{Intent, Outcome, RenderEvent, Renderer};
use crate::tracks::StartTicket;

/// Prints render events to stdout.
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    /// Suppress output, used while announcing the initial state
    quiet: bool,
}

impl ConsoleRenderer {
    fn describe(event: &RenderEvent) -> Option<String> {
        match event {
            RenderEvent::TrackPlayState { track, playing } => Some(format!(
                "{} {}",
                track,
                if *playing { "playing" } else { "paused" }
            )),
            RenderEvent::TrackVolume { track, volume } => Some(format!("{} volume {}", track, volume)),
            RenderEvent::MasterVolume(volume) => Some(format!("master volume {}", volume)),
            RenderEvent::AggregatePlayState(playing) => Some(
                if *playing { "mix playing" } else { "mix paused" }.to_string(),
            ),
            RenderEvent::ActivePreset(Some(key)) => Some(format!("active preset: {}", key)),
            RenderEvent::ActivePreset(None) => None,
            // Whole minutes and the final countdown only
            RenderEvent::TimerTick { minutes, seconds }
                if *seconds == 0 || (*minutes == 0 && *seconds <= 10) =>
            {
                Some(format!("timer {:02}:{:02}", minutes, seconds))
            }
            RenderEvent::TimerTick { .. } => None,
            RenderEvent::TimerSelectionReset => Some("timer off".to_string()),
            RenderEvent::CustomPresetAdded { id, name } => {
                Some(format!("custom preset \"{}\" ({})", name, id))
            }
            RenderEvent::CustomPresetRemoved(id) => Some(format!("custom preset {} removed", id)),
        }
    }
}

impl Renderer for ConsoleRenderer {
    fn render(&mut self, event: &RenderEvent) {
        if self.quiet {
            return;
        }
        if let Some(line) = Self::describe(event) {
            println!("  {}", line);
        }
    }
}

enum Flow {
    Continue,
    RestartClock,
    Quit,
}

/// Run the interactive session until `quit` or end of input.
pub fn run(config: &Config, check_sources: bool) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let mut mixer = open_mixer(config, check_sources, ConsoleRenderer { quiet: true });
    mixer.renderer_mut().quiet = false;

    runtime.block_on(drive(mixer))
}

async fn drive(mut mixer: Mixer<ConsoleRenderer>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut clock = interval(Duration::from_secs(1));
    clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: Vec<StartTicket> = Vec::new();

    println!(
        "Ambient Mixer v{} - {} tracks. Type 'help' for commands.",
        env!("CARGO_PKG_VERSION"),
        mixer.engine().registry().len()
    );
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_line(&mut mixer, &line, &mut pending) {
                    Flow::Continue => {}
                    Flow::RestartClock => clock.reset(),
                    Flow::Quit => break,
                }
                prompt();
            }
            _ = clock.tick() => {
                for ticket in pending.drain(..) {
                    if let Err(e) = mixer.resolve_start(&ticket, Ok(())) {
                        report(&e);
                    }
                }
                if let Some(token) = mixer.timer_token() {
                    mixer.timer_second(token);
                }
            }
        }
    }

    println!("Bye.");
    Ok(())
}

fn handle_line(
    mixer: &mut Mixer<ConsoleRenderer>,
    line: &str,
    pending: &mut Vec<StartTicket>,
) -> Flow {
    match line.trim() {
        "" => return Flow::Continue,
        "quit" | "exit" => return Flow::Quit,
        "help" => {
            println!("{}", Intent::usage());
            println!("status                    show the mix\nquit                      leave");
            return Flow::Continue;
        }
        "status" => {
            print_status(mixer);
            return Flow::Continue;
        }
        _ => {}
    }

    let intent = match Intent::parse_line(line) {
        Ok(intent) => intent,
        Err(e) => {
            report(&e);
            return Flow::Continue;
        }
    };
    debug!("Dispatching {:?}", intent);
    let restarts_clock = matches!(intent, Intent::StartTimer(m) if m > 0);

    match mixer.dispatch(intent) {
        Ok(Outcome::Track(ToggleOutcome::Starting(ticket))) => pending.push(ticket),
        Ok(Outcome::All(report_all)) => {
            pending.extend(report_all.pending);
            for (_, e) in &report_all.failed {
                report(e);
            }
        }
        Ok(Outcome::PresetLoaded(loaded)) => {
            pending.extend(loaded.pending);
            for (_, e) in &loaded.failed {
                report(e);
            }
        }
        Ok(Outcome::PresetDeleted(false)) => println!("  no such preset"),
        Ok(_) => {}
        Err(e) => report(&e),
    }

    if restarts_clock {
        Flow::RestartClock
    } else {
        Flow::Continue
    }
}

fn print_status(mixer: &Mixer<ConsoleRenderer>) {
    for status in mixer.tracks() {
        println!(
            "  {:<10} {:>4}  {}{}",
            status.id,
            status.volume.to_string(),
            status.state.to_string(),
            if status.inert { " [unavailable]" } else { "" }
        );
    }
    println!("  master {}", mixer.engine().master_volume());

    let timer = mixer.timer_state();
    if timer.running {
        let (minutes, seconds) = timer.remaining();
        println!("  timer {:02}:{:02} left", minutes, seconds);
    }
    if let Some(key) = mixer.active_preset() {
        println!("  preset {}", key);
    }
}

fn report(error: &MixerError) {
    if !error.is_caller_error() {
        warn!("{} [{}]", error, error.error_code());
    }
    println!("  error: {}", error);
    if let Some(hint) = error.recovery_suggestion() {
        println!("  hint: {}", hint);
    } else if error.is_retryable() {
        println!("  hint: try again");
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
