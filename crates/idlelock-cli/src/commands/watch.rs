//! Interactive tracker session.
//!
//! Lifecycle signals and app-state changes are typed on stdin, one per line.
//! Every tracker event is printed to stdout as a JSON line.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use idlelock_core::{
    policy, AppState, LifecycleEvent, ManualHost, TimeoutEvent, TimeoutTracker, TrackerConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

#[derive(Args)]
pub struct WatchArgs {
    /// Timeout in seconds, clamped to 30..=1800
    #[arg(long)]
    timeout: Option<f64>,
    /// Start tracking immediately instead of waiting for `start`
    #[arg(long)]
    start: bool,
    /// Config file (defaults to ~/.config/idlelock/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Start(Option<f64>),
    Stop,
    Signal(LifecycleEvent),
    SetState(AppState),
    Status,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, Box<dyn std::error::Error>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    let command = match verb {
        "start" => Command::Start(arg.map(str::parse).transpose()?),
        "stop" => Command::Stop,
        "foreground" => Command::Signal(LifecycleEvent::WillEnterForeground),
        "background" => Command::Signal(LifecycleEvent::DidEnterBackground),
        "proximity" => Command::Signal(LifecycleEvent::ProximityChanged),
        "state" => {
            let state = arg.ok_or("state needs one of: active, inactive, background")?;
            Command::SetState(state.parse()?)
        }
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other}").into()),
    };
    Ok(Some(command))
}

pub fn run(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(args.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch(args, config))
}

async fn watch(args: WatchArgs, config: TrackerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let host = Arc::new(ManualHost::default());
    let tracker = TimeoutTracker::new(host.clone(), config)?;

    let mut events = tracker.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!("failed to encode event: {e}"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let observer = Arc::new(|event: &TimeoutEvent| {
        eprintln!("idle timeout after {}s", event.timeout_secs);
    });
    tracker.register_observer(&observer);

    if args.start {
        tracker.start_tracking(args.timeout.map(policy::clamp_secs));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        match command {
            Command::Start(secs) => {
                let requested = secs.or(args.timeout).map(policy::clamp_secs);
                if !tracker.start_tracking(requested) {
                    eprintln!("already tracking");
                }
            }
            Command::Stop => {
                if !tracker.stop_tracking() {
                    eprintln!("not tracking");
                }
            }
            Command::Signal(event) => tracker.handle_lifecycle(event),
            Command::SetState(state) => host.set_app_state(state),
            Command::Status => println!("{}", serde_json::to_string(&tracker.snapshot())?),
            Command::Quit => break,
        }
    }

    tracker.stop_tracking();
    // Dropping the last handle closes the event stream and ends the printer.
    drop(tracker);
    printer.await?;
    Ok(())
}
