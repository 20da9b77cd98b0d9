use std::path::PathBuf;

use clap::Args;

use antisnooze_core::{
    AntiSnoozeEngine, Command, Config, EngineRuntime, Event, MemoryHistory, NullHaptics,
    NullNotifier, PostureClassifier, ScriptedSource, SensorReading, SensorSource, SettingsStore,
    VibrationController,
};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

/// Replay a recorded sensor trace through the engine.
///
/// The trace is a JSON array of sensor readings. By default the replay is
/// simulated on the trace's own timestamps, printing one event per line;
/// `--live` rebases the trace onto the wall clock and runs it in real
/// time instead.
#[derive(Args)]
pub struct RunArgs {
    /// JSON file with an array of sensor readings
    trace: PathBuf,

    /// Fire the alarm this many seconds after the trace starts
    /// (overrides the stored wake-up time)
    #[arg(long)]
    fire_in: Option<i64>,

    /// Keep simulating this long past the last reading, in seconds
    #[arg(long, default_value = "120")]
    tail_secs: i64,

    /// Replay against the wall clock instead of simulated time
    #[arg(long)]
    live: bool,
}

fn load_trace(path: &PathBuf) -> Result<Vec<SensorReading>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn build_engine(
    fire_in: Option<i64>,
    start: DateTime<Utc>,
) -> Result<AntiSnoozeEngine, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut settings = SettingsStore::open_default()?.load()?;
    if let Some(secs) = fire_in {
        settings.wake_up_time = (start + Duration::seconds(secs)).time();
        settings.is_active = true;
        settings.repeat_days = [false; 7];
    }

    // Replays never touch the stored history.
    Ok(AntiSnoozeEngine::new(
        config.engine,
        PostureClassifier::new(config.classifier, start),
        VibrationController::new(config.vibration, Box::new(NullHaptics)),
        settings,
        Box::new(MemoryHistory::new()),
        Box::new(NullNotifier),
        start,
    ))
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

/// Step simulated time over the trace one tick at a time.
fn replay(args: &RunArgs, readings: Vec<SensorReading>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(first) = readings.first() else {
        return Err("trace is empty".into());
    };
    let start = first.at();
    let end = readings
        .last()
        .map(|r| r.at())
        .unwrap_or(start)
        + Duration::seconds(args.tail_secs);

    let mut engine = build_engine(args.fire_in, start)?;
    let mut source = ScriptedSource::new(readings);
    source.start()?;

    let step = Duration::from_std(engine.tick_interval())?;
    let mut now = start;
    while now <= end {
        while let Some(reading) = source.poll(now)? {
            for event in engine.process_reading(&reading, now)? {
                print_event(&event)?;
            }
        }
        for event in engine.tick(now)? {
            print_event(&event)?;
        }
        now += step;
    }

    eprintln!(
        "replay finished: phase {:?}, vibration {:?}",
        engine.phase(),
        engine.vibration_state()
    );
    Ok(())
}

/// Run the trace against the wall clock through the tokio runtime.
/// Exits once the alarm completes or the event stream closes.
fn live(args: &RunArgs, readings: Vec<SensorReading>) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();
    let engine = build_engine(args.fire_in, now)?;
    let mut source = ScriptedSource::new(readings);
    source.rebase(now);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(256);

        let runtime = EngineRuntime::new(engine, source, cmd_rx, event_tx);
        let handle = tokio::spawn(runtime.run());

        while let Some(event) = event_rx.recv().await {
            print_event(&event)?;
            if matches!(event, Event::AlarmCompleted { .. }) {
                break;
            }
        }

        let _ = cmd_tx.send(Command::Shutdown).await;
        handle.await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let readings = load_trace(&args.trace)?;
    if args.live {
        live(&args, readings)
    } else {
        replay(&args, readings)
    }
}
