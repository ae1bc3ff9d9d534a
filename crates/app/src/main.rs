use std::path::{Path, PathBuf};

use automation_timeline_core::{
    script, AppConfig, AudioObject, CurveKind, Event, ParamBacking, ParamOptions, PlaybackClock,
    RecordingSink, Script,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> automation_timeline_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            script,
            from,
            to,
            step,
            config,
            json,
        } => run_render(&script, from, to, step, config.as_deref(), json),
        Commands::Demo { config } => run_demo(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> automation_timeline_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn run_render(
    script_path: &Path,
    from: f64,
    to: Option<f64>,
    step: f64,
    config: Option<&Path>,
    json: bool,
) -> automation_timeline_core::Result<()> {
    let config = load_config(config)?;
    let script = Script::load(script_path)?;
    tracing::info!(
        script = %script_path.display(),
        commands = script.commands.len(),
        "rendering automation script"
    );

    let param = script.build(&config.automation)?;
    let to = to.unwrap_or_else(|| script.end_time() + 1.0).max(from);
    let rendering = script::render(&param, from, to, step)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rendering)?);
        return Ok(());
    }

    println!("{:>10}  {:>14}", "time", "value");
    for sample in &rendering.samples {
        println!("{:>10.4}  {:>14.6}", sample.time, sample.value);
    }

    println!();
    println!("{:>10}  {:>14}  {:<12}  {:>8}", "time", "value", "curve", "duration");
    for event in &rendering.events {
        println!(
            "{:>10.4}  {:>14.6}  {:<12}  {:>8.4}",
            event.time, event.value, event.curve, event.duration
        );
    }
    Ok(())
}

fn run_demo(config: Option<&Path>) -> automation_timeline_core::Result<()> {
    let config = load_config(config)?;
    tracing::info!(?config, "starting automation demo");

    let mut object = AudioObject::new(config.automation);
    object.define_property(
        "gain",
        ParamBacking::native(RecordingSink::new(1.0)),
        ParamOptions {
            duration: Some(0.25),
            curve: Some(CurveKind::Linear),
        },
    )?;

    object.define_property(
        "frequency",
        ParamBacking::setter(|event: &Event| {
            tracing::debug!(
                time = event.time,
                value = event.value,
                curve = %event.curve,
                "frequency setter received event"
            );
        })
        .with_getter(|| 440.0),
        ParamOptions::default(),
    )?;

    object.subscribe(|record| {
        tracing::info!(
            property = %record.property_name,
            old = record.old_value,
            new = record.new_value,
            "value changed"
        );
    });

    let mut clock = PlaybackClock::new();
    object.set("gain", 0.25, clock.now())?;
    object.automate(
        "frequency",
        880.0,
        clock.now(),
        Some(CurveKind::Exponential),
        Some(1.0),
    )?;

    let frames = object.run_until_settled(
        &mut clock,
        config.automation.frame_interval,
        config.automation.max_frames,
    );

    for name in object.property_names() {
        tracing::info!(property = name, value = ?object.get(name), "final value");
    }
    tracing::info!(frames, seconds = clock.now(), "demo finished");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Schedule and inspect parameter automation curves", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay an automation script and print the resulting values.
    Render {
        /// JSON automation script to replay.
        script: PathBuf,
        /// First sampled time in seconds.
        #[arg(long, default_value_t = 0.0)]
        from: f64,
        /// Last sampled time in seconds; defaults to one second past the
        /// script's last command.
        #[arg(long)]
        to: Option<f64>,
        /// Seconds between samples.
        #[arg(long, default_value_t = 0.1)]
        step: f64,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Emit samples and events as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Ramp a couple of properties and follow them with the polling loop.
    Demo {
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
