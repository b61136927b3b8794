use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use squat_coach::engine::{CoachingSession, RecordingSource, SessionRunner};
use squat_coach::fixtures::{
    replay, ExpectationDiff, FixtureCatalog, ReplayReport, SyntheticSquat,
};
use squat_coach::speech::SpeechDispatcher;
use squat_coach::{http, AppConfig, RuleCatalog};

#[derive(Parser, Debug)]
#[command(
    name = "coach_cli",
    about = "Deterministic pose-replay harness for the squat coach"
)]
struct Cli {
    /// Override directory containing recordings (defaults to ./fixtures in the crate)
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    /// JSON config file; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recording through a fresh session and report reps and cues
    Replay {
        #[arg(long)]
        fixture: String,
        #[arg(long)]
        expect: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate a synthetic squat recording
    Synth {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 3)]
        reps: u32,
        /// Deepest hip position as a fraction of the hip-to-knee span
        #[arg(long, default_value_t = 0.8)]
        depth: f64,
        #[arg(long, default_value_t = 10.0)]
        lean: f64,
        #[arg(long, default_value_t = 0.5)]
        jitter: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
    /// Print the rule spec the session would use for an exercise
    Rules {
        #[arg(long)]
        exercise: Option<String>,
    },
    /// Play a recording in real time through the async runner
    Coach {
        #[arg(long)]
        fixture: String,
        /// Also serve the debug HTTP endpoints while coaching
        #[arg(long)]
        http: bool,
    },
    /// List available recordings on disk
    DumpFixtures,
}

fn main() -> ExitCode {
    squat_coach::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_else(FixtureCatalog::default);
    let config = match cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };
    config.validate().context("validating configuration")?;

    match cli.command {
        Commands::Replay {
            fixture,
            expect,
            output,
        } => run_replay(&catalog, &config, &fixture, expect, output),
        Commands::Synth {
            output,
            reps,
            depth,
            lean,
            jitter,
            seed,
        } => {
            let squat = SyntheticSquat {
                reps,
                depth_fraction: depth,
                torso_lean_deg: lean,
                jitter_px: jitter,
                seed,
                ..Default::default()
            };
            run_synth(&squat, output)
        }
        Commands::Rules { exercise } => run_rules(&config, exercise),
        Commands::Coach { fixture, http } => run_coach(&catalog, config, &fixture, http),
        Commands::DumpFixtures => run_dump(&catalog),
    }
}

fn run_replay(
    catalog: &FixtureCatalog,
    config: &AppConfig,
    fixture: &str,
    override_expect: Option<PathBuf>,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let data = catalog.load(fixture, override_expect)?;
    let spec = RuleCatalog::from_config(&config.session).resolve(&config.session.exercise);
    let report = replay(&data.recording, config, spec);

    emit_report(&report, output_path)?;

    if let Some(expectations) = data.expectations {
        match expectations.verify(&report) {
            Ok(()) => Ok(ExitCode::from(0)),
            Err(diff) => {
                emit_diff(&diff)?;
                Ok(ExitCode::from(2))
            }
        }
    } else {
        Ok(ExitCode::from(0))
    }
}

fn run_synth(squat: &SyntheticSquat, output: PathBuf) -> Result<ExitCode> {
    if !(0.0..=1.5).contains(&squat.depth_fraction) {
        bail!("--depth must be between 0.0 and 1.5");
    }
    let name = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("synthetic")
        .to_string();
    let recording = squat.recording(&name);
    recording.save(&output)?;
    println!(
        "Wrote {} frames ({} ms) to {}",
        recording.frames.len(),
        recording.duration_ms(),
        output.display()
    );
    Ok(ExitCode::from(0))
}

fn run_rules(config: &AppConfig, exercise: Option<String>) -> Result<ExitCode> {
    let exercise = exercise.unwrap_or_else(|| config.session.exercise.clone());
    let spec = RuleCatalog::from_config(&config.session).resolve(&exercise);
    println!("{}", serde_json::to_string_pretty(spec.as_ref())?);
    Ok(ExitCode::from(0))
}

fn run_coach(
    catalog: &FixtureCatalog,
    config: AppConfig,
    fixture: &str,
    serve_http: bool,
) -> Result<ExitCode> {
    let data = catalog.load(fixture, None)?;
    let spec = RuleCatalog::from_config(&config.session).resolve(&config.session.exercise);
    let speech = SpeechDispatcher::from_config(&config.speech);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let summary = runtime.block_on(async move {
        let mut runner = SessionRunner::new(CoachingSession::new(config, spec));
        if let Some(speech) = speech {
            runner = runner.with_speech(speech);
        }
        if serve_http {
            http::spawn_if_enabled(&runner, http::addr_from_env(), http::token_from_env());
        }

        let mut reps = runner.subscribe_reps();
        let printer = tokio::spawn(async move {
            while let Ok(event) = reps.recv().await {
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{line}");
                }
            }
        });

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let summary = runner
            .run_until(RecordingSource::new(data.recording), shutdown)
            .await;
        drop(runner);
        let _ = printer.await;
        summary
    });

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::from(0))
}

fn run_dump(catalog: &FixtureCatalog) -> Result<ExitCode> {
    let fixtures = catalog.discover()?;
    if fixtures.is_empty() {
        println!("No fixtures found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in fixtures {
        if let Some(expect) = metadata.expect_path {
            println!("{} -> {}", metadata.name, expect.display());
        } else {
            println!("{}", metadata.name);
        }
    }
    Ok(ExitCode::from(0))
}

fn emit_report(report: &ReplayReport, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn emit_diff(diff: &ExpectationDiff) -> Result<()> {
    let json = serde_json::to_string_pretty(&diff.to_json())?;
    eprintln!("{json}");
    Ok(())
}
