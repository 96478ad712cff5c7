mod error;
mod scenarios;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use docprobe_core::bridge::BridgeDriver;
use docprobe_core::config::HarnessConfig;
use docprobe_core::driver::AccessibilityDriver;
use docprobe_core::error::HarnessError;
use docprobe_core::harness::Harness;
use docprobe_core::reporter::FailureReporter;

use crate::error::CliError;

const LOG_FILENAME: &str = "docprobe.log";

/// Accessibility-driven UI scenarios for the Atril/Xreader document viewer.
#[derive(Parser)]
#[command(name = "docprobe")]
#[command(about = "Run accessibility-driven UI scenarios against a document viewer")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.docprobe/config.json)
    #[arg(short, long, global = true, env = "DOCPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Application binary to launch
    #[arg(long, global = true)]
    app: Option<String>,

    /// Bridge agent command line
    #[arg(long, global = true)]
    bridge: Option<String>,

    /// Directory holding the fixture documents
    #[arg(long, global = true)]
    fixtures_dir: Option<PathBuf>,

    /// Where failure diagnostics are written
    #[arg(long, global = true)]
    diagnostics_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scenario
    Run {
        /// Scenario name (see `docprobe list`)
        scenario: String,

        /// Skip the screenshot in failure diagnostics
        #[arg(long)]
        no_screenshot: bool,
    },
    /// List available scenarios
    List {
        /// Only show scenarios whose name matches this glob
        #[arg(short, long)]
        filter: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List captured failure diagnostics, newest last
    Diagnostics {
        /// Only show captures for this scenario
        #[arg(short, long)]
        scenario: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 64 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code(e.exit_code())
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Run {
            scenario,
            no_screenshot,
        } => {
            let mut config = config;
            if no_screenshot {
                config.capture_screenshot = false;
            }
            init_logging(cli.verbose, Some(&config.diagnostics_dir()));
            run_scenario(config, &scenario).await
        }
        Command::List { filter, json } => {
            init_logging(cli.verbose, None);
            list_scenarios(filter.as_deref(), json)
        }
        Command::Diagnostics { scenario } => {
            init_logging(cli.verbose, None);
            for dir in list_diagnostics(&config.diagnostics_dir(), scenario.as_deref())? {
                println!("{}", dir.display());
            }
            Ok(())
        }
    }
}

/// Config file, then environment, then flags.
fn load_config(cli: &Cli) -> Result<HarnessConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load_from(path)?,
        None => HarnessConfig::load(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(app) = &cli.app {
        config.app = app.clone();
    }
    if let Some(bridge) = &cli.bridge {
        let command: Vec<String> = bridge.split_whitespace().map(String::from).collect();
        if command.is_empty() {
            return Err(CliError::Usage("--bridge must not be empty".to_string()));
        }
        config.bridge_command = command;
    }
    if let Some(dir) = &cli.fixtures_dir {
        config.fixtures_dir = Some(dir.clone());
    }
    if let Some(dir) = &cli.diagnostics_dir {
        config.diagnostics_dir = Some(dir.clone());
    }
    Ok(config)
}

/// Stderr logging filtered by `RUST_LOG` or `-v`, plus a debug-level JSON
/// file log in `log_dir` when given.
fn init_logging(verbose: u8, log_dir: Option<&Path>) {
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    });

    let file_layer = log_dir
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .map(|dir| {
            fmt::layer()
                .json()
                .with_writer(tracing_appender::rolling::never(dir, LOG_FILENAME))
                .with_filter(EnvFilter::new("debug"))
        });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(stderr_filter))
        .with(file_layer)
        .init();
}

async fn run_scenario(config: HarnessConfig, name: &str) -> Result<(), CliError> {
    let scenario = scenarios::find(name).ok_or_else(|| {
        CliError::Usage(format!(
            "Unknown scenario '{}' (run `docprobe list` to see available scenarios)",
            name
        ))
    })?;
    let reporter = FailureReporter::from_config(&config);

    info!(scenario = name, app = %config.app, "starting scenario");
    let mut driver = BridgeDriver::new(config.bridge_command.clone());
    if let Err(e) = driver.connect().await {
        let err = HarnessError::from(e);
        match reporter.bail(name, &err, None, None).await {}
    }
    debug!(bridge = ?driver.command(), "bridge connected");

    let mut harness = Harness::new(config, Arc::new(driver));
    match harness.execute(scenario.as_ref()).await {
        Ok(procedure) => {
            println!("{}: passed ({} actions)", name, procedure.trail().len());
            Ok(())
        }
        Err(failure) => {
            match reporter
                .bail(name, &failure.error, Some(&failure.procedure), failure.app)
                .await
            {}
        }
    }
}

fn list_scenarios(filter: Option<&str>, json: bool) -> Result<(), CliError> {
    let pattern = filter.map(glob::Pattern::new).transpose()?;
    let selected: Vec<_> = scenarios::all()
        .into_iter()
        .filter(|s| pattern.as_ref().map_or(true, |p| p.matches(s.name())))
        .collect();

    if json {
        let entries: Vec<serde_json::Value> = selected
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name(),
                    "description": s.description(),
                    "fixture": s.fixture(),
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(entries));
    } else {
        let width = selected.iter().map(|s| s.name().len()).max().unwrap_or(0);
        for s in &selected {
            println!("{:width$}  {}", s.name(), s.description(), width = width);
        }
    }
    Ok(())
}

/// Capture directories under `root`, sorted by name (and so by time within
/// a scenario).
fn list_diagnostics(root: &Path, scenario: Option<&str>) -> Result<Vec<PathBuf>, CliError> {
    let prefix = match scenario {
        Some(name) => format!("{}-", glob::Pattern::escape(name)),
        None => String::new(),
    };
    let root = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = Path::new(&root).join(format!("{}*", prefix));
    let mut dirs: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
        .filter_map(Result::ok)
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}
