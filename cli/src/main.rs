//! QSI CLI - joint quantum-state simulation substrate
//!
//! A coordinator entry point for composing quantum-optical and
//! quantum-memory device components into a shared joint state.
//!
//! Features:
//! - Modern CLI with clap derive macros
//! - Structured logging with tracing
//! - Progress indicators
//! - Colored output

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use qsi_core::{Polarization, SubsystemDescriptor, SubsystemKind};
use qsi_coordinator::{CoordinatorFacade, QueryResult};
use qsi_state::JointState;
use qsi_transport::ParamValue as WireParamValue;

/// QSI - a simulation substrate for composing quantum-optical and
/// quantum-memory devices as a pipeline of independent components.
#[derive(Parser)]
#[command(name = "qsi")]
#[command(version)]
#[command(about = "Joint quantum-state simulation substrate", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Display system information and module layout
    Info,

    /// Spawn the components named in a registry file and run them
    /// through their lifecycle once.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to a TOML registry file describing the coordinator's port and
    /// the components to spawn.
    #[arg(long)]
    config: PathBuf,
}

/// A registry of components for the coordinator to spawn, plus the
/// light mode it should compose through the pipeline in component order.
#[derive(Debug, Deserialize)]
struct RegistryConfig {
    coordinator_port: u16,
    #[serde(default)]
    input_mode: Option<InputModeConfig>,
    components: Vec<ComponentConfig>,
}

#[derive(Debug, Deserialize)]
struct InputModeConfig {
    truncation: usize,
    wavelength: f64,
    polarization: PolarizationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum PolarizationConfig {
    R,
    L,
    H,
    V,
}

impl From<PolarizationConfig> for Polarization {
    fn from(p: PolarizationConfig) -> Self {
        match p {
            PolarizationConfig::R => Polarization::R,
            PolarizationConfig::L => Polarization::L,
            PolarizationConfig::H => Polarization::H,
            PolarizationConfig::V => Polarization::V,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ComponentConfig {
    id: String,
    path: PathBuf,
    #[serde(default)]
    params: HashMap<String, ParamValueConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParamValueConfig {
    Integer(i64),
    Number(f64),
    String(String),
    Complex { re: f64, im: f64 },
}

impl From<ParamValueConfig> for WireParamValue {
    fn from(v: ParamValueConfig) -> Self {
        match v {
            ParamValueConfig::Integer(i) => WireParamValue::Integer(i),
            ParamValueConfig::Number(n) => WireParamValue::Number(n),
            ParamValueConfig::String(s) => WireParamValue::String(s),
            ParamValueConfig::Complex { re, im } => WireParamValue::Complex { re, im },
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("failed to set tracing subscriber");
        info!("verbose mode enabled");
    }

    match cli.command {
        Commands::Info => print_info(),
        Commands::Run(args) => run_registry(args),
    }
}

fn print_info() {
    println!("\n{}", "QSI System Information".cyan().bold());
    println!("{}\n", "=".repeat(70).dimmed());

    println!("{}: {}", "Version".yellow(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("{}", "MODULES:".yellow().bold());
    println!("{}", "-".repeat(70).dimmed());
    println!(
        "  {} | Subsystem descriptors and the shared error taxonomy",
        "core       ".cyan()
    );
    println!(
        "  {} | Joint state: composition, reordering, Kraus channels, partial trace",
        "state      ".cyan()
    );
    println!(
        "  {} | Length-prefixed message envelopes and schema-tagged payloads",
        "transport  ".cyan()
    );
    println!(
        "  {} | Process supervision and the coordinator facade",
        "coordinator".cyan()
    );
    println!(
        "  {} | Illustrative physical-device components (fiber, color center)",
        "demos      ".cyan()
    );
    println!();
}

fn create_stage_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn run_registry(args: RunArgs) {
    let contents = match std::fs::read_to_string(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {e}", "failed to read registry file:".red().bold());
            std::process::exit(1);
        }
    };
    let registry: RegistryConfig = match toml::from_str(&contents) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} {e}", "failed to parse registry file:".red().bold());
            std::process::exit(1);
        }
    };

    let mut facade = CoordinatorFacade::new(registry.coordinator_port);

    let mut state = registry.input_mode.map(|mode| {
        let desc = SubsystemDescriptor::new(
            SubsystemKind::Light,
            mode.truncation,
            Some(mode.wavelength),
            Some(mode.polarization.into()),
        )
        .expect("registry-declared input mode is a valid descriptor");
        JointState::ground(desc)
    });
    let input_id = state.as_ref().map(|s| s.props()[0].id());

    for component in registry.components {
        let spinner = create_stage_spinner(&format!("registering {}", component.id));
        let handle_id = match facade.register(&component.id, &component.path) {
            Ok(id) => id,
            Err(e) => {
                spinner.finish_with_message(format!("{} {e}", component.id.red()));
                continue;
            }
        };

        if !component.params.is_empty() {
            let wire_params: HashMap<String, WireParamValue> = component
                .params
                .into_iter()
                .map(|(k, v)| (k, v.into()))
                .collect();
            if let Err(e) = facade.set_params(&handle_id, wire_params) {
                warn!(component = %handle_id, "param_set failed: {e}");
            }
        }
        spinner.finish_with_message(format!("{} ready", handle_id.green()));

        if let (Some(s), Some(id)) = (state.as_mut(), input_id) {
            let mut ports = HashMap::new();
            ports.insert("input".to_string(), id);
            match facade.query_channel(&handle_id, s, &ports) {
                Ok(QueryResult::Channel(channel)) => {
                    if let Err(e) = facade.apply(s, &channel) {
                        warn!(component = %handle_id, "apply failed: {e}");
                    } else {
                        info!(component = %handle_id, "channel applied");
                    }
                }
                Ok(QueryResult::Refused { message }) => {
                    warn!(component = %handle_id, "refused: {message}");
                }
                Ok(QueryResult::RetriggerOnly { .. }) => {
                    info!(component = %handle_id, "requested a retrigger, no channel applied");
                }
                Err(e) => warn!(component = %handle_id, "channel query failed: {e}"),
            }
        }
    }

    if let Some(s) = &state {
        let trace: f64 = (0..s.side()).map(|i| s.rho()[(i, i)].re).sum();
        println!(
            "{} side={} trace={:.6}",
            "final joint state:".yellow().bold(),
            s.side(),
            trace
        );
    }

    facade.shutdown();
}
