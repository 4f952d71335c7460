//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use ir_core::DistanceModel;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "ir", version, about = "IR distance sensor tool")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Conversion model selectable from the command line.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ModelArg {
    /// Datasheet formula
    Analytical,
    /// Factory cubic polynomial
    #[default]
    Calibrated,
}

impl From<ModelArg> for DistanceModel {
    fn from(m: ModelArg) -> Self {
        match m {
            ModelArg::Analytical => DistanceModel::Analytical,
            ModelArg::Calibrated => DistanceModel::Calibrated,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an operator-guided calibration sweep from 9 to 50 cm
    Calibrate {
        /// Stream every sample as "<distance>, <raw>" telemetry
        #[arg(long, action = ArgAction::SetTrue)]
        stream: bool,
        /// Store the rounded mean per distance in the calibration table
        #[arg(long = "save-means", action = ArgAction::SetTrue)]
        save_means: bool,
        /// Write the mean table as CSV after the sweep
        #[arg(long, value_name = "FILE")]
        table_out: Option<PathBuf>,
        /// Write telemetry to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        telemetry_out: Option<PathBuf>,
        /// Wait for Enter before each distance instead of advancing automatically
        #[arg(long, action = ArgAction::SetTrue)]
        interactive: bool,
    },
    /// Feed single-byte commands through the dispatcher
    Dispatch {
        /// Whitespace-separated command codes; read from stdin when omitted
        #[arg(long, value_name = "CODES")]
        codes: Option<String>,
        /// Model used to answer reading requests
        #[arg(long, value_enum, default_value_t = ModelArg::Calibrated)]
        model: ModelArg,
    },
    /// Take readings from the simulated sensor
    Read {
        /// Number of readings
        #[arg(long, default_value_t = 1)]
        count: u16,
        /// Conversion model
        #[arg(long, value_enum, default_value_t = ModelArg::Calibrated)]
        model: ModelArg,
        /// Distance of the simulated target in cm
        #[arg(long, value_name = "CM", default_value_t = 20.0)]
        distance: f32,
    },
    /// Convert a raw code with both models
    Convert {
        /// Raw 10-bit code
        #[arg(long)]
        raw: u16,
    },
    /// Fit a cubic distance model to exported telemetry
    Fit {
        /// Telemetry CSV with a "Distances, Readings" header
        #[arg(long, value_name = "FILE")]
        telemetry: PathBuf,
    },
    /// Quick health check of the converter path
    SelfCheck,
}
