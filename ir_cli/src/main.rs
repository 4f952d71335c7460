#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod backend;
mod cli;
mod commands;
mod error_fmt;
mod logging;

use clap::Parser;
use eyre::{Result, WrapErr};
use std::path::Path;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(path: Option<&Path>) -> Result<ir_config::Config> {
    let Some(path) = path else {
        return Ok(ir_config::Config::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = ir_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    logging::init(&level, cli.json, &cfg.logging)?;

    match cli.cmd {
        Commands::Calibrate {
            stream,
            save_means,
            table_out,
            telemetry_out,
            interactive,
        } => commands::calibrate(
            &cfg,
            commands::CalibrateArgs {
                stream,
                save_means,
                table_out,
                telemetry_out,
                interactive,
            },
            cli.json,
        ),
        Commands::Dispatch { codes, model } => {
            commands::dispatch(&cfg, codes.as_deref(), model, cli.json)
        }
        Commands::Read {
            count,
            model,
            distance,
        } => commands::read(&cfg, count, model, distance, cli.json),
        Commands::Convert { raw } => commands::convert(raw, cli.json),
        Commands::Fit { telemetry } => commands::fit(&telemetry, cli.json),
        Commands::SelfCheck => commands::self_check(&cfg, cli.json),
    }
}
