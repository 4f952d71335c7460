//! Subcommand implementations.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use ir_config::{Config, CubicFit};
use ir_core::adc::{IR_CONTROL_VALUE, IR_MUX_VALUE};
use ir_core::dispatch::reply_line;
use ir_core::{
    AdcConfig, CalibrationController, CalibrationOptions, CalibrationTable, CalibrationTiming,
    CubicModel, DispatchOutcome, Dispatcher, DistanceModel, ReplyReadingHandler, Sampler,
    analytical_convert, calibrated_convert,
};
use ir_hardware::{SimulatedAdc, SimulatedTarget};
use serde_json::json;

use crate::backend::{self, EchoAck, LogReporter};
use crate::cli::ModelArg;

pub struct CalibrateArgs {
    pub stream: bool,
    pub save_means: bool,
    pub table_out: Option<PathBuf>,
    pub telemetry_out: Option<PathBuf>,
    pub interactive: bool,
}

pub fn calibrate(cfg: &Config, args: CalibrateArgs, json_out: bool) -> Result<()> {
    let mut options = CalibrationOptions::from(&cfg.calibration);
    options.stream_telemetry |= args.stream;
    options.save_means |= args.save_means || args.table_out.is_some();
    let timing = CalibrationTiming::from(&cfg.calibration);

    let start_cm = f32::from(ir_core::calibration::MIN_DISTANCE_CM);
    let (target, mut sampler) = backend::sim_sampler(cfg, start_cm)?;
    let button = backend::operator_button(cfg, &target, args.interactive)?;

    let mut builder = CalibrationController::builder()
        .with_display(ir_ui::TerminalDisplay::new(std::io::stderr()))
        .with_button(button)
        .with_timing(timing);
    if options.stream_telemetry {
        let sink = backend::telemetry_sink(cfg, args.telemetry_out.as_deref(), json_out)?;
        builder = builder.with_serial(sink);
    }
    let mut controller = builder.build()?;

    let mut table = CalibrationTable::new();
    let report = controller.run_calibration(&mut sampler, &mut table, options)?;
    // The display leaves its last frame open.
    eprintln!();

    if let Some(path) = args.table_out.as_deref() {
        ir_config::save_table_csv(path, table.iter())
            .wrap_err_with(|| format!("write calibration table {}", path.display()))?;
        tracing::info!(path = %path.display(), "calibration table written");
    }

    let monotonic = table.is_strictly_monotonic();
    if json_out {
        let means: Vec<_> = if options.save_means {
            table
                .iter()
                .map(|(d, m)| json!({ "distance_cm": d, "mean_raw": m }))
                .collect()
        } else {
            Vec::new()
        };
        println!(
            "{}",
            json!({
                "distances": report.distances.len(),
                "samples": report.samples,
                "telemetry_lines": report.telemetry_lines,
                "means": means,
                "monotonic": options.save_means && monotonic,
            })
        );
    } else if args.telemetry_out.is_some() || !options.stream_telemetry {
        println!(
            "calibration complete: {} distances, {} samples, {} telemetry lines",
            report.distances.len(),
            report.samples,
            report.telemetry_lines
        );
        if options.save_means && !monotonic {
            println!("warning: mean table is not strictly monotonic");
        }
    }
    Ok(())
}

/// Parse whitespace-separated decimal command codes.
pub fn parse_codes(text: &str) -> Result<Vec<u8>> {
    text.split_whitespace()
        .map(|t| {
            t.parse::<u8>()
                .wrap_err_with(|| format!("invalid command code '{t}' (expected 0..=255)"))
        })
        .collect()
}

pub fn dispatch(cfg: &Config, codes: Option<&str>, model: ModelArg, json_out: bool) -> Result<()> {
    let codes = match codes {
        Some(text) => parse_codes(text)?,
        None => {
            let mut all = Vec::new();
            for line in std::io::stdin().lock().lines() {
                all.extend(parse_codes(&line.wrap_err("read stdin")?)?);
            }
            all
        }
    };

    let (_target, mut sampler) = backend::sim_sampler(cfg, 20.0)?;
    let (host, link) = ir_hardware::channel_link();
    for &c in &codes {
        host.to_rover
            .send(c)
            .map_err(|_| eyre::eyre!("in-process link closed"))?;
    }

    let replies = ir_hardware::WriteLink::new(backend::protocol_out(json_out));
    let handler = ReplyReadingHandler::new(replies).with_model(model.into());
    let ack = EchoAck::new(backend::protocol_out(json_out));
    let mut dispatcher = Dispatcher::new(link, ack, LogReporter, handler);

    let mut rejected = 0usize;
    for &code in &codes {
        let outcome = dispatcher.dispatch_one(&mut sampler)?;
        if matches!(outcome, DispatchOutcome::Rejected(_)) {
            rejected += 1;
        }
        if json_out {
            println!("{}", json!({ "code": code, "outcome": outcome_name(outcome) }));
        }
    }
    tracing::info!(commands = codes.len(), rejected, "dispatch finished");
    Ok(())
}

fn outcome_name(o: DispatchOutcome) -> &'static str {
    match o {
        DispatchOutcome::Configured => "configured",
        DispatchOutcome::ReadingHandled => "reading",
        DispatchOutcome::Rejected(_) => "rejected",
    }
}

pub fn read(
    cfg: &Config,
    count: u16,
    model: ModelArg,
    distance_cm: f32,
    json_out: bool,
) -> Result<()> {
    let (_target, mut sampler) = backend::sim_sampler(cfg, distance_cm)?;
    let model = DistanceModel::from(model);
    let mut out = std::io::stdout().lock();
    for _ in 0..count {
        let raw = sampler.read_raw();
        let cm = model.convert(raw);
        if json_out {
            writeln!(out, "{}", json!({ "raw": raw, "cm": cm, "model": model.name() }))?;
        } else {
            write!(out, "{}", reply_line(raw, cm))?;
        }
    }
    Ok(())
}

pub fn convert(raw: u16, json_out: bool) -> Result<()> {
    let analytical = analytical_convert(raw);
    let calibrated = calibrated_convert(raw);
    if raw > 1023 {
        tracing::warn!(raw, "code outside the 10-bit range");
    }
    if json_out {
        println!(
            "{}",
            json!({ "raw": raw, "analytical_cm": analytical, "calibrated_cm": calibrated })
        );
    } else {
        println!("raw {raw}: analytical {analytical:.2} cm, calibrated {calibrated:.2} cm");
    }
    Ok(())
}

pub fn fit(path: &Path, json_out: bool) -> Result<()> {
    let rows = ir_config::load_telemetry_csv(path)?;
    let fit = CubicFit::from_rows(&rows)?;
    let model = CubicModel::from(&fit);
    let [c0, c1, c2, c3] = fit.coefficients;
    if json_out {
        println!(
            "{}",
            json!({
                "points": fit.points,
                "coefficients": [c0, c1, c2, c3],
                "rms_cm": fit.rms_cm,
                "at_raw_500_cm": model.eval(500),
            })
        );
    } else {
        println!("points: {}", fit.points);
        println!("cm = {c0:.6} + {c1:.6e}*r + {c2:.6e}*r^2 + {c3:.6e}*r^3");
        println!("rms residual: {:.3} cm", fit.rms_cm);
        println!(
            "at r=500: fitted {:.2} cm, factory {:.2} cm",
            model.eval(500),
            calibrated_convert(500)
        );
    }
    Ok(())
}

pub fn self_check(cfg: &Config, json_out: bool) -> Result<()> {
    let adc = AdcConfig::try_from(&cfg.adc)?;
    let target = SimulatedTarget::new(20.0).with_jitter(0);
    let mut sampler = Sampler::with_config(SimulatedAdc::new(target), adc);
    sampler.configure();

    let regs = sampler.registers();
    let (mux, control) = (regs.mux(), regs.control());
    if adc == AdcConfig::IR_SENSOR && (mux != IR_MUX_VALUE || control != IR_CONTROL_VALUE) {
        eyre::bail!("converter registers mismatch: mux {mux:#04x}, control {control:#04x}");
    }

    let raw = sampler.read_raw();
    let cm = analytical_convert(raw);
    if !(15.0..=25.0).contains(&cm) {
        eyre::bail!("self-check reading out of range: raw {raw} -> {cm:.2} cm at 20 cm");
    }
    if json_out {
        println!(
            "{}",
            json!({ "ok": true, "mux": mux, "control": control, "raw": raw, "cm": cm })
        );
    } else {
        println!("ok: mux {mux:#04x}, control {control:#04x}, raw {raw} -> {cm:.2} cm");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_parse_from_whitespace() {
        assert_eq!(parse_codes(" 0 1\t7\n255 ").unwrap(), vec![0, 1, 7, 255]);
        assert!(parse_codes("").unwrap().is_empty());
    }

    #[test]
    fn out_of_range_code_is_rejected() {
        let err = parse_codes("0 256").unwrap_err();
        assert!(err.to_string().contains("invalid command code '256'"));
    }
}
