//! Collaborator assembly: simulated by default, Raspberry Pi GPIO and UART
//! with the `hardware` feature.

use eyre::{Result, WrapErr};
use ir_config::Config;
use ir_core::calibration::distances;
use ir_core::{AdcConfig, Sampler};
use ir_hardware::{SimulatedAdc, SimulatedOperator, SimulatedTarget};
use ir_traits::{AckQueue, Button, ErrorCategory, ErrorReporter, SerialTx};
use std::io::Write;

/// Converter over a simulated target, configured from `[adc]`.
///
/// The target is shared with the returned handle so callers can move it.
pub fn sim_sampler(
    cfg: &Config,
    distance_cm: f32,
) -> Result<(SimulatedTarget, Sampler<SimulatedAdc>)> {
    let adc = AdcConfig::try_from(&cfg.adc)?;
    let target = SimulatedTarget::new(distance_cm);
    let regs = SimulatedAdc::new(target.clone());
    let mut sampler = Sampler::with_config(regs, adc);
    sampler.configure();
    tracing::debug!(
        conversion_clock_hz = adc.conversion_clock_hz(cfg.adc.cpu_hz),
        channel = adc.channel,
        "simulated converter ready"
    );
    Ok((target, sampler))
}

/// Operator push-button for a calibration sweep.
///
/// In simulation the operator moves the target to each mark on every press;
/// `interactive` additionally waits for Enter on stdin.
#[cfg(not(feature = "hardware"))]
pub fn operator_button(
    _cfg: &Config,
    target: &SimulatedTarget,
    interactive: bool,
) -> Result<Box<dyn Button>> {
    let marks = distances().map(f32::from);
    let mut op = SimulatedOperator::new(target.clone(), marks);
    if interactive {
        op = op.with_button(Box::new(ir_ui::LineButton::stdin()));
    }
    Ok(Box::new(op))
}

#[cfg(feature = "hardware")]
pub fn operator_button(
    cfg: &Config,
    target: &SimulatedTarget,
    _interactive: bool,
) -> Result<Box<dyn Button>> {
    let Some(pin) = cfg.pins.button else {
        eyre::bail!("pins.button is required for hardware calibration");
    };
    let button = ir_hardware::gpio::GpioButton::new(pin, cfg.pins.button_active_low)
        .wrap_err("open push-button pin")?;
    // The converter is still simulated; keep its target following the sweep.
    let marks = distances().map(f32::from);
    let op = SimulatedOperator::new(target.clone(), marks).with_button(Box::new(button));
    Ok(Box::new(op))
}

/// Stream for protocol text (acks, replies, telemetry) that is not part of
/// the command's result. Under `--json` stdout carries only JSON lines, so
/// this text moves to stderr.
pub fn protocol_out(json_out: bool) -> Box<dyn Write> {
    if json_out {
        Box::new(std::io::stderr())
    } else {
        Box::new(std::io::stdout())
    }
}

/// Telemetry sink: a file, the UART with the `hardware` feature, or the
/// protocol stream.
#[cfg_attr(feature = "hardware", allow(unused_variables))]
pub fn telemetry_sink(
    cfg: &Config,
    out: Option<&std::path::Path>,
    json_out: bool,
) -> Result<Box<dyn SerialTx>> {
    if let Some(path) = out {
        let f = std::fs::File::create(path)
            .wrap_err_with(|| format!("create telemetry file {}", path.display()))?;
        return Ok(Box::new(ir_hardware::WriteLink::new(std::io::BufWriter::new(f))));
    }
    #[cfg(feature = "hardware")]
    {
        let uart = ir_hardware::gpio::UartLink::open(&cfg.serial.device, cfg.serial.baud)
            .wrap_err("open serial device")?;
        return Ok(Box::new(uart));
    }
    #[cfg(not(feature = "hardware"))]
    {
        tracing::debug!(
            device = %cfg.serial.device,
            to_stderr = json_out,
            "telemetry to the console in simulation"
        );
        Ok(Box::new(ir_hardware::WriteLink::new(protocol_out(json_out))))
    }
}

/// Ack queue echoing each acknowledged byte as an `ack <code>` line.
pub struct EchoAck<W: Write> {
    out: W,
}

impl<W: Write> EchoAck<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> AckQueue for EchoAck<W> {
    fn enqueue(
        &mut self,
        byte: u8,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        writeln!(self.out, "ack {byte}")?;
        Ok(())
    }
}

/// Error reporter writing to stderr and the log.
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&mut self, category: ErrorCategory, message: &str) {
        tracing::warn!(category = category.as_str(), message, "error reported");
        eprintln!("error {}: {message}", category.as_str());
    }
}
