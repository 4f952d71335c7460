//! Human-readable error descriptions and structured JSON error formatting.

use ir_core::error::{BuildError, IrError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDisplay => {
                "What happened: No display was provided to the calibration controller.\nLikely causes: The terminal display failed to initialize or was not wired into the builder.\nHow to fix: Pass a display via with_display(...).".to_string()
            }
            BuildError::MissingButton => {
                "What happened: No push-button was provided to the calibration controller.\nLikely causes: The button failed to initialize or was not wired into the builder.\nHow to fix: Check [pins] button in the config, or pass a button via with_button(...).".to_string()
            }
        };
    }

    if let Some(ie) = err.downcast_ref::<IrError>() {
        return match ie {
            IrError::Transport(msg) => format!(
                "What happened: Serial transport failed ({msg}).\nLikely causes: Serial device unplugged, wrong [serial] device or baud, or the telemetry file could not be written.\nHow to fix: Check the cable and [serial] settings, then rerun."
            ),
            IrError::Display(msg) => format!(
                "What happened: The display stopped responding ({msg}).\nLikely causes: Terminal closed or output redirected to a full device.\nHow to fix: Rerun from an interactive terminal."
            ),
            IrError::Input(msg) => format!(
                "What happened: Operator input failed ({msg}).\nLikely causes: stdin closed before the sweep finished, or the button pin is miswired.\nHow to fix: Run --interactive from a terminal, or check [pins] button."
            ),
            IrError::Handler(msg) => format!(
                "What happened: The reading handler failed ({msg}).\nLikely causes: The reply link closed while answering a reading request.\nHow to fix: Re-run with --log-level=debug for details."
            ),
            IrError::HardwareFault(msg) => format!(
                "What happened: Hardware fault ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
            ),
            IrError::State(msg) => format!(
                "What happened: Invalid state ({msg}).\nLikely causes: Telemetry streaming without a serial transport, or an unsupported converter setting.\nHow to fix: Check [adc] and [calibration] in the config."
            ),
        };
    }

    // String-based heuristics for errors coming from config or CSV input
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("telemetry csv must have headers") {
        return "Invalid headers in telemetry CSV. Expected 'Distances, Readings'.".to_string();
    }

    if lower.contains("four distinct") {
        return format!(
            "What happened: Not enough telemetry to fit a cubic ({msg}).\nLikely causes: The capture covers too few distances or the sensor output was constant.\nHow to fix: Capture a full sweep with `ir calibrate --stream --telemetry-out FILE`."
        );
    }

    if lower.contains("must be")
        || lower.contains("unreasonably large")
        || lower.contains("parse config")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or misspelled values in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; anything unclassified returns 1.
/// Argument errors exit with clap's 2.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ie) = err.downcast_ref::<IrError>() {
        return match ie {
            IrError::Transport(_) => 3,
            IrError::Display(_) => 4,
            IrError::Input(_) => 5,
            IrError::Handler(_) => 6,
            IrError::HardwareFault(_) => 7,
            IrError::State(_) => 8,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 9;
    }
    1
}

pub fn error_kind(err: &eyre::Report) -> &'static str {
    if let Some(ie) = err.downcast_ref::<IrError>() {
        return match ie {
            IrError::Transport(_) => "Transport",
            IrError::Display(_) => "Display",
            IrError::Input(_) => "Input",
            IrError::Handler(_) => "Handler",
            IrError::HardwareFault(_) => "HardwareFault",
            IrError::State(_) => "State",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": error_kind(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
