//! Conversions from `ir_config` file types to `ir_core` runtime types.

use crate::adc::{AdcConfig, Prescaler, VoltageReference};
use crate::config::{CalibrationOptions, CalibrationTiming};
use crate::distance::CubicModel;
use crate::error::IrError;

// ── AdcConfig ────────────────────────────────────────────────────────────────

impl From<ir_config::Reference> for VoltageReference {
    fn from(r: ir_config::Reference) -> Self {
        match r {
            ir_config::Reference::Aref => VoltageReference::Aref,
            ir_config::Reference::Avcc => VoltageReference::Avcc,
            ir_config::Reference::Internal2v56 => VoltageReference::Internal2V56,
        }
    }
}

/// Fails only for a prescaler that is not a power of two in 2..=128, which
/// `Config::validate` already rejects.
impl TryFrom<&ir_config::AdcCfg> for AdcConfig {
    type Error = IrError;

    fn try_from(c: &ir_config::AdcCfg) -> Result<Self, IrError> {
        let prescaler = Prescaler::from_divisor(c.prescaler).ok_or_else(|| {
            IrError::State(format!("unsupported ADC prescaler {}", c.prescaler))
        })?;
        Ok(Self {
            reference: c.reference.into(),
            channel: c.channel,
            enabled: true,
            prescaler,
            interrupt_enable: false,
        })
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&ir_config::CalibrationCfg> for CalibrationTiming {
    fn from(c: &ir_config::CalibrationCfg) -> Self {
        Self {
            startup_ms: c.startup_ms,
            settle_ms: c.settle_ms,
            sample_interval_ms: c.sample_interval_ms,
        }
    }
}

impl From<&ir_config::CalibrationCfg> for CalibrationOptions {
    fn from(c: &ir_config::CalibrationCfg) -> Self {
        Self {
            stream_telemetry: c.stream_telemetry,
            save_means: c.save_means,
        }
    }
}

// ── Offline fit ──────────────────────────────────────────────────────────────

impl From<&ir_config::CubicFit> for CubicModel {
    fn from(fit: &ir_config::CubicFit) -> Self {
        let [c0, c1, c2, c3] = fit.coefficients;
        CubicModel::new([c0 as f32, c1 as f32, c2 as f32, c3 as f32])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adc::{IR_CONTROL_VALUE, IR_MUX_VALUE};

    #[test]
    fn default_file_config_is_the_ir_sensor() {
        let cfg = ir_config::Config::default();
        let adc = AdcConfig::try_from(&cfg.adc).unwrap();
        assert_eq!(adc, AdcConfig::IR_SENSOR);
        assert_eq!(adc.mux_bits(), IR_MUX_VALUE);
        assert_eq!(adc.control_bits(), IR_CONTROL_VALUE);
        assert_eq!(
            CalibrationTiming::from(&cfg.calibration),
            CalibrationTiming::default()
        );
    }

    #[test]
    fn bad_prescaler_is_rejected() {
        let cfg = ir_config::AdcCfg {
            prescaler: 100,
            ..ir_config::AdcCfg::default()
        };
        assert!(matches!(AdcConfig::try_from(&cfg), Err(IrError::State(_))));
    }
}
