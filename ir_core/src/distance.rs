//! Raw code → centimeter conversion.
//!
//! Both converters are pure and total: every `u16` input yields a value, and
//! out-of-range codes produce out-of-range (possibly negative) distances.
//! Arithmetic is single precision so results match the firmware bit for bit.

/// Reference voltage used by the analytical model.
pub const V_REF: f32 = 2.56;
/// Number of converter steps (10 bits).
pub const ADC_STEPS: f32 = 1024.0;
/// Datasheet fit of 1/(d + 0.42) against output voltage.
pub const SLOPE: f32 = 0.042977;
pub const INTERCEPT: f32 = -0.009167;
pub const BIAS_CM: f32 = 0.42;

/// Datasheet model: `1 / (SLOPE * v + INTERCEPT) - BIAS_CM` with
/// `v = (V_REF / 1024) * raw`. Uses no calibration data.
#[inline]
pub fn analytical_convert(raw: u16) -> f32 {
    let v = (V_REF / ADC_STEPS) * f32::from(raw);
    1.0 / (SLOPE * v + INTERCEPT) - BIAS_CM
}

/// Third-order polynomial in the raw code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicModel {
    /// Intercept, then first-, second- and third-order coefficients.
    pub coef: [f32; 4],
}

impl CubicModel {
    /// Coefficients fit offline to bench calibration data.
    pub const FACTORY: Self = Self::new([100.5, -0.2811, 3.148e-4, -1.254e-7]);

    pub const fn new(coef: [f32; 4]) -> Self {
        Self { coef }
    }

    /// Horner evaluation: `c0 + raw*(c1 + raw*(c2 + raw*c3))`.
    #[inline]
    pub fn eval(&self, raw: u16) -> f32 {
        let d = f32::from(raw);
        let c = &self.coef;
        c[0] + d * (c[1] + d * (c[2] + d * c[3]))
    }
}

/// Calibrated model with the factory coefficients. Deliberately independent
/// of any live `CalibrationTable`.
#[inline]
pub fn calibrated_convert(raw: u16) -> f32 {
    CubicModel::FACTORY.eval(raw)
}

/// Selectable conversion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DistanceModel {
    Analytical,
    #[default]
    Calibrated,
    /// A cubic refit from captured telemetry.
    Fitted(CubicModel),
}

impl DistanceModel {
    pub fn convert(&self, raw: u16) -> f32 {
        match self {
            DistanceModel::Analytical => analytical_convert(raw),
            DistanceModel::Calibrated => calibrated_convert(raw),
            DistanceModel::Fitted(m) => m.eval(raw),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistanceModel::Analytical => "analytical",
            DistanceModel::Calibrated => "calibrated",
            DistanceModel::Fitted(_) => "fitted",
        }
    }
}
