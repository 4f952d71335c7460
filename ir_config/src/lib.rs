#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration data files for the IR distance subsystem.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Telemetry CSV (the calibration stream captured on the host) is loaded
//!   with a strict header and can be refit offline to a cubic raw→cm model.
//! - The per-distance mean table is exported as CSV, written atomically.
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Header of the calibration telemetry stream.
pub const TELEMETRY_HEADERS: [&str; 2] = ["Distances", "Readings"];
/// Header of an exported calibration table.
pub const TABLE_HEADERS: [&str; 2] = ["distance_cm", "mean_raw"];

/// Converter reference voltage selection.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    Aref,
    Avcc,
    #[default]
    Internal2v56,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdcCfg {
    pub reference: Reference,
    /// Single-ended input channel, 0..=7.
    pub channel: u8,
    /// Clock division factor: one of 2, 4, 8, 16, 32, 64, 128.
    pub prescaler: u16,
    /// CPU clock in Hz; only used to log the resulting conversion clock.
    pub cpu_hz: u32,
}

impl Default for AdcCfg {
    fn default() -> Self {
        Self {
            reference: Reference::Internal2v56,
            channel: 2,
            prescaler: 128,
            cpu_hz: 16_000_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Delay after collaborators are initialized, before the first prompt.
    pub startup_ms: u64,
    /// Delay between the button press and the first sample at a distance.
    pub settle_ms: u64,
    /// Delay after every sample.
    pub sample_interval_ms: u64,
    pub stream_telemetry: bool,
    pub save_means: bool,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            startup_ms: 500,
            settle_ms: 500,
            sample_interval_ms: 20,
            stream_telemetry: false,
            save_means: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialCfg {
    pub device: String,
    pub baud: u32,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            device: "/dev/serial0".to_string(),
            baud: 9600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Pins {
    /// BCM pin of the calibration push-button (hardware builds only)
    pub button: Option<u8>,
    /// Treat low level as pressed when true
    pub button_active_low: bool,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            button: None,
            button_active_low: true,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub adc: AdcCfg,
    pub calibration: CalibrationCfg,
    pub serial: SerialCfg,
    pub pins: Pins,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

const PRESCALERS: [u16; 7] = [2, 4, 8, 16, 32, 64, 128];
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const ROTATIONS: [&str; 3] = ["never", "daily", "hourly"];

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // ADC
        if self.adc.channel > 7 {
            eyre::bail!("adc.channel must be in 0..=7");
        }
        if !PRESCALERS.contains(&self.adc.prescaler) {
            eyre::bail!("adc.prescaler must be one of 2, 4, 8, 16, 32, 64, 128");
        }
        if self.adc.cpu_hz == 0 {
            eyre::bail!("adc.cpu_hz must be > 0");
        }

        // Calibration timing
        if self.calibration.startup_ms > 60_000 {
            eyre::bail!("calibration.startup_ms is unreasonably large (>60s)");
        }
        if self.calibration.settle_ms > 60_000 {
            eyre::bail!("calibration.settle_ms is unreasonably large (>60s)");
        }
        if self.calibration.sample_interval_ms > 10_000 {
            eyre::bail!("calibration.sample_interval_ms is unreasonably large (>10s)");
        }

        // Serial
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }
        if self.serial.device.trim().is_empty() {
            eyre::bail!("serial.device must not be empty");
        }

        // Logging
        if let Some(level) = self.logging.level.as_deref()
            && !LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.level must be one of error|warn|info|debug|trace");
        }
        if let Some(rot) = self.logging.rotation.as_deref()
            && !ROTATIONS.contains(&rot.to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

/// One captured telemetry line: `<distance>, <raw_reading>`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryRow {
    #[serde(rename = "Distances")]
    pub distance_cm: u16,
    #[serde(rename = "Readings")]
    pub raw: u16,
}

/// Parse a telemetry stream. The header must be exactly `Distances, Readings`
/// (whitespace around fields is ignored).
pub fn parse_telemetry<R: std::io::Read>(reader: R) -> eyre::Result<Vec<TelemetryRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read telemetry headers: {}", e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != TELEMETRY_HEADERS {
        eyre::bail!(
            "telemetry CSV must have headers 'Distances, Readings', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TelemetryRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid telemetry row {}: {}", idx + 2, e))?;
        if row.raw > 1023 {
            eyre::bail!(
                "invalid telemetry row {}: reading {} exceeds 10-bit range",
                idx + 2,
                row.raw
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_telemetry_csv(path: &Path) -> eyre::Result<Vec<TelemetryRow>> {
    let f = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open telemetry CSV {:?}: {}", path, e))?;
    parse_telemetry(std::io::BufReader::new(f))
}

/// Least-squares cubic model `cm = c0 + c1*raw + c2*raw^2 + c3*raw^3`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicFit {
    /// Intercept, then first-, second- and third-order coefficients.
    pub coefficients: [f64; 4],
    /// Root-mean-square residual over the fitted rows, in cm.
    pub rms_cm: f64,
    pub points: usize,
}

impl CubicFit {
    /// Fit distance as a cubic in raw code over all rows (normal equations).
    ///
    /// Raw codes are scaled to [0, 1) before solving to keep the 4x4 system
    /// well conditioned; coefficients are rescaled afterwards.
    pub fn from_rows(rows: &[TelemetryRow]) -> eyre::Result<Self> {
        let mut distinct: Vec<u16> = rows.iter().map(|r| r.raw).collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 4 {
            eyre::bail!(
                "cubic fit requires at least four distinct readings, got {}",
                distinct.len()
            );
        }

        const SCALE: f64 = 1024.0;
        let mut ata = [[0.0f64; 4]; 4];
        let mut aty = [0.0f64; 4];
        for r in rows {
            let s = f64::from(r.raw) / SCALE;
            let y = f64::from(r.distance_cm);
            let pow = [1.0, s, s * s, s * s * s];
            for i in 0..4 {
                for j in 0..4 {
                    ata[i][j] += pow[i] * pow[j];
                }
                aty[i] += pow[i] * y;
            }
        }

        let scaled = solve4(ata, aty)
            .ok_or_else(|| eyre::eyre!("cubic fit is degenerate (singular normal matrix)"))?;
        let mut coefficients = [0.0f64; 4];
        let mut div = 1.0f64;
        for (k, c) in coefficients.iter_mut().enumerate() {
            *c = scaled[k] / div;
            div *= SCALE;
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            eyre::bail!("cubic fit produced non-finite coefficients");
        }

        let fit = Self {
            coefficients,
            rms_cm: 0.0,
            points: rows.len(),
        };
        let sumsq: f64 = rows
            .iter()
            .map(|r| {
                let e = f64::from(r.distance_cm) - fit.eval(f64::from(r.raw));
                e * e
            })
            .sum();
        Ok(Self {
            rms_cm: (sumsq / rows.len() as f64).sqrt(),
            ..fit
        })
    }

    pub fn eval(&self, raw: f64) -> f64 {
        let c = &self.coefficients;
        c[0] + raw * (c[1] + raw * (c[2] + raw * c[3]))
    }
}

// Gaussian elimination with partial pivoting.
fn solve4(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let pivot = (col..4).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..4 {
            let f = a[row][col] / a[col][col];
            for k in col..4 {
                a[row][k] -= f * a[col][k];
            }
            b[row] -= f * b[col];
        }
    }
    let mut x = [0.0f64; 4];
    for i in (0..4).rev() {
        let mut s = b[i];
        for k in i + 1..4 {
            s -= a[i][k] * x[k];
        }
        x[i] = s / a[i][i];
    }
    Some(x)
}

/// Write `(distance_cm, mean_raw)` rows as CSV. The file is replaced
/// atomically (temp file + rename) so a crash never leaves half a table.
pub fn save_table_csv(
    path: &Path,
    rows: impl IntoIterator<Item = (u8, u16)>,
) -> eyre::Result<()> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(TABLE_HEADERS)?;
    for (d, mean) in rows {
        wtr.write_record([d.to_string(), mean.to_string()])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| eyre::eyre!("flush calibration table: {}", e))?;

    let tmp = path.with_extension("csv.new");
    {
        use std::io::Write;
        let mut f = std::fs::File::create(&tmp)
            .map_err(|e| eyre::eyre!("create {:?}: {}", tmp, e))?;
        f.write_all(&bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).map_err(|e| eyre::eyre!("replace {:?}: {}", path, e))?;
    Ok(())
}
