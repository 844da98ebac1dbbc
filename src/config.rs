//! Instrument configuration.
//!
//! One `VnaConfig` is built at start-up (from YAML or defaults) and passed by
//! reference to everything that talks to the instrument.

use crate::enums::ComponentPair;
use crate::error::{Result, VnaError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Fixed waits standing in for instrument completion, in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// After `*IDN?`, before reading the identification.
    pub idn_settle: f64,
    /// After setting output power and attenuation.
    pub power_settle: f64,
    /// After `INIT:CONT ON`, before autoscaling the display.
    pub trigger_settle: f64,
    /// After `MMEM:TRAN?`, before reading the block.
    pub transfer_settle: f64,
    /// Between the first three switch lines and the enable line.
    pub line_settle: f64,
    /// Multiplier on the display and init waits of [`MeasurementSettings`].
    pub measurement_scale: f64,
}

impl Timing {
    /// No waiting at all, including the per-measurement waits; for simulated
    /// instruments.
    pub fn none() -> Timing {
        Timing {
            idn_settle: 0.0,
            power_settle: 0.0,
            trigger_settle: 0.0,
            transfer_settle: 0.0,
            line_settle: 0.0,
            measurement_scale: 0.0,
        }
    }

    /// Wait after autoscaling the display for a measurement with `settings`.
    pub fn after_display(&self, settings: &MeasurementSettings) -> f64 {
        settings.sleep_after_display * self.measurement_scale
    }

    /// Wait after freezing the trace for a measurement with `settings`.
    pub fn after_init(&self, settings: &MeasurementSettings) -> f64 {
        settings.sleep_after_init * self.measurement_scale
    }
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            idn_settle: 0.05,
            power_settle: 0.5,
            trigger_settle: 10.0,
            transfer_settle: 1.0,
            line_settle: 0.1,
            measurement_scale: 1.0,
        }
    }
}

/// Convert a configured number of seconds into a sleep duration.
pub fn seconds(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

/// Sweep shared by every measurement of a calibration run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    pub start_hz: f64,
    pub stop_hz: f64,
    pub points: usize,
    pub if_bandwidth_hz: f64,
    pub cal_kit: String,
}

impl Default for SweepSettings {
    fn default() -> Self {
        SweepSettings {
            start_hz: 40e6,
            stop_hz: 200e6,
            points: 641,
            if_bandwidth_hz: 100.0,
            cal_kit: "85033E Agilent".to_string(),
        }
    }
}

impl fmt::Display for SweepSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IF                 = {} Hz", self.if_bandwidth_hz)?;
        writeln!(f, "Start freq         = {} MHz", self.start_hz / 1e6)?;
        writeln!(f, "Stop freq          = {} MHz", self.stop_hz / 1e6)?;
        writeln!(f, "No. of freq points = {}", self.points)?;
        write!(f, "Calibration kit    = '{}'", self.cal_kit)
    }
}

/// Per-measurement source and averaging settings.
///
/// The presets differ only in these constants; the measurement algorithm is
/// the same for all of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSettings {
    pub averages: u32,
    pub power_dbm: f64,
    pub attenuation_db: f64,
    /// Seconds to wait after autoscaling the display.
    pub sleep_after_display: f64,
    /// Seconds to wait after freezing the trace.
    pub sleep_after_init: f64,
    #[serde(default)]
    pub components: ComponentPair,
}

impl MeasurementSettings {
    pub fn standard() -> MeasurementSettings {
        MeasurementSettings {
            averages: 10,
            power_dbm: 0.0,
            attenuation_db: 0.0,
            sleep_after_display: 70.0,
            sleep_after_init: 5.0,
            components: ComponentPair::RealImaginary,
        }
    }

    /// Low-averaging sweep repeated while the switch path warms up.
    pub fn warmup() -> MeasurementSettings {
        MeasurementSettings {
            averages: 2,
            ..MeasurementSettings::standard()
        }
    }

    pub fn receiver_reading() -> MeasurementSettings {
        MeasurementSettings {
            averages: 30,
            power_dbm: -35.0,
            attenuation_db: 30.0,
            sleep_after_display: 230.0,
            sleep_after_init: 0.0,
            components: ComponentPair::RealImaginary,
        }
    }

    pub fn with_components(mut self, components: ComponentPair) -> MeasurementSettings {
        self.components = components;
        self
    }
}

impl Default for MeasurementSettings {
    fn default() -> Self {
        MeasurementSettings::standard()
    }
}

impl fmt::Display for MeasurementSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RF power output    = {} dBm", self.power_dbm)?;
        writeln!(f, "Attenuation        = {} dB", self.attenuation_db)?;
        write!(f, "No. of averaging   = {}", self.averages)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VnaConfig {
    pub host: String,
    pub port: u16,
    /// Seconds; 0 waits for the operating system default.
    pub connect_timeout: f64,
    /// Seconds; 0 blocks until data arrives.
    pub read_timeout: f64,
    pub read_buffer_size: usize,
    /// Instrument-side file used for real or magnitude traces.
    pub real_trace_path: String,
    /// Instrument-side file used for imaginary or phase traces.
    pub imag_trace_path: String,
    pub sweep: SweepSettings,
    pub timing: Timing,
}

impl Default for VnaConfig {
    fn default() -> Self {
        VnaConfig {
            host: "10.206.161.72".to_string(),
            port: 5025,
            connect_timeout: 5.0,
            read_timeout: 10.0,
            read_buffer_size: 180_000,
            real_trace_path: "D:\\Auto\\EDGES_m.csv".to_string(),
            imag_trace_path: "D:\\Auto\\EDGES_p.csv".to_string(),
            sweep: SweepSettings::default(),
            timing: Timing::default(),
        }
    }
}

impl VnaConfig {
    /// Load configuration from a YAML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VnaError::Config(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: VnaConfig =
            serde_yaml::from_str(yaml).map_err(|e| VnaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(|e| VnaError::Config(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| VnaError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep.points == 0 {
            return Err(VnaError::Config("sweep.points must be positive".to_string()));
        }
        if self.sweep.stop_hz <= self.sweep.start_hz {
            return Err(VnaError::Config(format!(
                "sweep.stop_hz ({}) must exceed sweep.start_hz ({})",
                self.sweep.stop_hz, self.sweep.start_hz
            )));
        }
        if self.read_buffer_size == 0 {
            return Err(VnaError::Config(
                "read_buffer_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
