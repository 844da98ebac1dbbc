//! Reflection-standard selection through the switch power supply.
//!
//! The supply voltage picks which standard the SP4T switch presents to the
//! receiver input; it is set through four digital output lines.

use crate::config::{seconds, Timing};
use crate::error::{Result, VnaError};
use core::fmt;
use simple_error::{bail, SimpleError};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// States of the four switch lines, in line order.
pub type SwitchPattern = [bool; 4];

/// Digital output lines driving the switch supply. The last one enables it.
pub const SWITCH_LINES: [u8; 4] = [4, 5, 6, 7];

const ENABLE_LINE: u8 = 7;

/// Line states for a nominal supply voltage.
pub fn voltage_settings(voltage: f64) -> Result<SwitchPattern, SimpleError> {
    if voltage == 37.0 {
        Ok([true, true, true, false])
    } else if voltage == 34.0 {
        Ok([true, true, false, false])
    } else if voltage == 31.3 {
        Ok([true, false, true, false])
    } else if voltage == 28.0 {
        Ok([false, true, true, false])
    } else if voltage == 0.0 {
        Ok([true, true, true, true])
    } else {
        bail!("voltage {} not understood", voltage)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Standard {
    External,
    Match,
    Short,
    Open,
    Off,
}

impl Standard {
    /// Standards measured for every load, in measurement order.
    pub const LOADS: [Standard; 4] = [
        Standard::External,
        Standard::Match,
        Standard::Short,
        Standard::Open,
    ];

    pub fn voltage(&self) -> f64 {
        match self {
            Standard::External => 37.0,
            Standard::Match => 34.0,
            Standard::Short => 31.3,
            Standard::Open => 28.0,
            Standard::Off => 0.0,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Standard::External => "External",
            Standard::Match => "Match",
            Standard::Short => "Short",
            Standard::Open => "Open",
            Standard::Off => "Off",
        }
    }

    pub fn from_str(val: &str) -> Result<Standard, SimpleError> {
        match val.to_lowercase().as_str() {
            "external" => Ok(Standard::External),
            "match" => Ok(Standard::Match),
            "short" => Ok(Standard::Short),
            "open" => Ok(Standard::Open),
            "off" => Ok(Standard::Off),
            _ => bail!("standard '{}' not recognized", val),
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A bank of digital output lines, e.g. the FIO lines of a LabJack.
pub trait DigitalOutput {
    fn set_line(&mut self, line: u8, high: bool) -> Result<()>;
}

pub struct SwitchController<D: DigitalOutput> {
    output: D,
    line_settle: Duration,
}

impl<D: DigitalOutput> SwitchController<D> {
    pub fn new(output: D, timing: &Timing) -> SwitchController<D> {
        SwitchController {
            output,
            line_settle: seconds(timing.line_settle),
        }
    }

    pub fn output(&self) -> &D {
        &self.output
    }

    /// Drive the lines for `voltage`. Nothing is written for an unknown
    /// voltage.
    pub fn set_voltage(&mut self, voltage: f64) -> Result<()> {
        let pattern = voltage_settings(voltage).map_err(VnaError::InvalidVoltage)?;
        debug!("switch voltage {} -> {:?}", voltage, pattern);

        for (line, high) in SWITCH_LINES[..3].iter().zip(pattern) {
            self.output.set_line(*line, high)?;
        }
        if !self.line_settle.is_zero() {
            thread::sleep(self.line_settle);
        }
        self.output.set_line(ENABLE_LINE, pattern[3])
    }

    pub fn select(&mut self, standard: Standard) -> Result<()> {
        self.set_voltage(standard.voltage())
    }

    /// Switch the supply off after a measurement.
    pub fn release(&mut self) -> Result<()> {
        self.output.set_line(ENABLE_LINE, true)
    }

    /// All lines high: supply off, nothing selected.
    pub fn safe_state(&mut self) -> Result<()> {
        for line in SWITCH_LINES {
            self.output.set_line(line, true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::VnaError;
    use crate::sim::RecordingOutput;

    #[test]
    fn voltage_table() {
        assert_eq!([true, true, true, false], voltage_settings(37.0).unwrap());
        assert_eq!([true, true, false, false], voltage_settings(34.0).unwrap());
        assert_eq!([true, false, true, false], voltage_settings(31.3).unwrap());
        assert_eq!([false, true, true, false], voltage_settings(28.0).unwrap());
        assert_eq!([true, true, true, true], voltage_settings(0.0).unwrap());
    }

    #[test]
    fn undefined_voltages_rejected() {
        for v in [12.0, 31.0, 31.30001, 36.9, -37.0, 100.0, f64::NAN] {
            assert!(voltage_settings(v).is_err(), "voltage {} accepted", v);
        }
    }

    #[test]
    fn standards_map_to_table() {
        for standard in Standard::LOADS {
            assert!(voltage_settings(standard.voltage()).is_ok());
            assert_eq!(standard, Standard::from_str(standard.name()).unwrap());
        }
        assert_eq!(31.3, Standard::Short.voltage());
        assert!(Standard::from_str("hotload").is_err());
    }

    #[test]
    fn set_voltage_writes_enable_last() {
        let output = RecordingOutput::new();
        let mut switch = SwitchController::new(output.clone(), &Timing::none());
        switch.select(Standard::Short).unwrap();

        assert_eq!(
            vec![(4, true), (5, false), (6, true), (7, false)],
            output.writes()
        );

        switch.release().unwrap();
        assert_eq!(Some(true), output.line(7));
    }

    #[test]
    fn invalid_voltage_writes_nothing() {
        let output = RecordingOutput::new();
        let mut switch = SwitchController::new(output.clone(), &Timing::none());

        assert!(matches!(
            switch.set_voltage(12.0),
            Err(VnaError::InvalidVoltage(_))
        ));
        assert!(output.writes().is_empty());
    }

    #[test]
    fn safe_state_raises_all_lines() {
        let output = RecordingOutput::new();
        let mut switch = SwitchController::new(output.clone(), &Timing::none());
        switch.safe_state().unwrap();

        for line in SWITCH_LINES {
            assert_eq!(Some(true), output.line(line));
        }
    }
}
