use core::fmt;
use faer::complex_native::c64;
use serde::{Deserialize, Serialize};
use simple_error::{bail, SimpleError};

/// Frequency unit prefix used on touchstone option lines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Unit {
    Base,
    Kilo,
    Mega,
    Giga,
    Tera,
}

impl Unit {
    pub fn from_str(val: &str) -> Result<Unit, SimpleError> {
        match val {
            "" => Ok(Unit::Base),
            "k" | "K" => Ok(Unit::Kilo),
            "M" | "m" => Ok(Unit::Mega),
            "G" | "g" => Ok(Unit::Giga),
            "T" | "t" => Ok(Unit::Tera),
            _ => bail!("unit prefix '{}' not recognized", val),
        }
    }

    pub fn to_str(&self) -> &str {
        match self {
            Unit::Base => "",
            Unit::Kilo => "k",
            Unit::Mega => "M",
            Unit::Giga => "G",
            Unit::Tera => "T",
        }
    }

    pub fn scale(&self) -> f64 {
        match self {
            Unit::Base => 1.0,
            Unit::Kilo => 1e3,
            Unit::Mega => 1e6,
            Unit::Giga => 1e9,
            Unit::Tera => 1e12,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RFParameter {
    S,
    Y,
    Z,
}

impl RFParameter {
    // Convert text from a touchstone option line string into RFParameter type
    pub fn from_option_string(val: &str) -> Result<RFParameter, SimpleError> {
        match val.to_lowercase().as_str() {
            "s" => Ok(RFParameter::S),
            "y" => Ok(RFParameter::Y),
            "z" => Ok(RFParameter::Z),
            _ => bail!("string not a valid option line type"),
        }
    }

    pub fn to_str(&self) -> &str {
        match self {
            RFParameter::S => "S",
            RFParameter::Y => "Y",
            RFParameter::Z => "Z",
        }
    }
}

impl fmt::Display for RFParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RFDataFormat {
    RI,
    MA,
    DB,
}

impl RFDataFormat {
    // Convert text from a option line string into RFDataFormat type
    pub fn from_str(val: &str) -> Result<RFDataFormat, SimpleError> {
        match val {
            "RI" | "ri" => Ok(RFDataFormat::RI),
            "MA" | "ma" => Ok(RFDataFormat::MA),
            "DB" | "dB" | "db" => Ok(RFDataFormat::DB),
            _ => bail!("string not recognized"),
        }
    }

    // Convert RFDataFormat to a touchstone option line string
    pub fn to_str(&self) -> &str {
        match self {
            RFDataFormat::RI => "RI",
            RFDataFormat::MA => "MA",
            RFDataFormat::DB => "DB",
        }
    }

    pub fn parse(&self, x: f64, y: f64) -> c64 {
        match self {
            RFDataFormat::RI => c64 { re: x, im: y },
            RFDataFormat::MA => from_polar(x, f64::to_radians(y)),
            RFDataFormat::DB => from_polar(10_f64.powf(x / 20.0), f64::to_radians(y)),
        }
    }
}

impl fmt::Display for RFDataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

fn from_polar(r: f64, theta: f64) -> c64 {
    c64 {
        re: r * theta.cos(),
        im: r * theta.sin(),
    }
}

/// Trace display format selected with `CALC1:FORM` before a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceFormat {
    Magnitude,
    Phase,
    Real,
    Imaginary,
}

impl TraceFormat {
    pub fn scpi(&self) -> &str {
        match self {
            TraceFormat::Magnitude => "MLOG",
            TraceFormat::Phase => "PHASE",
            TraceFormat::Real => "REAL",
            TraceFormat::Imaginary => "IMAG",
        }
    }

    pub fn from_scpi(val: &str) -> Result<TraceFormat, SimpleError> {
        match val.trim().to_uppercase().as_str() {
            "MLOG" | "MAGNITUDE" => Ok(TraceFormat::Magnitude),
            "PHAS" | "PHASE" => Ok(TraceFormat::Phase),
            "REAL" => Ok(TraceFormat::Real),
            "IMAG" | "IMAGINARY" => Ok(TraceFormat::Imaginary),
            _ => bail!("trace format '{}' not recognized", val),
        }
    }

    /// Real-like traces go in the first value column of an S11 measurement.
    pub fn is_real_like(&self) -> bool {
        matches!(self, TraceFormat::Magnitude | TraceFormat::Real)
    }
}

impl fmt::Display for TraceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scpi())
    }
}

/// Pair of traces composed into one S11 measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentPair {
    #[default]
    RealImaginary,
    MagnitudePhase,
}

impl ComponentPair {
    pub fn formats(&self) -> (TraceFormat, TraceFormat) {
        match self {
            ComponentPair::RealImaginary => (TraceFormat::Real, TraceFormat::Imaginary),
            ComponentPair::MagnitudePhase => (TraceFormat::Magnitude, TraceFormat::Phase),
        }
    }

    pub fn data_format(&self) -> RFDataFormat {
        match self {
            ComponentPair::RealImaginary => RFDataFormat::RI,
            ComponentPair::MagnitudePhase => RFDataFormat::DB,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_cmp::*;

    #[test]
    fn unit_round_trip() {
        for unit in [Unit::Base, Unit::Kilo, Unit::Mega, Unit::Giga, Unit::Tera] {
            assert_eq!(unit, Unit::from_str(unit.to_str()).unwrap());
        }
        assert!(Unit::from_str("x").is_err());
    }

    #[test]
    fn data_format_parse() {
        let ri = RFDataFormat::RI.parse(0.5, -0.25);
        assert_eq!(ri.re, 0.5);
        assert_eq!(ri.im, -0.25);

        let ma = RFDataFormat::MA.parse(2.0, 90.0);
        assert!(approx_eq!(f64, ma.re, 0.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, ma.im, 2.0, epsilon = 1e-12));

        let db = RFDataFormat::DB.parse(-20.0, 0.0);
        assert!(approx_eq!(f64, db.re, 0.1, epsilon = 1e-12));
        assert!(approx_eq!(f64, db.im, 0.0, epsilon = 1e-12));
    }

    #[test]
    fn trace_format_scpi() {
        assert_eq!("REAL", TraceFormat::Real.scpi());
        assert_eq!("IMAG", TraceFormat::Imaginary.scpi());
        assert_eq!("MLOG", TraceFormat::Magnitude.scpi());
        assert_eq!("PHASE", TraceFormat::Phase.scpi());
        assert_eq!(TraceFormat::Phase, TraceFormat::from_scpi("phas").unwrap());
        assert!(TraceFormat::from_scpi("SMITH").is_err());
    }

    #[test]
    fn component_pairs() {
        assert_eq!(
            (TraceFormat::Real, TraceFormat::Imaginary),
            ComponentPair::RealImaginary.formats()
        );
        assert_eq!(RFDataFormat::DB, ComponentPair::MagnitudePhase.data_format());
        assert!(ComponentPair::MagnitudePhase.formats().0.is_real_like());
        assert!(!ComponentPair::MagnitudePhase.formats().1.is_real_like());
    }
}
