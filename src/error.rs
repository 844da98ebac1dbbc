use simple_error::SimpleError;
use std::fmt;
use std::io;

/// Error types for VNA acquisition
#[derive(Debug)]
pub enum VnaError {
    Config(String),
    Connection(io::Error),
    Framing(String),
    InvalidParameters(String),
    InvalidVoltage(SimpleError),
    Io(io::Error),
    Parse(String),
    Serialize(String),
    ShapeMismatch(String),
}

impl fmt::Display for VnaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VnaError::Config(msg) => write!(f, "Configuration error: {}", msg),
            VnaError::Connection(err) => write!(f, "Connection error: {}", err),
            VnaError::Framing(msg) => write!(f, "Block framing error: {}", msg),
            VnaError::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
            VnaError::InvalidVoltage(err) => write!(f, "Invalid voltage: {}", err),
            VnaError::Io(err) => write!(f, "File error: {}", err),
            VnaError::Parse(msg) => write!(f, "Parse error: {}", msg),
            VnaError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
            VnaError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
        }
    }
}

impl std::error::Error for VnaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VnaError::Connection(err) | VnaError::Io(err) => Some(err),
            VnaError::InvalidVoltage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for VnaError {
    fn from(err: io::Error) -> Self {
        VnaError::Io(err)
    }
}

pub type Result<T, E = VnaError> = std::result::Result<T, E>;
