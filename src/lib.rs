//! S11 acquisition for receiver calibration.
//!
//! Drives a network analyser over SCPI to take one-port reflection
//! measurements of the calibration loads selected through an SP4T switch, and
//! repeats cheap sweeps until the switch path has warmed up.
//!
//! ```no_run
//! use autocal::prelude::*;
//!
//! let config = VnaConfig::default();
//! let (mut session, _identity) = VnaSession::connect_and_identify(&config)?;
//! let s11 = measure_s11(
//!     &mut session,
//!     &config.sweep,
//!     &MeasurementSettings::standard(),
//!     Some(std::path::Path::new("Open01.s1p")),
//!     true,
//! )?;
//! assert_eq!(config.sweep.points, s11.nrows());
//! # Ok::<(), autocal::error::VnaError>(())
//! ```

pub mod block;
pub mod config;
pub mod enums;
pub mod error;
pub mod file;
pub mod frequency;
pub mod math;
pub mod measurement;
pub mod prelude;
pub mod procedure;
pub mod session;
pub mod sim;
pub mod switch;
pub mod trace;
pub mod warmup;
