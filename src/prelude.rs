//! autocal prelude.
//!
//! This module contains the most used types, traits and functions, which you
//! can import easily as a group.
//!
//! ```
//! use autocal::prelude::*;
//!
//! ```

#[doc(no_inline)]
pub use crate::config::{MeasurementSettings, SweepSettings, Timing, VnaConfig};

#[doc(no_inline)]
pub use crate::enums::{ComponentPair, RFDataFormat, TraceFormat, Unit};

#[doc(no_inline)]
pub use crate::error::{Result, VnaError};

#[doc(no_inline)]
pub use crate::file::{read_s11, write_s11};

#[doc(no_inline)]
pub use crate::frequency::Frequency;

#[doc(no_inline)]
pub use crate::measurement::{measure_s11, S11Measurement};

#[doc(no_inline)]
pub use crate::procedure::{
    measure_receiver_reading_s11, measure_switching_state_s11, take_all_load_s11, take_s11,
    vna_calib, CalibrationKind, SwitchingStateRun,
};

#[doc(no_inline)]
pub use crate::session::{Identity, Transport, VnaSession};

#[doc(no_inline)]
pub use crate::sim::{RecordingOutput, SimulatedVna};

#[doc(no_inline)]
pub use crate::switch::{DigitalOutput, Standard, SwitchController};

#[doc(no_inline)]
pub use crate::warmup::{take_warmup_s11, WarmupLoop, WarmupOutcome, WarmupState};
