//! S11 acquisition: configure, trigger, fetch two traces and compose them.

use crate::config::{MeasurementSettings, SweepSettings};
use crate::enums::{RFDataFormat, Unit};
use crate::error::{Result, VnaError};
use crate::file::write_s11;
use crate::frequency::Frequency;
use crate::session::{Transport, VnaSession};
use crate::trace::TraceSample;
use faer::complex_native::c64;
use faer::Row;
use std::path::Path;
use tracing::info;

/// One reflection measurement: a frequency axis and two value columns.
///
/// The columns hold real and imaginary parts for [`RFDataFormat::RI`], or
/// magnitude (dB) and phase (degrees) for [`RFDataFormat::DB`].
#[derive(Clone, Debug, PartialEq)]
pub struct S11Measurement {
    freq: Frequency,
    a: Row<f64>,
    b: Row<f64>,
    format: RFDataFormat,
}

impl S11Measurement {
    pub fn new(
        freq: Frequency,
        a: Row<f64>,
        b: Row<f64>,
        format: RFDataFormat,
    ) -> Result<S11Measurement> {
        if a.ncols() != freq.npts() || b.ncols() != freq.npts() {
            return Err(VnaError::ShapeMismatch(format!(
                "{} frequencies, {} and {} values",
                freq.npts(),
                a.ncols(),
                b.ncols()
            )));
        }
        Ok(S11Measurement { freq, a, b, format })
    }

    /// Frequency and first column from `real_like`, second column from
    /// `imag_like`.
    pub fn compose(
        real_like: &[TraceSample],
        imag_like: &[TraceSample],
        format: RFDataFormat,
    ) -> Result<S11Measurement> {
        if real_like.len() != imag_like.len() {
            return Err(VnaError::ShapeMismatch(format!(
                "real-like trace has {} points, imaginary-like trace has {}",
                real_like.len(),
                imag_like.len()
            )));
        }

        let n = real_like.len();
        Ok(S11Measurement {
            freq: Frequency::new(Row::<f64>::from_fn(n, |i| real_like[i].frequency_hz)),
            a: Row::<f64>::from_fn(n, |i| real_like[i].component_a),
            b: Row::<f64>::from_fn(n, |i| imag_like[i].component_a),
            format,
        })
    }

    pub fn nrows(&self) -> usize {
        self.freq.npts()
    }

    pub fn freq(&self) -> &Frequency {
        &self.freq
    }

    pub fn real(&self) -> &Row<f64> {
        &self.a
    }

    pub fn imag(&self) -> &Row<f64> {
        &self.b
    }

    pub fn format(&self) -> RFDataFormat {
        self.format
    }

    pub fn row(&self, i: usize) -> [f64; 3] {
        [self.freq.freq_at(i), self.a.read(i), self.b.read(i)]
    }

    pub fn rows(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        (0..self.nrows()).map(|i| self.row(i))
    }

    /// Complex reflection coefficient at every point.
    pub fn to_complex(&self) -> Row<c64> {
        Row::<c64>::from_fn(self.nrows(), |i| {
            self.format.parse(self.a.read(i), self.b.read(i))
        })
    }

    pub fn to_complex_vec(&self) -> Vec<c64> {
        (0..self.nrows())
            .map(|i| self.format.parse(self.a.read(i), self.b.read(i)))
            .collect()
    }

    pub fn freq_mhz_at(&self, i: usize) -> f64 {
        self.freq.freq_scaled_at(i, Unit::Mega)
    }
}

/// Take one S11 measurement and, when `fname` is given, write it to disk.
///
/// The file is only written once both traces were fetched and composed.
pub fn measure_s11<T: Transport>(
    session: &mut VnaSession<T>,
    sweep: &SweepSettings,
    settings: &MeasurementSettings,
    fname: Option<&Path>,
    print_settings: bool,
) -> Result<S11Measurement> {
    if print_settings {
        info!("Measurement settings:\n{}\n{}", sweep, settings);
    }

    session.configure_sweep(sweep, settings)?;
    session.trigger_and_wait(settings)?;

    let (real_fmt, imag_fmt) = settings.components.formats();
    let real_like = session.fetch_trace(real_fmt)?;
    let imag_like = session.fetch_trace(imag_fmt)?;
    let s11 = S11Measurement::compose(&real_like, &imag_like, settings.components.data_format())?;

    if let Some(path) = fname {
        write_s11(path, &s11)?;
        info!("S11 written to {}", path.display());
    }
    Ok(s11)
}
