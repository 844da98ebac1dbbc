//! Warmup convergence loop.
//!
//! Cheap sweeps are repeated until consecutive sweeps differ by no more than
//! half the point-to-point scatter within one sweep, or the iteration limit is
//! reached.

use crate::config::{MeasurementSettings, SweepSettings};
use crate::error::{Result, VnaError};
use crate::frequency::Frequency;
use crate::math::{interleaved_rms, rms_diff};
use crate::measurement::{measure_s11, S11Measurement};
use crate::session::{Transport, VnaSession};
use faer::complex_native::c64;
use faer::{Mat, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarmupState {
    Running,
    Converged,
    Exhausted,
}

impl fmt::Display for WarmupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarmupState::Running => write!(f, "running"),
            WarmupState::Converged => write!(f, "converged"),
            WarmupState::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Complex reflection of every warmup sweep on a shared frequency axis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WarmupHistory {
    freq: Option<Frequency>,
    real: Vec<Row<f64>>,
    imag: Vec<Row<f64>>,
}

#[derive(Serialize, Deserialize)]
struct WarmupRecord {
    freqs: Vec<f64>,
    s11: Vec<Vec<[f64; 2]>>,
}

impl WarmupHistory {
    pub fn new() -> WarmupHistory {
        WarmupHistory::default()
    }

    pub fn push(&mut self, s11: &S11Measurement) -> Result<()> {
        match &self.freq {
            None => self.freq = Some(s11.freq().clone()),
            Some(freq) if freq != s11.freq() => {
                return Err(VnaError::ShapeMismatch(format!(
                    "warmup iteration {} has a different frequency axis ({} points, expected {})",
                    self.len(),
                    s11.nrows(),
                    freq.npts()
                )));
            }
            Some(_) => {}
        }

        let z = s11.to_complex();
        self.real
            .push(Row::<f64>::from_fn(z.ncols(), |i| z.read(i).re));
        self.imag
            .push(Row::<f64>::from_fn(z.ncols(), |i| z.read(i).im));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    pub fn freq(&self) -> Option<&Frequency> {
        self.freq.as_ref()
    }

    pub fn real(&self, k: usize) -> &Row<f64> {
        &self.real[k]
    }

    pub fn imag(&self, k: usize) -> &Row<f64> {
        &self.imag[k]
    }

    /// RMS change of (real, imaginary) from iteration `k - 1` to `k`.
    pub fn drift(&self, k: usize) -> (f64, f64) {
        (
            rms_diff(&self.real[k], &self.real[k - 1]),
            rms_diff(&self.imag[k], &self.imag[k - 1]),
        )
    }

    /// Point-to-point scatter of (real, imaginary) within iteration `k`.
    pub fn intrinsic(&self, k: usize) -> (f64, f64) {
        (interleaved_rms(&self.real[k]), interleaved_rms(&self.imag[k]))
    }

    /// Iterations by frequency points.
    pub fn to_matrix(&self) -> Mat<c64> {
        let npts = self.freq.as_ref().map_or(0, |f| f.npts());
        Mat::<c64>::from_fn(self.len(), npts, |k, i| c64 {
            re: self.real[k].read(i),
            im: self.imag[k].read(i),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let m = self.to_matrix();
        let record = WarmupRecord {
            freqs: self.freq.as_ref().map_or(vec![], |f| f.to_vec()),
            s11: (0..m.nrows())
                .map(|k| {
                    (0..m.ncols())
                        .map(|i| {
                            let z = m.read(k, i);
                            [z.re, z.im]
                        })
                        .collect()
                })
                .collect(),
        };
        let content =
            serde_json::to_string(&record).map_err(|e| VnaError::Serialize(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<WarmupHistory> {
        let content = fs::read_to_string(path)?;
        let record: WarmupRecord =
            serde_json::from_str(&content).map_err(|e| VnaError::Serialize(e.to_string()))?;

        let npts = record.freqs.len();
        let mut history = WarmupHistory {
            freq: Some(Frequency::new(Row::<f64>::from_fn(npts, |i| record.freqs[i]))),
            real: vec![],
            imag: vec![],
        };
        for (k, sweep) in record.s11.iter().enumerate() {
            if sweep.len() != npts {
                return Err(VnaError::ShapeMismatch(format!(
                    "warmup iteration {}: {} points, expected {}",
                    k,
                    sweep.len(),
                    npts
                )));
            }
            history.real.push(Row::<f64>::from_fn(npts, |i| sweep[i][0]));
            history.imag.push(Row::<f64>::from_fn(npts, |i| sweep[i][1]));
        }
        Ok(history)
    }
}

#[derive(Clone, Debug)]
pub struct WarmupOutcome {
    pub state: WarmupState,
    pub iterations: usize,
    pub history: WarmupHistory,
}

#[derive(Clone, Debug)]
pub struct WarmupLoop {
    min_iters: usize,
    max_iters: usize,
    output: Option<PathBuf>,
}

impl WarmupLoop {
    pub fn new(min_iters: usize, max_iters: usize) -> Result<WarmupLoop> {
        if max_iters < 1 {
            return Err(VnaError::InvalidParameters(format!(
                "max_warmup_iters must be at least 1, got {}",
                max_iters
            )));
        }
        Ok(WarmupLoop {
            min_iters,
            max_iters,
            output: None,
        })
    }

    /// Save the history here once the loop finishes.
    pub fn with_output(mut self, path: &Path) -> WarmupLoop {
        self.output = Some(path.to_path_buf());
        self
    }

    // Earliest 0-based iteration allowed to stop; at least one comparison is
    // always made.
    fn first_check(&self) -> usize {
        1.max(self.min_iters.saturating_sub(1))
    }

    /// Drive the loop with `measure`, called with the 0-based iteration.
    pub fn run<F>(&self, mut measure: F) -> Result<WarmupOutcome>
    where
        F: FnMut(usize) -> Result<S11Measurement>,
    {
        let mut history = WarmupHistory::new();
        let mut state = WarmupState::Running;
        let mut k = 0;

        while state == WarmupState::Running {
            let s11 = measure(k)?;
            history.push(&s11)?;

            if k >= self.first_check() {
                let (drift_re, drift_im) = history.drift(k);
                let (this_re, this_im) = history.intrinsic(k);

                if drift_re <= this_re / 2.0 && drift_im <= this_im / 2.0 {
                    state = WarmupState::Converged;
                    info!("Warmup converged after {} iterations", k + 1);
                } else {
                    info!(
                        "On iteration {}, RMS_DIFF=({}, {}) vs. RMS_INTRINSIC=({}, {})",
                        k, drift_re, drift_im, this_re, this_im
                    );
                }
            }

            if state == WarmupState::Running && k + 1 >= self.max_iters {
                state = WarmupState::Exhausted;
                warn!(
                    "Warmup did not converge within {} iterations",
                    self.max_iters
                );
            }
            k += 1;
        }

        if let Some(path) = &self.output {
            history.save(path)?;
            info!("Warmup history written to {}", path.display());
        }

        Ok(WarmupOutcome {
            state,
            iterations: k,
            history,
        })
    }
}

/// Repeat warmup sweeps on the instrument until they stop drifting.
pub fn take_warmup_s11<T: Transport>(
    session: &mut VnaSession<T>,
    sweep: &SweepSettings,
    min_warmup_iters: usize,
    max_warmup_iters: usize,
    output: Option<&Path>,
) -> Result<WarmupOutcome> {
    let mut warmup = WarmupLoop::new(min_warmup_iters, max_warmup_iters)?;
    if let Some(path) = output {
        warmup = warmup.with_output(path);
    }

    let settings = MeasurementSettings::warmup();
    warmup.run(|_| measure_s11(session, sweep, &settings, None, false))
}
