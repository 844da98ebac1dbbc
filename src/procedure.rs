//! Bench procedures built from the session and the switch.

use crate::config::{MeasurementSettings, SweepSettings};
use crate::error::Result;
use crate::measurement::{measure_s11, S11Measurement};
use crate::session::{Identity, Transport, VnaSession};
use crate::switch::{DigitalOutput, Standard, SwitchController};
use crate::warmup::{take_warmup_s11, WarmupOutcome};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Measure one standard at `voltage` into `<dir>/<name>.s1p` with `settings`.
///
/// The switch supply is released afterwards whether or not the measurement
/// succeeded. An undefined voltage fails before any line is written.
#[allow(clippy::too_many_arguments)]
pub fn take_s11<T: Transport, D: DigitalOutput>(
    session: &mut VnaSession<T>,
    switch: &mut SwitchController<D>,
    sweep: &SweepSettings,
    settings: &MeasurementSettings,
    dir: &Path,
    name: &str,
    voltage: f64,
    print_settings: bool,
) -> Result<S11Measurement> {
    switch.set_voltage(voltage)?;

    let fname = dir.join(format!("{}.s1p", name));
    info!("Taking {} measurement at {}V...", name, voltage);
    let measured = measure_s11(session, sweep, settings, Some(&fname), print_settings);
    let released = switch.release();

    let s11 = measured?;
    released?;
    info!("... saved as '{}'", fname.display());
    Ok(s11)
}

pub fn load_file_name(standard: Standard, repeat: u32) -> String {
    format!("{}{:02}", standard.name(), repeat)
}

/// Measure every load standard once, in [`Standard::LOADS`] order.
pub fn take_all_load_s11<T: Transport, D: DigitalOutput>(
    session: &mut VnaSession<T>,
    switch: &mut SwitchController<D>,
    sweep: &SweepSettings,
    dir: &Path,
    repeat: u32,
) -> Result<Vec<(Standard, PathBuf)>> {
    let settings = MeasurementSettings::standard();
    let mut written = vec![];
    for (i, standard) in Standard::LOADS.iter().enumerate() {
        let name = load_file_name(*standard, repeat);
        take_s11(
            session,
            switch,
            sweep,
            &settings,
            dir,
            &name,
            standard.voltage(),
            i == 0,
        )?;
        written.push((*standard, dir.join(format!("{}.s1p", name))));
    }
    Ok(written)
}

/// Switching-state measurements, in order, with the standard each one selects.
/// The three external ones differ only in what is connected to the receiver
/// input.
pub const SWITCHING_STATE_LOADS: [(&str, Standard); 6] = [
    ("ExternalMatch", Standard::External),
    ("ExternalOpen", Standard::External),
    ("ExternalShort", Standard::External),
    ("Match", Standard::Match),
    ("Open", Standard::Open),
    ("Short", Standard::Short),
];

/// Number of times the switching-state and receiver-reading sets are taken.
pub const REPEATS: u32 = 2;

#[derive(Clone, Debug)]
pub struct SwitchingStateRun {
    pub warmup: WarmupOutcome,
    pub written: Vec<PathBuf>,
}

/// Warm the instrument up, then measure every [`SWITCHING_STATE_LOADS`] entry
/// [`REPEATS`] times into `<dir>/<Name><repeat:02>.s1p`.
#[allow(clippy::too_many_arguments)]
pub fn measure_switching_state_s11<T: Transport, D: DigitalOutput>(
    session: &mut VnaSession<T>,
    switch: &mut SwitchController<D>,
    sweep: &SweepSettings,
    dir: &Path,
    min_warmup_iters: usize,
    max_warmup_iters: usize,
    warmup_output: Option<&Path>,
) -> Result<SwitchingStateRun> {
    info!("Starting warmup");
    let warmup = take_warmup_s11(
        session,
        sweep,
        min_warmup_iters,
        max_warmup_iters,
        warmup_output,
    )?;
    info!("Warmup {} after {} iterations", warmup.state, warmup.iterations);

    info!("Starting switching-state measurements");
    let settings = MeasurementSettings::standard();
    let mut written = vec![];
    for repeat in 1..=REPEATS {
        for (load, standard) in SWITCHING_STATE_LOADS {
            let name = format!("{}{:02}", load, repeat);
            take_s11(
                session,
                switch,
                sweep,
                &settings,
                dir,
                &name,
                standard.voltage(),
                written.is_empty(),
            )?;
            written.push(dir.join(format!("{}.s1p", name)));
        }
    }
    Ok(SwitchingStateRun { warmup, written })
}

/// Receiver-reading set for one `repeat`.
///
/// Match, Open and Short are measured on the analyser port directly, so the
/// switch is left alone for them. The receiver itself is then measured with
/// the switch supply at 0 V, and the supply is released afterwards. All four
/// use the receiver-reading settings.
pub fn measure_receiver_reading_s11<T: Transport, D: DigitalOutput>(
    session: &mut VnaSession<T>,
    switch: &mut SwitchController<D>,
    sweep: &SweepSettings,
    dir: &Path,
    repeat: u32,
) -> Result<Vec<PathBuf>> {
    let settings = MeasurementSettings::receiver_reading();
    let mut written = vec![];
    for (i, standard) in [Standard::Match, Standard::Open, Standard::Short].iter().enumerate() {
        let fname = dir.join(format!("{}.s1p", load_file_name(*standard, repeat)));
        info!("Taking receiver-reading {} measurement...", standard.name());
        measure_s11(session, sweep, &settings, Some(&fname), i == 0)?;
        written.push(fname);
    }

    let name = format!("ReceiverReading{:02}", repeat);
    take_s11(
        session,
        switch,
        sweep,
        &settings,
        dir,
        &name,
        Standard::Off.voltage(),
        false,
    )?;
    written.push(dir.join(format!("{}.s1p", name)));
    Ok(written)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationKind {
    Standard,
    ReceiverReading,
}

impl CalibrationKind {
    pub fn settings(&self) -> MeasurementSettings {
        match self {
            CalibrationKind::Standard => MeasurementSettings::standard(),
            CalibrationKind::ReceiverReading => MeasurementSettings::receiver_reading(),
        }
    }

    fn steps(&self) -> Vec<String> {
        let averages = self.settings().averages;
        let (first, third) = match self {
            CalibrationKind::Standard => (
                "Select Calibrate from the main menu",
                "Select 1-Port Cal",
            ),
            CalibrationKind::ReceiverReading => (
                "Connect Male to Male SMA adapter to Port-1 and select Calibrate from the main menu",
                "Select 1-Port Cal, use female calibration kit",
            ),
        };
        vec![
            first.to_string(),
            "Again select Calibrate".to_string(),
            third.to_string(),
            "Connect Open to VNA port-1".to_string(),
            format!("Select Open and wait for {} averages", averages),
            "Connect Short to VNA port-1".to_string(),
            format!("Select Short and wait for {} averages", averages),
            "Connect Load to VNA port-1".to_string(),
            format!("Select Load and wait for {} averages", averages),
            "Select Done".to_string(),
        ]
    }
}

impl fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationKind::Standard => write!(f, "standard"),
            CalibrationKind::ReceiverReading => write!(f, "receiver reading"),
        }
    }
}

/// Instrument state after [`vna_calib`] plus what is left for the operator.
#[derive(Clone, Debug)]
pub struct CalibrationPlan {
    pub identity: Identity,
    pub kind: CalibrationKind,
    pub steps: Vec<String>,
}

impl fmt::Display for CalibrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Remaining procedure is done on the front panel of the VNA:")?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, step)?;
        }
        Ok(())
    }
}

/// Put the analyser into the state needed for a front-panel one-port
/// calibration.
pub fn vna_calib<T: Transport>(
    session: &mut VnaSession<T>,
    sweep: &SweepSettings,
    kind: CalibrationKind,
) -> Result<CalibrationPlan> {
    let settings = kind.settings();
    let identity = session.identify()?;
    session.configure_span(sweep)?;
    session.set_output_power(settings.power_dbm, settings.attenuation_db)?;
    session.select_cal_kit(1)?;
    session.configure_averaging(sweep, settings.averages)?;

    info!("VNA settings for {} calibration:\n{}\n{}", kind, sweep, settings);
    let plan = CalibrationPlan {
        identity,
        kind,
        steps: kind.steps(),
    };
    info!("{}", plan);
    Ok(plan)
}
