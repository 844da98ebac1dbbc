use autocal::prelude::*;
use autocal::warmup::WarmupHistory;
use float_cmp::approx_eq;
use std::fs;

fn bench_config() -> VnaConfig {
    VnaConfig {
        timing: Timing::none(),
        ..VnaConfig::default()
    }
}

#[test]
fn standard_s11_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("External01.s1p");
    let config = bench_config();
    let vna = SimulatedVna::new();
    let mut session = VnaSession::new(vna.clone(), &config);

    let s11 = measure_s11(
        &mut session,
        &config.sweep,
        &MeasurementSettings::standard(),
        Some(&path),
        true,
    )
    .unwrap();
    session.close().unwrap();

    assert_eq!(641, s11.nrows());
    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(642, lines.len());
    assert_eq!("Hz S RI R 50", lines[0].trim_start_matches("# "));

    let first: Vec<f64> = lines[1].split('\t').map(|f| f.parse().unwrap()).collect();
    assert_eq!(3, first.len());
    assert_eq!(40e6, first[0]);
    assert!(approx_eq!(f64, vna.reflection(0).re, first[1], ulps = 2));
    assert!(approx_eq!(f64, vna.reflection(0).im, first[2], ulps = 2));

    let last: Vec<f64> = lines[641].split('\t').map(|f| f.parse().unwrap()).collect();
    assert_eq!(200e6, last[0]);
    assert_eq!(1, vna.shutdowns());
}

#[test]
fn measurement_command_sequence() {
    let config = bench_config();
    let vna = SimulatedVna::new();
    let mut session = VnaSession::new(vna.clone(), &config);
    measure_s11(
        &mut session,
        &config.sweep,
        &MeasurementSettings::standard(),
        None,
        false,
    )
    .unwrap();

    assert_eq!(
        vec![
            "FORM:DATA ASCii",
            "SENS:FREQ:START 4e7",
            "SENS:FREQ:STOP 2e8",
            "SOUR:POW:ATT 0",
            "SOUR:POW 0.000000",
            "SENS:SWE:POIN 641",
            "SENS:BWID 100",
            "SENS:AVER:STAT 1",
            "SENS:AVER:CLE",
            "SENS:AVER:COUN 10",
            "INIT:CONT ON",
            "DISP:WIND1:TRAC1:Y:AUTO",
            "INIT:CONT OFF",
            "CALC1:FORM REAL",
            "MMEM:STOR:FDAT \"D:\\Auto\\EDGES_m.csv\"",
            "MMEM:TRAN? \"D:\\Auto\\EDGES_m.csv\"",
            "CALC1:FORM IMAG",
            "MMEM:STOR:FDAT \"D:\\Auto\\EDGES_p.csv\"",
            "MMEM:TRAN? \"D:\\Auto\\EDGES_p.csv\"",
        ],
        vna.commands()
    );
}

#[test]
fn file_round_trip_through_reader() {
    let dir = tempfile::tempdir().unwrap();
    let config = bench_config();
    let mut session = VnaSession::new(SimulatedVna::new(), &config);
    let s11 = measure_s11(
        &mut session,
        &config.sweep,
        &MeasurementSettings::receiver_reading(),
        None,
        false,
    )
    .unwrap();

    for name in ["ReceiverReading01.s1p", "ReceiverReading01.csv"] {
        let path = dir.path().join(name);
        write_s11(&path, &s11).unwrap();
        let back = read_s11(&path).unwrap();

        assert_eq!(s11.nrows(), back.nrows());
        for i in [0, 320, 640] {
            let (a, b) = (s11.row(i), back.row(i));
            for c in 0..3 {
                assert!(approx_eq!(f64, a[c], b[c], ulps = 2), "{} row {}", name, i);
            }
        }
    }
}

#[test]
fn warmup_against_drifting_instrument() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warmup_s11.json");
    let config = bench_config();
    let vna = SimulatedVna::new().with_drift(0.2);
    let mut session = VnaSession::new(vna.clone(), &config);

    let outcome = take_warmup_s11(&mut session, &config.sweep, 3, 30, Some(&path)).unwrap();

    assert_eq!(WarmupState::Converged, outcome.state);
    assert!(outcome.iterations >= 3);
    let history = WarmupHistory::load(&path).unwrap();
    assert_eq!(outcome.iterations, history.len());
    assert_eq!(641, history.to_matrix().ncols());
}

#[test]
fn warmup_exhausts_on_noiseless_drift() {
    let config = bench_config();
    let vna = SimulatedVna::new().with_drift(0.5).with_noise(0.0);
    let mut session = VnaSession::new(vna.clone(), &config);

    // three sweeps are too few for a large offset to settle below the scatter
    let outcome = take_warmup_s11(&mut session, &config.sweep, 2, 3, None).unwrap();
    assert_eq!(WarmupState::Exhausted, outcome.state);
    assert_eq!(3, outcome.iterations);
    assert_eq!(3, vna.sweeps());
}

#[test]
fn all_loads_with_switch() {
    let dir = tempfile::tempdir().unwrap();
    let config = bench_config();
    let vna = SimulatedVna::new();
    let output = RecordingOutput::new();
    let mut session = VnaSession::new(vna.clone(), &config);
    let mut switch = SwitchController::new(output.clone(), &config.timing);

    let written = take_all_load_s11(&mut session, &mut switch, &config.sweep, dir.path(), 7).unwrap();
    switch.safe_state().unwrap();

    let standards: Vec<Standard> = written.iter().map(|(s, _)| *s).collect();
    assert_eq!(Standard::LOADS.to_vec(), standards);
    assert!(dir.path().join("Open07.s1p").exists());
    for line in 4..=7 {
        assert_eq!(Some(true), output.line(line));
    }
    // four selections, four releases, one safe state
    assert_eq!(4 * 4 + 4 + 4, output.writes().len());
}

#[test]
fn config_file_drives_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("autocal.yaml");
    fs::write(
        &path,
        "real_trace_path: 'E:\\cal\\re.csv'\nsweep:\n  points: 101\ntiming:\n  idn_settle: 0\n  power_settle: 0\n  trigger_settle: 0\n  transfer_settle: 0\n  line_settle: 0\n  measurement_scale: 0\n",
    )
    .unwrap();
    let config = VnaConfig::load_from(&path).unwrap();

    let vna = SimulatedVna::new();
    let mut session = VnaSession::new(vna.clone(), &config);
    let s11 = measure_s11(
        &mut session,
        &config.sweep,
        &MeasurementSettings::standard(),
        None,
        false,
    )
    .unwrap();

    assert_eq!(101, s11.nrows());
    assert!(vna
        .commands()
        .contains(&"MMEM:TRAN? \"E:\\cal\\re.csv\"".to_string()));
}
