//! autocal: VNA S11 acquisition for receiver calibration.

use anyhow::{bail, Context, Result};
use autocal::prelude::*;
use autocal::warmup::WarmupHistory;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "autocal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Instrument configuration (YAML); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Talk to the built-in simulated analyser instead of the network
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take one S11 measurement
    S11 {
        /// Output file (.s1p is tab-separated with an option line, .csv is bare)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the receiver-reading settings (-35 dBm, 30 averages)
        #[arg(long)]
        receiver: bool,

        /// Fetch magnitude and phase instead of real and imaginary parts
        #[arg(long)]
        mag_phase: bool,
    },

    /// Repeat warmup sweeps until consecutive sweeps stop drifting
    Warmup {
        #[arg(long, default_value = "2")]
        min_iters: usize,

        #[arg(long, default_value = "20")]
        max_iters: usize,

        /// Where to save the sweep history (JSON)
        #[arg(short, long, default_value = "warmup_s11.json")]
        output: PathBuf,
    },

    /// Prepare the analyser for a front-panel one-port calibration
    CalVna {
        /// Calibrate for the receiver reading instead of the loads
        #[arg(long)]
        receiver: bool,
    },

    /// Summarize an S11 file or a warmup history
    Show {
        file: PathBuf,
    },

    /// Write the default configuration to a file
    Init {
        #[arg(default_value = "autocal.yaml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let simulate = cli.simulate;
    let mut config = match &cli.config {
        Some(path) => VnaConfig::load_from(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => VnaConfig::default(),
    };

    match cli.command {
        Commands::Show { file } => show(&file),
        Commands::Init { path } => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            config.save(&path)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
        command if simulate => {
            config.timing = Timing::none();
            let session = VnaSession::new(SimulatedVna::new().with_drift(0.05), &config);
            run(session, &config, command)
        }
        command => {
            let session = VnaSession::connect(&config)
                .with_context(|| format!("connecting to {}", config.address()))?;
            run(session, &config, command)
        }
    }
}

fn run<T: Transport>(mut session: VnaSession<T>, config: &VnaConfig, command: Commands) -> Result<()> {
    match command {
        Commands::S11 {
            output,
            receiver,
            mag_phase,
        } => {
            session.identify()?;
            let settings = if receiver {
                MeasurementSettings::receiver_reading()
            } else {
                MeasurementSettings::standard()
            };
            let components = if mag_phase {
                ComponentPair::MagnitudePhase
            } else {
                ComponentPair::RealImaginary
            };
            let settings = settings.with_components(components);
            let s11 = measure_s11(
                &mut session,
                &config.sweep,
                &settings,
                output.as_deref(),
                true,
            )?;
            info!("Measured {} points", s11.nrows());
        }
        Commands::Warmup {
            min_iters,
            max_iters,
            output,
        } => {
            session.identify()?;
            let outcome =
                take_warmup_s11(&mut session, &config.sweep, min_iters, max_iters, Some(&output))?;
            println!(
                "Warmup {} after {} iterations",
                outcome.state, outcome.iterations
            );
        }
        Commands::CalVna { receiver } => {
            let kind = if receiver {
                CalibrationKind::ReceiverReading
            } else {
                CalibrationKind::Standard
            };
            let plan = vna_calib(&mut session, &config.sweep, kind)?;
            print!("{}", plan);
        }
        Commands::Show { .. } | Commands::Init { .. } => {}
    }

    session.close()?;
    Ok(())
}

fn show(file: &Path) -> Result<()> {
    let is_json = file
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let history = WarmupHistory::load(file)
            .with_context(|| format!("reading warmup history {}", file.display()))?;
        println!("{}: {} warmup iterations", file.display(), history.len());
        for k in 1..history.len() {
            let (drift_re, drift_im) = history.drift(k);
            let (this_re, this_im) = history.intrinsic(k);
            println!(
                "  {:>3}  drift=({:.3e}, {:.3e})  intrinsic=({:.3e}, {:.3e})",
                k, drift_re, drift_im, this_re, this_im
            );
        }
        return Ok(());
    }

    let s11 = read_s11(file).with_context(|| format!("reading {}", file.display()))?;
    if s11.nrows() == 0 {
        bail!("{} holds no data rows", file.display());
    }
    let last = s11.nrows() - 1;
    println!(
        "{}: {} points, {} to {} MHz, format {}",
        file.display(),
        s11.nrows(),
        s11.freq_mhz_at(0),
        s11.freq_mhz_at(last),
        s11.format()
    );
    let z = s11.to_complex_vec();
    let peak = z
        .iter()
        .map(|z| (z.re * z.re + z.im * z.im).sqrt())
        .fold(0.0_f64, f64::max);
    println!("  max |S11| = {:.6}", peak);
    Ok(())
}
