//! SCPI session with the network analyser.
//!
//! A session owns its transport for its whole lifetime and uses it strictly
//! request/response. Every command is sent with `;*OPC?` appended, but the
//! completion replies are never waited on: fixed sleeps from [`Timing`] stand
//! in for them, and the replies pile up on the socket until the next block
//! read skips over them.

use crate::block::{declared_len, decode_block};
use crate::config::{seconds, MeasurementSettings, SweepSettings, Timing, VnaConfig};
use crate::enums::TraceFormat;
use crate::error::{Result, VnaError};
use crate::trace::{parse_trace, TraceSample};
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::thread;
use tracing::{debug, info};

/// Byte stream to an instrument.
pub trait Transport: Read + Write {
    /// Close the connection. Called once when the session ends.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Parsed `*IDN?` reply.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub raw: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub firmware: Option<String>,
}

impl Identity {
    pub fn parse(raw: &str) -> Identity {
        let raw = raw.trim().to_string();
        let fields: Vec<String> = raw.split(',').map(|s| s.trim().to_string()).collect();
        if fields.len() == 4 {
            Identity {
                manufacturer: Some(fields[0].clone()),
                model: Some(fields[1].clone()),
                serial: Some(fields[2].clone()),
                firmware: Some(fields[3].clone()),
                raw,
            }
        } else {
            Identity {
                raw,
                manufacturer: None,
                model: None,
                serial: None,
                firmware: None,
            }
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

const IDN_BUFFER: usize = 200;

pub struct VnaSession<T: Transport> {
    transport: T,
    timing: Timing,
    read_buffer_size: usize,
    real_trace_path: String,
    imag_trace_path: String,
    closed: bool,
}

impl VnaSession<TcpStream> {
    /// Open a TCP connection to the analyser named in `config`.
    pub fn connect(config: &VnaConfig) -> Result<VnaSession<TcpStream>> {
        info!(
            "Connecting to network analyser {} port {}",
            config.host, config.port
        );
        let addr = config
            .address()
            .to_socket_addrs()
            .map_err(VnaError::Connection)?
            .next()
            .ok_or_else(|| {
                VnaError::Connection(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} did not resolve", config.address()),
                ))
            })?;

        let stream = if config.connect_timeout > 0.0 {
            TcpStream::connect_timeout(&addr, seconds(config.connect_timeout))
        } else {
            TcpStream::connect(addr)
        }
        .map_err(VnaError::Connection)?;

        if config.read_timeout > 0.0 {
            stream
                .set_read_timeout(Some(seconds(config.read_timeout)))
                .map_err(VnaError::Connection)?;
        }

        Ok(VnaSession::new(stream, config))
    }

    /// Connect and confirm the instrument answers `*IDN?`.
    pub fn connect_and_identify(config: &VnaConfig) -> Result<(VnaSession<TcpStream>, Identity)> {
        let mut session = VnaSession::connect(config)?;
        let identity = session.identify()?;
        Ok((session, identity))
    }
}

impl<T: Transport> VnaSession<T> {
    pub fn new(transport: T, config: &VnaConfig) -> VnaSession<T> {
        VnaSession {
            transport,
            timing: config.timing.clone(),
            read_buffer_size: config.read_buffer_size,
            real_trace_path: config.real_trace_path.clone(),
            imag_trace_path: config.imag_trace_path.clone(),
            closed: false,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    fn sleep(&self, secs: f64) {
        let duration = seconds(secs);
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    fn write_raw(&mut self, message: &str) -> Result<()> {
        debug!("-> {}", message.trim_end());
        self.transport
            .write_all(message.as_bytes())
            .and_then(|_| self.transport.flush())
            .map_err(VnaError::Connection)
    }

    /// Send one command with the completion query appended.
    pub fn send(&mut self, command: &str) -> Result<()> {
        self.write_raw(&format!("{};*OPC?\n", command))
    }

    pub fn identify(&mut self) -> Result<Identity> {
        self.write_raw("*IDN?\n")?;
        self.sleep(self.timing.idn_settle);

        let mut buf = [0u8; IDN_BUFFER];
        let n = self.transport.read(&mut buf).map_err(VnaError::Connection)?;
        let reply = String::from_utf8_lossy(&buf[..n]);
        if reply.trim().is_empty() {
            return Err(VnaError::Connection(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "empty reply to *IDN?",
            )));
        }

        let identity = Identity::parse(&reply);
        info!("Connected to ENA: {}", identity);
        Ok(identity)
    }

    /// Data format and frequency span.
    pub fn configure_span(&mut self, sweep: &SweepSettings) -> Result<()> {
        self.send("FORM:DATA ASCii")?;
        self.send(&format!("SENS:FREQ:START {:e}", sweep.start_hz))?;
        self.send(&format!("SENS:FREQ:STOP {:e}", sweep.stop_hz))
    }

    pub fn set_output_power(&mut self, power_dbm: f64, attenuation_db: f64) -> Result<()> {
        self.send(&format!("SOUR:POW:ATT {}", attenuation_db))?;
        self.send(&format!("SOUR:POW {:.6}", power_dbm))?;
        self.sleep(self.timing.power_settle);
        Ok(())
    }

    /// Point count, IF bandwidth and a freshly cleared average.
    pub fn configure_averaging(&mut self, sweep: &SweepSettings, averages: u32) -> Result<()> {
        self.send(&format!("SENS:SWE:POIN {}", sweep.points))?;
        self.send(&format!("SENS:BWID {}", sweep.if_bandwidth_hz))?;
        self.send("SENS:AVER:STAT 1")?;
        self.send("SENS:AVER:CLE")?;
        self.send(&format!("SENS:AVER:COUN {}", averages))
    }

    pub fn select_cal_kit(&mut self, kit: u32) -> Result<()> {
        self.send(&format!("SENS1:CORR:COLL:CKIT {}", kit))
    }

    /// Issue the full configuration sequence for one measurement.
    pub fn configure_sweep(
        &mut self,
        sweep: &SweepSettings,
        settings: &MeasurementSettings,
    ) -> Result<()> {
        self.configure_span(sweep)?;
        self.set_output_power(settings.power_dbm, settings.attenuation_db)?;
        self.configure_averaging(sweep, settings.averages)
    }

    /// Run the sweep continuously long enough to average, then freeze it.
    pub fn trigger_and_wait(&mut self, settings: &MeasurementSettings) -> Result<()> {
        self.send("INIT:CONT ON")?;
        self.sleep(self.timing.trigger_settle);
        self.send("DISP:WIND1:TRAC1:Y:AUTO")?;
        info!("Starting VNA Measurements");
        self.sleep(self.timing.after_display(settings));

        self.send("INIT:CONT OFF")?;
        self.sleep(self.timing.after_init(settings));
        Ok(())
    }

    fn trace_path(&self, format: TraceFormat) -> String {
        if format.is_real_like() {
            self.real_trace_path.clone()
        } else {
            self.imag_trace_path.clone()
        }
    }

    /// Store the current trace on the instrument and stream it back.
    pub fn fetch_trace(&mut self, format: TraceFormat) -> Result<Vec<TraceSample>> {
        let path = self.trace_path(format);
        self.send(&format!("CALC1:FORM {}", format.scpi()))?;
        self.send(&format!("MMEM:STOR:FDAT \"{}\"", path))?;
        self.send(&format!("MMEM:TRAN? \"{}\"", path))?;
        self.sleep(self.timing.transfer_settle);

        let raw = self.read_block()?;
        let text = String::from_utf8_lossy(&raw);
        let payload = decode_block(&text)?;
        let trace = parse_trace(payload)?;
        debug!("{} trace: {} points", format, trace.len());
        Ok(trace)
    }

    /// Read into the receive buffer until the declared block has arrived.
    ///
    /// Stops early when the buffer is full, the peer closes or a read times
    /// out after some data was received; the decoder then sees whatever
    /// arrived.
    fn read_block(&mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.read_buffer_size];
        let mut filled = 0;

        while filled < buf.len() {
            match self.transport.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    if let Some(total) = declared_len(&buf[..filled]) {
                        if filled >= total {
                            break;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if filled > 0
                        && matches!(
                            e.kind(),
                            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                        ) =>
                {
                    debug!("read timed out after {} bytes", filled);
                    break;
                }
                Err(e) => return Err(VnaError::Connection(e)),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    /// Shut the connection down now instead of at drop.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.transport.shutdown().map_err(VnaError::Connection)
    }
}

impl<T: Transport> Drop for VnaSession<T> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.transport.shutdown() {
                debug!("closing VNA connection: {}", e);
            }
        }
    }
}
