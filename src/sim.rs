//! Simulated instruments.
//!
//! `SimulatedVna` answers the same SCPI subset as the bench analyser over an
//! in-memory byte stream, and `RecordingOutput` stands in for the digital
//! output lines of the switch box. Both are cheap handles over shared state:
//! clone one before handing it to a session to keep a probe on the
//! instrument.

use crate::block::encode_block;
use crate::enums::TraceFormat;
use crate::error::Result;
use crate::session::Transport;
use crate::switch::DigitalOutput;
use faer::complex_native::c64;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::f64::consts::PI;
use std::io::{self, Read, Write};
use std::rc::Rc;

/// File header the analyser writes ahead of the data rows.
pub const TRACE_PREAMBLE: &str =
    "!CSV A.01.01\r\n!Source: Standard\r\n\r\nFrequency\r\nFormatted Data\r\n";

#[derive(Debug)]
struct VnaState {
    identity: String,
    start_hz: f64,
    stop_hz: f64,
    points: usize,
    format: TraceFormat,
    sweeps: usize,
    drift: f64,
    noise: f64,
    chunk_size: Option<usize>,
    truncate_transfers: bool,
    transfers_enabled: bool,
    files: HashMap<String, String>,
    pending: VecDeque<u8>,
    input: String,
    raw_input: String,
    commands: Vec<String>,
    shutdowns: usize,
}

impl VnaState {
    fn frequency(&self, i: usize) -> f64 {
        if self.points > 1 {
            self.start_hz + (i as f64) * (self.stop_hz - self.start_hz) / (self.points - 1) as f64
        } else {
            self.start_hz
        }
    }

    // Smooth load reflection, a settling offset that halves every sweep and a
    // point-to-point alternating scatter.
    fn reflection(&self, i: usize) -> c64 {
        let phase = 2.0 * PI * self.frequency(i) / 100e6;
        let offset = self.drift * 0.5_f64.powi(self.sweeps as i32);
        let scatter = if i % 2 == 0 { self.noise } else { -self.noise };
        c64 {
            re: 0.05 * phase.cos() + offset + scatter,
            im: 0.05 * phase.sin() + offset - scatter,
        }
    }

    fn formatted(&self, i: usize) -> f64 {
        let s = self.reflection(i);
        match self.format {
            TraceFormat::Real => s.re,
            TraceFormat::Imaginary => s.im,
            TraceFormat::Magnitude => 20.0 * (s.re * s.re + s.im * s.im).sqrt().log10(),
            TraceFormat::Phase => s.im.atan2(s.re).to_degrees(),
        }
    }

    fn render_trace(&self) -> String {
        let mut out = String::from(TRACE_PREAMBLE);
        for i in 0..self.points {
            out.push_str(&format!(
                "{:+E},{:+E},{:+E}\r\n",
                self.frequency(i),
                self.formatted(i),
                0.0
            ));
        }
        out
    }

    fn reply(&mut self, text: &str) {
        self.pending.extend(text.as_bytes());
    }

    fn handle(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        if command == "*OPC?" {
            self.reply("1\n");
            return;
        }
        self.commands.push(command.to_string());

        let (head, arg) = match command.split_once(' ') {
            Some((head, arg)) => (head.to_uppercase(), arg.trim().to_string()),
            None => (command.to_uppercase(), String::new()),
        };
        let quoted = arg.trim_matches('"').to_string();

        match head.as_str() {
            "*IDN?" => {
                let identity = self.identity.clone();
                if !identity.is_empty() {
                    self.reply(&format!("{}\n", identity));
                }
            }
            "SENS:FREQ:START" => self.start_hz = arg.parse().unwrap_or(self.start_hz),
            "SENS:FREQ:STOP" => self.stop_hz = arg.parse().unwrap_or(self.stop_hz),
            "SENS:SWE:POIN" => self.points = arg.parse().unwrap_or(self.points),
            "INIT:CONT" if arg.eq_ignore_ascii_case("OFF") => self.sweeps += 1,
            "CALC1:FORM" => {
                if let Ok(format) = TraceFormat::from_scpi(&arg) {
                    self.format = format;
                }
            }
            "MMEM:STOR:FDAT" => {
                let content = self.render_trace();
                self.files.insert(quoted, content);
            }
            "MMEM:TRAN?" => {
                if !self.transfers_enabled {
                    return;
                }
                if let Some(content) = self.files.get(&quoted).cloned() {
                    let mut block = encode_block(&content);
                    if self.truncate_transfers {
                        if let Some(cut) = block.rfind(',') {
                            block.truncate(cut);
                        }
                    }
                    self.reply(&block);
                }
            }
            _ => {}
        }
    }
}

/// In-memory network analyser.
#[derive(Clone, Debug)]
pub struct SimulatedVna {
    state: Rc<RefCell<VnaState>>,
}

impl SimulatedVna {
    pub fn new() -> SimulatedVna {
        SimulatedVna {
            state: Rc::new(RefCell::new(VnaState {
                identity: "Agilent Technologies,E5061B,MY00000000,A.03.00".to_string(),
                start_hz: 40e6,
                stop_hz: 200e6,
                points: 641,
                format: TraceFormat::Real,
                sweeps: 0,
                drift: 0.0,
                noise: 1e-3,
                chunk_size: None,
                truncate_transfers: false,
                transfers_enabled: true,
                files: HashMap::new(),
                pending: VecDeque::new(),
                input: String::new(),
                raw_input: String::new(),
                commands: vec![],
                shutdowns: 0,
            })),
        }
    }

    pub fn with_identity(self, identity: &str) -> SimulatedVna {
        self.state.borrow_mut().identity = identity.to_string();
        self
    }

    /// Offset added to both components, halving with every completed sweep.
    pub fn with_drift(self, drift: f64) -> SimulatedVna {
        self.state.borrow_mut().drift = drift;
        self
    }

    /// Amplitude of the alternating point-to-point scatter.
    pub fn with_noise(self, noise: f64) -> SimulatedVna {
        self.state.borrow_mut().noise = noise;
        self
    }

    /// Hand out at most `size` bytes per read.
    pub fn with_chunk_size(self, size: usize) -> SimulatedVna {
        self.state.borrow_mut().chunk_size = Some(size.max(1));
        self
    }

    /// Cut every transferred block short inside its last row.
    pub fn with_truncated_transfers(self) -> SimulatedVna {
        self.state.borrow_mut().truncate_transfers = true;
        self
    }

    /// Ignore `MMEM:TRAN?` entirely.
    pub fn with_transfers_disabled(self) -> SimulatedVna {
        self.state.borrow_mut().transfers_enabled = false;
        self
    }

    /// Commands received so far, without the completion query.
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    /// Everything written to the instrument, verbatim.
    pub fn raw_input(&self) -> String {
        self.state.borrow().raw_input.clone()
    }

    pub fn sweeps(&self) -> usize {
        self.state.borrow().sweeps
    }

    pub fn shutdowns(&self) -> usize {
        self.state.borrow().shutdowns
    }

    pub fn frequency(&self, i: usize) -> f64 {
        self.state.borrow().frequency(i)
    }

    /// Reflection the instrument currently reports at point `i`.
    pub fn reflection(&self, i: usize) -> c64 {
        self.state.borrow().reflection(i)
    }
}

impl Default for SimulatedVna {
    fn default() -> Self {
        SimulatedVna::new()
    }
}

impl Write for SimulatedVna {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        let text = String::from_utf8_lossy(buf);
        state.raw_input.push_str(&text);
        state.input.push_str(&text);

        while let Some(end) = state.input.find('\n') {
            let line: String = state.input.drain(..=end).collect();
            for command in line.trim_end().split(';') {
                state.handle(command);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for SimulatedVna {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no data pending"));
        }
        let limit = state.chunk_size.unwrap_or(usize::MAX);
        let n = buf.len().min(limit).min(state.pending.len());
        for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Transport for SimulatedVna {
    fn shutdown(&mut self) -> io::Result<()> {
        self.state.borrow_mut().shutdowns += 1;
        Ok(())
    }
}

/// Digital output that records every line write.
#[derive(Clone, Debug, Default)]
pub struct RecordingOutput {
    writes: Rc<RefCell<Vec<(u8, bool)>>>,
}

impl RecordingOutput {
    pub fn new() -> RecordingOutput {
        RecordingOutput::default()
    }

    pub fn writes(&self) -> Vec<(u8, bool)> {
        self.writes.borrow().clone()
    }

    /// Last state written to `line`, if any.
    pub fn line(&self, line: u8) -> Option<bool> {
        self.writes
            .borrow()
            .iter()
            .rev()
            .find(|(l, _)| *l == line)
            .map(|(_, high)| *high)
    }
}

impl DigitalOutput for RecordingOutput {
    fn set_line(&mut self, line: u8, high: bool) -> Result<()> {
        self.writes.borrow_mut().push((line, high));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::block::decode_block;
    use crate::trace::parse_trace;

    #[test]
    fn replies_to_completion_queries() {
        let mut vna = SimulatedVna::new();
        vna.write_all(b"SENS:AVER:CLE;*OPC?\nSENS:AVER:COUN 2;*OPC?\n")
            .unwrap();

        let mut buf = [0u8; 16];
        let n = vna.read(&mut buf).unwrap();
        assert_eq!(b"1\n1\n", &buf[..n]);
        assert_eq!(vec!["SENS:AVER:CLE", "SENS:AVER:COUN 2"], vna.commands());
    }

    #[test]
    fn commands_split_across_writes() {
        let mut vna = SimulatedVna::new();
        vna.write_all(b"SENS:SWE:").unwrap();
        vna.write_all(b"POIN 11\n").unwrap();
        assert_eq!(vec!["SENS:SWE:POIN 11"], vna.commands());
    }

    #[test]
    fn transfer_is_a_valid_block() {
        let mut vna = SimulatedVna::new();
        vna.write_all(b"SENS:SWE:POIN 5\nCALC1:FORM IMAG\nMMEM:STOR:FDAT \"x.csv\"\nMMEM:TRAN? \"x.csv\"\n")
            .unwrap();

        let mut buf = vec![0u8; 4096];
        let n = vna.read(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        let trace = parse_trace(decode_block(&text).unwrap()).unwrap();

        assert_eq!(5, trace.len());
        assert_eq!(vna.reflection(3).im, trace[3].component_a);
        assert_eq!(vna.frequency(4), trace[4].frequency_hz);
    }

    #[test]
    fn drift_halves_per_sweep() {
        let mut vna = SimulatedVna::new().with_drift(0.4).with_noise(0.0);
        let before = vna.reflection(0).re;
        vna.write_all(b"INIT:CONT OFF\n").unwrap();
        let after = vna.reflection(0).re;
        assert!((before - after - 0.2).abs() < 1e-12);
    }

    #[test]
    fn empty_queue_would_block() {
        let mut vna = SimulatedVna::new();
        let mut buf = [0u8; 8];
        let err = vna.read(&mut buf).unwrap_err();
        assert_eq!(io::ErrorKind::WouldBlock, err.kind());
    }

    #[test]
    fn recording_output_tracks_lines() {
        let mut output = RecordingOutput::new();
        output.set_line(7, false).unwrap();
        output.set_line(7, true).unwrap();
        assert_eq!(Some(true), output.line(7));
        assert_eq!(None, output.line(4));
        assert_eq!(2, output.writes().len());
    }
}
