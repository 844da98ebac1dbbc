//! Trace payload tokenizer.
//!
//! The instrument streams back the file written by `MMEM:STOR:FDAT`: a short
//! preamble followed by `frequency,value,value` rows. Fields are separated by
//! `,` and rows by `\r\n`.

use crate::error::{Result, VnaError};

/// Number of leading tokens dropped before the numeric rows start.
///
/// Unverified on hardware: the preamble is believed to be the file header
/// written by the instrument, but its exact token count has only been
/// observed, not documented.
pub const HEADER_TOKENS: usize = 5;

/// Columns per row of a transferred trace.
pub const TRACE_COLUMNS: usize = 3;

/// One row of a transferred trace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceSample {
    pub frequency_hz: f64,
    pub component_a: f64,
    pub component_b: f64,
}

/// Iterator over the fields of a trace payload.
///
/// Empty fields are yielded, except the single empty field that a terminating
/// delimiter would produce at the very end of the payload.
pub struct Tokens<'a> {
    rest: Option<&'a str>,
}

impl<'a> Tokens<'a> {
    pub fn new(payload: &'a str) -> Tokens<'a> {
        Tokens {
            rest: Some(payload),
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        let bytes = rest.as_bytes();
        // a lone '\r' belongs to the token
        let delimiter = bytes.iter().enumerate().find_map(|(i, &b)| match b {
            b',' => Some((i, 1)),
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => Some((i, 2)),
            _ => None,
        });
        match delimiter {
            Some((end, skip)) => {
                self.rest = Some(&rest[end + skip..]);
                Some(&rest[..end])
            }
            None => {
                self.rest = None;
                if rest.is_empty() {
                    None
                } else {
                    Some(rest)
                }
            }
        }
    }
}

/// Split a payload into trace rows, dropping the preamble.
///
/// The token count is checked before any value is parsed so that a truncated
/// transfer surfaces as a shape error rather than a bad number.
pub fn parse_trace(payload: &str) -> Result<Vec<TraceSample>> {
    let tokens: Vec<&str> = Tokens::new(payload).skip(HEADER_TOKENS).collect();

    if tokens.len() % TRACE_COLUMNS != 0 {
        return Err(VnaError::ShapeMismatch(format!(
            "{} trace tokens after the preamble is not a multiple of {} (truncated transfer?)",
            tokens.len(),
            TRACE_COLUMNS
        )));
    }

    tokens
        .chunks(TRACE_COLUMNS)
        .enumerate()
        .map(|(row, fields)| {
            Ok(TraceSample {
                frequency_hz: parse_field(fields[0], row)?,
                component_a: parse_field(fields[1], row)?,
                component_b: parse_field(fields[2], row)?,
            })
        })
        .collect()
}

fn parse_field(field: &str, row: usize) -> Result<f64> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|e| VnaError::Parse(format!("row {}: {:?} ({})", row, field, e)))
}
