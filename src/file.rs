use crate::enums::{RFDataFormat, RFParameter, Unit};
use crate::error::{Result, VnaError};
use crate::frequency::Frequency;
use crate::measurement::S11Measurement;
use faer::Row;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Reference impedance written on the option line.
pub const REFERENCE_IMPEDANCE: f64 = 50.0;

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
}

/// Option line for a measurement, without the leading `# `.
pub fn option_line(format: RFDataFormat) -> String {
    format!("Hz S {} R {}", format, REFERENCE_IMPEDANCE)
}

/// Scientific notation with 18 fractional digits and a signed exponent of at
/// least two digits, e.g. `4.000000000000000000e+07`.
pub fn format_sci(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let s = format!("{:.18e}", x);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => s,
    }
}

/// Write a measurement as three columns: frequency in Hz and the two values.
///
/// `.csv` files are comma-separated without a header; anything else is
/// tab-separated below a Touchstone option line.
pub fn write_s11(path: &Path, s11: &S11Measurement) -> Result<()> {
    let csv = is_csv(path);
    let delimiter = if csv { "," } else { "\t" };

    let mut content = String::new();
    if !csv {
        content += "# ";
        content += &option_line(s11.format());
        content += "\n";
    }
    for row in s11.rows() {
        let fields: Vec<String> = row.iter().map(|x| format_sci(*x)).collect();
        content += &fields.join(delimiter);
        content += "\n";
    }

    fs::write(path, content)?;
    Ok(())
}

/// Read a file written by [`write_s11`] (or any one-port Touchstone file).
pub fn read_s11(path: &Path) -> Result<S11Measurement> {
    let re_file_opts = Regex::new(
        r"(?i)^#\s*(?<freq>\w?)hz\s+(?<param>s|y|z)\s+(?<format>db|ma|ri)\s+R\s+(?<impedance>\d+\.?\d*)",
    )
    .map_err(|e| VnaError::Parse(e.to_string()))?;

    let content = fs::read_to_string(path)?;
    let mut unit = Unit::Base;
    let mut format = RFDataFormat::RI;
    let mut freq_tmp: Vec<f64> = vec![];
    let mut a_tmp: Vec<f64> = vec![];
    let mut b_tmp: Vec<f64> = vec![];

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }
        if line.starts_with('#') {
            let Some(vals) = re_file_opts.captures(line) else {
                return Err(VnaError::Parse(format!(
                    "line {}: option line not valid: {}",
                    lineno + 1,
                    line
                )));
            };
            unit = Unit::from_str(&vals["freq"]).map_err(|e| VnaError::Parse(e.to_string()))?;
            let parameter = RFParameter::from_option_string(&vals["param"])
                .map_err(|e| VnaError::Parse(e.to_string()))?;
            if parameter != RFParameter::S {
                return Err(VnaError::Parse(format!(
                    "line {}: expected S parameters, found {}",
                    lineno + 1,
                    parameter
                )));
            }
            format = RFDataFormat::from_str(&vals["format"])
                .map_err(|e| VnaError::Parse(e.to_string()))?;
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 3 {
            return Err(VnaError::ShapeMismatch(format!(
                "line {}: {} columns, expected 3",
                lineno + 1,
                fields.len()
            )));
        }
        let mut vals = [0.0; 3];
        for (val, field) in vals.iter_mut().zip(&fields) {
            *val = field
                .parse()
                .map_err(|e| VnaError::Parse(format!("line {}: {:?} ({})", lineno + 1, field, e)))?;
        }
        freq_tmp.push(vals[0]);
        a_tmp.push(vals[1]);
        b_tmp.push(vals[2]);
    }

    S11Measurement::new(
        Frequency::from_vec(freq_tmp, unit),
        Row::<f64>::from_fn(a_tmp.len(), |i| a_tmp[i]),
        Row::<f64>::from_fn(b_tmp.len(), |i| b_tmp[i]),
        format,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::comp_row_f64;
    use faer::row;

    fn measurement(format: RFDataFormat) -> S11Measurement {
        S11Measurement::new(
            Frequency::new(row![40e6, 40.25e6, 40.5e6]),
            row![0.125, -0.0625, 1.0e-21],
            row![0.0, 0.5, -3.25],
            format,
        )
        .unwrap()
    }

    #[test]
    fn sci_has_signed_two_digit_exponent() {
        assert_eq!("4.000000000000000000e+07", format_sci(40e6));
        assert_eq!("1.250000000000000000e-01", format_sci(0.125));
        assert_eq!("-6.250000000000000000e-02", format_sci(-0.0625));
        assert_eq!("0.000000000000000000e+00", format_sci(0.0));
        assert_eq!("1.000000000000000000e+22", format_sci(1e22));
        assert_eq!("-9.765625000000000000e-04", format_sci(-0.0009765625));
        assert_eq!("nan", format_sci(f64::NAN));
        assert_eq!("-inf", format_sci(f64::NEG_INFINITY));
    }

    #[test]
    fn write_tab_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Match01.s1p");
        write_s11(&path, &measurement(RFDataFormat::RI)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(Some("# Hz S RI R 50"), lines.next());
        assert_eq!(
            Some("4.000000000000000000e+07\t1.250000000000000000e-01\t0.000000000000000000e+00"),
            lines.next()
        );
        assert_eq!(3, lines.count() + 1);
    }

    #[test]
    fn write_csv_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warmup.CSV");
        write_s11(&path, &measurement(RFDataFormat::RI)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(3, content.lines().count());
        assert!(content.starts_with("4.000000000000000000e+07,1.250000000000000000e-01,"));
        assert!(!content.contains('#'));
        assert!(!content.contains('\t'));
    }

    #[test]
    fn magnitude_phase_option_line() {
        assert_eq!("Hz S DB R 50", option_line(RFDataFormat::DB));
        assert_eq!("Hz S RI R 50", option_line(RFDataFormat::RI));
    }

    #[test]
    fn read_back_both_variants() {
        let dir = tempfile::tempdir().unwrap();
        let exemplar = measurement(RFDataFormat::DB);
        for name in ["Short01.s1p", "Short01.csv"] {
            let path = dir.path().join(name);
            write_s11(&path, &exemplar).unwrap();
            let s11 = read_s11(&path).unwrap();

            comp_row_f64(exemplar.freq().freq(), s11.freq().freq(), name);
            comp_row_f64(exemplar.real(), s11.real(), name);
            comp_row_f64(exemplar.imag(), s11.imag(), name);
        }
        let s11 = read_s11(&dir.path().join("Short01.s1p")).unwrap();
        assert_eq!(RFDataFormat::DB, s11.format());
        let s11 = read_s11(&dir.path().join("Short01.csv")).unwrap();
        assert_eq!(RFDataFormat::RI, s11.format());
    }

    #[test]
    fn read_scaled_frequency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("open.s1p");
        fs::write(&path, "! comment\n# MHz S MA R 50\n40 0.5 90\n200 1.0 0\n").unwrap();
        let s11 = read_s11(&path).unwrap();

        assert_eq!(40e6, s11.freq().freq_at(0));
        assert_eq!(200e6, s11.freq().freq_at(1));
        assert_eq!(RFDataFormat::MA, s11.format());
        let z = s11.to_complex();
        assert!(z.read(0).re.abs() < 1e-12);
        assert!((z.read(0).im - 0.5).abs() < 1e-12);
    }

    #[test]
    fn read_rejects_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.s1p");
        fs::write(&path, "# Hz S RI R 50\n1 2\n").unwrap();
        assert!(matches!(read_s11(&path), Err(VnaError::ShapeMismatch(_))));

        fs::write(&path, "# Hz Z RI R 50\n1 2 3\n").unwrap();
        assert!(matches!(read_s11(&path), Err(VnaError::Parse(_))));

        fs::write(&path, "1 2 x\n").unwrap();
        assert!(matches!(read_s11(&path), Err(VnaError::Parse(_))));
    }
}
