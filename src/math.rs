use faer::Row;

/// Root-mean-square of the element-wise difference of two rows.
///
/// Rows of different length are compared over the shorter one.
pub fn rms_diff(a: &Row<f64>, b: &Row<f64>) -> f64 {
    let n = a.ncols().min(b.ncols());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = (0..n)
        .map(|i| {
            let d = a.read(i) - b.read(i);
            d * d
        })
        .sum();
    (sum / n as f64).sqrt()
}

/// RMS difference between the even- and odd-indexed halves of a row.
///
/// This is the intrinsic point-to-point scatter of a single sweep. Samples are
/// paired `(0, 1), (2, 3), ...`; a trailing unpaired sample is ignored.
pub fn interleaved_rms(a: &Row<f64>) -> f64 {
    let pairs = a.ncols() / 2;
    if pairs == 0 {
        return 0.0;
    }
    let sum: f64 = (0..pairs)
        .map(|k| {
            let d = a.read(2 * k) - a.read(2 * k + 1);
            d * d
        })
        .sum();
    (sum / pairs as f64).sqrt()
}

pub fn comp_row_f64(exemplar: &Row<f64>, calc: &Row<f64>, test: &str) {
    assert_eq!(
        exemplar.ncols(),
        calc.ncols(),
        " Failed test {}: length mismatch",
        test
    );
    for k in 0..calc.ncols() {
        comp_point(&exemplar.read(k), &calc.read(k), test, format!("({})", k));
    }
}

pub fn comp_point(exemplar: &f64, calc: &f64, test: &str, idx: String) {
    if exemplar == calc {
        return;
    }

    let base: f64 = 10.0;
    let eps = base.powi(-10);

    debug_assert!(
        (calc - exemplar).abs() < (eps * exemplar).abs(),
        " Failed test {} at location {}\n  exemplar: {}\n      calc: {}",
        test,
        idx,
        exemplar,
        calc
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use faer::row;

    #[test]
    fn rms_diff_identical_is_zero() {
        let a = row![0.1, 0.2, 0.3];
        assert_eq!(0.0, rms_diff(&a, &a.clone()));
    }

    #[test]
    fn rms_diff_constant_offset() {
        let a = row![1.0, 2.0, 3.0, 4.0];
        let b = row![0.5, 1.5, 2.5, 3.5];
        assert_eq!(0.5, rms_diff(&a, &b));
    }

    #[test]
    fn interleaved_rms_alternating() {
        let a = row![1.0, -1.0, 1.0, -1.0];
        assert_eq!(2.0, interleaved_rms(&a));
    }

    #[test]
    fn interleaved_rms_odd_length() {
        // trailing sample 100.0 has no partner
        let a = row![0.0, 3.0, 0.0, 3.0, 100.0];
        assert_eq!(3.0, interleaved_rms(&a));
        assert_eq!(0.0, interleaved_rms(&row![5.0]));
    }
}
