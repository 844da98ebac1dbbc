use crate::enums::Unit;
use faer::Row;

// Frequency stores values in Hz
#[derive(Clone, Debug, PartialEq)]
pub struct Frequency {
    pts: Row<f64>,
}

impl Frequency {
    fn f_scaled(&self, unit: Unit) -> Row<f64> {
        Row::<f64>::from_fn(self.npts(), |i| self.pts.read(i) / unit.scale())
    }

    pub fn freq(&self) -> &Row<f64> {
        &self.pts
    }

    pub fn freq_at(&self, pt: usize) -> f64 {
        self.pts.read(pt)
    }

    pub fn freq_scaled_at(&self, pt: usize, unit: Unit) -> f64 {
        self.pts.read(pt) / unit.scale()
    }

    pub fn from_vec(f: Vec<f64>, unit: Unit) -> Frequency {
        Frequency {
            pts: Row::<f64>::from_fn(f.len(), |i| f[i] * unit.scale()),
        }
    }

    pub fn from_lin_range(start: f64, stop: f64, npts: usize, unit: Unit) -> Frequency {
        let step = if npts > 1 {
            (stop - start) / (npts - 1) as f64
        } else {
            0.0
        };

        Frequency {
            pts: Row::<f64>::from_fn(npts, |i| (start + (i as f64) * step) * unit.scale()),
        }
    }

    pub fn hz(&self) -> Row<f64> {
        self.f_scaled(Unit::Base)
    }

    pub fn mhz(&self) -> Row<f64> {
        self.f_scaled(Unit::Mega)
    }

    pub fn new(pts: Row<f64>) -> Frequency {
        Frequency { pts }
    }

    pub fn npts(&self) -> usize {
        self.pts.ncols()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        (0..self.npts()).map(|i| self.pts.read(i)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::comp_row_f64;
    use faer::row;

    #[test]
    fn frequency_equal() {
        let freq = Frequency::from_vec(vec![1.0, 2.0, 3.0], Unit::Mega);
        let freq_eq = Frequency::from_vec(vec![1.0, 2.0, 3.0], Unit::Mega);
        let freq_ne = Frequency::from_vec(vec![1.0, 2.0, 3.0, 4.0], Unit::Mega);
        let freq_ne2 = Frequency::from_vec(vec![1.0, 3.0, 4.0], Unit::Mega);

        assert_eq!(freq, freq_eq);
        assert_ne!(freq, freq_ne);
        assert_ne!(freq, freq_ne2);
    }

    #[test]
    fn frequency_from_vec() {
        let data = vec![40.0, 120.0, 200.0];
        let freq_hz = Frequency::from_vec(data.clone(), Unit::Base);
        let freq_mhz = Frequency::from_vec(data.clone(), Unit::Mega);

        for i in 0..data.len() {
            assert_eq!(data[i], freq_hz.freq_at(i));
            assert_eq!(data[i] * Unit::Mega.scale(), freq_mhz.freq_at(i));
        }
        assert_eq!(data.len(), freq_hz.npts());
        assert_eq!(data, freq_hz.to_vec());
    }

    #[test]
    fn frequency_from_lin_range() {
        let freq = Frequency::from_lin_range(40.0, 200.0, 641, Unit::Mega);

        assert_eq!(641, freq.npts());
        assert_eq!(40e6, freq.freq_at(0));
        assert_eq!(200e6, freq.freq_at(640));
        assert_eq!(120.0, freq.freq_scaled_at(320, Unit::Mega));
    }

    #[test]
    fn frequency_scaled() {
        let freq = Frequency::new(row![40.0e6, 100.0e6, 200.0e6]);

        comp_row_f64(&row![40.0e6, 100.0e6, 200.0e6], &freq.hz(), "hz");
        comp_row_f64(&row![40.0, 100.0, 200.0], &freq.mhz(), "mhz");
    }
}
