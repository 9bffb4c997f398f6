use std::f64::consts::PI;

use faer::{Mat, Par};
use multipole::{
    harmonics::{LegendreTable, gauss_legendre, legendre_derivatives, legendre_polynomials},
    mode_index::{ModeIndex, max_linear_index},
    radial::{Basis, RadialFunctions},
};
use num::complex::Complex64;
use rayon::prelude::*;

use crate::{coefficients::CoefficientVector, error::BscError};

/// `iᵖ` for any integer power.
pub(crate) fn i_pow(p: i32) -> Complex64 {
    match p.rem_euclid(4) {
        0 => Complex64::ONE,
        1 => Complex64::I,
        2 => -Complex64::ONE,
        _ => -Complex64::I,
    }
}

/// Normalisation `1/sqrt(n(n+1))` of vector spherical waves.
pub(crate) fn mode_norm(n: u32) -> f64 {
    1. / ((n * (n + 1)) as f64).sqrt()
}

/// Matrices re-expanding a beam about the point `d ẑ`.
///
/// The translated coefficients are `a' = A a + B b` and `b' = B a + A b`.
/// Matrices have `nmax_out(nmax_out + 2)` rows and `nmax_in(nmax_in + 2)` columns,
/// both indexed by mode storage rows.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslationMatrices {
    a: Mat<Complex64>,
    b: Mat<Complex64>,
    source: Basis,
    basis: Basis,
    kd: f64,
    nmax_in: u32,
    nmax_out: u32,
}

impl TranslationMatrices {
    /// Builds the translation along the z axis by the dimensionless distance `kd`.
    ///
    /// `source` selects the radial functions of the spectral factors, `jₗ` for regular beams and
    /// the matching hankel function otherwise. The result is always in the regular basis,
    /// apart from `kd == 0` which is the exact identity and keeps `source`.
    pub fn along_z(
        source: Basis,
        kd: f64,
        nmax_in: u32,
        nmax_out: u32,
        par: Par,
    ) -> Result<Self, BscError> {
        if kd == 0. {
            return Ok(Self::identity(source, nmax_in, nmax_out));
        }

        let lmax = nmax_in + nmax_out;
        let radial = RadialFunctions::new(source, lmax, kd.abs());
        let sign = kd.signum();

        let spectral: Vec<Complex64> = (0..=lmax)
            .map(|l| i_pow(l as i32) * (2 * l + 1) as f64 * radial.value(l) * sign.powi(l as i32))
            .collect();

        let quadrature = AngularQuadrature::new(nmax_in.max(nmax_out), lmax, (lmax + 2) as usize)?;

        let mmax = nmax_in.min(nmax_out);
        let blocks: Vec<Vec<BlockEntry>> = match par {
            Par::Seq => (0..=mmax)
                .map(|m| quadrature.block(m, &spectral, nmax_in, nmax_out))
                .collect(),
            _ => (0..=mmax)
                .into_par_iter()
                .map(|m| quadrature.block(m, &spectral, nmax_in, nmax_out))
                .collect(),
        };

        let rows = max_linear_index(nmax_out);
        let cols = max_linear_index(nmax_in);
        let mut a = Mat::zeros(rows, cols);
        let mut b = Mat::zeros(rows, cols);

        for entry in blocks.iter().flatten() {
            let m = entry.m as i32;
            let row = ModeIndex::new(entry.n_out, m).row();
            let col = ModeIndex::new(entry.n_in, m).row();
            a[(row, col)] = entry.a;
            b[(row, col)] = entry.b;

            if m > 0 {
                let row = ModeIndex::new(entry.n_out, -m).row();
                let col = ModeIndex::new(entry.n_in, -m).row();
                a[(row, col)] = entry.a;
                b[(row, col)] = -entry.b;
            }
        }

        Ok(Self {
            a,
            b,
            source,
            basis: Basis::Regular,
            kd,
            nmax_in,
            nmax_out,
        })
    }

    fn identity(basis: Basis, nmax_in: u32, nmax_out: u32) -> Self {
        let rows = max_linear_index(nmax_out);
        let cols = max_linear_index(nmax_in);

        Self {
            a: Mat::identity(rows, cols),
            b: Mat::zeros(rows, cols),
            source: basis,
            basis,
            kd: 0.,
            nmax_in,
            nmax_out,
        }
    }

    pub fn a(&self) -> &Mat<Complex64> {
        &self.a
    }

    pub fn b(&self) -> &Mat<Complex64> {
        &self.b
    }

    pub fn source(&self) -> Basis {
        self.source
    }

    /// Basis of translated beams.
    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn kd(&self) -> f64 {
        self.kd
    }

    pub fn nmax_in(&self) -> u32 {
        self.nmax_in
    }

    pub fn nmax_out(&self) -> u32 {
        self.nmax_out
    }

    /// Block operator `[[A, B], [B, A]]` acting on stacked `[a; b]`.
    pub fn stacked(&self) -> Mat<Complex64> {
        let (rows, cols) = (self.a.nrows(), self.a.ncols());

        Mat::from_fn(2 * rows, 2 * cols, |i, j| {
            let (i_low, j_low) = (i % rows, j % cols);
            if (i < rows) == (j < cols) {
                self.a[(i_low, j_low)]
            } else {
                self.b[(i_low, j_low)]
            }
        })
    }

    pub fn apply(
        &self,
        a: &CoefficientVector,
        b: &CoefficientVector,
    ) -> Result<(CoefficientVector, CoefficientVector), BscError> {
        let expected = self.a.ncols();
        if a.len() != expected || b.len() != expected {
            return Err(BscError::OperatorShape {
                rows: self.a.nrows(),
                cols: self.a.ncols(),
                expected: a.len(),
            });
        }

        let new_a = a.transformed(&self.a).sum(&b.transformed(&self.b));
        let new_b = a.transformed(&self.b).sum(&b.transformed(&self.a));

        Ok((new_a, new_b))
    }
}

struct BlockEntry {
    m: u32,
    n_out: u32,
    n_in: u32,
    a: Complex64,
    b: Complex64,
}

/// Gauss-Legendre rule over `cos θ` with everything the translation integrals need at each node.
struct AngularQuadrature {
    weights: Vec<f64>,
    tables: Vec<LegendreTable>,
    legendre: Vec<Vec<f64>>,
    legendre_derivatives: Vec<Vec<f64>>,
}

impl AngularQuadrature {
    fn new(nmax: u32, lmax: u32, points: usize) -> Result<Self, BscError> {
        let (nodes, weights) = gauss_legendre(points).ok_or(BscError::Quadrature(points))?;

        Ok(Self {
            tables: nodes.iter().map(|x| LegendreTable::new(nmax, x.acos())).collect(),
            legendre: nodes.iter().map(|&x| legendre_polynomials(lmax, x)).collect(),
            legendre_derivatives: nodes.iter().map(|&x| legendre_derivatives(lmax, x)).collect(),
            weights,
        })
    }

    /// Entries of order `m >= 0`. Parity of the integrands restricts `A` to even `l + n + n'`
    /// and `B` to odd ones.
    fn block(
        &self,
        m: u32,
        spectral: &[Complex64],
        nmax_in: u32,
        nmax_out: u32,
    ) -> Vec<BlockEntry> {
        let mi = m as i32;
        let m2 = (m * m) as f64;
        let nmin = m.max(1);

        let mut entries = Vec::new();
        for n_out in nmin..=nmax_out {
            for n_in in nmin..=nmax_in {
                let lmin = n_out.abs_diff(n_in);
                let lmax = n_out + n_in;

                let mut a = Complex64::ZERO;
                for l in (lmin..=lmax).step_by(2) {
                    let integral: f64 = self
                        .tables
                        .iter()
                        .zip(&self.weights)
                        .zip(&self.legendre)
                        .map(|((t, w), p)| {
                            let angular = t.derivative(n_out, mi) * t.derivative(n_in, mi)
                                + m2 * t.over_sin(n_out, mi) * t.over_sin(n_in, mi);

                            w * angular * p[l as usize]
                        })
                        .sum();

                    a += spectral[l as usize] * integral;
                }

                let mut b = Complex64::ZERO;
                if m > 0 {
                    for l in (lmin + 1..lmax).step_by(2) {
                        let integral: f64 = self
                            .tables
                            .iter()
                            .zip(&self.weights)
                            .zip(&self.legendre_derivatives)
                            .map(|((t, w), dp)| {
                                w * t.value(n_out, mi) * t.value(n_in, mi) * dp[l as usize]
                            })
                            .sum();

                        b += spectral[l as usize] * m as f64 * integral;
                    }
                }

                let factor = i_pow(n_out as i32 - n_in as i32)
                    * 2.
                    * PI
                    * mode_norm(n_out)
                    * mode_norm(n_in);
                entries.push(BlockEntry {
                    m,
                    n_out,
                    n_in,
                    a: factor * a,
                    b: factor * b,
                });
            }
        }

        entries
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;

    use faer::{Mat, Par};
    use multipole::{
        mode_index::{ModeIndex, max_linear_index},
        radial::Basis,
    };
    use num::complex::Complex64;

    use crate::coefficients::CoefficientVector;

    use super::{TranslationMatrices, i_pow};

    /// Plane wave travelling along z polarised along x.
    fn plane_wave_z(nmax: u32) -> (CoefficientVector, CoefficientVector) {
        let mut a = CoefficientVector::zeros(max_linear_index(nmax));
        let mut b = CoefficientVector::zeros(max_linear_index(nmax));

        for n in 1..=nmax {
            let amplitude = (PI * (2 * n + 1) as f64).sqrt();
            for m in [-1, 1] {
                let row = ModeIndex::new(n, m).row();
                a.set(row, i_pow(n as i32 + 1) * amplitude);
                b.set(row, -(m as f64) * i_pow(n as i32 - 1) * amplitude);
            }
        }

        (a, b)
    }

    fn max_difference(left: &Mat<Complex64>, right: &Mat<Complex64>) -> f64 {
        let mut max: f64 = 0.;
        for i in 0..left.nrows() {
            for j in 0..left.ncols() {
                max = max.max((left[(i, j)] - right[(i, j)]).norm());
            }
        }
        max
    }

    #[test]
    fn test_zero_distance() {
        let translation =
            TranslationMatrices::along_z(Basis::Outgoing, 0., 4, 3, Par::Seq).unwrap();

        assert_eq!(translation.basis(), Basis::Outgoing);
        assert_eq!(translation.a().nrows(), 15);
        assert_eq!(translation.a().ncols(), 24);
        for i in 0..15 {
            for j in 0..24 {
                let expected = if i == j { Complex64::ONE } else { Complex64::ZERO };
                assert_eq!(translation.a()[(i, j)], expected);
                assert_eq!(translation.b()[(i, j)], Complex64::ZERO);
            }
        }
    }

    #[test]
    fn test_small_distance_is_near_identity() {
        let translation =
            TranslationMatrices::along_z(Basis::Regular, 1e-7, 5, 5, Par::Seq).unwrap();
        assert_eq!(translation.basis(), Basis::Regular);

        let identity = Mat::<Complex64>::identity(35, 35);
        assert!(max_difference(translation.a(), &identity) < 1e-6);
        assert!(max_difference(translation.b(), &Mat::zeros(35, 35)) < 1e-6);
    }

    #[test]
    fn test_plane_wave_phase() {
        let (a, b) = plane_wave_z(30);
        let (expected_a, expected_b) = plane_wave_z(10);

        for kd in [PI / 2., -PI / 2., 2.3] {
            let translation =
                TranslationMatrices::along_z(Basis::Regular, kd, 30, 10, Par::Seq).unwrap();
            let (new_a, new_b) = translation.apply(&a, &b).unwrap();
            let phase = Complex64::from_polar(1., kd);

            for row in 0..max_linear_index(10) {
                let da = new_a.get(row) - phase * expected_a.get(row);
                let db = new_b.get(row) - phase * expected_b.get(row);
                assert!(da.norm() < 1e-8, "kd = {kd}, row = {row}");
                assert!(db.norm() < 1e-8, "kd = {kd}, row = {row}");
            }
        }
    }

    #[test]
    fn test_order_symmetry() {
        let translation =
            TranslationMatrices::along_z(Basis::Regular, 1.3, 6, 6, Par::Seq).unwrap();

        for n_out in 1..=6 {
            for n_in in 1..=6 {
                let zero = (ModeIndex::new(n_out, 0).row(), ModeIndex::new(n_in, 0).row());
                assert_eq!(translation.b()[zero], Complex64::ZERO);

                for m in 1..=n_out.min(n_in) as i32 {
                    let plus = (ModeIndex::new(n_out, m).row(), ModeIndex::new(n_in, m).row());
                    let minus = (ModeIndex::new(n_out, -m).row(), ModeIndex::new(n_in, -m).row());

                    assert_eq!(translation.a()[plus], translation.a()[minus]);
                    assert_eq!(translation.b()[plus], -translation.b()[minus]);
                }
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential =
            TranslationMatrices::along_z(Basis::Outgoing, 3.1, 8, 12, Par::Seq).unwrap();
        let parallel =
            TranslationMatrices::along_z(Basis::Outgoing, 3.1, 8, 12, Par::rayon(0)).unwrap();

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_composition() {
        let (kd1, kd2) = (0.4, -0.7);
        let first = TranslationMatrices::along_z(Basis::Regular, kd1, 5, 25, Par::Seq).unwrap();
        let second = TranslationMatrices::along_z(Basis::Regular, kd2, 25, 5, Par::Seq).unwrap();
        let direct =
            TranslationMatrices::along_z(Basis::Regular, kd1 + kd2, 5, 5, Par::Seq).unwrap();

        let composed = &second.stacked() * &first.stacked();

        assert!(max_difference(&composed, &direct.stacked()) < 1e-10);
    }

    #[test]
    fn test_shape_error() {
        let translation = TranslationMatrices::along_z(Basis::Regular, 1., 3, 3, Par::Seq).unwrap();
        let short = CoefficientVector::zeros(8);

        assert!(translation.apply(&short, &short).is_err());
    }
}
