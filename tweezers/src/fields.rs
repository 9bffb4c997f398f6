use std::borrow::Cow;

use faer::Par;
use multipole::{
    harmonics::SphericalHarmonics,
    mode_index::ModeIndex,
    radial::{Basis, RadialFunctions, saturate},
    utility::{cartesian_to_spherical, spherical_to_cartesian},
};
use num::complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    bsc::{ArrayType, Bsc},
    coefficients::CoefficientVector,
    error::BscError,
    translation::mode_norm,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldBasis {
    Cartesian,
    /// Components along `r̂`, `θ̂` and `φ̂` of each point.
    Spherical,
}

/// Complex vector field sampled at a set of points.
///
/// Positions are kept in spherical coordinates `[r, θ, φ]` so that switching the
/// component basis is exact, also on the z axis.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldVector {
    pub positions: Vec<[f64; 3]>,
    pub values: Vec<[Complex64; 3]>,
    pub basis: FieldBasis,
}

impl FieldVector {
    pub fn zeros(positions: Vec<[f64; 3]>, basis: FieldBasis) -> Self {
        let values = vec![[Complex64::ZERO; 3]; positions.len()];

        Self {
            positions,
            values,
            basis,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn cartesian_points(&self) -> Vec<[f64; 3]> {
        self.positions.iter().map(|&p| spherical_to_cartesian(p)).collect()
    }

    pub fn to_cartesian(&self) -> Self {
        match self.basis {
            FieldBasis::Cartesian => self.clone(),
            FieldBasis::Spherical => {
                self.converted(FieldBasis::Cartesian, spherical_to_cartesian_components)
            }
        }
    }

    pub fn to_spherical(&self) -> Self {
        match self.basis {
            FieldBasis::Spherical => self.clone(),
            FieldBasis::Cartesian => {
                self.converted(FieldBasis::Spherical, cartesian_to_spherical_components)
            }
        }
    }

    fn converted(
        &self,
        basis: FieldBasis,
        f: fn([f64; 3], [Complex64; 3]) -> [Complex64; 3],
    ) -> Self {
        Self {
            positions: self.positions.clone(),
            values: self.positions.iter().zip(&self.values).map(|(&p, &v)| f(p, v)).collect(),
            basis,
        }
    }

    /// Sum of two fields sampled at the same positions, in the basis of `self`.
    pub fn sum(&self, other: &Self) -> Self {
        assert_eq!(self.len(), other.len(), "fields are sampled at different points");
        let other = match self.basis {
            FieldBasis::Cartesian => other.to_cartesian(),
            FieldBasis::Spherical => other.to_spherical(),
        };

        Self {
            positions: self.positions.clone(),
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(u, v)| [u[0] + v[0], u[1] + v[1], u[2] + v[2]])
                .collect(),
            basis: self.basis,
        }
    }

    /// `Σ|vᵢ|²` at each point.
    pub fn norm_sqr(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.iter().map(|c| c.norm_sqr()).sum()).collect()
    }
}

fn spherical_to_cartesian_components(position: [f64; 3], v: [Complex64; 3]) -> [Complex64; 3] {
    let [_, theta, phi] = position;
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();

    [
        st * cp * v[0] + ct * cp * v[1] - sp * v[2],
        st * sp * v[0] + ct * sp * v[1] + cp * v[2],
        ct * v[0] - st * v[1],
    ]
}

fn cartesian_to_spherical_components(position: [f64; 3], v: [Complex64; 3]) -> [Complex64; 3] {
    let [_, theta, phi] = position;
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();

    [
        st * cp * v[0] + st * sp * v[1] + ct * v[2],
        ct * cp * v[0] + ct * sp * v[1] - st * v[2],
        -sp * v[0] + cp * v[1],
    ]
}

/// Electric and magnetic field of one beam.
#[derive(Clone, Debug, PartialEq)]
pub struct EhFields {
    pub e: FieldVector,
    pub h: FieldVector,
}

impl EhFields {
    pub fn sum(&self, other: &Self) -> Self {
        Self {
            e: self.e.sum(&other.e),
            h: self.h.sum(&other.h),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldOptions {
    /// Parallelism over evaluation points.
    pub parallel: Par,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self { parallel: Par::Seq }
    }
}

fn map_points<T: Send>(len: usize, par: Par, f: impl Fn(usize) -> T + Sync + Send) -> Vec<T> {
    match par {
        Par::Seq => (0..len).map(f).collect(),
        _ => (0..len).into_par_iter().map(f).collect(),
    }
}

/// Angular and radial tables of a near field evaluation, reusable for beams of
/// the same order, basis and wavenumber at the same points.
#[derive(Clone, Debug, PartialEq)]
pub struct NearFieldData {
    points: Vec<[f64; 3]>,
    nmax: u32,
    basis: Basis,
    wavenumber: f64,
    harmonics: Vec<SphericalHarmonics>,
    radial: Vec<RadialFunctions>,
}

impl NearFieldData {
    pub fn new(points: &[[f64; 3]], nmax: u32, basis: Basis, wavenumber: f64, par: Par) -> Self {
        let tables = map_points(points.len(), par, |i| {
            let [r, theta, phi] = cartesian_to_spherical(points[i]);

            (
                SphericalHarmonics::new(nmax, theta, phi),
                RadialFunctions::new(basis, nmax, wavenumber * r),
            )
        });
        let (harmonics, radial) = tables.into_iter().unzip();

        Self {
            points: points.to_vec(),
            nmax,
            basis,
            wavenumber,
            harmonics,
            radial,
        }
    }

    pub fn matches(&self, points: &[[f64; 3]], nmax: u32, basis: Basis, wavenumber: f64) -> bool {
        self.nmax == nmax
            && self.basis == basis
            && self.wavenumber == wavenumber
            && self.points == points
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    fn evaluate(&self, a: &CoefficientVector, b: &CoefficientVector, par: Par) -> EhFields {
        let values = map_points(self.points.len(), par, |i| {
            near_field_at(a, b, &self.harmonics[i], &self.radial[i])
        });

        let positions: Vec<[f64; 3]> = self
            .points
            .iter()
            .map(|&p| cartesian_to_spherical(p))
            .collect();
        let (e, h): (Vec<_>, Vec<_>) = values.into_iter().unzip();

        EhFields {
            e: FieldVector {
                positions: positions.clone(),
                values: e,
                basis: FieldBasis::Spherical,
            }
            .to_cartesian(),
            h: FieldVector {
                positions,
                values: h,
                basis: FieldBasis::Spherical,
            }
            .to_cartesian(),
        }
    }
}

/// Spherical components of `E = Σ a M + b N` and `H = -i Σ a N + b M` at one point.
fn near_field_at(
    a: &CoefficientVector,
    b: &CoefficientVector,
    harmonics: &SphericalHarmonics,
    radial: &RadialFunctions,
) -> ([Complex64; 3], [Complex64; 3]) {
    let i = Complex64::I;
    let kr = radial.kr;
    let mut e = [Complex64::ZERO; 3];
    let mut h = [Complex64::ZERO; 3];

    for (row, value) in a.iter_nonzero() {
        let mode = ModeIndex::from_row(row);
        let (y, ytheta, yphi) = harmonics.get(mode);
        let n = mode.n;
        let z = radial.value(n);
        let zd = radial.riccati_derivative(n);
        let coefficient = value * mode_norm(n);
        let longitudinal = Complex64::from((n * (n + 1)) as f64 / kr);

        add_product(&mut e[1], &[coefficient, z, yphi]);
        add_product(&mut e[2], &[-coefficient, z, ytheta]);

        add_product(&mut h[0], &[-i * coefficient, longitudinal, z, y]);
        add_product(&mut h[1], &[-i * coefficient, zd, ytheta]);
        add_product(&mut h[2], &[-i * coefficient, zd, yphi]);
    }

    for (row, value) in b.iter_nonzero() {
        let mode = ModeIndex::from_row(row);
        let (y, ytheta, yphi) = harmonics.get(mode);
        let n = mode.n;
        let z = radial.value(n);
        let zd = radial.riccati_derivative(n);
        let coefficient = value * mode_norm(n);
        let longitudinal = Complex64::from((n * (n + 1)) as f64 / kr);

        add_product(&mut e[0], &[coefficient, longitudinal, z, y]);
        add_product(&mut e[1], &[coefficient, zd, ytheta]);
        add_product(&mut e[2], &[coefficient, zd, yphi]);

        add_product(&mut h[1], &[-i * coefficient, z, yphi]);
        add_product(&mut h[2], &[i * coefficient, z, ytheta]);
    }

    (e, h)
}

/// Adds the product of finite `factors` to `total`. Singular waves near the origin overflow,
/// there the product and the sum saturate at `±f64::MAX`.
fn add_product(total: &mut Complex64, factors: &[Complex64]) {
    let direct: Complex64 = factors.iter().product();
    let term = if direct.is_finite() {
        direct
    } else if factors.contains(&Complex64::ZERO) {
        Complex64::ZERO
    } else {
        let (log_norm, phase) = factors
            .iter()
            .fold((0f64, 0f64), |(l, p), f| (l + f.norm().ln(), p + f.arg()));

        Complex64::from_polar(f64::exp(log_norm).min(f64::MAX), phase)
    };

    *total = saturate(*total + term);
}

/// Angular tables of a far field evaluation at directions `[θ, φ]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FarFieldData {
    directions: Vec<[f64; 2]>,
    nmax: u32,
    harmonics: Vec<SphericalHarmonics>,
}

impl FarFieldData {
    pub fn new(directions: &[[f64; 2]], nmax: u32, par: Par) -> Self {
        let harmonics = map_points(directions.len(), par, |i| {
            let [theta, phi] = directions[i];
            SphericalHarmonics::new(nmax, theta, phi)
        });

        Self {
            directions: directions.to_vec(),
            nmax,
            harmonics,
        }
    }

    pub fn matches(&self, directions: &[[f64; 2]], nmax: u32) -> bool {
        self.nmax == nmax && self.directions == directions
    }

    pub fn directions(&self) -> &[[f64; 2]] {
        &self.directions
    }

    fn evaluate(
        &self,
        a: &CoefficientVector,
        b: &CoefficientVector,
        phase: Complex64,
        par: Par,
    ) -> EhFields {
        let values = map_points(self.directions.len(), par, |i| {
            far_field_at(a, b, &self.harmonics[i], phase)
        });

        let positions: Vec<[f64; 3]> = self
            .directions
            .iter()
            .map(|&[theta, phi]| [1., theta, phi])
            .collect();
        let (e, h): (Vec<_>, Vec<_>) = values.into_iter().unzip();

        EhFields {
            e: FieldVector {
                positions: positions.clone(),
                values: e,
                basis: FieldBasis::Spherical,
            },
            h: FieldVector {
                positions,
                values: h,
                basis: FieldBasis::Spherical,
            },
        }
    }
}

/// Angular part of the field, radial hankel functions replaced by their large argument limit
/// `phase^(n+1) e^{±ikr} / kr` without the spherical wave factor.
fn far_field_at(
    a: &CoefficientVector,
    b: &CoefficientVector,
    harmonics: &SphericalHarmonics,
    phase: Complex64,
) -> ([Complex64; 3], [Complex64; 3]) {
    let i = Complex64::I;
    let mut e = [Complex64::ZERO; 3];
    let mut h = [Complex64::ZERO; 3];

    for (row, value) in a.iter_nonzero() {
        let mode = ModeIndex::from_row(row);
        let (_, ytheta, yphi) = harmonics.get(mode);
        let n = mode.n as i32;
        let coefficient = value * mode_norm(mode.n);
        let (m_phase, n_phase) = (phase.powi(n + 1), phase.powi(n));

        e[1] += coefficient * m_phase * yphi;
        e[2] -= coefficient * m_phase * ytheta;

        h[1] -= i * coefficient * n_phase * ytheta;
        h[2] -= i * coefficient * n_phase * yphi;
    }

    for (row, value) in b.iter_nonzero() {
        let mode = ModeIndex::from_row(row);
        let (_, ytheta, yphi) = harmonics.get(mode);
        let n = mode.n as i32;
        let coefficient = value * mode_norm(mode.n);
        let (m_phase, n_phase) = (phase.powi(n + 1), phase.powi(n));

        e[1] += coefficient * n_phase * ytheta;
        e[2] += coefficient * n_phase * yphi;

        h[1] -= i * coefficient * m_phase * yphi;
        h[2] += i * coefficient * m_phase * ytheta;
    }

    (e, h)
}

impl Bsc {
    /// Columns that are evaluated separately, coherent beams collapse to their sum.
    fn evaluated_columns(&self) -> Cow<'_, Bsc> {
        match self.array_type() {
            ArrayType::Coherent => Cow::Owned(self.sum_columns()),
            ArrayType::Array | ArrayType::Incoherent => Cow::Borrowed(self),
        }
    }

    /// Near fields at cartesian `points`, given in units of the inverse wavenumber.
    /// Returns one field per column, a single one for coherent beams.
    pub fn ehfield(&self, points: &[[f64; 3]]) -> Vec<EhFields> {
        self.ehfield_with(points, None, &FieldOptions::default()).0
    }

    /// As [`Bsc::ehfield`], reusing `data` when it was computed for the same request.
    pub fn ehfield_with(
        &self,
        points: &[[f64; 3]],
        data: Option<NearFieldData>,
        options: &FieldOptions,
    ) -> (Vec<EhFields>, NearFieldData) {
        let (nmax, basis, wavenumber) = (self.nmax(), self.basis(), self.wavenumber());

        let data = match data {
            Some(data) if data.matches(points, nmax, basis, wavenumber) => data,
            _ => {
                tracing::debug!("building near field tables for {} points", points.len());
                NearFieldData::new(points, nmax, basis, wavenumber, options.parallel)
            }
        };

        let beam = self.evaluated_columns();
        let fields = beam
            .a()
            .iter()
            .zip(beam.b())
            .map(|(a, b)| data.evaluate(a, b, options.parallel))
            .collect();

        (fields, data)
    }

    /// Far field pattern at directions `[θ, φ]` as spherical components without the
    /// `e^{±ikr}/kr` factor. Regular beams have no far field.
    pub fn ehfarfield(&self, directions: &[[f64; 2]]) -> Result<Vec<EhFields>, BscError> {
        Ok(self.ehfarfield_with(directions, None, &FieldOptions::default())?.0)
    }

    pub fn ehfarfield_with(
        &self,
        directions: &[[f64; 2]],
        data: Option<FarFieldData>,
        options: &FieldOptions,
    ) -> Result<(Vec<EhFields>, FarFieldData), BscError> {
        let phase = match self.basis() {
            Basis::Outgoing => -Complex64::I,
            Basis::Incoming => Complex64::I,
            Basis::Regular => {
                return Err(BscError::Basis {
                    operation: "far field evaluation",
                    basis: Basis::Regular,
                });
            }
        };

        let nmax = self.nmax();
        let data = match data {
            Some(data) if data.matches(directions, nmax) => data,
            _ => FarFieldData::new(directions, nmax, options.parallel),
        };

        let beam = self.evaluated_columns();
        let fields = beam
            .a()
            .iter()
            .zip(beam.b())
            .map(|(a, b)| data.evaluate(a, b, phase, options.parallel))
            .collect();

        Ok((fields, data))
    }
}
