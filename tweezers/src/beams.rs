use std::f64::consts::PI;

use faer::Mat;
use multipole::{
    harmonics::{LegendreTable, SphericalHarmonics, gauss_legendre},
    mode_index::{max_linear_index, modes, nmax_from_len},
    radial::Basis,
    utility::{cartesian_to_spherical, ka2nmax},
};
use num::complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::{
    bsc::{Bsc, Truncation},
    coefficients::CoefficientVector,
    error::BscError,
    fields::{EhFields, FieldBasis, FieldVector},
    force::{ForceTorque, force_torque},
    translation::{i_pow, mode_norm},
};

/// Anything with an electric and magnetic field that can be expanded in vector spherical waves.
pub trait ElectromagneticBeam {
    fn wavenumber(&self) -> f64;

    /// Fields at cartesian `points`, one entry per evaluated column.
    fn ehfield(&self, points: &[[f64; 3]]) -> Result<Vec<EhFields>, BscError>;

    fn to_bsc(&self, nmax: u32) -> Result<Bsc, BscError>;
}

/// Quadrature used to project a Gaussian angular spectrum on vector spherical waves,
/// `None` picks a rule exact for the requested order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaussianOptions {
    pub theta_points: Option<usize>,
    pub phi_points: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnalyticBeam {
    /// `E₀ e^{ik k̂·r}`, the component of `polarisation` along `direction` is dropped.
    PlaneWave {
        direction: [f64; 3],
        polarisation: [Complex64; 3],
        wavenumber: f64,
    },
    /// Beam focused at the origin travelling along `+z` with a Gaussian angular spectrum of
    /// the given focal `waist` and transverse `[x, y]` polarisation, normalised to unit power.
    Gaussian {
        waist: f64,
        polarisation: [Complex64; 2],
        wavenumber: f64,
        options: GaussianOptions,
    },
}

impl AnalyticBeam {
    pub fn wavenumber(&self) -> f64 {
        match self {
            AnalyticBeam::PlaneWave { wavenumber, .. }
            | AnalyticBeam::Gaussian { wavenumber, .. } => *wavenumber,
        }
    }

    /// Regular coefficients of the beam truncated at `nmax`.
    pub fn to_bsc(&self, nmax: u32) -> Result<Bsc, BscError> {
        match self {
            AnalyticBeam::PlaneWave {
                direction,
                polarisation,
                wavenumber,
            } => {
                let (a, b) = plane_wave_coefficients(nmax, *direction, *polarisation);

                single_column(a, b, *wavenumber)
            }
            AnalyticBeam::Gaussian {
                waist,
                polarisation,
                wavenumber,
                options,
            } => {
                let (a, b) =
                    gaussian_coefficients(nmax, *waist * *wavenumber, *polarisation, options)?;

                Ok(single_column(a, b, *wavenumber)?.scale_power(1.))
            }
        }
    }

    pub fn ehfield(&self, points: &[[f64; 3]]) -> Result<Vec<EhFields>, BscError> {
        match self {
            AnalyticBeam::PlaneWave {
                direction,
                polarisation,
                wavenumber,
            } => Ok(vec![plane_wave_field(*direction, *polarisation, *wavenumber, points)]),
            AnalyticBeam::Gaussian { waist, wavenumber, .. } => {
                let radius = points
                    .iter()
                    .map(|&p| cartesian_to_spherical(p)[0])
                    .fold(*waist, f64::max);
                let nmax = ka2nmax(wavenumber * radius).max(1);

                Ok(self.to_bsc(nmax)?.ehfield(points))
            }
        }
    }
}

fn single_column(a: Vec<Complex64>, b: Vec<Complex64>, wavenumber: f64) -> Result<Bsc, BscError> {
    Bsc::from_columns(
        vec![CoefficientVector::from_dense(a)],
        vec![CoefficientVector::from_dense(b)],
        Basis::Regular,
        wavenumber,
    )
}

fn normalised(vector: [f64; 3]) -> [f64; 3] {
    let norm = vector.iter().map(|c| c * c).sum::<f64>().sqrt();

    vector.map(|c| c / norm)
}

fn transverse(k_hat: [f64; 3], polarisation: [Complex64; 3]) -> [Complex64; 3] {
    let along: Complex64 = (0..3).map(|i| k_hat[i] * polarisation[i]).sum();

    [0, 1, 2].map(|i| polarisation[i] - k_hat[i] * along)
}

/// Regular coefficients `(a, b)` of the plane wave travelling along `direction`,
/// `a = 4π iⁿ Nₙ C*ₙₘ(k̂)·E₀` and `b = 4π iⁿ⁻¹ Nₙ B*ₙₘ(k̂)·E₀`.
pub fn plane_wave_coefficients(
    nmax: u32,
    direction: [f64; 3],
    polarisation: [Complex64; 3],
) -> (Vec<Complex64>, Vec<Complex64>) {
    let [_, theta, phi] = cartesian_to_spherical(normalised(direction));
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();

    let e_theta = ct * cp * polarisation[0] + ct * sp * polarisation[1] - st * polarisation[2];
    let e_phi = -sp * polarisation[0] + cp * polarisation[1];

    let len = max_linear_index(nmax);
    let mut a = vec![Complex64::ZERO; len];
    let mut b = vec![Complex64::ZERO; len];
    add_plane_wave(
        &SphericalHarmonics::new(nmax, theta, phi),
        [e_theta, e_phi],
        1.,
        &mut a,
        &mut b,
    );

    (a, b)
}

/// Adds `weight` times the coefficients of the plane wave with angular polarisation
/// components `[e_θ, e_φ]` travelling along the direction of `harmonics`.
fn add_plane_wave(
    harmonics: &SphericalHarmonics,
    polarisation: [Complex64; 2],
    weight: f64,
    a: &mut [Complex64],
    b: &mut [Complex64],
) {
    let [e_theta, e_phi] = polarisation;

    for (row, mode) in modes(harmonics.nmax).enumerate() {
        let (_, ytheta, yphi) = harmonics.get(mode);
        let n = mode.n as i32;
        let scale = 4. * PI * weight * mode_norm(mode.n);

        a[row] += scale * i_pow(n) * (yphi.conj() * e_theta - ytheta.conj() * e_phi);
        b[row] += scale * i_pow(n - 1) * (ytheta.conj() * e_theta + yphi.conj() * e_phi);
    }
}

/// Superposition of plane waves over the forward hemisphere with amplitude
/// `exp(-(k w₀ sin θ / 2)²) cos θ`, the polarisation of each wave is the transverse one
/// carried along the meridian.
fn gaussian_coefficients(
    nmax: u32,
    kw0: f64,
    polarisation: [Complex64; 2],
    options: &GaussianOptions,
) -> Result<(Vec<Complex64>, Vec<Complex64>), BscError> {
    let theta_points = options.theta_points.unwrap_or(4 * nmax as usize + 40);
    let phi_points = options.phi_points.unwrap_or(2 * nmax as usize + 4);
    if phi_points == 0 {
        return Err(BscError::Quadrature(phi_points));
    }
    let (nodes, weights) = gauss_legendre(theta_points).ok_or(BscError::Quadrature(theta_points))?;

    let [px, py] = polarisation;
    let len = max_linear_index(nmax);
    let mut a = vec![Complex64::ZERO; len];
    let mut b = vec![Complex64::ZERO; len];

    for (node, weight) in nodes.iter().zip(&weights) {
        let cos_theta = (node + 1.) / 2.;
        let theta = cos_theta.acos();
        let amplitude = (-(kw0 * theta.sin() / 2.).powi(2)).exp() * cos_theta;
        if amplitude == 0. {
            continue;
        }

        let weight = amplitude * weight / 2. * 2. * PI / phi_points as f64;
        let table = LegendreTable::new(nmax, theta);
        for j in 0..phi_points {
            let phi = 2. * PI * j as f64 / phi_points as f64;
            let (sp, cp) = phi.sin_cos();

            add_plane_wave(
                &SphericalHarmonics::from_table(&table, theta, phi),
                [cp * px + sp * py, -sp * px + cp * py],
                weight,
                &mut a,
                &mut b,
            );
        }
    }

    Ok((a, b))
}

fn plane_wave_field(
    direction: [f64; 3],
    polarisation: [Complex64; 3],
    wavenumber: f64,
    points: &[[f64; 3]],
) -> EhFields {
    let k_hat = normalised(direction);
    let e0 = transverse(k_hat, polarisation);

    let (e, h): (Vec<_>, Vec<_>) = points
        .iter()
        .map(|p| {
            let k_dot_r = (0..3).map(|i| k_hat[i] * p[i]).sum::<f64>();
            let phase = Complex64::from_polar(1., wavenumber * k_dot_r);
            let e = e0.map(|c| c * phase);
            let h = [
                k_hat[1] * e[2] - k_hat[2] * e[1],
                k_hat[2] * e[0] - k_hat[0] * e[2],
                k_hat[0] * e[1] - k_hat[1] * e[0],
            ];

            (e, h)
        })
        .unzip();

    let positions: Vec<[f64; 3]> = points.iter().map(|&p| cartesian_to_spherical(p)).collect();
    EhFields {
        e: FieldVector {
            positions: positions.clone(),
            values: e,
            basis: FieldBasis::Cartesian,
        },
        h: FieldVector {
            positions,
            values: h,
            basis: FieldBasis::Cartesian,
        },
    }
}

/// Object that turns a regular incident beam into an outgoing scattered one.
pub trait Scatterer {
    fn nmax(&self) -> u32;

    fn scatter(&self, beam: &Bsc) -> Result<ScatteredBeam, BscError>;
}

/// Dense T-matrix acting on the stacked coefficients `[a; b]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TMatrix {
    matrix: Mat<Complex64>,
    nmax: u32,
}

impl TMatrix {
    pub fn new(matrix: Mat<Complex64>) -> Result<Self, BscError> {
        let (rows, cols) = (matrix.nrows(), matrix.ncols());
        if rows != cols || rows % 2 != 0 {
            return Err(BscError::OperatorShape {
                rows,
                cols,
                expected: rows,
            });
        }
        let nmax = nmax_from_len(rows / 2).ok_or(BscError::InvalidOrder(rows / 2))?;

        Ok(Self { matrix, nmax })
    }

    /// T-matrix of a spherically symmetric particle from its per degree
    /// electric `te(n)` and magnetic `tm(n)` responses.
    pub fn diagonal(
        nmax: u32,
        te: impl Fn(u32) -> Complex64,
        tm: impl Fn(u32) -> Complex64,
    ) -> Self {
        let len = max_linear_index(nmax);
        let mut matrix = Mat::zeros(2 * len, 2 * len);
        for (row, mode) in modes(nmax).enumerate() {
            matrix[(row, row)] = te(mode.n);
            matrix[(row + len, row + len)] = tm(mode.n);
        }

        Self { matrix, nmax }
    }

    pub fn matrix(&self) -> &Mat<Complex64> {
        &self.matrix
    }
}

impl Scatterer for TMatrix {
    fn nmax(&self) -> u32 {
        self.nmax
    }

    fn scatter(&self, beam: &Bsc) -> Result<ScatteredBeam, BscError> {
        if beam.basis() != Basis::Regular {
            return Err(BscError::Basis {
                operation: "scattering",
                basis: beam.basis(),
            });
        }

        let scattered = beam
            .set_nmax(self.nmax, Truncation::default())?
            .apply_stacked_operator(&self.matrix)?
            .with_basis(Basis::Outgoing);

        ScatteredBeam::new(beam.clone(), scattered)
    }
}

/// Incident beam together with the field it scatters.
#[derive(Clone, Debug, PartialEq)]
pub struct ScatteredBeam {
    incident: Bsc,
    scattered: Bsc,
}

impl ScatteredBeam {
    pub fn new(incident: Bsc, scattered: Bsc) -> Result<Self, BscError> {
        if incident.basis() != Basis::Regular {
            return Err(BscError::Basis {
                operation: "incident part of a scattered beam",
                basis: incident.basis(),
            });
        }
        if scattered.basis() != Basis::Outgoing {
            return Err(BscError::Basis {
                operation: "scattered part of a scattered beam",
                basis: scattered.basis(),
            });
        }
        if incident.ncols() != scattered.ncols() {
            return Err(BscError::ColumnMismatch {
                left: incident.ncols(),
                right: scattered.ncols(),
            });
        }

        Ok(Self { incident, scattered })
    }

    pub fn incident(&self) -> &Bsc {
        &self.incident
    }

    pub fn scattered(&self) -> &Bsc {
        &self.scattered
    }

    /// Outgoing part of the total field, `a_inc + 2 a_sca`.
    pub fn total_outgoing(&self) -> Result<Bsc, BscError> {
        self.incident
            .clone()
            .with_basis(Basis::Outgoing)
            .checked_add(&(&self.scattered * 2.))
    }

    pub fn force_torque(&self) -> Result<Vec<ForceTorque>, BscError> {
        force_torque(&self.incident, &self.total_outgoing()?)
    }

    /// Total field, incident plus scattered, one entry per evaluated column.
    pub fn ehfield(&self, points: &[[f64; 3]]) -> Vec<EhFields> {
        let incident = self.incident.ehfield(points);
        let scattered = self.scattered.ehfield(points);

        incident.iter().zip(&scattered).map(|(i, s)| i.sum(s)).collect()
    }
}

/// Any of the beam representations, converted explicitly with [`Beam::to_bsc`].
#[derive(Clone, Debug, PartialEq)]
pub enum Beam {
    Analytic(AnalyticBeam),
    Coefficients(Bsc),
    Scattered(ScatteredBeam),
}

impl Beam {
    /// Coefficients at order `nmax`, the scattered part for scattered beams.
    pub fn to_bsc(&self, nmax: u32) -> Result<Bsc, BscError> {
        match self {
            Beam::Analytic(beam) => beam.to_bsc(nmax),
            Beam::Coefficients(beam) => beam.set_nmax(nmax, Truncation::default()),
            Beam::Scattered(beam) => beam.scattered.set_nmax(nmax, Truncation::default()),
        }
    }
}

impl From<AnalyticBeam> for Beam {
    fn from(value: AnalyticBeam) -> Self {
        Beam::Analytic(value)
    }
}

impl From<Bsc> for Beam {
    fn from(value: Bsc) -> Self {
        Beam::Coefficients(value)
    }
}

impl From<ScatteredBeam> for Beam {
    fn from(value: ScatteredBeam) -> Self {
        Beam::Scattered(value)
    }
}

impl ElectromagneticBeam for AnalyticBeam {
    fn wavenumber(&self) -> f64 {
        AnalyticBeam::wavenumber(self)
    }

    fn ehfield(&self, points: &[[f64; 3]]) -> Result<Vec<EhFields>, BscError> {
        AnalyticBeam::ehfield(self, points)
    }

    fn to_bsc(&self, nmax: u32) -> Result<Bsc, BscError> {
        AnalyticBeam::to_bsc(self, nmax)
    }
}

impl ElectromagneticBeam for Bsc {
    fn wavenumber(&self) -> f64 {
        Bsc::wavenumber(self)
    }

    fn ehfield(&self, points: &[[f64; 3]]) -> Result<Vec<EhFields>, BscError> {
        Ok(Bsc::ehfield(self, points))
    }

    fn to_bsc(&self, nmax: u32) -> Result<Bsc, BscError> {
        self.set_nmax(nmax, Truncation::default())
    }
}

impl ElectromagneticBeam for ScatteredBeam {
    fn wavenumber(&self) -> f64 {
        self.incident.wavenumber()
    }

    fn ehfield(&self, points: &[[f64; 3]]) -> Result<Vec<EhFields>, BscError> {
        Ok(ScatteredBeam::ehfield(self, points))
    }

    fn to_bsc(&self, nmax: u32) -> Result<Bsc, BscError> {
        self.scattered.set_nmax(nmax, Truncation::default())
    }
}

impl ElectromagneticBeam for Beam {
    fn wavenumber(&self) -> f64 {
        match self {
            Beam::Analytic(beam) => beam.wavenumber(),
            Beam::Coefficients(beam) => beam.wavenumber(),
            Beam::Scattered(beam) => ElectromagneticBeam::wavenumber(beam),
        }
    }

    fn ehfield(&self, points: &[[f64; 3]]) -> Result<Vec<EhFields>, BscError> {
        match self {
            Beam::Analytic(beam) => beam.ehfield(points),
            Beam::Coefficients(beam) => Ok(beam.ehfield(points)),
            Beam::Scattered(beam) => Ok(beam.ehfield(points)),
        }
    }

    fn to_bsc(&self, nmax: u32) -> Result<Bsc, BscError> {
        Beam::to_bsc(self, nmax)
    }
}
