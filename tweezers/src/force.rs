use std::ops::Add;

use multipole::{
    mode_index::{ModeIndex, modes},
    radial::Basis,
};
use num::complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::{
    beams::Scatterer,
    bsc::{ArrayType, Bsc},
    coefficients::CoefficientVector,
    error::BscError,
};

/// Mechanical effect of a beam on a particle.
///
/// Force is in units of `n P / c`, torque and spin in units of `P / ω`,
/// with `P` the power of the beam coefficients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceTorque {
    pub force: [f64; 3],
    pub torque: [f64; 3],
    pub spin: [f64; 3],
}

impl Add for ForceTorque {
    type Output = ForceTorque;

    fn add(self, rhs: Self) -> Self::Output {
        let sum = |u: [f64; 3], v: [f64; 3]| [u[0] + v[0], u[1] + v[1], u[2] + v[2]];

        ForceTorque {
            force: sum(self.force, rhs.force),
            torque: sum(self.torque, rhs.torque),
            spin: sum(self.spin, rhs.spin),
        }
    }
}

/// Force, torque and spin transfer from the incident coefficients `ibeam` (regular or incoming)
/// and the outgoing coefficients `sbeam` of the total field.
///
/// Coherent incident beams are summed over columns, incoherent ones give the sum of the
/// per column results, beam arrays give one result per column.
pub fn force_torque(ibeam: &Bsc, sbeam: &Bsc) -> Result<Vec<ForceTorque>, BscError> {
    if ibeam.basis() == Basis::Outgoing {
        return Err(BscError::Basis {
            operation: "incident beam of a force calculation",
            basis: Basis::Outgoing,
        });
    }
    if sbeam.basis() != Basis::Outgoing {
        return Err(BscError::Basis {
            operation: "scattered beam of a force calculation",
            basis: sbeam.basis(),
        });
    }

    let nmax = ibeam.nmax().max(sbeam.nmax());
    let (ibeam, sbeam) = match ibeam.array_type() {
        ArrayType::Coherent => (
            ibeam.sum_columns().resized(nmax),
            sbeam.sum_columns().resized(nmax),
        ),
        ArrayType::Array | ArrayType::Incoherent => (ibeam.resized(nmax), sbeam.resized(nmax)),
    };

    let columns = match (ibeam.ncols(), sbeam.ncols()) {
        (left, right) if left == right => left,
        (1, right) => right,
        (left, 1) => left,
        (left, right) => return Err(BscError::ColumnMismatch { left, right }),
    };
    let pick = |beam: &Bsc, j: usize| if beam.ncols() == 1 { 0 } else { j };

    let results: Vec<ForceTorque> = (0..columns)
        .map(|j| {
            let (i, s) = (pick(&ibeam, j), pick(&sbeam, j));
            OverlapColumns::new(nmax, &ibeam.a()[i], &ibeam.b()[i], &sbeam.a()[s], &sbeam.b()[s])
                .force_torque()
        })
        .collect();

    match ibeam.array_type() {
        ArrayType::Incoherent => {
            let total = results
                .into_iter()
                .fold(ForceTorque::default(), |acc, x| acc + x);
            Ok(vec![total])
        }
        ArrayType::Array | ArrayType::Coherent => Ok(results),
    }
}

/// Scatters `beam` on `particle` and computes the resulting force, torque and spin.
pub fn force_torque_on(
    particle: &impl Scatterer,
    beam: &Bsc,
) -> Result<Vec<ForceTorque>, BscError> {
    particle.scatter(beam)?.force_torque()
}

/// Dense incident `(a, b)` and outgoing `(p, q)` coefficients of one column,
/// with `b` and `q` already multiplied by `i`.
struct OverlapColumns {
    nmax: u32,
    a: Vec<Complex64>,
    b: Vec<Complex64>,
    p: Vec<Complex64>,
    q: Vec<Complex64>,
}

#[derive(Clone, Copy)]
struct Modes {
    a: Complex64,
    b: Complex64,
    p: Complex64,
    q: Complex64,
}

impl OverlapColumns {
    fn new(
        nmax: u32,
        a: &CoefficientVector,
        b: &CoefficientVector,
        p: &CoefficientVector,
        q: &CoefficientVector,
    ) -> Self {
        let times_i = |v: &CoefficientVector| -> Vec<Complex64> {
            v.to_dense().into_iter().map(|x| Complex64::I * x).collect()
        };

        Self {
            nmax,
            a: a.to_dense(),
            b: times_i(b),
            p: p.to_dense(),
            q: times_i(q),
        }
    }

    /// Coefficients of the mode shifted by `(dn, dm)`, zero outside of the stored modes.
    fn at(&self, mode: ModeIndex, dn: i32, dm: i32) -> Modes {
        match mode.shifted(dn, dm, self.nmax) {
            Some(shifted) => {
                let row = shifted.row();
                Modes {
                    a: self.a[row],
                    b: self.b[row],
                    p: self.p[row],
                    q: self.q[row],
                }
            }
            None => Modes {
                a: Complex64::ZERO,
                b: Complex64::ZERO,
                p: Complex64::ZERO,
                q: Complex64::ZERO,
            },
        }
    }

    fn force_torque(&self) -> ForceTorque {
        let mut fz = 0.;
        let mut fxy = Complex64::ZERO;
        let mut tz = 0.;
        let mut txy = Complex64::ZERO;
        let mut sz = 0.;
        let mut sxy = Complex64::ZERO;

        for mode in modes(self.nmax) {
            let n = mode.n as f64;
            let m = mode.m as f64;

            let c = self.at(mode, 0, 0);
            let up = self.at(mode, 1, 0);
            let right = self.at(mode, 0, 1);
            let up_right = self.at(mode, 1, 1);
            let up_left = self.at(mode, 1, -1);

            let degree = n * (n + 1.);
            let axial = (n * (n - m + 1.) * (n + m + 1.) * (n + 2.)
                / ((2. * n + 3.) * (2. * n + 1.)))
                .sqrt();
            let ladder = ((n - m) * (n + m + 1.)).sqrt();
            let diagonal = (n * (n + 2.)).sqrt() / ((2. * n + 1.) * (2. * n + 3.)).sqrt();
            let raising = ((n + m + 1.) * (n + m + 2.)).sqrt();
            let lowering = ((n - m + 1.) * (n - m + 2.)).sqrt();

            // force
            let az = m / degree * (-c.a * c.b.conj() + c.q.conj() * c.p).im;
            let bz = axial / (n + 1.)
                * (up.a * c.a.conj() + up.b * c.b.conj()
                    - up.p * c.p.conj()
                    - up.q * c.q.conj())
                .im;
            fz += 2. * (az + bz);

            let axy = Complex64::I * ladder / degree
                * (right.p.conj() * c.q - right.a.conj() * c.b - right.q.conj() * c.p
                    + right.b.conj() * c.a);
            let bxy = Complex64::I * diagonal / (n + 1.)
                * (raising
                    * (c.p * up_right.p.conj() + c.q * up_right.q.conj()
                        - c.a * up_right.a.conj()
                        - c.b * up_right.b.conj())
                    + lowering
                        * (up_left.p * c.p.conj() + up_left.q * c.q.conj()
                            - up_left.a * c.a.conj()
                            - up_left.b * c.b.conj()));
            fxy += axy + bxy;

            // torque
            let absorbed = c.a.norm_sqr() + c.b.norm_sqr() - c.p.norm_sqr() - c.q.norm_sqr();
            let ladder_overlap = c.a * right.a.conj() + c.b * right.b.conj()
                - c.p * right.p.conj()
                - c.q * right.q.conj();
            tz += m * absorbed;
            txy += ladder * ladder_overlap;

            // spin
            let cz = m / degree * absorbed;
            let dz = 2. / (n + 1.)
                * axial
                * (up.a * c.b.conj() - up.b * c.a.conj() - up.p * c.q.conj()
                    + up.q * c.p.conj())
                .re;
            sz += cz + dz;

            let cxy = ladder / degree * ladder_overlap;
            let dxy = -diagonal / (n + 1.)
                * (raising
                    * (c.p * up_right.q.conj() - c.q * up_right.p.conj() - c.a * up_right.b.conj()
                        + c.b * up_right.a.conj())
                    + lowering
                        * (up_left.p * c.q.conj() - up_left.q * c.p.conj() - up_left.a * c.b.conj()
                            + up_left.b * c.a.conj()));
            sxy += cxy + dxy;
        }

        ForceTorque {
            force: [fxy.re, fxy.im, fz],
            torque: [txy.re, txy.im, tz],
            spin: [sxy.re, sxy.im, sz],
        }
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    use approx::assert_relative_eq;
    use multipole::radial::Basis;
    use num::complex::Complex64;

    use crate::{
        beams::AnalyticBeam,
        bsc::{ArrayType, Bsc},
        error::BscError,
        fields::test::random_beam,
        rotation::rotation_y,
    };

    use super::force_torque;

    fn plane_wave(direction: [f64; 3], polarisation: [Complex64; 3], nmax: u32) -> Bsc {
        AnalyticBeam::PlaneWave {
            direction,
            polarisation,
            wavenumber: 1.,
        }
        .to_bsc(nmax)
        .unwrap()
    }

    fn real(polarisation: [f64; 3]) -> [Complex64; 3] {
        polarisation.map(|p| Complex64::new(p, 0.))
    }

    fn circular() -> [Complex64; 3] {
        [
            Complex64::new(FRAC_1_SQRT_2, 0.),
            Complex64::new(0., FRAC_1_SQRT_2),
            Complex64::ZERO,
        ]
    }

    fn absorbed(beam: &Bsc) -> Bsc {
        Bsc::zeros(beam.nmax(), beam.ncols(), Basis::Outgoing, beam.wavenumber())
    }

    /// Axial force on a perfect absorber of a truncated plane wave.
    fn absorbed_force(nmax: u32) -> f64 {
        let first: f64 = (1..=nmax)
            .map(|n| 4. * PI * (2 * n + 1) as f64 / (n * (n + 1)) as f64)
            .sum();
        let second: f64 = (1..nmax)
            .map(|n| 8. * PI * (n * (n + 2)) as f64 / (n + 1) as f64)
            .sum();

        first + second
    }

    #[test]
    fn test_absorbed_plane_wave() {
        let nmax = 6;
        let beam = plane_wave([0., 0., 1.], real([1., 0., 0.]), nmax);
        let power = beam.power();
        assert_relative_eq!(power, 4. * PI * 48., max_relative = 1e-12);

        let result = force_torque(&beam, &absorbed(&beam)).unwrap();
        assert_eq!(result.len(), 1);
        let result = result[0];

        assert_relative_eq!(result.force[2], absorbed_force(nmax), max_relative = 1e-10);
        assert_relative_eq!(result.force[2] / power, 6. / 7., max_relative = 1e-10);
        for k in 0..2 {
            assert!(result.force[k].abs() < 1e-10 * power);
        }
        for k in 0..3 {
            assert!(result.torque[k].abs() < 1e-10 * power);
            assert!(result.spin[k].abs() < 1e-10 * power);
        }
    }

    #[test]
    fn test_absorbed_circular_wave() {
        let beam = plane_wave([0., 0., 1.], circular(), 8);
        let power = beam.power();

        let result = force_torque(&beam, &absorbed(&beam)).unwrap()[0];

        assert_relative_eq!(result.torque[2], power, max_relative = 1e-10);
        assert_relative_eq!(result.spin[2], result.force[2], max_relative = 1e-10);
        assert!(result.torque[0].abs() < 1e-10 * power);
        assert!(result.spin[1].abs() < 1e-10 * power);
    }

    #[test]
    fn test_transverse_directions() {
        let nmax = 5;
        let along_z = plane_wave([0., 0., 1.], circular(), nmax);
        let reference = force_torque(&along_z, &absorbed(&along_z)).unwrap()[0];

        let along_x = along_z.rotate(&rotation_y(PI / 2.));
        let result = force_torque(&along_x, &absorbed(&along_x)).unwrap()[0];

        assert_relative_eq!(result.force[0], reference.force[2], max_relative = 1e-10);
        assert_relative_eq!(result.torque[0], reference.torque[2], max_relative = 1e-10);
        assert_relative_eq!(result.spin[0], reference.spin[2], max_relative = 1e-10);
        assert!(result.force[2].abs() < 1e-10 * reference.force[2]);

        let along_y = plane_wave([0., 1., 0.], real([0., 0., 1.]), nmax);
        let result = force_torque(&along_y, &absorbed(&along_y)).unwrap()[0];
        assert_relative_eq!(result.force[1], absorbed_force(nmax), max_relative = 1e-10);
        assert!(result.force[0].abs() < 1e-10 * result.force[1]);
    }

    #[test]
    fn test_no_scatterer() {
        let beam = random_beam(5, 1, Basis::Regular, 1.);
        let unscattered = beam.clone().with_basis(Basis::Outgoing);

        let result = force_torque(&beam, &unscattered).unwrap()[0];
        for value in result.force.iter().chain(&result.torque).chain(&result.spin) {
            assert!(value.abs() < 1e-12);
        }
    }

    #[test]
    fn test_basis_checks() {
        let beam = random_beam(2, 1, Basis::Regular, 1.);

        assert!(matches!(force_torque(&beam, &beam), Err(BscError::Basis { .. })));
        let outgoing = beam.clone().with_basis(Basis::Outgoing);
        assert!(matches!(force_torque(&outgoing, &outgoing), Err(BscError::Basis { .. })));

        let incoming = beam.clone().with_basis(Basis::Incoming);
        assert!(force_torque(&incoming, &outgoing).is_ok());
    }

    #[test]
    fn test_column_handling() {
        let first = plane_wave([0., 0., 1.], real([1., 0., 0.]), 4);
        let second = plane_wave([1., 0., 0.], real([0., 1., 0.]), 3);
        let array = first.append(&second).unwrap();
        let scattered = absorbed(&array);

        let separate = force_torque(&array, &scattered).unwrap();
        assert_eq!(separate.len(), 2);
        assert_eq!(separate[0], force_torque(&first, &absorbed(&first)).unwrap()[0]);

        let incoherent = array.clone().with_array_type(ArrayType::Incoherent);
        let summed = force_torque(&incoherent, &scattered).unwrap();
        assert_eq!(summed.len(), 1);
        assert_relative_eq!(summed[0].force[2], separate[0].force[2] + separate[1].force[2]);

        let coherent = array.clone().with_array_type(ArrayType::Coherent);
        assert_eq!(force_torque(&coherent, &scattered).unwrap().len(), 1);

        let broadcast = force_torque(&array, &absorbed(&first)).unwrap();
        assert_eq!(broadcast.len(), 2);

        let triple = array.append(&first).unwrap();
        assert_eq!(
            force_torque(&triple, &scattered),
            Err(BscError::ColumnMismatch { left: 3, right: 2 })
        );
    }
}
