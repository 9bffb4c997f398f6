use num::complex::Complex64;
use serde::{Deserialize, Serialize};

/// Radial dependence of vector spherical waves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basis {
    /// Spherical Bessel `jₙ`, finite at the origin.
    #[default]
    Regular,
    /// Spherical Hankel `hₙ⁽²⁾`, converging towards the origin.
    Incoming,
    /// Spherical Hankel `hₙ⁽¹⁾`, diverging from the origin.
    Outgoing,
}

/// Arguments equal to zero are replaced by this value before evaluation.
pub const ORIGIN_GUARD: f64 = 1e-15;

const RESCALE_LIMIT: f64 = 1e200;

/// Spherical bessel functions `j₀..=jₙ` at `x > 0` using Miller's downward recurrence.
pub fn spherical_bessel_j(order: u32, x: f64) -> Vec<f64> {
    let order = order as usize;
    let start =
        order + x.abs() as usize + 20 + (4. * ((order as f64).max(x.abs())).sqrt()) as usize;

    let mut values = vec![0.0; order.max(1) + 1];
    let mut upper = 0.;
    let mut current = 1e-30;

    for k in (1..=start).rev() {
        let lower = (2 * k + 1) as f64 / x * current - upper;
        upper = current;
        current = lower;

        if k - 1 < values.len() {
            values[k - 1] = current;
        }

        if current.abs() > RESCALE_LIMIT {
            current /= RESCALE_LIMIT;
            upper /= RESCALE_LIMIT;
            values.iter_mut().for_each(|v| *v /= RESCALE_LIMIT);
        }
    }

    let j0 = x.sin() / x;
    let j1 = x.sin() / (x * x) - x.cos() / x;
    let norm = if j0.abs() >= j1.abs() {
        j0 / values[0]
    } else {
        j1 / values[1]
    };

    values.truncate(order + 1);
    values.iter_mut().for_each(|v| *v *= norm);

    values
}

/// Clamps both components to `±f64::MAX`.
pub fn saturate(z: Complex64) -> Complex64 {
    Complex64::new(z.re.clamp(-f64::MAX, f64::MAX), z.im.clamp(-f64::MAX, f64::MAX))
}

/// Spherical bessel functions of the second kind `y₀..=yₙ` using upward recurrence.
/// Orders that overflow saturate at `-f64::MAX`.
pub fn spherical_bessel_y(order: u32, x: f64) -> Vec<f64> {
    let order = order as usize;
    let mut values = vec![0.0; order + 1];

    values[0] = -x.cos() / x;
    if order == 0 {
        return values;
    }
    values[1] = -x.cos() / (x * x) - x.sin() / x;

    for n in 1..order {
        let next = (2 * n + 1) as f64 / x * values[n] - values[n - 1];
        if !next.is_finite() {
            values[n + 1..].iter_mut().for_each(|v| *v = -f64::MAX);
            break;
        }
        values[n + 1] = next;
    }

    values
}

/// Radial functions `z₀..=zₙ` of a given basis at a single dimensionless radius `kr`.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialFunctions {
    pub basis: Basis,
    pub kr: f64,
    pub values: Vec<Complex64>,
}

impl RadialFunctions {
    pub fn new(basis: Basis, nmax: u32, kr: f64) -> Self {
        let kr = if kr == 0. { ORIGIN_GUARD } else { kr };
        let j = spherical_bessel_j(nmax, kr);

        let values = match basis {
            Basis::Regular => j.into_iter().map(|j| Complex64::new(j, 0.)).collect(),
            Basis::Outgoing => spherical_bessel_y(nmax, kr)
                .into_iter()
                .zip(j)
                .map(|(y, j)| Complex64::new(j, y))
                .collect(),
            Basis::Incoming => spherical_bessel_y(nmax, kr)
                .into_iter()
                .zip(j)
                .map(|(y, j)| Complex64::new(j, -y))
                .collect(),
        };

        Self { basis, kr, values }
    }

    pub fn nmax(&self) -> u32 {
        self.values.len() as u32 - 1
    }

    pub fn value(&self, n: u32) -> Complex64 {
        self.values[n as usize]
    }

    /// `dzₙ/dx = zₙ₋₁ - (n + 1) zₙ / x`
    pub fn derivative(&self, n: u32) -> Complex64 {
        assert!(n >= 1);
        let n = n as usize;
        saturate(self.values[n - 1] - (n + 1) as f64 / self.kr * self.values[n])
    }

    /// `(1/x) d(x zₙ)/dx = zₙ₋₁ - n zₙ / x`, the radial factor of the tangential part of N waves.
    pub fn riccati_derivative(&self, n: u32) -> Complex64 {
        assert!(n >= 1);
        let n = n as usize;
        saturate(self.values[n - 1] - n as f64 / self.kr * self.values[n])
    }
}
