use std::f64::consts::PI;

use gauss_quad::GaussLegendre;
use num::complex::Complex64;

use crate::mode_index::{max_linear_index, ModeIndex};

/// Returns the legendre polynomials up to order `l` at `x`.
pub fn legendre_polynomials(l: u32, x: f64) -> Vec<f64> {
    let l = l as usize;
    let mut p = vec![0.0; l + 1];

    p[0] = 1.0;
    if l == 0 {
        return p;
    }
    p[1] = x;

    for i in 2..=l {
        p[i] = ((2 * i - 1) as f64 / i as f64) * x * p[i - 1]
            - ((i - 1) as f64 / i as f64) * p[i - 2];
    }

    p
}

/// Returns the derivatives of legendre polynomials up to order `l` at `x`.
pub fn legendre_derivatives(l: u32, x: f64) -> Vec<f64> {
    let p = legendre_polynomials(l, x);
    let l = l as usize;
    let mut dp = vec![0.0; l + 1];

    if l == 0 {
        return dp;
    }
    dp[1] = 1.0;

    for i in 1..l {
        dp[i + 1] = dp[i - 1] + (2 * i + 1) as f64 * p[i];
    }

    dp
}

/// Gauss-Legendre nodes and weights on `[-1, 1]`, `None` if `points` is too small for the rule.
pub fn gauss_legendre(points: usize) -> Option<(Vec<f64>, Vec<f64>)> {
    let quad = GaussLegendre::new(points).ok()?;

    Some((quad.nodes().copied().collect(), quad.weights().copied().collect()))
}

/// Orthonormal associated legendre functions `P̄ₙᵐ(cos θ)` with the Condon-Shortley phase,
/// including the `1/sqrt(4π)` factor so that `P̄ₙᵐ e^{imφ}` is the spherical harmonic.
///
/// Alongside the values the table keeps `P̄ₙᵐ / sin θ` (for `m != 0`) and `dP̄ₙᵐ/dθ`,
/// both computed from recurrences that never divide by `sin θ`, so they stay finite at the poles.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendreTable {
    nmax: u32,
    values: Vec<f64>,
    over_sin: Vec<f64>,
    derivatives: Vec<f64>,
}

impl LegendreTable {
    pub fn new(nmax: u32, theta: f64) -> Self {
        let x = theta.cos();
        let s = theta.sin();
        let size = triangle_index(nmax, nmax) + 1;

        let mut values = vec![0.0; size];
        let mut over_sin = vec![0.0; size];
        let mut derivatives = vec![0.0; size];

        values[0] = 1. / (4. * PI).sqrt();

        for m in 1..=nmax {
            let diagonal_factor = -((2 * m + 1) as f64 / (2 * m) as f64).sqrt();
            let u = if m == 1 {
                diagonal_factor * values[0]
            } else {
                diagonal_factor * s * over_sin[triangle_index(m - 1, m - 1)]
            };

            over_sin[triangle_index(m, m)] = u;
            values[triangle_index(m, m)] = s * u;
        }

        for m in 0..nmax {
            upward_in_degree(&mut values, nmax, m, x);
            if m > 0 {
                upward_in_degree(&mut over_sin, nmax, m, x);
            }
        }

        for n in 1..=nmax {
            derivatives[triangle_index(n, 0)] =
                ((n * (n + 1)) as f64).sqrt() * values[triangle_index(n, 1)];

            for m in 1..=n {
                let lower = if n > m {
                    over_sin[triangle_index(n - 1, m)]
                } else {
                    0.
                };
                let coupling =
                    ((2 * n + 1) as f64 / (2 * n - 1) as f64 * (n * n - m * m) as f64).sqrt();

                derivatives[triangle_index(n, m)] =
                    n as f64 * x * over_sin[triangle_index(n, m)] - coupling * lower;
            }
        }

        Self {
            nmax,
            values,
            over_sin,
            derivatives,
        }
    }

    pub fn nmax(&self) -> u32 {
        self.nmax
    }

    /// `P̄ₙᵐ(cos θ)`
    pub fn value(&self, n: u32, m: i32) -> f64 {
        negative_order_sign(m) * self.values[triangle_index(n, m.unsigned_abs())]
    }

    /// `P̄ₙᵐ(cos θ) / sin θ`, zero for `m = 0`.
    pub fn over_sin(&self, n: u32, m: i32) -> f64 {
        negative_order_sign(m) * self.over_sin[triangle_index(n, m.unsigned_abs())]
    }

    /// `dP̄ₙᵐ(cos θ)/dθ`
    pub fn derivative(&self, n: u32, m: i32) -> f64 {
        negative_order_sign(m) * self.derivatives[triangle_index(n, m.unsigned_abs())]
    }
}

fn upward_in_degree(table: &mut [f64], nmax: u32, m: u32, x: f64) {
    let mut previous = 0.;
    let mut current = table[triangle_index(m, m)];

    for n in m + 1..=nmax {
        let n2 = (n * n) as f64;
        let m2 = (m * m) as f64;
        let a = ((4. * n2 - 1.) / (n2 - m2)).sqrt();
        let b = if n > m + 1 {
            let k2 = ((n - 1) * (n - 1)) as f64;
            ((k2 - m2) / (4. * k2 - 1.)).sqrt()
        } else {
            0.
        };

        let next = a * (x * current - b * previous);
        table[triangle_index(n, m)] = next;

        previous = current;
        current = next;
    }
}

fn triangle_index(n: u32, m: u32) -> usize {
    (n * (n + 1) / 2 + m) as usize
}

fn negative_order_sign(m: i32) -> f64 {
    if m < 0 && m % 2 != 0 { -1. } else { 1. }
}

/// Spherical harmonics `Y`, `∂Y/∂θ` and `(1/sin θ) ∂Y/∂φ` of a single direction
/// for all modes up to `nmax`, stored in mode storage order.
#[derive(Clone, Debug, PartialEq)]
pub struct SphericalHarmonics {
    pub nmax: u32,
    pub theta: f64,
    pub phi: f64,
    pub y: Vec<Complex64>,
    pub ytheta: Vec<Complex64>,
    pub yphi: Vec<Complex64>,
}

impl SphericalHarmonics {
    pub fn new(nmax: u32, theta: f64, phi: f64) -> Self {
        let table = LegendreTable::new(nmax, theta);
        Self::from_table(&table, theta, phi)
    }

    pub fn from_table(table: &LegendreTable, theta: f64, phi: f64) -> Self {
        let nmax = table.nmax();
        let size = max_linear_index(nmax);

        let mut y = Vec::with_capacity(size);
        let mut ytheta = Vec::with_capacity(size);
        let mut yphi = Vec::with_capacity(size);

        let phases: Vec<Complex64> = (-(nmax as i32)..=nmax as i32)
            .map(|m| Complex64::from_polar(1., m as f64 * phi))
            .collect();

        for n in 1..=nmax {
            for m in -(n as i32)..=n as i32 {
                let phase = phases[(m + nmax as i32) as usize];

                y.push(table.value(n, m) * phase);
                ytheta.push(table.derivative(n, m) * phase);
                yphi.push(Complex64::new(0., m as f64 * table.over_sin(n, m)) * phase);
            }
        }

        Self {
            nmax,
            theta,
            phi,
            y,
            ytheta,
            yphi,
        }
    }

    /// Returns `(Y, ∂Y/∂θ, (1/sin θ) ∂Y/∂φ)` for the mode.
    pub fn get(&self, mode: ModeIndex) -> (Complex64, Complex64, Complex64) {
        let row = mode.row();

        (self.y[row], self.ytheta[row], self.yphi[row])
    }
}
