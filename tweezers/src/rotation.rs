use faer::Mat;
use multipole::mode_index::{max_linear_index, ModeIndex};
use num::complex::Complex64;

use crate::coefficients::CoefficientVector;

/// Cartesian rotation matrix acting on column vectors.
pub type Rotation = [[f64; 3]; 3];

/// Squared Frobenius distance from the identity below which a rotation is treated as
/// exact identity.
const IDENTITY_TOLERANCE: f64 = 1e-6;

pub fn identity_rotation() -> Rotation {
    [[1., 0., 0.], [0., 1., 0.], [0., 0., 1.]]
}

pub fn rotation_x(angle: f64) -> Rotation {
    let (s, c) = angle.sin_cos();
    [[1., 0., 0.], [0., c, -s], [0., s, c]]
}

pub fn rotation_y(angle: f64) -> Rotation {
    let (s, c) = angle.sin_cos();
    [[c, 0., s], [0., 1., 0.], [-s, 0., c]]
}

pub fn rotation_z(angle: f64) -> Rotation {
    let (s, c) = angle.sin_cos();
    [[c, -s, 0.], [s, c, 0.], [0., 0., 1.]]
}

pub fn matmul3(a: &Rotation, b: &Rotation) -> Rotation {
    let mut result = [[0.; 3]; 3];
    for (i, row) in result.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }

    result
}

pub fn rotate_vector(rotation: &Rotation, vector: [f64; 3]) -> [f64; 3] {
    let mut result = [0.; 3];
    for (i, value) in result.iter_mut().enumerate() {
        *value = (0..3).map(|k| rotation[i][k] * vector[k]).sum();
    }

    result
}

fn is_identity(rotation: &Rotation) -> bool {
    let identity = identity_rotation();
    let distance: f64 = (0..3)
        .flat_map(|i| (0..3).map(move |j| (i, j)))
        .map(|(i, j)| (identity[i][j] - rotation[i][j]).powi(2))
        .sum();

    distance < IDENTITY_TOLERANCE
}

/// Spherical basis vector `e_μ` for `μ = -1, 0, 1`.
fn spherical_basis(mu: i32) -> [Complex64; 3] {
    let s = std::f64::consts::FRAC_1_SQRT_2;
    match mu {
        -1 => [Complex64::new(s, 0.), Complex64::new(0., -s), Complex64::ZERO],
        0 => [Complex64::ZERO, Complex64::ZERO, Complex64::ONE],
        _ => [Complex64::new(-s, 0.), Complex64::new(0., -s), Complex64::ZERO],
    }
}

/// Clebsch-Gordan coefficient `<n-1, m-μ; 1, μ | n, m>`.
fn coupling(n: u32, m: i32, mu: i32) -> f64 {
    let n = n as f64;
    let m = m as f64;

    let value = match mu {
        1 => (n + m - 1.) * (n + m) / ((2. * n - 1.) * 2. * n),
        0 => (n - m) * (n + m) / ((2. * n - 1.) * n),
        _ => (n - m - 1.) * (n - m) / ((2. * n - 1.) * 2. * n),
    };

    value.max(0.).sqrt()
}

/// Wigner D matrix of a rotation in the multipole basis.
///
/// Rotations preserve the degree, so the matrix is stored as one `(2n+1)x(2n+1)` block per degree,
/// indexed by `(m' + n, m + n)`. Rotating a beam maps `a -> D a` and `b -> D b`.
#[derive(Clone, Debug, PartialEq)]
pub struct WignerMatrix {
    blocks: Vec<Mat<Complex64>>,
}

impl WignerMatrix {
    pub fn identity(nmax: u32) -> Self {
        let blocks = (1..=nmax)
            .map(|n| {
                let size = 2 * n as usize + 1;
                Mat::identity(size, size)
            })
            .collect();

        Self { blocks }
    }

    /// Builds the matrix up to `nmax` by coupling lower degrees with the degree 1 block,
    /// which is the rotation itself written in the spherical basis.
    pub fn new(nmax: u32, rotation: &Rotation) -> Self {
        if is_identity(rotation) {
            return Self::identity(nmax);
        }
        if nmax == 0 {
            return Self { blocks: Vec::new() };
        }

        let first = Mat::from_fn(3, 3, |i, j| {
            let out = spherical_basis(i as i32 - 1);
            let input = spherical_basis(j as i32 - 1);

            let mut value = Complex64::ZERO;
            for (k, row) in rotation.iter().enumerate() {
                for (l, r) in row.iter().enumerate() {
                    value += out[k].conj() * *r * input[l];
                }
            }
            value
        });

        let mut blocks = Vec::with_capacity(nmax as usize);
        blocks.push(first);

        for n in 2..=nmax {
            let previous = &blocks[n as usize - 2];
            let first = &blocks[0];
            let ni = n as i32;
            let size = 2 * n as usize + 1;

            let block = Mat::from_fn(size, size, |i, j| {
                let m_out = i as i32 - ni;
                let m_in = j as i32 - ni;

                let mut value = Complex64::ZERO;
                for mu_out in -1..=1 {
                    let p_out = m_out - mu_out;
                    if p_out.abs() > ni - 1 {
                        continue;
                    }
                    let c_out = coupling(n, m_out, mu_out);

                    for mu_in in -1..=1 {
                        let p_in = m_in - mu_in;
                        if p_in.abs() > ni - 1 {
                            continue;
                        }
                        let c_in = coupling(n, m_in, mu_in);

                        value += c_out
                            * c_in
                            * previous[((p_out + ni - 1) as usize, (p_in + ni - 1) as usize)]
                            * first[((mu_out + 1) as usize, (mu_in + 1) as usize)];
                    }
                }
                value
            });

            blocks.push(block);
        }

        Self { blocks }
    }

    pub fn nmax(&self) -> u32 {
        self.blocks.len() as u32
    }

    pub fn block(&self, n: u32) -> &Mat<Complex64> {
        &self.blocks[n as usize - 1]
    }

    pub fn get(&self, n: u32, m_out: i32, m_in: i32) -> Complex64 {
        let n_i = n as i32;
        self.block(n)[((m_out + n_i) as usize, (m_in + n_i) as usize)]
    }

    /// Inverse rotation, the conjugate transpose of each block.
    pub fn adjoint(&self) -> Self {
        let blocks = self
            .blocks
            .iter()
            .map(|block| Mat::from_fn(block.nrows(), block.ncols(), |i, j| block[(j, i)].conj()))
            .collect();

        Self { blocks }
    }

    pub fn truncated(&self, nmax: u32) -> Self {
        Self {
            blocks: self.blocks.iter().take(nmax as usize).cloned().collect(),
        }
    }

    /// Rotation `self` applied after `first`.
    pub fn compose(&self, first: &Self) -> Self {
        let blocks = self
            .blocks
            .iter()
            .zip(&first.blocks)
            .map(|(second, first)| second * first)
            .collect();

        Self { blocks }
    }

    /// Matrix over the full mode storage order.
    pub fn to_dense(&self) -> Mat<Complex64> {
        let size = max_linear_index(self.nmax());
        let mut dense = Mat::zeros(size, size);

        for (k, block) in self.blocks.iter().enumerate() {
            let n = k as u32 + 1;
            let offset = ModeIndex::new(n, -(n as i32)).row();
            for i in 0..block.nrows() {
                for j in 0..block.ncols() {
                    dense[(offset + i, offset + j)] = block[(i, j)];
                }
            }
        }

        dense
    }

    /// Applies the rotation to a coefficient vector of length `nmax(nmax + 2)` of this matrix.
    pub fn apply(&self, vector: &CoefficientVector) -> CoefficientVector {
        assert_eq!(vector.len(), max_linear_index(self.nmax()));
        let mut result = vec![Complex64::ZERO; vector.len()];

        for (row, value) in vector.iter_nonzero() {
            let mode = ModeIndex::from_row(row);
            let n = mode.n as i32;
            let block = self.block(mode.n);
            let offset = row - (mode.m + n) as usize;

            for i in 0..block.nrows() {
                result[offset + i] += block[(i, (mode.m + n) as usize)] * value;
            }
        }

        CoefficientVector::from_dense(result)
    }
}
