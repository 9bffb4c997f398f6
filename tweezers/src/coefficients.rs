use std::collections::BTreeMap;

use faer::Mat;
use num::complex::Complex64;

/// Fraction of non zero entries above which a vector is stored densely.
const DENSE_FILL: f64 = 0.25;

/// Single column of multipole coefficients indexed by mode storage row.
///
/// Beams built from few plane waves populate only a handful of modes and are kept sparse,
/// scattered beams are typically dense.
#[derive(Clone, Debug, PartialEq)]
pub enum CoefficientVector {
    Sparse {
        len: usize,
        values: BTreeMap<usize, Complex64>,
    },
    Dense(Vec<Complex64>),
}

impl Default for CoefficientVector {
    fn default() -> Self {
        Self::zeros(0)
    }
}

impl CoefficientVector {
    pub fn zeros(len: usize) -> Self {
        Self::Sparse {
            len,
            values: BTreeMap::new(),
        }
    }

    /// Picks the storage depending on the fill of `values`.
    pub fn from_dense(values: Vec<Complex64>) -> Self {
        Self::Dense(values).compact()
    }

    pub fn from_column(mat: &Mat<Complex64>, col: usize) -> Self {
        Self::from_dense((0..mat.nrows()).map(|i| mat[(i, col)]).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Sparse { len, .. } => *len,
            Self::Dense(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse { .. })
    }

    pub fn get(&self, row: usize) -> Complex64 {
        match self {
            Self::Sparse { values, .. } => values.get(&row).copied().unwrap_or_default(),
            Self::Dense(values) => values.get(row).copied().unwrap_or_default(),
        }
    }

    pub fn set(&mut self, row: usize, value: Complex64) {
        assert!(row < self.len(), "row {row} out of bounds for length {}", self.len());

        match self {
            Self::Sparse { values, .. } => {
                if value == Complex64::ZERO {
                    values.remove(&row);
                } else {
                    values.insert(row, value);
                }
            }
            Self::Dense(values) => values[row] = value,
        }
    }

    pub fn add_at(&mut self, row: usize, value: Complex64) {
        let current = self.get(row);
        self.set(row, current + value);
    }

    pub fn iter_nonzero(&self) -> Box<dyn Iterator<Item = (usize, Complex64)> + '_> {
        match self {
            Self::Sparse { values, .. } => Box::new(values.iter().map(|(&i, &v)| (i, v))),
            Self::Dense(values) => Box::new(
                values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| **v != Complex64::ZERO)
                    .map(|(i, &v)| (i, v)),
            ),
        }
    }

    pub fn to_dense(&self) -> Vec<Complex64> {
        match self {
            Self::Sparse { len, values } => {
                let mut dense = vec![Complex64::ZERO; *len];
                for (&i, &v) in values {
                    dense[i] = v;
                }
                dense
            }
            Self::Dense(values) => values.clone(),
        }
    }

    pub fn norm_sqr(&self) -> f64 {
        self.iter_nonzero().map(|(_, v)| v.norm_sqr()).sum()
    }

    /// Truncates or zero pads to `len`.
    pub fn resized(&self, len: usize) -> Self {
        match self {
            Self::Sparse { values, .. } => Self::Sparse {
                len,
                values: values.range(..len).map(|(&i, &v)| (i, v)).collect(),
            },
            Self::Dense(values) => {
                let mut values = values.clone();
                values.resize(len, Complex64::ZERO);
                Self::Dense(values)
            }
        }
    }

    pub fn scaled(&self, factor: Complex64) -> Self {
        match self {
            Self::Sparse { len, values } => Self::Sparse {
                len: *len,
                values: values
                    .iter()
                    .map(|(&i, &v)| (i, factor * v))
                    .filter(|(_, v)| *v != Complex64::ZERO)
                    .collect(),
            },
            Self::Dense(values) => Self::Dense(values.iter().map(|v| factor * v).collect()),
        }
    }

    /// Element wise sum, the shorter vector is zero padded.
    pub fn sum(&self, other: &Self) -> Self {
        let len = self.len().max(other.len());
        let mut result = self.resized(len);

        for (i, v) in other.iter_nonzero() {
            result.add_at(i, v);
        }

        result.compact()
    }

    /// Left multiplication by an operator with `self.len()` columns.
    pub fn transformed(&self, operator: &Mat<Complex64>) -> Self {
        assert_eq!(operator.ncols(), self.len());
        let mut result = vec![Complex64::ZERO; operator.nrows()];

        for (j, v) in self.iter_nonzero() {
            for (i, r) in result.iter_mut().enumerate() {
                *r += operator[(i, j)] * v;
            }
        }

        Self::from_dense(result)
    }

    /// Switches to the storage better suited for the current fill.
    pub fn compact(self) -> Self {
        let len = self.len();
        let nonzero = self.iter_nonzero().count();

        if len > 0 && nonzero as f64 / len as f64 > DENSE_FILL {
            match self {
                Self::Dense(_) => self,
                sparse => Self::Dense(sparse.to_dense()),
            }
        } else {
            match self {
                Self::Sparse { .. } => self,
                Self::Dense(values) => Self::Sparse {
                    len,
                    values: values
                        .into_iter()
                        .enumerate()
                        .filter(|(_, v)| *v != Complex64::ZERO)
                        .collect(),
                },
            }
        }
    }
}
