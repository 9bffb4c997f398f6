use std::{
    ops::{Mul, Neg},
    sync::OnceLock,
};

use faer::{Mat, Par};
use multipole::{
    mode_index::{max_linear_index, nmax_from_len},
    radial::Basis,
    utility::{cartesian_to_spherical, nmax2ka},
};
use num::complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::{
    coefficients::CoefficientVector,
    error::{AccuracyWarning, BscError},
    rotation::{Rotation, WignerMatrix, matmul3, rotation_y, rotation_z},
    translation::TranslationMatrices,
};

/// How the columns of a beam combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayType {
    /// Independent beams, one result per column.
    #[default]
    Array,
    /// Columns are summed before evaluation.
    Coherent,
    /// Columns are evaluated separately and the results summed.
    Incoherent,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruncationPolicy {
    Ignore,
    #[default]
    Warn,
    Error,
}

/// Response to power lost when lowering the truncation order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Truncation {
    pub policy: TruncationPolicy,
    /// Relative power loss tolerated silently.
    pub tolerance: f64,
}

impl Default for Truncation {
    fn default() -> Self {
        Self {
            policy: TruncationPolicy::Warn,
            tolerance: 1e-6,
        }
    }
}

impl Truncation {
    pub fn ignore() -> Self {
        Self {
            policy: TruncationPolicy::Ignore,
            ..Default::default()
        }
    }

    pub fn warn(tolerance: f64) -> Self {
        Self {
            policy: TruncationPolicy::Warn,
            tolerance,
        }
    }

    pub fn error(tolerance: f64) -> Self {
        Self {
            policy: TruncationPolicy::Error,
            tolerance,
        }
    }
}

/// Beam shape coefficients of one or more beams sharing a basis.
///
/// Each column holds the `a` (TE) and `b` (TM) coefficients of one beam in mode storage order.
/// Operations return new beams, the only in place modification is [`Bsc::set_coefficients`].
///
/// The wavenumber is that of the surrounding medium. Distances passed to translations and
/// field evaluation must be given in the same units as its inverse.
#[derive(Clone, Debug, PartialEq)]
pub struct Bsc {
    a: Vec<CoefficientVector>,
    b: Vec<CoefficientVector>,
    basis: Basis,
    array_type: ArrayType,
    wavenumber: f64,
    absdz: f64,
}

fn validate_columns(a: &[CoefficientVector], b: &[CoefficientVector]) -> Result<(), BscError> {
    let a_rows = a.first().map_or(0, |c| c.len());
    let b_rows = b.first().map_or(0, |c| c.len());

    let consistent = a.iter().all(|c| c.len() == a_rows) && b.iter().all(|c| c.len() == b_rows);
    if !consistent || a.len() != b.len() || a_rows != b_rows {
        return Err(BscError::ShapeMismatch {
            a_rows,
            a_cols: a.len(),
            b_rows,
            b_cols: b.len(),
        });
    }

    if a_rows != 0 && nmax_from_len(a_rows).is_none() {
        return Err(BscError::InvalidOrder(a_rows));
    }

    Ok(())
}

fn columns_of(mat: &Mat<Complex64>) -> Vec<CoefficientVector> {
    (0..mat.ncols()).map(|j| CoefficientVector::from_column(mat, j)).collect()
}

impl Bsc {
    pub fn new(
        a: &Mat<Complex64>,
        b: &Mat<Complex64>,
        basis: Basis,
        wavenumber: f64,
    ) -> Result<Self, BscError> {
        if a.nrows() != b.nrows() || a.ncols() != b.ncols() {
            return Err(BscError::ShapeMismatch {
                a_rows: a.nrows(),
                a_cols: a.ncols(),
                b_rows: b.nrows(),
                b_cols: b.ncols(),
            });
        }

        Self::from_columns(columns_of(a), columns_of(b), basis, wavenumber)
    }

    pub fn from_columns(
        a: Vec<CoefficientVector>,
        b: Vec<CoefficientVector>,
        basis: Basis,
        wavenumber: f64,
    ) -> Result<Self, BscError> {
        validate_columns(&a, &b)?;

        Ok(Self {
            a,
            b,
            basis,
            array_type: ArrayType::default(),
            wavenumber,
            absdz: 0.,
        })
    }

    pub fn zeros(nmax: u32, columns: usize, basis: Basis, wavenumber: f64) -> Self {
        let column = CoefficientVector::zeros(max_linear_index(nmax));

        Self {
            a: vec![column.clone(); columns],
            b: vec![column; columns],
            basis,
            array_type: ArrayType::default(),
            wavenumber,
            absdz: 0.,
        }
    }

    /// Shared beam without columns, the neutral element of addition.
    pub fn empty() -> &'static Bsc {
        static EMPTY: OnceLock<Bsc> = OnceLock::new();

        EMPTY.get_or_init(|| Bsc::zeros(0, 0, Basis::Regular, 1.))
    }

    /// Replaces the coefficients, leaving the beam untouched on error.
    pub fn set_coefficients(
        &mut self,
        a: &Mat<Complex64>,
        b: &Mat<Complex64>,
    ) -> Result<(), BscError> {
        let replaced = Self::new(a, b, self.basis, self.wavenumber)?;
        self.a = replaced.a;
        self.b = replaced.b;

        Ok(())
    }

    pub fn a(&self) -> &[CoefficientVector] {
        &self.a
    }

    pub fn b(&self) -> &[CoefficientVector] {
        &self.b
    }

    pub fn a_mat(&self) -> Mat<Complex64> {
        Mat::from_fn(self.rows(), self.ncols(), |i, j| self.a[j].get(i))
    }

    pub fn b_mat(&self) -> Mat<Complex64> {
        Mat::from_fn(self.rows(), self.ncols(), |i, j| self.b[j].get(i))
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn array_type(&self) -> ArrayType {
        self.array_type
    }

    pub fn wavenumber(&self) -> f64 {
        self.wavenumber
    }

    /// Cumulative distance the beam was translated by since construction.
    pub fn absdz(&self) -> f64 {
        self.absdz
    }

    pub fn nmax(&self) -> u32 {
        nmax_from_len(self.rows()).unwrap_or(0)
    }

    pub fn rows(&self) -> usize {
        self.a.first().map_or(0, |c| c.len())
    }

    pub fn ncols(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ncols() == 0
    }

    pub fn with_array_type(mut self, array_type: ArrayType) -> Self {
        self.array_type = array_type;
        self
    }

    /// Relabels the basis without touching the coefficients.
    pub fn with_basis(mut self, basis: Basis) -> Self {
        self.basis = basis;
        self
    }

    pub fn column(&self, j: usize) -> Bsc {
        self.with_columns(vec![self.a[j].clone()], vec![self.b[j].clone()])
    }

    fn with_columns(&self, a: Vec<CoefficientVector>, b: Vec<CoefficientVector>) -> Bsc {
        Bsc {
            a,
            b,
            basis: self.basis,
            array_type: self.array_type,
            wavenumber: self.wavenumber,
            absdz: self.absdz,
        }
    }

    /// Total power `Σ|a|² + |b|²` of all columns.
    pub fn power(&self) -> f64 {
        self.a.iter().chain(&self.b).map(|c| c.norm_sqr()).sum()
    }

    pub fn scale_power(&self, target: f64) -> Bsc {
        let power = self.power();
        if power == 0. {
            return self.clone();
        }

        self * (target / power).sqrt()
    }

    /// Zero pads or truncates without any power check.
    pub(crate) fn resized(&self, nmax: u32) -> Bsc {
        let len = max_linear_index(nmax);

        self.with_columns(
            self.a.iter().map(|c| c.resized(len)).collect(),
            self.b.iter().map(|c| c.resized(len)).collect(),
        )
    }

    /// Changes the truncation order, checking the power lost when `nmax` decreases.
    pub fn set_nmax(&self, nmax: u32, truncation: Truncation) -> Result<Bsc, BscError> {
        let resized = self.resized(nmax);
        if nmax >= self.nmax() || truncation.policy == TruncationPolicy::Ignore {
            return Ok(resized);
        }

        let relative_loss = |old: &[CoefficientVector], new: &[CoefficientVector]| {
            let old: f64 = old.iter().map(|c| c.norm_sqr()).sum();
            let new: f64 = new.iter().map(|c| c.norm_sqr()).sum();

            if old == 0. { 0. } else { (old - new).abs() / old }
        };
        let loss_a = relative_loss(&self.a, &resized.a);
        let loss_b = relative_loss(&self.b, &resized.b);

        if loss_a > truncation.tolerance || loss_b > truncation.tolerance {
            match truncation.policy {
                TruncationPolicy::Error => {
                    return Err(BscError::Truncation {
                        nmax,
                        loss: loss_a.max(loss_b),
                        tolerance: truncation.tolerance,
                    });
                }
                TruncationPolicy::Warn => {
                    AccuracyWarning::PowerLoss { nmax, loss_a, loss_b }.emit()
                }
                TruncationPolicy::Ignore => (),
            }
        }

        Ok(resized)
    }

    /// Re-expands the beam about the point `d ẑ`, keeping the truncation order.
    pub fn translate_z(&self, d: f64) -> Result<Bsc, BscError> {
        self.translate_z_with(d, self.nmax(), Par::Seq)
    }

    pub fn translate_z_with(&self, d: f64, nmax_out: u32, par: Par) -> Result<Bsc, BscError> {
        let matrices = self.translate_z_matrices(d, nmax_out, par)?;

        self.apply_translation(&matrices)
    }

    /// Translation matrices for this beam, to be reused with [`Bsc::apply_translation`].
    pub fn translate_z_matrices(
        &self,
        d: f64,
        nmax_out: u32,
        par: Par,
    ) -> Result<TranslationMatrices, BscError> {
        TranslationMatrices::along_z(self.basis, self.wavenumber * d, self.nmax(), nmax_out, par)
    }

    pub fn apply_translation(&self, matrices: &TranslationMatrices) -> Result<Bsc, BscError> {
        let mut a = Vec::with_capacity(self.ncols());
        let mut b = Vec::with_capacity(self.ncols());
        for (col_a, col_b) in self.a.iter().zip(&self.b) {
            let (new_a, new_b) = matrices.apply(col_a, col_b)?;
            a.push(new_a);
            b.push(new_b);
        }

        let absdz = self.absdz + matrices.kd().abs() / self.wavenumber;
        let radius = nmax2ka(self.nmax()) / self.wavenumber;
        if absdz > radius {
            AccuracyWarning::OutsideValidRegion { absdz, radius }.emit();
        }

        Ok(Bsc {
            a,
            b,
            basis: matrices.basis(),
            array_type: self.array_type,
            wavenumber: self.wavenumber,
            absdz,
        })
    }

    /// Re-expands the beam about the cartesian point `[x, y, z]`.
    pub fn translate_xyz(&self, point: [f64; 3]) -> Result<Bsc, BscError> {
        self.translate_rtp(cartesian_to_spherical(point))
    }

    /// Re-expands the beam about the point with spherical coordinates `[r, θ, φ]`
    /// by rotating it onto the z axis, translating, and rotating back.
    pub fn translate_rtp(&self, point: [f64; 3]) -> Result<Bsc, BscError> {
        let [r, theta, phi] = point;
        if r == 0. {
            return Ok(self.clone());
        }
        if theta.sin().abs() < 1e-12 {
            return self.translate_z(r * theta.cos().signum());
        }

        let rotation = matmul3(&rotation_y(-theta), &rotation_z(-phi));
        let wigner = WignerMatrix::new(self.nmax(), &rotation);

        self.rotate_wigner(&wigner)?
            .translate_z(r)?
            .rotate_wigner(&wigner.adjoint())
    }

    /// Beam array of a single beam translated to each of `points`.
    pub fn translate_many(&self, points: &[[f64; 3]]) -> Result<Bsc, BscError> {
        self.multi_output(points.len(), |j| self.translate_xyz(points[j]))
    }

    fn multi_output(
        &self,
        outputs: usize,
        f: impl Fn(usize) -> Result<Bsc, BscError>,
    ) -> Result<Bsc, BscError> {
        if outputs == 0 || (outputs > 1 && self.ncols() > 1) {
            return Err(BscError::UnsupportedMultiOutput {
                columns: self.ncols(),
                outputs,
            });
        }

        let mut result = f(0)?;
        for j in 1..outputs {
            result = result.append(&f(j)?)?;
        }

        if outputs > 1 {
            result.array_type = ArrayType::Array;
        }
        Ok(result)
    }

    pub fn rotate(&self, rotation: &Rotation) -> Bsc {
        let wigner = WignerMatrix::new(self.nmax(), rotation);

        self.rotate_exact(&wigner)
    }

    /// Rotates by a precomputed Wigner matrix. A matrix covering fewer degrees than the beam
    /// truncates the beam to its order first.
    pub fn rotate_wigner(&self, wigner: &WignerMatrix) -> Result<Bsc, BscError> {
        let nmax = self.nmax();

        if wigner.nmax() >= nmax {
            Ok(self.rotate_exact(&wigner.truncated(nmax)))
        } else {
            Ok(self.set_nmax(wigner.nmax(), Truncation::default())?.rotate_exact(wigner))
        }
    }

    /// Beam array of a single beam rotated by each of `wigners`.
    pub fn rotate_many(&self, wigners: &[WignerMatrix]) -> Result<Bsc, BscError> {
        self.multi_output(wigners.len(), |j| self.rotate_wigner(&wigners[j]))
    }

    fn rotate_exact(&self, wigner: &WignerMatrix) -> Bsc {
        self.with_columns(
            self.a.iter().map(|c| wigner.apply(c)).collect(),
            self.b.iter().map(|c| wigner.apply(c)).collect(),
        )
    }

    /// Sum of two beams in the same basis. The smaller order is zero padded and a single column
    /// is broadcast over the columns of the other beam.
    pub fn checked_add(&self, other: &Bsc) -> Result<Bsc, BscError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        if self.basis != other.basis {
            return Err(BscError::Basis {
                operation: "addition with a beam of different basis",
                basis: other.basis,
            });
        }

        let columns = match (self.ncols(), other.ncols()) {
            (left, right) if left == right => left,
            (1, right) => right,
            (left, 1) => left,
            (left, right) => return Err(BscError::ColumnMismatch { left, right }),
        };

        let pick = |beam: &Bsc, j: usize| if beam.ncols() == 1 { 0 } else { j };
        let a = (0..columns)
            .map(|j| self.a[pick(self, j)].sum(&other.a[pick(other, j)]))
            .collect();
        let b = (0..columns)
            .map(|j| self.b[pick(self, j)].sum(&other.b[pick(other, j)]))
            .collect();

        Ok(Bsc {
            a,
            b,
            absdz: self.absdz.max(other.absdz),
            ..self.with_columns(Vec::new(), Vec::new())
        })
    }

    pub fn checked_sub(&self, other: &Bsc) -> Result<Bsc, BscError> {
        self.checked_add(&-other)
    }

    /// Applies `operator` to the stacked column `[a; b]`,
    /// the operator output is split back into `[a'; b']`.
    pub fn apply_stacked_operator(&self, operator: &Mat<Complex64>) -> Result<Bsc, BscError> {
        let rows = self.rows();
        let operator_error = || BscError::OperatorShape {
            rows: operator.nrows(),
            cols: operator.ncols(),
            expected: 2 * rows,
        };

        if operator.ncols() != 2 * rows || operator.nrows() % 2 != 0 {
            return Err(operator_error());
        }
        let out_rows = operator.nrows() / 2;
        if out_rows != 0 && nmax_from_len(out_rows).is_none() {
            return Err(BscError::InvalidOrder(out_rows));
        }

        let mut a = Vec::with_capacity(self.ncols());
        let mut b = Vec::with_capacity(self.ncols());
        for (col_a, col_b) in self.a.iter().zip(&self.b) {
            let mut stacked = col_a.to_dense();
            stacked.extend(col_b.to_dense());

            let result = CoefficientVector::from_dense(stacked).transformed(operator).to_dense();
            let (new_a, new_b) = result.split_at(out_rows);
            a.push(CoefficientVector::from_dense(new_a.to_vec()));
            b.push(CoefficientVector::from_dense(new_b.to_vec()));
        }

        Ok(self.with_columns(a, b))
    }

    /// Applies `operator` to `a` and `b` separately.
    pub fn apply_per_component_operator(&self, operator: &Mat<Complex64>) -> Result<Bsc, BscError> {
        if operator.ncols() != self.rows() {
            return Err(BscError::OperatorShape {
                rows: operator.nrows(),
                cols: operator.ncols(),
                expected: self.rows(),
            });
        }
        if operator.nrows() != 0 && nmax_from_len(operator.nrows()).is_none() {
            return Err(BscError::InvalidOrder(operator.nrows()));
        }

        Ok(self.with_columns(
            self.a.iter().map(|c| c.transformed(operator)).collect(),
            self.b.iter().map(|c| c.transformed(operator)).collect(),
        ))
    }

    /// Coherent sum of all columns as a single column beam.
    pub fn sum_columns(&self) -> Bsc {
        let sum = |columns: &[CoefficientVector]| {
            columns
                .iter()
                .fold(CoefficientVector::zeros(self.rows()), |acc, c| acc.sum(c))
        };

        self.with_columns(vec![sum(&self.a)], vec![sum(&self.b)])
    }

    /// Beam array with the columns of `other` after the columns of `self`.
    pub fn append(&self, other: &Bsc) -> Result<Bsc, BscError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        if self.basis != other.basis {
            return Err(BscError::Basis {
                operation: "appending a beam of different basis",
                basis: other.basis,
            });
        }

        let nmax = self.nmax().max(other.nmax());
        let (left, right) = (self.resized(nmax), other.resized(nmax));

        Ok(Bsc {
            a: left.a.into_iter().chain(right.a).collect(),
            b: left.b.into_iter().chain(right.b).collect(),
            absdz: self.absdz.max(other.absdz),
            ..self.with_columns(Vec::new(), Vec::new())
        })
    }
}

impl Mul<Complex64> for &Bsc {
    type Output = Bsc;

    fn mul(self, rhs: Complex64) -> Self::Output {
        self.with_columns(
            self.a.iter().map(|c| c.scaled(rhs)).collect(),
            self.b.iter().map(|c| c.scaled(rhs)).collect(),
        )
    }
}

impl Mul<f64> for &Bsc {
    type Output = Bsc;

    fn mul(self, rhs: f64) -> Self::Output {
        self * Complex64::new(rhs, 0.)
    }
}

impl Neg for &Bsc {
    type Output = Bsc;

    fn neg(self) -> Self::Output {
        self * -1.
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;
    use faer::{Mat, Par};
    use multipole::{mode_index::max_linear_index, radial::Basis};
    use num::complex::Complex64;

    use crate::{
        beams::AnalyticBeam,
        coefficients::CoefficientVector,
        error::{BscError, test::count_warnings},
        rotation::{WignerMatrix, rotation_x, rotation_y},
    };

    use super::{ArrayType, Bsc, Truncation};

    fn plane_wave(direction: [f64; 3], polarisation: [f64; 3], nmax: u32, wavenumber: f64) -> Bsc {
        AnalyticBeam::PlaneWave {
            direction,
            polarisation: polarisation.map(|p| Complex64::new(p, 0.)),
            wavenumber,
        }
        .to_bsc(nmax)
        .unwrap()
    }

    fn assert_beams_close(left: &Bsc, right: &Bsc, tolerance: f64) {
        assert_eq!(left.rows(), right.rows());
        assert_eq!(left.ncols(), right.ncols());
        for j in 0..left.ncols() {
            for i in 0..left.rows() {
                let (da, db) = (
                    left.a()[j].get(i) - right.a()[j].get(i),
                    left.b()[j].get(i) - right.b()[j].get(i),
                );
                assert!(da.norm() < tolerance, "a[{i}, {j}]");
                assert!(db.norm() < tolerance, "b[{i}, {j}]");
            }
        }
    }

    /// Beam with unit coefficients in every mode of degree `nmax`.
    fn top_degree_beam(nmax: u32) -> Bsc {
        let len = max_linear_index(nmax);
        let mut column = CoefficientVector::zeros(len);
        for row in max_linear_index(nmax - 1)..len {
            column.set(row, Complex64::ONE);
        }
        let mut lower = column.clone();
        lower.set(0, Complex64::ONE);

        Bsc::from_columns(vec![lower], vec![column], Basis::Regular, 1.).unwrap()
    }

    #[test]
    fn test_construction_errors() {
        let a = Mat::<Complex64>::zeros(8, 1);
        let b = Mat::<Complex64>::zeros(3, 1);
        assert_eq!(
            Bsc::new(&a, &b, Basis::Regular, 1.),
            Err(BscError::ShapeMismatch {
                a_rows: 8,
                a_cols: 1,
                b_rows: 3,
                b_cols: 1
            })
        );

        let c = Mat::<Complex64>::zeros(5, 2);
        assert_eq!(Bsc::new(&c, &c, Basis::Regular, 1.), Err(BscError::InvalidOrder(5)));

        let empty = Mat::<Complex64>::zeros(0, 1);
        assert_eq!(Bsc::new(&empty, &empty, Basis::Regular, 1.).unwrap().nmax(), 0);

        let mut beam = Bsc::zeros(2, 1, Basis::Outgoing, 1.);
        assert!(beam.set_coefficients(&a, &b).is_err());
        assert_eq!(beam.rows(), 8);

        beam.set_coefficients(&a, &a).unwrap();
        assert_eq!(beam.basis(), Basis::Outgoing);
        assert_eq!(beam.a_mat().nrows(), 8);
    }

    #[test]
    fn test_resize_round_trip() {
        let beam = plane_wave([0., 0., 1.], [1., 0., 0.], 5, 1.);

        let (back, warnings) = count_warnings(|| {
            beam.set_nmax(9, Truncation::default())
                .unwrap()
                .set_nmax(5, Truncation::default())
                .unwrap()
        });

        assert_eq!(warnings, 0);
        assert_eq!(back, beam);
        assert_eq!(beam.set_nmax(9, Truncation::error(0.)).unwrap().rows(), 99);
    }

    #[test]
    fn test_truncation_policies() {
        let beam = top_degree_beam(3);

        let (result, warnings) = count_warnings(|| beam.set_nmax(2, Truncation::default()));
        assert_eq!(warnings, 1);
        assert_eq!(result.unwrap().nmax(), 2);

        let (_, warnings) = count_warnings(|| beam.set_nmax(2, Truncation::ignore()));
        assert_eq!(warnings, 0);

        let (_, warnings) = count_warnings(|| beam.set_nmax(2, Truncation::warn(1.)));
        assert_eq!(warnings, 0);

        match beam.set_nmax(2, Truncation::error(1e-6)) {
            Err(BscError::Truncation { nmax, loss, .. }) => {
                assert_eq!(nmax, 2);
                assert_relative_eq!(loss, 1.);
            }
            other => panic!("expected truncation error, got {other:?}"),
        }
    }

    #[test]
    fn test_addition() {
        let small = plane_wave([0., 0., 1.], [1., 0., 0.], 1, 1.);
        let large = plane_wave([0., 0., 1.], [1., 0., 0.], 2, 1.);

        let sum = small.checked_add(&large).unwrap();
        assert_eq!(sum.nmax(), 2);
        assert_eq!(sum.a()[0].get(0), small.a()[0].get(0) + large.a()[0].get(0));
        assert_eq!(sum.a()[0].get(5), large.a()[0].get(5));

        let difference = large.checked_sub(&large).unwrap();
        assert_eq!(difference.power(), 0.);

        let array = large.append(&large).unwrap().append(&small).unwrap();
        assert_eq!(array.ncols(), 3);
        let broadcast = array.checked_add(&small).unwrap();
        assert_eq!(broadcast.ncols(), 3);

        let pair = large.append(&large).unwrap();
        assert_eq!(
            array.checked_add(&pair),
            Err(BscError::ColumnMismatch { left: 3, right: 2 })
        );

        let outgoing = large.clone().with_basis(Basis::Outgoing);
        assert!(matches!(large.checked_add(&outgoing), Err(BscError::Basis { .. })));
    }

    #[test]
    fn test_empty_sentinel() {
        assert!(std::ptr::eq(Bsc::empty(), Bsc::empty()));
        assert!(Bsc::empty().is_empty());

        let beam = plane_wave([0., 0., 1.], [0., 1., 0.], 3, 1.);
        assert_eq!(Bsc::empty().checked_add(&beam).unwrap(), beam);
        assert_eq!(beam.checked_add(Bsc::empty()).unwrap(), beam);
        assert_eq!(Bsc::empty().append(&beam).unwrap(), beam);
    }

    #[test]
    fn test_scalar_operations() {
        let beam = plane_wave([0., 0., 1.], [1., 0., 0.], 6, 1.);
        let power = beam.power();

        assert_relative_eq!(power, 4. * PI * 48., max_relative = 1e-12);
        assert_relative_eq!((&beam * 2.).power(), 4. * power, max_relative = 1e-12);
        assert_relative_eq!((&beam * Complex64::I).power(), power, max_relative = 1e-12);
        assert_relative_eq!(beam.scale_power(1.).power(), 1., max_relative = 1e-12);

        let negated = -&beam;
        assert_eq!(negated.a()[0].get(0), -beam.a()[0].get(0));
    }

    #[test]
    fn test_operators() {
        let beam = plane_wave([0., 1., 1.], [1., 0., 0.], 2, 1.);
        let identity = Mat::<Complex64>::identity(8, 8);
        assert_eq!(beam.apply_per_component_operator(&identity).unwrap(), beam);

        let swap = Mat::from_fn(16, 16, |i, j| {
            if (i + 8) % 16 == j {
                Complex64::ONE
            } else {
                Complex64::ZERO
            }
        });
        let swapped = beam.apply_stacked_operator(&swap).unwrap();
        assert_eq!(swapped.a(), beam.b());
        assert_eq!(swapped.b(), beam.a());

        let truncating = Mat::<Complex64>::identity(10, 16);
        assert_eq!(beam.apply_stacked_operator(&truncating), Err(BscError::InvalidOrder(5)));
        assert!(matches!(
            beam.apply_per_component_operator(&swap),
            Err(BscError::OperatorShape { .. })
        ));
    }

    #[test]
    fn test_translate_z_phase() {
        let wavenumber = 2. * PI;
        let beam = plane_wave([0., 0., 1.], [1., 0., 0.], 30, wavenumber);
        let expected = plane_wave([0., 0., 1.], [1., 0., 0.], 10, wavenumber);

        let (translated, warnings) =
            count_warnings(|| beam.translate_z_with(0.25, 10, Par::Seq).unwrap());

        assert_eq!(warnings, 0);
        assert_eq!(translated.basis(), Basis::Regular);
        assert_relative_eq!(translated.absdz(), 0.25, epsilon = 1e-14);
        assert_beams_close(&translated, &(&expected * Complex64::I), 1e-8);
    }

    #[test]
    fn test_translation_outside_valid_region() {
        let beam = plane_wave([0., 0., 1.], [1., 0., 0.], 5, 1.);

        let (translated, warnings) =
            count_warnings(|| beam.translate_z(2.).unwrap().translate_z(-2.).unwrap());

        assert_eq!(warnings, 2);
        assert_relative_eq!(translated.absdz(), 4.);
    }

    #[test]
    fn test_translate_x_phase() {
        let wavenumber = 1.;
        let d = 0.8;
        let beam = plane_wave([1., 0., 0.], [0., 0., 1.], 30, wavenumber);

        let translated = beam
            .translate_xyz([d, 0., 0.])
            .unwrap()
            .set_nmax(10, Truncation::ignore())
            .unwrap();
        let expected =
            &beam.set_nmax(10, Truncation::ignore()).unwrap() * Complex64::from_polar(1., d);

        assert_beams_close(&translated, &expected, 1e-8);
    }

    #[test]
    fn test_translate_axis_shortcuts() {
        let beam = plane_wave([0., 0., 1.], [1., 0., 0.], 12, 1.);

        assert_eq!(beam.translate_rtp([0., 1., 2.]).unwrap(), beam);
        assert_beams_close(
            &beam.translate_rtp([0.3, PI, 0.]).unwrap(),
            &beam.translate_z(-0.3).unwrap(),
            1e-14,
        );
    }

    #[test]
    fn test_rotation_keeps_power() {
        let beam = plane_wave([0.3, -0.2, 1.], [1., 0., -0.3], 8, 1.);
        let rotated = beam.rotate(&rotation_y(0.7));

        assert_relative_eq!(rotated.power(), beam.power(), max_relative = 1e-10);
        assert_beams_close(&rotated.rotate(&rotation_y(-0.7)), &beam, 1e-10);
    }

    #[test]
    fn test_rotate_many() {
        let beam = plane_wave([0.3, -0.2, 1.], [1., 0., -0.3], 6, 1.);
        let rotations = [rotation_y(0.4), rotation_x(-1.1)];
        let wigners = [WignerMatrix::new(6, &rotations[0]), WignerMatrix::new(8, &rotations[1])];

        let array = beam.rotate_many(&wigners).unwrap();
        assert_eq!(array.ncols(), 2);
        assert_eq!(array.nmax(), 6);
        assert_eq!(array.array_type(), ArrayType::Array);

        for (j, rotation) in rotations.iter().enumerate() {
            assert_beams_close(&array.column(j), &beam.rotate(rotation), 1e-12);
        }
    }

    #[test]
    fn test_lower_order_wigner_truncates() {
        let beam = plane_wave([0., 0., 1.], [1., 0., 0.], 4, 1.);
        let wigner = WignerMatrix::new(2, &rotation_y(0.5));

        let (rotated, warnings) = count_warnings(|| beam.rotate_wigner(&wigner).unwrap());
        assert_eq!(warnings, 1);
        assert_eq!(rotated.nmax(), 2);

        let expected = beam.set_nmax(2, Truncation::ignore()).unwrap().rotate(&rotation_y(0.5));
        assert_beams_close(&rotated, &expected, 1e-12);
    }

    #[test]
    fn test_array_translation_commutes() {
        let first = plane_wave([0., 0., 1.], [1., 0., 0.], 8, 1.);
        let second = plane_wave([0., 1., 1.], [1., 0., 0.], 8, 1.);
        let offset = [0.2, -0.1, 0.3];

        let combined = first.append(&second).unwrap().translate_xyz(offset).unwrap().sum_columns();
        let separate = first
            .translate_xyz(offset)
            .unwrap()
            .checked_add(&second.translate_xyz(offset).unwrap())
            .unwrap();

        assert_beams_close(&combined, &separate, 1e-12);
    }

    #[test]
    fn test_multiple_outputs() {
        let beam = plane_wave([0., 0., 1.], [1., 0., 0.], 6, 1.);

        let array = beam.translate_many(&[[0., 0., 0.1], [0.1, 0., 0.], [0., 0., 0.]]).unwrap();
        assert_eq!(array.ncols(), 3);
        assert_eq!(array.array_type(), ArrayType::Array);
        assert_eq!(array.column(2).a(), beam.a());

        assert_eq!(
            array.translate_many(&[[0., 0., 1.], [0., 1., 0.]]),
            Err(BscError::UnsupportedMultiOutput { columns: 3, outputs: 2 })
        );
        assert!(beam.translate_many(&[]).is_err());

        let summed = array.sum_columns();
        assert_eq!(summed.ncols(), 1);
    }
}
