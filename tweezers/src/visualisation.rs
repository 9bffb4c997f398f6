use std::{fmt::Display, str::FromStr};

use num::complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::{
    bsc::{ArrayType, Bsc},
    error::BscError,
    fields::{FieldOptions, FieldVector},
};

/// Electric field component, spherical `r, θ, φ` or cartesian `x, y, z`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Er,
    Et,
    Ep,
    Ex,
    Ey,
    Ez,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::Er,
        Component::Et,
        Component::Ep,
        Component::Ex,
        Component::Ey,
        Component::Ez,
    ];

    fn key(&self) -> &'static str {
        match self {
            Component::Er => "Er",
            Component::Et => "Et",
            Component::Ep => "Ep",
            Component::Ex => "Ex",
            Component::Ey => "Ey",
            Component::Ez => "Ez",
        }
    }

    fn values(&self, field: &FieldVector) -> Vec<Complex64> {
        let (field, k) = match self {
            Component::Er => (field.to_spherical(), 0),
            Component::Et => (field.to_spherical(), 1),
            Component::Ep => (field.to_spherical(), 2),
            Component::Ex => (field.to_cartesian(), 0),
            Component::Ey => (field.to_cartesian(), 1),
            Component::Ez => (field.to_cartesian(), 2),
        };

        field.values.iter().map(|v| v[k]).collect()
    }
}

/// Derived quantity of the electric field, parsed from and displayed as its string key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// `sqrt(Σ|Eᵢ|²)`, key `irradiance`
    Irradiance,
    /// `Σ|Eᵢ|²`, key `E2`
    E2,
    /// `Σ|Eᵢ|`, key `Sum(Abs(E))`
    SumAbs,
    Re(Component),
    Abs(Component),
    Arg(Component),
    /// The complex component itself.
    Raw(Component),
}

impl Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Irradiance => write!(f, "irradiance"),
            FieldType::E2 => write!(f, "E2"),
            FieldType::SumAbs => write!(f, "Sum(Abs(E))"),
            FieldType::Re(c) => write!(f, "Re({})", c.key()),
            FieldType::Abs(c) => write!(f, "Abs({})", c.key()),
            FieldType::Arg(c) => write!(f, "Arg({})", c.key()),
            FieldType::Raw(c) => write!(f, "{}", c.key()),
        }
    }
}

impl FromStr for FieldType {
    type Err = BscError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "irradiance" => return Ok(FieldType::Irradiance),
            "E2" => return Ok(FieldType::E2),
            "Sum(Abs(E))" => return Ok(FieldType::SumAbs),
            _ => (),
        }

        let component = |key: &str| Component::ALL.into_iter().find(|c| c.key() == key);
        let inner = |prefix: &str| s.strip_prefix(prefix)?.strip_suffix(')').and_then(component);

        if let Some(c) = component(s) {
            Ok(FieldType::Raw(c))
        } else if let Some(c) = inner("Re(") {
            Ok(FieldType::Re(c))
        } else if let Some(c) = inner("Abs(") {
            Ok(FieldType::Abs(c))
        } else if let Some(c) = inner("Arg(") {
            Ok(FieldType::Arg(c))
        } else {
            Err(BscError::UnknownFieldType(s.to_string()))
        }
    }
}

impl FieldType {
    pub fn is_complex(&self) -> bool {
        matches!(self, FieldType::Raw(_))
    }

    /// Every field type, in the order of their keys.
    pub fn all() -> Vec<FieldType> {
        let mut all = vec![FieldType::Irradiance, FieldType::E2, FieldType::SumAbs];
        all.extend(Component::ALL.map(FieldType::Re));
        all.extend(Component::ALL.map(FieldType::Abs));
        all.extend(Component::ALL.map(FieldType::Arg));
        all.extend(Component::ALL.map(FieldType::Raw));

        all
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VisualData {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl VisualData {
    pub fn len(&self) -> usize {
        match self {
            VisualData::Real(values) => values.len(),
            VisualData::Complex(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            VisualData::Real(values) => Some(values),
            VisualData::Complex(_) => None,
        }
    }
}

/// Quantity `field_type` of the electric field at each of its points.
pub fn visualisation_data(field_type: FieldType, field: &FieldVector) -> VisualData {
    let real = |f: fn(Complex64) -> f64, c: Component| {
        VisualData::Real(c.values(field).into_iter().map(f).collect())
    };

    match field_type {
        FieldType::Irradiance => {
            VisualData::Real(field.norm_sqr().into_iter().map(f64::sqrt).collect())
        }
        FieldType::E2 => VisualData::Real(field.norm_sqr()),
        FieldType::SumAbs => VisualData::Real(
            field
                .values
                .iter()
                .map(|v| v.iter().map(|c| c.norm()).sum())
                .collect(),
        ),
        FieldType::Re(c) => real(|v| v.re, c),
        FieldType::Abs(c) => real(|v| v.norm(), c),
        FieldType::Arg(c) => real(|v| v.arg(), c),
        FieldType::Raw(c) => VisualData::Complex(c.values(field)),
    }
}

/// Sum over independent beams of the real quantity `field_type`.
pub fn incoherent_visualisation(
    field_type: FieldType,
    fields: &[FieldVector],
) -> Result<VisualData, BscError> {
    if field_type.is_complex() {
        return Err(BscError::IncoherentFieldType(field_type.to_string()));
    }

    let mut sum: Vec<f64> = Vec::new();
    for field in fields {
        if let VisualData::Real(values) = visualisation_data(field_type, field) {
            if sum.is_empty() {
                sum = values;
            } else {
                sum.iter_mut().zip(values).for_each(|(s, v)| *s += v);
            }
        }
    }

    Ok(VisualData::Real(sum))
}

impl Bsc {
    /// Visualisation data of the electric near field at cartesian `points`, one entry per
    /// evaluated column and a single one for incoherent beams.
    pub fn visualise(
        &self,
        field_type: FieldType,
        points: &[[f64; 3]],
        options: &FieldOptions,
    ) -> Result<Vec<VisualData>, BscError> {
        let (fields, _) = self.ehfield_with(points, None, options);
        let fields: Vec<FieldVector> = fields.into_iter().map(|f| f.e).collect();

        match self.array_type() {
            ArrayType::Incoherent => Ok(vec![incoherent_visualisation(field_type, &fields)?]),
            ArrayType::Array | ArrayType::Coherent => {
                Ok(fields.iter().map(|f| visualisation_data(field_type, f)).collect())
            }
        }
    }
}
