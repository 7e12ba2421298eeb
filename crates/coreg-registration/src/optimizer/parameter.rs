//! Parameter tags, the parameter space searched by the optimizer, and the
//! parameter vectors handed to objectives.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};
use crate::validation::validate_bounds;

/// Tag of a scalar transform parameter.
///
/// Translations are in voxels (or mm for point fits), rotations in degrees,
/// scales are factors and shears are unitless coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParameterKind {
    TranslationX,
    TranslationY,
    TranslationZ,
    RotationX,
    RotationY,
    RotationZ,
    /// Uniform scale on all axes.
    Scale,
    ScaleX,
    ScaleY,
    ScaleZ,
    ShearXtoY,
    ShearXtoZ,
    ShearYtoX,
    ShearYtoZ,
    ShearZtoX,
    ShearZtoY,
}

impl ParameterKind {
    /// Value contributing nothing to the transform.
    pub fn identity_value(self) -> f64 {
        match self {
            ParameterKind::Scale | ParameterKind::ScaleX | ParameterKind::ScaleY | ParameterKind::ScaleZ => 1.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One searched parameter with its bounds and starting value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub kind: ParameterKind,
    pub min: f64,
    pub max: f64,
    pub initial: f64,
}

impl ParameterDef {
    /// Bounded parameter starting at its identity value clamped into the bounds.
    pub fn new(kind: ParameterKind, min: f64, max: f64) -> Self {
        Self {
            kind,
            min,
            max,
            initial: kind.identity_value().clamp(min.min(max), max.max(min)),
        }
    }

    /// Parameters with `min == max` are held constant.
    pub fn is_free(&self) -> bool {
        self.max > self.min
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Ordered groups of parameters.
///
/// Groups matter to the grid search, which scans the parameters of one
/// group jointly (e.g. the three rotations), one group after the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    groups: Vec<Vec<ParameterDef>>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group of `(kind, min, max)` parameters.
    ///
    /// Fails on inverted bounds or when a tag is already present.
    pub fn add_group(&mut self, group: &[(ParameterKind, f64, f64)]) -> Result<&mut Self> {
        let mut defs = Vec::with_capacity(group.len());
        for &(kind, min, max) in group {
            validate_bounds(&kind.to_string(), min, max)?;
            if self.contains(kind) || defs.iter().any(|d: &ParameterDef| d.kind == kind) {
                return Err(RegistrationError::duplicate_parameter(kind.to_string()));
            }
            defs.push(ParameterDef::new(kind, min, max));
        }
        if !defs.is_empty() {
            self.groups.push(defs);
        }
        Ok(self)
    }

    /// Builder form of [`ParameterSpace::add_group`].
    pub fn with_group(mut self, group: &[(ParameterKind, f64, f64)]) -> Result<Self> {
        self.add_group(group)?;
        Ok(self)
    }

    /// Override the starting value of a parameter.
    pub fn set_initial(&mut self, kind: ParameterKind, value: f64) -> Result<()> {
        let def = self
            .groups
            .iter_mut()
            .flatten()
            .find(|d| d.kind == kind)
            .ok_or_else(|| RegistrationError::invalid_parameter(format!("{} is not in the space", kind)))?;
        if !(value >= def.min && value <= def.max) {
            return Err(RegistrationError::invalid_parameter(format!(
                "{}: initial value {} outside [{}, {}]",
                kind, value, def.min, def.max
            )));
        }
        def.initial = value;
        Ok(())
    }

    pub fn contains(&self, kind: ParameterKind) -> bool {
        self.defs().any(|d| d.kind == kind)
    }

    /// All parameters in declaration order.
    pub fn defs(&self) -> impl Iterator<Item = &ParameterDef> {
        self.groups.iter().flatten()
    }

    pub fn groups(&self) -> &[Vec<ParameterDef>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of parameters actually searched.
    pub fn free_count(&self) -> usize {
        self.defs().filter(|d| d.is_free()).count()
    }

    /// Starting values, in declaration order.
    pub fn initial_values(&self) -> Vec<f64> {
        self.defs().map(|d| d.initial).collect()
    }

    /// Tag the values of a full vector.
    pub fn vector(&self, values: &[f64]) -> ParameterVector {
        ParameterVector {
            entries: self.defs().map(|d| d.kind).zip(values.iter().copied()).collect(),
        }
    }

    pub fn initial_vector(&self) -> ParameterVector {
        self.vector(&self.initial_values())
    }
}

/// Current value of every active parameter.
///
/// Absent tags are not optimized: objectives use their identity contribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    entries: Vec<(ParameterKind, f64)>,
}

impl ParameterVector {
    /// Build from explicit entries. Fails if a tag appears twice.
    pub fn from_entries(entries: Vec<(ParameterKind, f64)>) -> Result<Self> {
        for (i, (kind, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(k, _)| k == kind) {
                return Err(RegistrationError::duplicate_parameter(kind.to_string()));
            }
        }
        Ok(Self { entries })
    }

    pub fn has(&self, kind: ParameterKind) -> bool {
        self.entries.iter().any(|(k, _)| *k == kind)
    }

    pub fn get(&self, kind: ParameterKind) -> Option<f64> {
        self.entries.iter().find(|(k, _)| *k == kind).map(|(_, v)| *v)
    }

    pub fn value_or(&self, kind: ParameterKind, default: f64) -> f64 {
        self.get(kind).unwrap_or(default)
    }

    /// Value of `kind`, or its identity contribution when absent.
    pub fn value(&self, kind: ParameterKind) -> f64 {
        self.value_or(kind, kind.identity_value())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ParameterKind, f64)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ParameterKind::*;

    #[test]
    fn test_duplicate_rejected() {
        let mut space = ParameterSpace::new();
        space.add_group(&[(RotationX, -10.0, 10.0)]).unwrap();
        let err = space.add_group(&[(RotationY, -10.0, 10.0), (RotationX, -5.0, 5.0)]);
        assert!(matches!(err, Err(RegistrationError::DuplicateParameter(_))));
        let err = ParameterSpace::new().with_group(&[(Scale, 0.9, 1.1), (Scale, 0.8, 1.2)]);
        assert!(err.is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = ParameterSpace::new().with_group(&[(TranslationX, 5.0, -5.0)]);
        assert!(matches!(err, Err(RegistrationError::InvalidParameter(_))));
    }

    #[test]
    fn test_initial_values_use_identity() {
        let space = ParameterSpace::new()
            .with_group(&[(TranslationX, -5.0, 5.0), (Scale, 0.5, 2.0), (RotationZ, 10.0, 20.0)])
            .unwrap();
        assert_eq!(space.initial_values(), vec![0.0, 1.0, 10.0]);
        assert_eq!(space.free_count(), 3);
    }

    #[test]
    fn test_vector_lookup() {
        let space = ParameterSpace::new()
            .with_group(&[(TranslationX, -5.0, 5.0), (ScaleY, 0.5, 2.0)])
            .unwrap();
        let v = space.vector(&[2.0, 1.5]);
        assert!(v.has(TranslationX));
        assert_eq!(v.get(ScaleY), Some(1.5));
        assert_eq!(v.get(RotationX), None);
        assert_eq!(v.value(ScaleX), 1.0);
        assert_eq!(v.value_or(RotationX, 7.0), 7.0);
    }

    #[test]
    fn test_set_initial_checks_bounds() {
        let mut space = ParameterSpace::new().with_group(&[(RotationY, -10.0, 10.0)]).unwrap();
        assert!(space.set_initial(RotationY, 3.0).is_ok());
        assert!(space.set_initial(RotationY, 30.0).is_err());
        assert!(space.set_initial(RotationX, 0.0).is_err());
        assert_eq!(space.initial_values(), vec![3.0]);
    }

    #[test]
    fn test_fixed_parameter_not_free() {
        let space = ParameterSpace::new()
            .with_group(&[(TranslationX, 0.0, 0.0), (TranslationY, -1.0, 1.0)])
            .unwrap();
        assert_eq!(space.len(), 2);
        assert_eq!(space.free_count(), 1);
    }
}
