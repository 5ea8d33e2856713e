//! Structured validation diagnostics.

use crate::schema::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    // shape
    Malformed,
    MissingField,
    UnexpectedNull,
    WrongType,
    UnknownField,
    // field-level
    FieldConstraint,
    // uniqueness
    DuplicateKey,
    // references
    UnresolvedReference,
    // domain
    BinStart,
    BinGap,
    BinOverlap,
    BinEnd,
    EmptyBin,
    MissingBasicEmployeeType,
}

impl ViolationKind {
    pub fn is_shape(&self) -> bool {
        matches!(
            self,
            ViolationKind::Malformed
                | ViolationKind::MissingField
                | ViolationKind::UnexpectedNull
                | ViolationKind::WrongType
                | ViolationKind::UnknownField
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::Malformed => "malformed",
            ViolationKind::MissingField => "missing field",
            ViolationKind::UnexpectedNull => "unexpected null",
            ViolationKind::WrongType => "wrong type",
            ViolationKind::UnknownField => "unknown field",
            ViolationKind::FieldConstraint => "field constraint",
            ViolationKind::DuplicateKey => "duplicate key",
            ViolationKind::UnresolvedReference => "unresolved reference",
            ViolationKind::BinStart => "bin does not start at zero",
            ViolationKind::BinGap => "gap between bins",
            ViolationKind::BinOverlap => "overlapping bins",
            ViolationKind::BinEnd => "bins do not cover the day",
            ViolationKind::EmptyBin => "empty bin",
            ViolationKind::MissingBasicEmployeeType => "missing basic employee type",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(entity, record index, field, kind)` diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub entity: EntityKind,
    /// Position in the entity list; `None` for aggregate-level problems.
    pub record_index: Option<usize>,
    pub field: String,
    pub kind: ViolationKind,
    pub detail: String,
}

impl Violation {
    pub fn new(
        entity: EntityKind,
        record_index: Option<usize>,
        field: impl Into<String>,
        kind: ViolationKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            entity,
            record_index,
            field: field.into(),
            kind,
            detail: detail.into(),
        }
    }

    pub fn at(
        entity: EntityKind,
        record_index: usize,
        field: impl Into<String>,
        kind: ViolationKind,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(entity, Some(record_index), field, kind, detail)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record_index {
            Some(i) => write!(f, "{}[{}]", self.entity, i)?,
            None => write!(f, "{}", self.entity)?,
        }
        if !self.field.is_empty() {
            write!(f, ".{}", self.field)?;
        }
        write!(f, ": {}", self.kind)?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

fn write_violations(f: &mut fmt::Formatter<'_>, violations: &[Violation]) -> fmt::Result {
    if violations.is_empty() {
        return f.write_str("valid");
    }
    write!(f, "{} violation(s)", violations.len())?;
    for v in violations {
        write!(f, "; {}", v)?;
    }
    Ok(())
}

/// Structural findings: wrong fields, wrong coarse types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeReport {
    pub violations: Vec<Violation>,
}

impl ShapeReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }
}

impl fmt::Display for ShapeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_violations(f, &self.violations)
    }
}

/// Full validation result; empty means `Valid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    pub fn of_kind(&self, kind: ViolationKind) -> Vec<&Violation> {
        self.violations.iter().filter(|v| v.kind == kind).collect()
    }
}

impl From<ShapeReport> for ValidationReport {
    fn from(report: ShapeReport) -> Self {
        ValidationReport {
            violations: report.violations,
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_violations(f, &self.violations)
    }
}
