//! Configuration validation.
//!
//! Stages run in a fixed order and every stage reports into one
//! [`ValidationReport`]; expected failures never surface as `Err`.
//! `Err` is reserved for programmer errors such as a registry that lacks an
//! entity the validator needs.

pub mod bins;
pub mod reference;
pub mod report;

pub use reference::ReferenceKeys;
pub use report::{ShapeReport, ValidationReport, Violation, ViolationKind};

use crate::error::PipelineResult;
use crate::schema::{AggregateScope, ConfigurationSet, EntityKind, SchemaRegistry};
use chrono::NaiveTime;
use reference::KeyCatalog;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use tracing::debug;
use validator::{Validate, ValidationErrors};

/// Seconds in a calendar day; the default end of the last payroll bin.
pub const DEFAULT_DAY_LENGTH_SECONDS: i64 = 86_400;

/// Result of validating a raw JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Valid(ConfigurationSet),
    ShapeInvalid(ShapeReport),
    Invalid(ValidationReport),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }
}

#[derive(Debug, Clone)]
pub struct Validator {
    registry: SchemaRegistry,
    scope: AggregateScope,
    day_length_seconds: i64,
    basic_etype: Option<i64>,
    reference: ReferenceKeys,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(AggregateScope::default())
    }
}

impl Validator {
    pub fn new(scope: AggregateScope) -> Self {
        Self {
            registry: SchemaRegistry::builtin().clone(),
            scope,
            day_length_seconds: DEFAULT_DAY_LENGTH_SECONDS,
            basic_etype: None,
            reference: ReferenceKeys::new(),
        }
    }

    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_day_length(mut self, seconds: i64) -> Self {
        self.day_length_seconds = seconds;
        self
    }

    pub fn with_basic_etype(mut self, etype: Option<i64>) -> Self {
        self.basic_etype = etype;
        self
    }

    pub fn with_reference(mut self, reference: ReferenceKeys) -> Self {
        self.reference = reference;
        self
    }

    pub fn scope(&self) -> AggregateScope {
        self.scope
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Validate a typed configuration set.
    pub fn validate(&self, set: &ConfigurationSet) -> PipelineResult<ValidationReport> {
        for kind in EntityKind::RECORDS {
            self.registry.fields(kind)?;
        }

        let mut report = ValidationReport::valid();

        let shape = self
            .registry
            .validate_shape(&serde_json::to_value(set)?, self.scope)?;
        report.extend(shape.violations);

        self.check_field_constraints(set, &mut report);
        self.check_uniqueness(set, &mut report);
        self.check_references(set, &mut report);
        self.check_basic_etype(set, &mut report);
        report.extend(bins::check_bins(&set.payroll_bins, self.day_length_seconds));

        debug!(
            "validated configuration ({} record(s)): {}",
            EntityKind::RECORDS.iter().map(|k| set.len_of(*k)).sum::<usize>(),
            report
        );
        Ok(report)
    }

    /// Shape-check a raw document, then decode and validate it.
    pub fn validate_json(&self, candidate: &Value) -> PipelineResult<Verdict> {
        let shape = self.registry.validate_shape(candidate, self.scope)?;
        if !shape.is_valid() {
            return Ok(Verdict::ShapeInvalid(shape));
        }
        let set: ConfigurationSet = match serde_json::from_value(candidate.clone()) {
            Ok(set) => set,
            Err(e) => {
                let mut shape = ShapeReport::default();
                shape.push(Violation::new(
                    EntityKind::Aggregate,
                    None,
                    "",
                    ViolationKind::Malformed,
                    e.to_string(),
                ));
                return Ok(Verdict::ShapeInvalid(shape));
            }
        };
        let report = self.validate(&set)?;
        if report.is_valid() {
            Ok(Verdict::Valid(set))
        } else {
            Ok(Verdict::Invalid(report))
        }
    }

    fn check_field_constraints(&self, set: &ConfigurationSet, report: &mut ValidationReport) {
        fn each<T: Validate>(kind: EntityKind, records: &[T], report: &mut ValidationReport) {
            for (i, record) in records.iter().enumerate() {
                if let Err(errors) = record.validate() {
                    report.extend(constraint_violations(kind, i, &errors));
                }
            }
        }

        each(EntityKind::ActivityType, &set.activity_types, report);
        each(EntityKind::Activity, &set.activities, report);
        each(EntityKind::DayType, &set.day_types, report);
        each(EntityKind::EmployeeType, &set.employee_types, report);
        for (i, et) in set.employee_types.iter().enumerate() {
            if !is_time_of_day(&et.workday_start_time) {
                report.push(clock_violation(
                    EntityKind::EmployeeType,
                    i,
                    "workday_start_time",
                    &et.workday_start_time,
                ));
            }
        }
        each(EntityKind::ColumnDefinition, &set.column_definitions, report);
        each(EntityKind::ColumnDisplay, &set.column_displays, report);
        each(EntityKind::DayTypeBinding, &set.day_type_bindings, report);
        for (i, b) in set.day_type_bindings.iter().enumerate() {
            if !is_duration(&b.min_interval_between_shifts) {
                report.push(clock_violation(
                    EntityKind::DayTypeBinding,
                    i,
                    "min_interval_between_shifts",
                    &b.min_interval_between_shifts,
                ));
            }
        }
        each(EntityKind::PayrollColumnBin, &set.payroll_bins, report);
    }

    fn check_uniqueness(&self, set: &ConfigurationSet, report: &mut ValidationReport) {
        report.extend(duplicates(EntityKind::ActivityType, "atype", &set.activity_types, |r| r.atype));
        report.extend(duplicates(EntityKind::DayType, "day_type_id", &set.day_types, |r| {
            r.day_type_id
        }));
        report.extend(duplicates(EntityKind::EmployeeType, "etype", &set.employee_types, |r| {
            r.etype
        }));
        report.extend(duplicates(
            EntityKind::ColumnDefinition,
            "pcol_number",
            &set.column_definitions,
            |r| r.pcol_number,
        ));
        report.extend(duplicates(EntityKind::ColumnDisplay, "etcd_id", &set.column_displays, |r| {
            r.etcd_id
        }));
        report.extend(duplicates(
            EntityKind::DayTypeBinding,
            "etype,day_type_id",
            &set.day_type_bindings,
            |r| PairKey(r.etype, r.day_type_id),
        ));
        report.extend(duplicates(EntityKind::PayrollColumnBin, "etp_id", &set.payroll_bins, |r| {
            r.etp_id
        }));
    }

    fn check_references(&self, set: &ConfigurationSet, report: &mut ValidationReport) {
        let catalog = KeyCatalog::build(set, |k| self.scope.includes(k), &self.reference);
        let mut skipped = HashSet::new();
        let mut resolve = |entity: EntityKind, index: usize, field: &str, target: EntityKind, key: i64| {
            match catalog.resolves(target, key) {
                Some(true) => {}
                Some(false) => report.push(Violation::at(
                    entity,
                    index,
                    field,
                    ViolationKind::UnresolvedReference,
                    format!("no {} with {} {}", target, field, key),
                )),
                None => {
                    if skipped.insert((entity, target)) {
                        debug!(
                            "{}.{} not checked: no {} keys in scope or reference tables",
                            entity, field, target
                        );
                    }
                }
            }
        };

        for (i, r) in set.activities.iter().enumerate() {
            resolve(EntityKind::Activity, i, "atype", EntityKind::ActivityType, r.atype);
        }
        for (i, r) in set.column_displays.iter().enumerate() {
            resolve(EntityKind::ColumnDisplay, i, "etype", EntityKind::EmployeeType, r.etype);
            resolve(
                EntityKind::ColumnDisplay,
                i,
                "pcol_number",
                EntityKind::ColumnDefinition,
                r.pcol_number,
            );
        }
        for (i, r) in set.day_type_bindings.iter().enumerate() {
            resolve(EntityKind::DayTypeBinding, i, "etype", EntityKind::EmployeeType, r.etype);
            resolve(
                EntityKind::DayTypeBinding,
                i,
                "day_type_id",
                EntityKind::DayType,
                r.day_type_id,
            );
        }
        for (i, r) in set.payroll_bins.iter().enumerate() {
            resolve(EntityKind::PayrollColumnBin, i, "etype", EntityKind::EmployeeType, r.etype);
            resolve(
                EntityKind::PayrollColumnBin,
                i,
                "day_type_id",
                EntityKind::DayType,
                r.day_type_id,
            );
        }
    }

    fn check_basic_etype(&self, set: &ConfigurationSet, report: &mut ValidationReport) {
        let defined = |etype: i64| set.employee_types.iter().any(|et| et.etype == etype);
        if let Some(basic) = self.basic_etype {
            if !defined(basic) {
                report.push(Violation::new(
                    EntityKind::EmployeeType,
                    None,
                    "etype",
                    ViolationKind::MissingBasicEmployeeType,
                    format!("configured basic etype {} is not defined", basic),
                ));
            }
            return;
        }
        let dependents = set.column_displays.len() + set.day_type_bindings.len() + set.payroll_bins.len();
        if set.employee_types.is_empty() && dependents > 0 {
            report.push(Violation::new(
                EntityKind::EmployeeType,
                None,
                "etype",
                ViolationKind::MissingBasicEmployeeType,
                format!("{} dependent record(s) but no employee types", dependents),
            ));
        }
    }

    /// The basic employee type: the configured one, else the lowest `etype`.
    pub fn basic_etype(&self, set: &ConfigurationSet) -> Option<i64> {
        self.basic_etype
            .or_else(|| set.employee_types.iter().map(|et| et.etype).min())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PairKey(i64, i64);

impl Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// One violation per repeated key, at the key's second occurrence.
fn duplicates<T, K>(
    kind: EntityKind,
    field: &str,
    records: &[T],
    key: impl Fn(&T) -> K,
) -> Vec<Violation>
where
    K: Eq + Hash + Display,
{
    let mut first_seen: HashMap<K, usize> = HashMap::new();
    let mut reported: HashSet<K> = HashSet::new();
    let mut violations = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let k = key(record);
        match first_seen.get(&k).copied() {
            None => {
                first_seen.insert(k, i);
            }
            Some(first) => {
                let detail = format!("{} {} already used by record {}", field, k, first);
                if reported.insert(k) {
                    violations.push(Violation::at(kind, i, field, ViolationKind::DuplicateKey, detail));
                }
            }
        }
    }
    violations
}

/// Wire name of a Rust field that is renamed on serialization.
fn wire_name(kind: EntityKind, field: &str) -> String {
    let renamed = match (kind, field) {
        (EntityKind::ActivityType, "name") => "atname",
        (EntityKind::ActivityType, "alias") => "at_alias",
        (EntityKind::Activity, "name") => "aname",
        (EntityKind::DayType, "color") => "day_type_color",
        (EntityKind::DayType, "name") => "day_type_name",
        (EntityKind::EmployeeType, "name") => "etname",
        (EntityKind::ColumnDefinition, "name") => "pcol_name",
        (EntityKind::ColumnDefinition, "units") => "pcol_units",
        (EntityKind::ColumnDefinition, "description") => "pcol_description",
        (EntityKind::PayrollColumnBin, "bin_from") => "pcol_bin_from",
        (EntityKind::PayrollColumnBin, "bin_to") => "pcol_bin_to",
        _ => field,
    };
    renamed.to_string()
}

fn constraint_violations(kind: EntityKind, index: usize, errors: &ValidationErrors) -> Vec<Violation> {
    let mut violations: Vec<Violation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = wire_name(kind, &field.to_string());
            errs.iter()
                .map(|e| {
                    let mut bounds: Vec<String> = e
                        .params
                        .iter()
                        .filter(|(name, _)| name.to_string() != "value")
                        .map(|(name, value)| format!("{}={}", name, value))
                        .collect();
                    bounds.sort();
                    let detail = if bounds.is_empty() {
                        e.code.to_string()
                    } else {
                        format!("{} ({})", e.code, bounds.join(", "))
                    };
                    Violation::at(kind, index, field.clone(), ViolationKind::FieldConstraint, detail)
                })
                .collect::<Vec<_>>()
        })
        .collect();
    violations.sort_by(|a, b| a.field.cmp(&b.field));
    violations
}

fn clock_violation(kind: EntityKind, index: usize, field: &str, value: &str) -> Violation {
    Violation::at(
        kind,
        index,
        field,
        ViolationKind::FieldConstraint,
        format!("{:?} is not HH:MM or HH:MM:SS", value),
    )
}

fn is_time_of_day(text: &str) -> bool {
    NaiveTime::parse_from_str(text, "%H:%M").is_ok()
        || NaiveTime::parse_from_str(text, "%H:%M:%S").is_ok()
}

/// `HH:MM` or `HH:MM:SS` where hours may exceed a day.
fn is_duration(text: &str) -> bool {
    let parts: Vec<&str> = text.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return false;
    }
    let numeric = |p: &str| p.len() >= 2 && p.chars().all(|c| c.is_ascii_digit());
    if !parts.iter().all(|p| numeric(p)) {
        return false;
    }
    parts[1..]
        .iter()
        .all(|p| p.len() == 2 && p.parse::<u32>().map(|v| v < 60).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::samples::{self, DAY_SECONDS};
    use crate::PipelineError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn full_validator() -> Validator {
        Validator::new(AggregateScope::Full)
    }

    #[test]
    fn test_samples_are_valid() {
        assert!(Validator::default()
            .validate(&samples::core_configuration())
            .unwrap()
            .is_valid());
        let report = full_validator().validate(&samples::full_configuration()).unwrap();
        assert_eq!(report, ValidationReport::valid());
    }

    #[test]
    fn test_duplicate_key_reported_once() {
        let mut set = samples::core_configuration();
        set.employee_types.push(samples::employee_type(1, "copy", 8));
        set.employee_types.push(samples::employee_type(1, "another copy", 8));

        let report = Validator::default().validate(&set).unwrap();
        let dups = report.of_kind(ViolationKind::DuplicateKey);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].entity, EntityKind::EmployeeType);
        assert_eq!(dups[0].record_index, Some(1));
        assert_eq!(dups[0].field, "etype");
    }

    #[test]
    fn test_sid_is_not_a_unique_key() {
        let mut set = samples::core_configuration();
        set.column_displays[1].sid = set.column_displays[0].sid;
        assert!(Validator::default().validate(&set).unwrap().is_valid());
    }

    #[test]
    fn test_binding_pair_uniqueness() {
        let mut set = samples::core_configuration();
        set.day_type_bindings.push(samples::day_type_binding(2, 1, 1, 3600));
        set.day_type_bindings.push(samples::day_type_binding(3, 1, 2, 3600));
        let report = Validator::default().validate(&set).unwrap();
        let dups = report.of_kind(ViolationKind::DuplicateKey);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].field, "etype,day_type_id");
        assert!(dups[0].detail.contains("(1, 1)"));
    }

    #[test]
    fn test_unresolved_display_etype() {
        let mut set = samples::core_configuration();
        set.column_displays.push(samples::column_display(3, 9, 100));
        let report = Validator::default().validate(&set).unwrap();
        let unresolved = report.of_kind(ViolationKind::UnresolvedReference);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].entity, EntityKind::ColumnDisplay);
        assert_eq!(unresolved[0].record_index, Some(2));
        assert_eq!(unresolved[0].field, "etype");
    }

    #[test]
    fn test_reference_tables_enable_out_of_scope_checks() {
        let set = samples::core_configuration();
        let mut refs = ReferenceKeys::new();
        refs.insert(EntityKind::ColumnDefinition, 100);

        let report = Validator::default().with_reference(refs).validate(&set).unwrap();
        let unresolved = report.of_kind(ViolationKind::UnresolvedReference);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].field, "pcol_number");
        assert_eq!(unresolved[0].record_index, Some(1));
    }

    #[test]
    fn test_full_scope_requires_resolvable_day_types() {
        let mut set = samples::full_configuration();
        set.day_types.clear();
        let report = full_validator().validate(&set).unwrap();
        // one binding and three bins point at day type 1
        assert_eq!(report.of_kind(ViolationKind::UnresolvedReference).len(), 4);
    }

    #[test]
    fn test_field_constraints_use_wire_names() {
        let mut set = samples::full_configuration();
        set.employee_types[0].name = String::new();
        set.employee_types[0].workday_start_time = "25:00".to_string();
        set.column_displays[0].show_col_order = -1;
        set.day_type_bindings[0].min_interval_between_shifts = "36:00".to_string();

        let report = full_validator().validate(&set).unwrap();
        let fields: Vec<(EntityKind, String)> = report
            .of_kind(ViolationKind::FieldConstraint)
            .into_iter()
            .map(|v| (v.entity, v.field.clone()))
            .collect();
        assert_eq!(
            fields,
            vec![
                (EntityKind::EmployeeType, "etname".to_string()),
                (EntityKind::EmployeeType, "workday_start_time".to_string()),
                (EntityKind::ColumnDisplay, "show_col_order".to_string()),
            ]
        );
    }

    #[test]
    fn test_bin_range_constraint() {
        let mut set = samples::full_configuration();
        set.payroll_bins[2].bin_to = 200_000;
        let report = full_validator().validate(&set).unwrap();
        let constraint = report.of_kind(ViolationKind::FieldConstraint);
        assert_eq!(constraint.len(), 1);
        assert_eq!(constraint[0].field, "pcol_bin_to");
        assert_eq!(report.of_kind(ViolationKind::BinEnd).len(), 1);
    }

    #[test]
    fn test_bins_use_configured_day_length() {
        let mut set = samples::full_configuration();
        set.payroll_bins[2].bin_to = 100_000;
        assert!(!full_validator().validate(&set).unwrap().is_valid());
        assert!(full_validator()
            .with_day_length(100_000)
            .validate(&set)
            .unwrap()
            .is_valid());
        assert_eq!(DEFAULT_DAY_LENGTH_SECONDS, DAY_SECONDS);
    }

    #[test]
    fn test_basic_etype() {
        let set = samples::core_configuration();
        let validator = Validator::default().with_basic_etype(Some(7));
        let report = validator.validate(&set).unwrap();
        assert_eq!(report.of_kind(ViolationKind::MissingBasicEmployeeType).len(), 1);
        assert_eq!(validator.basic_etype(&set), Some(7));

        let mut orphaned = samples::core_configuration();
        orphaned.employee_types.clear();
        let report = Validator::default().validate(&orphaned).unwrap();
        assert_eq!(report.of_kind(ViolationKind::MissingBasicEmployeeType).len(), 1);
        assert_eq!(Validator::default().basic_etype(&set), Some(1));
    }

    #[test]
    fn test_missing_registry_entity_is_an_error() {
        let validator = Validator::default()
            .with_registry(SchemaRegistry::subset(&[EntityKind::EmployeeType]));
        let err = validator.validate(&samples::core_configuration()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownEntity(_)));
    }

    #[test]
    fn test_validate_json_verdicts() {
        let validator = Validator::default();
        let doc = samples::core_configuration()
            .to_document(AggregateScope::Core)
            .unwrap();
        assert!(validator.validate_json(&doc).unwrap().is_valid());

        let verdict = validator.validate_json(&json!({"wt_employeetypes": []})).unwrap();
        let shape = match verdict {
            Verdict::ShapeInvalid(shape) => shape,
            other => panic!("expected shape failure, got {:?}", other),
        };
        assert_eq!(shape.violations.len(), 2);
        assert!(shape
            .violations
            .iter()
            .all(|v| v.kind == ViolationKind::MissingField));

        let mut dup = samples::core_configuration();
        dup.column_displays[1].etcd_id = 1;
        let doc = dup.to_document(AggregateScope::Core).unwrap();
        assert!(matches!(validator.validate_json(&doc).unwrap(), Verdict::Invalid(_)));
    }

    #[test]
    fn test_clock_formats() {
        assert!(is_time_of_day("07:30"));
        assert!(is_time_of_day("23:59:59"));
        assert!(!is_time_of_day("7.30"));
        assert!(is_duration("36:00"));
        assert!(is_duration("00:30:15"));
        assert!(!is_duration("10:75"));
        assert!(!is_duration("1:5"));
    }
}
