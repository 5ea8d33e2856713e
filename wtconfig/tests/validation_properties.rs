mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use wtconfig::schema::{samples, EntityKind};
use wtconfig::validation::ViolationKind;
use wtconfig::{AggregateScope, ValidationReport, Validator, Verdict};

fn invalid(verdict: Verdict) -> ValidationReport {
    match verdict {
        Verdict::Invalid(report) => report,
        Verdict::Valid(_) => panic!("expected violations, document was valid"),
        Verdict::ShapeInvalid(report) => panic!("expected invariant violations, got {}", report),
    }
}

#[test]
fn test_generated_document_with_repeated_etype() {
    let mut doc = common::employee_x_document();
    let mut twin = doc["wt_employeetypes"][0].clone();
    twin["sid"] = json!(2);
    twin["etname"] = json!("X (copy)");
    doc["wt_employeetypes"].as_array_mut().unwrap().push(twin);

    let report = invalid(Validator::default().validate_json(&doc).unwrap());
    let duplicates = report.of_kind(ViolationKind::DuplicateKey);
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].entity, EntityKind::EmployeeType);
    assert_eq!(duplicates[0].record_index, Some(1));
    assert_eq!(duplicates[0].field, "etype");
}

#[test]
fn test_display_for_unknown_employee_type() {
    let mut doc = common::employee_x_document();
    doc["wt_et_cols_display"][0]["etype"] = json!(2);

    let report = invalid(Validator::default().validate_json(&doc).unwrap());
    assert_eq!(report.violations.len(), 1);
    let v = &report.violations[0];
    assert_eq!(v.entity, EntityKind::ColumnDisplay);
    assert_eq!(v.kind, ViolationKind::UnresolvedReference);
    assert_eq!(v.field, "etype");
}

#[test]
fn test_contiguous_bins_accepted() {
    let set = samples::full_configuration();
    let doc = set.to_document(AggregateScope::Full).unwrap();
    let verdict = Validator::new(AggregateScope::Full).validate_json(&doc).unwrap();
    assert!(verdict.is_valid());
}

#[test]
fn test_bins_with_a_gap_rejected() {
    let mut set = samples::full_configuration();
    // 8h..10h becomes 8h30..10h
    set.payroll_bins[1].bin_from = 8 * 3600 + 1800;
    let doc = set.to_document(AggregateScope::Full).unwrap();

    let report = invalid(Validator::new(AggregateScope::Full).validate_json(&doc).unwrap());
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].kind, ViolationKind::BinGap);
    assert_eq!(report.violations[0].record_index, Some(1));
}

#[test]
fn test_bins_short_of_the_day_rejected() {
    let mut set = samples::full_configuration();
    set.payroll_bins[2].bin_to = 20 * 3600;
    let doc = set.to_document(AggregateScope::Full).unwrap();

    let report = invalid(Validator::new(AggregateScope::Full).validate_json(&doc).unwrap());
    assert_eq!(report.of_kind(ViolationKind::BinEnd).len(), 1);

    // The same bins tile a 20h day.
    let verdict = Validator::new(AggregateScope::Full)
        .with_day_length(20 * 3600)
        .validate_json(&doc)
        .unwrap();
    assert!(verdict.is_valid());
}
