mod common;

use chrono::Weekday;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use wtconfig::generator::{GeneratorResponse, ScriptedGenerator};
use wtconfig::schema::{AggregateScope, DynValue};
use wtconfig::validation::ViolationKind;
use wtconfig::{FilePersister, GenerationAdapter, Persister, PipelineError, Validator, Verdict};

#[tokio::test]
async fn test_employee_type_x_is_synthesized_and_valid() {
    let generator = Arc::new(ScriptedGenerator::new(vec![GeneratorResponse::Text(
        format!("```json\n{}\n```", common::employee_x_document()),
    )]));
    let context = common::context();
    let set = common::adapter(generator.clone())
        .synthesize(&context)
        .await
        .unwrap();

    assert_eq!(set.employee_types.len(), 1);
    let x = &set.employee_types[0];
    assert_eq!(x.name, "X");
    assert_eq!(x.std_hours_day, Some(DynValue::Int(8)));
    for day in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
        assert!(x.works_on(day), "{:?} should be a work day", day);
    }
    assert!(!x.works_on(Weekday::Sat));
    assert!(!x.works_on(Weekday::Sun));

    let verdict = Validator::default()
        .with_reference(context.reference_keys())
        .validate_json(&set.to_document(AggregateScope::Core).unwrap())
        .unwrap();
    assert!(matches!(verdict, Verdict::Valid(_)));

    let request = &generator.calls()[0];
    assert!(request.prompt.contains("X,8,Monday-Friday"));
    assert!(request.prompt.contains("=== REFERENCE (read-only): wt_day_types.json ==="));
}

#[tokio::test]
async fn test_generated_set_round_trips_through_persister() {
    let generator = Arc::new(ScriptedGenerator::new(vec![GeneratorResponse::Structured(
        common::employee_x_document(),
    )]));
    let context = common::context();
    let set = common::adapter(generator).synthesize(&context).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let persister = FilePersister::new(
        dir.path().join("config.json"),
        Validator::default().with_reference(context.reference_keys()),
    );
    let handle = persister.save(&set).unwrap();
    let loaded = persister.load(&handle).unwrap();
    assert!(loaded.structurally_equal(&set));
}

#[tokio::test]
async fn test_reference_tables_catch_unknown_day_type() {
    let mut doc = common::employee_x_document();
    doc["wt_et_dt"][0]["day_type_id"] = serde_json::json!(7);
    let generator = Arc::new(ScriptedGenerator::new(vec![GeneratorResponse::Structured(doc)]));

    let err = common::adapter(generator)
        .synthesize(&common::context())
        .await
        .unwrap_err();
    let report = err.report().unwrap();
    let unresolved = report.of_kind(ViolationKind::UnresolvedReference);
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].field, "day_type_id");
}

#[tokio::test]
async fn test_wrong_field_type_is_a_conformance_error() {
    let mut doc = common::employee_x_document();
    doc["wt_employeetypes"][0]["hours_to_days_rate"] = serde_json::json!("eight");
    let generator = Arc::new(ScriptedGenerator::new(vec![GeneratorResponse::Structured(doc)]));

    let err = common::adapter(generator)
        .synthesize(&common::context())
        .await
        .unwrap_err();
    match err {
        PipelineError::SchemaConformance { report } => {
            assert_eq!(report.violations.len(), 1);
            assert_eq!(report.violations[0].kind, ViolationKind::WrongType);
            assert_eq!(report.violations[0].field, "hours_to_days_rate");
        }
        other => panic!("expected a schema conformance error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_generator_times_out() {
    let generator = Arc::new(
        ScriptedGenerator::new(vec![GeneratorResponse::Structured(
            common::employee_x_document(),
        )])
        .with_delay(Duration::from_secs(2)),
    );
    let adapter = GenerationAdapter::new(generator, Validator::default(), Duration::from_millis(50));
    let err = adapter.synthesize(&common::context()).await.unwrap_err();
    assert!(matches!(err, PipelineError::GenerationTimeout { timeout } if timeout == Duration::from_millis(50)));
}
