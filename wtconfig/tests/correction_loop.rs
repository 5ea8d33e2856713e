mod common;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use wtconfig::generator::{GeneratorResponse, ScriptedGenerator};
use wtconfig::persist::load_rules;
use wtconfig::schema::{samples, DynValue};
use wtconfig::session::FileRulesStore;
use wtconfig::{ConfigurationSet, CorrectionLoop, Session};

fn wrong_hours() -> ConfigurationSet {
    let mut set = samples::core_configuration();
    set.employee_types[0] = samples::employee_type(1, "standard", 6);
    set
}

#[tokio::test]
async fn test_matching_configuration_needs_no_generator_calls() {
    let expected = samples::core_configuration();
    let generator = Arc::new(ScriptedGenerator::new(Vec::new()));
    let session = Session::in_memory(common::RULES);

    let outcome = CorrectionLoop::new(common::adapter(generator.clone()))
        .correct(&session, &common::context(), &expected, expected.clone(), 3)
        .await
        .unwrap();

    assert!(outcome.converged);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.rules, common::RULES);
    assert_eq!(generator.call_count(), 0);
    assert!(session.history().await.is_empty());
}

#[tokio::test]
async fn test_float_hours_match_integer_hours() {
    let expected = samples::core_configuration();
    let mut actual = expected.clone();
    actual.employee_types[0].std_hours_day = Some(DynValue::from(8.0));
    actual.employee_types[0].std_hours_week = Some(DynValue::from(40.0));
    let generator = Arc::new(ScriptedGenerator::new(Vec::new()));

    let outcome = CorrectionLoop::new(common::adapter(generator.clone()))
        .correct(
            &Session::in_memory(common::RULES),
            &common::context(),
            &expected,
            actual,
            3,
        )
        .await
        .unwrap();

    assert!(outcome.converged);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_budget_exhausted_keeps_last_revision_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.txt");
    let max_iterations = 3;

    let mut responses = Vec::new();
    for i in 1..=max_iterations {
        responses.push(GeneratorResponse::Text(format!("rules revision {}", i)));
        responses.push(common::structured(&wrong_hours()));
    }
    let generator = Arc::new(ScriptedGenerator::new(responses));
    let session = Session::new(common::RULES, Arc::new(FileRulesStore::new(&rules_path)));

    let outcome = CorrectionLoop::new(common::adapter(generator.clone()))
        .correct(
            &session,
            &common::context(),
            &samples::core_configuration(),
            wrong_hours(),
            max_iterations,
        )
        .await
        .unwrap();

    assert!(!outcome.converged);
    assert_eq!(outcome.iterations, max_iterations);
    assert_eq!(generator.call_count(), 2 * max_iterations);
    assert_eq!(outcome.rules, "rules revision 3");
    assert_eq!(load_rules(&rules_path).unwrap(), "rules revision 3\n");
    assert_eq!(session.history().await.len(), max_iterations);
}

#[tokio::test]
async fn test_revision_prompt_carries_both_configurations() {
    let expected = samples::core_configuration();
    let generator = Arc::new(ScriptedGenerator::new(vec![
        GeneratorResponse::Text("```\nrules that say 8 hours\n```".into()),
        common::structured(&expected),
    ]));
    let session = Session::in_memory(common::RULES);

    let outcome = CorrectionLoop::new(common::adapter(generator.clone()))
        .correct(&session, &common::context(), &expected, wrong_hours(), 2)
        .await
        .unwrap();

    assert!(outcome.converged);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.rules, "rules that say 8 hours");

    let calls = generator.calls();
    assert!(calls[0].prompt.contains(common::RULES));
    assert!(calls[0].target_schema.is_none());
    assert!(calls[1].prompt.contains("rules that say 8 hours"));
    assert!(!calls[1].prompt.contains(common::RULES));
}
