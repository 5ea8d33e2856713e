use pretty_assertions::assert_eq;
use wtconfig::schema::{samples, DynValue};
use wtconfig::{AggregateScope, ConfigurationSet, FilePersister, Persister, Validator};

fn round_trip(set: &ConfigurationSet, scope: AggregateScope) -> ConfigurationSet {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let handle = FilePersister::new(&path, Validator::new(scope)).save(set).unwrap();
    // A fresh persister has no memory of what was saved.
    FilePersister::new(&path, Validator::new(scope))
        .load(&handle)
        .unwrap()
}

#[test]
fn test_core_set_survives_save_and_load() {
    let set = samples::core_configuration();
    let loaded = round_trip(&set, AggregateScope::Core);
    assert!(loaded.structurally_equal(&set));
    assert_eq!(loaded, set);
}

#[test]
fn test_full_set_survives_save_and_load() {
    let mut set = samples::full_configuration();
    set.payroll_bins.reverse();
    set.payroll_bins[0].pid_list = vec![DynValue::Int(1), DynValue::Int(2)];
    let loaded = round_trip(&set, AggregateScope::Full);
    assert!(loaded.structurally_equal(&set));
    assert_eq!(loaded.payroll_bins.len(), 3);
}

#[test]
fn test_core_scope_drops_other_lists() {
    let set = samples::full_configuration();
    let loaded = round_trip(&set, AggregateScope::Core);
    assert!(loaded.structurally_equal(&set.restricted_to(AggregateScope::Core)));
    assert!(loaded.payroll_bins.is_empty());
    assert!(loaded.day_types.is_empty());
}

#[test]
fn test_saving_twice_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let persister = FilePersister::new(dir.path().join("config.json"), Validator::default());
    let first = persister.save(&samples::core_configuration()).unwrap();
    let second = persister.save(&samples::core_configuration()).unwrap();
    assert_eq!(first.sha256, second.sha256);
}

#[test]
fn test_large_unsigned_values_are_not_rounded() {
    let mut set = samples::core_configuration();
    set.employee_types[0].percentage_job = Some(DynValue::UInt(u64::MAX));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let persister = FilePersister::new(&path, Validator::default());
    let handle = persister.save(&set).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"percentage_job\": 18446744073709551615"));
    let loaded = persister.load(&handle).unwrap();
    assert_eq!(
        loaded.employee_types[0].percentage_job,
        Some(DynValue::UInt(u64::MAX))
    );
}
