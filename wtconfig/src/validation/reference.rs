//! Keys known from read-only reference tables.
//!
//! Reference JSON documents (existing day types, column definitions, ...)
//! let the validator resolve foreign keys into lists that are not part of the
//! committed aggregate.

use crate::schema::{ConfigurationSet, EntityKind};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceKeys {
    keys: BTreeMap<EntityKind, BTreeSet<i64>>,
}

/// Field that identifies a record of `kind` for reference purposes.
pub fn key_field(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::ActivityType => Some("atype"),
        EntityKind::DayType => Some("day_type_id"),
        EntityKind::EmployeeType => Some("etype"),
        EntityKind::ColumnDefinition => Some("pcol_number"),
        _ => None,
    }
}

impl ReferenceKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Harvest keys from reference documents keyed by file name.
    ///
    /// A document may be an object of entity lists (`{"wt_day_types": [...]}`)
    /// or a bare list, in which case the file name names the entity.
    pub fn from_tables(tables: &BTreeMap<String, Value>) -> Self {
        let mut refs = ReferenceKeys::new();
        for (name, doc) in tables {
            match doc {
                Value::Object(lists) => {
                    for (key, list) in lists {
                        if let Some(kind) = EntityKind::parse(key) {
                            refs.harvest(kind, list);
                        }
                    }
                }
                Value::Array(_) => match EntityKind::parse(name) {
                    Some(kind) => refs.harvest(kind, doc),
                    None => debug!("reference table {} does not name an entity", name),
                },
                _ => debug!("reference table {} is neither a list nor an object", name),
            }
        }
        refs
    }

    fn harvest(&mut self, kind: EntityKind, list: &Value) {
        let (Some(field), Some(records)) = (key_field(kind), list.as_array()) else {
            return;
        };
        let found: Vec<i64> = records
            .iter()
            .filter_map(|r| r.get(field).and_then(Value::as_i64))
            .collect();
        debug!("reference keys: {} {} value(s) for {}", found.len(), field, kind);
        self.keys.entry(kind).or_default().extend(found);
    }

    pub fn insert(&mut self, kind: EntityKind, key: i64) {
        self.keys.entry(kind).or_default().insert(key);
    }

    pub fn get(&self, kind: EntityKind) -> Option<&BTreeSet<i64>> {
        self.keys.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.values().all(|k| k.is_empty())
    }
}

/// Resolvable key domains for one validation run.
///
/// A domain is known when its list belongs to the aggregate scope or a
/// reference table supplied keys for it; unknown domains are not checked.
#[derive(Debug, Clone, Default)]
pub(crate) struct KeyCatalog {
    domains: BTreeMap<EntityKind, BTreeSet<i64>>,
}

impl KeyCatalog {
    pub(crate) fn build(
        set: &ConfigurationSet,
        in_scope: impl Fn(EntityKind) -> bool,
        reference: &ReferenceKeys,
    ) -> Self {
        let own = |kind: EntityKind| -> BTreeSet<i64> {
            match kind {
                EntityKind::ActivityType => set.activity_types.iter().map(|r| r.atype).collect(),
                EntityKind::DayType => set.day_types.iter().map(|r| r.day_type_id).collect(),
                EntityKind::EmployeeType => set.employee_types.iter().map(|r| r.etype).collect(),
                EntityKind::ColumnDefinition => {
                    set.column_definitions.iter().map(|r| r.pcol_number).collect()
                }
                _ => BTreeSet::new(),
            }
        };

        let mut domains = BTreeMap::new();
        for kind in [
            EntityKind::ActivityType,
            EntityKind::DayType,
            EntityKind::EmployeeType,
            EntityKind::ColumnDefinition,
        ] {
            let external = reference.get(kind);
            if in_scope(kind) || external.is_some() {
                let mut keys = own(kind);
                if let Some(ext) = external {
                    keys.extend(ext.iter().copied());
                }
                domains.insert(kind, keys);
            }
        }
        Self { domains }
    }

    /// `Some(true|false)` when the domain is known, `None` when it cannot be checked.
    pub(crate) fn resolves(&self, kind: EntityKind, key: i64) -> Option<bool> {
        self.domains.get(&kind).map(|keys| keys.contains(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::samples;
    use serde_json::json;

    #[test]
    fn test_from_tables_reads_wrapped_and_bare_lists() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "wt_day_types.json".to_string(),
            json!({"wt_day_types": [{"day_type_id": 1}, {"day_type_id": 5}]}),
        );
        tables.insert(
            "wt_et_cols_defs.json".to_string(),
            json!([{"pcol_number": 100}, {"pcol_number": "bad"}]),
        );
        tables.insert("notes.json".to_string(), json!([{"x": 1}]));

        let refs = ReferenceKeys::from_tables(&tables);
        assert_eq!(
            refs.get(EntityKind::DayType).unwrap().iter().copied().collect::<Vec<_>>(),
            vec![1, 5]
        );
        assert_eq!(refs.get(EntityKind::ColumnDefinition).unwrap().len(), 1);
        assert!(refs.get(EntityKind::ActivityType).is_none());
    }

    #[test]
    fn test_catalog_skips_unknown_domains() {
        let set = samples::core_configuration();
        let catalog = KeyCatalog::build(&set, |k| k == EntityKind::EmployeeType, &ReferenceKeys::new());
        assert_eq!(catalog.resolves(EntityKind::EmployeeType, 1), Some(true));
        assert_eq!(catalog.resolves(EntityKind::EmployeeType, 2), Some(false));
        assert_eq!(catalog.resolves(EntityKind::DayType, 1), None);

        let mut refs = ReferenceKeys::new();
        refs.insert(EntityKind::DayType, 1);
        let catalog = KeyCatalog::build(&set, |k| k == EntityKind::EmployeeType, &refs);
        assert_eq!(catalog.resolves(EntityKind::DayType, 1), Some(true));
        assert_eq!(catalog.resolves(EntityKind::DayType, 2), Some(false));
    }
}
