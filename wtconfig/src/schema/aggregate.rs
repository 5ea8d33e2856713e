//! The configuration aggregate and its canonical comparison.

use super::entities::*;
use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One customer's configuration: every entity list the engine reads.
///
/// Lists outside the active [`AggregateScope`] are still modeled here so a
/// full-scope generation can carry them; the persister decides what is
/// committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConfigurationSet {
    #[serde(rename = "wt_employeetypes", default)]
    pub employee_types: Vec<EmployeeType>,
    #[serde(rename = "wt_et_cols_display", default)]
    pub column_displays: Vec<ColumnDisplay>,
    #[serde(rename = "wt_et_dt", default)]
    pub day_type_bindings: Vec<DayTypeBinding>,
    #[serde(rename = "wt_activitytypes", default)]
    pub activity_types: Vec<ActivityType>,
    #[serde(rename = "wt_activities", default)]
    pub activities: Vec<Activity>,
    #[serde(rename = "wt_day_types", default)]
    pub day_types: Vec<DayType>,
    #[serde(rename = "wt_et_cols_defs", default)]
    pub column_definitions: Vec<ColumnDefinition>,
    #[serde(rename = "wt_et_pcols", default)]
    pub payroll_bins: Vec<PayrollColumnBin>,
}

impl ConfigurationSet {
    pub fn len_of(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Aggregate => 1,
            EntityKind::ActivityType => self.activity_types.len(),
            EntityKind::Activity => self.activities.len(),
            EntityKind::DayType => self.day_types.len(),
            EntityKind::EmployeeType => self.employee_types.len(),
            EntityKind::ColumnDefinition => self.column_definitions.len(),
            EntityKind::ColumnDisplay => self.column_displays.len(),
            EntityKind::DayTypeBinding => self.day_type_bindings.len(),
            EntityKind::PayrollColumnBin => self.payroll_bins.len(),
        }
    }

    /// Entity kinds that hold at least one record but fall outside `scope`.
    pub fn out_of_scope(&self, scope: AggregateScope) -> Vec<EntityKind> {
        EntityKind::RECORDS
            .iter()
            .copied()
            .filter(|k| !scope.includes(*k) && self.len_of(*k) > 0)
            .collect()
    }

    /// A copy holding only the lists of `scope`.
    pub fn restricted_to(&self, scope: AggregateScope) -> ConfigurationSet {
        let keep = |kind: EntityKind| scope.includes(kind);
        ConfigurationSet {
            employee_types: self.employee_types.clone(),
            column_displays: self.column_displays.clone(),
            day_type_bindings: self.day_type_bindings.clone(),
            activity_types: if keep(EntityKind::ActivityType) {
                self.activity_types.clone()
            } else {
                Vec::new()
            },
            activities: if keep(EntityKind::Activity) {
                self.activities.clone()
            } else {
                Vec::new()
            },
            day_types: if keep(EntityKind::DayType) {
                self.day_types.clone()
            } else {
                Vec::new()
            },
            column_definitions: if keep(EntityKind::ColumnDefinition) {
                self.column_definitions.clone()
            } else {
                Vec::new()
            },
            payroll_bins: if keep(EntityKind::PayrollColumnBin) {
                self.payroll_bins.clone()
            } else {
                Vec::new()
            },
        }
    }

    /// JSON document with exactly the list keys of `scope`.
    pub fn to_document(&self, scope: AggregateScope) -> Result<Value, serde_json::Error> {
        let full = serde_json::to_value(self)?;
        let mut doc = Map::new();
        if let Value::Object(mut lists) = full {
            for kind in scope.entities() {
                let key = kind.list_key();
                let list = lists.remove(key).unwrap_or(Value::Array(Vec::new()));
                doc.insert(key.to_string(), list);
            }
        }
        Ok(Value::Object(doc))
    }

    /// Deep equality where list order does not matter at any depth.
    pub fn structurally_equal(&self, other: &ConfigurationSet) -> bool {
        match (serde_json::to_value(self), serde_json::to_value(other)) {
            (Ok(a), Ok(b)) => canonicalize(a) == canonicalize(b),
            _ => false,
        }
    }
}

/// Largest magnitude below which every integral `f64` is an exact integer.
const EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Normal form for order-insensitive comparison: arrays are sorted by the
/// encoding of their canonicalized elements, integral floats become integers
/// (`8.0` equals `8`). Object keys are already ordered.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= EXACT_FLOAT_INT => Value::from(f as i64),
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(canonicalize)
                .sorted_by_key(|v| v.to_string())
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{samples, DynValue};
    use serde_json::json;

    fn display(etcd_id: i64, etype: i64, pcol_number: i64) -> ColumnDisplay {
        ColumnDisplay {
            sid: etcd_id,
            etype,
            pcol_number,
            show_as_col: true,
            show_col_order: 1,
            show_as_table: false,
            show_as_row: false,
            etcd_id,
        }
    }

    #[test]
    fn test_canonicalize_ignores_array_order_at_any_depth() {
        let a = json!({"x": [3, 1, 2], "y": [{"l": ["b", "a"]}, {"l": []}]});
        let b = json!({"y": [{"l": []}, {"l": ["a", "b"]}], "x": [1, 2, 3]});
        assert_eq!(canonicalize(a), canonicalize(b));
    }

    #[test]
    fn test_structural_equality_is_order_insensitive() {
        let first = ConfigurationSet {
            column_displays: vec![display(1, 1, 10), display(2, 1, 11)],
            ..Default::default()
        };
        let second = ConfigurationSet {
            column_displays: vec![display(2, 1, 11), display(1, 1, 10)],
            ..Default::default()
        };
        assert!(first.structurally_equal(&second));

        let third = ConfigurationSet {
            column_displays: vec![display(2, 1, 12), display(1, 1, 10)],
            ..Default::default()
        };
        assert!(!first.structurally_equal(&third));
    }

    #[test]
    fn test_integral_floats_compare_equal_to_integers() {
        assert_eq!(canonicalize(json!([8.0, 1])), canonicalize(json!([1, 8])));
        assert_ne!(canonicalize(json!(8.5)), canonicalize(json!(8)));

        let whole = ConfigurationSet {
            employee_types: vec![samples::employee_type(1, "standard", 8)],
            ..Default::default()
        };
        let mut float = whole.clone();
        float.employee_types[0].std_hours_day = Some(DynValue::from(8.0));
        assert!(whole.structurally_equal(&float));

        float.employee_types[0].std_hours_day = Some(DynValue::from(8.5));
        assert!(!whole.structurally_equal(&float));
    }

    #[test]
    fn test_core_document_has_only_core_keys() {
        let set = ConfigurationSet {
            column_displays: vec![display(1, 1, 10)],
            ..Default::default()
        };
        let doc = set.to_document(AggregateScope::Core).unwrap();
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        assert!(doc.get("wt_et_cols_display").is_some());
        assert!(doc.get("wt_et_pcols").is_none());

        let full = set.to_document(AggregateScope::Full).unwrap();
        assert_eq!(full.as_object().unwrap().len(), 8);
    }
}
