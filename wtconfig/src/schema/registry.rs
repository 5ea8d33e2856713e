//! Schema Registry
//!
//! Declares the fields of every entity with a coarse semantic type and
//! nullability, and checks raw JSON against those declarations. The check is
//! purely structural; keys, references and bins belong to the validator.

use super::aggregate::ConfigurationSet;
use super::entities::{AggregateScope, EntityKind};
use crate::error::{PipelineError, PipelineResult};
use crate::validation::{ShapeReport, Violation, ViolationKind};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Integer,
    String,
    Boolean,
    /// Any JSON value, null included.
    OptionalAny,
    /// A list whose items may be anything.
    ListOfAny,
}

impl SemanticType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            SemanticType::Integer => value.is_i64(),
            SemanticType::String => value.is_string(),
            SemanticType::Boolean => value.is_boolean(),
            SemanticType::OptionalAny => true,
            SemanticType::ListOfAny => value.is_array(),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SemanticType::Integer => "integer",
            SemanticType::String => "string",
            SemanticType::Boolean => "boolean",
            SemanticType::OptionalAny => "optional-any",
            SemanticType::ListOfAny => "list-of-any",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub semantic: SemanticType,
    pub nullable: bool,
}

const fn int(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        semantic: SemanticType::Integer,
        nullable: false,
    }
}

const fn opt_int(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        semantic: SemanticType::Integer,
        nullable: true,
    }
}

const fn string(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        semantic: SemanticType::String,
        nullable: false,
    }
}

const fn opt_string(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        semantic: SemanticType::String,
        nullable: true,
    }
}

const fn boolean(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        semantic: SemanticType::Boolean,
        nullable: false,
    }
}

const fn any(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        semantic: SemanticType::OptionalAny,
        nullable: true,
    }
}

const fn list(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        semantic: SemanticType::ListOfAny,
        nullable: false,
    }
}

const ACTIVITY_TYPE: &[FieldSpec] = &[int("sid"), int("atype"), string("atname"), any("at_alias")];

const ACTIVITY: &[FieldSpec] = &[
    int("sid"),
    int("aid"),
    int("atype"),
    int("billtype"),
    string("aname"),
    any("account_no"),
    string("activity_number"),
    int("status_code"),
    int("atype_subclass"),
    any("payroll_activity_code"),
    any("activity_color"),
    boolean("std_by_dow_dt"),
];

const DAY_TYPE: &[FieldSpec] = &[
    int("sid"),
    int("day_type_id"),
    string("day_type_color"),
    string("day_type_name"),
    boolean("for_planit"),
    boolean("for_budget"),
    boolean("shifts_templates_special_days"),
];

const EMPLOYEE_TYPE: &[FieldSpec] = &[
    int("sid"),
    int("etype"),
    string("etname"),
    any("std_hours_day"),
    any("std_hours_month"),
    any("std_hours_week"),
    any("sun"),
    any("mon"),
    any("tue"),
    any("wed"),
    any("thu"),
    any("fri"),
    any("sat"),
    string("workday_start_time"),
    any("percentage_job"),
    boolean("tsa_cols_p"),
    boolean("tsa_table"),
    int("hours_to_days_rate"),
    any("diff_ppid"),
    any("cut_by_pp_ppid"),
    boolean("need_app_rej_on_manual"),
    boolean("display_diff"),
    boolean("calc_3month_std_by_actual_days"),
    boolean("calc_3month_std_by_all_std_days"),
    int("allowed_delay_minutes"),
    boolean("display_day_wo_reporting"),
    boolean("hourly_agreement"),
];

const COLUMN_DEFINITION: &[FieldSpec] = &[
    int("sid"),
    int("pcol_number"),
    string("pcol_name"),
    int("pcol_units"),
    boolean("relevant_in_days"),
    boolean("relevant_in_hours"),
    list("manual_feed_daily_utype_list"),
    list("manual_feed_pp_utype_list"),
    boolean("manual_feed_daily_report_dependance"),
    boolean("daily_report_display_only"),
    boolean("is_break_pcol"),
    boolean("mf_report_display_only"),
    boolean("display_as_units"),
    boolean("for_calculate3monthstd"),
    boolean("overtime"),
    boolean("cont_vacation"),
    boolean("show_in_client_actuals"),
    string("external_pcol"),
    any("vacation_quota"),
    any("payroll_pcol"),
    boolean("std_by_dow_dt"),
    boolean("is_break_return_pcol"),
    any("pcol_description"),
    any("sickness_quota"),
];

const COLUMN_DISPLAY: &[FieldSpec] = &[
    int("sid"),
    int("etype"),
    int("pcol_number"),
    boolean("show_as_col"),
    int("show_col_order"),
    boolean("show_as_table"),
    boolean("show_as_row"),
    int("etcd_id"),
];

const DAY_TYPE_BINDING: &[FieldSpec] = &[
    int("sid"),
    int("etype"),
    int("day_type_id"),
    int("std"),
    any("break_pid_list"),
    any("break_pid2_list"),
    any("break_aid_list"),
    any("break_did_list"),
    any("break_lid_list"),
    any("break_cid_list"),
    any("break_from_hour"),
    any("break_to_hour"),
    opt_int("day_work_jgid"),
    int("day_part"),
    int("std_absence"),
    boolean("std_by_plan"),
    string("min_interval_between_shifts"),
    boolean("absence_wo_dt"),
];

const PAYROLL_COLUMN_BIN: &[FieldSpec] = &[
    int("sid"),
    int("etype"),
    int("day_type_id"),
    string("pcol_name"),
    int("pcol_bin_from"),
    int("pcol_bin_to"),
    boolean("per_job"),
    list("pid_list"),
    list("pid2_list"),
    list("aid_list"),
    list("did_list"),
    list("lid_list"),
    list("cid_list"),
    boolean("cmplt_diff"),
    int("pcol_diff_part"),
    int("hrs_return_amount"),
    boolean("hrs_return_absolute"),
    opt_int("job_min_hrs"),
    opt_int("job_max_hrs"),
    opt_string("time_from"),
    opt_string("time_to"),
    boolean("per_job_not_in"),
    list("atype_list"),
    int("special_back_to_bucket_part"),
    any("time_start_filter_from"),
    any("time_start_filter_to"),
    any("time_end_filter_from"),
    any("time_end_filter_to"),
    any("continuum_n_from"),
    any("continuum_n_to"),
    any("cut_by_pp_sum_pcol_number"),
    int("cut_by_pp_sum_from"),
    int("cut_by_pp_sum_to"),
    string("description"),
    any("count_reports_filter_from"),
    any("count_reports_filter_to"),
    any("season_ppid"),
    any("season_pp"),
    int("shift_num_filter"),
    any("total_hours_day_from"),
    any("total_hours_day_to"),
    any("total_work_hours_day_from"),
    any("total_work_hours_day_to"),
    any("first_rep_start_time_filter_from"),
    any("first_rep_start_time_filter_to"),
    boolean("add_to_basic_etype"),
    boolean("get_from_basic_etype"),
    boolean("no_display"),
    boolean("count_reports_filter_all_rows"),
    list("billtype_list"),
    int("etp_id"),
];

static BUILTIN: Lazy<SchemaRegistry> = Lazy::new(|| {
    let mut entities = BTreeMap::new();
    entities.insert(EntityKind::ActivityType, ACTIVITY_TYPE);
    entities.insert(EntityKind::Activity, ACTIVITY);
    entities.insert(EntityKind::DayType, DAY_TYPE);
    entities.insert(EntityKind::EmployeeType, EMPLOYEE_TYPE);
    entities.insert(EntityKind::ColumnDefinition, COLUMN_DEFINITION);
    entities.insert(EntityKind::ColumnDisplay, COLUMN_DISPLAY);
    entities.insert(EntityKind::DayTypeBinding, DAY_TYPE_BINDING);
    entities.insert(EntityKind::PayrollColumnBin, PAYROLL_COLUMN_BIN);
    SchemaRegistry { entities }
});

/// Field declarations for every configuration entity.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entities: BTreeMap<EntityKind, &'static [FieldSpec]>,
}

impl SchemaRegistry {
    pub fn builtin() -> &'static SchemaRegistry {
        &BUILTIN
    }

    /// Registry holding only `kinds`; lookups for anything else fail.
    pub fn subset(kinds: &[EntityKind]) -> SchemaRegistry {
        let entities = BUILTIN
            .entities
            .iter()
            .filter(|(k, _)| kinds.contains(k))
            .map(|(k, v)| (*k, *v))
            .collect();
        SchemaRegistry { entities }
    }

    /// Field specs of an entity, by entity name or list key.
    pub fn describe(&self, entity_name: &str) -> PipelineResult<&'static [FieldSpec]> {
        let kind = EntityKind::parse(entity_name)
            .ok_or_else(|| PipelineError::UnknownEntity(entity_name.to_string()))?;
        self.fields(kind)
    }

    pub fn fields(&self, kind: EntityKind) -> PipelineResult<&'static [FieldSpec]> {
        self.entities
            .get(&kind)
            .copied()
            .ok_or_else(|| PipelineError::UnknownEntity(kind.name().to_string()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.entities.keys().copied()
    }

    /// Structural check of a candidate aggregate document.
    ///
    /// Every list of `scope` must be present. Lists of other known entities
    /// are checked when present; unknown top-level keys are reported.
    pub fn validate_shape(
        &self,
        candidate: &Value,
        scope: AggregateScope,
    ) -> PipelineResult<ShapeReport> {
        let mut report = ShapeReport::default();
        let Some(doc) = candidate.as_object() else {
            report.push(Violation::new(
                EntityKind::Aggregate,
                None,
                "",
                ViolationKind::WrongType,
                format!("expected an object of entity lists, found {}", json_type(candidate)),
            ));
            return Ok(report);
        };

        for kind in scope.entities() {
            if !doc.contains_key(kind.list_key()) {
                report.push(Violation::new(
                    EntityKind::Aggregate,
                    None,
                    kind.list_key(),
                    ViolationKind::MissingField,
                    format!("{} list is required", kind),
                ));
            }
        }

        for key in doc.keys() {
            if !EntityKind::RECORDS.iter().any(|k| k.list_key() == key) {
                report.push(Violation::new(
                    EntityKind::Aggregate,
                    None,
                    key.as_str(),
                    ViolationKind::UnknownField,
                    "not an entity list",
                ));
            }
        }

        for kind in EntityKind::RECORDS {
            let Some(value) = doc.get(kind.list_key()) else {
                continue;
            };
            let Some(records) = value.as_array() else {
                report.push(Violation::new(
                    EntityKind::Aggregate,
                    None,
                    kind.list_key(),
                    ViolationKind::WrongType,
                    format!("expected a list, found {}", json_type(value)),
                ));
                continue;
            };
            let fields = self.fields(kind)?;
            for (index, record) in records.iter().enumerate() {
                check_record(kind, index, fields, record, &mut report);
            }
        }

        Ok(report)
    }

    /// JSON Schema of the aggregate restricted to the lists of `scope`.
    pub fn target_schema(&self, scope: AggregateScope) -> PipelineResult<Value> {
        let mut root = schemars::schema_for!(ConfigurationSet);
        if let Some(object) = root.schema.object.as_mut() {
            let in_scope: BTreeSet<&str> = scope.entities().iter().map(|k| k.list_key()).collect();
            object.properties.retain(|key, _| in_scope.contains(key.as_str()));
            object.required = in_scope.iter().map(|k| k.to_string()).collect();
        }
        Ok(serde_json::to_value(&root)?)
    }
}

fn check_record(
    kind: EntityKind,
    index: usize,
    fields: &[FieldSpec],
    record: &Value,
    report: &mut ShapeReport,
) {
    let Some(obj) = record.as_object() else {
        report.push(Violation::at(
            kind,
            index,
            "",
            ViolationKind::WrongType,
            format!("expected an object, found {}", json_type(record)),
        ));
        return;
    };

    for spec in fields {
        match obj.get(spec.name) {
            None if spec.nullable => {}
            None => report.push(Violation::at(
                kind,
                index,
                spec.name,
                ViolationKind::MissingField,
                format!("expected {}", spec.semantic),
            )),
            Some(Value::Null) if spec.nullable => {}
            Some(Value::Null) => report.push(Violation::at(
                kind,
                index,
                spec.name,
                ViolationKind::UnexpectedNull,
                format!("expected {}", spec.semantic),
            )),
            Some(value) if !spec.semantic.accepts(value) => report.push(Violation::at(
                kind,
                index,
                spec.name,
                ViolationKind::WrongType,
                format!("expected {}, found {}", spec.semantic, json_type(value)),
            )),
            Some(_) => {}
        }
    }

    for key in obj.keys() {
        if !fields.iter().any(|f| f.name == key) {
            report.push(Violation::at(
                kind,
                index,
                key.as_str(),
                ViolationKind::UnknownField,
                "",
            ));
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
