#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use wtconfig::generator::{GeneratorResponse, ScriptedGenerator};
use wtconfig::schema::AggregateScope;
use wtconfig::{ConfigurationSet, ContextAssembler, GenerationAdapter, GenerationContext, Validator};

pub const RULES: &str = "\
Every row of the requirements file describes one employee type.
A standard employee type works `hours` hours a day on the days listed in `days`.
Days not listed are days off.";

pub const REQUIREMENTS: &str = "\
employee_type,hours,days
X,8,Monday-Friday
";

pub fn reference_tables() -> BTreeMap<String, Value> {
    let mut tables = BTreeMap::new();
    tables.insert(
        "wt_day_types.json".to_string(),
        json!({"wt_day_types": [{"day_type_id": 1, "day_type_name": "regular"}]}),
    );
    tables.insert(
        "wt_et_cols_defs.json".to_string(),
        json!([
            {"pcol_number": 100, "pcol_name": "regular hours"},
            {"pcol_number": 125, "pcol_name": "overtime 125%"}
        ]),
    );
    tables
}

pub fn context() -> GenerationContext {
    ContextAssembler::new()
        .assemble(RULES, REQUIREMENTS, reference_tables())
        .expect("context")
}

pub fn adapter(generator: Arc<ScriptedGenerator>) -> GenerationAdapter {
    GenerationAdapter::new(generator, Validator::default(), Duration::from_secs(5))
}

pub fn structured(set: &ConfigurationSet) -> GeneratorResponse {
    GeneratorResponse::Structured(set.to_document(AggregateScope::Core).expect("document"))
}

/// What a generator answers for the "X works 8h Monday to Friday" requirement,
/// written the way the engine names its columns.
pub fn employee_x_document() -> Value {
    json!({
        "wt_employeetypes": [{
            "sid": 1,
            "etype": 1,
            "etname": "X",
            "std_hours_day": 8,
            "std_hours_month": null,
            "std_hours_week": 40,
            "sun": false,
            "mon": true,
            "tue": true,
            "wed": true,
            "thu": true,
            "fri": true,
            "sat": false,
            "workday_start_time": "00:00",
            "percentage_job": null,
            "tsa_cols_p": false,
            "tsa_table": false,
            "hours_to_days_rate": 8,
            "diff_ppid": null,
            "cut_by_pp_ppid": null,
            "need_app_rej_on_manual": false,
            "display_diff": true,
            "calc_3month_std_by_actual_days": false,
            "calc_3month_std_by_all_std_days": false,
            "allowed_delay_minutes": 0,
            "display_day_wo_reporting": false,
            "hourly_agreement": false
        }],
        "wt_et_cols_display": [{
            "sid": 1,
            "etype": 1,
            "pcol_number": 100,
            "show_as_col": true,
            "show_col_order": 1,
            "show_as_table": false,
            "show_as_row": false,
            "etcd_id": 1
        }],
        "wt_et_dt": [{
            "sid": 1,
            "etype": 1,
            "day_type_id": 1,
            "std": 28800,
            "break_pid_list": null,
            "break_pid2_list": null,
            "break_aid_list": [],
            "break_did_list": null,
            "break_lid_list": null,
            "break_cid_list": null,
            "break_from_hour": null,
            "break_to_hour": null,
            "day_work_jgid": null,
            "day_part": 0,
            "std_absence": 28800,
            "std_by_plan": false,
            "min_interval_between_shifts": "00:00",
            "absence_wo_dt": false
        }]
    })
}
