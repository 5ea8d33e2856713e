//! Configuration entities consumed by the time-management engine.
//!
//! Field names follow the engine's column names on the wire (`etname`,
//! `pcol_bin_from`, ...). Records are plain values: nothing in the pipeline
//! patches a record in place, a new set is produced instead.

use super::value::DynValue;
use chrono::Weekday;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Kinds of records held by a configuration set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// The aggregate document itself (top-level keys).
    Aggregate,
    ActivityType,
    Activity,
    DayType,
    EmployeeType,
    ColumnDefinition,
    ColumnDisplay,
    DayTypeBinding,
    PayrollColumnBin,
}

impl EntityKind {
    /// Every record kind, in dependency order (referenced kinds first).
    pub const RECORDS: [EntityKind; 8] = [
        EntityKind::ActivityType,
        EntityKind::Activity,
        EntityKind::DayType,
        EntityKind::EmployeeType,
        EntityKind::ColumnDefinition,
        EntityKind::ColumnDisplay,
        EntityKind::DayTypeBinding,
        EntityKind::PayrollColumnBin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Aggregate => "ConfigurationSet",
            EntityKind::ActivityType => "ActivityType",
            EntityKind::Activity => "Activity",
            EntityKind::DayType => "DayType",
            EntityKind::EmployeeType => "EmployeeType",
            EntityKind::ColumnDefinition => "ColumnDefinition",
            EntityKind::ColumnDisplay => "ColumnDisplay",
            EntityKind::DayTypeBinding => "DayTypeBinding",
            EntityKind::PayrollColumnBin => "PayrollColumnBin",
        }
    }

    /// Top-level key of this entity's list in the persisted document.
    pub fn list_key(&self) -> &'static str {
        match self {
            EntityKind::Aggregate => "",
            EntityKind::ActivityType => "wt_activitytypes",
            EntityKind::Activity => "wt_activities",
            EntityKind::DayType => "wt_day_types",
            EntityKind::EmployeeType => "wt_employeetypes",
            EntityKind::ColumnDefinition => "wt_et_cols_defs",
            EntityKind::ColumnDisplay => "wt_et_cols_display",
            EntityKind::DayTypeBinding => "wt_et_dt",
            EntityKind::PayrollColumnBin => "wt_et_pcols",
        }
    }

    /// Resolve either an entity name (`EmployeeType`) or a list key (`wt_employeetypes`).
    pub fn parse(name: &str) -> Option<EntityKind> {
        let trimmed = name.trim().trim_end_matches(".json");
        Self::RECORDS
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(trimmed) || k.list_key() == trimmed)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which entity lists make up the committed aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateScope {
    /// Employee types, column displays and day-type bindings.
    #[default]
    Core,
    /// Every modeled entity list, payroll column bins included.
    Full,
}

impl AggregateScope {
    pub fn entities(&self) -> &'static [EntityKind] {
        const CORE: [EntityKind; 3] = [
            EntityKind::EmployeeType,
            EntityKind::ColumnDisplay,
            EntityKind::DayTypeBinding,
        ];
        match self {
            AggregateScope::Core => &CORE,
            AggregateScope::Full => &EntityKind::RECORDS,
        }
    }

    pub fn includes(&self, kind: EntityKind) -> bool {
        self.entities().contains(&kind)
    }
}

/// wt_activitytypes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ActivityType {
    pub sid: i64,
    pub atype: i64,
    #[serde(rename = "atname")]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "at_alias", default)]
    pub alias: Option<DynValue>,
}

/// wt_activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct Activity {
    pub sid: i64,
    pub aid: i64,
    pub atype: i64,
    pub billtype: i64,
    #[serde(rename = "aname")]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub account_no: Option<DynValue>,
    pub activity_number: String,
    pub status_code: i64,
    pub atype_subclass: i64,
    #[serde(default)]
    pub payroll_activity_code: Option<DynValue>,
    #[serde(default)]
    pub activity_color: Option<DynValue>,
    pub std_by_dow_dt: bool,
}

/// wt_day_types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct DayType {
    pub sid: i64,
    pub day_type_id: i64,
    #[serde(rename = "day_type_color")]
    pub color: String,
    #[serde(rename = "day_type_name")]
    #[validate(length(min = 1))]
    pub name: String,
    pub for_planit: bool,
    pub for_budget: bool,
    pub shifts_templates_special_days: bool,
}

/// wt_employeetypes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct EmployeeType {
    pub sid: i64,
    pub etype: i64,
    #[serde(rename = "etname")]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub std_hours_day: Option<DynValue>,
    #[serde(default)]
    pub std_hours_month: Option<DynValue>,
    #[serde(default)]
    pub std_hours_week: Option<DynValue>,
    #[serde(default)]
    pub sun: Option<DynValue>,
    #[serde(default)]
    pub mon: Option<DynValue>,
    #[serde(default)]
    pub tue: Option<DynValue>,
    #[serde(default)]
    pub wed: Option<DynValue>,
    #[serde(default)]
    pub thu: Option<DynValue>,
    #[serde(default)]
    pub fri: Option<DynValue>,
    #[serde(default)]
    pub sat: Option<DynValue>,
    pub workday_start_time: String,
    #[serde(default)]
    pub percentage_job: Option<DynValue>,
    pub tsa_cols_p: bool,
    pub tsa_table: bool,
    #[validate(range(min = 0))]
    pub hours_to_days_rate: i64,
    #[serde(default)]
    pub diff_ppid: Option<DynValue>,
    #[serde(default)]
    pub cut_by_pp_ppid: Option<DynValue>,
    pub need_app_rej_on_manual: bool,
    pub display_diff: bool,
    pub calc_3month_std_by_actual_days: bool,
    pub calc_3month_std_by_all_std_days: bool,
    #[validate(range(min = 0))]
    pub allowed_delay_minutes: i64,
    pub display_day_wo_reporting: bool,
    pub hourly_agreement: bool,
}

impl EmployeeType {
    pub fn weekday_flag(&self, day: Weekday) -> Option<&DynValue> {
        match day {
            Weekday::Sun => self.sun.as_ref(),
            Weekday::Mon => self.mon.as_ref(),
            Weekday::Tue => self.tue.as_ref(),
            Weekday::Wed => self.wed.as_ref(),
            Weekday::Thu => self.thu.as_ref(),
            Weekday::Fri => self.fri.as_ref(),
            Weekday::Sat => self.sat.as_ref(),
        }
    }

    /// True when the flag for `day` is set (`true`, or a non-zero number).
    pub fn works_on(&self, day: Weekday) -> bool {
        match self.weekday_flag(day) {
            Some(DynValue::Bool(b)) => *b,
            Some(v) => v.as_i64().map(|i| i != 0).unwrap_or(false),
            None => false,
        }
    }
}

/// wt_et_cols_defs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ColumnDefinition {
    pub sid: i64,
    pub pcol_number: i64,
    #[serde(rename = "pcol_name")]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "pcol_units")]
    pub units: i64,
    pub relevant_in_days: bool,
    pub relevant_in_hours: bool,
    pub manual_feed_daily_utype_list: Vec<DynValue>,
    pub manual_feed_pp_utype_list: Vec<DynValue>,
    pub manual_feed_daily_report_dependance: bool,
    pub daily_report_display_only: bool,
    pub is_break_pcol: bool,
    pub mf_report_display_only: bool,
    pub display_as_units: bool,
    pub for_calculate3monthstd: bool,
    pub overtime: bool,
    pub cont_vacation: bool,
    pub show_in_client_actuals: bool,
    pub external_pcol: String,
    #[serde(default)]
    pub vacation_quota: Option<DynValue>,
    #[serde(default)]
    pub payroll_pcol: Option<DynValue>,
    pub std_by_dow_dt: bool,
    pub is_break_return_pcol: bool,
    #[serde(rename = "pcol_description", default)]
    pub description: Option<DynValue>,
    #[serde(default)]
    pub sickness_quota: Option<DynValue>,
}

/// wt_et_cols_display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ColumnDisplay {
    pub sid: i64,
    pub etype: i64,
    pub pcol_number: i64,
    pub show_as_col: bool,
    #[validate(range(min = 0))]
    pub show_col_order: i64,
    pub show_as_table: bool,
    pub show_as_row: bool,
    pub etcd_id: i64,
}

/// wt_et_dt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct DayTypeBinding {
    pub sid: i64,
    pub etype: i64,
    pub day_type_id: i64,
    pub std: i64,
    #[serde(default)]
    pub break_pid_list: Option<DynValue>,
    #[serde(default)]
    pub break_pid2_list: Option<DynValue>,
    #[serde(default)]
    pub break_aid_list: Option<DynValue>,
    #[serde(default)]
    pub break_did_list: Option<DynValue>,
    #[serde(default)]
    pub break_lid_list: Option<DynValue>,
    #[serde(default)]
    pub break_cid_list: Option<DynValue>,
    #[serde(default)]
    pub break_from_hour: Option<DynValue>,
    #[serde(default)]
    pub break_to_hour: Option<DynValue>,
    #[serde(default)]
    pub day_work_jgid: Option<i64>,
    pub day_part: i64,
    pub std_absence: i64,
    pub std_by_plan: bool,
    pub min_interval_between_shifts: String,
    pub absence_wo_dt: bool,
}

/// wt_et_pcols: one time-range bin attributing worked time to a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct PayrollColumnBin {
    pub sid: i64,
    pub etype: i64,
    pub day_type_id: i64,
    #[validate(length(min = 1))]
    pub pcol_name: String,
    /// Start of the bin in seconds; zero for the first bin of a grouping,
    /// the previous bin's end otherwise.
    #[serde(rename = "pcol_bin_from")]
    #[validate(range(min = 0, max = 172800))]
    pub bin_from: i64,
    /// End of the bin in seconds.
    #[serde(rename = "pcol_bin_to")]
    #[validate(range(min = 0, max = 172800))]
    pub bin_to: i64,
    pub per_job: bool,
    pub pid_list: Vec<DynValue>,
    pub pid2_list: Vec<DynValue>,
    pub aid_list: Vec<DynValue>,
    pub did_list: Vec<DynValue>,
    pub lid_list: Vec<DynValue>,
    pub cid_list: Vec<DynValue>,
    pub cmplt_diff: bool,
    pub pcol_diff_part: i64,
    pub hrs_return_amount: i64,
    pub hrs_return_absolute: bool,
    #[serde(default)]
    pub job_min_hrs: Option<i64>,
    #[serde(default)]
    pub job_max_hrs: Option<i64>,
    #[serde(default)]
    pub time_from: Option<String>,
    #[serde(default)]
    pub time_to: Option<String>,
    pub per_job_not_in: bool,
    pub atype_list: Vec<DynValue>,
    pub special_back_to_bucket_part: i64,
    #[serde(default)]
    pub time_start_filter_from: Option<DynValue>,
    #[serde(default)]
    pub time_start_filter_to: Option<DynValue>,
    #[serde(default)]
    pub time_end_filter_from: Option<DynValue>,
    #[serde(default)]
    pub time_end_filter_to: Option<DynValue>,
    #[serde(default)]
    pub continuum_n_from: Option<DynValue>,
    #[serde(default)]
    pub continuum_n_to: Option<DynValue>,
    #[serde(default)]
    pub cut_by_pp_sum_pcol_number: Option<DynValue>,
    pub cut_by_pp_sum_from: i64,
    pub cut_by_pp_sum_to: i64,
    pub description: String,
    #[serde(default)]
    pub count_reports_filter_from: Option<DynValue>,
    #[serde(default)]
    pub count_reports_filter_to: Option<DynValue>,
    #[serde(default)]
    pub season_ppid: Option<DynValue>,
    #[serde(default)]
    pub season_pp: Option<DynValue>,
    pub shift_num_filter: i64,
    #[serde(default)]
    pub total_hours_day_from: Option<DynValue>,
    #[serde(default)]
    pub total_hours_day_to: Option<DynValue>,
    #[serde(default)]
    pub total_work_hours_day_from: Option<DynValue>,
    #[serde(default)]
    pub total_work_hours_day_to: Option<DynValue>,
    #[serde(default)]
    pub first_rep_start_time_filter_from: Option<DynValue>,
    #[serde(default)]
    pub first_rep_start_time_filter_to: Option<DynValue>,
    pub add_to_basic_etype: bool,
    pub get_from_basic_etype: bool,
    pub no_display: bool,
    pub count_reports_filter_all_rows: bool,
    pub billtype_list: Vec<DynValue>,
    pub etp_id: i64,
}

impl PayrollColumnBin {
    /// Key under which bins must tile the day.
    pub fn grouping(&self) -> (i64, i64, &str) {
        (self.etype, self.day_type_id, self.pcol_name.as_str())
    }
}
