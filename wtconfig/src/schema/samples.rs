//! Small, internally consistent sample records.
//!
//! Used by `wtconfig schema --sample` to show what a valid document looks
//! like, and by tests as a known-good baseline.

use super::aggregate::ConfigurationSet;
use super::entities::*;
use super::value::DynValue;

pub const DAY_SECONDS: i64 = 86_400;

pub fn activity_type(atype: i64) -> ActivityType {
    ActivityType {
        sid: atype,
        atype,
        name: format!("activity type {}", atype),
        alias: None,
    }
}

pub fn activity(aid: i64, atype: i64) -> Activity {
    Activity {
        sid: aid,
        aid,
        atype,
        billtype: 0,
        name: format!("activity {}", aid),
        account_no: None,
        activity_number: aid.to_string(),
        status_code: 1,
        atype_subclass: 0,
        payroll_activity_code: None,
        activity_color: Some(DynValue::from("#3366ff")),
        std_by_dow_dt: false,
    }
}

pub fn day_type(day_type_id: i64, name: &str) -> DayType {
    DayType {
        sid: day_type_id,
        day_type_id,
        color: "#ffffff".to_string(),
        name: name.to_string(),
        for_planit: true,
        for_budget: false,
        shifts_templates_special_days: false,
    }
}

/// Employee type working `hours` per day on Monday through Friday.
pub fn employee_type(etype: i64, name: &str, hours: i64) -> EmployeeType {
    let on = Some(DynValue::Bool(true));
    EmployeeType {
        sid: etype,
        etype,
        name: name.to_string(),
        std_hours_day: Some(DynValue::Int(hours)),
        std_hours_month: None,
        std_hours_week: Some(DynValue::Int(hours * 5)),
        sun: Some(DynValue::Bool(false)),
        mon: on.clone(),
        tue: on.clone(),
        wed: on.clone(),
        thu: on.clone(),
        fri: on,
        sat: Some(DynValue::Bool(false)),
        workday_start_time: "00:00".to_string(),
        percentage_job: None,
        tsa_cols_p: false,
        tsa_table: false,
        hours_to_days_rate: hours,
        diff_ppid: None,
        cut_by_pp_ppid: None,
        need_app_rej_on_manual: false,
        display_diff: true,
        calc_3month_std_by_actual_days: false,
        calc_3month_std_by_all_std_days: false,
        allowed_delay_minutes: 0,
        display_day_wo_reporting: false,
        hourly_agreement: false,
    }
}

pub fn column_definition(pcol_number: i64, name: &str) -> ColumnDefinition {
    ColumnDefinition {
        sid: pcol_number,
        pcol_number,
        name: name.to_string(),
        units: 1,
        relevant_in_days: false,
        relevant_in_hours: true,
        manual_feed_daily_utype_list: Vec::new(),
        manual_feed_pp_utype_list: Vec::new(),
        manual_feed_daily_report_dependance: false,
        daily_report_display_only: false,
        is_break_pcol: false,
        mf_report_display_only: false,
        display_as_units: false,
        for_calculate3monthstd: false,
        overtime: false,
        cont_vacation: false,
        show_in_client_actuals: true,
        external_pcol: pcol_number.to_string(),
        vacation_quota: None,
        payroll_pcol: None,
        std_by_dow_dt: false,
        is_break_return_pcol: false,
        description: None,
        sickness_quota: None,
    }
}

pub fn column_display(etcd_id: i64, etype: i64, pcol_number: i64) -> ColumnDisplay {
    ColumnDisplay {
        sid: etcd_id,
        etype,
        pcol_number,
        show_as_col: true,
        show_col_order: etcd_id,
        show_as_table: false,
        show_as_row: false,
        etcd_id,
    }
}

pub fn day_type_binding(sid: i64, etype: i64, day_type_id: i64, std_seconds: i64) -> DayTypeBinding {
    DayTypeBinding {
        sid,
        etype,
        day_type_id,
        std: std_seconds,
        break_pid_list: None,
        break_pid2_list: None,
        break_aid_list: None,
        break_did_list: None,
        break_lid_list: None,
        break_cid_list: None,
        break_from_hour: None,
        break_to_hour: None,
        day_work_jgid: None,
        day_part: 0,
        std_absence: std_seconds,
        std_by_plan: false,
        min_interval_between_shifts: "00:00".to_string(),
        absence_wo_dt: false,
    }
}

pub fn payroll_bin(
    etp_id: i64,
    etype: i64,
    day_type_id: i64,
    pcol_name: &str,
    bin_from: i64,
    bin_to: i64,
) -> PayrollColumnBin {
    PayrollColumnBin {
        sid: etp_id,
        etype,
        day_type_id,
        pcol_name: pcol_name.to_string(),
        bin_from,
        bin_to,
        per_job: false,
        pid_list: Vec::new(),
        pid2_list: Vec::new(),
        aid_list: Vec::new(),
        did_list: Vec::new(),
        lid_list: Vec::new(),
        cid_list: Vec::new(),
        cmplt_diff: false,
        pcol_diff_part: 0,
        hrs_return_amount: 0,
        hrs_return_absolute: false,
        job_min_hrs: None,
        job_max_hrs: None,
        time_from: None,
        time_to: None,
        per_job_not_in: false,
        atype_list: Vec::new(),
        special_back_to_bucket_part: 0,
        time_start_filter_from: None,
        time_start_filter_to: None,
        time_end_filter_from: None,
        time_end_filter_to: None,
        continuum_n_from: None,
        continuum_n_to: None,
        cut_by_pp_sum_pcol_number: None,
        cut_by_pp_sum_from: 0,
        cut_by_pp_sum_to: 0,
        description: format!("{} {}-{}", pcol_name, bin_from, bin_to),
        count_reports_filter_from: None,
        count_reports_filter_to: None,
        season_ppid: None,
        season_pp: None,
        shift_num_filter: 0,
        total_hours_day_from: None,
        total_hours_day_to: None,
        total_work_hours_day_from: None,
        total_work_hours_day_to: None,
        first_rep_start_time_filter_from: None,
        first_rep_start_time_filter_to: None,
        add_to_basic_etype: false,
        get_from_basic_etype: false,
        no_display: false,
        count_reports_filter_all_rows: false,
        billtype_list: Vec::new(),
        etp_id,
    }
}

/// Core-scope set: one employee type, two displayed columns, one day binding.
pub fn core_configuration() -> ConfigurationSet {
    ConfigurationSet {
        employee_types: vec![employee_type(1, "standard", 8)],
        column_displays: vec![column_display(1, 1, 100), column_display(2, 1, 125)],
        day_type_bindings: vec![day_type_binding(1, 1, 1, 8 * 3600)],
        ..Default::default()
    }
}

/// Full-scope set where every list is populated and every reference resolves.
/// The bins of the "regular hours" grouping tile the day, split at 8h and 10h.
pub fn full_configuration() -> ConfigurationSet {
    let mut set = core_configuration();
    set.activity_types = vec![activity_type(1)];
    set.activities = vec![activity(1, 1)];
    set.day_types = vec![day_type(1, "regular")];
    set.column_definitions = vec![
        column_definition(100, "regular hours"),
        column_definition(125, "overtime 125%"),
    ];
    set.payroll_bins = vec![
        payroll_bin(1, 1, 1, "regular hours", 0, 8 * 3600),
        payroll_bin(2, 1, 1, "regular hours", 8 * 3600, 10 * 3600),
        payroll_bin(3, 1, 1, "regular hours", 10 * 3600, DAY_SECONDS),
    ];
    set
}
