//! Payroll column bin contiguity.
//!
//! For each `(etype, day_type_id, pcol_name)` grouping the bins, ordered by
//! start, must tile `[0, day_length)` exactly: first start is 0, each start is
//! the previous end, last end is the day length.

use super::report::{Violation, ViolationKind};
use crate::schema::{EntityKind, PayrollColumnBin};
use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::BTreeMap;

const FROM: &str = "pcol_bin_from";
const TO: &str = "pcol_bin_to";

pub fn check_bins(bins: &[PayrollColumnBin], day_length_seconds: i64) -> Vec<Violation> {
    let groups: BTreeMap<(i64, i64, &str), Vec<usize>> = bins
        .iter()
        .enumerate()
        .map(|(i, b)| (b.grouping(), i))
        .into_group_map()
        .into_iter()
        .collect();

    let mut violations = Vec::new();
    for ((etype, day_type_id, pcol_name), mut indices) in groups {
        indices.sort_by_key(|&i| (bins[i].bin_from, bins[i].bin_to, i));
        let group = format!(
            "etype={} day_type_id={} pcol_name={:?}",
            etype, day_type_id, pcol_name
        );

        for &i in &indices {
            if bins[i].bin_to <= bins[i].bin_from {
                violations.push(Violation::at(
                    EntityKind::PayrollColumnBin,
                    i,
                    TO,
                    ViolationKind::EmptyBin,
                    format!("{}: [{}, {})", group, bins[i].bin_from, bins[i].bin_to),
                ));
            }
        }

        let first = indices[0];
        if bins[first].bin_from != 0 {
            violations.push(Violation::at(
                EntityKind::PayrollColumnBin,
                first,
                FROM,
                ViolationKind::BinStart,
                format!("{}: first bin starts at {}", group, bins[first].bin_from),
            ));
        }

        for (&prev, &next) in indices.iter().tuple_windows() {
            let (end, start) = (bins[prev].bin_to, bins[next].bin_from);
            let kind = match start.cmp(&end) {
                Ordering::Equal => continue,
                Ordering::Greater => ViolationKind::BinGap,
                Ordering::Less => ViolationKind::BinOverlap,
            };
            violations.push(Violation::at(
                EntityKind::PayrollColumnBin,
                next,
                FROM,
                kind,
                format!("{}: starts at {}, previous bin ends at {}", group, start, end),
            ));
        }

        if let Some(&last) = indices.last() {
            if bins[last].bin_to != day_length_seconds {
                violations.push(Violation::at(
                    EntityKind::PayrollColumnBin,
                    last,
                    TO,
                    ViolationKind::BinEnd,
                    format!(
                        "{}: last bin ends at {}, day ends at {}",
                        group, bins[last].bin_to, day_length_seconds
                    ),
                ));
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::samples::{payroll_bin, DAY_SECONDS};

    fn kinds(violations: &[Violation]) -> Vec<ViolationKind> {
        violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_contiguous_bins_pass_in_any_order() {
        let bins = vec![
            payroll_bin(3, 1, 1, "ot", 36_000, DAY_SECONDS),
            payroll_bin(1, 1, 1, "ot", 0, 28_800),
            payroll_bin(2, 1, 1, "ot", 28_800, 36_000),
        ];
        assert!(check_bins(&bins, DAY_SECONDS).is_empty());
    }

    #[test]
    fn test_groupings_are_checked_independently() {
        let bins = vec![
            payroll_bin(1, 1, 1, "regular", 0, DAY_SECONDS),
            payroll_bin(2, 1, 2, "regular", 0, DAY_SECONDS),
            payroll_bin(3, 2, 1, "regular", 0, DAY_SECONDS),
            payroll_bin(4, 1, 1, "night", 0, DAY_SECONDS),
        ];
        assert!(check_bins(&bins, DAY_SECONDS).is_empty());
    }

    #[test]
    fn test_gap_reported_on_later_bin() {
        let bins = vec![
            payroll_bin(1, 1, 1, "ot", 0, 28_800),
            payroll_bin(2, 1, 1, "ot", 30_000, DAY_SECONDS),
        ];
        let violations = check_bins(&bins, DAY_SECONDS);
        assert_eq!(kinds(&violations), vec![ViolationKind::BinGap]);
        assert_eq!(violations[0].record_index, Some(1));
        assert_eq!(violations[0].field, "pcol_bin_from");
    }

    #[test]
    fn test_overlap_start_and_end() {
        let bins = vec![
            payroll_bin(1, 1, 1, "ot", 60, 28_800),
            payroll_bin(2, 1, 1, "ot", 20_000, 80_000),
        ];
        let violations = check_bins(&bins, DAY_SECONDS);
        assert_eq!(
            kinds(&violations),
            vec![
                ViolationKind::BinStart,
                ViolationKind::BinOverlap,
                ViolationKind::BinEnd
            ]
        );
    }

    #[test]
    fn test_empty_bin_and_custom_day_length() {
        let bins = vec![
            payroll_bin(1, 1, 1, "ot", 0, 0),
            payroll_bin(2, 1, 1, "ot", 0, 108_000),
        ];
        let violations = check_bins(&bins, 108_000);
        assert_eq!(kinds(&violations), vec![ViolationKind::EmptyBin]);
        assert_eq!(violations[0].record_index, Some(0));
    }
}
