use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Filter predicate: which values are accepted per column
// ---------------------------------------------------------------------------

/// Inclusive date window over one date column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub column: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Per-column acceptance sets, supplied by the presentation layer.
/// A column absent from `accepted` is unconstrained; a column mapped to an
/// empty set accepts nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub accepted: BTreeMap<String, BTreeSet<Value>>,
    pub date_range: Option<DateRange>,
}

impl FilterSelection {
    /// Selection accepting every observed value of `columns`.
    pub fn all_observed(table: &Table, columns: &[&str]) -> Self {
        let accepted = columns
            .iter()
            .filter_map(|col| {
                table
                    .unique_values
                    .get(*col)
                    .map(|vals| (col.to_string(), vals.clone()))
            })
            .collect();
        FilterSelection {
            accepted,
            date_range: None,
        }
    }

    /// Accept exactly `values` in `column`.
    pub fn with(mut self, column: &str, values: impl IntoIterator<Item = Value>) -> Self {
        self.accepted
            .insert(column.to_string(), values.into_iter().collect());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

/// Return indices of rows that pass all active filters.
///
/// A row passes a column filter when:
/// * The column is not present in `selection` → passes (no constraint)
/// * The accepted set for that column is empty → nothing selected → fails
/// * The row's value for that column is in the accepted set → passes
///
/// A constrained column the table lacks reads as `Null` in every row.
pub fn filtered_indices(table: &Table, selection: &FilterSelection) -> Vec<usize> {
    let mut active: Vec<(Option<usize>, &BTreeSet<Value>)> = Vec::new();
    for (col, accepted) in &selection.accepted {
        if accepted.is_empty() {
            // Nothing selected for this column → hide everything
            return Vec::new();
        }
        // Every observed value accepted → no effective filter
        if let Some(all_vals) = table.unique_values.get(col) {
            if all_vals.is_subset(accepted) {
                continue;
            }
        }
        active.push((table.column_index(col), accepted));
    }

    let date_idx = selection
        .date_range
        .as_ref()
        .map(|range| (table.column_index(&range.column), range));

    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            let values_pass = active.iter().all(|(idx, accepted)| match idx {
                Some(i) => accepted.contains(row.get(*i)),
                None => accepted.contains(&Value::Null),
            });
            let date_passes = match &date_idx {
                None => true,
                Some((Some(i), range)) => row.get(*i).as_date().is_some_and(|d| range.contains(d)),
                Some((None, _)) => false,
            };
            values_pass && date_passes
        })
        .map(|(i, _)| i)
        .collect()
}

/// The sub-table of rows passing `selection`. The input table is untouched.
pub fn apply(table: &Table, selection: &FilterSelection) -> Table {
    let indices = filtered_indices(table, selection);
    if indices.len() == table.len() {
        return table.clone();
    }
    table.select_rows(&indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnKind, Record};

    fn table() -> Table {
        let columns = vec![
            Column { name: "Platform".into(), kind: ColumnKind::Text },
            Column { name: "Date".into(), kind: ColumnKind::Date },
        ];
        let day = |d| Value::Date(NaiveDate::from_ymd_opt(2024, 1, d).unwrap());
        let rows = vec![
            Record::new(vec!["Instagram".into(), day(1)]),
            Record::new(vec!["TikTok".into(), day(2)]),
            Record::new(vec!["YouTube".into(), Value::Null]),
            Record::new(vec!["TikTok".into(), day(4)]),
        ];
        Table::new(columns, rows).unwrap()
    }

    #[test]
    fn full_selection_is_identity() {
        let t = table();
        let sel = FilterSelection::all_observed(&t, &["Platform"]);
        assert_eq!(apply(&t, &sel), t);
    }

    #[test]
    fn subset_selection_keeps_matching_rows_in_order() {
        let t = table();
        let sel = FilterSelection::default().with("Platform", ["TikTok".into()]);
        assert_eq!(filtered_indices(&t, &sel), vec![1, 3]);
    }

    #[test]
    fn empty_acceptance_set_yields_empty_table() {
        let t = table();
        let sel = FilterSelection::default().with("Platform", []);
        let out = apply(&t, &sel);
        assert!(out.is_empty());
        assert_eq!(out.columns, t.columns);
    }

    #[test]
    fn date_range_drops_null_and_out_of_range_dates() {
        let t = table();
        let sel = FilterSelection::default().with_date_range(DateRange {
            column: "Date".into(),
            start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        });
        assert_eq!(filtered_indices(&t, &sel), vec![1, 3]);
    }

    #[test]
    fn unknown_column_matches_only_null() {
        let t = table();
        let sel = FilterSelection::default().with("Missing", ["x".into()]);
        assert!(filtered_indices(&t, &sel).is_empty());

        let sel = FilterSelection::default().with("Missing", [Value::Null]);
        assert_eq!(filtered_indices(&t, &sel).len(), 4);
    }
}
