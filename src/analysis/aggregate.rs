use std::collections::HashMap;

use serde::Serialize;

use super::ratio::safe_ratio;
use crate::data::model::{Table, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Reducers
// ---------------------------------------------------------------------------

/// Order-independent reductions over one column of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    /// Sum of non-null values; 0 for a group with none.
    Sum,
    /// Mean of non-null values; `None` for a group with none.
    Mean,
    /// Number of non-null values.
    Count,
    /// True if any member's value is truthy.
    AnyTrue,
}

impl Reducer {
    fn label(self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Count => "count",
            Reducer::AnyTrue => "any",
        }
    }
}

/// A `(source column, reducer)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub column: String,
    pub reducer: Reducer,
}

impl Aggregation {
    pub fn new(column: &str, reducer: Reducer) -> Self {
        Aggregation {
            column: column.to_string(),
            reducer,
        }
    }

    pub fn sum(column: &str) -> Self {
        Self::new(column, Reducer::Sum)
    }

    pub fn mean(column: &str) -> Self {
        Self::new(column, Reducer::Mean)
    }

    pub fn count(column: &str) -> Self {
        Self::new(column, Reducer::Count)
    }

    pub fn any_true(column: &str) -> Self {
        Self::new(column, Reducer::AnyTrue)
    }

    /// Display header, e.g. `Revenue ($) (sum)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.column, self.reducer.label())
    }
}

/// `aggregations[numerator] / aggregations[denominator] × scale`, computed
/// per group after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRatio {
    pub name: String,
    pub numerator: usize,
    pub denominator: usize,
    pub scale: f64,
}

/// What to group by and how to reduce each group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSpec {
    pub key: String,
    pub aggregations: Vec<Aggregation>,
    pub ratio: Option<DerivedRatio>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggValue {
    Number(Option<f64>),
    Count(u64),
    Flag(bool),
}

impl AggValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AggValue::Number(v) => *v,
            AggValue::Count(n) => Some(*n as f64),
            AggValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }
}

impl std::fmt::Display for AggValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggValue::Number(Some(v)) => write!(f, "{v:.2}"),
            AggValue::Number(None) => write!(f, "–"),
            AggValue::Count(n) => write!(f, "{n}"),
            AggValue::Flag(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
        }
    }
}

/// One row per distinct key value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: Value,
    /// Member rows in the group.
    pub rows: usize,
    /// One entry per requested aggregation, in request order.
    pub values: Vec<AggValue>,
    pub ratio: Option<f64>,
}

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Acc {
    Sum(f64),
    Mean { total: f64, n: u64 },
    Count(u64),
    Any(bool),
}

impl Acc {
    fn new(reducer: Reducer) -> Self {
        match reducer {
            Reducer::Sum => Acc::Sum(0.0),
            Reducer::Mean => Acc::Mean { total: 0.0, n: 0 },
            Reducer::Count => Acc::Count(0),
            Reducer::AnyTrue => Acc::Any(false),
        }
    }

    fn push(&mut self, value: &Value) {
        match self {
            Acc::Sum(total) => {
                if let Some(v) = value.as_f64() {
                    *total += v;
                }
            }
            Acc::Mean { total, n } => {
                if let Some(v) = value.as_f64() {
                    *total += v;
                    *n += 1;
                }
            }
            Acc::Count(n) => {
                if !value.is_null() {
                    *n += 1;
                }
            }
            Acc::Any(any) => *any |= value.as_bool().unwrap_or(false),
        }
    }

    fn finish(self) -> AggValue {
        match self {
            Acc::Sum(total) => AggValue::Number(Some(total)),
            Acc::Mean { total, n } if n > 0 => AggValue::Number(Some(total / n as f64)),
            Acc::Mean { .. } => AggValue::Number(None),
            Acc::Count(n) => AggValue::Count(n),
            Acc::Any(b) => AggValue::Flag(b),
        }
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Group `table` by `spec.key` and reduce each group.
///
/// Groups appear in encounter order; rows with a null key form their own
/// group. With a derived ratio the groups are stably sorted by it,
/// descending, so ties keep encounter order.
pub fn aggregate(table: &Table, spec: &GroupSpec) -> Result<Vec<GroupSummary>> {
    let key_idx = table.require_column(&spec.key)?;
    let mut sources = Vec::with_capacity(spec.aggregations.len());
    for agg in &spec.aggregations {
        let idx = table.require_column(&agg.column)?;
        if matches!(agg.reducer, Reducer::Sum | Reducer::Mean) && !table.columns[idx].kind.is_numeric() {
            return Err(Error::NotNumeric(agg.column.clone()));
        }
        sources.push(idx);
    }
    if let Some(ratio) = &spec.ratio {
        let n = spec.aggregations.len();
        if ratio.numerator >= n || ratio.denominator >= n {
            return Err(Error::MalformedInput(format!(
                "ratio '{}' refers to aggregation {} / {} of {n}",
                ratio.name, ratio.numerator, ratio.denominator
            )));
        }
    }

    let mut index: HashMap<&Value, usize> = HashMap::new();
    let mut groups: Vec<(Value, usize, Vec<Acc>)> = Vec::new();

    for row in &table.rows {
        let key = row.get(key_idx);
        let gi = *index.entry(key).or_insert_with(|| {
            let accs = spec.aggregations.iter().map(|a| Acc::new(a.reducer)).collect();
            groups.push((key.clone(), 0, accs));
            groups.len() - 1
        });
        let (_, rows, accs) = &mut groups[gi];
        *rows += 1;
        for (acc, &src) in accs.iter_mut().zip(&sources) {
            acc.push(row.get(src));
        }
    }

    let mut summaries: Vec<GroupSummary> = groups
        .into_iter()
        .map(|(key, rows, accs)| {
            let values: Vec<AggValue> = accs.into_iter().map(Acc::finish).collect();
            let ratio = spec.ratio.as_ref().map(|r| {
                let num = values[r.numerator].as_f64().unwrap_or(0.0);
                let den = values[r.denominator].as_f64().unwrap_or(0.0);
                safe_ratio(num, den) * r.scale
            });
            GroupSummary {
                key,
                rows,
                values,
                ratio,
            }
        })
        .collect();

    if spec.ratio.is_some() {
        summaries.sort_by(|a, b| {
            let ra = a.ratio.unwrap_or(0.0);
            let rb = b.ratio.unwrap_or(0.0);
            rb.total_cmp(&ra)
        });
    }
    Ok(summaries)
}

/// Sum of `measure` per `key`, smallest first (the horizontal bar chart
/// puts the largest at the top).
pub fn ranking(table: &Table, key: &str, measure: &str) -> Result<Vec<(Value, f64)>> {
    let spec = GroupSpec {
        key: key.to_string(),
        aggregations: vec![Aggregation::sum(measure)],
        ratio: None,
    };
    let mut ranked: Vec<(Value, f64)> = aggregate(table, &spec)?
        .into_iter()
        .map(|g| (g.key, g.values[0].as_f64().unwrap_or(0.0)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnKind, Record};

    fn table(rows: &[(&str, f64, f64, bool)]) -> Table {
        let columns = vec![
            Column { name: "key".into(), kind: ColumnKind::Text },
            Column { name: "revenue".into(), kind: ColumnKind::Float },
            Column { name: "cost".into(), kind: ColumnKind::Float },
            Column { name: "spike".into(), kind: ColumnKind::Bool },
        ];
        let rows = rows
            .iter()
            .map(|(k, r, c, s)| {
                Record::new(vec![(*k).into(), Value::Float(*r), Value::Float(*c), Value::Bool(*s)])
            })
            .collect();
        Table::new(columns, rows).unwrap()
    }

    fn roi_spec() -> GroupSpec {
        GroupSpec {
            key: "key".into(),
            aggregations: vec![
                Aggregation::sum("revenue"),
                Aggregation::sum("cost"),
                Aggregation::count("revenue"),
                Aggregation::any_true("spike"),
            ],
            ratio: Some(DerivedRatio {
                name: "ROI".into(),
                numerator: 0,
                denominator: 1,
                scale: 100.0,
            }),
        }
    }

    #[test]
    fn roi_ranks_descending_with_stable_ties() {
        let t = table(&[
            ("A", 100.0, 0.0, false),
            ("B", 200.0, 100.0, false),
            ("C", 0.0, 50.0, false),
        ]);
        let out = aggregate(&t, &roi_spec()).unwrap();
        let order: Vec<String> = out.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(order, ["B", "A", "C"]);
        let ratios: Vec<f64> = out.iter().map(|g| g.ratio.unwrap()).collect();
        assert_eq!(ratios, [200.0, 0.0, 0.0]);
    }

    #[test]
    fn reducers_combine_member_rows() {
        let t = table(&[
            ("A", 10.0, 5.0, false),
            ("B", 1.0, 1.0, false),
            ("A", 30.0, 5.0, true),
        ]);
        let out = aggregate(&t, &roi_spec()).unwrap();
        let a = out.iter().find(|g| g.key == Value::from("A")).unwrap();
        assert_eq!(a.rows, 2);
        assert_eq!(
            a.values,
            vec![
                AggValue::Number(Some(40.0)),
                AggValue::Number(Some(10.0)),
                AggValue::Count(2),
                AggValue::Flag(true),
            ]
        );
        assert_eq!(a.ratio, Some(400.0));
    }

    #[test]
    fn mean_of_all_null_group_is_none() {
        let columns = vec![
            Column { name: "key".into(), kind: ColumnKind::Text },
            Column { name: "v".into(), kind: ColumnKind::Float },
        ];
        let rows = vec![Record::new(vec!["x".into(), Value::Null])];
        let t = Table::new(columns, rows).unwrap();
        let spec = GroupSpec {
            key: "key".into(),
            aggregations: vec![Aggregation::mean("v"), Aggregation::sum("v")],
            ratio: None,
        };
        let out = aggregate(&t, &spec).unwrap();
        assert_eq!(out[0].values, vec![AggValue::Number(None), AggValue::Number(Some(0.0))]);
    }

    #[test]
    fn empty_table_gives_no_groups() {
        let t = table(&[]);
        assert!(aggregate(&t, &roi_spec()).unwrap().is_empty());
    }

    #[test]
    fn sum_over_text_column_is_rejected() {
        let t = table(&[("A", 1.0, 1.0, false)]);
        let spec = GroupSpec {
            key: "revenue".into(),
            aggregations: vec![Aggregation::sum("key")],
            ratio: None,
        };
        assert!(matches!(aggregate(&t, &spec), Err(Error::NotNumeric(c)) if c == "key"));
    }

    #[test]
    fn ranking_sorts_ascending() {
        let t = table(&[
            ("A", 50.0, 0.0, false),
            ("B", 10.0, 0.0, false),
            ("A", 5.0, 0.0, false),
        ]);
        let ranked = ranking(&t, "key", "revenue").unwrap();
        assert_eq!(ranked, vec![(Value::from("B"), 10.0), (Value::from("A"), 55.0)]);
    }
}
