use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{Aggregation, PivotSpec};
use crate::model::format_value;

/// One row of a flat result set.
pub type Record = Map<String, Value>;

/// Pivoted result.
///
/// `headers[0]` is blank; `headers[1..]` label the columns. Every row has
/// exactly one cell per column, `None` where no record had that pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotMatrix {
    pub headers: Vec<String>,
    pub data: Vec<PivotRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub label: String,
    pub cells: Vec<Option<f64>>,
}

impl PivotMatrix {
    /// Header row followed by data rows, with empty cells as `""`.
    pub fn to_text_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![self.headers.clone()];
        rows.extend(self.data.iter().map(|row| {
            std::iter::once(row.label.clone())
                .chain(
                    row.cells
                        .iter()
                        .map(|cell| cell.map(format_value).unwrap_or_default()),
                )
                .collect()
        }));
        rows
    }
}

/// Axis value. Numbers sort before text, each in ascending order.
#[derive(Debug, Clone)]
enum AxisKey {
    Number(f64),
    Text(String),
}

impl AxisKey {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => n.as_f64().map(AxisKey::Number),
            Value::String(s) => Some(AxisKey::Text(s.clone())),
            other => Some(AxisKey::Text(other.to_string())),
        }
    }

    fn label(&self) -> String {
        match self {
            AxisKey::Number(n) => format_value(*n),
            AxisKey::Text(s) => s.clone(),
        }
    }
}

impl Ord for AxisKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AxisKey::Number(a), AxisKey::Number(b)) => a.total_cmp(b),
            (AxisKey::Number(_), AxisKey::Text(_)) => Ordering::Less,
            (AxisKey::Text(_), AxisKey::Number(_)) => Ordering::Greater,
            (AxisKey::Text(a), AxisKey::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for AxisKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AxisKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AxisKey {}

/// Running aggregate of one cell.
#[derive(Debug, Default)]
struct Cell {
    records: u64,
    acc: Option<f64>,
}

impl Cell {
    fn push(&mut self, value: Option<f64>, aggregation: Aggregation) {
        self.records += 1;
        let Some(value) = value else { return };
        self.acc = Some(match (self.acc, aggregation) {
            (None, _) => value,
            (Some(acc), Aggregation::Sum) => acc + value,
            (Some(acc), Aggregation::Min) => acc.min(value),
            (Some(acc), Aggregation::Max) => acc.max(value),
            (Some(acc), Aggregation::First) => acc,
            (Some(_), Aggregation::Last) => value,
            (Some(acc), Aggregation::Count) => acc,
        });
    }

    fn finish(&self, aggregation: Aggregation) -> Option<f64> {
        match aggregation {
            Aggregation::Count => Some(self.records as f64),
            _ => self.acc,
        }
    }
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Pivot `data` by `spec`.
///
/// Records without a value on either axis are skipped. One pass builds a
/// `row -> column -> cell` index; a second materializes the dense matrix.
pub fn pivot(data: &[Record], spec: &PivotSpec) -> PivotMatrix {
    let mut index: BTreeMap<AxisKey, BTreeMap<AxisKey, Cell>> = BTreeMap::new();
    let mut columns: BTreeMap<AxisKey, usize> = BTreeMap::new();
    let mut skipped = 0usize;

    for record in data {
        let (Some(col), Some(row)) = (
            record.get(&spec.col).and_then(AxisKey::from_value),
            record.get(&spec.row).and_then(AxisKey::from_value),
        ) else {
            skipped += 1;
            continue;
        };
        columns.entry(col.clone()).or_default();
        index
            .entry(row)
            .or_default()
            .entry(col)
            .or_default()
            .push(numeric(record.get(&spec.value)), spec.aggregation);
    }

    if skipped > 0 {
        debug!(skipped, col = %spec.col, row = %spec.row, "records without axis values skipped");
    }

    for (position, slot) in columns.values_mut().enumerate() {
        *slot = position;
    }

    let mut headers = Vec::with_capacity(columns.len() + 1);
    headers.push(String::new());
    headers.extend(columns.keys().map(AxisKey::label));

    let data = index
        .into_iter()
        .map(|(row, cells)| {
            let mut dense = vec![None; columns.len()];
            for (col, cell) in &cells {
                if let Some(&position) = columns.get(col) {
                    dense[position] = cell.finish(spec.aggregation);
                }
            }
            PivotRow {
                label: row.label(),
                cells: dense,
            }
        })
        .collect();

    PivotMatrix { headers, data }
}
