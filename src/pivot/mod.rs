//! Cross-tabulation of flat result rows.
//!
//! [`pivot`] reshapes records into a matrix with one row per distinct value
//! of the row axis and one column per distinct value of the column axis.
//! [`PivotRunner`] runs it on the blocking pool so large result sets never
//! stall the caller, discarding results that a newer submission replaced.

mod matrix;
mod runner;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use matrix::{pivot, PivotMatrix, PivotRow, Record};
pub use runner::{PivotOutcome, PivotRunner, PivotTicket};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PivotError {
    #[error("column and row axes must differ, both are '{0}'")]
    SameAxis(String),

    /// The background task panicked or was cancelled. Callers render this
    /// as an error state, never as an empty table.
    #[error("internal pivot error: {0}")]
    Internal(String),
}

pub type PivotResult<T> = Result<T, PivotError>;

/// How records sharing a (row, column) pair combine into one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Aggregation {
    #[default]
    Sum,
    /// Number of records, numeric or not.
    Count,
    Min,
    Max,
    First,
    Last,
}

impl Aggregation {
    pub const ALL: [Aggregation; 6] = [
        Aggregation::Sum,
        Aggregation::Count,
        Aggregation::Min,
        Aggregation::Max,
        Aggregation::First,
        Aggregation::Last,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::First => "first",
            Aggregation::Last => "last",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|agg| agg.as_str() == lower)
            .ok_or_else(|| format!("unknown aggregation '{}'", s))
    }
}

/// Which fields feed the two axes and the cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotSpec {
    pub col: String,
    pub row: String,
    pub value: String,
    pub aggregation: Aggregation,
}

impl PivotSpec {
    pub fn new(
        col: impl Into<String>,
        row: impl Into<String>,
        value: impl Into<String>,
    ) -> PivotResult<Self> {
        let (col, row) = (col.into(), row.into());
        if col == row {
            return Err(PivotError::SameAxis(col));
        }
        Ok(Self {
            col,
            row,
            value: value.into(),
            aggregation: Aggregation::default(),
        })
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }
}
