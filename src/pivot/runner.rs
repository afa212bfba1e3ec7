use std::future::IntoFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::debug;

use super::matrix::{pivot, PivotMatrix, Record};
use super::{PivotError, PivotResult, PivotSpec};

/// Result of a finished pivot task.
#[derive(Debug, Clone, PartialEq)]
pub enum PivotOutcome {
    /// The task was the latest submission when it finished.
    Current(PivotMatrix),
    /// A newer submission replaced this one; its result was discarded.
    Superseded,
}

/// Runs pivots on the blocking pool, latest submission wins.
///
/// Each submission bumps a generation counter. Stale tasks are not aborted,
/// they finish and resolve to [`PivotOutcome::Superseded`].
#[derive(Debug, Clone, Default)]
pub struct PivotRunner {
    generation: Arc<AtomicU64>,
    latest: Arc<Mutex<Option<PivotSpec>>>,
}

impl PivotRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start pivoting `data` in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, data: Arc<Vec<Record>>, spec: PivotSpec) -> PivotTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(spec.clone());

        debug!(generation, col = %spec.col, row = %spec.row, rows = data.len(), "pivot submitted");
        let handle = tokio::task::spawn_blocking(move || pivot(&data, &spec));

        PivotTicket {
            generation,
            current: Arc::clone(&self.generation),
            handle,
        }
    }

    /// Generation of the most recent submission, 0 before the first.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Spec of the most recent submission.
    pub fn latest_spec(&self) -> Option<PivotSpec> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Handle to one submitted pivot. Await it for the [`PivotOutcome`].
#[derive(Debug)]
pub struct PivotTicket {
    generation: u64,
    current: Arc<AtomicU64>,
    handle: JoinHandle<PivotMatrix>,
}

impl PivotTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether no newer pivot has been submitted since this one.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    pub async fn outcome(self) -> PivotResult<PivotOutcome> {
        let matrix = self
            .handle
            .await
            .map_err(|err| PivotError::Internal(err.to_string()))?;

        let latest = self.current.load(Ordering::SeqCst);
        if latest != self.generation {
            debug!(generation = self.generation, latest, "discarding stale pivot");
            return Ok(PivotOutcome::Superseded);
        }
        Ok(PivotOutcome::Current(matrix))
    }
}

impl IntoFuture for PivotTicket {
    type Output = PivotResult<PivotOutcome>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.outcome())
    }
}
