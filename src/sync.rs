//! Background persistence of single-cell edits.
//!
//! Every edit is applied to local state first and then committed on its own
//! thread. Completions come back over a channel and are reconciled on the UI
//! thread: only the newest request per (style, week, field) may confirm or
//! revert, older responses are dropped.

use crate::calc::CellTarget;
use crate::data::RowStore;
use crate::error::CommitError;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct CommitRequest {
    pub target: CellTarget,
    pub value: i64,
}

#[derive(Debug)]
pub(crate) struct CommitOutcome {
    pub(crate) target: CellTarget,
    pub(crate) generation: u64,
    pub(crate) value: i64,
    pub(crate) result: Result<(), CommitError>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reconcile {
    /// The newest request for this cell succeeded.
    Confirmed { target: CellTarget, value: i64 },
    /// The newest request failed; local state must go back to `restore`.
    Reverted { target: CellTarget, restore: Option<i64>, error: CommitError },
    /// A response for a superseded request.
    Stale { target: CellTarget },
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    /// Last value the server is known to hold for this cell.
    confirmed: Option<i64>,
}

pub struct SyncLayer {
    store: Arc<dyn RowStore>,
    tx: Sender<CommitOutcome>,
    rx: Receiver<CommitOutcome>,
    in_flight: HashMap<CellTarget, InFlight>,
    next_generation: u64,
}

impl SyncLayer {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        let (tx, rx) = channel();
        SyncLayer { store, tx, rx, in_flight: HashMap::new(), next_generation: 1 }
    }

    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Starts a commit. `previous` is the local value before the optimistic apply;
    /// it becomes the rollback value unless an earlier request for the same
    /// cell is still unresolved.
    pub fn submit(&mut self, request: CommitRequest, previous: Option<i64>) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;

        let entry = self
            .in_flight
            .entry(request.target.clone())
            .or_insert(InFlight { generation, confirmed: previous });
        entry.generation = generation;

        debug!(
            style = %request.target.style_number,
            week = request.target.week_number,
            field = %request.target.field,
            value = request.value,
            generation,
            "commit submitted"
        );

        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let fallback = request.clone();
        let spawned = thread::Builder::new()
            .name("wssi-commit".to_string())
            .spawn(move || {
                let CommitRequest { target, value } = request;
                let result = store.update_field(
                    &target.style_number,
                    target.week_number,
                    target.field,
                    value,
                );
                let _ = tx.send(CommitOutcome { target, generation, value, result });
            });
        if let Err(e) = spawned {
            warn!(error = %e, "could not start commit worker");
            let _ = self.tx.send(CommitOutcome {
                target: fallback.target,
                generation,
                value: fallback.value,
                result: Err(CommitError::WorkerGone),
            });
        }
        generation
    }

    /// Reconciles every completion that has arrived so far without blocking.
    pub fn drain(&mut self) -> Vec<Reconcile> {
        let mut out = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            out.push(self.reconcile(outcome));
        }
        out
    }

    /// Blocks until nothing is in flight or `timeout` elapses.
    pub fn settle(&mut self, timeout: Duration) -> Vec<Reconcile> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => out.push(self.reconcile(outcome)),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(pending = self.in_flight.len(), "commits still in flight at deadline");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        out
    }

    pub(crate) fn reconcile(&mut self, outcome: CommitOutcome) -> Reconcile {
        let CommitOutcome { target, generation, value, result } = outcome;
        let Some(entry) = self.in_flight.get_mut(&target) else {
            return Reconcile::Stale { target };
        };

        if generation != entry.generation {
            if result.is_ok() {
                entry.confirmed = Some(value);
            }
            debug!(style = %target.style_number, week = target.week_number, generation, "stale commit response dropped");
            return Reconcile::Stale { target };
        }

        let confirmed = entry.confirmed;
        self.in_flight.remove(&target);
        match result {
            Ok(()) => {
                info!(style = %target.style_number, week = target.week_number, field = %target.field, value, "commit confirmed");
                Reconcile::Confirmed { target, value }
            }
            Err(error) => {
                warn!(style = %target.style_number, week = target.week_number, field = %target.field, %error, "commit failed, reverting");
                Reconcile::Reverted { target, restore: confirmed, error }
            }
        }
    }
}
