//! Injectable sink for solver progress events.

use std::fmt::Debug;

use super::EliminationOrder;

/// Something worth reporting while a solver runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverEvent {
    /// Elimination of `states` states begins under `order`.
    EliminationStarted {
        states: usize,
        order: EliminationOrder,
    },
    /// A scratch vector was passed to a solver that has no use for it.
    ScratchIgnored,
    /// `state` loops to itself with probability one and keeps its right-hand side.
    AbsorbingStateFixed { state: usize },
    /// Elimination is complete.
    EliminationFinished { eliminated: usize, fill_in: usize },
    /// Repeated matrix-vector multiplication is complete.
    MultiplicationFinished { iterations: usize },
}

/// Receiver of [`SolverEvent`]s.
///
/// Solvers hold one as `Arc<dyn Diagnostics>` and never log through global
/// state on their own.
pub trait Diagnostics: Debug + Send + Sync {
    /// Handle a single event.
    fn record(&self, event: SolverEvent);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, event: SolverEvent) {
        match event {
            SolverEvent::EliminationStarted { states, order } => {
                tracing::debug!(states, order = %order, "starting state elimination");
            }
            SolverEvent::ScratchIgnored => {
                tracing::warn!("state elimination does not use the scratch vector");
            }
            SolverEvent::AbsorbingStateFixed { state } => {
                tracing::trace!(state, "absorbing state keeps its right-hand side");
            }
            SolverEvent::EliminationFinished { eliminated, fill_in } => {
                tracing::debug!(eliminated, fill_in, "state elimination finished");
            }
            SolverEvent::MultiplicationFinished { iterations } => {
                tracing::debug!(iterations, "matrix-vector iteration finished");
            }
        }
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn record(&self, _event: SolverEvent) {}
}

/// Keeps every event for inspection in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingDiagnostics {
    events: std::sync::Mutex<Vec<SolverEvent>>,
}

#[cfg(test)]
impl RecordingDiagnostics {
    pub(crate) fn events(&self) -> Vec<SolverEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Diagnostics for RecordingDiagnostics {
    fn record(&self, event: SolverEvent) {
        self.events.lock().unwrap().push(event);
    }
}
