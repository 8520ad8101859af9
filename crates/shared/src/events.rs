//! Events emitted by the session manager.
//!
//! The presentation layer subscribes to these instead of watching the state
//! directly; every command that changes the session emits one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What just happened to the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A generation began; `current_output` was cleared
    GenerationStarted { prompt: String },
    /// Fractional model download/load progress, 0.0..=1.0
    ModelProgress { fraction: f64 },
    /// A chunk was appended to `current_output`
    OutputChunk { text: String },
    /// The generation finished and was committed to history
    GenerationCompleted { entry_id: Uuid },
    /// The generation was cancelled; nothing was committed
    GenerationCancelled,
    /// The generation failed; the error text replaced `current_output`
    GenerationFailed { error: String },
    HistoryChanged,
    TodosChanged,
    FilesChanged,
    SidebarToggled { visible: bool },
}

impl SessionEvent {
    /// True for the events that mark the end of a generation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::GenerationCompleted { .. }
                | SessionEvent::GenerationCancelled
                | SessionEvent::GenerationFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events() {
        assert!(SessionEvent::GenerationCancelled.is_terminal());
        assert!(SessionEvent::GenerationFailed {
            error: "boom".into()
        }
        .is_terminal());
        assert!(!SessionEvent::OutputChunk {
            text: "hi".into()
        }
        .is_terminal());
        assert!(!SessionEvent::TodosChanged.is_terminal());
    }
}
