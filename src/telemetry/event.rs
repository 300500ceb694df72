use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

// Allowed: operation kinds, error kinds, durations, counts
// Forbidden: utterances, screen text, hints, audio samples

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    StartSimulation,
    SendMessage,
    GetHint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechOutcomeKind {
    Played,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TelemetryEvent {
    RequestCompleted {
        op: Operation,
        latency_ms: u64,
    },

    RequestFailed {
        op: Operation,
        kind: ErrorKind,
    },

    /// A response arrived after a newer one had already been applied.
    StaleResponseDiscarded {
        op: Operation,
    },

    Speech {
        outcome: SpeechOutcomeKind,
    },
}
