//! Request and speech telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! Session logic records into it but never reads it back to make decisions.
//!
//! # PRIVACY INVARIANT
//! Events must **NEVER** contain user content (utterances, character lines, audio).
//! Only operation kinds, error kinds, durations and counts are allowed.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::{Operation, SpeechOutcomeKind, TelemetryEvent};
pub use metrics::{compute_snapshot, RequestStats, SpeechStats, TelemetrySnapshot};
pub use recorder::TelemetryRecorder;
