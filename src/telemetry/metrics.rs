use std::collections::VecDeque;

use super::event::{SpeechOutcomeKind, TelemetryEvent};
use crate::error::ErrorKind;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub request_stats: RequestStats,
    pub speech_stats: SpeechStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestStats {
    pub completed: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub malformed: u64,
    pub stale_discarded: u64,
    pub total_latency_ms: u64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechStats {
    pub played: u64,
    pub skipped: u64,
    pub failed: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::RequestCompleted { latency_ms, .. } => {
                snap.request_stats.completed += 1;
                snap.request_stats.total_latency_ms += latency_ms;
            }
            TelemetryEvent::RequestFailed { kind, .. } => {
                snap.request_stats.failed += 1;
                match kind {
                    ErrorKind::RateLimited => snap.request_stats.rate_limited += 1,
                    ErrorKind::Malformed => snap.request_stats.malformed += 1,
                    ErrorKind::Transport | ErrorKind::Unknown => {}
                }
            }
            TelemetryEvent::StaleResponseDiscarded { .. } => {
                snap.request_stats.stale_discarded += 1;
            }
            TelemetryEvent::Speech { outcome } => match outcome {
                SpeechOutcomeKind::Played => snap.speech_stats.played += 1,
                SpeechOutcomeKind::Skipped => snap.speech_stats.skipped += 1,
                SpeechOutcomeKind::Failed => snap.speech_stats.failed += 1,
            },
        }
    }

    if snap.request_stats.completed > 0 {
        snap.request_stats.avg_latency_ms =
            snap.request_stats.total_latency_ms as f64 / snap.request_stats.completed as f64;
    }

    snap
}
