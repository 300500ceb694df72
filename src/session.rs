use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{ErrorKind, ServiceError};
use crate::services::{ConversationClient, SpeechClient, SpeechOutcome};
use crate::simulation::{Goal, GoalProgress, Scenario, SimulationState};
use crate::telemetry::{Operation, TelemetryEvent, TelemetryRecorder};

/// Issued when a request leaves; handed back with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub op: Operation,
    issued_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The response replaced the current state.
    Applied,
    /// A newer response was already applied; this one was dropped.
    Stale,
    /// Blank utterance, nothing sent.
    Skipped,
}

/// What the user gets told when a turn fails. The prior state stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Rate limit persisted through every retry.
    QuotaExhausted,
    TurnFailed { kind: ErrorKind },
    /// Message or hint before the scenario was started.
    NotStarted,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::QuotaExhausted => {
                "The shared quota is full. Try again shortly (/retry) or connect a personal key (/key <KEY>)."
            }
            Notice::TurnFailed { kind: ErrorKind::Malformed } => {
                "The character lost the thread. Try again (/retry)."
            }
            Notice::TurnFailed { .. } => "Something went wrong reaching the service. Try again (/retry).",
            Notice::NotStarted => "The scenario has not started yet.",
        }
    }

    pub fn can_retry(&self) -> bool {
        !matches!(self, Notice::NotStarted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Turn {
    Start,
    Say(String),
    Hint,
}

type Request = Pin<Box<dyn Future<Output = Result<SimulationState, ServiceError>> + Send>>;

/// A request that has been issued but not awaited. `run` owns everything it
/// needs, so it can be spawned while the session keeps taking input.
pub struct PendingTurn {
    pub ticket: Ticket,
    turn: Turn,
    request: Request,
}

impl PendingTurn {
    pub async fn run(self) -> CompletedTurn {
        CompletedTurn {
            ticket: self.ticket,
            turn: self.turn,
            result: self.request.await,
        }
    }
}

/// Result of a `PendingTurn`, handed back to `Session::apply`.
pub struct CompletedTurn {
    pub ticket: Ticket,
    turn: Turn,
    result: Result<SimulationState, ServiceError>,
}

/// One scenario run: current state, ordering of responses, telemetry.
pub struct Session {
    pub id: Uuid,
    pub scenario: &'static Scenario,
    pub telemetry: TelemetryRecorder,
    conversation: ConversationClient,
    speech: SpeechClient,
    state: Option<SimulationState>,
    next_seq: u64,
    applied_seq: u64,
    failed_turn: Option<Turn>,
    speech_tx: mpsc::UnboundedSender<SpeechOutcome>,
    speech_rx: mpsc::UnboundedReceiver<SpeechOutcome>,
    speech_pending: usize,
}

impl Session {
    pub fn new(scenario: &'static Scenario, conversation: ConversationClient, speech: SpeechClient) -> Self {
        let (speech_tx, speech_rx) = mpsc::unbounded_channel();
        Self {
            id: Uuid::new_v4(),
            scenario,
            telemetry: TelemetryRecorder::new(),
            conversation,
            speech,
            state: None,
            next_seq: 0,
            applied_seq: 0,
            failed_turn: None,
            speech_tx,
            speech_rx,
            speech_pending: 0,
        }
    }

    pub fn state(&self) -> Option<&SimulationState> {
        self.state.as_ref()
    }

    pub fn progress(&self) -> GoalProgress {
        match &self.state {
            Some(state) => state.progress(),
            None => GoalProgress { completed: 0, total: 0 },
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress().is_complete()
    }

    pub fn has_failed_turn(&self) -> bool {
        self.failed_turn.is_some()
    }

    /// Reserve a sequence number for a request about to be sent.
    pub fn begin(&mut self, op: Operation) -> Ticket {
        self.next_seq += 1;
        Ticket {
            seq: self.next_seq,
            op,
            issued_at: Instant::now(),
        }
    }

    /// Apply a result unless something newer already landed.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<SimulationState, ServiceError>,
    ) -> Result<TurnOutcome, Notice> {
        let stale = ticket.seq <= self.applied_seq;

        match result {
            Ok(state) => {
                if stale {
                    warn!("Discarding stale {:?} response (seq {} <= {})", ticket.op, ticket.seq, self.applied_seq);
                    self.telemetry
                        .record(TelemetryEvent::StaleResponseDiscarded { op: ticket.op });
                    return Ok(TurnOutcome::Stale);
                }
                self.telemetry.record(TelemetryEvent::RequestCompleted {
                    op: ticket.op,
                    latency_ms: ticket.issued_at.elapsed().as_millis() as u64,
                });
                self.applied_seq = ticket.seq;
                self.state = Some(state);
                Ok(TurnOutcome::Applied)
            }
            Err(e) => {
                self.telemetry.record(TelemetryEvent::RequestFailed {
                    op: ticket.op,
                    kind: e.kind,
                });
                if stale {
                    return Ok(TurnOutcome::Stale);
                }
                error!("{:?} failed: {}", ticket.op, e);
                Err(match e.kind {
                    ErrorKind::RateLimited => Notice::QuotaExhausted,
                    kind => Notice::TurnFailed { kind },
                })
            }
        }
    }

    pub fn issue_start(&mut self) -> PendingTurn {
        info!("Session {} starting scenario '{}'", self.id, self.scenario.id);
        self.issue(Turn::Start, Vec::new())
    }

    /// `None` for a blank utterance; nothing is sent.
    pub fn issue_say(&mut self, utterance: &str) -> Result<Option<PendingTurn>, Notice> {
        if utterance.trim().is_empty() {
            return Ok(None);
        }
        let goals = self.current_goals()?;
        Ok(Some(self.issue(Turn::Say(utterance.to_string()), goals)))
    }

    pub fn issue_hint(&mut self) -> Result<PendingTurn, Notice> {
        let goals = self.current_goals()?;
        Ok(self.issue(Turn::Hint, goals))
    }

    /// Re-issue the most recent failed turn, if any.
    pub fn issue_retry(&mut self) -> Option<Result<PendingTurn, Notice>> {
        let turn = self.failed_turn.take()?;
        Some(match turn {
            Turn::Start => Ok(self.issue_start()),
            turn => self
                .current_goals()
                .map(|goals| self.issue(turn, goals)),
        })
    }

    fn current_goals(&self) -> Result<Vec<Goal>, Notice> {
        match &self.state {
            Some(state) => Ok(state.goal_status.clone()),
            None => Err(Notice::NotStarted),
        }
    }

    fn issue(&mut self, turn: Turn, goals: Vec<Goal>) -> PendingTurn {
        let op = match turn {
            Turn::Start => Operation::StartSimulation,
            Turn::Say(_) => Operation::SendMessage,
            Turn::Hint => Operation::GetHint,
        };
        let ticket = self.begin(op);
        let span = info_span!("turn", session = %self.id, seq = ticket.seq, op = ?op);
        let client = self.conversation.clone();
        let scenario = self.scenario.prompt_name();
        let screen_text = self
            .state
            .as_ref()
            .map(|s| s.screen_text.clone())
            .unwrap_or_default();
        let utterance = match &turn {
            Turn::Say(utterance) => utterance.clone(),
            _ => String::new(),
        };

        let request = async move {
            match op {
                Operation::StartSimulation => client.start_simulation(&scenario).await,
                Operation::SendMessage => client
                    .send_message(&utterance, &scenario, &goals)
                    .await?
                    .ok_or_else(|| ServiceError::unknown("Blank utterance was issued")),
                Operation::GetHint => client.get_hint(&screen_text, &scenario, &goals).await,
            }
        }
        .instrument(span);

        PendingTurn {
            ticket,
            turn,
            request: Box::pin(request),
        }
    }

    /// Fold a finished request into the session. A newly applied start or
    /// message reply is spoken in the background; the turn does not wait.
    pub fn apply(&mut self, done: CompletedTurn) -> Result<TurnOutcome, Notice> {
        self.drain_speech();
        match self.complete(done.ticket, done.result) {
            Ok(TurnOutcome::Applied) => {
                self.failed_turn = None;
                if !matches!(done.turn, Turn::Hint) {
                    self.speak_current();
                }
                Ok(TurnOutcome::Applied)
            }
            Ok(other) => Ok(other),
            Err(notice) => {
                if notice.can_retry() {
                    self.failed_turn = Some(done.turn);
                }
                Err(notice)
            }
        }
    }

    pub async fn start(&mut self) -> Result<TurnOutcome, Notice> {
        let done = self.issue_start().run().await;
        self.apply(done)
    }

    /// Blank utterances are ignored without a request.
    pub async fn say(&mut self, utterance: &str) -> Result<TurnOutcome, Notice> {
        match self.issue_say(utterance)? {
            Some(pending) => {
                let done = pending.run().await;
                self.apply(done)
            }
            None => Ok(TurnOutcome::Skipped),
        }
    }

    /// Hints are shown, not spoken.
    pub async fn hint(&mut self) -> Result<TurnOutcome, Notice> {
        let done = self.issue_hint()?.run().await;
        self.apply(done)
    }

    pub async fn retry_failed(&mut self) -> Option<Result<TurnOutcome, Notice>> {
        let pending = match self.issue_retry()? {
            Ok(pending) => pending,
            Err(notice) => return Some(Err(notice)),
        };
        let done = pending.run().await;
        Some(self.apply(done))
    }

    fn speak_current(&mut self) {
        let Some(line) = self.state.as_ref().map(|s| s.character_voice.clone()) else {
            return;
        };
        let speech = self.speech.clone();
        let tx = self.speech_tx.clone();
        let span = info_span!("speech", session = %self.id, seq = self.applied_seq);
        self.speech_pending += 1;
        tokio::spawn(
            async move {
                let outcome = speech.speak(&line).await;
                let _ = tx.send(outcome);
            }
            .instrument(span),
        );
    }

    fn record_speech(&mut self, outcome: &SpeechOutcome) {
        self.speech_pending = self.speech_pending.saturating_sub(1);
        self.telemetry.record(TelemetryEvent::Speech { outcome: outcome.kind() });
    }

    /// Record speech that has already finished, without waiting.
    pub fn drain_speech(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(outcome) = self.speech_rx.try_recv() {
            self.record_speech(&outcome);
            drained += 1;
        }
        drained
    }

    /// Wait for the next background speech result. `None` when nothing is in flight.
    pub async fn next_speech(&mut self) -> Option<SpeechOutcome> {
        if self.speech_pending == 0 {
            return None;
        }
        let outcome = self.speech_rx.recv().await?;
        self.record_speech(&outcome);
        Some(outcome)
    }

    /// Wait for every line still being synthesized or handed to the sink.
    pub async fn settle_speech(&mut self) -> Vec<SpeechOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next_speech().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}
