use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub label: String,
    pub emoji: String,
    pub status: GoalStatus,
}

impl Goal {
    pub fn is_completed(&self) -> bool {
        self.status == GoalStatus::Completed
    }
}

/// One turn of a conversation, exactly as the service returned it.
/// Never patched in place: every call yields a fresh value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    /// Text handed to speech synthesis.
    pub character_voice: String,
    pub screen_text: String,
    pub goal_status: Vec<Goal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}

pub const MIN_GOALS: usize = 2;
pub const MAX_GOALS: usize = 3;

impl SimulationState {
    /// Deserializes service output and enforces the turn contract.
    pub fn from_json(text: &str) -> Result<Self, ServiceError> {
        let state: SimulationState = serde_json::from_str(text.trim())?;
        state.validate()?;
        Ok(state)
    }

    /// Blank texts and empty goal lists are contract violations.
    /// Goal counts outside 2..=3 are tolerated.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.character_voice.trim().is_empty() {
            return Err(ServiceError::malformed("characterVoice is empty"));
        }
        if self.screen_text.trim().is_empty() {
            return Err(ServiceError::malformed("screenText is empty"));
        }
        if self.goal_status.is_empty() {
            return Err(ServiceError::malformed("goalStatus is empty"));
        }
        let n = self.goal_status.len();
        if !(MIN_GOALS..=MAX_GOALS).contains(&n) {
            warn!("Service returned {} goals, expected {}-{}", n, MIN_GOALS, MAX_GOALS);
        }
        Ok(())
    }

    pub fn progress(&self) -> GoalProgress {
        GoalProgress::of(&self.goal_status)
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref().filter(|h| !h.trim().is_empty())
    }

    pub fn correction(&self) -> Option<&str> {
        self.correction.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalProgress {
    pub completed: usize,
    pub total: usize,
}

impl GoalProgress {
    pub fn of(goals: &[Goal]) -> Self {
        Self {
            completed: goals.iter().filter(|g| g.is_completed()).count(),
            total: goals.len(),
        }
    }

    /// 0.0 - 1.0. An empty list counts as no progress.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f32 / self.total as f32
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

impl std::fmt::Display for GoalProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} Tasks", self.completed, self.total)
    }
}
