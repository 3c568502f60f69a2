//! Message contract between UI surfaces and the scheduler.
//!
//! Commands and replies are plain serde types so the same contract works
//! in-process (through [`SchedulerHandle::dispatch`]) or across any transport
//! that carries JSON.
//!
//! [`SchedulerHandle::dispatch`]: super::scheduler::SchedulerHandle::dispatch

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::engine::TimerState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerCommand {
    StartTimer { total: i64, segment: i64, grace: i64 },
    PauseTimer,
    ResumeTimer,
    StopTimer,
    GetTimerState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// Reply to `GET_TIMER_STATE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateReply {
    #[serde(default)]
    pub timer_state: Option<TimerState>,
    #[serde(default)]
    pub paused: bool,
}

impl StateReply {
    pub fn from_state(state: Option<&TimerState>) -> Self {
        Self {
            paused: state.is_some_and(|s| s.paused),
            timer_state: state.cloned(),
        }
    }

    /// The snapshot an observer may render from, or `None` when there is no
    /// session or the snapshot breaks a structural invariant.
    pub fn reconcile(self) -> Option<TimerState> {
        let state = self.timer_state?;
        match state.validate() {
            Ok(()) => Some(state),
            Err(e) => {
                debug!("discarding timer snapshot: {e}");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimerResponse {
    Ack(Ack),
    State(StateReply),
}

/// Reconcile an untrusted, serialized snapshot (a persisted copy or a reply
/// that crossed a process boundary). Anything malformed reads as "no session".
pub fn reconcile_json(raw: &str) -> Option<TimerState> {
    match serde_json::from_str::<TimerState>(raw) {
        Ok(state) => StateReply::from_state(Some(&state)).reconcile(),
        Err(e) => {
            debug!("discarding unparseable timer snapshot: {e}");
            None
        }
    }
}
