//! Segment engine: the work/break state machine.
//!
//! The engine does not use internal threads or clocks for progress - the
//! owner calls `tick()` once per second. See `scheduler` for the task that
//! does so.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running(Work) <--> Running(Break)
//!                    |   ^
//!              pause |   | resume
//!                    v   |
//!                   Paused
//! Running --tick at end of last work--> Completed --> Idle
//! any --stop--> Idle
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::plan::{minutes_to_secs, BlockPlan, TimerConfiguration};
use crate::error::ValidationError;
use crate::events::Notification;

/// The scheduler's single mutable entity.
///
/// Also the snapshot type handed to observers and persisted for recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub total_minutes: u32,
    pub segment_minutes: u32,
    pub grace_minutes: u32,
    pub full_block_minutes: u32,
    pub block_count: u32,
    pub tail_minutes: u32,
    pub current_block_index: u32,
    pub is_work_phase: bool,
    pub seconds_remaining_in_phase: u64,
    pub paused: bool,
    pub started_at_epoch_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Work,
    Break,
}

/// Externally visible state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Running(PhaseKind),
    Paused(PhaseKind),
}

/// Outcome of a phase reaching zero.
enum PhaseEnd {
    Continue(Notification),
    Complete,
}

impl TimerState {
    fn begin(config: &TimerConfiguration, now_ms: u64) -> Self {
        let BlockPlan {
            full_block_minutes,
            block_count,
            tail_minutes,
        } = config.plan();
        // With no full block, the whole session is the tail.
        let first_minutes = if block_count == 0 {
            tail_minutes
        } else {
            config.segment_minutes()
        };
        Self {
            total_minutes: config.total_minutes(),
            segment_minutes: config.segment_minutes(),
            grace_minutes: config.grace_minutes(),
            full_block_minutes,
            block_count,
            tail_minutes,
            current_block_index: 0,
            is_work_phase: true,
            seconds_remaining_in_phase: minutes_to_secs(first_minutes),
            paused: false,
            started_at_epoch_ms: now_ms,
        }
    }

    pub fn phase_kind(&self) -> PhaseKind {
        if self.is_work_phase {
            PhaseKind::Work
        } else {
            PhaseKind::Break
        }
    }

    /// True while running the work-only tail after the last regular block.
    pub fn in_tail(&self) -> bool {
        self.current_block_index >= self.block_count
    }

    /// Full length of the phase currently running, in seconds.
    pub fn phase_length_secs(&self) -> u64 {
        let minutes = if !self.is_work_phase {
            self.grace_minutes
        } else if self.in_tail() {
            self.tail_minutes
        } else {
            self.segment_minutes
        };
        minutes_to_secs(minutes)
    }

    /// Check the structural invariants a snapshot must satisfy before an
    /// observer (or a restarting scheduler) trusts it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let config = TimerConfiguration::new(
            i64::from(self.total_minutes),
            i64::from(self.segment_minutes),
            i64::from(self.grace_minutes),
        )?;
        if config.plan()
            != (BlockPlan {
                full_block_minutes: self.full_block_minutes,
                block_count: self.block_count,
                tail_minutes: self.tail_minutes,
            })
        {
            return Err(ValidationError::invalid(
                "timerState",
                "block layout does not match configuration",
            ));
        }
        if self.current_block_index > self.block_count {
            return Err(ValidationError::invalid(
                "currentBlockIndex",
                "exceeds blockCount",
            ));
        }
        if self.in_tail() && (self.tail_minutes == 0 || !self.is_work_phase) {
            return Err(ValidationError::invalid(
                "currentBlockIndex",
                "session is past its last segment",
            ));
        }
        if self.seconds_remaining_in_phase == 0
            || self.seconds_remaining_in_phase > self.phase_length_secs()
        {
            return Err(ValidationError::invalid(
                "secondsRemainingInPhase",
                "outside the current phase length",
            ));
        }
        Ok(())
    }

    fn has_more_work(&self) -> bool {
        let next = self.current_block_index + 1;
        next < self.block_count || (next == self.block_count && self.tail_minutes > 0)
    }

    fn end_phase(&mut self) -> PhaseEnd {
        if !self.is_work_phase {
            return self.end_break();
        }
        if !self.has_more_work() {
            return PhaseEnd::Complete;
        }
        if self.grace_minutes == 0 {
            // A zero-length break is never observable.
            return self.end_break();
        }
        self.is_work_phase = false;
        self.seconds_remaining_in_phase = minutes_to_secs(self.grace_minutes);
        PhaseEnd::Continue(Notification::BreakStarted {
            block_number: self.current_block_index + 1,
            grace_minutes: self.grace_minutes,
            at: Utc::now(),
        })
    }

    fn end_break(&mut self) -> PhaseEnd {
        self.current_block_index += 1;
        self.is_work_phase = true;
        if self.current_block_index >= self.block_count {
            if self.tail_minutes == 0 {
                return PhaseEnd::Complete;
            }
            self.seconds_remaining_in_phase = minutes_to_secs(self.tail_minutes);
            return PhaseEnd::Continue(Notification::FinalSegment {
                tail_minutes: self.tail_minutes,
                at: Utc::now(),
            });
        }
        self.seconds_remaining_in_phase = minutes_to_secs(self.segment_minutes);
        PhaseEnd::Continue(Notification::SegmentStarted {
            segment_number: self.current_block_index + 1,
            block_count: self.block_count,
            at: Utc::now(),
        })
    }
}

/// Core segment engine. Holds at most one [`TimerState`].
#[derive(Debug, Clone, Default)]
pub struct SegmentEngine {
    state: Option<TimerState>,
}

impl SegmentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an engine from a persisted snapshot.
    pub fn restore(state: TimerState) -> Result<Self, ValidationError> {
        state.validate()?;
        Ok(Self { state: Some(state) })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> Option<&TimerState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> EnginePhase {
        match &self.state {
            None => EnginePhase::Idle,
            Some(s) if s.paused => EnginePhase::Paused(s.phase_kind()),
            Some(s) => EnginePhase::Running(s.phase_kind()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase(), EnginePhase::Running(_))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a new session, replacing any existing one.
    pub fn start(&mut self, config: &TimerConfiguration, now_ms: u64) -> Notification {
        let state = TimerState::begin(config, now_ms);
        let notification = Notification::SessionStarted {
            block_count: state.block_count,
            segment_minutes: state.segment_minutes,
            grace_minutes: state.grace_minutes,
            tail_minutes: state.tail_minutes,
            at: Utc::now(),
        };
        self.state = Some(state);
        notification
    }

    /// Returns whether anything changed. Pausing while idle or paused is a no-op.
    pub fn pause(&mut self) -> bool {
        match self.state.as_mut() {
            Some(s) if !s.paused => {
                s.paused = true;
                true
            }
            _ => false,
        }
    }

    pub fn resume(&mut self) -> bool {
        match self.state.as_mut() {
            Some(s) if s.paused => {
                s.paused = false;
                true
            }
            _ => false,
        }
    }

    pub fn stop(&mut self) -> bool {
        self.state.take().is_some()
    }

    /// Advance one second. Returns a notification when a phase ends.
    ///
    /// When the last work phase ends the state is dropped and
    /// `SessionComplete` is returned; later ticks are no-ops.
    pub fn tick(&mut self) -> Option<Notification> {
        let state = self.state.as_mut()?;
        if state.paused {
            return None;
        }
        state.seconds_remaining_in_phase = state.seconds_remaining_in_phase.saturating_sub(1);
        if state.seconds_remaining_in_phase > 0 {
            return None;
        }
        match state.end_phase() {
            PhaseEnd::Continue(notification) => Some(notification),
            PhaseEnd::Complete => {
                let total_minutes = state.total_minutes;
                self.state = None;
                Some(Notification::SessionComplete {
                    total_minutes,
                    at: Utc::now(),
                })
            }
        }
    }
}
