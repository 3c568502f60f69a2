mod engine;
mod plan;
pub mod protocol;
pub mod scheduler;

pub use engine::{EnginePhase, PhaseKind, SegmentEngine, TimerState};
pub use plan::{format_countdown, minutes_to_secs, BlockPlan, TimerConfiguration};
pub use protocol::{Ack, StateReply, TimerCommand, TimerResponse};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerOptions};
