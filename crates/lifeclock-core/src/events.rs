use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every scheduler transition produces a Notification.
/// Observers poll the scheduler for state; notifications are fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    SessionStarted {
        block_count: u32,
        segment_minutes: u32,
        grace_minutes: u32,
        tail_minutes: u32,
        at: DateTime<Utc>,
    },
    BreakStarted {
        /// 1-based number of the block whose work segment just ended.
        block_number: u32,
        grace_minutes: u32,
        at: DateTime<Utc>,
    },
    SegmentStarted {
        /// 1-based.
        segment_number: u32,
        block_count: u32,
        at: DateTime<Utc>,
    },
    FinalSegment {
        tail_minutes: u32,
        at: DateTime<Utc>,
    },
    SessionComplete {
        total_minutes: u32,
        at: DateTime<Utc>,
    },
}

impl Notification {
    pub fn title(&self) -> &'static str {
        match self {
            Notification::SessionStarted { .. } => "Timer Started",
            Notification::BreakStarted { .. } => "Break Time!",
            Notification::SegmentStarted { .. } => "Back to Work",
            Notification::FinalSegment { .. } => "Final Segment",
            Notification::SessionComplete { .. } => "Session Complete!",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notification::SessionStarted {
                block_count: 0,
                tail_minutes,
                ..
            } => format!("Working for {tail_minutes} minutes with no breaks."),
            Notification::SessionStarted {
                block_count,
                segment_minutes,
                grace_minutes,
                tail_minutes,
                ..
            } => {
                let mut msg = format!(
                    "{block_count} block(s) of {segment_minutes} min work + {grace_minutes} min break"
                );
                if *tail_minutes > 0 {
                    msg.push_str(&format!(", then a final {tail_minutes} min segment"));
                }
                msg.push('.');
                msg
            }
            Notification::BreakStarted {
                block_number,
                grace_minutes,
                ..
            } => format!("Segment {block_number} done. Take a {grace_minutes} minute break."),
            Notification::SegmentStarted {
                segment_number,
                block_count,
                ..
            } => format!("Segment {segment_number} of {block_count} has started."),
            Notification::FinalSegment { tail_minutes, .. } => {
                format!("Last stretch: {tail_minutes} minutes of work, no break after.")
            }
            Notification::SessionComplete { total_minutes, .. } => {
                format!("All {total_minutes} minutes done. Great work!")
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Notification::SessionComplete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_started_describes_blocks() {
        let n = Notification::SessionStarted {
            block_count: 3,
            segment_minutes: 20,
            grace_minutes: 5,
            tail_minutes: 20,
            at: Utc::now(),
        };
        assert_eq!(
            n.message(),
            "3 block(s) of 20 min work + 5 min break, then a final 20 min segment."
        );
    }

    #[test]
    fn tagged_serialization() {
        let n = Notification::FinalSegment {
            tail_minutes: 20,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "final_segment");
        assert_eq!(json["tail_minutes"], 20);
    }
}
