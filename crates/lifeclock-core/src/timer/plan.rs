//! Timer arithmetic: configuration validation, block layout, countdown text.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A validated `(total, segment, grace)` triple in minutes.
///
/// Constructed only through [`TimerConfiguration::new`], so holding one means
/// `0 < segment < total`, `grace >= 0`, and `segment + grace` fits in a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfiguration {
    total_minutes: u32,
    segment_minutes: u32,
    grace_minutes: u32,
}

impl TimerConfiguration {
    pub fn new(total: i64, segment: i64, grace: i64) -> Result<Self, ValidationError> {
        if total <= 0 {
            return Err(ValidationError::invalid("totalMinutes", "must be greater than 0"));
        }
        if segment <= 0 {
            return Err(ValidationError::invalid("segmentMinutes", "must be greater than 0"));
        }
        if grace < 0 {
            return Err(ValidationError::invalid("graceMinutes", "must not be negative"));
        }
        if segment >= total {
            return Err(ValidationError::invalid(
                "segmentMinutes",
                "must be less than totalMinutes",
            ));
        }
        let narrow = |field: &str, v: i64| {
            u32::try_from(v).map_err(|_| ValidationError::invalid(field, "is too large"))
        };
        let total_minutes = narrow("totalMinutes", total)?;
        let segment_minutes = narrow("segmentMinutes", segment)?;
        let grace_minutes = narrow("graceMinutes", grace)?;
        // A full block is segment + grace and must fit the same width.
        if segment_minutes.checked_add(grace_minutes).is_none() {
            return Err(ValidationError::invalid(
                "graceMinutes",
                "is too large for segmentMinutes",
            ));
        }
        Ok(Self {
            total_minutes,
            segment_minutes,
            grace_minutes,
        })
    }

    pub fn total_minutes(&self) -> u32 {
        self.total_minutes
    }

    pub fn segment_minutes(&self) -> u32 {
        self.segment_minutes
    }

    pub fn grace_minutes(&self) -> u32 {
        self.grace_minutes
    }

    pub fn plan(&self) -> BlockPlan {
        BlockPlan::for_config(self)
    }
}

impl<'de> Deserialize<'de> for TimerConfiguration {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            total_minutes: i64,
            segment_minutes: i64,
            grace_minutes: i64,
        }
        let raw = Raw::deserialize(deserializer)?;
        TimerConfiguration::new(raw.total_minutes, raw.segment_minutes, raw.grace_minutes)
            .map_err(serde::de::Error::custom)
    }
}

/// How a session divides into work+break blocks and a trailing work-only tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPlan {
    pub full_block_minutes: u32,
    pub block_count: u32,
    pub tail_minutes: u32,
}

impl BlockPlan {
    pub fn for_config(config: &TimerConfiguration) -> Self {
        // segment > 0, so the divisor is never zero.
        let full_block_minutes = config.segment_minutes + config.grace_minutes;
        Self {
            full_block_minutes,
            block_count: config.total_minutes / full_block_minutes,
            tail_minutes: config.total_minutes % full_block_minutes,
        }
    }

    /// Number of work segments the session runs, tail included.
    pub fn work_segments(&self) -> u32 {
        self.block_count + u32::from(self.tail_minutes > 0)
    }

    /// Breaks actually taken. The break after the last regular block only
    /// runs when a tail follows it.
    pub fn breaks(&self, grace_minutes: u32) -> u32 {
        if grace_minutes == 0 || self.block_count == 0 {
            return 0;
        }
        if self.tail_minutes > 0 {
            self.block_count
        } else {
            self.block_count - 1
        }
    }
}

pub fn minutes_to_secs(minutes: u32) -> u64 {
    u64::from(minutes) * 60
}

/// Render a countdown as `MM:SS`, or `H:MM:SS` from one hour up.
pub fn format_countdown(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
