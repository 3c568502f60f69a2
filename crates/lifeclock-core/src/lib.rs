//! # Lifeclock Core Library
//!
//! Shared business logic for the Lifeclock tools: a segmented work/break timer,
//! a dream analysis gateway with a local fallback, and a lifespan countdown.
//! The CLI and the HTTP relay are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: pure block math plus a one-second-tick state machine. A single
//!   scheduler task owns the authoritative state; UI surfaces talk to it
//!   through the sync protocol and never hold a second copy.
//! - **Dream**: input validation, per-client rate limiting, a bounded call to a
//!   completion backend and strict parsing of its reply. Callers that cannot
//!   reach the relay fall back to keyword heuristics.
//! - **Storage**: SQLite key-value snapshots for crash recovery and TOML
//!   configuration.
//!
//! ## Key Components
//!
//! - [`SegmentEngine`]: the timer state machine
//! - [`Scheduler`]: the task that ticks it and persists snapshots
//! - [`DreamGateway`]: validation, rate limiting and upstream analysis
//! - [`DreamClient`]: relay client with heuristic fallback
//! - [`Config`]: application configuration

pub mod dream;
pub mod error;
pub mod events;
pub mod lifespan;
pub mod storage;
pub mod timer;

pub use dream::{DreamClient, DreamGateway};
pub use error::{ConfigError, CoreError, ErrorKind, GatewayError, StorageError, ValidationError};
pub use events::Notification;
pub use lifespan::{Countdown, Lifespan};
pub use storage::{Config, Database};
pub use timer::{Scheduler, SchedulerHandle, SegmentEngine, TimerConfiguration, TimerState};
