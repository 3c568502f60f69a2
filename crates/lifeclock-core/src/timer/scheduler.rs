//! Long-running scheduler task.
//!
//! One tokio task owns the [`SegmentEngine`] and a one-second interval. It is
//! the only writer; everything else talks to it through a cloneable
//! [`SchedulerHandle`] (mpsc commands, oneshot replies). Notifications are
//! published on a broadcast channel for observers that prefer push to polling.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::engine::SegmentEngine;
use super::plan::TimerConfiguration;
use super::protocol::{Ack, StateReply, TimerCommand, TimerResponse};
use crate::error::{CoreError, Result};
use crate::events::Notification;
use crate::storage::SnapshotStore;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Persist at least this often while running, in ticks.
pub const SNAPSHOT_EVERY_TICKS: u32 = 10;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub tick_interval: Duration,
    pub snapshot_every_ticks: u32,
    pub command_buffer: usize,
    pub notification_buffer: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            tick_interval: TICK_INTERVAL,
            snapshot_every_ticks: SNAPSHOT_EVERY_TICKS,
            command_buffer: 32,
            notification_buffer: 64,
        }
    }
}

enum Command {
    Start(TimerConfiguration),
    Pause,
    Resume,
    Stop,
}

/// Each request carries a reply channel of the type it answers with.
enum Envelope {
    Command {
        command: Command,
        reply: oneshot::Sender<Ack>,
    },
    Query {
        reply: oneshot::Sender<StateReply>,
    },
}

/// Cloneable handle to the scheduler task. Dropping every handle shuts the
/// task down after a final snapshot.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Envelope>,
    notifications: broadcast::Sender<Notification>,
}

impl SchedulerHandle {
    async fn send(&self, envelope: Envelope) -> Result<()> {
        self.commands
            .send(envelope)
            .await
            .map_err(|_| CoreError::SchedulerUnavailable)
    }

    async fn command(&self, command: Command) -> Result<Ack> {
        let (reply, rx) = oneshot::channel();
        self.send(Envelope::Command { command, reply }).await?;
        rx.await.map_err(|_| CoreError::SchedulerUnavailable)
    }

    pub async fn start(&self, config: TimerConfiguration) -> Result<Ack> {
        self.command(Command::Start(config)).await
    }

    pub async fn pause(&self) -> Result<Ack> {
        self.command(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<Ack> {
        self.command(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<Ack> {
        self.command(Command::Stop).await
    }

    pub async fn query_state(&self) -> Result<StateReply> {
        let (reply, rx) = oneshot::channel();
        self.send(Envelope::Query { reply }).await?;
        rx.await.map_err(|_| CoreError::SchedulerUnavailable)
    }

    /// Handle a wire-level command. An invalid `START_TIMER` is rejected
    /// here, before it reaches the scheduler.
    pub async fn dispatch(&self, command: TimerCommand) -> Result<TimerResponse> {
        let command = match command {
            TimerCommand::StartTimer {
                total,
                segment,
                grace,
            } => match TimerConfiguration::new(total, segment, grace) {
                Ok(config) => Command::Start(config),
                Err(e) => return Ok(TimerResponse::Ack(Ack::rejected(e.to_string()))),
            },
            TimerCommand::PauseTimer => Command::Pause,
            TimerCommand::ResumeTimer => Command::Resume,
            TimerCommand::StopTimer => Command::Stop,
            TimerCommand::GetTimerState => {
                return self.query_state().await.map(TimerResponse::State);
            }
        };
        self.command(command).await.map(TimerResponse::Ack)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }
}

pub struct Scheduler {
    engine: SegmentEngine,
    store: Box<dyn SnapshotStore>,
    commands: mpsc::Receiver<Envelope>,
    notifications: broadcast::Sender<Notification>,
    ticks_since_snapshot: u32,
    options: SchedulerOptions,
}

impl Scheduler {
    /// Restore from `store` (if it holds a valid snapshot) and spawn the
    /// scheduler task on the current tokio runtime.
    pub fn spawn(store: Box<dyn SnapshotStore>, options: SchedulerOptions) -> SchedulerHandle {
        Self::spawn_joinable(store, options).0
    }

    /// Like [`Scheduler::spawn`], also returning the task handle. It resolves
    /// once every [`SchedulerHandle`] is dropped and the final snapshot is written.
    pub fn spawn_joinable(
        store: Box<dyn SnapshotStore>,
        options: SchedulerOptions,
    ) -> (SchedulerHandle, JoinHandle<()>) {
        let (handle, scheduler) = Self::new(store, options);
        let task = tokio::spawn(scheduler.run());
        (handle, task)
    }

    fn new(mut store: Box<dyn SnapshotStore>, options: SchedulerOptions) -> (SchedulerHandle, Self) {
        let engine = match store.restore() {
            Some(state) => {
                info!(
                    block = state.current_block_index,
                    remaining_secs = state.seconds_remaining_in_phase,
                    paused = state.paused,
                    "resuming timer session from snapshot"
                );
                SegmentEngine::restore(state).unwrap_or_default()
            }
            None => SegmentEngine::new(),
        };
        let (tx, rx) = mpsc::channel(options.command_buffer.max(1));
        let (notifications, _) = broadcast::channel(options.notification_buffer.max(1));
        let handle = SchedulerHandle {
            commands: tx,
            notifications: notifications.clone(),
        };
        let scheduler = Self {
            engine,
            store,
            commands: rx,
            notifications,
            ticks_since_snapshot: 0,
            options,
        };
        (handle, scheduler)
    }

    async fn run(mut self) {
        let period = self.options.tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                biased;
                envelope = self.commands.recv() => match envelope {
                    // Callers may have gone away; a dropped reply is fine.
                    Some(Envelope::Command { command, reply }) => {
                        let _ = reply.send(self.apply(command));
                    }
                    Some(Envelope::Query { reply }) => {
                        let _ = reply.send(StateReply::from_state(self.engine.state()));
                    }
                    None => break,
                },
                _ = ticker.tick() => self.on_tick(),
            }
        }

        self.persist();
        debug!("timer scheduler stopped");
    }

    fn apply(&mut self, command: Command) -> Ack {
        let changed = match command {
            Command::Start(config) => {
                let notification = self.engine.start(&config, now_ms());
                info!(
                    total = config.total_minutes(),
                    segment = config.segment_minutes(),
                    grace = config.grace_minutes(),
                    "timer session started"
                );
                self.publish(notification);
                true
            }
            Command::Pause => self.engine.pause(),
            Command::Resume => self.engine.resume(),
            Command::Stop => self.engine.stop(),
        };
        if changed {
            self.persist();
        }
        Ack::ok()
    }

    fn on_tick(&mut self) {
        if !self.engine.is_running() {
            return;
        }
        match self.engine.tick() {
            Some(notification) => {
                self.publish(notification);
                self.persist();
            }
            None => {
                self.ticks_since_snapshot += 1;
                if self.ticks_since_snapshot >= self.options.snapshot_every_ticks {
                    self.persist();
                }
            }
        }
    }

    fn publish(&self, notification: Notification) {
        debug!(title = notification.title(), "{}", notification.message());
        // No subscribers is normal.
        let _ = self.notifications.send(notification);
    }

    fn persist(&mut self) {
        self.ticks_since_snapshot = 0;
        let result = match self.engine.state() {
            Some(state) => self.store.save(state),
            None => self.store.clear(),
        };
        if let Err(e) = result {
            warn!("failed to persist timer snapshot: {e}");
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
