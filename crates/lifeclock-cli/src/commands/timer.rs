use clap::{Args, Subcommand};
use lifeclock_core::storage::{SnapshotStore, SqliteSnapshotStore};
use lifeclock_core::timer::{
    format_countdown, Scheduler, SchedulerOptions, StateReply, TimerConfiguration, TimerState,
};
use lifeclock_core::Config;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Args, Clone, Copy)]
pub struct Minutes {
    /// Total session length in minutes (default from config)
    #[arg(long)]
    total: Option<i64>,
    /// Work segment length in minutes (default from config)
    #[arg(long)]
    segment: Option<i64>,
    /// Break length in minutes (default from config)
    #[arg(long)]
    grace: Option<i64>,
}

impl Minutes {
    fn resolve(self, config: &Config) -> Result<TimerConfiguration, Box<dyn std::error::Error>> {
        let defaults = &config.timer;
        Ok(TimerConfiguration::new(
            self.total.unwrap_or(i64::from(defaults.total_minutes)),
            self.segment.unwrap_or(i64::from(defaults.segment_minutes)),
            self.grace.unwrap_or(i64::from(defaults.grace_minutes)),
        )?)
    }
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print how a session divides into blocks, as JSON
    Plan {
        #[command(flatten)]
        minutes: Minutes,
    },
    /// Run a session in the foreground (stdin: pause, resume, status, stop)
    Run {
        #[command(flatten)]
        minutes: Minutes,
        /// Continue the persisted session instead of starting a new one
        #[arg(long)]
        resume: bool,
    },
    /// Print the persisted timer state as JSON
    Status,
    /// Discard the persisted timer state
    Clear,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Plan { minutes } => {
            let config = minutes.resolve(&Config::load()?)?;
            let plan = config.plan();
            let out = json!({
                "configuration": config,
                "plan": plan,
                "workSegments": plan.work_segments(),
                "breaks": plan.breaks(config.grace_minutes()),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        TimerAction::Run { minutes, resume } => {
            let config = minutes.resolve(&Config::load()?)?;
            let store = SqliteSnapshotStore::open()?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_foreground(store, config, resume))?;
        }
        TimerAction::Status => {
            let mut store = SqliteSnapshotStore::open()?;
            let reply = StateReply::from_state(store.restore().as_ref());
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        TimerAction::Clear => {
            let mut store = SqliteSnapshotStore::open()?;
            store.clear()?;
            println!("timer state cleared");
        }
    }
    Ok(())
}

fn status_line(state: Option<&TimerState>) -> String {
    let Some(state) = state else {
        return "idle".to_string();
    };
    let phase = if state.is_work_phase { "work" } else { "break" };
    let segment = if state.in_tail() {
        "final".to_string()
    } else {
        format!("{}/{}", state.current_block_index + 1, state.block_count)
    };
    let paused = if state.paused { " (paused)" } else { "" };
    format!(
        "{phase} {segment} {}{paused}",
        format_countdown(state.seconds_remaining_in_phase)
    )
}

async fn run_foreground(
    store: SqliteSnapshotStore,
    config: TimerConfiguration,
    resume: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (handle, task) = Scheduler::spawn_joinable(Box::new(store), SchedulerOptions::default());
    let mut notifications = handle.subscribe();

    let existing = handle.query_state().await?.timer_state;
    match (resume, existing) {
        (true, Some(state)) => println!("resumed: {}", status_line(Some(&state))),
        (true, None) => return Err("no persisted session to resume".into()),
        (false, _) => {
            let ack = handle.start(config).await?;
            if let Some(error) = ack.error {
                return Err(error.into());
            }
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            // Print pending notifications before acting on the next command.
            biased;
            notification = notifications.recv() => match notification {
                Ok(n) => {
                    println!("[{}] {}", n.title(), n.message());
                    if n.is_terminal() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed timer notifications");
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match line.trim() {
                    "pause" => { handle.pause().await?; println!("paused"); }
                    "resume" => { handle.resume().await?; println!("resumed"); }
                    "status" => {
                        let reply = handle.query_state().await?;
                        println!("{}", status_line(reply.timer_state.as_ref()));
                    }
                    "stop" => {
                        handle.stop().await?;
                        println!("stopped");
                        break;
                    }
                    "" => {}
                    other => eprintln!("unknown command: {other} (pause, resume, status, stop)"),
                },
                None => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                // The snapshot stays so `timer run --resume` can pick it up.
                handle.pause().await?;
                println!("interrupted; session paused");
                break;
            }
        }
    }

    // The task writes its final snapshot once the last handle drops.
    drop(handle);
    task.await?;
    Ok(())
}
