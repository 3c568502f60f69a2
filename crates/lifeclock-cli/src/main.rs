use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lifeclock", version, about = "Lifeclock CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segmented work/break timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Dream analysis
    Dream {
        #[command(subcommand)]
        action: commands::dream::DreamAction,
    },
    /// Remaining expected lifetime
    Lifespan(commands::lifespan::LifespanArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    // Diagnostics go to stderr so JSON on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Dream { action } => commands::dream::run(action),
        Commands::Lifespan(args) => commands::lifespan::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
