use std::io::Read;
use std::time::Duration;

use clap::Subcommand;
use lifeclock_core::dream::{heuristic, Analysis, AnalysisSource, AnalyzeRequest, DreamClient};
use lifeclock_core::Config;
use serde_json::json;

#[derive(Subcommand)]
pub enum DreamAction {
    /// Analyze through the relay, falling back to local heuristics
    Analyze {
        /// Dream text (read from stdin when omitted)
        text: Option<String>,
        /// Relay endpoint (default from config)
        #[arg(long)]
        endpoint: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze locally without contacting the relay
    Offline {
        /// Dream text (read from stdin when omitted)
        text: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn read_text(text: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    let raw = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    // Same bounds the relay enforces.
    let text = AnalyzeRequest::new(raw).validated_text()?.to_string();
    Ok(text)
}

fn print_analysis(analysis: &Analysis, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let out = json!({
            "source": analysis.source.as_str(),
            "result": analysis.result,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let result = &analysis.result;
    println!("Emotions:   {}", result.emotions.join(", "));
    println!("Themes:     {}", result.themes.join(", "));
    if !result.symbols.is_empty() {
        println!("Symbols:    {}", result.symbols.join(", "));
    }
    println!(
        "Confidence: {:.2} ({})",
        result.confidence,
        analysis.source.as_str()
    );
    println!();
    println!("{}", result.interpretation);
    Ok(())
}

pub fn run(action: DreamAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DreamAction::Analyze {
            text,
            endpoint,
            json,
        } => {
            let text = read_text(text)?;
            let config = Config::load()?;
            let client = match endpoint {
                Some(endpoint) => {
                    DreamClient::new(&endpoint, Duration::from_secs(config.gateway.timeout_secs))?
                }
                None => DreamClient::from_config(&config.gateway)?,
            };
            let runtime = tokio::runtime::Runtime::new()?;
            let analysis = runtime.block_on(client.analyze_or_fallback(&text));
            if analysis.source == AnalysisSource::Heuristic {
                eprintln!("note: relay unavailable, showing offline analysis");
            }
            print_analysis(&analysis, json)?;
        }
        DreamAction::Offline { text, json } => {
            let text = read_text(text)?;
            let analysis = Analysis {
                result: heuristic::analyze(&text),
                source: AnalysisSource::Heuristic,
            };
            print_analysis(&analysis, json)?;
        }
    }
    Ok(())
}
