use chrono::NaiveDate;
use clap::Args;
use lifeclock_core::{Config, Lifespan};
use serde_json::json;

#[derive(Args)]
pub struct LifespanArgs {
    /// Birth date, YYYY-MM-DD (default from config)
    #[arg(long)]
    birth: Option<NaiveDate>,
    /// Expected lifespan in years (default from config)
    #[arg(long)]
    years: Option<u32>,
    /// Print the countdown as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: LifespanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let birth = args
        .birth
        .or(config.lifespan.birth_date)
        .ok_or("no birth date: pass --birth or run `lifeclock config set lifespan.birth_date YYYY-MM-DD`")?;
    let years = args.years.unwrap_or(config.lifespan.expected_years);

    let lifespan = Lifespan::new(birth, years)?;
    let countdown = lifespan.countdown()?;

    if args.json {
        let out = json!({
            "birthDate": lifespan.birth_date(),
            "expectedYears": lifespan.expected_years(),
            "countdown": countdown,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if countdown.is_over() {
        println!("Expected lifespan of {years} years reached. Every day is a bonus.");
    } else {
        println!("{countdown} remaining");
        println!(
            "{} weeks left, {:.1}% lived",
            countdown.weeks_remaining, countdown.percent_lived
        );
    }
    Ok(())
}
