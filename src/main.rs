use anyhow::{bail, Context};
use clap::Parser;

use odin_pln::{logging, pln::format, Config, PlnCalculator};

const ALLOWED_DAYS: [u32; 5] = [7, 14, 30, 90, 120];

#[derive(Parser)]
#[command(name = "odin-pln", about = "Odin PLN (Profit/Loss Net) calculator")]
struct Cli {
    /// User ID
    #[arg(long)]
    user: String,

    /// Token ID
    #[arg(long)]
    token: Option<String>,

    /// Day range for the calculation
    #[arg(long, default_value = "30", value_parser = parse_days)]
    days: u32,

    /// Calculate total PLN for all tokens
    #[arg(long)]
    total_pln: bool,

    /// Number of most active tokens to include in the total
    #[arg(long, default_value = "5")]
    top_tokens: usize,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Fetch and print the user's profile first
    #[arg(long)]
    show_user: bool,
}

fn parse_days(value: &str) -> Result<u32, String> {
    let days: u32 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of days"))?;
    if ALLOWED_DAYS.contains(&days) {
        Ok(days)
    } else {
        Err(format!("days must be one of {:?}", ALLOWED_DAYS))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::init();
    let subscriber = logging::subscriber(&config).context("Could not open the log file")?;
    tracing::subscriber::set_global_default(subscriber)?;

    let calculator = PlnCalculator::new(config)?;

    if cli.show_user {
        match calculator.external().get_user_info(&cli.user).await {
            Ok(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            Err(e) => eprintln!("Failed to get user info: {e}"),
        }
    }

    if cli.total_pln {
        let result = calculator.calculate_total_pln(&cli.user, cli.days, cli.top_tokens);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }
        println!(
            "\nTotal PLN statistics for user {} (last {} days):",
            cli.user, cli.days
        );
        println!("\nTotal PLN: {}", format::btc(result.total_pln));
        println!("Yield Rate: {}%", result.yield_rate);
        println!("Token Count: {}", result.token_count);
    } else if let Some(token) = &cli.token {
        let result = calculator.format_token_pln(&cli.user, token, cli.days).await;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }
        match (&result.figures, &result.error) {
            (Some(figures), _) => {
                println!(
                    "\nPLN statistics for user {}, token {} (last {}):",
                    cli.user, token, figures.time_range
                );
                println!("\nRealized PLN: {}", figures.realized_pln);
                println!("Unrealized PLN: {}", figures.unrealized_pln);
                println!("Total PLN: {}", figures.total_pln);
                println!("Yield Rate: {}", figures.yield_rate);
                println!("Current Holdings: {} tokens", figures.current_holdings);
            }
            (None, error) => {
                bail!(
                    "Calculation failed: {}",
                    error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    } else {
        bail!("Please specify a token ID (--token) or use --total-pln to calculate total PLN");
    }

    Ok(())
}
