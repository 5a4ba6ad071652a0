//! Computes one user's PLN on one token and prints it.
//!
//! Run with `cargo run --example simple_usage`.

use odin_pln::{logging, Config, PlnCalculator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init();
    tracing::subscriber::set_global_default(logging::subscriber(&config)?)?;

    let calculator = PlnCalculator::new(config)?;

    let user_id = "vj5mg-hquhw-x2amt-ukf2l-zgnjw-bbsac-s35gm-pycq6-fzuny-v6e7g-2ae";
    // Replace with a token the user actually traded.
    let token_id = "2933";
    let days = 30;

    println!("Calculating PLN for user {user_id}, token {token_id} over the last {days} days...");

    let result = calculator.format_token_pln(user_id, token_id, days).await;
    match (result.figures, result.error) {
        (Some(figures), _) => {
            println!("\n===== PLN Calculation Results =====");
            println!("Realized PLN: {}", figures.realized_pln);
            println!("Unrealized PLN: {}", figures.unrealized_pln);
            println!("Total PLN: {}", figures.total_pln);
            println!("Yield Rate: {}", figures.yield_rate);
            println!("Current Holdings: {} tokens", figures.current_holdings);
            println!("{}", "=".repeat(35));
        }
        (None, error) => println!("Calculation failed: {}", error.unwrap_or_default()),
    }

    Ok(())
}
