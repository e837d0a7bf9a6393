//! Fetch both vendors once and print the price board (honours mock mode).

use metal_price_tracker::display::render_board;
use metal_price_tracker::ingest::providers::build_providers;
use metal_price_tracker::{poll_quotes, TrackerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = TrackerConfig::load_default()?;
    let providers = build_providers(&cfg)?;
    let polls = poll_quotes(&providers[..]).await;

    println!("{}", render_board(&polls, &cfg.locale));
    Ok(())
}
