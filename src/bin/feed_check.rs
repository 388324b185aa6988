//! Binary to connect to the trading backend's live feed and print events for
//! inspecting live data.
//!
//! # Usage
//!
//! ```sh
//! export FEED_API_BASE_URL="https://your-backend.example.com/api"
//! export FEED_USERNAME="demo"
//! export FEED_PASSWORD="demo"
//! cargo run --bin feed_check --features cli
//! ```

use std::env;
use std::time::Duration;

use tokio::time;
use tradefeed_rs::client::FeedApiClient;
use tradefeed_rs::feed::session::FeedSession;
use tradefeed_rs::types::auth::Credentials;
use tradefeed_rs::types::feed::FeedEvent;

#[tokio::main]
async fn main() -> tradefeed_rs::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let username = env::var("FEED_USERNAME").unwrap_or_else(|_| "demo".to_owned());
    let password = env::var("FEED_PASSWORD").unwrap_or_else(|_| "demo".to_owned());

    let api = FeedApiClient::new();
    println!("Connecting to {}…", api.base_url());

    let mut session = FeedSession::new(api, Credentials::new(username, password));
    let mut events = session.events();

    let mode = session.connect().await?;
    println!("Feed established in {mode} mode");

    session.join_trading_room().await?;

    println!("Listening for events for 30 seconds…\n");
    let deadline = time::sleep(Duration::from_secs(30));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                println!("\n30 seconds elapsed — disconnecting…");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(FeedEvent::TradingData(records)) => {
                        println!("trading data: {} records", records.len());
                    }
                    Ok(FeedEvent::StockUpdate(record)) => {
                        println!("stock update: {record}");
                    }
                    Ok(FeedEvent::ConnectionStatus(up)) => {
                        println!("connection status: {up}");
                    }
                    Err(e) => {
                        println!("event channel closed: {e}");
                        break;
                    }
                }
            }
        }
    }

    session.disconnect().await;
    println!("Done.");

    Ok(())
}
