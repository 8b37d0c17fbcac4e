use axum::Router;
use clap::{Parser, Subcommand};
use order_book_engine::cli::Action;
use order_book_engine::utils::shutdown_token;
use order_book_engine::{api, cli, market_maker, simulate, state::AppState};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "engine-cli")]
#[command(
    author = "Andrew Odiit",
    version = "0.1",
    about = "A demo of a limit-order-book-engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/WebSocket server only.
    Serve { port: u16 },
    /// Run the server alongside the market maker and the synthetic simulator.
    Simulate { port: u16, secs: u64 },
    /// Drive the engine directly; no HTTP involved.
    Interactive {
        #[command(subcommand)]
        action: Action,
    },
}

async fn wait_for_server(api_base: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    loop {
        match client.get(format!("{}/book", api_base)).send().await {
            Ok(resp) if resp.status().is_success() => break,
            _ => tokio::time::sleep(Duration::from_millis(25)).await,
        };
    }
    Ok(())
}

async fn seed_book(ep: &str) -> anyhow::Result<()> {
    // Seed the book with a resting bid @48 and ask @52
    let client = reqwest::Client::new();
    for (side, price) in &[("Buy", 48.0), ("Sell", 52.0)] {
        client
            .post(format!("{}/orders", ep))
            .json(&serde_json::json!({
                "side": side,
                "order_type": "Limit",
                "price": price,
                "quantity": 10.0,
            }))
            .send()
            .await?
            .error_for_status()?;
        tracing::info!(side, price, "seeded resting orders");
    }
    Ok(())
}

async fn get_app_listener(port: u16, state: AppState) -> anyhow::Result<(TcpListener, Router)> {
    let app = api::router(state);
    let ep = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(ep.clone()).await?;
    Ok((listener, app))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Interactive mode never touches the clock/server machinery below.
    if let Commands::Interactive { action } = cli.command {
        cli::dispatch(action);
        return Ok(());
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let state = AppState::new();
    let token = shutdown_token();
    let server_token = token.clone();
    // The base URL our clients (market maker & simulator) will use.
    let base = "http://127.0.0.1".to_string();

    match cli.command {
        Commands::Simulate { port, secs } => {
            let mm_token = token.clone();
            let sim_token = token.clone();
            let mut handlers = tokio::task::JoinSet::new();
            let (listener, app) = get_app_listener(port, state.clone()).await?;
            tracing::warn!("spawning the server task, port: {}, {}", port, secs);
            handlers.spawn(async move {
                tracing::info!(
                    "HTTP/WS server listening on {}",
                    format!("0.0.0.0:{}", port)
                );
                // this will serve forever
                axum::serve(listener, app)
                    .with_graceful_shutdown(server_token.cancelled_owned())
                    .await
                    .unwrap();
            });
            let ep = format!("{}:{}", base.clone(), port);
            tracing::info!("end_point: {}", ep);
            wait_for_server(&ep).await?;
            seed_book(&ep).await?;

            //start market maker
            let mmb = base.clone();
            handlers.spawn(async move {
                if let Err(e) = market_maker::run_market_maker(&mmb, mm_token).await {
                    tracing::error!("Market maker exited: {:?}", e);
                }
            });
            //start simulator
            handlers.spawn(async move {
                if let Err(e) = simulate::run_simulation(
                    simulate::SimConfig {
                        api_base: base,
                        run_secs: if secs == 0 { None } else { Some(secs) },
                        attack_rate_hz: 5.0,
                        ..Default::default()
                    },
                    sim_token,
                )
                .await
                {
                    tracing::error!("Simulation error: {:?}", e);
                }
            });
            handlers.join_all().await;
        }
        Commands::Serve { port } => {
            let (listener, app) = get_app_listener(port, state.clone()).await?;
            let svh = tokio::spawn(async move {
                tracing::info!(
                    "HTTP/WS server listening on {}",
                    format!("0.0.0.0:{}", port)
                );
                axum::serve(listener, app)
                    .with_graceful_shutdown(server_token.cancelled_owned())
                    .await
                    .unwrap();
            });
            svh.await?;
        }
        Commands::Interactive { .. } => unreachable!("handled above"),
    };
    Ok(())
}
