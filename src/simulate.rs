//! Synthetic order-flow simulator for the engine.
//!
//! Fires Poisson-spaced limit orders at the HTTP API around a randomly
//! drifting mid-price, tracking a toy inventory/P&L so the log output gives
//! a feel for whether the engine is behaving sensibly under load.

use rand::Rng;
use rand_distr::{Distribution, Exp, Exp1, Normal};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::SimulatorError;

#[derive(Clone)]
pub struct SimConfig {
    pub api_base: String,
    pub run_secs: Option<u64>,
    /// Poisson arrival rate (orders/sec), lambda for the inter-arrival draw.
    pub attack_rate_hz: f64,
    /// Standard deviation of the per-tick mid-price drift.
    pub noise_sigma: f64,
    /// Mean order size (unit-exponential draw scaled by this).
    pub mean_qty: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            api_base: "http://127.0.0.1:3000".to_string(),
            run_secs: None,
            attack_rate_hz: 5.0,
            noise_sigma: 0.5,
            mean_qty: 1.0,
        }
    }
}

#[derive(Deserialize)]
struct Ack {
    trades: Vec<AckTrade>,
}

#[derive(Deserialize)]
struct AckTrade {
    price: f64,
    quantity: f64,
}

/// Noisy limit-order simulation loop. Runs until `cfg.run_secs` elapses (or
/// forever if `None`) or `cancel_token` fires.
pub async fn run_simulation(
    cfg: SimConfig,
    cancel_token: CancellationToken,
) -> Result<(), SimulatorError> {
    let client: Client = ClientBuilder::new().timeout(Duration::from_secs(5)).build()?;

    let inter_arrival = Exp::new(cfg.attack_rate_hz).expect("attack_rate_hz must be > 0");
    let drift = Normal::new(0.0, cfg.noise_sigma.max(1e-6)).expect("noise_sigma must be >= 0");
    let size = Exp1;

    let mut inventory: f64 = 0.0;
    let mut pnl: f64 = 0.0;
    let mut mid: f64 = 50.0;
    let start = Instant::now();
    let spread = 1.0_f64;

    loop {
        if let Some(max_secs) = cfg.run_secs {
            if start.elapsed().as_secs() >= max_secs {
                break;
            }
        }

        let wait_secs: f64 = inter_arrival.sample(&mut rand::rng());
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("received shutdown; exiting simulation loop");
                break;
            }
            _ = sleep(Duration::from_secs_f64(wait_secs)) => {}
        }

        let unit: f64 = size.sample(&mut rand::rng());
        let qty = (unit * cfg.mean_qty).max(0.01);

        mid = (mid + drift.sample(&mut rand::rng())).max(0.5);

        let (price, side) = if rand::rng().random_bool(0.5) {
            ((mid - spread).max(0.01), "Buy")
        } else {
            (mid + spread, "Sell")
        };

        match client
            .post(format!("{}/orders", cfg.api_base))
            .json(&json!({
                "side": side,
                "order_type": "Limit",
                "price": price,
                "quantity": qty,
            }))
            .send()
            .await
        {
            Ok(resp) => {
                if let Err(e) = resp.error_for_status_ref() {
                    warn!(error = %e, "order post returned non-success");
                    continue;
                }
                match resp.json::<Ack>().await {
                    Ok(ack) => {
                        for t in ack.trades {
                            if side == "Buy" {
                                inventory -= t.quantity;
                                pnl += t.price * t.quantity;
                            } else {
                                inventory += t.quantity;
                                pnl -= t.price * t.quantity;
                            }
                        }
                        info!(
                            elapsed = format_args!("{:.1}s", start.elapsed().as_secs_f64()),
                            side,
                            qty = format_args!("{:.2}", qty),
                            price = format_args!("{:.2}", price),
                            mid = format_args!("{:.2}", mid),
                            inventory = format_args!("{:.2}", inventory),
                            pnl = format_args!("{:.2}", pnl),
                            "sim tick"
                        );
                    }
                    Err(e) => warn!(error = %e, "failed to parse Ack JSON"),
                }
            }
            Err(e) => {
                warn!(error = %e, "HTTP request failed");
                continue;
            }
        }
    }

    info!(
        inventory = format_args!("{:.2}", inventory),
        pnl = format_args!("{:.2}", pnl),
        "simulation done"
    );
    Ok(())
}
