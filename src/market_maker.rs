//! A two-sided market-making bot.
//!
//! Connects to the engine's `/ws` feed, tracks the book's mid-price, and
//! every `PACE_MS` — only when the mid has actually moved — cancels its
//! previous quotes and posts a fresh bid below and ask above the midpoint.
//! All HTTP and WebSocket errors are wrapped in [`MarketMakerError`].

use futures_util::StreamExt;
use serde::Serialize;
use tokio::{sync::watch, time};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMsg};
use tokio_util::sync::CancellationToken;

use crate::{
    api::{OrderAck, WsFrame},
    engine::{OrderKind, Side},
    errors::MarketMakerError,
};

/// How far from the midpoint to quote.
const SPREAD: f64 = 2.0;
/// How many milliseconds between quote refreshes.
const PACE_MS: u64 = 500;
/// Size of each quote.
const QUOTE_QTY: f64 = 1.0;

#[derive(Serialize)]
struct NewOrder {
    side: Side,
    order_type: OrderKind,
    price: Option<f64>,
    quantity: f64,
}

/// Starts the market-making loop against a REST+WS API at `api_base`
/// (e.g. `http://127.0.0.1:3000`), until `token` is cancelled.
pub async fn run_market_maker(
    api_base: &str,
    token: CancellationToken,
) -> Result<(), MarketMakerError> {
    let ws_url = format!("ws://{host}/ws", host = api_base.trim_start_matches("http://"));
    tracing::warn!("market maker: connecting to {:?}", ws_url);

    let ws_stream = loop {
        match connect_async(&ws_url).await {
            Ok((stream, _)) => {
                tracing::info!("market maker: ws connected successfully");
                break stream;
            }
            Err(e) => {
                tracing::warn!("market maker: ws connect failed: {}; retrying...", e);
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    };
    let (_write, read) = ws_stream.split();

    let (mid_tx, mid_rx) = watch::channel(None::<f64>);

    let frames = read.filter_map(|msg| async move {
        match msg {
            Ok(WsMsg::Text(txt)) => match serde_json::from_str::<WsFrame>(&txt) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    tracing::warn!("invalid WS frame: {e}");
                    None
                }
            },
            _ => None,
        }
    });
    tokio::spawn(async move {
        tokio::pin!(frames);
        while let Some(frame) = frames.next().await {
            if let WsFrame::BookSnapshot(snap) = frame {
                if let (Some(&(best_bid, _)), Some(&(best_ask, _))) =
                    (snap.bids.first(), snap.asks.first())
                {
                    let _ = mid_tx.send(Some((best_bid + best_ask) / 2.0));
                }
            }
        }
    });

    let client = reqwest::Client::new();
    let mut outstanding: Vec<u64> = Vec::new();
    let mut interval = time::interval(time::Duration::from_millis(PACE_MS));
    let mut last_mid: Option<f64> = None;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("market maker: shutdown requested, tearing down...");
                break;
            }
            _ = interval.tick() => {
                let Some(mid) = *mid_rx.borrow() else { continue };
                if last_mid == Some(mid) {
                    continue;
                }

                for id in outstanding.drain(..) {
                    let _ = client.delete(format!("{}/orders/{}", api_base, id)).send().await;
                }

                let bid_price = (mid - SPREAD).max(0.01);
                tracing::info!(bid_price, "placing bid");
                if let Ok(resp) = client
                    .post(format!("{}/orders", api_base))
                    .json(&NewOrder {
                        side: Side::Buy,
                        order_type: OrderKind::Limit,
                        price: Some(bid_price),
                        quantity: QUOTE_QTY,
                    })
                    .send()
                    .await
                {
                    if let Ok(ack) = resp.json::<OrderAck>().await {
                        outstanding.push(ack.order_id);
                    }
                }

                let ask_price = mid + SPREAD;
                tracing::info!(ask_price, "placing ask");
                if let Ok(resp) = client
                    .post(format!("{}/orders", api_base))
                    .json(&NewOrder {
                        side: Side::Sell,
                        order_type: OrderKind::Limit,
                        price: Some(ask_price),
                        quantity: QUOTE_QTY,
                    })
                    .send()
                    .await
                {
                    if let Ok(ack) = resp.json::<OrderAck>().await {
                        outstanding.push(ack.order_id);
                    }
                }

                last_mid = Some(mid);
            }
        }
    }
    Ok(())
}
