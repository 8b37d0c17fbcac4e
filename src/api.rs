//! The HTTP/WebSocket demonstration layer around the engine.
//!
//! This module owns every wire-level type (`NewOrder`, `OrderAck`,
//! `BookSnapshot`, `WsFrame`) and every translation between HTTP/JSON and
//! the engine's plain-value API — the engine itself has no `serde`
//! dependency on its hot path.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Path, Query, Request, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use crate::{
    engine::{OrderKind, Side, Trade},
    state::AppState,
};

type ApiErr = (StatusCode, Json<serde_json::Value>);

fn err(status: StatusCode, msg: impl Into<String>) -> ApiErr {
    (status, Json(json!({ "error": msg.into() })))
}

/// The engine takes a caller-supplied timestamp and never reads a clock
/// itself (§6 of the engine contract); this adapter is the caller, so it
/// stamps every order with nanoseconds since the epoch.
fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn log_rejected(payload: &NewOrder, reason: &str) {
    warn!(
        reason,
        side = ?payload.side,
        order_type = ?payload.order_type,
        price = ?payload.price,
        quantity = payload.quantity,
        "order rejected"
    );
}

/// A `Json`-like extractor that logs the request method/URI and a preview
/// of the body when deserialization fails, instead of a bare 422.
pub struct LoggedJson<T>(pub T);

impl<S, T> FromRequest<S> for LoggedJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = ApiErr;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| err(StatusCode::BAD_REQUEST, e.to_string()))?;

        match serde_json::from_slice::<T>(&bytes) {
            Ok(val) => Ok(LoggedJson(val)),
            Err(e) => {
                let preview = String::from_utf8_lossy(&bytes);
                let preview = &preview[..preview.len().min(4096)];
                warn!(
                    error = %e,
                    %method,
                    %uri,
                    body_preview = %preview,
                    "order rejected: JSON deserialization failed"
                );
                Err(err(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
            }
        }
    }
}

/// Request payload for `POST /orders`.
///
/// `price` is required for `Limit` orders and ignored (should be omitted)
/// for `Market` orders.
#[derive(Deserialize)]
pub struct NewOrder {
    pub side: Side,
    pub order_type: OrderKind,
    pub price: Option<f64>,
    pub quantity: f64,
}

/// Response for `POST /orders`: the assigned order id plus any trades this
/// specific submission generated (not the full trade log).
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: u64,
    pub trades: Vec<Trade>,
}

/// Aggregated (price, total remaining quantity) view of both sides,
/// best-first, as returned by `Engine::snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub bids: Vec<(f64, f64)>,
    pub asks: Vec<(f64, f64)>,
}

/// A WebSocket message, either a book snapshot or a single trade,
/// internally tagged:
/// ```json
/// {"type": "BookSnapshot", "data": { "bids": [...], "asks": [...] }}
/// {"type": "Trade", "data": { "id": 1, ... }}
/// ```
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsFrame {
    BookSnapshot(BookSnapshot),
    Trade(Trade),
}

fn default_limit() -> usize {
    100
}

#[derive(Deserialize)]
pub struct TradesQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    after: Option<u64>,
}

#[derive(Serialize)]
pub struct TradesPage {
    items: Vec<Trade>,
    next: u64,
}

/// `GET /trades?after=&limit=`
///
/// Forward-reading, cursor-paginated view of the trade log. `after` is a
/// trade id (default `0`, i.e. from the start); `next` is the cursor to
/// pass on the following call, or the same value again once there is
/// nothing left to read.
pub async fn get_trade_log(
    State(state): State<AppState>,
    Query(q): Query<TradesQuery>,
) -> Json<TradesPage> {
    let limit = q.limit.min(1000);
    let after = q.after.unwrap_or(0);
    let engine = state.engine.lock().unwrap();
    let (mut items, fetched_cursor) = engine.trades_since(after);
    items.truncate(limit);
    let next = items.last().map(|t| t.id).unwrap_or_else(|| {
        if items.is_empty() { after } else { fetched_cursor }
    });
    Json(TradesPage { items, next })
}

/// `GET /book`
/// Returns a JSON snapshot of the current order book.
pub async fn get_order_book(State(state): State<AppState>) -> impl IntoResponse {
    let mut engine = state.engine.lock().unwrap();
    let (bids, asks) = engine.snapshot();
    Json(BookSnapshot { bids, asks })
}

/// `POST /orders`
/// Submits a limit or market order.
///
/// *Success:* `200`, JSON `OrderAck`.
/// *Bad request:* `400`, JSON `{"error": "..."}`  — non-positive/non-finite
/// quantity, a limit order missing its price, or any `EngineError`.
pub async fn create_order(
    State(state): State<AppState>,
    LoggedJson(payload): LoggedJson<NewOrder>,
) -> Result<Json<OrderAck>, ApiErr> {
    if !payload.quantity.is_finite() || payload.quantity <= 0.0 {
        log_rejected(&payload, "quantity must be > 0");
        return Err(err(StatusCode::BAD_REQUEST, "quantity must be > 0"));
    }

    let (order_id, trades) = {
        let mut engine = state.engine.lock().unwrap();
        let cursor_before = engine.last_trade_id();
        let ts = now_ts();

        let submitted = match payload.order_type {
            OrderKind::Limit => {
                let Some(price) = payload.price else {
                    log_rejected(&payload, "limit orders require a price");
                    return Err(err(StatusCode::BAD_REQUEST, "limit orders require a price"));
                };
                engine.submit_limit(payload.side, price, payload.quantity, ts)
            }
            OrderKind::Market => engine.submit_market(payload.side, payload.quantity, ts),
        };

        let order_id = submitted.map_err(|e| {
            log_rejected(&payload, &e.to_string());
            err(StatusCode::BAD_REQUEST, e.to_string())
        })?;

        let (trades, _) = engine.trades_since(cursor_before);
        (order_id, trades)
    };

    info!(order_id, trade_count = trades.len(), "order accepted");
    for trade in &trades {
        let _ = state.trade_tx.send(trade.clone());
    }
    let _ = state.book_tx.send(());
    Ok(Json(OrderAck { order_id, trades }))
}

/// `DELETE /orders/{id}`
/// *Success:* `200`, JSON `{"status": "cancelled"}`.
/// *Failure:* `404`, JSON `{"error": "order not found"}`.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<u64>,
) -> impl IntoResponse {
    let cancelled = {
        let mut engine = state.engine.lock().unwrap();
        engine.cancel(order_id)
    };
    if cancelled {
        info!(order_id, "order cancelled");
        let _ = state.book_tx.send(());
        (StatusCode::OK, Json(json!({"status": "cancelled"})))
    } else {
        warn!(order_id, "cancel failed: order not found");
        (StatusCode::NOT_FOUND, Json(json!({"error": "order not found"})))
    }
}

/// `GET /ws`
/// Upgrades to a WebSocket that first sends a `BookSnapshot` frame, then
/// streams `Trade` frames as they're produced and a fresh `BookSnapshot`
/// whenever the book changes.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut trade_rx = state.trade_tx.subscribe();
    let mut book_rx = state.book_tx.subscribe();

    let initial = {
        let mut engine = state.engine.lock().unwrap();
        let (bids, asks) = engine.snapshot();
        BookSnapshot { bids, asks }
    };
    if let Err(e) = socket
        .send(Message::Text(
            serde_json::to_string(&WsFrame::BookSnapshot(initial)).unwrap().into(),
        ))
        .await
    {
        error!("failed to send initial snapshot: {:?}", e);
        return;
    }

    loop {
        tokio::select! {
            Ok(trade) = trade_rx.recv() => {
                if let Err(e) = socket.send(Message::Text(serde_json::to_string(&WsFrame::Trade(trade)).unwrap().into())).await {
                    error!("websocket send trade failed: {:?}", e);
                    break;
                }
            }
            Ok(()) = book_rx.recv() => {
                let snap = {
                    let mut engine = state.engine.lock().unwrap();
                    let (bids, asks) = engine.snapshot();
                    BookSnapshot { bids, asks }
                };
                if let Err(e) = socket.send(Message::Text(serde_json::to_string(&WsFrame::BookSnapshot(snap)).unwrap().into())).await {
                    error!("websocket send snapshot failed: {:?}", e);
                    break;
                }
            }
            else => break
        }
    }
}

/// Constructs the application's `Router` with all routes and shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{id}", delete(cancel_order))
        .route("/trades", get(get_trade_log))
        .route("/book", get(get_order_book))
        .route("/ws", get(ws_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .include_headers(false)
                        .level(tracing::Level::TRACE),
                )
                .on_response(DefaultOnResponse::new().level(tracing::Level::TRACE)),
        )
        .with_state(state)
}
