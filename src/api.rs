use axum::{
    Json, Router, debug_handler,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dom::Dom,
    errors::OrderBookError,
    instrument::Pair,
    orders::{Money, Order, OrderId, OrderType, Side},
    state::AppState,
    trade::Trade,
};

const MAX_TRADES_PAGE: usize = 1000;
const DEFAULT_TRADES_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct NewOrder {
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Money>,
    pub size: Money,
    pub symbol: Pair,
}

/// Acknowledgment for an accepted order: the id to cancel it by later and
/// any trades it executed immediately (always empty for limit orders).
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: OrderId,
    pub trades: Vec<Trade>,
}

/// Frames pushed to `/ws/{symbol}` subscribers: a fresh DOM snapshot after
/// every book mutation, plus one frame per executed trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WsFrame {
    BookSnapshot(Dom),
    Trade(Trade),
}

/// JSON error body with an HTTP status. Book errors are recoverable and
/// map onto client-visible statuses, never a dropped connection.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<OrderBookError> for ApiError {
    fn from(err: OrderBookError) -> Self {
        let status = match err {
            OrderBookError::OrderNotResting(_) => StatusCode::NOT_FOUND,
            OrderBookError::InsufficientLiquidity { .. } | OrderBookError::UnknownMarket(_) => {
                StatusCode::BAD_REQUEST
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[debug_handler]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<NewOrder>,
) -> Result<Json<OrderAck>, ApiError> {
    if payload.size <= Money::ZERO {
        return Err(ApiError::bad_request("size must be > 0"));
    }

    let market = state.market(&payload.symbol)?;
    let mut order = Order::new(
        Uuid::new_v4().as_u128() as OrderId,
        payload.side,
        payload.size,
    );
    let order_id = order.id;

    let mut trades = Vec::new();
    {
        let mut book = market.book.lock().unwrap();
        match payload.order_type {
            OrderType::Limit => {
                let Some(price) = payload.price else {
                    return Err(ApiError::bad_request("limit order requires a price"));
                };
                if price <= Money::ZERO {
                    return Err(ApiError::bad_request("price must be > 0"));
                }
                book.place_limit_order(price, order);
            }
            OrderType::Market => {
                let matches = book.place_market_order(&mut order)?;
                trades = matches
                    .iter()
                    .map(|m| Trade::from_match(&payload.symbol, m))
                    .collect();
            }
        }
        let snapshot = book.snapshot_dom();
        drop(book);

        let _ = market.feed.send(WsFrame::BookSnapshot(snapshot));
        for trade in &trades {
            let _ = market.feed.send(WsFrame::Trade(trade.clone()));
        }
    }

    state.trade_log.lock().unwrap().extend(trades.iter().cloned());
    Ok(Json(OrderAck { order_id, trades }))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path((symbol, order_id)): Path<(Pair, OrderId)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let market = state.market(&symbol)?;

    let mut book = market.book.lock().unwrap();
    book.cancel_order(order_id)?;
    let snapshot = book.snapshot_dom();
    drop(book);

    let _ = market.feed.send(WsFrame::BookSnapshot(snapshot));
    Ok(Json(json!({ "msg": "order canceled" })))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(symbol): Path<Pair>,
) -> Result<Json<Dom>, ApiError> {
    let market = state.market(&symbol)?;
    let dom = market.book.lock().unwrap().snapshot_dom();
    Ok(Json(dom))
}

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub limit: Option<usize>,
}

/// Most recent trades for a market, newest first.
pub async fn get_trades(
    State(state): State<AppState>,
    Path(symbol): Path<Pair>,
    Query(query): Query<TradesQuery>,
) -> Result<Json<Vec<Trade>>, ApiError> {
    state.market(&symbol)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRADES_PAGE)
        .min(MAX_TRADES_PAGE);

    let code = symbol.code();
    let log = state.trade_log.lock().unwrap();
    let trades = log
        .iter()
        .rev()
        .filter(|t| t.symbol == code)
        .take(limit)
        .cloned()
        .collect();
    Ok(Json(trades))
}

/// Live DOM/trade feed. Sends one snapshot on connect so subscribers can
/// render a book immediately, then forwards every frame the market emits.
pub async fn ws_feed(
    ws: WebSocketUpgrade,
    Path(symbol): Path<Pair>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let market = state.market(&symbol)?;
    let rx = market.feed.subscribe();
    let snapshot = market.book.lock().unwrap().snapshot_dom();
    Ok(ws.on_upgrade(move |socket| handle_ws(socket, snapshot, rx)))
}

async fn handle_ws(mut socket: WebSocket, snapshot: Dom, mut rx: broadcast::Receiver<WsFrame>) {
    if send_frame(&mut socket, &WsFrame::BookSnapshot(snapshot))
        .await
        .is_err()
    {
        return;
    }

    loop {
        match rx.recv().await {
            Ok(frame) => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // slow consumer; the next snapshot will resync it
                warn!(skipped, "ws subscriber lagged, frames dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &WsFrame) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(text) => socket.send(Message::Text(text.into())).await,
        Err(e) => {
            warn!(error = %e, "failed to encode ws frame");
            Ok(())
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{symbol}/{order_id}", delete(cancel_order))
        .route("/book/{symbol}", get(get_book))
        .route("/trades/{symbol}", get(get_trades))
        .route("/ws/{symbol}", get(ws_feed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
