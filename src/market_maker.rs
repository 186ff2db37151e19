use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde_json::json;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMsg};
use tokio_util::sync::CancellationToken;

use crate::{
    api::{OrderAck, WsFrame},
    instrument::Pair,
    orders::{Money, OrderId},
};

#[derive(Clone)]
pub struct QuoteConfig {
    pub api_base: String,
    pub symbol: Pair,
    /// Half-spread quoted on each side of the mid.
    pub spread: u64,
    /// Cancel & requote pace.
    pub pace_ms: u64,
    pub quote_size: u64,
}

/// Naive two-sided quoting bot.
///
/// Subscribes to the market's ws DOM feed and tracks the latest mid-price
/// through a `watch` channel; on a fixed pace it cancels its previous
/// quotes and rests a fresh bid and ask around the mid.
pub async fn run_market_maker(
    cfg: QuoteConfig,
    cancel_token: CancellationToken,
) -> anyhow::Result<()> {
    // 1) Subscribe to the market's feed
    let ws_base = cfg
        .api_base
        .replace("http://", "ws://")
        .replace("https://", "wss://");
    let (ws_stream, _) = connect_async(format!("{}/ws/{}", ws_base, cfg.symbol.code())).await?;
    let (_write, mut read) = ws_stream.split();

    // Track the latest mid-price via a watch channel
    let (mid_tx, mid_rx) = watch::channel(None::<Money>);

    // Parse snapshots as they arrive; trade frames don't move our quotes
    tokio::spawn(async move {
        while let Some(Ok(msg)) = read.next().await {
            if let WsMsg::Text(txt) = msg {
                if let Ok(WsFrame::BookSnapshot(dom)) = serde_json::from_str::<WsFrame>(&txt) {
                    if let Some(mid) = dom.mid_price() {
                        let _ = mid_tx.send(Some(mid));
                    }
                }
            }
        }
    });

    let client = Client::new();
    let spread = Money::from(cfg.spread);
    let mut open_quotes: Vec<OrderId> = Vec::new();
    let mut pace = tokio::time::interval(Duration::from_millis(cfg.pace_ms));

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::info!("received shutdown, exiting market maker…");
                break;
            }
            _ = pace.tick() => {
                // nothing to quote around until both sides of the book exist
                let Some(mid) = *mid_rx.borrow() else { continue };

                // cancel stale quotes first, then requote both sides
                for id in open_quotes.drain(..) {
                    let _ = client
                        .delete(format!("{}/orders/{}/{}", cfg.api_base, cfg.symbol.code(), id))
                        .send()
                        .await;
                }

                for (side, price) in [("Buy", mid - spread), ("Sell", mid + spread)] {
                    if price <= Money::ZERO {
                        continue;
                    }
                    let resp = client
                        .post(format!("{}/orders", cfg.api_base))
                        .json(&json!({
                            "side": side,
                            "order_type": "Limit",
                            "price": price,
                            "size": cfg.quote_size,
                            "symbol": cfg.symbol.code(),
                        }))
                        .send()
                        .await?;
                    if resp.status().is_success() {
                        let ack = resp.json::<OrderAck>().await?;
                        open_quotes.push(ack.order_id);
                    }
                }
            }
        }
    }
    Ok(())
}
