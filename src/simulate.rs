//! Stochastic order-flow harness for exercising the engine under realistic,
//! noisy market conditions.
//!
//! Continuously posts randomized orders against a running service:
//! - inter-arrival delays drawn from `Exp(λ = rate_hz)`, modelling a Poisson
//!   stream of incoming orders;
//! - order sizes drawn as `Exp1 * mean_size` (heavy-tailed around the mean);
//! - a Gaussian drift `N(0, noise_sigma)` applied to the simulator's local
//!   mid-price on each order;
//! - mostly limit orders quoted at `mid ± spread`, with an occasional market
//!   order to take liquidity.
//!
//! Fills reported in each ack update the simulator's inventory and P&L
//! counters. Rejections (an oversized market order, for instance) are logged
//! and the flow keeps going — the venue reports them, it does not fall over.
//!
//! Supply a `CancellationToken` (e.g. tied to ctrl-c) for clean shutdown.

use std::time::{Duration, Instant};

use rand::Rng;
use rand_distr::{Distribution, Exp, Exp1, Normal};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{api::OrderAck, instrument::Pair};

#[derive(Clone)]
pub struct SimConfig {
    pub api_base: String,
    pub symbol: Pair,
    pub run_secs: Option<u64>,
    pub rate_hz: f64,
    pub noise_sigma: f64,
    pub mean_size: f64,
}

pub async fn run_simulation(cfg: SimConfig, cancel_token: CancellationToken) -> anyhow::Result<()> {
    let client = Client::new();
    let symbol = cfg.symbol.code();

    //1) Exponential inter-arrival times with rate = rate_hz
    let ia_dist = Exp::new(cfg.rate_hz)?;

    //2) Gaussian drift on the mid-price
    let drift = Normal::new(0.0, cfg.noise_sigma)?;

    //3) unit exponential for sizing
    let size_dist = Exp1;

    let mut iv = 0i64;
    let mut pnl = 0.0f64;
    let mut mid_price = 50.0f64;
    let start = Instant::now();

    loop {
        //check overall time-limit
        if let Some(max_secs) = cfg.run_secs {
            if start.elapsed().as_secs() >= max_secs {
                break;
            }
        }
        //draw the next wait
        let wait_secs = ia_dist.sample(&mut rand::rng());
        let sleep_fut = sleep(Duration::from_secs_f64(wait_secs));
        tokio::select! {
            //user hits ctrl-c
            _ = cancel_token.cancelled() => {
                tracing::info!("received shutdown, exiting noisy sim…");
                break;
            }
            _ = sleep_fut => {
                let raw: f64 = <Exp1 as Distribution<f64>>::sample(&size_dist, &mut rand::rng());
                let size = (raw * cfg.mean_size).ceil().max(1.0) as u64;
                //drift the mid price, keeping it positive
                mid_price = (mid_price + drift.sample(&mut rand::rng())).max(2.0);

                let (side, body) = if rand::rng().random_bool(0.2) {
                    // take liquidity
                    let side = if rand::rng().random_bool(0.5) { "Buy" } else { "Sell" };
                    (side, json!({
                        "side": side,
                        "order_type": "Market",
                        "size": size,
                        "symbol": symbol,
                    }))
                } else {
                    // quote around the drifted mid ± spread
                    let spread = 1.0;
                    let (price, side) = if rand::rng().random_bool(0.5) {
                        (mid_price - spread, "Buy")
                    } else {
                        (mid_price + spread, "Sell")
                    };
                    (side, json!({
                        "side": side,
                        "order_type": "Limit",
                        "price": price.round().max(1.0) as u64,
                        "size": size,
                        "symbol": symbol,
                    }))
                };

                let resp = client
                    .post(format!("{}/orders", cfg.api_base))
                    .json(&body)
                    .send()
                    .await?;
                if resp.status().is_success() {
                    let ack = resp.json::<OrderAck>().await?;
                    //update metrics from the fills we got
                    for trade in &ack.trades {
                        let price = trade.price.to_f64().unwrap_or_default();
                        let qty = trade.size.to_f64().unwrap_or_default();
                        if side == "Buy" {
                            iv += qty as i64;
                            pnl -= price * qty;
                        } else {
                            iv -= qty as i64;
                            pnl += price * qty;
                        }
                    }
                } else {
                    //rejections are part of the game, keep the flow going
                    let err = resp.json::<serde_json::Value>().await.unwrap_or_default();
                    tracing::warn!(%err, "order rejected");
                }

                println!(
                    "[{:.1}s] side={} size={} mid={:.2} inv={} pnl={:.2}",
                    start.elapsed().as_secs_f64(),
                    side, size, mid_price, iv, pnl
                );
            }
        }
    }
    println!("--- done --- final inv={} final pnl={:.2}", iv, pnl);
    Ok(())
}
