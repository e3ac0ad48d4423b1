use crate::domain::trading::types::{Order, OrderSide};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use std::collections::VecDeque;

/// Calculates performance metrics (Sharpe Ratio, Win Rate) from a list of raw orders
/// by reconstructing trades using FIFO matching.
pub fn calculate_metrics_from_orders(orders: &[Order]) -> (f64, f64) {
    if orders.is_empty() {
        return (0.0, 0.0);
    }

    // FIFO PnL reconstruction logic
    let mut buys: VecDeque<Order> = VecDeque::new();
    let mut trade_returns = Vec::new();
    let mut wins = 0;
    let mut total_closed_trades = 0;

    for order in orders {
        match order.side {
            OrderSide::Buy => buys.push_back(order.clone()),
            OrderSide::Sell => {
                let mut qty_to_close = order.quantity;
                let exit_price = order.price.to_f64().unwrap_or(0.0);

                while qty_to_close > Decimal::ZERO && !buys.is_empty() {
                    let mut buy = buys
                        .pop_front()
                        .expect("buys.is_empty() checked in while condition");

                    let match_qty = buy.quantity.min(qty_to_close);
                    let entry_price = buy.price.to_f64().unwrap_or(0.0);

                    if entry_price > 0.0 {
                        // Return for this chunk
                        let pnl_pct = (exit_price - entry_price) / entry_price;
                        trade_returns.push(pnl_pct);

                        if pnl_pct > 0.0 {
                            wins += 1;
                        }
                        total_closed_trades += 1;
                    }

                    qty_to_close -= match_qty;
                    buy.quantity -= match_qty;

                    if buy.quantity > Decimal::ZERO {
                        buys.push_front(buy);
                    }
                }
            }
        }
    }

    let win_rate = if total_closed_trades > 0 {
        wins as f64 / total_closed_trades as f64
    } else {
        0.0
    };

    let sharpe = if trade_returns.len() > 1 {
        let mean: f64 = trade_returns.iter().sum::<f64>() / trade_returns.len() as f64;
        let variance: f64 = trade_returns
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / (trade_returns.len() - 1) as f64;
        let std_dev = variance.sqrt();

        if std_dev > 0.00001 {
            mean / std_dev
        } else {
            0.0
        }
    } else {
        0.0
    };

    (sharpe, win_rate)
}
