use crate::domain::trading::types::Order;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time;
use tracing::{info, warn};

pub struct OrderThrottler {
    order_rx: Receiver<Order>,
    throttled_order_tx: Sender<Order>,
    max_orders_per_minute: u32,
    window_duration: Duration, // Configurable for testing
    recent_orders: VecDeque<Instant>,
    queued_orders: VecDeque<Order>,
}

impl OrderThrottler {
    pub fn new(
        order_rx: Receiver<Order>,
        throttled_order_tx: Sender<Order>,
        max_orders_per_minute: u32,
    ) -> Self {
        Self::with_window(
            order_rx,
            throttled_order_tx,
            max_orders_per_minute,
            Duration::from_secs(60),
        )
    }

    pub fn with_window(
        order_rx: Receiver<Order>,
        throttled_order_tx: Sender<Order>,
        max_orders_per_minute: u32,
        window_duration: Duration,
    ) -> Self {
        Self {
            order_rx,
            throttled_order_tx,
            max_orders_per_minute,
            window_duration,
            recent_orders: VecDeque::new(),
            queued_orders: VecDeque::new(),
        }
    }

    pub async fn run(&mut self) {
        info!(
            "OrderThrottler started (limit: {} orders/min)",
            self.max_orders_per_minute
        );

        let mut tick_interval = time::interval(Duration::from_millis(100));
        tick_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased; // Process in order: tick first, then new orders

                // Periodic tick to process queued orders
                _ = tick_interval.tick() => {
                    self.process_queue().await;
                }

                // Receive new orders from RiskManager
                Some(order) = self.order_rx.recv() => {
                    self.handle_incoming_order(order).await;
                    // Try to process queue immediately if we have capacity
                    self.process_queue().await;
                }
            }
        }
    }

    async fn handle_incoming_order(&mut self, order: Order) {
        self.cleanup_old_timestamps();

        if self.can_accept_order() {
            // Accept immediately
            self.forward_order(order).await;
        } else {
            // Throttle: add to queue (FIFO)
            warn!(
                "OrderThrottler: Rate limit reached. Queueing order {}. Queue size: {}",
                order.id,
                self.queued_orders.len() + 1
            );
            self.queued_orders.push_back(order); // FIFO: push_back
        }
    }

    async fn process_queue(&mut self) {
        self.cleanup_old_timestamps();

        while !self.queued_orders.is_empty() && self.can_accept_order() {
            if let Some(order) = self.queued_orders.pop_front() {
                // FIFO: pop_front
                info!(
                    "OrderThrottler: Processing queued order {}. Remaining: {}",
                    order.id,
                    self.queued_orders.len()
                );
                self.forward_order(order).await;
            }
        }
    }

    async fn forward_order(&mut self, order: Order) {
        self.recent_orders.push_back(Instant::now());

        if let Err(e) = self.throttled_order_tx.send(order.clone()).await {
            tracing::error!(
                "OrderThrottler: Failed to forward order {}: {}",
                order.id,
                e
            );
        } else {
            info!("OrderThrottler: Forwarded order {}", order.id);
        }
    }

    fn can_accept_order(&self) -> bool {
        (self.recent_orders.len() as u32) < self.max_orders_per_minute
    }

    fn cleanup_old_timestamps(&mut self) {
        let window_ago = Instant::now() - self.window_duration;

        while let Some(&timestamp) = self.recent_orders.front() {
            if timestamp < window_ago {
                self.recent_orders.pop_front();
            } else {
                break;
            }
        }
    }
}
