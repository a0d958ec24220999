use std::{sync::Arc, time::Duration};

use log::*;
use tokio::{
    sync::mpsc,
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::{
    db::traits::OrderManagement,
    db_types::Order,
    pipeline::{PipelineStats, ShutdownSignal, MIN_DISPATCH_INTERVAL},
};

/// Periodically scans the store for orders that have not reached a terminal status and feeds them to the workers.
///
/// The dispatcher never modifies an order. The same order is queued again on every cycle until a worker's update moves
/// it out of the pending set.
pub struct Dispatcher<B> {
    store: B,
    intake: mpsc::Sender<Order>,
    interval: Duration,
    stats: Arc<PipelineStats>,
    shutdown: ShutdownSignal,
}

enum CycleOutcome {
    Continue,
    Stop,
}

impl<B: OrderManagement> Dispatcher<B> {
    pub fn new(
        store: B,
        intake: mpsc::Sender<Order>,
        interval: Duration,
        stats: Arc<PipelineStats>,
        shutdown: ShutdownSignal,
    ) -> Self {
        let interval = if interval < MIN_DISPATCH_INTERVAL {
            warn!("🔄️ A dispatch interval of {interval:?} is not valid. Using {MIN_DISPATCH_INTERVAL:?}");
            MIN_DISPATCH_INTERVAL
        } else {
            interval
        };
        Self { store, intake, interval, stats, shutdown }
    }

    pub async fn run(self) {
        info!("🔄️ Dispatch loop started. Scanning for pending orders every {:?}", self.interval);
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let CycleOutcome::Stop = self.dispatch_cycle().await {
                        break;
                    }
                }
            }
        }
        info!("🔄️ Dispatch loop stopped");
    }

    async fn dispatch_cycle(&self) -> CycleOutcome {
        self.stats.record_dispatch_cycle();
        let orders = match self.store.fetch_pending_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                warn!("🔄️ Could not fetch pending orders. Skipping this cycle. {e}");
                self.stats.record_dispatch_failure();
                return CycleOutcome::Continue;
            },
        };
        trace!("🔄️ {} pending orders to dispatch", orders.len());
        for order in orders {
            // Blocks while the workers are busy
            tokio::select! {
                _ = self.shutdown.cancelled() => return CycleOutcome::Stop,
                sent = self.intake.send(order) => {
                    if sent.is_err() {
                        warn!("🔄️ No workers are left to take orders.");
                        return CycleOutcome::Stop;
                    }
                    self.stats.record_dispatched();
                }
            }
        }
        CycleOutcome::Continue
    }
}
