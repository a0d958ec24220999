use std::sync::Arc;

use log::*;
use tokio::sync::mpsc;

use crate::{
    db::traits::OrderManagement,
    db_types::Order,
    events::{EventProducers, OrderUpdatedEvent},
    pipeline::{PipelineStats, ShutdownSignal},
};

/// The single writer for pipeline updates. Updates are written in the order they arrive, so for any one order the
/// last update received wins.
pub struct PersistenceSink<B> {
    store: B,
    updates: mpsc::Receiver<Order>,
    producers: EventProducers,
    stats: Arc<PipelineStats>,
    shutdown: ShutdownSignal,
}

impl<B: OrderManagement> PersistenceSink<B> {
    pub fn new(
        store: B,
        updates: mpsc::Receiver<Order>,
        producers: EventProducers,
        stats: Arc<PipelineStats>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self { store, updates, producers, stats, shutdown }
    }

    pub async fn run(mut self) {
        debug!("🔄️ Persistence sink started");
        loop {
            let order = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                order = self.updates.recv() => match order {
                    Some(order) => order,
                    None => break,
                },
            };
            self.write(order).await;
        }
        debug!("🔄️ Persistence sink stopped");
    }

    async fn write(&self, order: Order) {
        match self.store.save_order(&order).await {
            Ok(()) => {
                debug!("🔄️ Order {} saved with status {} and accrual {}", order.number, order.status, order.accrual);
                self.stats.record_write();
                self.producers.publish_order_updated(OrderUpdatedEvent::new(order)).await;
            },
            Err(e) => {
                error!("🔄️ Could not save update for order {}. The update is dropped. {e}", order.number);
                self.stats.record_write_failure();
            },
        }
    }
}
