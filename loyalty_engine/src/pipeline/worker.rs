use std::{sync::Arc, time::Duration};

use log::*;
use tokio::sync::{mpsc, Mutex};

use crate::{
    accrual::{classify, AccrualOracle, Classification},
    db_types::Order,
    pipeline::{PipelineStats, RateLimitPolicy, ShutdownSignal},
};

pub type SharedIntake = Arc<Mutex<mpsc::Receiver<Order>>>;

/// Takes orders off the shared intake queue one at a time, asks the oracle about each, and forwards any resulting
/// update to the persistence sink.
pub struct Worker<O> {
    id: usize,
    oracle: O,
    intake: SharedIntake,
    sink: mpsc::Sender<Order>,
    policy: RateLimitPolicy,
    stats: Arc<PipelineStats>,
    shutdown: ShutdownSignal,
}

enum Flow {
    Continue,
    Stop,
}

impl<O: AccrualOracle> Worker<O> {
    pub fn new(
        id: usize,
        oracle: O,
        intake: SharedIntake,
        sink: mpsc::Sender<Order>,
        policy: RateLimitPolicy,
        stats: Arc<PipelineStats>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self { id, oracle, intake, sink, policy, stats, shutdown }
    }

    pub async fn run(self) {
        debug!("🔄️ Worker #{} started", self.id);
        // The pause applied after the last consecutive rate-limit signal
        let mut backoff: Option<Duration> = None;
        loop {
            let order = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                order = next_order(&self.intake) => match order {
                    Some(order) => order,
                    None => break,
                },
            };
            if let Flow::Stop = self.process(order, &mut backoff).await {
                break;
            }
        }
        debug!("🔄️ Worker #{} stopped", self.id);
    }

    async fn process(&self, order: Order, backoff: &mut Option<Duration>) -> Flow {
        self.stats.record_lookup();
        let response = tokio::select! {
            _ = self.shutdown.cancelled() => return Flow::Stop,
            response = self.oracle.lookup(&order.number) => response,
        };
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("🔄️ Worker #{}: lookup for order {} failed. Will try again next cycle. {e}", self.id, order.number);
                self.stats.record_transport_error();
                return Flow::Continue;
            },
        };
        match classify(&order, response) {
            Classification::Update(updated) => {
                *backoff = None;
                trace!("🔄️ Worker #{}: order {} is now {}", self.id, updated.number, updated.status);
                tokio::select! {
                    _ = self.shutdown.cancelled() => Flow::Stop,
                    sent = self.sink.send(updated) => match sent {
                        Ok(()) => Flow::Continue,
                        Err(_) => {
                            warn!("🔄️ Worker #{}: persistence sink has gone away", self.id);
                            Flow::Stop
                        },
                    },
                }
            },
            Classification::Skip(reason) => {
                *backoff = None;
                if reason.is_protocol_error() {
                    warn!("🔄️ Worker #{}: ignoring response for order {}. {reason}", self.id, order.number);
                    self.stats.record_protocol_error();
                } else {
                    trace!("🔄️ Worker #{}: order {}: {reason}", self.id, order.number);
                }
                self.stats.record_skip();
                Flow::Continue
            },
            Classification::RateLimited { status, retry_after } => {
                self.stats.record_rate_limited();
                self.on_rate_limited(status, retry_after, backoff).await
            },
        }
    }

    async fn on_rate_limited(
        &self,
        status: reqwest::StatusCode,
        retry_after: Option<Duration>,
        backoff: &mut Option<Duration>,
    ) -> Flow {
        match self.policy {
            RateLimitPolicy::Halt => {
                warn!("🔄️ Worker #{}: accrual service replied {status}. This worker is halting.", self.id);
                self.stats.record_worker_halted();
                Flow::Stop
            },
            RateLimitPolicy::Backoff { initial, max } => {
                let next = backoff.map(|d| (d * 2).min(max)).unwrap_or(initial);
                *backoff = Some(next);
                let pause = retry_after.unwrap_or(next);
                info!("🔄️ Worker #{}: accrual service replied {status}. Pausing for {pause:?}", self.id);
                tokio::select! {
                    _ = self.shutdown.cancelled() => Flow::Stop,
                    _ = tokio::time::sleep(pause) => Flow::Continue,
                }
            },
        }
    }
}

async fn next_order(intake: &SharedIntake) -> Option<Order> {
    intake.lock().await.recv().await
}
