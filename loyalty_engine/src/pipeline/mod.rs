//! The accrual reconciliation pipeline.
//!
//! ```text
//!  Dispatcher ──intake──▶ Worker × N ──updates──▶ PersistenceSink ──▶ store
//!      ▲                     │                                           │
//!      └──── pending orders ─┼───────────────────────────────────────────┘
//!                            ▼
//!                    AccrualOracle
//! ```
//!
//! Every component runs on its own tokio task and watches the same [`ShutdownSignal`]. Nothing is drained on
//! shutdown: whatever is still queued is dropped, and picked up again by the next dispatch cycle after a restart.
mod config;
mod dispatcher;
mod shutdown;
mod sink;
mod stats;
mod worker;

use std::sync::Arc;

pub use config::{PipelineConfig, RateLimitPolicy, UnknownPolicy, MIN_DISPATCH_INTERVAL};
pub use dispatcher::Dispatcher;
use log::*;
pub use shutdown::ShutdownSignal;
pub use sink::PersistenceSink;
pub use stats::{PipelineStats, StatsSnapshot};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
pub use worker::{SharedIntake, Worker};

use crate::{accrual::AccrualOracle, db::traits::OrderManagement, events::EventProducers};

/// A running pipeline.
pub struct AccrualPipeline {
    handles: Vec<JoinHandle<()>>,
    stats: Arc<PipelineStats>,
    shutdown: ShutdownSignal,
}

impl AccrualPipeline {
    /// Spawns the dispatch loop, the worker pool and the persistence sink. Must be called from within a tokio runtime.
    pub fn start<B, O>(
        store: B,
        oracle: O,
        config: PipelineConfig,
        producers: EventProducers,
        stats: Arc<PipelineStats>,
        shutdown: ShutdownSignal,
    ) -> Self
    where
        B: OrderManagement,
        O: AccrualOracle,
    {
        let worker_count = config.worker_count.max(1);
        if worker_count != config.worker_count {
            warn!("🔄️ A worker count of {} is not valid. Using {worker_count}", config.worker_count);
        }
        let (intake_tx, intake_rx) = mpsc::channel(config.intake_capacity.max(1));
        let (sink_tx, sink_rx) = mpsc::channel(config.sink_capacity.max(1));
        let intake: SharedIntake = Arc::new(Mutex::new(intake_rx));

        let mut handles = Vec::with_capacity(worker_count + 2);
        let sink = PersistenceSink::new(store.clone(), sink_rx, producers, Arc::clone(&stats), shutdown.clone());
        handles.push(tokio::spawn(sink.run()));
        for id in 1..=worker_count {
            let worker = Worker::new(
                id,
                oracle.clone(),
                Arc::clone(&intake),
                sink_tx.clone(),
                config.rate_limit_policy,
                Arc::clone(&stats),
                shutdown.clone(),
            );
            handles.push(tokio::spawn(worker.run()));
        }
        let dispatcher =
            Dispatcher::new(store, intake_tx, config.dispatch_interval, Arc::clone(&stats), shutdown.clone());
        handles.push(tokio::spawn(dispatcher.run()));
        info!(
            "🔄️ Accrual pipeline started with {worker_count} workers. Rate limit policy: {}",
            config.rate_limit_policy
        );
        Self { handles, stats, shutdown }
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Signals every component to stop. Use [`join`](Self::join) to wait for them.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("🔄️ A pipeline task ended abnormally. {e}");
            }
        }
        info!("🔄️ Accrual pipeline has shut down");
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::{HashMap, VecDeque},
        future::Future,
        pin::Pin,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex as StdMutex,
        },
        time::Duration,
    };

    use loyalty_common::Points;
    use reqwest::StatusCode;

    use super::*;
    use crate::{
        accrual::{AccrualClientError, AccrualStatus, AccrualVerdict, OracleResponse},
        db::memory::InMemoryStore,
        db_types::{Order, OrderNumber, OrderStatusType},
        events::{EventHandlers, EventHooks},
    };

    /// Replies from a per-order script. The last scripted reply for an order is repeated forever.
    #[derive(Clone, Default)]
    struct ScriptedOracle {
        scripts: Arc<StdMutex<HashMap<OrderNumber, VecDeque<OracleResponse>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedOracle {
        fn script(self, number: &str, replies: Vec<OracleResponse>) -> Self {
            self.scripts.lock().unwrap().insert(number.into(), replies.into());
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AccrualOracle for ScriptedOracle {
        async fn lookup(&self, number: &OrderNumber) -> Result<OracleResponse, AccrualClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut scripts = self.scripts.lock().unwrap();
            let replies = scripts.get_mut(number).ok_or_else(|| AccrualClientError::Transport("unknown".into()))?;
            let reply = if replies.len() > 1 { replies.pop_front() } else { replies.front().cloned() };
            reply.ok_or_else(|| AccrualClientError::Transport("empty script".into()))
        }
    }

    fn processed(number: &str, accrual: i64) -> OracleResponse {
        let accrual = Some(Points::from_points(accrual));
        OracleResponse::ok(AccrualVerdict::new(number.into(), AccrualStatus::Processed, accrual))
    }

    fn verdict(number: &str, status: AccrualStatus) -> OracleResponse {
        OracleResponse::ok(AccrualVerdict::new(number.into(), status, None))
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig::default().with_worker_count(2).with_dispatch_interval(Duration::from_millis(10))
    }

    fn start(store: &InMemoryStore, oracle: &ScriptedOracle, config: PipelineConfig) -> AccrualPipeline {
        let _ = env_logger::try_init();
        AccrualPipeline::start(
            store.clone(),
            oracle.clone(),
            config,
            EventProducers::default(),
            Arc::new(PipelineStats::default()),
            ShutdownSignal::new(),
        )
    }

    async fn wait_for_status(store: &InMemoryStore, number: &str, status: OrderStatusType) -> Order {
        let number = OrderNumber::from(number);
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(order) = store.fetch_order(&number).await.unwrap() {
                    if order.status == status {
                        return order;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Timed out waiting for order status")
    }

    async fn stop(pipeline: AccrualPipeline) {
        pipeline.stop();
        tokio::time::timeout(Duration::from_secs(2), pipeline.join()).await.expect("Pipeline did not shut down");
    }

    #[tokio::test]
    async fn no_content_marks_order_invalid() {
        let store = InMemoryStore::new();
        store.save_order(&Order::new("1111111".into(), 1)).await.unwrap();
        let oracle = ScriptedOracle::default().script("1111111", vec![OracleResponse::new(StatusCode::NO_CONTENT)]);
        let pipeline = start(&store, &oracle, fast_config());
        let order = wait_for_status(&store, "1111111", OrderStatusType::Invalid).await;
        assert_eq!(order.accrual, Points::default());
        stop(pipeline).await;
    }

    #[tokio::test]
    async fn processing_then_processed() {
        let store = InMemoryStore::new();
        store.save_order(&Order::new("1111111".into(), 1)).await.unwrap();
        let oracle = ScriptedOracle::default().script("1111111", vec![
            verdict("1111111", AccrualStatus::Registered),
            verdict("1111111", AccrualStatus::Processing),
            processed("1111111", 500),
        ]);
        let pipeline = start(&store, &oracle, fast_config());
        let order = wait_for_status(&store, "1111111", OrderStatusType::Processed).await;
        assert_eq!(order.accrual, Points::from_points(500));
        assert_eq!(order.user_id, 1);
        // Let copies that were queued before the write drain, after which the order is no longer dispatched
        tokio::time::sleep(Duration::from_millis(50)).await;
        let calls = oracle.calls();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(oracle.calls(), calls);
        stop(pipeline).await;
    }

    #[tokio::test]
    async fn registered_never_writes() {
        let store = InMemoryStore::new();
        let original = Order::new("1111111".into(), 1);
        store.save_order(&original).await.unwrap();
        let oracle = ScriptedOracle::default().script("1111111", vec![verdict("1111111", AccrualStatus::Registered)]);
        let pipeline = start(&store, &oracle, fast_config());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(oracle.calls() >= 2, "Pending order should be dispatched repeatedly");
        assert_eq!(pipeline.stats().snapshot().updates_written, 0);
        assert_eq!(store.fetch_order(&original.number).await.unwrap(), Some(original));
        stop(pipeline).await;
    }

    #[tokio::test]
    async fn mismatched_verdict_leaves_order_alone() {
        let store = InMemoryStore::new();
        let original = Order::new("1111111".into(), 1).with_status(OrderStatusType::Processing);
        store.save_order(&original).await.unwrap();
        let oracle = ScriptedOracle::default().script("1111111", vec![processed("2222222", 500)]);
        let pipeline = start(&store, &oracle, fast_config());
        tokio::time::sleep(Duration::from_millis(80)).await;
        let stats = pipeline.stats().snapshot();
        assert!(stats.protocol_errors >= 1);
        assert_eq!(stats.updates_written, 0);
        assert_eq!(store.fetch_order(&original.number).await.unwrap(), Some(original));
        stop(pipeline).await;
    }

    #[tokio::test]
    async fn halt_policy_stops_all_workers() {
        let store = InMemoryStore::new();
        store.save_order(&Order::new("1111111".into(), 1)).await.unwrap();
        let oracle =
            ScriptedOracle::default().script("1111111", vec![OracleResponse::new(StatusCode::TOO_MANY_REQUESTS)]);
        let pipeline = start(&store, &oracle, fast_config());
        tokio::time::sleep(Duration::from_millis(150)).await;
        // Each worker halts on its first rate-limit signal, so there are exactly as many lookups as workers
        assert_eq!(oracle.calls(), 2);
        assert_eq!(pipeline.stats().snapshot().workers_halted, 2);
        let order = store.fetch_order(&"1111111".into()).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatusType::New);
        stop(pipeline).await;
    }

    #[tokio::test]
    async fn backoff_policy_resumes() {
        let store = InMemoryStore::new();
        store.save_order(&Order::new("1111111".into(), 1)).await.unwrap();
        let oracle = ScriptedOracle::default().script("1111111", vec![
            OracleResponse::new(StatusCode::SERVICE_UNAVAILABLE),
            OracleResponse::new(StatusCode::TOO_MANY_REQUESTS).with_retry_after(Duration::from_millis(20)),
            processed("1111111", 300),
        ]);
        let policy = RateLimitPolicy::Backoff { initial: Duration::from_millis(10), max: Duration::from_millis(50) };
        let pipeline = start(&store, &oracle, fast_config().with_worker_count(1).with_rate_limit_policy(policy));
        let order = wait_for_status(&store, "1111111", OrderStatusType::Processed).await;
        assert_eq!(order.accrual, Points::from_points(300));
        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.rate_limited, 2);
        assert_eq!(stats.workers_halted, 0);
        stop(pipeline).await;
    }

    #[tokio::test]
    async fn transport_errors_are_retried_next_cycle() {
        let store = InMemoryStore::new();
        store.save_order(&Order::new("1111111".into(), 1)).await.unwrap();
        // No script for this order, so every lookup fails
        let oracle = ScriptedOracle::default();
        let pipeline = start(&store, &oracle, fast_config());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(pipeline.stats().snapshot().transport_errors >= 2);
        stop(pipeline).await;
    }

    #[tokio::test]
    async fn sink_publishes_order_updated_events() {
        let store = InMemoryStore::new();
        store.save_order(&Order::new("1111111".into(), 7)).await.unwrap();
        let oracle = ScriptedOracle::default().script("1111111", vec![processed("1111111", 42)]);
        let (tx, mut rx) = mpsc::channel(4);
        let mut hooks = EventHooks::default();
        hooks.on_order_updated(move |ev| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(ev.order).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let handlers = EventHandlers::new(4, hooks);
        let producers = handlers.producers();
        handlers.start_handlers();
        let pipeline = AccrualPipeline::start(
            store.clone(),
            oracle,
            fast_config(),
            producers,
            Arc::new(PipelineStats::default()),
            ShutdownSignal::new(),
        );
        let order = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(order.number.as_str(), "1111111");
        assert_eq!(order.user_id, 7);
        assert_eq!(order.accrual, Points::from_points(42));
        stop(pipeline).await;
    }

    #[tokio::test]
    async fn shutdown_interrupts_blocked_components() {
        let store = InMemoryStore::new();
        for n in 0..20 {
            store.save_order(&Order::new(OrderNumber::new(n.to_string()), 1)).await.unwrap();
        }
        // Every lookup is rate limited with a long pause, so all workers are asleep and the dispatcher is blocked
        let oracle = ScriptedOracle::default();
        for n in 0..20 {
            let reply = OracleResponse::new(StatusCode::TOO_MANY_REQUESTS).with_retry_after(Duration::from_secs(3600));
            oracle.scripts.lock().unwrap().insert(OrderNumber::new(n.to_string()), vec![reply].into());
        }
        let pipeline = start(&store, &oracle, fast_config().with_rate_limit_policy(RateLimitPolicy::backoff()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop(pipeline).await;
    }
}
