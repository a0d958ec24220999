use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{
    dev::Server,
    http::KeepAlive,
    middleware::Logger,
    web::{self, ServiceConfig},
    App,
    HttpServer,
};
use log::*;
use loyalty_engine::{
    accrual::AccrualClient,
    events::{EventHandlers, EventHooks, OrderUpdatedEvent},
    pipeline::{AccrualPipeline, PipelineStats, ShutdownSignal},
    AuthApi,
    InMemoryStore,
    LoyaltyApi,
    OrderManagement,
    SqliteDatabase,
    UserManagement,
};

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        LoginRoute,
        MyBalanceRoute,
        MyOrdersRoute,
        MyWithdrawalsRoute,
        RegisterRoute,
        SubmitOrderRoute,
        WithdrawRoute,
    },
};

const MAX_DB_CONNECTIONS: u32 = 25;
const EVENT_BUFFER_SIZE: usize = 64;

/// Everything the HTTP surface needs, built once and shared by every actix worker.
pub struct AppState<B> {
    pub loyalty_api: web::Data<LoyaltyApi<B>>,
    pub auth_api: web::Data<AuthApi<B>>,
    pub issuer: web::Data<TokenIssuer>,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self { loyalty_api: self.loyalty_api.clone(), auth_api: self.auth_api.clone(), issuer: self.issuer.clone() }
    }
}

impl<B> AppState<B>
where B: OrderManagement + UserManagement
{
    pub fn new(store: B, config: &ServerConfig) -> Self {
        let loyalty_api = web::Data::new(LoyaltyApi::new(store.clone()));
        let auth_api = web::Data::new(AuthApi::new(store, config.hash_secret.clone()));
        let issuer = web::Data::new(TokenIssuer::new(&config.hash_secret, config.token_expiry));
        Self { loyalty_api, auth_api, issuer }
    }

    pub fn configure(&self, cfg: &mut ServiceConfig) {
        let api_scope = web::scope("/api")
            .service(RegisterRoute::<B>::new())
            .service(LoginRoute::<B>::new())
            .service(SubmitOrderRoute::<B>::new())
            .service(MyOrdersRoute::<B>::new())
            .service(MyBalanceRoute::<B>::new())
            .service(WithdrawRoute::<B>::new())
            .service(MyWithdrawalsRoute::<B>::new());
        cfg.app_data(self.loyalty_api.clone())
            .app_data(self.auth_api.clone())
            .app_data(self.issuer.clone())
            .service(health)
            .service(api_scope);
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    match config.database_uri.clone() {
        Some(url) => {
            let db = SqliteDatabase::new_with_url(&url, MAX_DB_CONNECTIONS)
                .await
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
            info!("🚀️ Using SQLite store at {url}");
            run_with_store(config, db).await
        },
        None => {
            warn!("🚀️ DATABASE_URI is not set. Using an in-memory store. Nothing will survive a restart.");
            run_with_store(config, InMemoryStore::new()).await
        },
    }
}

/// Runs the HTTP server, and the reconciliation pipeline if it is enabled, until Ctrl-C is received.
pub async fn run_with_store<B>(config: ServerConfig, store: B) -> Result<(), ServerError>
where B: OrderManagement + UserManagement {
    let shutdown = ShutdownSignal::new();
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();

    let pipeline = if config.run_pipeline {
        let client = AccrualClient::new(&config.accrual_address, config.accrual_timeout)
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let stats = Arc::new(PipelineStats::default());
        let pipeline =
            AccrualPipeline::start(store.clone(), client, config.pipeline.clone(), producers, stats, shutdown.clone());
        Some(pipeline)
    } else {
        warn!("🚀️ The accrual pipeline is disabled. Order statuses will not change.");
        None
    };

    let srv = create_server_instance(&config, store)?;
    let handle = srv.handle();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => info!("🚀️ Ctrl-C received. Shutting down."),
                Err(e) => {
                    error!("🚀️ Cannot listen for Ctrl-C. {e}");
                    signal.cancelled().await;
                },
            },
            _ = signal.cancelled() => {},
        }
        signal.trigger();
        handle.stop(true).await;
    });

    let result = srv.await.map_err(ServerError::from);
    shutdown.trigger();
    if let Some(pipeline) = pipeline {
        let totals = pipeline.stats().snapshot();
        pipeline.join().await;
        info!("🚀️ Pipeline totals: {totals:?}");
    }
    result
}

pub fn create_server_instance<B>(config: &ServerConfig, store: B) -> Result<Server, ServerError>
where B: OrderManagement + UserManagement {
    let state = AppState::new(store, config);
    let srv = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("loyalty::access_log"))
            .configure(move |cfg| state.configure(cfg))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .disable_signals()
    .bind(config.run_address.as_str())?
    .run();
    info!("🚀️ Listening on {}", config.run_address);
    Ok(srv)
}

fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_updated(|ev: OrderUpdatedEvent| -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let order = ev.order;
            info!(
                "📬️ Order {} for user #{} is now {}. Accrual: {}",
                order.number, order.user_id, order.status, order.accrual
            );
        })
    });
    hooks
}
