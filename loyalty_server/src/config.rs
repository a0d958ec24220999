use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use loyalty_common::{helpers::parse_boolean_flag, Secret};
use loyalty_engine::pipeline::{PipelineConfig, RateLimitPolicy};

pub const DEFAULT_RUN_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_ACCRUAL_ADDRESS: &str = "http://127.0.0.1:8081";
const DEFAULT_HASH_SECRET: &str = "secret";
const DEFAULT_TOKEN_EXPIRY_HOURS: i64 = 3;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// The `host:port` address the HTTP server binds to.
    pub run_address: String,
    /// Base URL of the accrual service.
    pub accrual_address: String,
    /// SQLite database URL. When it is `None` an in-memory store is used and nothing survives a restart.
    pub database_uri: Option<String>,
    /// Key for password hashes and access token signatures.
    pub hash_secret: Secret<String>,
    /// How long an access token stays valid after it was issued.
    pub token_expiry: chrono::Duration,
    /// Request timeout for accrual service lookups. With `None`, reqwest's transport defaults apply.
    pub accrual_timeout: Option<Duration>,
    /// If false, the reconciliation pipeline is not started and order statuses never change.
    pub run_pipeline: bool,
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            run_address: DEFAULT_RUN_ADDRESS.to_string(),
            accrual_address: DEFAULT_ACCRUAL_ADDRESS.to_string(),
            database_uri: None,
            hash_secret: Secret::new(DEFAULT_HASH_SECRET.to_string()),
            token_expiry: chrono::Duration::hours(DEFAULT_TOKEN_EXPIRY_HOURS),
            accrual_timeout: None,
            run_pipeline: true,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let run_address = env::var("RUN_ADDRESS").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| {
            info!("🪛️ RUN_ADDRESS is not set. Using the default, {DEFAULT_RUN_ADDRESS}.");
            DEFAULT_RUN_ADDRESS.to_string()
        });
        let accrual_address = env::var("ACCRUAL_SYSTEM_ADDRESS").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| {
            warn!("🪛️ ACCRUAL_SYSTEM_ADDRESS is not set. Using the default, {DEFAULT_ACCRUAL_ADDRESS}.");
            DEFAULT_ACCRUAL_ADDRESS.to_string()
        });
        let database_uri = env::var("DATABASE_URI").ok().filter(|s| !s.is_empty());
        let hash_secret = env::var("HASH_SECRET").ok().filter(|s| !s.is_empty()).map(Secret::new).unwrap_or_else(|| {
            warn!(
                "🚨️ HASH_SECRET is not set. Using the built-in default. Anyone who knows it can forge access tokens, so \
                 DO NOT run in production like this. 🚨️"
            );
            defaults.hash_secret.clone()
        });
        let token_expiry = parse_or_default("LOYALTY_TOKEN_EXPIRY_HOURS", DEFAULT_TOKEN_EXPIRY_HOURS);
        let token_expiry = chrono::Duration::hours(token_expiry);
        let accrual_timeout = env::var("LOYALTY_ACCRUAL_TIMEOUT_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid value for LOYALTY_ACCRUAL_TIMEOUT_MS ({s}). {e}. Not using a timeout."))
                    .ok()
            })
            .map(Duration::from_millis);
        let run_pipeline = parse_boolean_flag(env::var("LOYALTY_RUN_PIPELINE").ok(), true);
        let pipeline = pipeline_config_from_env(defaults.pipeline);
        Self {
            run_address,
            accrual_address,
            database_uri,
            hash_secret,
            token_expiry,
            accrual_timeout,
            run_pipeline,
            pipeline,
        }
    }
}

fn pipeline_config_from_env(defaults: PipelineConfig) -> PipelineConfig {
    let worker_count = parse_or_default("LOYALTY_WORKER_COUNT", defaults.worker_count);
    let interval_ms = parse_or_default("LOYALTY_DISPATCH_INTERVAL_MS", defaults.dispatch_interval.as_millis() as u64);
    let intake_capacity = parse_or_default("LOYALTY_INTAKE_CAPACITY", defaults.intake_capacity);
    let sink_capacity = parse_or_default("LOYALTY_SINK_CAPACITY", defaults.sink_capacity);
    let rate_limit_policy = parse_or_default("LOYALTY_RATE_LIMIT_POLICY", RateLimitPolicy::default());
    PipelineConfig {
        worker_count,
        dispatch_interval: dispatch_interval(interval_ms, defaults.dispatch_interval),
        intake_capacity,
        sink_capacity,
        rate_limit_policy,
    }
}

fn dispatch_interval(ms: u64, default: Duration) -> Duration {
    if ms == 0 {
        warn!("🪛️ LOYALTY_DISPATCH_INTERVAL_MS must be greater than zero. Using the default, {default:?}.");
        return default;
    }
    Duration::from_millis(ms)
}

/// Reads and parses an environment variable, logging and falling back to `default` if it is missing or invalid.
fn parse_or_default<T>(var: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(var) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {var} ({s}). {e}. Using the default, {default}.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {var} is not set. Using the default, {default}.");
            default
        },
    }
}
