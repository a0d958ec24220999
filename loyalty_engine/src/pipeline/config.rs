use std::{fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;

pub const DEFAULT_WORKER_COUNT: usize = 10;
pub const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_secs(1);
/// Shorter dispatch intervals, including zero, are raised to this.
pub const MIN_DISPATCH_INTERVAL: Duration = Duration::from_millis(1);
pub const DEFAULT_INTAKE_CAPACITY: usize = 1;
pub const DEFAULT_SINK_CAPACITY: usize = 16;
pub const DEFAULT_BACKOFF_INITIAL: Duration = Duration::from_secs(1);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// What a worker does when the oracle answers `429 Too Many Requests` or a `5xx` status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateLimitPolicy {
    /// The worker stops for good. Once every worker has halted, no more lookups happen until restart.
    #[default]
    Halt,
    /// The worker sleeps and then carries on. It sleeps for the `Retry-After` hint if the oracle gave one. Otherwise
    /// the pause starts at `initial` and doubles on each consecutive signal, up to `max`.
    Backoff { initial: Duration, max: Duration },
}

impl RateLimitPolicy {
    pub fn backoff() -> Self {
        Self::Backoff { initial: DEFAULT_BACKOFF_INITIAL, max: DEFAULT_BACKOFF_MAX }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown rate limit policy '{0}'. Expected 'halt' or 'backoff'")]
pub struct UnknownPolicy(String);

impl FromStr for RateLimitPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "halt" => Ok(Self::Halt),
            "backoff" => Ok(Self::backoff()),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl Display for RateLimitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Halt => write!(f, "halt"),
            Self::Backoff { initial, max } => write!(f, "backoff ({initial:?} to {max:?})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub worker_count: usize,
    pub dispatch_interval: Duration,
    /// Capacity of the queue between the dispatch loop and the workers.
    pub intake_capacity: usize,
    /// Capacity of the queue between the workers and the persistence sink.
    pub sink_capacity: usize,
    pub rate_limit_policy: RateLimitPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            dispatch_interval: DEFAULT_DISPATCH_INTERVAL,
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
            sink_capacity: DEFAULT_SINK_CAPACITY,
            rate_limit_policy: RateLimitPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_dispatch_interval(mut self, interval: Duration) -> Self {
        self.dispatch_interval = interval;
        self
    }

    pub fn with_rate_limit_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit_policy = policy;
        self
    }
}
