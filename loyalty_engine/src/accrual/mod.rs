//! The accrual oracle client.
//!
//! [`AccrualClient`] performs a single `GET {base}/api/orders/{number}` lookup per call and hands back the raw outcome
//! as an [`OracleResponse`]. It never retries. Turning that outcome into an order update is the job of [`classify`],
//! which the pipeline workers apply to every response.
mod client;
mod errors;
mod verdict;

pub use client::{AccrualClient, AccrualOracle, OracleResponse};
pub use errors::AccrualClientError;
pub use verdict::{classify, AccrualStatus, AccrualVerdict, Classification, SkipReason, MAX_ACCRUAL};
