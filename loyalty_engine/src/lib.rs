//! Loyalty Engine
//!
//! The loyalty engine tracks loyalty points earned on submitted orders. It holds the core logic of the loyalty service
//! and knows nothing about HTTP.
//!
//! The library is divided into these sections:
//! 1. The data model ([`mod@db_types`]) and storage ([`mod@db`]). Backends implement the store traits
//!    [`OrderManagement`] and [`UserManagement`]. SQLite and an in-memory store are provided.
//! 2. The accrual client ([`mod@accrual`]), which asks the external accrual service for a verdict on an order.
//! 3. The reconciliation pipeline ([`mod@pipeline`]), a set of background tasks that keep polling the accrual service
//!    for every order that has not reached a terminal status, and write the verdicts back to the store.
//! 4. The public API ([`LoyaltyApi`], [`AuthApi`]) used by the HTTP server for order submission, balances, withdrawals
//!    and credentials.
//!
//! The engine also emits events that can be subscribed to. Whenever the pipeline writes an order update, an
//! [`events::OrderUpdatedEvent`] is published to any registered hook.
pub mod accrual;
pub mod db;
pub mod db_types;
pub mod events;
pub mod helpers;
mod loyalty_api;
pub mod pipeline;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use db::memory::{InMemoryStore, InMemoryStoreError};
#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{OrderManagement, UserManagement};
pub use loyalty_api::{
    auth_api::AuthApi,
    errors::{AuthApiError, LoyaltyApiError},
    order_api::LoyaltyApi,
};
