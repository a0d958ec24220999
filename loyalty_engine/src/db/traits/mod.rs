//! #  Store contracts.
//!
//! This module provides the interfaces that the loyalty engine expects from a storage *backend*. The reconciliation
//! pipeline and the public API never talk to a database directly; they are generic over these traits so that the
//! SQLite backend, the in-memory backend, or a test fake can be plugged in.
//!
//! * [`OrderManagement`] stores orders and withdrawals. It is the only trait the reconciliation pipeline needs.
//! * [`UserManagement`] stores user credentials for the authentication layer.
//!
//! Every method returns a `Send` future so that the pipeline can run each component on its own tokio task.
mod order_management;
mod user_management;

pub use order_management::OrderManagement;
pub use user_management::UserManagement;
