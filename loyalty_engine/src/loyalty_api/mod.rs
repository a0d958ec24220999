//! The engine's public API.
//!
//! The HTTP layer only ever talks to these types. They add the business rules (ownership of orders, balance checks on
//! withdrawal, credential checks) on top of the store traits.
pub mod auth_api;
pub mod errors;
pub mod order_api;
