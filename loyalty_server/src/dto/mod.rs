//! Request and response bodies of the HTTP API.
mod orders;

pub use orders::{Credentials, OrderView, WithdrawalRequest, WithdrawalView};
