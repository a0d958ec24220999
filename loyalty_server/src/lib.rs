//! # Loyalty server
//! The HTTP surface of the loyalty programme. It is responsible for:
//! * Registering users and issuing access tokens.
//! * Accepting order numbers on behalf of authenticated users.
//! * Reporting order statuses, balances and withdrawals.
//! * Running the accrual reconciliation pipeline in the background.
//!
//! ## Configuration
//! The server is configured via environment variables and command-line flags. Flags win.
//! See [config](config/index.html) and [cli](cli/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /api/user/register`, `POST /api/user/login`: Credentials in, `Authorization` header out.
//! * `POST /api/user/orders`, `GET /api/user/orders`: Submit and list orders.
//! * `GET /api/user/balance`, `POST /api/user/balance/withdraw`, `GET /api/user/withdrawals`: Points accounting.

pub mod auth;
pub mod cli;
pub mod config;
pub mod dto;
pub mod errors;

pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
