use loyalty_common::Points;
use thiserror::Error;

use crate::db_types::OrderNumber;

#[derive(Debug, Clone, Error)]
pub enum LoyaltyApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} has already been submitted by this user")]
    OrderAlreadyExists(OrderNumber),
    #[error("Order {0} has already been submitted by another user")]
    OrderOwnedByAnotherUser(OrderNumber),
    #[error("Insufficient balance. Requested {requested}, but only {available} is available")]
    InsufficientBalance { requested: Points, available: Points },
    #[error("Withdrawal amounts must be positive. Got {0}")]
    InvalidAmount(Points),
}

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Login and password must not be empty")]
    EmptyCredentials,
    #[error("The login '{0}' is already taken")]
    LoginTaken(String),
    #[error("Invalid login or password")]
    InvalidCredentials,
    #[error("{0}")]
    HashError(String),
}
