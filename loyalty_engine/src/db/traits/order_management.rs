use std::future::Future;

use crate::db_types::{NewWithdrawal, Order, OrderNumber, Withdrawal};

/// The `OrderManagement` trait defines the behaviour for storing and querying orders and withdrawals in the database
/// backend.
///
/// Writes are single-record upserts. Backends must make a committed write visible to subsequent reads, but no
/// transaction spanning multiple calls is required.
pub trait OrderManagement: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches all orders that have not reached a terminal status, i.e. those with status `NEW` or `PROCESSING`.
    fn fetch_pending_orders(&self) -> impl Future<Output = Result<Vec<Order>, Self::Error>> + Send;

    /// Fetches the order with the given number, or `None` if no such order exists.
    fn fetch_order(&self, number: &OrderNumber) -> impl Future<Output = Result<Option<Order>, Self::Error>> + Send;

    /// Inserts the order, or overwrites the status, accrual and timestamp of an existing order with the same number.
    fn save_order(&self, order: &Order) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Stores the order only if no order with the same number exists yet, as a single atomic step. Returns whether
    /// the order was inserted.
    fn insert_order(&self, order: &Order) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Fetches all orders belonging to the given user, oldest first.
    fn fetch_user_orders(&self, user_id: i64) -> impl Future<Output = Result<Vec<Order>, Self::Error>> + Send;

    /// Fetches all withdrawals made by the given user, oldest first.
    fn fetch_user_withdrawals(&self, user_id: i64)
        -> impl Future<Output = Result<Vec<Withdrawal>, Self::Error>> + Send;

    /// Records a withdrawal and returns it with its assigned id.
    ///
    /// This does not check the user's balance. That is the caller's responsibility.
    fn save_withdrawal(&self, withdrawal: NewWithdrawal)
        -> impl Future<Output = Result<Withdrawal, Self::Error>> + Send;
}
