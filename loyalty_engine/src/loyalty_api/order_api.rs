use std::{fmt::Debug, sync::Arc};

use log::*;
use loyalty_common::Points;
use tokio::sync::Mutex;

use crate::{
    db::traits::OrderManagement,
    db_types::{Balance, NewWithdrawal, Order, OrderNumber, Withdrawal},
    loyalty_api::errors::LoyaltyApiError,
};

/// `LoyaltyApi` handles order submission, balance queries and withdrawals on behalf of users.
///
/// Order status and accrual are never changed here. That is the reconciliation pipeline's job.
#[derive(Clone)]
pub struct LoyaltyApi<B> {
    db: B,
    // Serialises withdrawals so that two concurrent requests cannot both pass the balance check
    withdrawal_lock: Arc<Mutex<()>>,
}

impl<B: Debug> Debug for LoyaltyApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoyaltyApi ({:?})", self.db)
    }
}

impl<B> LoyaltyApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db, withdrawal_lock: Arc::new(Mutex::new(())) }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn order(&self, number: &OrderNumber) -> Result<Option<Order>, LoyaltyApiError> {
        self.db.fetch_order(number).await.map_err(db_error)
    }

    /// Records a new order for the user with status `NEW`.
    ///
    /// If the order number is already known, nothing is written and the error says whether it belongs to this user
    /// or to someone else. The store insert is atomic, so of several concurrent submissions of a new number exactly
    /// one succeeds.
    pub async fn submit_order(&self, user_id: i64, number: OrderNumber) -> Result<Order, LoyaltyApiError> {
        let order = Order::new(number, user_id);
        if self.db.insert_order(&order).await.map_err(db_error)? {
            debug!("🔄️📦️ Order {} submitted by user #{user_id}", order.number);
            return Ok(order);
        }
        match self.order(&order.number).await? {
            Some(existing) if existing.user_id == user_id => Err(LoyaltyApiError::OrderAlreadyExists(order.number)),
            Some(_) => Err(LoyaltyApiError::OrderOwnedByAnotherUser(order.number)),
            None => Err(LoyaltyApiError::DatabaseError(format!("Order {} was rejected but not found", order.number))),
        }
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, LoyaltyApiError> {
        self.db.fetch_user_orders(user_id).await.map_err(db_error)
    }

    pub async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, LoyaltyApiError> {
        self.db.fetch_user_withdrawals(user_id).await.map_err(db_error)
    }

    /// Calculates the user's balance from scratch.
    pub async fn balance_for_user(&self, user_id: i64) -> Result<Balance, LoyaltyApiError> {
        let orders = self.orders_for_user(user_id).await?;
        let withdrawals = self.withdrawals_for_user(user_id).await?;
        Ok(Balance::calculate(&orders, &withdrawals))
    }

    /// Spends `sum` points from the user's balance against `order_number`.
    ///
    /// The order number is only recorded; it does not need to be an order known to the system.
    pub async fn withdraw(
        &self,
        user_id: i64,
        order_number: OrderNumber,
        sum: Points,
    ) -> Result<Withdrawal, LoyaltyApiError> {
        if !sum.is_positive() {
            return Err(LoyaltyApiError::InvalidAmount(sum));
        }
        let _guard = self.withdrawal_lock.lock().await;
        let balance = self.balance_for_user(user_id).await?;
        if sum > balance.current {
            debug!("🔄️💰️ User #{user_id} tried to withdraw {sum} with only {} available", balance.current);
            return Err(LoyaltyApiError::InsufficientBalance { requested: sum, available: balance.current });
        }
        let withdrawal = NewWithdrawal::new(user_id, order_number, sum);
        let result = self.db.save_withdrawal(withdrawal).await.map_err(db_error)?;
        info!("🔄️💰️ User #{user_id} withdrew {sum} against order {}", result.order_number);
        Ok(result)
    }
}

fn db_error<E: std::error::Error>(e: E) -> LoyaltyApiError {
    LoyaltyApiError::DatabaseError(e.to_string())
}
