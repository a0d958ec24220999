//! A store that keeps everything in process memory.
//!
//! Nothing survives a restart. It is used when no database URI is configured, and as the backend for pipeline and
//! endpoint tests.
mod errors;

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use chrono::Utc;
pub use errors::InMemoryStoreError;
use log::*;
use tokio::sync::RwLock;

use crate::{
    db::traits::{OrderManagement, UserManagement},
    db_types::{NewUser, NewWithdrawal, Order, OrderNumber, User, Withdrawal},
};

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderNumber, Order>,
    withdrawals: Vec<Withdrawal>,
    users: Vec<User>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders held, regardless of status.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

impl OrderManagement for InMemoryStore {
    type Error = InMemoryStoreError;

    async fn fetch_pending_orders(&self) -> Result<Vec<Order>, Self::Error> {
        let tables = self.tables.read().await;
        let mut orders = tables.orders.values().filter(|o| !o.status.is_terminal()).cloned().collect::<Vec<_>>();
        orders.sort_by_key(|o| o.updated_at);
        Ok(orders)
    }

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, Self::Error> {
        Ok(self.tables.read().await.orders.get(number).cloned())
    }

    async fn save_order(&self, order: &Order) -> Result<(), Self::Error> {
        let mut tables = self.tables.write().await;
        trace!("🗃️ Saving order {} with status {}", order.number, order.status);
        match tables.orders.get_mut(&order.number) {
            // The owner and number of an order never change after it is first stored
            Some(existing) => {
                existing.status = order.status;
                existing.accrual = order.accrual;
                existing.updated_at = order.updated_at;
            },
            None => {
                tables.orders.insert(order.number.clone(), order.clone());
            },
        }
        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> Result<bool, Self::Error> {
        let mut tables = self.tables.write().await;
        match tables.orders.entry(order.number.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                Ok(true)
            },
        }
    }

    async fn fetch_user_orders(&self, user_id: i64) -> Result<Vec<Order>, Self::Error> {
        let tables = self.tables.read().await;
        let mut orders = tables.orders.values().filter(|o| o.user_id == user_id).cloned().collect::<Vec<_>>();
        orders.sort_by_key(|o| o.updated_at);
        Ok(orders)
    }

    async fn fetch_user_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, Self::Error> {
        let tables = self.tables.read().await;
        Ok(tables.withdrawals.iter().filter(|w| w.user_id == user_id).cloned().collect())
    }

    async fn save_withdrawal(&self, withdrawal: NewWithdrawal) -> Result<Withdrawal, Self::Error> {
        let mut tables = self.tables.write().await;
        let id = tables.withdrawals.len() as i64 + 1;
        let record = Withdrawal {
            id,
            user_id: withdrawal.user_id,
            order_number: withdrawal.order_number,
            sum: withdrawal.sum,
            processed_at: withdrawal.processed_at,
        };
        tables.withdrawals.push(record.clone());
        debug!("🗃️ Withdrawal #{id} of {} saved", record.sum);
        Ok(record)
    }
}

impl UserManagement for InMemoryStore {
    type Error = InMemoryStoreError;

    async fn create_user(&self, user: NewUser) -> Result<User, Self::Error> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.login == user.login) {
            return Err(InMemoryStoreError::DuplicateLogin(user.login));
        }
        let id = tables.users.len() as i64 + 1;
        let user = User { id, login: user.login, password_hash: user.password_hash, created_at: Utc::now() };
        tables.users.push(user.clone());
        debug!("🗃️ User '{}' created with id {id}", user.login);
        Ok(user)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, Self::Error> {
        Ok(self.tables.read().await.users.iter().find(|u| u.login == login).cloned())
    }
}
