use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{new_pool, orders, users, withdrawals, SqliteDatabaseError};
use crate::{
    db::traits::{OrderManagement, UserManagement},
    db_types::{NewUser, NewWithdrawal, Order, OrderNumber, OrderStatusType, User, Withdrawal},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// The URL of the database
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl OrderManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn fetch_pending_orders(&self) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_with_status(&OrderStatusType::pending(), &mut conn).await
    }

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_number(number, &mut conn).await
    }

    async fn save_order(&self, order: &Order) -> Result<(), Self::Error> {
        let mut conn = self.pool.acquire().await?;
        trace!("🗃️ Saving order {} with status {}", order.number, order.status);
        orders::upsert_order(order, &mut conn).await
    }

    async fn insert_order(&self, order: &Order) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let inserted = orders::insert_order_if_absent(order, &mut conn).await?;
        trace!("🗃️ Insert of order {} for user #{}: {inserted}", order.number, order.user_id);
        Ok(inserted)
    }

    async fn fetch_user_orders(&self, user_id: i64) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_user(user_id, &mut conn).await
    }

    async fn fetch_user_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::fetch_withdrawals_for_user(user_id, &mut conn).await
    }

    async fn save_withdrawal(&self, withdrawal: NewWithdrawal) -> Result<Withdrawal, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let result = withdrawals::insert_withdrawal(withdrawal, &mut conn).await?;
        debug!("🗃️ Withdrawal #{} of {} against order {} saved", result.id, result.sum, result.order_number);
        Ok(result)
    }
}

impl UserManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn create_user(&self, user: NewUser) -> Result<User, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let user = users::insert_user(user, &mut conn).await?;
        debug!("🗃️ User '{}' created with id {}", user.login, user.id);
        Ok(user)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_login(login, &mut conn).await
    }
}
