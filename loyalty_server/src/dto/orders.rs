use chrono::{DateTime, Utc};
use loyalty_common::Points;
use loyalty_engine::db_types::{Order, OrderStatusType, Withdrawal};
use serde::{Deserialize, Serialize};

/// An order as reported to its owner. The accrual is only included once the order has been processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub number: String,
    pub status: OrderStatusType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        let accrual = match order.status {
            OrderStatusType::Processed => Some(order.accrual),
            _ => None,
        };
        Self { number: order.number.0, status: order.status, accrual, uploaded_at: order.updated_at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalView {
    pub order: String,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalView {
    fn from(w: Withdrawal) -> Self {
        Self { order: w.order_number.0, sum: w.sum, processed_at: w.processed_at }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalRequest {
    pub order: String,
    pub sum: Points,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}
