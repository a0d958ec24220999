//! Data types shared by the store backends, the reconciliation pipeline and the public API.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use loyalty_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// The externally assigned order number. It is the primary key of an order and never changes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl OrderNumber {
    pub fn new<S: Into<String>>(number: S) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order number cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been submitted, but the accrual service has not looked at it yet.
    New,
    /// The accrual service is calculating the reward for this order.
    Processing,
    /// The accrual service rejected the order. No points will be awarded.
    Invalid,
    /// The reward has been calculated and credited to the order.
    Processed,
}

impl OrderStatusType {
    /// Terminal orders are never sent to the accrual service again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    pub fn pending() -> [OrderStatusType; 2] {
        [Self::New, Self::Processing]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub number: OrderNumber,
    pub user_id: i64,
    pub status: OrderStatusType,
    /// The reward credited to this order. Only meaningful once the order is `PROCESSED`.
    pub accrual: Points,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A freshly submitted order, with status `NEW` and no accrual.
    pub fn new(number: OrderNumber, user_id: i64) -> Self {
        Self { number, user_id, status: OrderStatusType::New, accrual: Points::default(), updated_at: Utc::now() }
    }

    /// The accrual that counts towards the user's balance. Orders that are not `PROCESSED` contribute nothing, whatever
    /// value happens to be stored.
    pub fn credited_accrual(&self) -> Points {
        match self.status {
            OrderStatusType::Processed => self.accrual,
            _ => Points::default(),
        }
    }

    /// Returns a copy of this order with the given status and a refreshed timestamp. The accrual is left as is.
    pub fn with_status(&self, status: OrderStatusType) -> Self {
        Self { status, updated_at: Utc::now(), ..self.clone() }
    }

    /// Returns a copy of this order marked as `PROCESSED` with the given accrual and a refreshed timestamp.
    pub fn processed(&self, accrual: Points) -> Self {
        Self { status: OrderStatusType::Processed, accrual, updated_at: Utc::now(), ..self.clone() }
    }
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    /// The order the points were spent on. It does not have to be a known order.
    pub order_number: OrderNumber,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

//--------------------------------------    NewWithdrawal      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWithdrawal {
    pub user_id: i64,
    pub order_number: OrderNumber,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl NewWithdrawal {
    pub fn new(user_id: i64, order_number: OrderNumber, sum: Points) -> Self {
        Self { user_id, order_number, sum, processed_at: Utc::now() }
    }
}

//--------------------------------------       Balance         ---------------------------------------------------------
/// A user's balance. This is never stored; it is recalculated from orders and withdrawals on every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub current: Points,
    pub withdrawn: Points,
}

impl Balance {
    pub fn calculate(orders: &[Order], withdrawals: &[Withdrawal]) -> Self {
        let earned: Points = orders.iter().map(Order::credited_accrual).sum();
        let withdrawn: Points = withdrawals.iter().map(|w| w.sum).sum();
        Self { current: earned - withdrawn, withdrawn }
    }
}

//--------------------------------------         User          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new<S: Into<String>>(login: S, password_hash: String) -> Self {
        Self { login: login.into(), password_hash }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn order(number: &str, status: OrderStatusType, accrual: i64) -> Order {
        Order { status, accrual: Points::from_points(accrual), ..Order::new(number.into(), 1) }
    }

    fn withdrawal(sum: i64) -> Withdrawal {
        Withdrawal {
            id: 1,
            user_id: 1,
            order_number: "2377225624".into(),
            sum: Points::from_points(sum),
            processed_at: Utc::now(),
        }
    }

    #[test]
    fn status_round_trip() {
        for status in [
            OrderStatusType::New,
            OrderStatusType::Processing,
            OrderStatusType::Invalid,
            OrderStatusType::Processed,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("Paid".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!OrderStatusType::New.is_terminal());
        assert!(!OrderStatusType::Processing.is_terminal());
        assert!(OrderStatusType::Invalid.is_terminal());
        assert!(OrderStatusType::Processed.is_terminal());
    }

    #[test]
    fn balance_of_processed_orders_and_withdrawals() {
        let orders = vec![
            order("1111111", OrderStatusType::Processed, 300),
            order("2222222", OrderStatusType::Processed, 200),
        ];
        let balance = Balance::calculate(&orders, &[withdrawal(100)]);
        assert_eq!(balance.current, Points::from_points(400));
        assert_eq!(balance.withdrawn, Points::from_points(100));
    }

    #[test]
    fn unprocessed_orders_do_not_count() {
        let orders = vec![
            order("1111111", OrderStatusType::Processing, 300),
            order("2222222", OrderStatusType::Invalid, 50),
            order("3333333", OrderStatusType::Processed, 10),
        ];
        let balance = Balance::calculate(&orders, &[]);
        assert_eq!(balance.current, Points::from_points(10));
        assert_eq!(balance.withdrawn, Points::default());
    }

    #[test]
    fn huge_accruals_saturate_instead_of_overflowing() {
        let huge = Points::from_hundredths(9_000_000_000_000_000_000);
        let orders = vec![
            Order::new("1".into(), 1).processed(huge),
            Order::new("2".into(), 1).processed(huge),
        ];
        let balance = Balance::calculate(&orders, &[withdrawal(100)]);
        assert_eq!(balance.current, Points::from_hundredths(i64::MAX) - Points::from_points(100));
        assert_eq!(balance.withdrawn, Points::from_points(100));
    }

    #[test]
    fn processed_keeps_identity() {
        let o = Order::new("1111111".into(), 7);
        let p = o.processed(Points::from_points(500));
        assert_eq!(p.number, o.number);
        assert_eq!(p.user_id, 7);
        assert_eq!(p.status, OrderStatusType::Processed);
        assert_eq!(p.accrual, Points::from_points(500));
        assert!(p.updated_at >= o.updated_at);
    }
}
