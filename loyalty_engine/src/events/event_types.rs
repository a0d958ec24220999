use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Published by the persistence sink after an order update has been written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdatedEvent {
    pub order: Order,
}

impl OrderUpdatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
