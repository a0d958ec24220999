use log::*;
use loyalty_common::helpers::luhn_valid;
use loyalty_engine::db_types::OrderNumber;

use crate::errors::ServerError;

/// Validates an order number supplied by a user.
///
/// Anything that is not a non-empty string of digits is a malformed request. A string of digits that fails the Luhn
/// check is well-formed but invalid.
pub fn parse_order_number(raw: &str) -> Result<OrderNumber, ServerError> {
    let number = raw.trim();
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        debug!("💻️ Malformed order number '{number}'");
        return Err(ServerError::InvalidRequestBody(format!("'{number}' is not an order number")));
    }
    if !luhn_valid(number) {
        debug!("💻️ Order number {number} fails the Luhn check");
        return Err(ServerError::InvalidOrderNumber(number.to_string()));
    }
    Ok(OrderNumber::new(number))
}
