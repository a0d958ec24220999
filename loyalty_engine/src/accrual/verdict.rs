use std::{fmt::Display, time::Duration};

use loyalty_common::Points;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    accrual::OracleResponse,
    db_types::{Order, OrderNumber, OrderStatusType},
};

/// The largest accrual accepted for a single order. Anything above it is treated as a protocol error.
pub const MAX_ACCRUAL: Points = Points::from_points(1_000_000_000);

/// The oracle's own view of an order's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    /// The oracle knows about the order but has not started on it.
    Registered,
    Processing,
    Invalid,
    Processed,
}

/// The body of a `200 OK` oracle response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualVerdict {
    pub order: OrderNumber,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

impl AccrualVerdict {
    pub fn new(order: OrderNumber, status: AccrualStatus, accrual: Option<Points>) -> Self {
        Self { order, status, accrual }
    }
}

/// Why a response did not produce an order update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The oracle has registered the order but has nothing to report yet.
    Registered,
    /// The verdict is for a different order than the one requested.
    ReferenceMismatch { requested: OrderNumber, received: OrderNumber },
    NegativeAccrual(Points),
    /// The accrual exceeds [`MAX_ACCRUAL`].
    AccrualOutOfRange(Points),
    /// A `200 OK` whose body could not be decoded.
    Undecodable(String),
    UnexpectedStatus(StatusCode),
}

impl SkipReason {
    /// True for responses that break the oracle contract, as opposed to the ordinary "not ready yet" case.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, SkipReason::Registered)
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Registered => write!(f, "order is registered but not yet processed"),
            SkipReason::ReferenceMismatch { requested, received } => {
                write!(f, "verdict for order {received} does not match requested order {requested}")
            },
            SkipReason::NegativeAccrual(accrual) => write!(f, "negative accrual {accrual}"),
            SkipReason::AccrualOutOfRange(accrual) => {
                write!(f, "accrual {accrual} exceeds the maximum of {MAX_ACCRUAL}")
            },
            SkipReason::Undecodable(e) => write!(f, "undecodable response body. {e}"),
            SkipReason::UnexpectedStatus(status) => write!(f, "unexpected response status {status}"),
        }
    }
}

/// What a worker should do with an oracle response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Persist this updated order.
    Update(Order),
    /// Leave the order untouched this cycle.
    Skip(SkipReason),
    /// The oracle is rate limiting or failing. The worker must pause or stop.
    RateLimited { status: StatusCode, retry_after: Option<Duration> },
}

/// Interprets an oracle response for `order`. The first matching rule wins:
///
/// * `204` marks the order `INVALID`.
/// * `429` and any `5xx` are a rate-limit signal.
/// * `200` with a well-formed verdict for the same order maps the verdict status onto the order. `REGISTERED` is
///   skipped. `PROCESSED` takes the verdict's accrual, or zero if none was sent.
/// * Anything else is skipped as a protocol error.
pub fn classify(order: &Order, response: OracleResponse) -> Classification {
    let status = response.status;
    if status == StatusCode::NO_CONTENT {
        return Classification::Update(order.with_status(OrderStatusType::Invalid));
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Classification::RateLimited { status, retry_after: response.retry_after };
    }
    if status != StatusCode::OK {
        return Classification::Skip(SkipReason::UnexpectedStatus(status));
    }
    let verdict = match response.verdict {
        Some(Ok(verdict)) => verdict,
        Some(Err(e)) => return Classification::Skip(SkipReason::Undecodable(e)),
        None => return Classification::Skip(SkipReason::Undecodable("empty body".to_string())),
    };
    if verdict.order != order.number {
        return Classification::Skip(SkipReason::ReferenceMismatch {
            requested: order.number.clone(),
            received: verdict.order,
        });
    }
    match verdict.status {
        AccrualStatus::Registered => Classification::Skip(SkipReason::Registered),
        AccrualStatus::Processing => Classification::Update(order.with_status(OrderStatusType::Processing)),
        AccrualStatus::Invalid => Classification::Update(order.with_status(OrderStatusType::Invalid)),
        AccrualStatus::Processed => {
            let accrual = verdict.accrual.unwrap_or_default();
            if accrual.is_negative() {
                return Classification::Skip(SkipReason::NegativeAccrual(accrual));
            }
            if accrual > MAX_ACCRUAL {
                return Classification::Skip(SkipReason::AccrualOutOfRange(accrual));
            }
            Classification::Update(order.processed(accrual))
        },
    }
}
