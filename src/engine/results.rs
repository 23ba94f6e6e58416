// 8.0.2: errors for engine operations. three families: rejections of a caller's
// order, lookups that miss, and invariant violations inside the engine.

use crate::events::CancelReason;
use crate::position::{InvariantViolation, PnlError};
use crate::types::OrderId;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("invalid size {amount}: not a positive multiple of contract size {contract_size}")]
    InvalidSize { amount: Decimal, contract_size: Decimal },

    #[error("invalid limit price {0}")]
    InvalidPrice(Decimal),

    #[error("maximum position size {limit} exceeded: resulting size {resulting}")]
    MaxPositionExceeded { limit: Decimal, resulting: Decimal },

    #[error("maximum order size is {max_amount}, requested {amount}")]
    MarginExceeded { amount: Decimal, max_amount: Decimal },

    #[error("post-only order would take liquidity")]
    PostOnlyWouldTake,

    #[error("reduce-only order would increase or flip the position")]
    ReduceOnlyWouldIncrease,
}

impl RejectReason {
    // why a resting order is cancelled when it can no longer fill
    pub fn cancel_reason(&self) -> CancelReason {
        match self {
            RejectReason::MaxPositionExceeded { .. } => CancelReason::PositionLimit,
            RejectReason::ReduceOnlyWouldIncrease => CancelReason::ReduceOnlyInvalid,
            _ => CancelReason::InsufficientMargin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("order {order_id} rejected: {reason}")]
    Rejected { order_id: OrderId, reason: RejectReason },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {0} is not open")]
    OrderNotOpen(OrderId),

    #[error("position for {0} not found")]
    PositionNotFound(String),

    #[error("no symbol configured for currency {0}")]
    UnknownCurrency(String),

    #[error("no quote available")]
    NoQuote,

    #[error("internal invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl From<PnlError> for EngineError {
    fn from(e: PnlError) -> Self {
        EngineError::Invariant(InvariantViolation::Pnl(e))
    }
}

impl EngineError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Rejected { .. })
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self, EngineError::Invariant(_))
    }

    pub fn rejected_order(&self) -> Option<OrderId> {
        match self {
            EngineError::Rejected { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}
