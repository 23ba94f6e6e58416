// 11.0: every state change produces an event. the backtest driver reads them back
// as a trade journal; the EventPayload enum lists all event types.

use crate::order::{Liquidity, OrderType};
use crate::types::{Coin, Direction, OrderId, Price, SignedSize, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Order events
    OrderPlaced(OrderPlacedEvent),
    OrderRejected(OrderRejectedEvent),
    OrderCanceled(OrderCanceledEvent),

    // Trade events
    Fill(FillEvent),

    // Position events
    PositionUpdated(PositionUpdatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order_id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Decimal,
    pub post_only: bool,
    pub reduce_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRejectedEvent {
    pub order_id: OrderId,
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCanceledEvent {
    pub order_id: OrderId,
    pub symbol: String,
    pub reason: CancelReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    UserRequested,
    InsufficientMargin,
    PositionLimit,
    ReduceOnlyInvalid,
    // a resting fill hit an invariant violation
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillEvent {
    pub order_id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub amount: Decimal,
    pub price: Price,
    pub fee: Coin,
    pub liquidity: Liquidity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdatedEvent {
    pub symbol: String,
    pub old_size: SignedSize,
    pub new_size: SignedSize,
    pub old_avg_price: Decimal,
    pub new_avg_price: Decimal,
    pub realized_pnl: Coin,
}
