//! Orders, order identity and the order registry.
//!
//! Orders are created by the engine, mutated only while being matched, and
//! frozen once they reach a terminal status. The registry keeps every order
//! ever submitted and partitions them into open and historical sets.

use crate::types::{Direction, OrderId, Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Executes immediately at the touch or is rejected.
    Market,
    /// Executes at the limit price or better; rests when not marketable.
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// Which side of the spread a fill came from. Picks the fee rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Liquidity {
    Maker,
    Taker,
}

/// What a caller asks for. Validation happens in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub direction: Direction,
    pub order_type: OrderType,
    /// ignored for market orders
    pub price: Decimal,
    pub amount: Decimal,
    pub post_only: bool,
    pub reduce_only: bool,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, direction: Direction, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            order_type: OrderType::Market,
            price: Decimal::ZERO,
            amount,
            post_only: false,
            reduce_only: false,
        }
    }

    pub fn limit(
        symbol: impl Into<String>,
        direction: Direction,
        price: Decimal,
        amount: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            order_type: OrderType::Limit,
            price,
            amount,
            post_only: false,
            reduce_only: false,
        }
    }

    pub fn post_only(mut self) -> Self {
        self.post_only = true;
        self
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }
}

/// A trading order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub avg_price: Decimal,
    pub filled_amount: Decimal,
    pub direction: Direction,
    pub order_type: OrderType,
    pub post_only: bool,
    pub reduce_only: bool,
    pub status: OrderStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    pub fn new(id: OrderId, request: OrderRequest, timestamp: Timestamp) -> Self {
        Self {
            id,
            symbol: request.symbol,
            price: request.price,
            amount: request.amount,
            avg_price: Decimal::ZERO,
            filled_amount: Decimal::ZERO,
            direction: request.direction,
            order_type: request.order_type,
            post_only: request.post_only,
            reduce_only: request.reduce_only,
            status: OrderStatus::New,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn remaining(&self) -> Decimal {
        self.amount - self.filled_amount
    }

    /// Signed position delta the unfilled remainder would apply.
    pub fn signed_remaining(&self) -> Decimal {
        self.direction.signed(self.remaining())
    }

    pub fn limit_price(&self) -> Option<Price> {
        match self.order_type {
            OrderType::Limit => Price::new(self.price),
            OrderType::Market => None,
        }
    }

    pub fn fill(&mut self, amount: Decimal, price: Price, at: Timestamp) {
        debug_assert!(amount <= self.remaining(), "cannot fill more than remaining");
        let filled = self.filled_amount + amount;
        self.avg_price = (self.avg_price * self.filled_amount + price.value() * amount) / filled;
        self.filled_amount = filled;
        self.status = if self.remaining().is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.updated_at = at;
    }

    pub fn reject(&mut self, at: Timestamp) {
        self.status = OrderStatus::Rejected;
        self.updated_at = at;
    }

    pub fn cancel(&mut self, at: Timestamp) {
        self.status = OrderStatus::Cancelled;
        self.updated_at = at;
    }
}

/// Source of order identities. Must never repeat within a process.
pub trait IdAllocator: fmt::Debug {
    fn next_id(&mut self) -> OrderId;
}

/// Counts up from 1.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdAllocator for SequentialIds {
    fn next_id(&mut self) -> OrderId {
        let id = OrderId(self.next);
        self.next += 1;
        id
    }
}

/// Every order, plus which are open and which are history.
///
/// Open ids keep submission order so resting orders are re-evaluated FIFO.
#[derive(Debug, Clone, Default)]
pub struct OrderRegistry {
    orders: HashMap<OrderId, Order>,
    open: Vec<OrderId>,
    history: HashSet<OrderId>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly matched order in exactly one of open / history.
    pub fn file(&mut self, order: Order) {
        let id = order.id;
        if order.is_open() {
            self.open.push(id);
        } else {
            self.history.insert(id);
        }
        self.orders.insert(id, order);
    }

    /// Stores a changed order, moving it to history if it became terminal.
    pub fn refile(&mut self, order: Order) {
        let id = order.id;
        if !order.is_open() && self.history.insert(id) {
            self.open.retain(|open_id| *open_id != id);
        }
        self.orders.insert(id, order);
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn is_open(&self, id: OrderId) -> bool {
        self.open.contains(&id)
    }

    pub fn open_ids(&self) -> Vec<OrderId> {
        self.open.clone()
    }

    pub fn open_orders(&self, symbol: &str) -> Vec<Order> {
        self.open
            .iter()
            .filter_map(|id| self.orders.get(id))
            .filter(|order| order.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn history(&self) -> impl Iterator<Item = &Order> {
        self.history.iter().filter_map(|id| self.orders.get(id))
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
