//! Order submission, validation and matching against the current quote.

use super::core::Engine;
use super::results::{EngineError, RejectReason};
use crate::events::{CancelReason, EventPayload, OrderCanceledEvent, OrderPlacedEvent, OrderRejectedEvent};
use crate::order::{Liquidity, Order, OrderRequest, OrderType};
use crate::types::{Direction, OrderId, Price};
use rust_decimal::Decimal;

fn rejection(order_id: OrderId) -> impl Fn(RejectReason) -> EngineError {
    move |reason| EngineError::Rejected { order_id, reason }
}

impl Engine {
    /// Place an order. The order is recorded whether or not it is accepted;
    /// a rejection carries the id it was recorded under.
    pub fn place_order(&mut self, request: OrderRequest) -> Result<Order, EngineError> {
        let order_id = self.ids.next_id();
        let now = self.time();
        let mut order = Order::new(order_id, request, now);

        self.emit_event(EventPayload::OrderPlaced(OrderPlacedEvent {
            order_id,
            symbol: order.symbol.clone(),
            direction: order.direction,
            order_type: order.order_type,
            amount: order.amount,
            price: order.price,
            post_only: order.post_only,
            reduce_only: order.reduce_only,
        }));

        let result = match order.order_type {
            OrderType::Market => self.match_market_order(&mut order),
            OrderType::Limit => self.match_limit_order(&mut order),
        };

        if let Err(err) = &result {
            if err.is_invariant() {
                tracing::error!(order_id = %order_id, error = %err, "matching hit an invariant violation");
            } else {
                tracing::warn!(order_id = %order_id, symbol = %order.symbol, error = %err, "order rejected");
            }
            if order.is_open() {
                order.reject(now);
            }
            self.emit_event(EventPayload::OrderRejected(OrderRejectedEvent {
                order_id,
                symbol: order.symbol.clone(),
                reason: err.to_string(),
            }));
        }

        self.registry.file(order.clone());
        result.map(|()| order)
    }

    pub fn place_market_order(
        &mut self,
        symbol: &str,
        direction: Direction,
        amount: Decimal,
    ) -> Result<Order, EngineError> {
        self.place_order(OrderRequest::market(symbol, direction, amount))
    }

    pub fn place_limit_order(
        &mut self,
        symbol: &str,
        direction: Direction,
        price: Decimal,
        amount: Decimal,
    ) -> Result<Order, EngineError> {
        self.place_order(OrderRequest::limit(symbol, direction, price, amount))
    }

    /// Cancel an open order.
    pub fn cancel_order(&mut self, symbol: &str, id: OrderId) -> Result<Order, EngineError> {
        let mut order = self.get_order(symbol, id)?;
        if !order.is_open() {
            return Err(EngineError::OrderNotOpen(id));
        }

        order.cancel(self.time());
        self.registry.refile(order.clone());

        self.emit_event(EventPayload::OrderCanceled(OrderCanceledEvent {
            order_id: id,
            symbol: order.symbol.clone(),
            reason: CancelReason::UserRequested,
        }));

        Ok(order)
    }

    /// Cancel every open order on `symbol`. Returns what was cancelled.
    pub fn cancel_all_orders(&mut self, symbol: &str) -> Vec<Order> {
        let ids: Vec<OrderId> = self
            .registry
            .open_orders(symbol)
            .iter()
            .map(|order| order.id)
            .collect();

        ids.into_iter()
            .filter_map(|id| self.cancel_order(symbol, id).ok())
            .collect()
    }

    // all or nothing at the touch
    fn match_market_order(&mut self, order: &mut Order) -> Result<(), EngineError> {
        if !order.is_open() {
            return Ok(());
        }
        let reject = rejection(order.id);

        self.check_size(order).map_err(&reject)?;
        self.check_position_limit(order).map_err(&reject)?;
        self.check_reduce_only(order).map_err(&reject)?;
        if order.post_only {
            return Err(reject(RejectReason::PostOnlyWouldTake));
        }

        let tick = self.require_tick()?;
        let price = tick.touch(order.direction);
        self.check_margin(order, price).map_err(&reject)?;

        self.execute_fill(order, price, Liquidity::Taker)
    }

    // marketable limits take at the touch, the rest wait for update_tick
    fn match_limit_order(&mut self, order: &mut Order) -> Result<(), EngineError> {
        if !order.is_open() {
            return Ok(());
        }
        let reject = rejection(order.id);

        self.check_size(order).map_err(&reject)?;
        let limit = order
            .limit_price()
            .ok_or(RejectReason::InvalidPrice(order.price))
            .map_err(&reject)?;
        self.check_position_limit(order).map_err(&reject)?;
        self.check_reduce_only(order).map_err(&reject)?;

        let tick = self.require_tick()?;
        if !tick.crosses(order.direction, limit) {
            tracing::debug!(order_id = %order.id, %limit, "limit order resting");
            return Ok(());
        }
        if order.post_only {
            return Err(reject(RejectReason::PostOnlyWouldTake));
        }

        let price = tick.touch(order.direction);
        self.check_margin(order, price).map_err(&reject)?;

        self.execute_fill(order, price, Liquidity::Taker)
    }

    /// Checks a fill of the whole remainder at `price` must pass.
    pub(super) fn check_fill(&self, order: &Order, price: Price) -> Result<(), RejectReason> {
        self.check_position_limit(order)?;
        self.check_reduce_only(order)?;
        self.check_margin(order, price)
    }

    fn check_size(&self, order: &Order) -> Result<(), RejectReason> {
        let contract_size = self.config.contract_size;
        if order.amount <= Decimal::ZERO || !(order.amount % contract_size).is_zero() {
            return Err(RejectReason::InvalidSize {
                amount: order.amount,
                contract_size,
            });
        }
        Ok(())
    }

    // both sides are checked whatever the direction: current ± amount must stay within the limit
    fn check_position_limit(&self, order: &Order) -> Result<(), RejectReason> {
        let current = self
            .ledger
            .get(&order.symbol)
            .map_or(Decimal::ZERO, |p| p.size.value());
        let amount = order.remaining();
        let limit = self.config.position_size_limit;

        for resulting in [current + amount, current - amount] {
            if resulting.abs() > limit {
                return Err(RejectReason::MaxPositionExceeded { limit, resulting });
            }
        }
        Ok(())
    }

    fn check_reduce_only(&self, order: &Order) -> Result<(), RejectReason> {
        if !order.reduce_only {
            return Ok(());
        }
        let reduces = self.ledger.get(&order.symbol).is_some_and(|p| {
            p.side()
                .is_some_and(|side| side.closing_direction() == order.direction)
                && order.remaining() <= p.size.abs()
        });

        if reduces {
            Ok(())
        } else {
            Err(RejectReason::ReduceOnlyWouldIncrease)
        }
    }

    // amount / price <= balance * leverage
    fn check_margin(&self, order: &Order, price: Price) -> Result<(), RejectReason> {
        let max_amount =
            self.account.balance().value() * self.config.max_leverage.value() * price.value();
        if order.remaining() > max_amount {
            return Err(RejectReason::MarginExceeded {
                amount: order.remaining(),
                max_amount,
            });
        }
        Ok(())
    }
}
