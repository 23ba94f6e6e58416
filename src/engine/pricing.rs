//! Quote updates and resting order re-evaluation.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{CancelReason, EventPayload, OrderCanceledEvent};
use crate::order::{Liquidity, Order};
use crate::tick::{QuoteSource, Tick};

impl Engine {
    /// Install a new quote, then walk resting limit orders in submission order.
    /// Any order the quote crosses fills in full at its own limit price as
    /// maker, or is cancelled if that fill would break a limit.
    ///
    /// A fill that trips an internal invariant cancels that order and the walk
    /// goes on. Returns the orders that changed state.
    pub fn update_tick(&mut self, tick: Tick) -> Result<Vec<Order>, EngineError> {
        self.tick = Some(tick);

        let mut touched = Vec::new();
        for id in self.registry.open_ids() {
            let Some(resting) = self.registry.get(id) else {
                continue;
            };
            let Some(limit) = resting.limit_price() else {
                continue;
            };
            if !tick.crosses(resting.direction, limit) {
                continue;
            }

            let mut order = resting.clone();
            let cancel_reason = match self.check_fill(&order, limit) {
                Ok(()) => match self.execute_fill(&mut order, limit, Liquidity::Maker) {
                    Ok(()) => None,
                    Err(err) => {
                        tracing::error!(order_id = %id, error = %err, "resting fill hit an invariant violation");
                        Some(CancelReason::InternalError)
                    }
                },
                Err(reason) => {
                    tracing::warn!(order_id = %id, %reason, "resting order cancelled");
                    Some(reason.cancel_reason())
                }
            };

            if let Some(reason) = cancel_reason {
                order.cancel(tick.timestamp);
                self.emit_event(EventPayload::OrderCanceled(OrderCanceledEvent {
                    order_id: id,
                    symbol: order.symbol.clone(),
                    reason,
                }));
            }

            self.registry.refile(order.clone());
            touched.push(order);
        }

        Ok(touched)
    }

    /// Pull the current quote from `source` and apply it.
    pub fn sync<S: QuoteSource + ?Sized>(&mut self, source: &S) -> Result<Vec<Order>, EngineError> {
        let tick = source.tick().ok_or(EngineError::NoQuote)?;
        self.update_tick(tick)
    }
}
