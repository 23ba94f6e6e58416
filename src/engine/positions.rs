//! Booking fills against the position ledger and the account.

use super::core::Engine;
use super::results::EngineError;
use crate::account::trade_fee;
use crate::events::{EventPayload, FillEvent, PositionUpdatedEvent};
use crate::order::{Liquidity, Order};
use crate::types::Price;

impl Engine {
    /// Fill the whole remainder of `order` at `price`.
    ///
    /// The ledger transition runs first and is the only fallible step, so an
    /// invariant violation leaves the account, order and stored position untouched.
    pub(super) fn execute_fill(
        &mut self,
        order: &mut Order,
        price: Price,
        liquidity: Liquidity,
    ) -> Result<(), EngineError> {
        let amount = order.remaining();
        let delta = order.direction.signed(amount);
        let now = self.time();

        // first fill on a symbol opens its record
        let (old_size, old_avg_price) = {
            let position = self.ledger.ensure(&order.symbol);
            (position.size, position.avg_price)
        };

        let update = self.ledger.apply(&order.symbol, delta, price, now)?;

        let rate = match liquidity {
            Liquidity::Maker => self.config.maker_fee_rate,
            Liquidity::Taker => self.config.taker_fee_rate,
        };
        let fee = trade_fee(amount, price, rate);

        self.account.charge_fee(fee);
        self.account.add_pnl(update.realized_pnl);
        order.fill(amount, price, now);

        tracing::info!(
            order_id = %order.id,
            symbol = %order.symbol,
            direction = ?order.direction,
            %amount,
            %price,
            ?liquidity,
            %fee,
            realized_pnl = %update.realized_pnl,
            size = %update.position.size,
            "order filled"
        );

        self.emit_event(EventPayload::Fill(FillEvent {
            order_id: order.id,
            symbol: order.symbol.clone(),
            direction: order.direction,
            amount,
            price,
            fee,
            liquidity,
        }));

        self.emit_event(EventPayload::PositionUpdated(PositionUpdatedEvent {
            symbol: order.symbol.clone(),
            old_size,
            new_size: update.position.size,
            old_avg_price,
            new_avg_price: update.position.avg_price,
            realized_pnl: update.realized_pnl,
        }));

        Ok(())
    }
}
