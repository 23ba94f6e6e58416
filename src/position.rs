// 4.0: position tracking for inverse contracts. size is USD, pnl settles in coin.
// 4.1 has the add/close transitions, 4.2 the ledger that applies them.

use crate::types::{Coin, Price, Side, SignedSize, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub size: SignedSize,
    // zero while flat
    pub avg_price: Decimal,
    pub opened_at: Option<Timestamp>,
    pub updated_at: Timestamp,
    pub realized_pnl: Coin,
}

impl Position {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            size: SignedSize::zero(),
            avg_price: Decimal::ZERO,
            opened_at: None,
            updated_at: Timestamp::default(),
            realized_pnl: Coin::zero(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_zero()
    }

    pub fn side(&self) -> Option<Side> {
        self.size.side()
    }

    // paper gains/losses if the whole position closed at `mark`
    pub fn unrealized_pnl(&self, mark: Price) -> Result<Coin, PnlError> {
        match self.side() {
            Some(side) => calc_pnl(side, self.size.abs(), self.avg_price, mark.value()),
            None => Ok(Coin::zero()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PnlError {
    #[error("non-positive price: entry {entry}, exit {exit}")]
    NonPositivePrice { entry: Decimal, exit: Decimal },

    #[error("negative quantity {0}")]
    NegativeQuantity(Decimal),
}

// 4.0.1: inverse pnl. a long of q USD bought at entry holds q/entry coins worth of exposure;
// closing at exit returns q/exit, so long pnl = q/entry - q/exit. short is the mirror.
pub fn calc_pnl(
    side: Side,
    quantity: Decimal,
    entry_price: Decimal,
    exit_price: Decimal,
) -> Result<Coin, PnlError> {
    if quantity < Decimal::ZERO {
        return Err(PnlError::NegativeQuantity(quantity));
    }
    if entry_price <= Decimal::ZERO || exit_price <= Decimal::ZERO {
        return Err(PnlError::NonPositivePrice {
            entry: entry_price,
            exit: exit_price,
        });
    }
    if quantity.is_zero() {
        return Ok(Coin::zero());
    }

    let entry_value = quantity / entry_price;
    let exit_value = quantity / exit_price;
    let pnl = match side {
        Side::Long => entry_value - exit_value,
        Side::Short => exit_value - entry_value,
    };
    Ok(Coin::new(pnl))
}

/// Programming errors in the caller's dispatch. Never a user rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("direction mismatch: position {position}, delta {delta}")]
    DirectionMismatch { position: SignedSize, delta: Decimal },

    #[error("no position to close for {0}")]
    NoPositionToClose(String),

    #[error("no position record for {0}")]
    MissingPosition(String),

    #[error("pnl: {0}")]
    Pnl(#[from] PnlError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub position: Position,
    pub realized_pnl: Coin,
}

// 4.1: same sign (or flat) adds, opposite sign closes.
pub fn update_position(
    position: &Position,
    delta: Decimal,
    price: Price,
    at: Timestamp,
) -> Result<PositionUpdate, InvariantViolation> {
    if position.size.opposes(delta) {
        close_position(position, delta, price, at)
    } else {
        let position = add_position(position, delta, price, at)?;
        Ok(PositionUpdate {
            position,
            realized_pnl: Coin::zero(),
        })
    }
}

// 4.1.1: cost-weighted entry. total_size / (size_1/price_1 + size_2/price_2)
pub fn add_position(
    position: &Position,
    delta: Decimal,
    price: Price,
    at: Timestamp,
) -> Result<Position, InvariantViolation> {
    if position.size.opposes(delta) {
        return Err(InvariantViolation::DirectionMismatch {
            position: position.size,
            delta,
        });
    }

    let old_abs = position.size.abs();
    let position_cost = if !position.is_empty() && position.avg_price > Decimal::ZERO {
        old_abs / position.avg_price
    } else {
        Decimal::ZERO
    };
    let new_cost = delta.abs() / price.value();
    let total_cost = position_cost + new_cost;

    let new_size = position.size.add(delta);
    let avg_price = if position.is_empty() {
        price.value()
    } else if total_cost.is_zero() {
        position.avg_price
    } else {
        (old_abs + delta.abs()) / total_cost
    };

    Ok(Position {
        symbol: position.symbol.clone(),
        size: new_size,
        avg_price,
        opened_at: position.opened_at.or(Some(at)),
        updated_at: at,
        realized_pnl: position.realized_pnl,
    })
}

// 4.1.2: close against the existing side. over-close flips, exact close resets,
// partial close keeps the entry price.
pub fn close_position(
    position: &Position,
    delta: Decimal,
    price: Price,
    at: Timestamp,
) -> Result<PositionUpdate, InvariantViolation> {
    let Some(side) = position.side() else {
        return Err(InvariantViolation::NoPositionToClose(position.symbol.clone()));
    };
    if !position.size.opposes(delta) {
        return Err(InvariantViolation::DirectionMismatch {
            position: position.size,
            delta,
        });
    }

    let old_abs = position.size.abs();
    let remaining = delta.abs() - old_abs;

    let (closed, avg_price, opened_at) = if remaining > Decimal::ZERO {
        (old_abs, price.value(), Some(at))
    } else if remaining.is_zero() {
        (old_abs, Decimal::ZERO, None)
    } else {
        (delta.abs(), position.avg_price, position.opened_at)
    };

    let realized = calc_pnl(side, closed, position.avg_price, price.value())?;

    Ok(PositionUpdate {
        position: Position {
            symbol: position.symbol.clone(),
            size: position.size.add(delta),
            avg_price,
            opened_at,
            updated_at: at,
            realized_pnl: position.realized_pnl.add(realized),
        },
        realized_pnl: realized,
    })
}

// 4.2: one position per symbol, created lazily, never removed.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: HashMap<String, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, symbol: &str) -> &Position {
        self.positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::new(symbol))
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }

    /// Applies `delta` at `price`. The stored position only changes if the
    /// transition succeeds.
    pub fn apply(
        &mut self,
        symbol: &str,
        delta: Decimal,
        price: Price,
        at: Timestamp,
    ) -> Result<PositionUpdate, InvariantViolation> {
        let current = self
            .positions
            .get_mut(symbol)
            .ok_or_else(|| InvariantViolation::MissingPosition(symbol.to_string()))?;

        let update = update_position(current, delta, price, at)?;
        *current = update.position.clone();
        Ok(update)
    }
}
