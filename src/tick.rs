//! Market quote snapshots and the sources that supply them.
//!
//! The engine never talks to a market-data feed directly. Anything that can
//! hand over the latest best bid/ask implements [`QuoteSource`]; backtests
//! usually drive a [`TickReplay`] over recorded or generated ticks.

use crate::types::{Direction, Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-of-book snapshot. Read-only once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: Timestamp,
    pub bid: Price,
    pub ask: Price,
    pub bid_volume: Decimal,
    pub ask_volume: Decimal,
}

impl Tick {
    pub fn new(
        timestamp: Timestamp,
        bid: Price,
        ask: Price,
        bid_volume: Decimal,
        ask_volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            bid,
            ask,
            bid_volume,
            ask_volume,
        }
    }

    /// Price a taker pays (buy) or receives (sell).
    pub fn touch(&self, direction: Direction) -> Price {
        match direction {
            Direction::Buy => self.ask,
            Direction::Sell => self.bid,
        }
    }

    /// Whether a limit order at `limit` would execute against this quote.
    /// buy limit >= ask, sell limit <= bid.
    pub fn crosses(&self, direction: Direction, limit: Price) -> bool {
        match direction {
            Direction::Buy => limit >= self.ask,
            Direction::Sell => limit <= self.bid,
        }
    }

    pub fn spread(&self) -> Decimal {
        self.ask.value() - self.bid.value()
    }

    pub fn mid(&self) -> Price {
        Price::new_unchecked((self.bid.value() + self.ask.value()) / Decimal::TWO)
    }

    /// Synthetic book: one level per side, truncated to `depth`.
    pub fn book(&self, depth: usize) -> OrderBook {
        let asks = vec![BookLevel {
            price: self.ask,
            amount: self.ask_volume,
        }];
        let bids = vec![BookLevel {
            price: self.bid,
            amount: self.bid_volume,
        }];
        OrderBook {
            time: self.timestamp,
            asks: asks.into_iter().take(depth).collect(),
            bids: bids.into_iter().take(depth).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub time: Timestamp,
    pub asks: Vec<BookLevel>,
    pub bids: Vec<BookLevel>,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }
}

/// Supplier of the latest known quote. No staleness guarantee.
pub trait QuoteSource {
    fn tick(&self) -> Option<Tick>;
}

/// Replays a fixed tick sequence. `tick()` returns the tick under the cursor;
/// nothing is current until the first `advance()`.
#[derive(Debug, Clone, Default)]
pub struct TickReplay {
    ticks: Vec<Tick>,
    cursor: Option<usize>,
}

impl TickReplay {
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self {
            ticks,
            cursor: None,
        }
    }

    /// Move to the next tick. Returns it, or None once the replay is exhausted.
    pub fn advance(&mut self) -> Option<Tick> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.ticks.len() {
            return None;
        }
        self.cursor = Some(next);
        self.ticks.get(next).copied()
    }

    pub fn remaining(&self) -> usize {
        let consumed = self.cursor.map_or(0, |c| c + 1);
        self.ticks.len().saturating_sub(consumed)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl QuoteSource for TickReplay {
    fn tick(&self) -> Option<Tick> {
        self.cursor.and_then(|c| self.ticks.get(c).copied())
    }
}
