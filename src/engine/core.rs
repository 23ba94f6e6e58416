// 8.0 engine/core.rs: main engine. holds the account, positions, orders and current quote.

use super::results::EngineError;
use crate::account::{Account, AccountSummary};
use crate::config::{ConfigError, EngineConfig};
use crate::events::{Event, EventId, EventPayload};
use crate::order::{IdAllocator, Order, OrderRegistry, SequentialIds};
use crate::position::{Position, PositionLedger};
use crate::tick::{OrderBook, Tick};
use crate::types::{Coin, OrderId, Timestamp};

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) account: Account,
    pub(super) ledger: PositionLedger,
    pub(super) registry: OrderRegistry,
    pub(super) ids: Box<dyn IdAllocator + Send>,
    pub(super) tick: Option<Tick>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
}

impl Engine {
    /// Build an engine over a validated `config`.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_id_allocator(config, Box::new(SequentialIds::default()))
    }

    pub fn with_id_allocator(
        config: EngineConfig,
        ids: Box<dyn IdAllocator + Send>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let account = Account::new(Coin::new(config.initial_balance));
        Ok(Self {
            config,
            account,
            ledger: PositionLedger::new(),
            registry: OrderRegistry::new(),
            ids,
            tick: None,
            events: Vec::new(),
            next_event_id: 1,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn balance(&self) -> Coin {
        self.account.balance()
    }

    pub fn current_tick(&self) -> Option<&Tick> {
        self.tick.as_ref()
    }

    // the engine's clock is the last quote it saw
    pub fn time(&self) -> Timestamp {
        self.tick.map(|t| t.timestamp).unwrap_or_default()
    }

    pub(super) fn require_tick(&self) -> Result<Tick, EngineError> {
        self.tick.ok_or(EngineError::NoQuote)
    }

    pub fn get_order_book(&self, _symbol: &str, depth: usize) -> Result<OrderBook, EngineError> {
        Ok(self.require_tick()?.book(depth))
    }

    pub fn get_account_summary(&self, currency: &str) -> Result<AccountSummary, EngineError> {
        let symbol = self
            .config
            .symbol_for(currency)
            .ok_or_else(|| EngineError::UnknownCurrency(currency.to_string()))?;

        let position = self.ledger.get(symbol).filter(|p| !p.is_empty());
        if position.is_some() && self.tick.is_none() {
            return Err(EngineError::NoQuote);
        }

        Ok(self
            .account
            .summary(currency, position, self.tick.as_ref())?)
    }

    pub fn get_open_orders(&self, symbol: &str) -> Vec<Order> {
        self.registry.open_orders(symbol)
    }

    pub fn get_order(&self, symbol: &str, id: OrderId) -> Result<Order, EngineError> {
        self.registry
            .get(id)
            .filter(|order| order.symbol == symbol)
            .cloned()
            .ok_or(EngineError::OrderNotFound(id))
    }

    pub fn get_position(&self, symbol: &str) -> Result<Position, EngineError> {
        self.ledger
            .get(symbol)
            .cloned()
            .ok_or_else(|| EngineError::PositionNotFound(symbol.to_string()))
    }

    pub fn order_history(&self) -> impl Iterator<Item = &Order> {
        self.registry.history()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.time(), payload);
        self.next_event_id += 1;

        tracing::debug!(event_id = event.id.0, payload = ?event.payload, "event");

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
