// 7.0 config.rs: all engine settings in one place. contract size, limits, leverage, fees.
// 7.1 presets mirror the venue defaults; validate() catches inconsistent overrides.

use crate::types::Leverage;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // Starting cash in settlement currency
    pub initial_balance: Decimal,
    // Order amounts must be a multiple of this (USD)
    pub contract_size: Decimal,
    // Max absolute position size (USD)
    pub position_size_limit: Decimal,
    // Cap on order notional against balance: amount <= balance * leverage * price
    pub max_leverage: Leverage,
    // Negative = rebate
    pub maker_fee_rate: Decimal,
    pub taker_fee_rate: Decimal,
    // Maximum number of events to retain in memory
    pub max_events: usize,
    // Currency -> default symbol for account summaries
    pub currency_symbols: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut currency_symbols = HashMap::new();
        currency_symbols.insert("BTC".to_string(), "BTC-PERPETUAL".to_string());
        currency_symbols.insert("ETH".to_string(), "ETH-PERPETUAL".to_string());

        Self {
            initial_balance: dec!(1),
            contract_size: dec!(10),
            position_size_limit: dec!(100_000),
            max_leverage: Leverage::new_unchecked(dec!(100)),
            maker_fee_rate: dec!(-0.00025), // -2.5 bps
            taker_fee_rate: dec!(0.00075),  // 7.5 bps
            max_events: 100_000,
            currency_symbols,
        }
    }
}

impl EngineConfig {
    // venue fee schedule with the given starting cash
    pub fn deribit(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            ..Self::default()
        }
    }

    // frictionless runs, handy for isolating strategy pnl
    pub fn zero_fee(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            maker_fee_rate: Decimal::ZERO,
            taker_fee_rate: Decimal::ZERO,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw)
    }

    pub fn symbol_for(&self, currency: &str) -> Option<&str> {
        self.currency_symbols.get(currency).map(String::as_str)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract_size <= Decimal::ZERO {
            return Err(ConfigError::InvalidContract {
                reason: "contract size must be positive".to_string(),
            });
        }

        if self.position_size_limit <= Decimal::ZERO
            || !(self.position_size_limit % self.contract_size).is_zero()
        {
            return Err(ConfigError::InvalidContract {
                reason: "position limit must be a positive multiple of contract size".to_string(),
            });
        }

        // deserialization bypasses Leverage::new
        if self.max_leverage.value() < Decimal::ONE {
            return Err(ConfigError::InvalidMargin {
                reason: "leverage must be at least 1x".to_string(),
            });
        }

        if self.initial_balance < Decimal::ZERO {
            return Err(ConfigError::InvalidMargin {
                reason: "initial balance cannot be negative".to_string(),
            });
        }

        if self.taker_fee_rate < Decimal::ZERO || self.taker_fee_rate >= dec!(0.01) {
            return Err(ConfigError::InvalidFees {
                reason: "taker fee must be in [0, 1%)".to_string(),
            });
        }

        if self.maker_fee_rate <= dec!(-0.01) || self.maker_fee_rate >= dec!(0.01) {
            return Err(ConfigError::InvalidFees {
                reason: "maker fee must be in (-1%, 1%)".to_string(),
            });
        }

        if self.max_events == 0 {
            return Err(ConfigError::InvalidEvents);
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid contract: {reason}")]
    InvalidContract { reason: String },

    #[error("invalid margin: {reason}")]
    InvalidMargin { reason: String },

    #[error("invalid fees: {reason}")]
    InvalidFees { reason: String },

    #[error("max_events must be positive")]
    InvalidEvents,

    #[error("cannot parse config: {0}")]
    Parse(String),

    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
}
