//! Cash balance and equity accounting.
//!
//! The account holds a single settlement-currency balance. Fees and realized
//! PnL are fungible once booked; unrealized PnL is only ever computed on demand.

use crate::position::{PnlError, Position};
use crate::tick::Tick;
use crate::types::{Coin, Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    balance: Coin,
    total_fees: Coin,
    total_realized_pnl: Coin,
}

impl Account {
    pub fn new(initial_balance: Coin) -> Self {
        Self {
            balance: initial_balance,
            total_fees: Coin::zero(),
            total_realized_pnl: Coin::zero(),
        }
    }

    pub fn balance(&self) -> Coin {
        self.balance
    }

    pub fn total_fees(&self) -> Coin {
        self.total_fees
    }

    pub fn total_realized_pnl(&self) -> Coin {
        self.total_realized_pnl
    }

    pub fn add_balance(&mut self, delta: Coin) {
        self.balance = self.balance.add(delta);
    }

    pub fn add_pnl(&mut self, pnl: Coin) {
        self.balance = self.balance.add(pnl);
        self.total_realized_pnl = self.total_realized_pnl.add(pnl);
    }

    // a negative fee is a maker rebate and credits the balance
    pub fn charge_fee(&mut self, fee: Coin) {
        self.add_balance(fee.negate());
        self.total_fees = self.total_fees.add(fee);
    }

    pub fn summary(
        &self,
        currency: &str,
        position: Option<&Position>,
        tick: Option<&Tick>,
    ) -> Result<AccountSummary, PnlError> {
        let pnl = match (position, tick) {
            (Some(position), Some(tick)) => unrealized_pnl(position, tick)?,
            _ => Coin::zero(),
        };

        Ok(AccountSummary {
            currency: currency.to_string(),
            balance: self.balance,
            pnl,
            equity: self.balance.add(pnl),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub currency: String,
    pub balance: Coin,
    // unrealized
    pub pnl: Coin,
    pub equity: Coin,
}

/// Prices a position at the ask when long and the bid when short.
pub fn unrealized_pnl(position: &Position, tick: &Tick) -> Result<Coin, PnlError> {
    let mark: Price = match position.side() {
        Some(Side::Long) => tick.ask,
        Some(Side::Short) => tick.bid,
        None => return Ok(Coin::zero()),
    };
    position.unrealized_pnl(mark)
}

/// Fee in coin for trading `amount` USD at `price`.
pub fn trade_fee(amount: Decimal, price: Price, rate: Decimal) -> Coin {
    Coin::new(amount / price.value() * rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SignedSize, Timestamp};
    use rust_decimal_macros::dec;

    fn tick(bid: Decimal, ask: Decimal) -> Tick {
        Tick::new(
            Timestamp::from_millis(0),
            Price::new_unchecked(bid),
            Price::new_unchecked(ask),
            dec!(100),
            dec!(100),
        )
    }

    fn position(size: Decimal, avg: Decimal) -> Position {
        Position {
            size: SignedSize::new(size),
            avg_price: avg,
            ..Position::new("BTC-PERPETUAL")
        }
    }

    #[test]
    fn fees_and_pnl_share_the_balance() {
        let mut account = Account::new(Coin::new(dec!(1)));

        account.charge_fee(Coin::new(dec!(0.01)));
        assert_eq!(account.balance().value(), dec!(0.99));

        account.add_pnl(Coin::new(dec!(0.5)));
        assert_eq!(account.balance().value(), dec!(1.49));

        account.add_pnl(Coin::new(dec!(-0.2)));
        assert_eq!(account.balance().value(), dec!(1.29));
        assert_eq!(account.total_fees().value(), dec!(0.01));
        assert_eq!(account.total_realized_pnl().value(), dec!(0.3));
    }

    #[test]
    fn maker_rebate_credits() {
        let mut account = Account::new(Coin::new(dec!(1)));
        account.charge_fee(Coin::new(dec!(-0.0025)));
        assert_eq!(account.balance().value(), dec!(1.0025));
        assert!(account.total_fees().is_negative());
    }

    #[test]
    fn taker_fee_formula() {
        // 10000 USD at 10000 is one coin; 7.5 bps of it
        let fee = trade_fee(dec!(10000), Price::new_unchecked(dec!(10000)), dec!(0.00075));
        assert_eq!(fee.value(), dec!(0.00075));
    }

    #[test]
    fn long_marks_at_ask_short_at_bid() {
        let t = tick(dec!(120), dec!(125));

        // long 1000 @ 100 marked at 125: 10 - 8
        let pnl = unrealized_pnl(&position(dec!(1000), dec!(100)), &t).unwrap();
        assert_eq!(pnl.value(), dec!(2));

        // short 1200 @ 100 marked at 120: 10 - 12
        let pnl = unrealized_pnl(&position(dec!(-1200), dec!(100)), &t).unwrap();
        assert_eq!(pnl.value(), dec!(-2));
    }

    #[test]
    fn summary_equity_is_balance_plus_pnl() {
        let account = Account::new(Coin::new(dec!(3)));
        let pos = position(dec!(1000), dec!(100));
        let t = tick(dec!(120), dec!(125));

        let summary = account.summary("BTC", Some(&pos), Some(&t)).unwrap();
        assert_eq!(summary.balance.value(), dec!(3));
        assert_eq!(summary.pnl.value(), dec!(2));
        assert_eq!(summary.equity.value(), dec!(5));

        let flat = account.summary("BTC", None, Some(&t)).unwrap();
        assert_eq!(flat.equity.value(), dec!(3));
    }
}
