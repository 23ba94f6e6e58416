// inverse-sim: simulated exchange for inverse perpetual contracts.
// one account, one settlement currency, orders matched against a replayed best bid/ask.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: OrderId, Direction, Side, Price, Coin, Leverage, Timestamp
//   2.x  order.rs: orders, statuses, id allocation, order registry
//   3.x  tick.rs: top-of-book quotes, synthetic book, tick replay
//   4.x  position.rs: inverse pnl, add/close/flip transitions, position ledger
//   7.x  config.rs: contract size, limits, leverage, fees, presets
//   8.x  engine/: matching engine: orders, fills, quote updates, queries
//   10.x account.rs: balance, fees, account summary
//   11.x events.rs: state transition events for audit

pub mod account;
pub mod config;
pub mod engine;
pub mod events;
pub mod order;
pub mod position;
pub mod tick;
pub mod types;

// re exports for convenience
pub use account::*;
pub use config::{ConfigError, EngineConfig};
pub use engine::*;
pub use events::*;
pub use order::*;
pub use position::*;
pub use tick::*;
pub use types::*;
