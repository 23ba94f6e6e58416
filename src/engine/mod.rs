// 8.0: matching engine. validates orders against the current quote, books fills into
// the position ledger and the account, and re-checks resting limits on every tick.
// deterministic and event-driven with no external I/O.

mod core;
mod orders;
mod positions;
mod pricing;
mod results;

pub use core::Engine;
pub use results::{EngineError, RejectReason};
