//! Inverse perpetual exchange simulation.
//!
//! Replays a synthetic BTC-PERPETUAL quote path through the engine and walks
//! through market fills, resting limit orders, rejections and a small
//! round-trip strategy. Pass a JSON config path as the first argument to
//! override the default venue settings. Set RUST_LOG to change verbosity.

use inverse_sim::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::error::Error;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

const SYMBOL: &str = "BTC-PERPETUAL";

// 2020-03-12T00:00:00Z
const START_MS: i64 = 1_583_971_200_000;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(2);
        }
    };

    println!("Inverse Perpetual Exchange Simulation");
    println!("Single Symbol, Single Account, Top-of-Book Matching\n");

    let scenarios: [(&str, fn(&EngineConfig) -> Result<(), Box<dyn Error>>); 4] = [
        ("round trip", scenario_1_round_trip),
        ("resting limit", scenario_2_resting_limit),
        ("rejections", scenario_3_rejections),
        ("replay strategy", scenario_4_replay_strategy),
    ];

    for (name, scenario) in scenarios {
        if let Err(e) = scenario(&config) {
            eprintln!("scenario '{name}' failed: {e}");
            std::process::exit(1);
        }
    }

    println!("\nAll simulations completed successfully.");
}

fn load_config() -> Result<EngineConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(Path::new(&path)),
        None => {
            let config = EngineConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn quote(step: i64, bid: Decimal, ask: Decimal) -> Tick {
    Tick::new(
        Timestamp::from_millis(START_MS + step * 1_000),
        Price::new_unchecked(bid),
        Price::new_unchecked(ask),
        dec!(50_000),
        dec!(50_000),
    )
}

// deterministic zigzag around 8000 with a 0.5 spread
fn synthetic_path(len: i64) -> Vec<Tick> {
    (0..len)
        .map(|step| {
            let phase = step % 20;
            let offset = if phase < 10 { phase } else { 20 - phase };
            let bid = dec!(8000) + Decimal::from(offset * 25);
            quote(step, bid, bid + dec!(0.5))
        })
        .collect()
}

fn print_summary(engine: &Engine) -> Result<(), Box<dyn Error>> {
    let summary = engine.get_account_summary("BTC")?;
    let position = engine.get_position(SYMBOL)?;
    println!(
        "  Balance {} BTC, unrealized {} BTC, equity {} BTC",
        summary.balance, summary.pnl, summary.equity
    );
    println!(
        "  Position {} USD @ {}, fees paid {} BTC\n",
        position.size,
        position.avg_price,
        engine.account().total_fees()
    );
    Ok(())
}

/// Open with a market buy, let the quote move, close with a market sell.
fn scenario_1_round_trip(config: &EngineConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 1: Market Round Trip\n");

    let mut engine = Engine::new(config.clone())?;
    engine.update_tick(quote(0, dec!(7999.5), dec!(8000)))?;

    let buy = engine.place_market_order(SYMBOL, Direction::Buy, dec!(8000))?;
    println!(
        "  BUY {} USD filled @ {} ({:?})",
        buy.filled_amount, buy.avg_price, buy.status
    );

    engine.update_tick(quote(1, dec!(8400), dec!(8400.5)))?;
    println!("  Quote moves to 8400 / 8400.5");
    print_summary(&engine)?;

    let sell = engine.place_market_order(SYMBOL, Direction::Sell, dec!(8000))?;
    println!(
        "  SELL {} USD filled @ {}, realized {} BTC",
        sell.filled_amount,
        sell.avg_price,
        engine.account().total_realized_pnl()
    );
    print_summary(&engine)
}

/// A bid below the market rests until the quote trades down through it.
fn scenario_2_resting_limit(config: &EngineConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 2: Resting Limit Order\n");

    let mut engine = Engine::new(config.clone())?;
    engine.update_tick(quote(0, dec!(8100), dec!(8100.5)))?;

    let bid = engine.place_order(
        OrderRequest::limit(SYMBOL, Direction::Buy, dec!(8000), dec!(4000)).post_only(),
    )?;
    println!("  Post-only BUY 4000 @ 8000 -> {:?}", bid.status);
    println!("  Open orders: {}", engine.get_open_orders(SYMBOL).len());

    let book = engine.get_order_book(SYMBOL, 1)?;
    if let (Some(best_bid), Some(best_ask)) = (book.best_bid(), book.best_ask()) {
        println!("  Book: {best_bid} / {best_ask}");
    }

    let mut replay = TickReplay::new(vec![
        quote(1, dec!(8050), dec!(8050.5)),
        quote(2, dec!(8010), dec!(8010.5)),
        quote(3, dec!(7995), dec!(7995.5)),
    ]);

    while let Some(tick) = replay.advance() {
        let touched = engine.sync(&replay)?;
        for order in touched {
            println!(
                "  {} ask {}: order {} {:?} @ {}",
                tick.timestamp, tick.ask, order.id, order.status, order.avg_price
            );
        }
    }

    print_summary(&engine)
}

/// Orders the venue refuses are still recorded and can be looked up.
fn scenario_3_rejections(config: &EngineConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 3: Rejections\n");

    let mut engine = Engine::new(config.clone())?;
    engine.update_tick(quote(0, dec!(8000), dec!(8000.5)))?;

    let attempts = [
        ("odd size", OrderRequest::market(SYMBOL, Direction::Buy, dec!(15))),
        (
            "post-only crossing",
            OrderRequest::limit(SYMBOL, Direction::Buy, dec!(8001), dec!(100)).post_only(),
        ),
        (
            "reduce-only while flat",
            OrderRequest::market(SYMBOL, Direction::Sell, dec!(100)).reduce_only(),
        ),
        (
            "over the position limit",
            OrderRequest::market(SYMBOL, Direction::Buy, config.position_size_limit + config.contract_size),
        ),
    ];

    for (label, request) in attempts {
        match engine.place_order(request) {
            Ok(order) => println!("  {label}: accepted as {:?}", order.status),
            Err(e) => {
                let recorded = e
                    .rejected_order()
                    .map(|id| engine.get_order(SYMBOL, id))
                    .transpose()?;
                let status = recorded.map(|order| order.status);
                println!("  {label}: {e} (recorded as {status:?})");
            }
        }
    }
    println!();

    Ok(())
}

/// Flip between long and short every half cycle of the synthetic path.
fn scenario_4_replay_strategy(config: &EngineConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 4: Replay Strategy\n");

    let mut engine = Engine::new(config.clone())?;
    let mut replay = TickReplay::new(synthetic_path(100));
    let clip = dec!(2000);
    let mut trades = 0;

    while replay.advance().is_some() {
        engine.sync(&replay)?;
        let position = engine.get_position(SYMBOL).unwrap_or_else(|_| Position::new(SYMBOL));
        let step = replay.len() - replay.remaining() - 1;

        let target = match step % 20 {
            0 => Some(Direction::Buy),
            10 => Some(Direction::Sell),
            _ => None,
        };
        let Some(direction) = target else {
            continue;
        };

        if position.side() == Some(direction.side()) {
            continue;
        }
        // close whatever is open, then open the new clip
        let amount = position.size.abs() + clip;
        engine.place_market_order(SYMBOL, direction, amount)?;
        trades += 1;
    }

    println!("  Replayed {} ticks, {} trades", replay.len(), trades);
    println!("  Orders recorded: {}", engine.order_history().count());
    print_summary(&engine)
}
