//! Engine scenarios
//!
//! End-to-end checks of order handling, position accounting and fees through
//! the public engine API.

use inverse_sim::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const BTC: &str = "BTC-PERPETUAL";

fn tick(ms: i64, bid: Decimal, ask: Decimal) -> Tick {
    Tick::new(
        Timestamp::from_millis(ms),
        Price::new_unchecked(bid),
        Price::new_unchecked(ask),
        dec!(1_000_000),
        dec!(1_000_000),
    )
}

fn engine_at(config: EngineConfig, bid: Decimal, ask: Decimal) -> Engine {
    let mut engine = Engine::new(config).unwrap();
    engine.update_tick(tick(1_000, bid, ask)).unwrap();
    engine
}

fn reason(err: &EngineError) -> &RejectReason {
    match err {
        EngineError::Rejected { reason, .. } => reason,
        other => panic!("expected a rejection, got {other:?}"),
    }
}

mod market_orders {
    use super::*;

    #[test]
    fn exact_close_realizes_inverse_pnl() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(1)), dec!(100), dec!(100));

        let buy = engine.place_market_order(BTC, Direction::Buy, dec!(500)).unwrap();
        assert_eq!(buy.status, OrderStatus::Filled);
        assert_eq!(buy.avg_price, dec!(100));

        engine.update_tick(tick(2_000, dec!(125), dec!(125))).unwrap();
        engine.place_market_order(BTC, Direction::Sell, dec!(500)).unwrap();

        // 500/100 - 500/125
        let expected = calc_pnl(Side::Long, dec!(500), dec!(100), dec!(125)).unwrap();
        assert_eq!(expected.value(), dec!(1));
        assert_eq!(engine.balance().value(), dec!(2));

        let position = engine.get_position(BTC).unwrap();
        assert!(position.is_empty());
        assert_eq!(position.avg_price, Decimal::ZERO);
        assert_eq!(position.opened_at, None);
    }

    #[test]
    fn over_close_flips_at_fill_price() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(10)), dec!(100), dec!(100));
        engine.place_market_order(BTC, Direction::Buy, dec!(300)).unwrap();

        engine.update_tick(tick(2_000, dec!(75), dec!(75))).unwrap();
        engine.place_market_order(BTC, Direction::Sell, dec!(500)).unwrap();

        let position = engine.get_position(BTC).unwrap();
        assert_eq!(position.size.value(), dec!(-200));
        assert_eq!(position.avg_price, dec!(75));
        assert_eq!(position.opened_at, Some(Timestamp::from_millis(2_000)));

        // realized on the 300 closed: 3 - 4
        assert_eq!(engine.account().total_realized_pnl().value(), dec!(-1));
        assert_eq!(engine.balance().value(), dec!(9));
    }

    #[test]
    fn closes_at_non_terminating_prices() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(1)), dec!(100), dec!(100));
        engine.place_market_order(BTC, Direction::Buy, dec!(500)).unwrap();

        engine.update_tick(tick(2_000, dec!(110), dec!(110))).unwrap();
        engine.place_market_order(BTC, Direction::Sell, dec!(500)).unwrap();

        let pnl = calc_pnl(Side::Long, dec!(500), dec!(100), dec!(110)).unwrap();
        assert_eq!(engine.balance().value(), dec!(1) + pnl.value());
        assert!(engine.get_position(BTC).unwrap().is_empty());

        // reopen 300 long, then over-close with 500 at 90
        engine.place_market_order(BTC, Direction::Buy, dec!(300)).unwrap();
        let before = engine.balance();
        engine.update_tick(tick(3_000, dec!(90), dec!(90))).unwrap();
        engine.place_market_order(BTC, Direction::Sell, dec!(500)).unwrap();

        let position = engine.get_position(BTC).unwrap();
        assert_eq!(position.size.value(), dec!(-200));
        assert_eq!(position.avg_price, dec!(90));

        let pnl = calc_pnl(Side::Long, dec!(300), dec!(110), dec!(90)).unwrap();
        assert_eq!(engine.balance(), before.add(pnl));
    }

    #[test]
    fn partial_close_keeps_entry() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(1)), dec!(100), dec!(100));
        engine.place_market_order(BTC, Direction::Buy, dec!(1000)).unwrap();

        engine.update_tick(tick(2_000, dec!(125), dec!(125))).unwrap();
        engine.place_market_order(BTC, Direction::Sell, dec!(400)).unwrap();

        let position = engine.get_position(BTC).unwrap();
        assert_eq!(position.size.value(), dec!(600));
        assert_eq!(position.avg_price, dec!(100));
        assert_eq!(engine.balance().value(), dec!(1.8));
    }

    #[test]
    fn adding_averages_by_inverse_cost() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(1)), dec!(100), dec!(100));
        engine.place_market_order(BTC, Direction::Buy, dec!(1000)).unwrap();

        engine.update_tick(tick(2_000, dec!(400), dec!(400))).unwrap();
        engine.place_market_order(BTC, Direction::Buy, dec!(1000)).unwrap();

        let position = engine.get_position(BTC).unwrap();
        assert_eq!(position.size.value(), dec!(2000));
        assert_eq!(position.avg_price, dec!(160));
        assert_eq!(position.opened_at, Some(Timestamp::from_millis(1_000)));
        assert_eq!(engine.balance().value(), dec!(1));
    }

    #[test]
    fn taker_fee_charged_in_coin() {
        let mut engine = engine_at(EngineConfig::deribit(dec!(1)), dec!(9990), dec!(10000));
        let order = engine.place_market_order(BTC, Direction::Buy, dec!(1000)).unwrap();
        assert_eq!(order.avg_price, dec!(10000));

        // 1000 / 10000 * 0.00075
        assert_eq!(engine.account().total_fees().value(), dec!(0.000075));
        assert_eq!(engine.balance().value(), dec!(0.999925));
    }

    #[test]
    fn sell_fills_at_bid() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(1)), dec!(9990), dec!(10000));
        let order = engine.place_market_order(BTC, Direction::Sell, dec!(100)).unwrap();
        assert_eq!(order.avg_price, dec!(9990));
        assert_eq!(engine.get_position(BTC).unwrap().size.value(), dec!(-100));
    }

    #[test]
    fn position_limit_checks_both_sides() {
        let mut engine = engine_at(EngineConfig::deribit(dec!(10)), dec!(10000), dec!(10000));
        engine.place_market_order(BTC, Direction::Buy, dec!(90000)).unwrap();

        let err = engine
            .place_market_order(BTC, Direction::Buy, dec!(20000))
            .unwrap_err();
        assert_eq!(
            reason(&err),
            &RejectReason::MaxPositionExceeded {
                limit: dec!(100000),
                resulting: dec!(110000),
            }
        );

        // a sell of the same size is refused too: 90000 + 20000 is still over
        let err = engine
            .place_market_order(BTC, Direction::Sell, dec!(20000))
            .unwrap_err();
        assert!(matches!(reason(&err), RejectReason::MaxPositionExceeded { .. }));
        assert_eq!(engine.get_position(BTC).unwrap().size.value(), dec!(90000));

        engine.place_market_order(BTC, Direction::Sell, dec!(10000)).unwrap();
        assert_eq!(engine.get_position(BTC).unwrap().size.value(), dec!(80000));

        let err = engine
            .place_market_order(BTC, Direction::Sell, dec!(190000))
            .unwrap_err();
        assert!(matches!(reason(&err), RejectReason::MaxPositionExceeded { .. }));
        assert_eq!(engine.get_position(BTC).unwrap().size.value(), dec!(80000));
    }

    #[test]
    fn margin_cap_scales_with_price_and_balance() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(0.01)), dec!(100), dec!(100));

        let err = engine.place_market_order(BTC, Direction::Buy, dec!(110)).unwrap_err();
        assert_eq!(
            reason(&err),
            &RejectReason::MarginExceeded {
                amount: dec!(110),
                max_amount: dec!(100),
            }
        );

        engine.place_market_order(BTC, Direction::Buy, dec!(100)).unwrap();
        assert_eq!(engine.get_position(BTC).unwrap().size.value(), dec!(100));
    }

    #[test]
    fn invalid_sizes_rejected_and_recorded() {
        let mut engine = engine_at(EngineConfig::default(), dec!(100), dec!(100));

        for amount in [dec!(15), dec!(0), dec!(-10)] {
            let err = engine.place_market_order(BTC, Direction::Buy, amount).unwrap_err();
            assert!(err.is_rejection());
            assert!(matches!(reason(&err), RejectReason::InvalidSize { .. }));

            let id = err.rejected_order().unwrap();
            let recorded = engine.get_order(BTC, id).unwrap();
            assert_eq!(recorded.status, OrderStatus::Rejected);
            assert_eq!(recorded.filled_amount, Decimal::ZERO);
        }

        assert_eq!(
            engine.get_position(BTC),
            Err(EngineError::PositionNotFound(BTC.to_string()))
        );
        assert_eq!(engine.balance().value(), dec!(1));
    }

    #[test]
    fn rejected_order_leaves_symbol_untracked() {
        let mut engine = engine_at(EngineConfig::default(), dec!(100), dec!(100));
        let xrp = "XRP-PERPETUAL";

        engine.place_market_order(xrp, Direction::Buy, dec!(15)).unwrap_err();
        engine
            .place_order(OrderRequest::market(xrp, Direction::Sell, dec!(10)).reduce_only())
            .unwrap_err();
        engine.place_limit_order(xrp, Direction::Buy, dec!(50), dec!(10)).unwrap();

        assert_eq!(
            engine.get_position(xrp),
            Err(EngineError::PositionNotFound(xrp.to_string()))
        );

        engine.place_market_order(xrp, Direction::Buy, dec!(10)).unwrap();
        assert_eq!(engine.get_position(xrp).unwrap().size.value(), dec!(10));
    }

    #[test]
    fn no_quote_rejects_order() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let err = engine.place_market_order(BTC, Direction::Buy, dec!(10)).unwrap_err();
        assert_eq!(err, EngineError::NoQuote);

        let recorded: Vec<_> = engine.order_history().collect();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].status, OrderStatus::Rejected);
    }

    #[test]
    fn post_only_market_rejected() {
        let mut engine = engine_at(EngineConfig::default(), dec!(100), dec!(100));
        let err = engine
            .place_order(OrderRequest::market(BTC, Direction::Buy, dec!(10)).post_only())
            .unwrap_err();
        assert_eq!(reason(&err), &RejectReason::PostOnlyWouldTake);
    }

    #[test]
    fn reduce_only_never_grows_or_flips() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(1)), dec!(100), dec!(100));

        let flat = engine
            .place_order(OrderRequest::market(BTC, Direction::Sell, dec!(100)).reduce_only())
            .unwrap_err();
        assert_eq!(reason(&flat), &RejectReason::ReduceOnlyWouldIncrease);

        engine.place_market_order(BTC, Direction::Buy, dec!(100)).unwrap();

        let same_way = engine
            .place_order(OrderRequest::market(BTC, Direction::Buy, dec!(10)).reduce_only())
            .unwrap_err();
        assert_eq!(reason(&same_way), &RejectReason::ReduceOnlyWouldIncrease);

        let too_big = engine
            .place_order(OrderRequest::market(BTC, Direction::Sell, dec!(200)).reduce_only())
            .unwrap_err();
        assert_eq!(reason(&too_big), &RejectReason::ReduceOnlyWouldIncrease);

        engine
            .place_order(OrderRequest::market(BTC, Direction::Sell, dec!(100)).reduce_only())
            .unwrap();
        assert!(engine.get_position(BTC).unwrap().is_empty());
    }
}

mod limit_orders {
    use super::*;

    #[test]
    fn marketable_limit_takes_at_touch() {
        let mut engine = engine_at(EngineConfig::deribit(dec!(1)), dec!(9990), dec!(10000));
        let order = engine
            .place_limit_order(BTC, Direction::Buy, dec!(10010), dec!(1000))
            .unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.avg_price, dec!(10000));
        assert_eq!(engine.account().total_fees().value(), dec!(0.000075));
    }

    #[test]
    fn resting_limit_fills_as_maker_at_limit() {
        let mut engine = engine_at(EngineConfig::deribit(dec!(1)), dec!(10010), dec!(10020));
        let order = engine
            .place_limit_order(BTC, Direction::Buy, dec!(10000), dec!(1000))
            .unwrap();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(engine.get_open_orders(BTC), vec![order.clone()]);

        // not crossed yet
        let touched = engine.update_tick(tick(2_000, dec!(10001), dec!(10002))).unwrap();
        assert!(touched.is_empty());

        let touched = engine.update_tick(tick(3_000, dec!(9980), dec!(9990))).unwrap();
        assert_eq!(touched.len(), 1);
        assert_eq!(touched[0].id, order.id);
        assert_eq!(touched[0].status, OrderStatus::Filled);
        assert_eq!(touched[0].avg_price, dec!(10000));

        // 1000 / 10000 * -0.00025 rebate
        assert_eq!(engine.account().total_fees().value(), dec!(-0.000025));
        assert_eq!(engine.balance().value(), dec!(1.000025));
        assert!(engine.get_open_orders(BTC).is_empty());
        assert_eq!(engine.get_position(BTC).unwrap().avg_price, dec!(10000));
    }

    #[test]
    fn post_only_rests_or_rejects() {
        let mut engine = engine_at(EngineConfig::default(), dec!(100), dec!(101));

        let err = engine
            .place_order(OrderRequest::limit(BTC, Direction::Buy, dec!(101), dec!(10)).post_only())
            .unwrap_err();
        assert_eq!(reason(&err), &RejectReason::PostOnlyWouldTake);

        let resting = engine
            .place_order(OrderRequest::limit(BTC, Direction::Buy, dec!(100), dec!(10)).post_only())
            .unwrap();
        assert_eq!(resting.status, OrderStatus::New);
    }

    #[test]
    fn invalid_limit_price_rejected() {
        let mut engine = engine_at(EngineConfig::default(), dec!(100), dec!(101));
        let err = engine
            .place_limit_order(BTC, Direction::Sell, dec!(0), dec!(10))
            .unwrap_err();
        assert_eq!(reason(&err), &RejectReason::InvalidPrice(dec!(0)));
    }

    #[test]
    fn resting_orders_fill_fifo_and_cancel_on_limit() {
        let mut engine = engine_at(EngineConfig::deribit(dec!(10)), dec!(10100), dec!(10110));

        let first = engine
            .place_limit_order(BTC, Direction::Buy, dec!(10000), dec!(60000))
            .unwrap();
        let second = engine
            .place_limit_order(BTC, Direction::Buy, dec!(10000), dec!(60000))
            .unwrap();

        let touched = engine.update_tick(tick(2_000, dec!(9990), dec!(10000))).unwrap();
        assert_eq!(touched.len(), 2);
        assert_eq!(touched[0].id, first.id);
        assert_eq!(touched[0].status, OrderStatus::Filled);
        assert_eq!(touched[1].id, second.id);
        assert_eq!(touched[1].status, OrderStatus::Cancelled);

        assert_eq!(engine.get_position(BTC).unwrap().size.value(), dec!(60000));

        let canceled = engine.events().iter().any(|event| {
            matches!(
                &event.payload,
                EventPayload::OrderCanceled(e)
                    if e.order_id == second.id && e.reason == CancelReason::PositionLimit
            )
        });
        assert!(canceled);
    }

    #[test]
    fn stale_reduce_only_cancelled() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(1)), dec!(10000), dec!(10000));
        engine.place_market_order(BTC, Direction::Buy, dec!(100)).unwrap();

        let take_profit = engine
            .place_order(
                OrderRequest::limit(BTC, Direction::Sell, dec!(10100), dec!(100)).reduce_only(),
            )
            .unwrap();
        assert_eq!(take_profit.status, OrderStatus::New);

        engine.place_market_order(BTC, Direction::Sell, dec!(100)).unwrap();

        let touched = engine.update_tick(tick(2_000, dec!(10100), dec!(10110))).unwrap();
        assert_eq!(touched.len(), 1);
        assert_eq!(touched[0].status, OrderStatus::Cancelled);
        assert!(engine.get_position(BTC).unwrap().is_empty());
    }

    #[test]
    fn cancel_order_lifecycle() {
        let mut engine = engine_at(EngineConfig::default(), dec!(100), dec!(101));
        let order = engine
            .place_limit_order(BTC, Direction::Sell, dec!(120), dec!(10))
            .unwrap();

        assert_eq!(
            engine.cancel_order("ETH-PERPETUAL", order.id),
            Err(EngineError::OrderNotFound(order.id))
        );
        assert_eq!(
            engine.cancel_order(BTC, OrderId(999)),
            Err(EngineError::OrderNotFound(OrderId(999)))
        );

        let cancelled = engine.cancel_order(BTC, order.id).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(engine.get_open_orders(BTC).is_empty());
        assert_eq!(
            engine.cancel_order(BTC, order.id),
            Err(EngineError::OrderNotOpen(order.id))
        );

        // a cancelled order never fills
        let touched = engine.update_tick(tick(2_000, dec!(130), dec!(131))).unwrap();
        assert!(touched.is_empty());
    }

    #[test]
    fn cancel_all_orders_clears_book() {
        let mut engine = engine_at(EngineConfig::default(), dec!(100), dec!(101));
        engine.place_limit_order(BTC, Direction::Buy, dec!(90), dec!(10)).unwrap();
        engine.place_limit_order(BTC, Direction::Sell, dec!(110), dec!(10)).unwrap();

        let cancelled = engine.cancel_all_orders(BTC);
        assert_eq!(cancelled.len(), 2);
        assert!(engine.get_open_orders(BTC).is_empty());
    }
}

mod queries {
    use super::*;

    #[test]
    fn lookups_that_miss() {
        let engine = engine_at(EngineConfig::default(), dec!(100), dec!(101));
        assert_eq!(
            engine.get_order(BTC, OrderId(1)),
            Err(EngineError::OrderNotFound(OrderId(1)))
        );
        assert_eq!(
            engine.get_position("XRP-PERPETUAL"),
            Err(EngineError::PositionNotFound("XRP-PERPETUAL".to_string()))
        );
        assert_eq!(
            engine.get_account_summary("DOGE"),
            Err(EngineError::UnknownCurrency("DOGE".to_string()))
        );
    }

    #[test]
    fn summary_marks_long_at_ask_and_short_at_bid() {
        let mut engine = engine_at(EngineConfig::zero_fee(dec!(1)), dec!(100), dec!(100));

        let summary = engine.get_account_summary("BTC").unwrap();
        assert_eq!(summary.pnl, Coin::zero());
        assert_eq!(summary.equity.value(), dec!(1));

        engine.place_market_order(BTC, Direction::Buy, dec!(1000)).unwrap();
        engine.update_tick(tick(2_000, dec!(80), dec!(125))).unwrap();

        // 1000/100 - 1000/125
        let summary = engine.get_account_summary("BTC").unwrap();
        assert_eq!(summary.currency, "BTC");
        assert_eq!(summary.pnl.value(), dec!(2));
        assert_eq!(summary.equity.value(), dec!(3));

        // flip to a short 1000 @80: bid 80 marks it flat
        engine.place_market_order(BTC, Direction::Sell, dec!(2000)).unwrap();
        let summary = engine.get_account_summary("BTC").unwrap();
        assert_eq!(summary.pnl, Coin::zero());
    }

    #[test]
    fn summary_without_quote() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let summary = engine.get_account_summary("ETH").unwrap();
        assert_eq!(summary.balance.value(), dec!(1));
        assert_eq!(summary.pnl, Coin::zero());
    }

    #[test]
    fn order_book_depth() {
        let engine = engine_at(EngineConfig::default(), dec!(100), dec!(101));

        let book = engine.get_order_book(BTC, 5).unwrap();
        assert_eq!(book.best_bid(), Some(Price::new_unchecked(dec!(100))));
        assert_eq!(book.best_ask(), Some(Price::new_unchecked(dec!(101))));
        assert_eq!(book.time, Timestamp::from_millis(1_000));
        assert_eq!(book.bids.len(), 1);

        let empty = engine.get_order_book(BTC, 0).unwrap();
        assert!(empty.bids.is_empty() && empty.asks.is_empty());

        let fresh = Engine::new(EngineConfig::default()).unwrap();
        assert_eq!(fresh.get_order_book(BTC, 1), Err(EngineError::NoQuote));
    }

    #[test]
    fn events_follow_fill_sequence() {
        let mut engine = engine_at(EngineConfig::default(), dec!(100), dec!(100));
        engine.place_market_order(BTC, Direction::Buy, dec!(100)).unwrap();

        let kinds: Vec<&str> = engine
            .events()
            .iter()
            .map(|event| match event.payload {
                EventPayload::OrderPlaced(_) => "placed",
                EventPayload::OrderRejected(_) => "rejected",
                EventPayload::OrderCanceled(_) => "canceled",
                EventPayload::Fill(_) => "fill",
                EventPayload::PositionUpdated(_) => "position",
            })
            .collect();
        assert_eq!(kinds, vec!["placed", "fill", "position"]);
        assert_eq!(engine.recent_events(1).len(), 1);
    }

    #[test]
    fn event_log_is_bounded() {
        let mut config = EngineConfig::default();
        config.max_events = 2;
        let mut engine = engine_at(config, dec!(100), dec!(100));

        engine.place_market_order(BTC, Direction::Buy, dec!(100)).unwrap();
        engine.place_market_order(BTC, Direction::Buy, dec!(100)).unwrap();

        assert_eq!(engine.events().len(), 2);
        assert!(matches!(engine.events()[1].payload, EventPayload::PositionUpdated(_)));
    }

    #[test]
    fn invalid_config_refused_at_construction() {
        let mut config = EngineConfig::default();
        config.contract_size = Decimal::ZERO;
        assert!(matches!(
            Engine::new(config),
            Err(ConfigError::InvalidContract { .. })
        ));

        let mut config = EngineConfig::default();
        config.max_events = 0;
        assert!(matches!(
            Engine::with_id_allocator(config, Box::new(SequentialIds::default())),
            Err(ConfigError::InvalidEvents)
        ));
    }

    #[test]
    fn custom_id_allocator() {
        let mut engine = Engine::with_id_allocator(
            EngineConfig::default(),
            Box::new(SequentialIds::starting_at(100)),
        )
        .unwrap();
        engine.update_tick(tick(0, dec!(100), dec!(100))).unwrap();

        let first = engine.place_market_order(BTC, Direction::Buy, dec!(10)).unwrap();
        let second = engine.place_limit_order(BTC, Direction::Buy, dec!(50), dec!(10)).unwrap();
        assert_eq!(first.id, OrderId(100));
        assert_eq!(second.id, OrderId(101));
    }

    #[test]
    fn sync_reads_replay_cursor() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let mut replay = TickReplay::new(vec![tick(0, dec!(100), dec!(101))]);

        assert_eq!(engine.sync(&replay), Err(EngineError::NoQuote));

        replay.advance();
        engine.sync(&replay).unwrap();
        assert_eq!(engine.time(), Timestamp::from_millis(0));
        assert_eq!(engine.current_tick().map(|t| t.bid), Some(Price::new_unchecked(dec!(100))));
    }
}
