use feed_engine::core::types::{Price, Quantity, Timestamp};
use feed_engine::decoder::WireDecoder;
use feed_engine::messages::{MsgKind, Side, WireMessage};
use feed_engine::order_book::OrderBook;
use proptest::prelude::*;

proptest! {
    #[test]
    fn book_invariants_hold(msgs in prop::collection::vec(any_msg(), 1..2000)) {
        let mut book = OrderBook::new(0);

        for msg in msgs {
            book.apply(&msg);
        }

        book.assert_invariants();
    }

    #[test]
    fn book_snapshot_tracks_top(msgs in prop::collection::vec(any_msg(), 1..500)) {
        let mut book = OrderBook::new(0);

        for msg in msgs {
            book.apply(&msg);

            let snap = book.snapshot();
            prop_assert_eq!((snap.bid_price, snap.bid_qty), book.best_bid());
            prop_assert_eq!((snap.ask_price, snap.ask_qty), book.best_ask());
        }
    }

    #[test]
    fn decoder_is_total(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let decoder = WireDecoder::new();

        // Arbitrary input must decode or be rejected, never panic.
        let _ = decoder.try_decode(&bytes, Timestamp::from_nanos(1), 0);
    }
}

fn any_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn any_msg() -> impl Strategy<Value = WireMessage> {
    prop_oneof![
        (any_side(), 1i64..300, 1i64..1000, 1u64..200).prop_map(|(side, px, qty, id)| {
            WireMessage {
                kind: MsgKind::NewOrder,
                side,
                price: Price::new(px, 0),
                quantity: Quantity::from_raw(qty),
                order_id: id,
                ..WireMessage::default()
            }
        }),
        (any_side(), 1i64..300, 1u64..200).prop_map(|(side, px, id)| {
            WireMessage {
                kind: MsgKind::Cancel,
                side,
                price: Price::new(px, 0),
                order_id: id,
                ..WireMessage::default()
            }
        }),
        (any_side(), 1i64..300, 1u64..200, 1i64..1000).prop_map(|(side, px, id, traded)| {
            WireMessage {
                kind: MsgKind::Execution,
                side,
                price: Price::new(px, 0),
                order_id: id,
                trade_quantity: Quantity::from_raw(traded),
                ..WireMessage::default()
            }
        }),
        (any_side(), 1i64..300, 0i64..1000).prop_map(|(side, px, qty)| {
            WireMessage {
                kind: MsgKind::IncrementalRefresh,
                side,
                price: Price::new(px, 0),
                quantity: Quantity::from_raw(qty),
                ..WireMessage::default()
            }
        }),
    ]
}
