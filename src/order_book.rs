use crate::core::types::{Price, Quantity, Timestamp};
use crate::messages::{BookSnapshot, MsgKind, Side, WireMessage};
use std::sync::atomic::{AtomicU64, Ordering};

pub const MAX_PRICE_LEVELS: usize = 256;
pub const MAX_ORDERS_PER_LEVEL: usize = 32;

/// Resting order inside a price level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Order {
    pub id: u64,
    pub qty: Quantity,
}

/// Fixed-capacity price level. Lives in a side array slot; never allocates
/// after construction.
#[derive(Debug, Clone, Copy)]
pub struct PriceLevel {
    pub price: Price,
    pub qty: Quantity,
    orders: [Order; MAX_ORDERS_PER_LEVEL],
    order_count: u32,
}

impl PriceLevel {
    #[inline(always)]
    pub const fn empty() -> Self {
        PriceLevel {
            price: Price::zero(),
            qty: Quantity::zero(),
            orders: [Order {
                id: 0,
                qty: Quantity::zero(),
            }; MAX_ORDERS_PER_LEVEL],
            order_count: 0,
        }
    }

    /// Reinitialize this slot for a freshly inserted level.
    #[inline(always)]
    fn reset_to(&mut self, price: Price) {
        self.price = price;
        self.qty = Quantity::zero();
        self.order_count = 0;
    }

    #[inline(always)]
    pub fn order_count(&self) -> usize {
        self.order_count as usize
    }

    #[inline(always)]
    pub fn orders(&self) -> &[Order] {
        &self.orders[..self.order_count as usize]
    }

    /// Returns false when the level is at order capacity; the order is then
    /// dropped without touching the aggregate.
    #[inline(always)]
    fn add_order(&mut self, id: u64, qty: Quantity) -> bool {
        if self.order_count as usize >= MAX_ORDERS_PER_LEVEL {
            return false;
        }

        self.orders[self.order_count as usize] = Order { id, qty };
        self.order_count += 1;
        self.qty = self.qty + qty;
        true
    }

    #[inline(always)]
    fn find_order(&self, id: u64) -> Option<usize> {
        self.orders[..self.order_count as usize]
            .iter()
            .position(|o| o.id == id)
    }

    #[inline(always)]
    fn remove_order_at(&mut self, idx: usize) {
        self.qty = self.qty - self.orders[idx].qty;

        for i in idx..self.order_count as usize - 1 {
            self.orders[i] = self.orders[i + 1];
        }
        self.order_count -= 1;
    }

    /// Decrement the order at `idx` by up to `trade_qty`, keeping the
    /// aggregate in lockstep. Removes the order when it reaches zero.
    #[inline(always)]
    fn execute_at(&mut self, idx: usize, trade_qty: Quantity) {
        let before = self.orders[idx].qty;
        let after = before.saturating_sub(trade_qty);

        self.orders[idx].qty = after;
        self.qty = self.qty - (before - after);

        if after.is_zero() {
            // Aggregate already settled; shift the dead order out directly.
            for i in idx..self.order_count as usize - 1 {
                self.orders[i] = self.orders[i + 1];
            }
            self.order_count -= 1;
        }
    }

    /// Incremental refresh: aggregate becomes authoritative, per-order
    /// detail at this level is discarded.
    #[inline(always)]
    fn set_aggregate(&mut self, qty: Quantity) {
        self.qty = qty;
        self.order_count = 0;
    }
}

/// One side's sorted level array. Bids descend in price, asks ascend;
/// prices within a side are unique.
struct Ladder {
    levels: Box<[PriceLevel]>,
    depth: usize,
    descending: bool,
}

impl Ladder {
    fn new(descending: bool) -> Self {
        Ladder {
            levels: vec![PriceLevel::empty(); MAX_PRICE_LEVELS].into_boxed_slice(),
            depth: 0,
            descending,
        }
    }

    #[inline(always)]
    fn beats(&self, new: Price, current: Price) -> bool {
        if self.descending {
            new > current
        } else {
            new < current
        }
    }

    /// Index of the level at `price`, if present.
    #[inline(always)]
    fn find(&self, price: Price) -> Option<usize> {
        self.levels[..self.depth].iter().position(|l| l.price == price)
    }

    /// Index of the level at `price`, creating it in sorted position if
    /// absent. `None` means the side is at capacity and the level was
    /// dropped.
    #[inline(always)]
    fn find_or_create(&mut self, price: Price) -> Option<usize> {
        let mut pos = 0;
        while pos < self.depth {
            if self.levels[pos].price == price {
                return Some(pos);
            }
            if self.beats(price, self.levels[pos].price) {
                break;
            }
            pos += 1;
        }

        if self.depth >= MAX_PRICE_LEVELS {
            return None;
        }

        for i in (pos..self.depth).rev() {
            self.levels[i + 1] = self.levels[i];
        }
        self.levels[pos].reset_to(price);
        self.depth += 1;

        Some(pos)
    }

    /// Remove the level at `idx`, shifting trailing levels down.
    #[inline(always)]
    fn remove_at(&mut self, idx: usize) {
        for i in idx..self.depth - 1 {
            self.levels[i] = self.levels[i + 1];
        }
        self.depth -= 1;
        self.levels[self.depth] = PriceLevel::empty();
    }

    #[inline(always)]
    fn best(&self) -> (Price, Quantity) {
        if self.depth > 0 {
            (self.levels[0].price, self.levels[0].qty)
        } else {
            (Price::zero(), Quantity::zero())
        }
    }

    #[inline(always)]
    fn levels(&self) -> &[PriceLevel] {
        &self.levels[..self.depth]
    }
}

/// Per-instrument Level-3 book. Fully preallocated; mutated by exactly one
/// worker. Snapshot reads from that same worker are naturally consistent,
/// and the update counter is atomic so foreign readers of statistics never
/// see torn values.
pub struct OrderBook {
    symbol_index: u32,
    bids: Ladder,
    asks: Ladder,
    best_bid: (Price, Quantity),
    best_ask: (Price, Quantity),
    update_count: AtomicU64,
    last_update: Timestamp,
    dropped_levels: u64,
    dropped_orders: u64,
}

impl OrderBook {
    pub fn new(symbol_index: u32) -> Self {
        OrderBook {
            symbol_index,
            bids: Ladder::new(true),
            asks: Ladder::new(false),
            best_bid: (Price::zero(), Quantity::zero()),
            best_ask: (Price::zero(), Quantity::zero()),
            update_count: AtomicU64::new(0),
            last_update: Timestamp::from_nanos(0),
            dropped_levels: 0,
            dropped_orders: 0,
        }
    }

    /// Apply one decoded message. Total over all inputs; malformed or
    /// unmatched operations degrade to no-ops. Returns true iff the touched
    /// side's `(price, qty)` top of book changed.
    pub fn apply(&mut self, msg: &WireMessage) -> bool {
        match msg.kind {
            MsgKind::NewOrder => self.apply_new_order(msg),
            MsgKind::Cancel => self.apply_cancel(msg),
            MsgKind::Execution => self.apply_execution(msg),
            MsgKind::IncrementalRefresh => self.apply_refresh(msg),
            MsgKind::Quote | MsgKind::FullSnapshot | MsgKind::Unknown => false,
        }
    }

    fn apply_new_order(&mut self, msg: &WireMessage) -> bool {
        if msg.price.raw() <= 0 || msg.quantity.raw() <= 0 {
            return false;
        }

        let ladder = match msg.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
            Side::Unknown => return false,
        };

        match ladder.find_or_create(msg.price) {
            Some(idx) => {
                if !ladder.levels[idx].add_order(msg.order_id, msg.quantity) {
                    self.dropped_orders += 1;
                }
            }
            None => self.dropped_levels += 1,
        }

        self.accept(msg);
        self.refresh_best(msg.side)
    }

    fn apply_cancel(&mut self, msg: &WireMessage) -> bool {
        let ladder = match msg.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
            Side::Unknown => return false,
        };

        if let Some(idx) = ladder.find(msg.price) {
            if let Some(order_idx) = ladder.levels[idx].find_order(msg.order_id) {
                ladder.levels[idx].remove_order_at(order_idx);
                if ladder.levels[idx].qty.is_zero() {
                    ladder.remove_at(idx);
                }
            }
        }

        self.accept(msg);
        self.refresh_best(msg.side)
    }

    fn apply_execution(&mut self, msg: &WireMessage) -> bool {
        let ladder = match msg.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
            Side::Unknown => return false,
        };

        if let Some(idx) = ladder.find(msg.price) {
            if let Some(order_idx) = ladder.levels[idx].find_order(msg.order_id) {
                ladder.levels[idx].execute_at(order_idx, msg.trade_quantity);
                if ladder.levels[idx].qty.is_zero() {
                    ladder.remove_at(idx);
                }
            }
        }

        self.accept(msg);
        self.refresh_best(msg.side)
    }

    fn apply_refresh(&mut self, msg: &WireMessage) -> bool {
        if msg.price.raw() <= 0 {
            return false;
        }

        let ladder = match msg.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
            Side::Unknown => return false,
        };

        let mut dropped = false;
        if msg.quantity.is_zero() {
            if let Some(idx) = ladder.find(msg.price) {
                ladder.remove_at(idx);
            }
        } else {
            match ladder.find_or_create(msg.price) {
                Some(idx) => ladder.levels[idx].set_aggregate(msg.quantity),
                None => dropped = true,
            }
        }
        if dropped {
            self.dropped_levels += 1;
        }

        self.accept(msg);
        self.refresh_best(msg.side)
    }

    #[inline(always)]
    fn accept(&mut self, msg: &WireMessage) {
        self.update_count.fetch_add(1, Ordering::Relaxed);
        self.last_update = msg.decode_ts;
    }

    #[inline(always)]
    fn refresh_best(&mut self, side: Side) -> bool {
        match side {
            Side::Buy => {
                let best = self.bids.best();
                let changed = best != self.best_bid;
                self.best_bid = best;
                changed
            }
            Side::Sell => {
                let best = self.asks.best();
                let changed = best != self.best_ask;
                self.best_ask = best;
                changed
            }
            Side::Unknown => false,
        }
    }

    /// Immutable top-of-book view. Never blocks, never allocates.
    #[inline]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            symbol_index: self.symbol_index,
            bid_price: self.best_bid.0,
            bid_qty: self.best_bid.1,
            ask_price: self.best_ask.0,
            ask_qty: self.best_ask.1,
            timestamp: self.last_update,
            update_count: self.update_count.load(Ordering::Relaxed),
        }
    }

    #[inline(always)]
    pub fn symbol_index(&self) -> u32 {
        self.symbol_index
    }

    #[inline(always)]
    pub fn best_bid(&self) -> (Price, Quantity) {
        self.best_bid
    }

    #[inline(always)]
    pub fn best_ask(&self) -> (Price, Quantity) {
        self.best_ask
    }

    #[inline(always)]
    pub fn bid_levels(&self) -> &[PriceLevel] {
        self.bids.levels()
    }

    #[inline(always)]
    pub fn ask_levels(&self) -> &[PriceLevel] {
        self.asks.levels()
    }

    #[inline(always)]
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Relaxed)
    }

    /// Inserts silently dropped at the 256-level side bound.
    #[inline(always)]
    pub fn dropped_levels(&self) -> u64 {
        self.dropped_levels
    }

    /// Orders silently dropped at the 32-per-level bound.
    #[inline(always)]
    pub fn dropped_orders(&self) -> u64 {
        self.dropped_orders
    }

    /// Panics if structural invariants are violated. Test and debugging aid;
    /// never called on the hot path.
    pub fn assert_invariants(&self) {
        for (ladder, name) in [(&self.bids, "bids"), (&self.asks, "asks")] {
            let levels = ladder.levels();
            assert!(levels.len() <= MAX_PRICE_LEVELS);

            for window in levels.windows(2) {
                if ladder.descending {
                    assert!(
                        window[0].price > window[1].price,
                        "{name} must be strictly descending"
                    );
                } else {
                    assert!(
                        window[0].price < window[1].price,
                        "{name} must be strictly ascending"
                    );
                }
            }

            for level in levels {
                assert!(level.qty.raw() > 0, "{name} level with empty aggregate");
                assert!(level.order_count() <= MAX_ORDERS_PER_LEVEL);
            }
        }

        assert_eq!(self.best_bid, self.bids.best());
        assert_eq!(self.best_ask, self.asks.best());
    }
}
