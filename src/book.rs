// src/book.rs
//
// Single-instrument, single-writer limit order book. Both sides are rings
// of pooled price levels indexed by a direct-mapped price table; resting
// orders live in per-level chunk queues and are addressable in O(1)
// through the per-client order table. The match buffer is book-owned and
// reused across calls; results borrow it until the caller lets go.

use crate::error::{Error, Result};
use crate::level::PriceLevel;
use crate::pool::{Pool, PoolRef, NULL_REF};
use crate::queue::{BasicOrder, Chunk, OrderHandle};
use crate::types::{
    ClientId, InstrumentId, MatchResult, MatchResultSet, OrderId, Price, Quantity, Side,
    INVALID_PRICE,
};

/// Construction-time capacities. Defaults follow the reference sizing;
/// tests and small deployments shrink them.
#[derive(Debug, Clone, Copy)]
pub struct BookConfig {
    /// Size of the direct-mapped price table; prices index it modulo this.
    pub max_price_levels: u32,
    /// First dimension of the client order table.
    pub max_clients: u32,
    /// Per-client order-id space (second dimension).
    pub max_orders_per_client: u32,
    /// Match-buffer size and per-call event cap.
    pub max_match_events: usize,
    /// Total queue chunks shared by all levels of this book.
    pub chunk_pool_capacity: u32,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            max_price_levels: 256,
            max_clients: 10,
            max_orders_per_client: 1_000_000,
            max_match_events: 100,
            chunk_pool_capacity: 4096,
        }
    }
}

/// Per-client lookup record: where a resting order lives and what it was
/// submitted as. Lets cancel find queue, handle and level in O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderInfo {
    pub handle: OrderHandle,
    pub market_order_id: OrderId,
    pub price: Price,
}

impl OrderInfo {
    const VACANT: OrderInfo = OrderInfo {
        handle: OrderHandle::NULL,
        market_order_id: 0,
        price: INVALID_PRICE,
    };

    #[inline]
    fn is_live(&self) -> bool {
        !self.handle.is_null()
    }
}

pub struct OrderBook {
    instrument: InstrumentId,
    best_bid: PoolRef,
    best_ask: PoolRef,
    price_table: Vec<PoolRef>,
    client_orders: Vec<Vec<OrderInfo>>,
    match_buf: Vec<MatchResult>,
    levels: Pool<PriceLevel>,
    chunks: Pool<Chunk>,
    config: BookConfig,
}

impl OrderBook {
    pub fn new(instrument: InstrumentId) -> Self {
        Self::with_config(instrument, BookConfig::default())
    }

    pub fn with_config(instrument: InstrumentId, config: BookConfig) -> Self {
        assert!(config.max_price_levels > 0, "price table must have slots");
        assert!(config.max_match_events > 0, "match buffer must have room");
        Self {
            instrument,
            best_bid: NULL_REF,
            best_ask: NULL_REF,
            price_table: vec![NULL_REF; config.max_price_levels as usize],
            client_orders: vec![
                vec![OrderInfo::VACANT; config.max_orders_per_client as usize];
                config.max_clients as usize
            ],
            match_buf: Vec::with_capacity(config.max_match_events),
            levels: Pool::new(config.max_price_levels),
            chunks: Pool::new(config.chunk_pool_capacity),
            config,
        }
    }

    #[inline]
    pub fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    #[inline]
    fn price_index(&self, price: Price) -> usize {
        price.rem_euclid(self.config.max_price_levels as i64) as usize
    }

    /// Level ref for `price`, verifying the resident slot really holds that
    /// price (the table is direct-mapped, so a slot can be claimed by a
    /// colliding price).
    fn level_ref_at(&self, price: Price) -> Option<PoolRef> {
        let level_ref = self.price_table[self.price_index(price)];
        if level_ref == NULL_REF {
            return None;
        }
        (self.levels.get(level_ref).price == price).then_some(level_ref)
    }

    /// Rest a new order at `price`. The level is created and spliced into
    /// its side ring on first use.
    pub fn add_order(
        &mut self,
        client_id: ClientId,
        client_order_id: OrderId,
        market_order_id: OrderId,
        side: Side,
        price: Price,
        qty: Quantity,
    ) -> Result<()> {
        if qty == 0 {
            return Err(Error::ZeroQuantity);
        }
        if side == Side::Invalid {
            return Err(Error::InvalidSide);
        }
        if client_id >= self.config.max_clients {
            return Err(Error::ClientOutOfRange(client_id));
        }
        if client_order_id >= self.config.max_orders_per_client as u64 {
            return Err(Error::OrderIdOutOfRange(client_order_id));
        }
        if self.client_orders[client_id as usize][client_order_id as usize].is_live() {
            return Err(Error::DuplicateOrder(client_id, client_order_id));
        }

        let slot = self.price_index(price);
        let resident = self.price_table[slot];
        let (level_ref, created) = if resident != NULL_REF {
            let level = self.levels.get(resident);
            if level.price != price {
                return Err(Error::PriceCollision {
                    requested: price,
                    resident: level.price,
                });
            }
            // Books are fed un-crossed input; a resting add on the wrong
            // side of a live level is a caller bug.
            debug_assert_eq!(level.side, side, "resting add joins an opposite-side level");
            (resident, false)
        } else {
            (self.add_price_level(side, price)?, true)
        };

        let order = BasicOrder {
            order_id: client_order_id,
            qty,
            client_id,
        };
        let pushed = self
            .levels
            .get_mut(level_ref)
            .add_order(&mut self.chunks, order);
        let handle = match pushed {
            Ok(handle) => handle,
            Err(e) => {
                if created {
                    self.remove_price_level(level_ref);
                }
                return Err(e);
            }
        };
        self.client_orders[client_id as usize][client_order_id as usize] = OrderInfo {
            handle,
            market_order_id,
            price,
        };
        Ok(())
    }

    /// Cancel a resting order. Idempotent: unknown, out-of-range or
    /// already-gone ids are no-ops so a cancel racing a fill is harmless.
    pub fn remove_order(&mut self, client_id: ClientId, client_order_id: OrderId) {
        if client_id >= self.config.max_clients
            || client_order_id >= self.config.max_orders_per_client as u64
        {
            return;
        }
        let info = self.client_orders[client_id as usize][client_order_id as usize];
        if !info.is_live() {
            return;
        }
        let Some(level_ref) = self.level_ref_at(info.price) else {
            debug_assert!(false, "live order info without a level at its price");
            return;
        };
        self.levels
            .get_mut(level_ref)
            .cancel_order(&mut self.chunks, info.handle);
        self.client_orders[client_id as usize][client_order_id as usize] = OrderInfo::VACANT;
        if self.levels.get(level_ref).is_empty() {
            self.remove_price_level(level_ref);
        }
    }

    /// Drain resting orders on the opposite side that cross `price` until
    /// `qty` is exhausted, nothing crosses, or the event cap is hit.
    /// Infallible; `overflow` asks the caller to re-invoke with the
    /// remainder. No resting order is generated for leftover quantity.
    pub fn match_order(
        &mut self,
        client_id: ClientId,
        order_id: OrderId,
        side: Side,
        price: Price,
        qty: Quantity,
    ) -> MatchResultSet<'_> {
        self.match_buf.clear();
        let mut remaining = qty;

        if side != Side::Invalid {
            while remaining > 0 && self.match_buf.len() < self.config.max_match_events {
                let best_ref = match side {
                    Side::Buy => self.best_ask,
                    _ => self.best_bid,
                };
                if best_ref == NULL_REF {
                    break;
                }
                let (level_price, level_side) = {
                    let level = self.levels.get(best_ref);
                    if !level.is_matchable(price) {
                        break;
                    }
                    (level.price, level.side)
                };

                let (matched_id, matched_client, fill, qty_after) = {
                    let level = self.levels.get_mut(best_ref);
                    let Some(resting) = level.front_order_mut(&mut self.chunks) else {
                        debug_assert!(false, "non-empty level without a front order");
                        break;
                    };
                    let fill = remaining.min(resting.qty);
                    resting.qty -= fill;
                    (resting.order_id, resting.client_id, fill, resting.qty)
                };
                remaining -= fill;
                self.match_buf.push(MatchResult {
                    incoming_order_id: order_id,
                    matched_order_id: matched_id,
                    price: level_price,
                    quantity: fill,
                    matched_remaining_qty: qty_after,
                    incoming_client_id: client_id,
                    matched_client_id: matched_client,
                    incoming_side: side,
                    matched_side: level_side,
                });

                if qty_after == 0 {
                    // Fully filled: drop it from both lookup paths before
                    // the next iteration reads the (possibly new) best.
                    self.client_orders[matched_client as usize][matched_id as usize] =
                        OrderInfo::VACANT;
                    let level = self.levels.get_mut(best_ref);
                    level.pop_front(&mut self.chunks);
                    if level.is_empty() {
                        self.remove_price_level(best_ref);
                    }
                }
            }
        }

        let overflow = self.match_buf.len() == self.config.max_match_events && {
            let best_ref = match side {
                Side::Buy => self.best_ask,
                _ => self.best_bid,
            };
            best_ref != NULL_REF && self.levels.get(best_ref).is_matchable(price)
        };
        MatchResultSet {
            matches: &self.match_buf,
            remaining_quantity: remaining,
            instrument: self.instrument,
            overflow,
        }
    }

    /// Lookup record for a live resting order.
    pub fn get_order(&self, client_id: ClientId, client_order_id: OrderId) -> Option<&OrderInfo> {
        if client_id >= self.config.max_clients
            || client_order_id >= self.config.max_orders_per_client as u64
        {
            return None;
        }
        let info = &self.client_orders[client_id as usize][client_order_id as usize];
        info.is_live().then_some(info)
    }

    pub fn get_price_level(&self, price: Price) -> Option<&PriceLevel> {
        self.level_ref_at(price).map(|r| self.levels.get(r))
    }

    /// Earliest resting order at `price` (read-only).
    pub fn front_order(&self, price: Price) -> Option<&BasicOrder> {
        let level_ref = self.level_ref_at(price)?;
        self.levels.get(level_ref).queue.peek_front(&self.chunks)
    }

    /// Latest resting order at `price` (read-only).
    pub fn last_order(&self, price: Price) -> Option<&BasicOrder> {
        let level_ref = self.level_ref_at(price)?;
        self.levels.get(level_ref).queue.peek_last(&self.chunks)
    }

    /// Best bid / best ask prices.
    pub fn bbo(&self) -> (Option<Price>, Option<Price>) {
        let bid = (self.best_bid != NULL_REF).then(|| self.levels.get(self.best_bid).price);
        let ask = (self.best_ask != NULL_REF).then(|| self.levels.get(self.best_ask).price);
        (bid, ask)
    }

    /// Prices of one side walked best-outward around the ring. Allocates;
    /// inspection and test use only.
    pub fn price_ladder(&self, side: Side) -> Vec<Price> {
        let best = match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
            Side::Invalid => NULL_REF,
        };
        let mut ladder = Vec::new();
        if best == NULL_REF {
            return ladder;
        }
        let mut current = best;
        loop {
            let level = self.levels.get(current);
            ladder.push(level.price);
            current = level.next;
            if current == best {
                break;
            }
        }
        ladder
    }

    /// Create a level and splice it into its side ring by aggressiveness:
    /// before best when it beats best, otherwise walking outward until a
    /// worse level is found, else appended at the ring's end.
    fn add_price_level(&mut self, side: Side, price: Price) -> Result<PoolRef> {
        let new_ref = self
            .levels
            .alloc(PriceLevel::new(side, price))
            .ok_or(Error::PoolExhausted { pool: "price level" })?;
        {
            let level = self.levels.get_mut(new_ref);
            level.prev = new_ref;
            level.next = new_ref;
        }

        let best = match side {
            Side::Buy => self.best_bid,
            _ => self.best_ask,
        };
        if best == NULL_REF {
            match side {
                Side::Buy => self.best_bid = new_ref,
                _ => self.best_ask = new_ref,
            }
        } else if self.levels.get(new_ref).is_better_than(self.levels.get(best)) {
            self.splice_before(best, new_ref);
            match side {
                Side::Buy => self.best_bid = new_ref,
                _ => self.best_ask = new_ref,
            }
        } else {
            let mut current = self.levels.get(best).next;
            loop {
                if current == best {
                    // Wrapped: nothing worse than the new level, append at
                    // the end of the ring (still "before best").
                    self.splice_before(best, new_ref);
                    break;
                }
                if self.levels.get(new_ref).is_better_than(self.levels.get(current)) {
                    self.splice_before(current, new_ref);
                    break;
                }
                current = self.levels.get(current).next;
            }
        }

        let idx = self.price_index(price);
        self.price_table[idx] = new_ref;
        Ok(new_ref)
    }

    fn splice_before(&mut self, at: PoolRef, new_ref: PoolRef) {
        let at_prev = self.levels.get(at).prev;
        {
            let level = self.levels.get_mut(new_ref);
            level.prev = at_prev;
            level.next = at;
        }
        self.levels.get_mut(at_prev).next = new_ref;
        self.levels.get_mut(at).prev = new_ref;
    }

    /// Unlink a level from its ring, clear its table slot, and return its
    /// storage (and its queue's chunks) to the pools.
    fn remove_price_level(&mut self, level_ref: PoolRef) {
        let (side, price, prev, next) = {
            let level = self.levels.get(level_ref);
            (level.side, level.price, level.prev, level.next)
        };
        if next == level_ref {
            debug_assert_eq!(prev, level_ref, "corrupt singleton ring");
            match side {
                Side::Buy => self.best_bid = NULL_REF,
                _ => self.best_ask = NULL_REF,
            }
        } else {
            self.levels.get_mut(prev).next = next;
            self.levels.get_mut(next).prev = prev;
            let best = match side {
                Side::Buy => &mut self.best_bid,
                _ => &mut self.best_ask,
            };
            if *best == level_ref {
                *best = next;
            }
        }

        let slot = self.price_index(price);
        debug_assert_eq!(self.price_table[slot], level_ref, "table slot mismatch");
        self.price_table[slot] = NULL_REF;

        let mut level = self
            .levels
            .free(level_ref)
            .expect("removing a level that was already freed");
        level.queue.release(&mut self.chunks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUY: Side = Side::Buy;
    const SELL: Side = Side::Sell;

    fn small_config() -> BookConfig {
        BookConfig {
            max_price_levels: 64,
            max_clients: 8,
            max_orders_per_client: 16_384,
            max_match_events: 10,
            chunk_pool_capacity: 64,
        }
    }

    fn book() -> OrderBook {
        OrderBook::with_config(1, small_config())
    }

    fn add_and_verify(
        book: &mut OrderBook,
        client_id: ClientId,
        client_order_id: OrderId,
        market_order_id: OrderId,
        side: Side,
        price: Price,
        qty: Quantity,
    ) {
        book.add_order(client_id, client_order_id, market_order_id, side, price, qty)
            .unwrap();
        let info = book.get_order(client_id, client_order_id).unwrap();
        assert_eq!(info.market_order_id, market_order_id);
        assert_eq!(info.price, price);
        let level = book.get_price_level(price).unwrap();
        assert_eq!(level.side, side);
        let last = book.last_order(price).unwrap();
        assert_eq!(last.client_id, client_id);
        assert_eq!(last.order_id, client_order_id);
        assert_eq!(last.qty, qty);
    }

    #[allow(clippy::too_many_arguments)]
    fn verify_match(
        result: &MatchResult,
        incoming_order_id: OrderId,
        matched_order_id: OrderId,
        price: Price,
        qty: Quantity,
        remaining: Quantity,
        incoming_client: ClientId,
        matched_client: ClientId,
        incoming_side: Side,
        matched_side: Side,
    ) {
        assert_eq!(result.incoming_order_id, incoming_order_id);
        assert_eq!(result.matched_order_id, matched_order_id);
        assert_eq!(result.price, price);
        assert_eq!(result.quantity, qty);
        assert_eq!(result.matched_remaining_qty, remaining);
        assert_eq!(result.incoming_client_id, incoming_client);
        assert_eq!(result.matched_client_id, matched_client);
        assert_eq!(result.incoming_side, incoming_side);
        assert_eq!(result.matched_side, matched_side);
    }

    #[test]
    fn add_single_buy_order() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, BUY, 100, 50);
        assert_eq!(b.bbo(), (Some(100), None));
    }

    #[test]
    fn add_single_sell_order() {
        let mut b = book();
        add_and_verify(&mut b, 1, 101, 101, SELL, 200, 30);
        assert_eq!(b.bbo(), (None, Some(200)));
    }

    #[test]
    fn orders_at_one_level_queue_in_arrival_order() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, BUY, 100, 50);
        add_and_verify(&mut b, 1, 101, 101, BUY, 100, 30);
        let first = b.get_order(1, 100).unwrap();
        let second = b.get_order(1, 101).unwrap();
        assert_eq!(first.handle.index(), 0);
        assert_eq!(second.handle.index(), 1);
        assert_eq!(b.front_order(100).unwrap().order_id, 100);
        assert_eq!(b.last_order(100).unwrap().order_id, 101);
    }

    #[test]
    fn levels_link_best_first() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, BUY, 100, 50);
        add_and_verify(&mut b, 1, 101, 101, BUY, 101, 30);
        assert_eq!(b.bbo().0, Some(101));
        assert_eq!(b.price_ladder(BUY), vec![101, 100]);
    }

    #[test]
    fn ladder_stays_sorted_under_shuffled_inserts() {
        let mut b = book();
        for (i, price) in [103, 100, 105, 101, 104, 102].iter().enumerate() {
            b.add_order(1, i as OrderId, i as OrderId, BUY, *price, 10).unwrap();
        }
        assert_eq!(b.price_ladder(BUY), vec![105, 104, 103, 102, 101, 100]);

        let mut b = book();
        for (i, price) in [103, 100, 105, 101, 104, 102].iter().enumerate() {
            b.add_order(1, i as OrderId, i as OrderId, SELL, *price, 10).unwrap();
        }
        assert_eq!(b.price_ladder(SELL), vec![100, 101, 102, 103, 104, 105]);
    }

    #[test]
    fn remove_last_order_destroys_the_level() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, BUY, 100, 50);
        b.remove_order(1, 100);
        assert!(b.get_price_level(100).is_none());
        assert!(b.get_order(1, 100).is_none());
        assert_eq!(b.bbo(), (None, None));
    }

    #[test]
    fn remove_from_multi_order_level_keeps_the_rest() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, BUY, 100, 50);
        add_and_verify(&mut b, 1, 101, 101, BUY, 100, 30);
        b.remove_order(1, 100);
        let front = b.front_order(100).unwrap();
        assert_eq!(front.order_id, 101);
        assert_eq!(front.qty, 30);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, BUY, 100, 50);
        add_and_verify(&mut b, 1, 101, 101, BUY, 100, 30);
        b.remove_order(1, 100);
        b.remove_order(1, 100);
        b.remove_order(1, 9999);
        b.remove_order(7, 1);
        // Out-of-range ids are no-ops too.
        b.remove_order(999, 100);
        b.remove_order(1, u64::MAX);
        assert_eq!(b.get_price_level(100).unwrap().order_count(), 1);
    }

    #[test]
    fn match_single_full_fill() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 50);
        let result = b.match_order(2, 101, BUY, 100, 50);
        assert_eq!(result.matches.len(), 1);
        verify_match(&result.matches[0], 101, 100, 100, 50, 0, 2, 1, BUY, SELL);
        assert_eq!(result.remaining_quantity, 0);
        assert!(!result.overflow);
        assert!(b.get_price_level(100).is_none());
        assert!(b.get_order(1, 100).is_none());
    }

    #[test]
    fn match_partial_fill_of_incoming() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 30);
        let result = b.match_order(2, 101, BUY, 100, 50);
        assert_eq!(result.matches.len(), 1);
        verify_match(&result.matches[0], 101, 100, 100, 30, 0, 2, 1, BUY, SELL);
        assert_eq!(result.remaining_quantity, 20);
        assert!(b.get_price_level(100).is_none());
    }

    #[test]
    fn match_partial_fill_of_resting() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 50);
        let result = b.match_order(2, 101, BUY, 100, 30);
        assert_eq!(result.matches.len(), 1);
        verify_match(&result.matches[0], 101, 100, 100, 30, 20, 2, 1, BUY, SELL);
        assert_eq!(result.remaining_quantity, 0);
        // Resting order keeps its level, handle and the leftover quantity.
        let info = b.get_order(1, 100).unwrap();
        assert_eq!(info.price, 100);
        assert_eq!(b.front_order(100).unwrap().qty, 20);
    }

    #[test]
    fn match_drains_one_level_in_time_priority() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 20);
        add_and_verify(&mut b, 1, 101, 101, SELL, 100, 20);
        let result = b.match_order(2, 102, BUY, 100, 50);
        assert_eq!(result.matches.len(), 2);
        verify_match(&result.matches[0], 102, 100, 100, 20, 0, 2, 1, BUY, SELL);
        verify_match(&result.matches[1], 102, 101, 100, 20, 0, 2, 1, BUY, SELL);
        assert_eq!(result.remaining_quantity, 10);
        assert!(b.get_price_level(100).is_none());
    }

    #[test]
    fn match_walks_levels_best_price_first() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 20);
        add_and_verify(&mut b, 1, 101, 101, SELL, 99, 20);
        let result = b.match_order(2, 102, BUY, 100, 50);
        assert_eq!(result.matches.len(), 2);
        verify_match(&result.matches[0], 102, 101, 99, 20, 0, 2, 1, BUY, SELL);
        verify_match(&result.matches[1], 102, 100, 100, 20, 0, 2, 1, BUY, SELL);
        assert_eq!(result.remaining_quantity, 10);
        assert!(b.get_price_level(100).is_none());
        assert!(b.get_price_level(99).is_none());
    }

    #[test]
    fn no_cross_returns_empty_set() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 101, 50);
        let result = b.match_order(2, 101, BUY, 100, 50);
        assert!(result.matches.is_empty());
        assert_eq!(result.remaining_quantity, 50);
        assert!(!result.overflow);
        assert_eq!(b.front_order(101).unwrap().qty, 50);
    }

    #[test]
    fn match_event_cap_sets_overflow() {
        let mut b = book();
        let cap = small_config().max_match_events as u64;
        for id in 100..100 + cap + 1 {
            add_and_verify(&mut b, 1, id, id, SELL, 100, 10);
        }
        let result = b.match_order(2, 200, BUY, 100, 10_000);
        assert_eq!(result.matches.len() as u64, cap);
        assert!(result.overflow);
        assert_eq!(result.remaining_quantity as u64, 10_000 - cap * 10);
        // The uncapped remainder is still resting.
        assert!(b.get_price_level(100).is_some());
        assert_eq!(b.front_order(100).unwrap().order_id, 100 + cap);

        // Re-invoking drains the rest and clears the flag.
        let result = b.match_order(2, 201, BUY, 100, 10);
        assert_eq!(result.matches.len(), 1);
        assert!(!result.overflow);
        assert!(b.get_price_level(100).is_none());
    }

    #[test]
    fn complex_walk_leaves_far_levels_untouched() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 25);
        add_and_verify(&mut b, 1, 101, 101, SELL, 101, 30);
        add_and_verify(&mut b, 1, 102, 102, SELL, 99, 40);
        add_and_verify(&mut b, 2, 200, 200, BUY, 98, 50);
        add_and_verify(&mut b, 2, 201, 201, BUY, 97, 60);

        let result = b.match_order(3, 300, BUY, 100, 100);
        assert_eq!(result.matches.len(), 2);
        verify_match(&result.matches[0], 300, 102, 99, 40, 0, 3, 1, BUY, SELL);
        verify_match(&result.matches[1], 300, 100, 100, 25, 0, 3, 1, BUY, SELL);
        assert_eq!(result.remaining_quantity, 35);

        assert!(b.get_price_level(100).is_none());
        assert!(b.get_price_level(99).is_none());
        assert_eq!(b.front_order(101).unwrap().qty, 30);
        assert_eq!(b.price_ladder(BUY), vec![98, 97]);
        assert_eq!(b.bbo(), (Some(98), Some(101)));
    }

    #[test]
    fn fill_quantity_is_conserved() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 17);
        add_and_verify(&mut b, 1, 101, 101, SELL, 101, 23);
        add_and_verify(&mut b, 1, 102, 102, SELL, 102, 41);
        let qty = 70;
        let result = b.match_order(2, 200, BUY, 102, qty);
        let filled: Quantity = result.matches.iter().map(|m| m.quantity).sum();
        assert_eq!(filled + result.remaining_quantity, qty);
    }

    #[test]
    fn fragmented_level_matches_the_lone_survivor() {
        let mut b = book();
        let total: u64 = 10_000;
        let survivor: u64 = 7_777;
        for id in 0..total {
            b.add_order(1, id, id, SELL, 100, 1).unwrap();
        }
        for id in 0..total {
            if id != survivor {
                b.remove_order(1, id);
            }
        }
        assert_eq!(b.get_price_level(100).unwrap().order_count(), 1);

        let result = b.match_order(2, 20_000, BUY, 100, 10);
        assert_eq!(result.matches.len(), 1);
        verify_match(&result.matches[0], 20_000, survivor, 100, 1, 0, 2, 1, BUY, SELL);
        assert_eq!(result.remaining_quantity, 9);
        assert!(b.get_price_level(100).is_none());
    }

    #[test]
    fn cancel_after_full_fill_is_a_no_op() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 50);
        let result = b.match_order(2, 101, BUY, 100, 50);
        assert_eq!(result.matches.len(), 1);
        b.remove_order(1, 100);
        assert!(b.get_order(1, 100).is_none());
        assert_eq!(b.bbo(), (None, None));
    }

    #[test]
    fn order_id_is_reusable_after_the_order_dies() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 50);
        b.match_order(2, 101, BUY, 100, 50);
        add_and_verify(&mut b, 1, 100, 107, SELL, 105, 20);
        assert_eq!(b.get_order(1, 100).unwrap().market_order_id, 107);
    }

    #[test]
    fn rejects_invalid_orders_before_mutation() {
        let mut b = book();
        assert_eq!(b.add_order(1, 1, 1, BUY, 100, 0), Err(Error::ZeroQuantity));
        assert_eq!(
            b.add_order(1, 1, 1, Side::Invalid, 100, 10),
            Err(Error::InvalidSide)
        );
        assert_eq!(
            b.add_order(99, 1, 1, BUY, 100, 10),
            Err(Error::ClientOutOfRange(99))
        );
        assert_eq!(
            b.add_order(1, u64::MAX, 1, BUY, 100, 10),
            Err(Error::OrderIdOutOfRange(u64::MAX))
        );
        assert!(b.get_price_level(100).is_none());

        b.add_order(1, 1, 1, BUY, 100, 10).unwrap();
        assert_eq!(
            b.add_order(1, 1, 2, BUY, 100, 10),
            Err(Error::DuplicateOrder(1, 1))
        );
        assert_eq!(b.get_price_level(100).unwrap().order_count(), 1);
    }

    #[test]
    fn colliding_price_is_rejected() {
        let mut b = book();
        let table = small_config().max_price_levels as i64;
        b.add_order(1, 1, 1, BUY, 5, 10).unwrap();
        assert_eq!(
            b.add_order(1, 2, 2, BUY, 5 + table, 10),
            Err(Error::PriceCollision {
                requested: 5 + table,
                resident: 5
            })
        );
        // The colliding price is invisible through the table.
        assert!(b.get_price_level(5 + table).is_none());
        assert!(b.get_price_level(5).is_some());
    }

    #[test]
    fn negative_prices_map_into_the_table() {
        let mut b = book();
        b.add_order(1, 1, 1, BUY, -3, 10).unwrap();
        assert_eq!(b.get_price_level(-3).unwrap().price, -3);
        b.remove_order(1, 1);
        assert!(b.get_price_level(-3).is_none());
    }

    #[test]
    fn chunk_exhaustion_rolls_back_a_fresh_level() {
        let mut b = OrderBook::with_config(
            1,
            BookConfig {
                chunk_pool_capacity: 1,
                ..small_config()
            },
        );
        // One chunk's worth of orders at price 100 consumes the pool.
        for id in 0..crate::queue::CHUNK_ORDERS as u64 {
            b.add_order(1, id, id, BUY, 100, 1).unwrap();
        }
        let err = b
            .add_order(1, 9_000, 9_000, BUY, 99, 1)
            .unwrap_err();
        assert_eq!(err, Error::PoolExhausted { pool: "chunk" });
        // The level created for the failed push was rolled back.
        assert!(b.get_price_level(99).is_none());
        assert_eq!(b.price_ladder(BUY), vec![100]);
        assert!(b.get_order(1, 9_000).is_none());
    }

    #[test]
    fn match_with_invalid_side_or_zero_qty_is_empty() {
        let mut b = book();
        add_and_verify(&mut b, 1, 100, 100, SELL, 100, 50);
        let result = b.match_order(2, 101, Side::Invalid, 100, 50);
        assert!(result.matches.is_empty());
        assert_eq!(result.remaining_quantity, 50);
        let result = b.match_order(2, 101, BUY, 100, 0);
        assert!(result.matches.is_empty());
        assert_eq!(result.remaining_quantity, 0);
        assert_eq!(b.front_order(100).unwrap().qty, 50);
    }

    #[test]
    fn best_pointers_follow_removals() {
        let mut b = book();
        for (i, price) in [100, 101, 102].iter().enumerate() {
            b.add_order(1, i as OrderId, i as OrderId, SELL, *price, 10).unwrap();
        }
        assert_eq!(b.bbo().1, Some(100));
        b.remove_order(1, 0); // removes the 100 level
        assert_eq!(b.bbo().1, Some(101));
        b.remove_order(1, 1);
        assert_eq!(b.bbo().1, Some(102));
        b.remove_order(1, 2);
        assert_eq!(b.bbo(), (None, None));
        assert!(b.price_ladder(SELL).is_empty());
    }
}
