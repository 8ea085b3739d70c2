// src/level.rs
//
// One side/price node in the book. Levels of the same side form a circular
// doubly-linked ring ordered best-outward; a singleton level points at
// itself. Ring pointers are non-owning pool refs; the level pool owns the
// storage and the book performs all splicing.

use crate::error::Result;
use crate::pool::{Pool, PoolRef, NULL_REF};
use crate::queue::{BasicOrder, Chunk, ChunkQueue, OrderHandle};
use crate::types::{Price, Side};

pub struct PriceLevel {
    pub side: Side,
    pub price: Price,
    pub(crate) queue: ChunkQueue,
    pub(crate) prev: PoolRef,
    pub(crate) next: PoolRef,
}

impl PriceLevel {
    /// Ring pointers start null; the book points them at the level's own
    /// pool slot (singleton) or splices it between neighbours.
    pub(crate) fn new(side: Side, price: Price) -> Self {
        Self {
            side,
            price,
            queue: ChunkQueue::new(),
            prev: NULL_REF,
            next: NULL_REF,
        }
    }

    #[inline]
    pub(crate) fn add_order(
        &mut self,
        chunks: &mut Pool<Chunk>,
        order: BasicOrder,
    ) -> Result<OrderHandle> {
        self.queue.push(chunks, order)
    }

    #[inline]
    pub(crate) fn cancel_order(&mut self, chunks: &mut Pool<Chunk>, handle: OrderHandle) {
        self.queue.cancel(chunks, handle)
    }

    #[inline]
    pub(crate) fn front_order_mut<'p>(
        &mut self,
        chunks: &'p mut Pool<Chunk>,
    ) -> Option<&'p mut BasicOrder> {
        self.queue.front_mut(chunks)
    }

    #[inline]
    pub(crate) fn pop_front(&mut self, chunks: &mut Pool<Chunk>) {
        self.queue.pop_front(chunks)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn order_count(&self) -> u32 {
        self.queue.len()
    }

    /// Does a taker at `price` cross this level?
    #[inline]
    pub fn is_matchable(&self, price: Price) -> bool {
        match self.side {
            Side::Buy => self.price >= price,
            _ => self.price <= price,
        }
    }

    /// Strictly more aggressive than `other` on the same side.
    #[inline]
    pub fn is_better_than(&self, other: &PriceLevel) -> bool {
        match self.side {
            Side::Buy => self.price > other.price,
            _ => self.price < other.price,
        }
    }
}
