//! Error taxonomy for the matching core.
//!
//! Cancelling an unknown order is deliberately *not* an error: cancels are
//! idempotent so a cancel racing a fill degrades to a no-op. Hitting the
//! per-call match-event cap is signalled through `MatchResultSet::overflow`,
//! not through this enum.

use thiserror::Error;

use crate::types::{ClientId, OrderId, Price};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A fixed pool ran out of slots. Fatal: the book is undersized for the
    /// configured load.
    #[error("{pool} pool exhausted")]
    PoolExhausted { pool: &'static str },

    #[error("order quantity must be non-zero")]
    ZeroQuantity,

    #[error("order side must be buy or sell")]
    InvalidSide,

    #[error("client id {0} outside configured range")]
    ClientOutOfRange(ClientId),

    #[error("client order id {0} outside configured range")]
    OrderIdOutOfRange(OrderId),

    /// The direct-mapped price table slot for `requested` is occupied by a
    /// live level at a different price. The caller must keep prices within
    /// one table window; colliding adds are rejected rather than silently
    /// sharing a level.
    #[error("price {requested} collides with live level at {resident}")]
    PriceCollision { requested: Price, resident: Price },

    #[error("client {0} already has a live order {1}")]
    DuplicateOrder(ClientId, OrderId),
}

pub type Result<T> = std::result::Result<T, Error>;
