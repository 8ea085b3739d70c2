// Core identifier types and match-event records shared across the crate.
// Prices are integer ticks; all ids use all-ones as the invalid sentinel.

use std::fmt;

pub type OrderId = u64;
pub type ClientId = u32;
pub type InstrumentId = u8;
pub type Price = i64;
pub type Quantity = u32;

pub const INVALID_ORDER_ID: OrderId = OrderId::MAX;
pub const INVALID_CLIENT_ID: ClientId = ClientId::MAX;
pub const INVALID_INSTRUMENT_ID: InstrumentId = InstrumentId::MAX;
pub const INVALID_PRICE: Price = Price::MAX;
pub const INVALID_QUANTITY: Quantity = Quantity::MAX;

/// Book side. One byte so it packs into event records as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Side {
    #[default]
    Invalid = 0,
    Buy = 1,
    Sell = 2,
}

impl Side {
    #[inline]
    pub fn from_u8(v: u8) -> Side {
        match v {
            1 => Side::Buy,
            2 => Side::Sell,
            _ => Side::Invalid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Invalid => "INVALID",
        })
    }
}

/// One fill produced by a match call. Plain aggregate with no references
/// into the book; safe to retain after the matched order is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub incoming_order_id: OrderId,
    pub matched_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    pub matched_remaining_qty: Quantity,
    pub incoming_client_id: ClientId,
    pub matched_client_id: ClientId,
    pub incoming_side: Side,
    pub matched_side: Side,
}

/// Result of one match call. `matches` borrows the book-owned event buffer
/// and is overwritten by the next match call; copy out to retain.
#[derive(Debug)]
pub struct MatchResultSet<'a> {
    pub matches: &'a [MatchResult],
    pub remaining_quantity: Quantity,
    pub instrument: InstrumentId,
    pub overflow: bool,
}
