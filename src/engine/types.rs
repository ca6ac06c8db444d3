use std::cmp::{Ordering, Reverse};

use ordered_float::OrderedFloat;
use thiserror::Error;

// One price tick as received on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub symbol: String,
    pub price: f64,
    pub quantity: u64,
    pub sequence: u64,
}

impl Record {
    pub fn new(symbol: impl Into<String>, price: f64, quantity: u64, sequence: u64) -> Self {
        Self { symbol: symbol.into(), price, quantity, sequence }
    }

    /// Split into the buffering key and the per-record payload.
    /// The key orders by price but ignores quantity; the tick keeps the exact price.
    pub fn into_key_and_tick(self) -> (RecordKey, Tick) {
        let tick = Tick { price: self.price, quantity: self.quantity };
        let key = RecordKey {
            symbol: self.symbol,
            price: OrderedFloat(self.price),
            sequence: Reverse(self.sequence),
        };
        (key, tick)
    }

    /// symbol asc, then price asc, then sequence desc
    pub fn canonical_cmp(&self, other: &Record) -> Ordering {
        self.symbol
            .cmp(&other.symbol)
            .then_with(|| OrderedFloat(self.price).cmp(&OrderedFloat(other.price)))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }

    /// Output row: `price,quantity,sequence` with two-decimal price.
    pub fn to_row(&self) -> [String; 3] {
        [format!("{:.2}", self.price), self.quantity.to_string(), self.sequence.to_string()]
    }
}

// Field order is the canonical order; the derived Ord relies on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub symbol: String,
    pub price: OrderedFloat<f64>,
    pub sequence: Reverse<u64>,
}

// -0.0 and 0.0 share a key, so the price is carried here as well
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub price: f64,
    pub quantity: u64,
}

impl RecordKey {
    pub fn to_record(&self, tick: Tick) -> Record {
        Record {
            symbol: self.symbol.clone(),
            price: tick.price,
            quantity: tick.quantity,
            sequence: self.sequence.0,
        }
    }
}

/// All records for one symbol, already in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub symbol: String,
    pub records: Vec<Record>,
    pub row_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
}
