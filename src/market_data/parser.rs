// Convert one wire payload into a Record.
// Grammar: sequence_hex,symbol,price_decimal,quantity_decimal

use thiserror::Error;

use crate::engine::types::Record;

pub const FIELD_COUNT: usize = 4;

/// Exact payload that closes a session.
pub const SENTINEL: &[u8] = b"ENDTRANSMISSION";

/// Classification shared by every parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedRecord,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    #[error("expected 4 fields, found {found}")]
    FieldCount { found: usize },
    #[error("bad hex sequence {0:?}")]
    BadSequence(String),
    #[error("empty symbol")]
    EmptySymbol,
    #[error("symbol {0:?} cannot name an output file")]
    BadSymbol(String),
    #[error("bad price {0:?}")]
    BadPrice(String),
    #[error("price {0:?} is not finite")]
    NonFinitePrice(String),
    #[error("bad quantity {0:?}")]
    BadQuantity(String),
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedRecord
    }
}

pub fn is_sentinel(payload: &[u8]) -> bool {
    payload == SENTINEL
}

pub fn parse_bytes(raw: &[u8]) -> Result<Record, ParseError> {
    let text = std::str::from_utf8(raw).map_err(|_| ParseError::NotUtf8)?;
    parse(text)
}

pub fn parse(raw: &str) -> Result<Record, ParseError> {
    // Strip the line terminator first so it never leaks into the quantity field
    let line = raw.trim_end_matches(['\r', '\n']);

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount { found: fields.len() });
    }

    let sequence = parse_sequence(fields[0])?;
    let symbol = parse_symbol(fields[1])?;
    let price = parse_price(fields[2])?;
    let quantity = parse_quantity(fields[3])?;

    Ok(Record { symbol, price, quantity, sequence })
}

fn parse_sequence(s: &str) -> Result<u64, ParseError> {
    let t = s.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    // from_str_radix tolerates a leading '+', the wire format does not
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::BadSequence(s.to_string()));
    }
    u64::from_str_radix(digits, 16).map_err(|_| ParseError::BadSequence(s.to_string()))
}

fn parse_symbol(s: &str) -> Result<String, ParseError> {
    let t = s.trim();
    if t.is_empty() {
        return Err(ParseError::EmptySymbol);
    }
    if t == "." || t == ".." || t.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(ParseError::BadSymbol(s.to_string()));
    }
    Ok(t.to_string())
}

fn parse_price(s: &str) -> Result<f64, ParseError> {
    let price: f64 = s.trim().parse().map_err(|_| ParseError::BadPrice(s.to_string()))?;
    if !price.is_finite() {
        return Err(ParseError::NonFinitePrice(s.to_string()));
    }
    Ok(price)
}

fn parse_quantity(s: &str) -> Result<u64, ParseError> {
    let t = s.trim();
    if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::BadQuantity(s.to_string()));
    }
    t.parse().map_err(|_| ParseError::BadQuantity(s.to_string()))
}
