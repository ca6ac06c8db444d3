//! tickx-rs: price ticks in over UDP, one sorted CSV per symbol out.
//!
//! Datagram -> [`market_data::listener`] -> [`market_data::parser`] -> [`engine::collector`]
//! -> (ENDTRANSMISSION) -> [`persist::exporter`] -> `<symbol>.csv` + `<symbol> Rows: <n>`.

pub mod config;
pub mod engine;
pub mod market_data;
pub mod persist;
pub mod telemetry;
