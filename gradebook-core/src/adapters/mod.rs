//! Adapters - concrete implementations of ports

pub mod duckdb;
