// src/models/mod.rs - Shared domain types

pub mod transaction;

pub use transaction::{GeoLocation, Transaction};
