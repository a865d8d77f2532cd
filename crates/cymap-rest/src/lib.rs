//! # cymap REST
//!
//! Translation layer for the legacy HTTP/REST protocol.
//!
//! Parses both historical JSON result envelopes (the classic cypher
//! endpoint and the transactional endpoint) into [`cymap_core::ResultSet`]s,
//! promoting node- and relationship-shaped JSON objects into typed
//! graph values along the way, plus a thin HTTP client facade.

pub mod client;
pub mod envelope;

pub use client::{RestClient, RestConfig};
pub use envelope::{parse_classic, parse_transactional, RestError};
