//! # cymap Bolt
//!
//! Translation layer for the Bolt binary protocol.
//!
//! Converts driver-native `neo4rs` rows, nodes and relationships into
//! [`cymap_core::GraphValue`] trees so the shared mapping engine can
//! pour them into target types, plus a thin client facade over the
//! driver's connection pool.

pub mod client;
pub mod translate;

pub use client::{BoltClient, BoltConfig};
pub use translate::{column_value, node_value, relationship_value, rows_to_result_set};
