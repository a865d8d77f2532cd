//! # cymap core
//!
//! Protocol-independent result mapping for graph databases.
//!
//! Wire results arrive as [`GraphValue`] trees (built by the protocol
//! crates from REST JSON or Bolt records) and are poured into arbitrary
//! `serde`-deserializable target types by the structural deserializer,
//! with multi-dialect date handling and a pluggable converter registry.

pub mod convert;
pub mod dates;
pub mod de;
pub mod error;
pub mod result;
pub mod value;

pub use convert::{ConverterRegistry, LegacyDateConverter, ValueConverter};
pub use de::{NodeEnvelope, RelationshipEnvelope, RowDeserializer, ValueDeserializer};
pub use dates::{TimeKind, Timestamp};
pub use error::{MapError, MapResult};
pub use result::{MapContext, ResultMode, ResultSet};
pub use value::{GraphValue, NodeValue, Properties, RelationshipValue};
