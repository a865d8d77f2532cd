//! Custom value converter registry.
//!
//! Converters inspect a wire value and may rewrite it before default
//! structural handling applies. User converters run in registration
//! order, built-in defaults always last; the first converter whose
//! `matches` returns true wins and no further converters run.

use crate::dates;
use crate::error::MapError;
use crate::value::GraphValue;

/// A user-supplied value rewrite applied ahead of default mapping.
pub trait ValueConverter: Send + Sync {
    /// Name used in diagnostics when the converter fails.
    fn name(&self) -> &str;

    /// Whether this converter wants to handle the value.
    fn matches(&self, value: &GraphValue) -> bool;

    /// Rewrite the value. Only called when `matches` returned true.
    fn convert(&self, value: GraphValue) -> Result<GraphValue, MapError>;
}

/// Ordered converter chain: user converters first, defaults last.
pub struct ConverterRegistry {
    user: Vec<Box<dyn ValueConverter>>,
    defaults: Vec<Box<dyn ValueConverter>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self {
            user: Vec::new(),
            defaults: vec![Box::new(LegacyDateConverter)],
        }
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user converter. Registration order is evaluation
    /// order; all user converters run before the built-in defaults.
    pub fn register(&mut self, converter: Box<dyn ValueConverter>) {
        self.user.push(converter);
    }

    /// Run the chain over a value. First match wins; values no
    /// converter claims pass through unchanged.
    pub fn apply(&self, value: GraphValue) -> Result<GraphValue, MapError> {
        for converter in self.user.iter().chain(self.defaults.iter()) {
            if converter.matches(&value) {
                return converter.convert(value).map_err(|e| MapError::Converter {
                    converter: converter.name().to_string(),
                    message: e.to_string(),
                });
            }
        }
        Ok(value)
    }
}

/// Built-in default: rewrites legacy `/Date(...)/` epoch strings to
/// RFC 3339 so ordinary chrono fields work over both protocols.
/// Malformed legacy text becomes null, which optional destinations
/// read as "no value" instead of an error.
pub struct LegacyDateConverter;

impl ValueConverter for LegacyDateConverter {
    fn name(&self) -> &str {
        "legacy-date"
    }

    fn matches(&self, value: &GraphValue) -> bool {
        matches!(value, GraphValue::String(s) if s.starts_with("/Date(") && s.ends_with(")/"))
    }

    fn convert(&self, value: GraphValue) -> Result<GraphValue, MapError> {
        match value {
            GraphValue::String(text) => match dates::parse_legacy_epoch(&text) {
                Some(ts) => Ok(GraphValue::String(ts.instant().to_rfc3339())),
                None => Ok(GraphValue::Null),
            },
            other => Ok(other),
        }
    }
}
