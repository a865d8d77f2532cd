//! The structural deserializer.
//!
//! Walks a [`GraphValue`] tree driven by the target type: serde asks
//! for the shape the destination wants, and the deserializer answers
//! from whatever the wire delivered, coercing where documented and
//! failing with diagnostics that name both sides otherwise.
//!
//! Node and relationship values are duck-typed: a plain struct is
//! served from the property map alone, while the [`NodeEnvelope`] and
//! [`RelationshipEnvelope`] wrappers (recognized by struct name) also
//! receive graph identity fields.

use std::collections::BTreeMap;

use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    Unexpected, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use serde::Deserialize;

use crate::error::MapError;
use crate::result::MapContext;
use crate::value::{GraphValue, Properties};

const NODE_ENVELOPE: &str = "NodeEnvelope";
const RELATIONSHIP_ENVELOPE: &str = "RelationshipEnvelope";

/// Generic wrapper target exposing node identity next to the mapped
/// property data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeEnvelope<T> {
    pub id: i64,
    pub labels: Vec<String>,
    pub data: T,
}

/// Generic wrapper target exposing relationship identity next to the
/// mapped property data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelationshipEnvelope<T> {
    pub id: i64,
    pub start_id: i64,
    pub end_id: i64,
    pub rel_type: String,
    pub data: T,
}

/// Deserializer over a single wire value.
///
/// Construction runs the converter chain, so every recursion point
/// (row values, map entries, list elements) gets converter treatment.
pub struct ValueDeserializer<'a> {
    value: GraphValue,
    ctx: &'a MapContext,
}

impl<'a> ValueDeserializer<'a> {
    pub fn new(value: GraphValue, ctx: &'a MapContext) -> Result<Self, MapError> {
        let value = ctx.converters().apply(value)?;
        Ok(Self { value, ctx })
    }
}

fn unexpected_of(value: &GraphValue) -> Unexpected<'_> {
    match value {
        GraphValue::Null => Unexpected::Unit,
        GraphValue::Bool(b) => Unexpected::Bool(*b),
        GraphValue::Int(i) => Unexpected::Signed(*i),
        GraphValue::Float(f) => Unexpected::Float(*f),
        GraphValue::String(s) => Unexpected::Str(s),
        GraphValue::List(_) => Unexpected::Seq,
        GraphValue::Map(_) => Unexpected::Map,
        GraphValue::Node(_) => Unexpected::Other("node"),
        GraphValue::Relationship(_) => Unexpected::Other("relationship"),
    }
}

fn visit_seq_values<'de, V: Visitor<'de>>(
    items: Vec<GraphValue>,
    ctx: &MapContext,
    visitor: V,
) -> Result<V::Value, MapError> {
    visitor.visit_seq(SeqDeserializer {
        iter: items.into_iter(),
        ctx,
    })
}

fn visit_map_values<'de, V: Visitor<'de>>(
    entries: Properties,
    ctx: &MapContext,
    visitor: V,
) -> Result<V::Value, MapError> {
    visitor.visit_map(MapDeserializer {
        iter: entries.into_iter(),
        value: None,
        ctx,
    })
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'_> {
    type Error = MapError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        match self.value {
            GraphValue::Null => visitor.visit_unit(),
            GraphValue::Bool(b) => visitor.visit_bool(b),
            GraphValue::Int(i) => visitor.visit_i64(i),
            GraphValue::Float(f) => visitor.visit_f64(f),
            GraphValue::String(s) => visitor.visit_string(s),
            GraphValue::List(items) => visit_seq_values(items, self.ctx, visitor),
            GraphValue::Map(entries) => visit_map_values(entries, self.ctx, visitor),
            GraphValue::Node(node) => visit_map_values(node.properties, self.ctx, visitor),
            GraphValue::Relationship(rel) => visit_map_values(rel.properties, self.ctx, visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        if self.value.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        match self.value {
            GraphValue::Null => visitor.visit_unit(),
            other => Err(de::Error::invalid_type(unexpected_of(&other), &visitor)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, MapError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, MapError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        match self.value {
            // Null collections materialize as empty sequences.
            GraphValue::Null => visit_seq_values(Vec::new(), self.ctx, visitor),
            GraphValue::List(items) => visit_seq_values(items, self.ctx, visitor),
            other => Err(de::Error::invalid_type(unexpected_of(&other), &visitor)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, MapError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, MapError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        match self.value {
            GraphValue::Null => visit_map_values(Properties::new(), self.ctx, visitor),
            GraphValue::Map(entries) => visit_map_values(entries, self.ctx, visitor),
            GraphValue::Node(node) => visit_map_values(node.properties, self.ctx, visitor),
            GraphValue::Relationship(rel) => visit_map_values(rel.properties, self.ctx, visitor),
            other => Err(de::Error::invalid_type(unexpected_of(&other), &visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, MapError> {
        match self.value {
            GraphValue::Node(node) if name == NODE_ENVELOPE => {
                let mut entries = Properties::new();
                entries.insert("id".to_string(), GraphValue::Int(node.id));
                entries.insert(
                    "labels".to_string(),
                    GraphValue::List(node.labels.into_iter().map(GraphValue::String).collect()),
                );
                entries.insert("data".to_string(), GraphValue::Map(node.properties));
                visit_map_values(entries, self.ctx, visitor)
            }
            GraphValue::Relationship(rel) if name == RELATIONSHIP_ENVELOPE => {
                let mut entries = Properties::new();
                entries.insert("id".to_string(), GraphValue::Int(rel.id));
                entries.insert("start_id".to_string(), GraphValue::Int(rel.start));
                entries.insert("end_id".to_string(), GraphValue::Int(rel.end));
                entries.insert("rel_type".to_string(), GraphValue::String(rel.rel_type));
                entries.insert("data".to_string(), GraphValue::Map(rel.properties));
                visit_map_values(entries, self.ctx, visitor)
            }
            GraphValue::Map(entries) => visit_map_values(entries, self.ctx, visitor),
            // Duck-typing: any node/relationship serves a plain struct
            // from its property map.
            GraphValue::Node(node) => visit_map_values(node.properties, self.ctx, visitor),
            GraphValue::Relationship(rel) => visit_map_values(rel.properties, self.ctx, visitor),
            other => Err(de::Error::invalid_type(unexpected_of(&other), &visitor)),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, MapError> {
        match self.value {
            GraphValue::String(s) => {
                let matched = variants
                    .iter()
                    .copied()
                    .find(|v| *v == s)
                    .or_else(|| variants.iter().copied().find(|v| v.eq_ignore_ascii_case(&s)));
                match matched {
                    Some(variant) => visitor.visit_enum(ScalarEnumAccess {
                        ident: VariantIdent::Name(variant),
                    }),
                    None => Err(de::Error::unknown_variant(&s, variants)),
                }
            }
            GraphValue::Int(ordinal) => {
                if ordinal < 0 || ordinal as usize >= variants.len() {
                    return Err(MapError::Message(format!(
                        "ordinal {} is out of range for enum {} with {} variants",
                        ordinal,
                        name,
                        variants.len()
                    )));
                }
                visitor.visit_enum(ScalarEnumAccess {
                    ident: VariantIdent::Index(ordinal as u64),
                })
            }
            GraphValue::Map(entries) if entries.len() == 1 => {
                let Some((variant, value)) = entries.into_iter().next() else {
                    return Err(MapError::Message("empty enum map".to_string()));
                };
                visitor.visit_enum(ValueEnumAccess {
                    variant,
                    value,
                    ctx: self.ctx,
                })
            }
            other => Err(de::Error::invalid_type(unexpected_of(&other), &visitor)),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string
        bytes byte_buf identifier
    }
}

struct SeqDeserializer<'a> {
    iter: std::vec::IntoIter<GraphValue>,
    ctx: &'a MapContext,
}

impl<'de> SeqAccess<'de> for SeqDeserializer<'_> {
    type Error = MapError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, MapError> {
        match self.iter.next() {
            Some(value) => seed
                .deserialize(ValueDeserializer::new(value, self.ctx)?)
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer<'a> {
    iter: std::collections::btree_map::IntoIter<String, GraphValue>,
    value: Option<GraphValue>,
    ctx: &'a MapContext,
}

impl<'de> MapAccess<'de> for MapDeserializer<'_> {
    type Error = MapError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, MapError> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, MapError> {
        let value = self
            .value
            .take()
            .ok_or_else(|| MapError::Message("map value requested before key".to_string()))?;
        seed.deserialize(ValueDeserializer::new(value, self.ctx)?)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

enum VariantIdent {
    Name(&'static str),
    Index(u64),
}

/// Enum access for scalar wire values: the variant is identified by
/// string name or ordinal index and carries no data.
struct ScalarEnumAccess {
    ident: VariantIdent,
}

impl<'de> EnumAccess<'de> for ScalarEnumAccess {
    type Error = MapError;
    type Variant = UnitOnlyVariant;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), MapError> {
        let value = match self.ident {
            VariantIdent::Name(name) => seed.deserialize(name.into_deserializer())?,
            VariantIdent::Index(index) => seed.deserialize(index.into_deserializer())?,
        };
        Ok((value, UnitOnlyVariant))
    }
}

struct UnitOnlyVariant;

impl<'de> VariantAccess<'de> for UnitOnlyVariant {
    type Error = MapError;

    fn unit_variant(self) -> Result<(), MapError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, _seed: T) -> Result<T::Value, MapError> {
        Err(MapError::Message(
            "variant data requires a map-shaped wire value, got a scalar".to_string(),
        ))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value, MapError> {
        Err(MapError::Message(
            "variant data requires a map-shaped wire value, got a scalar".to_string(),
        ))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, MapError> {
        Err(MapError::Message(
            "variant data requires a map-shaped wire value, got a scalar".to_string(),
        ))
    }
}

/// Enum access for externally-tagged map values: `{variant: content}`.
struct ValueEnumAccess<'a> {
    variant: String,
    value: GraphValue,
    ctx: &'a MapContext,
}

impl<'de, 'a> EnumAccess<'de> for ValueEnumAccess<'a> {
    type Error = MapError;
    type Variant = ValueVariant<'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), MapError> {
        let tag = seed.deserialize(self.variant.into_deserializer())?;
        Ok((
            tag,
            ValueVariant {
                value: self.value,
                ctx: self.ctx,
            },
        ))
    }
}

struct ValueVariant<'a> {
    value: GraphValue,
    ctx: &'a MapContext,
}

impl<'de> VariantAccess<'de> for ValueVariant<'_> {
    type Error = MapError;

    fn unit_variant(self) -> Result<(), MapError> {
        match self.value {
            GraphValue::Null => Ok(()),
            other => Err(MapError::mismatch(other.kind(), "unit variant")),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, MapError> {
        seed.deserialize(ValueDeserializer::new(self.value, self.ctx)?)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, MapError> {
        ValueDeserializer::new(self.value, self.ctx)?.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, MapError> {
        ValueDeserializer::new(self.value, self.ctx)?.deserialize_map(visitor)
    }
}

/// Deserializer over a whole projection row.
///
/// Struct and map targets are served by column name, tuple targets by
/// column order, and single-value targets by the lone column.
pub struct RowDeserializer<'a> {
    columns: &'a [String],
    values: Vec<GraphValue>,
    ctx: &'a MapContext,
}

impl<'a> RowDeserializer<'a> {
    pub fn new(
        columns: &'a [String],
        values: Vec<GraphValue>,
        ctx: &'a MapContext,
    ) -> Result<Self, MapError> {
        if values.len() != columns.len() {
            return Err(MapError::RowArity {
                got: values.len(),
                expected: columns.len(),
            });
        }
        Ok(Self {
            columns,
            values,
            ctx,
        })
    }

    fn single_value(self) -> Result<ValueDeserializer<'a>, MapError> {
        if self.columns.len() != 1 {
            return Err(MapError::ScalarColumns(self.columns.len()));
        }
        let value = self.values.into_iter().next().unwrap_or(GraphValue::Null);
        ValueDeserializer::new(value, self.ctx)
    }

    fn named_map(self) -> Properties {
        self.columns
            .iter()
            .cloned()
            .zip(self.values)
            .collect::<BTreeMap<_, _>>()
    }
}

macro_rules! row_scalar_methods {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
                self.single_value()?.deserialize_any(visitor)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for RowDeserializer<'_> {
    type Error = MapError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        let ctx = self.ctx;
        visit_map_values(self.named_map(), ctx, visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        if self.columns.len() == 1 {
            self.single_value()?.deserialize_option(visitor)
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, MapError> {
        self.single_value()?.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, MapError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        let ctx = self.ctx;
        visit_seq_values(self.values, ctx, visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, MapError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, MapError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        if self.columns.len() == 1 && self.values[0].is_map_like() {
            return self.single_value()?.deserialize_map(visitor);
        }
        let ctx = self.ctx;
        visit_map_values(self.named_map(), ctx, visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, MapError> {
        // A lone object column (RETURN n) serves the whole struct, which
        // also keeps envelope recognition working under projection mode.
        if self.columns.len() == 1 && self.values[0].is_map_like() {
            return self.single_value()?.deserialize_struct(name, fields, visitor);
        }
        let ctx = self.ctx;
        visit_map_values(self.named_map(), ctx, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, MapError> {
        self.single_value()?.deserialize_enum(name, variants, visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MapError> {
        visitor.visit_unit()
    }

    row_scalar_methods! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32
        deserialize_i64 deserialize_u8 deserialize_u16 deserialize_u32
        deserialize_u64 deserialize_f32 deserialize_f64 deserialize_char
        deserialize_str deserialize_string deserialize_bytes
        deserialize_byte_buf deserialize_identifier deserialize_unit
    }
}
