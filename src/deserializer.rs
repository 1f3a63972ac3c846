//! Serde deserializer implementation for UCL
//!
//! This module provides typed extraction, allowing decoded documents to be
//! deserialized directly into Rust types using the standard serde derive
//! macros. UCL keeps every scalar as text, so numeric and boolean targets parse
//! the stored string on demand.

use crate::error::{SerdeError, UclError};
use crate::parser::{DecoderOptions, Parser};
use crate::value::{parse_bool, Array, Map, Value};
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, Visitor};
use std::io::Read;
use std::str::FromStr;

/// Deserializer over an owned [`Value`]
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    fn mismatch(&self, expected: &str) -> UclError {
        UclError::Serde(SerdeError::TypeMismatch {
            expected: expected.to_string(),
            found: describe(&self.value),
        })
    }

    /// Parses scalar text into a primitive
    fn parse<T: FromStr>(&self, expected: &str) -> Result<T, UclError> {
        self.value
            .as_str()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| self.mismatch(expected))
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string {:?}", s),
        other => other.type_name().to_string(),
    }
}

impl<'de> IntoDeserializer<'de, UclError> for Value {
    type Deserializer = ValueDeserializer;

    fn into_deserializer(self) -> ValueDeserializer {
        ValueDeserializer::new(self)
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = UclError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::String(s) => visitor.visit_string(s),
            Value::Map(map) => visitor.visit_map(UclMapAccess::new(map)),
            Value::Array(arr) => visitor.visit_seq(UclSeqAccess::new(arr)),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value.as_str().and_then(parse_bool) {
            Some(b) => visitor.visit_bool(b),
            None => Err(self.mismatch("boolean")),
        }
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i8(self.parse("i8")?)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i16(self.parse("i16")?)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i32(self.parse("i32")?)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i64(self.parse("i64")?)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u8(self.parse("u8")?)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u16(self.parse("u16")?)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u32(self.parse("u32")?)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u64(self.parse("u64")?)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_f32(self.parse("f32")?)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_f64(self.parse("f64")?)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let mut chars = self.value.as_str().unwrap_or_default().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(self.mismatch("single character")),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(s) => visitor.visit_string(s),
            _ => Err(self.mismatch("string")),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(s) => visitor.visit_byte_buf(s.into_bytes()),
            _ => Err(self.mismatch("string")),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            _ => Err(self.mismatch("null")),
        }
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Array(arr) => visitor.visit_seq(UclSeqAccess::new(arr)),
            // a key given once holds a plain value rather than an array
            Value::Null => visitor.visit_seq(UclSeqAccess::new(Box::default())),
            single => {
                let mut arr = Array::new();
                arr.push(single);
                visitor.visit_seq(UclSeqAccess::new(Box::new(arr)))
            }
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Map(map) => visitor.visit_map(UclMapAccess::new(map)),
            // `section;` declares an empty block
            Value::Null => visitor.visit_map(UclMapAccess::new(Map::new())),
            _ => Err(self.mismatch("map")),
        }
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            // Unit variant (string)
            Value::String(s) => visitor.visit_enum(UclEnumAccess::new_unit(s)),
            // Data variant (map with single key)
            Value::Map(map) if map.len() == 1 => {
                match map.into_iter().next() {
                    Some((variant, value)) => {
                        visitor.visit_enum(UclEnumAccess::new_data(variant, value))
                    }
                    None => Err(UclError::Serde(SerdeError::Custom(
                        "empty map for enum".to_string(),
                    ))),
                }
            }
            _ => Err(self.mismatch("enum (string or single-key map)")),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

/// Sequence access for UCL arrays
struct UclSeqAccess {
    array: std::vec::IntoIter<Value>,
}

impl UclSeqAccess {
    fn new(array: Box<Array>) -> Self {
        Self {
            array: array.into_vec().into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for UclSeqAccess {
    type Error = UclError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        match self.array.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.array.len())
    }
}

/// Map access for UCL maps
struct UclMapAccess {
    entries: indexmap::map::IntoIter<String, Value>,
    current_value: Option<Value>,
}

impl UclMapAccess {
    fn new(map: Map) -> Self {
        Self {
            entries: map.into_iter(),
            current_value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for UclMapAccess {
    type Error = UclError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        match self.entries.next() {
            Some((key, value)) => {
                self.current_value = Some(value);
                seed.deserialize(ValueDeserializer::new(Value::String(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        match self.current_value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(UclError::Serde(SerdeError::Custom(
                "No value available for map entry".to_string(),
            ))),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Enum access for UCL enum deserialization
struct UclEnumAccess {
    variant_name: String,
    variant_value: Option<Value>,
}

impl UclEnumAccess {
    fn new_unit(variant_name: String) -> Self {
        Self {
            variant_name,
            variant_value: None,
        }
    }

    fn new_data(variant_name: String, variant_value: Value) -> Self {
        Self {
            variant_name,
            variant_value: Some(variant_value),
        }
    }
}

impl<'de> de::EnumAccess<'de> for UclEnumAccess {
    type Error = UclError;
    type Variant = UclVariantAccess;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let name = ValueDeserializer::new(Value::String(self.variant_name));
        let variant = seed.deserialize(name)?;
        Ok((variant, UclVariantAccess::new(self.variant_value)))
    }
}

/// Variant access for UCL enum variants
struct UclVariantAccess {
    value: Option<Value>,
}

impl UclVariantAccess {
    fn new(value: Option<Value>) -> Self {
        Self { value }
    }
}

impl<'de> de::VariantAccess<'de> for UclVariantAccess {
    type Error = UclError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.value {
            None | Some(Value::Null) => Ok(()),
            Some(_) => Err(UclError::Serde(SerdeError::Custom(
                "Expected unit variant, found data".to_string(),
            ))),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(UclError::Serde(SerdeError::Custom(
                "Expected newtype variant data, found unit".to_string(),
            ))),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(value) => de::Deserializer::deserialize_seq(ValueDeserializer::new(value), visitor),
            None => Err(UclError::Serde(SerdeError::Custom(
                "Expected tuple variant data, found unit".to_string(),
            ))),
        }
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(Value::Map(map)) => visitor.visit_map(UclMapAccess::new(map)),
            Some(_) => Err(UclError::Serde(SerdeError::Custom(
                "Expected struct variant data (map), found other type".to_string(),
            ))),
            None => Err(UclError::Serde(SerdeError::Custom(
                "Expected struct variant data, found unit".to_string(),
            ))),
        }
    }
}

/// Deserializes a decoded value into a Rust type
pub fn from_value<T>(value: Value) -> Result<T, UclError>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

/// Convenience function to deserialize UCL text into a Rust type
pub fn from_str<T>(s: &str) -> Result<T, UclError>
where
    T: DeserializeOwned,
{
    from_reader(s.as_bytes())
}

/// Convenience function to deserialize UCL from any reader
pub fn from_reader<T, R>(reader: R) -> Result<T, UclError>
where
    T: DeserializeOwned,
    R: Read,
{
    from_reader_with_options(reader, DecoderOptions::default())
}

/// Convenience function to deserialize UCL with custom decoder options
pub fn from_reader_with_options<T, R>(reader: R, options: DecoderOptions) -> Result<T, UclError>
where
    T: DeserializeOwned,
    R: Read,
{
    let document = Parser::with_options(reader, options).ucl()?;
    from_value(Value::Map(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Listener {
        port: u16,
        enabled: bool,
        ratio: f64,
        name: Option<String>,
    }

    #[test]
    fn test_scalar_coercion() {
        let listener: Listener = from_str("port 8080; enabled yes; ratio 0.5;").unwrap();
        assert_eq!(
            listener,
            Listener {
                port: 8080,
                enabled: true,
                ratio: 0.5,
                name: None,
            }
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = from_str::<Listener>("port eighty; enabled on; ratio 1;").unwrap_err();
        assert!(matches!(
            err,
            UclError::Serde(SerdeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_single_value_as_sequence() {
        #[derive(Deserialize)]
        struct Hosts {
            host: Vec<String>,
        }

        let one: Hosts = from_str("host a;").unwrap();
        assert_eq!(one.host, vec!["a"]);

        let many: Hosts = from_str("host a; host b;").unwrap();
        assert_eq!(many.host, vec!["a", "b"]);
    }

    #[test]
    fn test_enums() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "lowercase")]
        enum Mode {
            Fast,
            Limit(u32),
        }

        #[derive(Deserialize)]
        struct Config {
            a: Mode,
            b: Mode,
        }

        let config: Config = from_str("a fast; b { limit 10; }").unwrap();
        assert_eq!(config.a, Mode::Fast);
        assert_eq!(config.b, Mode::Limit(10));
    }

    #[test]
    fn test_empty_block_from_null() {
        #[derive(Debug, Deserialize, Default, PartialEq)]
        struct Section {
            #[serde(default)]
            items: Vec<String>,
        }

        #[derive(Deserialize)]
        struct Config {
            section: Section,
        }

        let config: Config = from_str("section;").unwrap();
        assert_eq!(config.section, Section::default());
    }

    #[test]
    fn test_from_value_roundtrips_through_generic_value() {
        let value: Value = from_str("a { b c; }").unwrap();
        assert_eq!(value["a"]["b"].as_str(), Some("c"));
    }
}
