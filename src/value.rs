//! Document model produced by the parser and consumed by the encoder
//!
//! Every scalar is kept as the exact text that appeared in the input; numeric
//! and boolean interpretation is left to the accessors and to typed extraction.

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Index;

/// Reserved key under which a map's insertion order is exported.
///
/// The encoder never writes an entry with this key.
pub const KEY_ORDER: &str = "--ucl-keyorder--";

/// UCL array type, inline for up to four elements
pub type Array = SmallVec<[Value; 4]>;

static NULL: Value = Value::Null;

/// A decoded UCL value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Key present without a value
    #[default]
    Null,
    /// Scalar text, exactly as written (after unescaping)
    String(String),
    Map(Map),
    /// Repeated keys and `[ ... ]` lists
    Array(Box<Array>),
}

impl Value {
    /// Returns a string representation of the value kind
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Map(_) => "map",
            Value::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns the text if this is a String variant
    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    /// Returns the map if this is a Map variant
    pub fn as_map(&self) -> Option<&Map> {
        if let Value::Map(map) = self {
            Some(map)
        } else {
            None
        }
    }

    /// Returns the elements if this is an Array variant
    pub fn as_array(&self) -> Option<&Array> {
        if let Value::Array(arr) = self {
            Some(arr)
        } else {
            None
        }
    }

    /// Interprets the text as a boolean.
    ///
    /// Accepts `true/yes/on` and `false/no/off`, ignoring ASCII case.
    pub fn as_bool(&self) -> Option<bool> {
        parse_bool(self.as_str()?)
    }

    /// Interprets the text as a signed integer
    pub fn as_i64(&self) -> Option<i64> {
        self.as_str()?.trim().parse().ok()
    }

    /// Interprets the text as an unsigned integer
    pub fn as_u64(&self) -> Option<u64> {
        self.as_str()?.trim().parse().ok()
    }

    /// Interprets the text as a floating point number
    pub fn as_f64(&self) -> Option<f64> {
        self.as_str()?.trim().parse().ok()
    }

    /// Looks up a key if this is a map
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }
}

pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if ["true", "yes", "on"].iter().any(|t| text.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if ["false", "no", "off"]
        .iter()
        .any(|t| text.eq_ignore_ascii_case(t))
    {
        Some(false)
    } else {
        None
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Array> for Value {
    fn from(arr: Array) -> Self {
        Value::Array(Box::new(arr))
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(Box::new(Array::from_vec(values)))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl Index<&str> for Value {
    type Output = Value;

    /// Missing keys and non-map values index to `Null`
    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        self.as_array()
            .and_then(|arr| arr.get(index))
            .unwrap_or(&NULL)
    }
}

/// Keyed collection with optional insertion-order tracking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    entries: IndexMap<String, Value>,
    key_order: Option<Vec<String>>,
}

impl Map {
    /// Creates a map without key-order tracking
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map that records the order in which keys first appear
    pub fn with_key_order() -> Self {
        Self {
            entries: IndexMap::new(),
            key_order: Some(Vec::new()),
        }
    }

    /// Creates a map with or without key-order tracking
    pub fn tracking(key_order: bool) -> Self {
        if key_order {
            Self::with_key_order()
        } else {
            Self::new()
        }
    }

    /// Adds a value, promoting repeated keys to arrays.
    ///
    /// The first occurrence is stored as is, the second turns the entry into a
    /// two-element array and later ones are appended to it. An entry that was
    /// already an array (from `[ ... ]`) is appended to directly.
    pub fn append(&mut self, key: String, value: Value) {
        match self.entries.get_mut(&key) {
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = std::mem::take(existing);
                let mut arr = Array::new();
                arr.push(first);
                arr.push(value);
                *existing = Value::Array(Box::new(arr));
            }
            None => {
                if let Some(order) = &mut self.key_order {
                    order.push(key.clone());
                }
                self.entries.insert(key, value);
            }
        }
    }

    /// Sets a value, replacing any previous one
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        if !self.entries.contains_key(&key) {
            if let Some(order) = &mut self.key_order {
                order.push(key.clone());
            }
        }
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes an entry and its key-order record
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if let Some(order) = &mut self.key_order {
            order.retain(|k| k != key);
        }
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in storage order
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.entries.keys()
    }

    /// Keys in first-seen order, if tracked
    pub fn key_order(&self) -> Option<&[String]> {
        self.key_order.as_deref()
    }

    /// Replaces the key-order record
    pub fn set_key_order(&mut self, order: Option<Vec<String>>) {
        self.key_order = order;
    }

    /// Underlying entry table
    pub fn entries(&self) -> &IndexMap<String, Value> {
        &self.entries
    }

    /// Entries in the order the encoder writes them.
    ///
    /// With a key-order record only the recorded keys are listed (a recorded
    /// key without an entry yields `None`); otherwise all entries are listed in
    /// storage order. The reserved [`KEY_ORDER`] key is always skipped.
    pub fn ordered(&self) -> Vec<(&str, Option<&Value>)> {
        match &self.key_order {
            Some(order) => order
                .iter()
                .filter(|key| key.as_str() != KEY_ORDER)
                .map(|key| (key.as_str(), self.entries.get(key)))
                .collect(),
            None => self
                .entries
                .iter()
                .filter(|(key, _)| key.as_str() != KEY_ORDER)
                .map(|(key, value)| (key.as_str(), Some(value)))
                .collect(),
        }
    }
}

impl Index<&str> for Map {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Map {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    /// Collects into an untracked map with the promotion policy applied
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (key, value) in iter {
            map.append(key.into(), value.into());
        }
        map
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Map(map) => map.serialize(serializer),
            Value::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for element in arr.iter() {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Map {
    /// Exports the key-order record under [`KEY_ORDER`], ahead of the entries
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.entries.len() + usize::from(self.key_order.is_some());
        let mut out = serializer.serialize_map(Some(len))?;
        if let Some(order) = &self.key_order {
            out.serialize_entry(KEY_ORDER, order)?;
        }
        for (key, value) in &self.entries {
            if key != KEY_ORDER {
                out.serialize_entry(key, value)?;
            }
        }
        out.end()
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a UCL value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut arr = Array::new();
        while let Some(element) = seq.next_element()? {
            arr.push(element);
        }
        Ok(Value::Array(Box::new(arr)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            if key == KEY_ORDER {
                let order: Vec<String> = access.next_value()?;
                map.key_order = Some(order);
            } else {
                let value: Value = access.next_value()?;
                map.entries.insert(key, value);
            }
        }
        Ok(Value::Map(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Map {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match deserializer.deserialize_map(ValueVisitor)? {
            Value::Map(map) => Ok(map),
            other => Err(de::Error::invalid_type(
                de::Unexpected::Other(other.type_name()),
                &"a UCL map",
            )),
        }
    }
}
