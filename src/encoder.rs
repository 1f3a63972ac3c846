//! UCL encoder
//!
//! Writes documents back out as UCL text that the parser reads back to an equal
//! tree. Maps, arrays and scalars come from [`Value`]s; arbitrary user types take
//! part through the [`Record`] trait, which describes a type as a table of named
//! fields with per-selector tags.

use crate::error::{EncodeError, UclError};
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::hash::BuildHasher;
use std::io::Write;

/// Strings longer than this many bytes are heredoc candidates
pub const HEREDOC_MIN_LEN: usize = 160;
/// Heredoc candidates need more than this many line breaks
pub const HEREDOC_MIN_NEWLINES: usize = 3;
/// Terminator tag used for heredoc output
pub const HEREDOC_TAG: &str = "EOSTR";

/// Options for UCL output.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// Indentation unit (default: three spaces). Empty selects compact output
    /// with no line breaks.
    pub indent: String,
    /// Tag selector consulted for record field names (default: `ucl`)
    pub field_tag: String,
    /// Text written for null values (default: nothing)
    pub null_literal: String,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            indent: "   ".to_string(),
            field_tag: "ucl".to_string(),
            null_literal: String::new(),
        }
    }
}

impl EncoderOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-line output.
    pub fn compact() -> Self {
        Self::default().with_indent("")
    }

    /// Set the indentation unit.
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Set the record tag selector.
    pub fn with_field_tag(mut self, field_tag: impl Into<String>) -> Self {
        self.field_tag = field_tag.into();
        self
    }

    /// Set the text written for nulls.
    pub fn with_null_literal(mut self, null_literal: impl Into<String>) -> Self {
        self.null_literal = null_literal.into();
        self
    }
}

/// A user type that encodes as a map of its fields
pub trait Record {
    /// Describes the fields in declaration order
    fn fields(&self) -> Result<Vec<Field<'_>>, EncodeError>;
}

/// One field of a [`Record`]
#[derive(Clone)]
pub struct Field<'a> {
    pub name: &'a str,
    /// `(selector, text)` pairs, e.g. `("ucl", "listen,omitempty")`
    pub tags: Vec<(&'a str, &'a str)>,
    /// Unexported fields are only written when a tag names them
    pub exported: bool,
    /// Embedded records contribute their own fields to the enclosing map
    pub embedded: bool,
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    /// An exported field
    pub fn new<T: ToField + ?Sized>(name: &'a str, value: &'a T) -> Self {
        Self::with_value(name, value.to_field())
    }

    /// An unexported field
    pub fn hidden<T: ToField + ?Sized>(name: &'a str, value: &'a T) -> Self {
        let mut field = Self::new(name, value);
        field.exported = false;
        field
    }

    /// A field holding a nested record
    pub fn record<R: Record>(name: &'a str, record: &'a R) -> Self {
        Self::with_value(name, FieldValue::Record(record))
    }

    /// An embedded record, spliced into the enclosing map when present
    pub fn embedded<R: Record>(name: &'a str, record: Option<&'a R>) -> Self {
        let value = match record {
            Some(record) => FieldValue::Record(record),
            None => FieldValue::Null,
        };
        let mut field = Self::with_value(name, value);
        field.embedded = true;
        field
    }

    /// An exported field with a prepared value
    pub fn with_value(name: &'a str, value: FieldValue<'a>) -> Self {
        Self {
            name,
            tags: Vec::new(),
            exported: true,
            embedded: false,
            value,
        }
    }

    /// Attaches tag text for a selector
    pub fn tag(mut self, selector: &'a str, text: &'a str) -> Self {
        self.tags.push((selector, text));
        self
    }

    /// Looks up the tag text for a selector
    pub fn tag_for(&self, selector: &str) -> Option<&'a str> {
        self.tags
            .iter()
            .find(|(name, _)| *name == selector)
            .map(|(_, text)| *text)
    }
}

/// Borrowed view of anything the encoder can write
#[derive(Clone)]
pub enum FieldValue<'a> {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(&'a str),
    Value(&'a Value),
    Map(&'a Map),
    Record(&'a dyn Record),
    Seq(Vec<FieldValue<'a>>),
    /// Map-like collection; every key must be a string
    Pairs(Vec<(FieldValue<'a>, FieldValue<'a>)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Null,
    Scalar,
    Sequence,
    Entries,
}

impl FieldValue<'_> {
    /// Returns a string representation of the value kind for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) | FieldValue::UInt(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
            FieldValue::Value(value) => value.type_name(),
            FieldValue::Map(_) => "map",
            FieldValue::Record(_) => "record",
            FieldValue::Seq(_) => "sequence",
            FieldValue::Pairs(_) => "map",
        }
    }

    fn shape(&self) -> Shape {
        match self {
            FieldValue::Null | FieldValue::Value(Value::Null) => Shape::Null,
            FieldValue::Seq(_) | FieldValue::Value(Value::Array(_)) => Shape::Sequence,
            FieldValue::Map(_)
            | FieldValue::Record(_)
            | FieldValue::Pairs(_)
            | FieldValue::Value(Value::Map(_)) => Shape::Entries,
            FieldValue::Bool(_)
            | FieldValue::Int(_)
            | FieldValue::UInt(_)
            | FieldValue::Float(_)
            | FieldValue::Str(_)
            | FieldValue::Value(Value::String(_)) => Shape::Scalar,
        }
    }
}

/// Conversion into an encodable view
pub trait ToField {
    fn to_field(&self) -> FieldValue<'_>;
}

macro_rules! impl_to_field {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl ToField for $t {
                fn to_field(&self) -> FieldValue<'_> {
                    FieldValue::$variant(*self as $target)
                }
            }
        )*
    };
}

impl_to_field!(Int as i64: i8, i16, i32, i64, isize);
impl_to_field!(UInt as u64: u8, u16, u32, u64, usize);
impl_to_field!(Float as f64: f32, f64);

impl ToField for bool {
    fn to_field(&self) -> FieldValue<'_> {
        FieldValue::Bool(*self)
    }
}

impl ToField for str {
    fn to_field(&self) -> FieldValue<'_> {
        FieldValue::Str(self)
    }
}

impl ToField for String {
    fn to_field(&self) -> FieldValue<'_> {
        FieldValue::Str(self)
    }
}

impl ToField for Value {
    fn to_field(&self) -> FieldValue<'_> {
        FieldValue::Value(self)
    }
}

impl ToField for Map {
    fn to_field(&self) -> FieldValue<'_> {
        FieldValue::Map(self)
    }
}

impl<T: ToField + ?Sized> ToField for &T {
    fn to_field(&self) -> FieldValue<'_> {
        (**self).to_field()
    }
}

impl<T: ToField + ?Sized> ToField for Box<T> {
    fn to_field(&self) -> FieldValue<'_> {
        (**self).to_field()
    }
}

impl<T: ToField> ToField for Option<T> {
    fn to_field(&self) -> FieldValue<'_> {
        match self {
            Some(value) => value.to_field(),
            None => FieldValue::Null,
        }
    }
}

impl<T: ToField> ToField for [T] {
    fn to_field(&self) -> FieldValue<'_> {
        FieldValue::Seq(self.iter().map(ToField::to_field).collect())
    }
}

impl<T: ToField> ToField for Vec<T> {
    fn to_field(&self) -> FieldValue<'_> {
        self.as_slice().to_field()
    }
}

impl<K: ToField, V: ToField> ToField for BTreeMap<K, V> {
    fn to_field(&self) -> FieldValue<'_> {
        FieldValue::Pairs(self.iter().map(|(k, v)| (k.to_field(), v.to_field())).collect())
    }
}

impl<K: ToField, V: ToField, S: BuildHasher> ToField for HashMap<K, V, S> {
    fn to_field(&self) -> FieldValue<'_> {
        FieldValue::Pairs(self.iter().map(|(k, v)| (k.to_field(), v.to_field())).collect())
    }
}

impl<K: ToField, V: ToField, S: BuildHasher> ToField for IndexMap<K, V, S> {
    fn to_field(&self) -> FieldValue<'_> {
        FieldValue::Pairs(self.iter().map(|(k, v)| (k.to_field(), v.to_field())).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Map,
    Array,
}

/// UCL writer over any `io::Write`
pub struct Encoder<W> {
    writer: W,
    options: EncoderOptions,
    newline: &'static str,
}

impl<W: Write> Encoder<W> {
    /// Create a new encoder with default options.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, EncoderOptions::default())
    }

    /// Create a new encoder with the given options.
    pub fn with_options(writer: W, options: EncoderOptions) -> Self {
        let newline = if options.indent.is_empty() { "" } else { "\n" };
        Self {
            writer,
            options,
            newline,
        }
    }

    /// Consume the encoder and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes a value; a map becomes a top-level document
    pub fn encode<T: ToField + ?Sized>(&mut self, value: &T) -> Result<(), UclError> {
        let root = value.to_field();
        self.write_node(&root, Parent::Map, 0)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a record as a top-level document
    pub fn encode_record(&mut self, record: &dyn Record) -> Result<(), UclError> {
        self.write_node(&FieldValue::Record(record), Parent::Map, 0)?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<(), UclError> {
        self.writer.write_all(s.as_bytes())?;
        Ok(())
    }

    fn write_indent(&mut self, depth: usize) -> Result<(), UclError> {
        for _ in 0..depth {
            self.writer.write_all(self.options.indent.as_bytes())?;
        }
        Ok(())
    }

    fn write_newline(&mut self) -> Result<(), UclError> {
        self.write_str(self.newline)
    }

    /// Map entries end with `;` unless they sit inside an array element on
    /// their own lines
    fn terminates(&self, parent: Parent) -> bool {
        parent == Parent::Map || self.newline.is_empty()
    }

    fn write_node(
        &mut self,
        value: &FieldValue<'_>,
        parent: Parent,
        depth: usize,
    ) -> Result<(), UclError> {
        match value {
            FieldValue::Value(Value::Map(map)) => self.write_map(map, parent, depth),
            FieldValue::Map(map) => self.write_map(map, parent, depth),
            FieldValue::Record(record) => self.write_record(*record, depth),
            FieldValue::Pairs(pairs) => self.write_pairs(pairs, parent, depth),
            FieldValue::Value(Value::Array(arr)) => {
                let items: Vec<FieldValue<'_>> = arr.iter().map(FieldValue::Value).collect();
                self.write_seq(&items, depth)
            }
            FieldValue::Seq(items) => self.write_seq(items, depth),
            scalar => self.write_scalar(scalar, parent, depth),
        }
    }

    fn write_entry(
        &mut self,
        key: &str,
        value: &FieldValue<'_>,
        depth: usize,
        terminate: bool,
    ) -> Result<(), UclError> {
        self.write_indent(depth)?;
        self.write_str(&quote_key(key))?;

        let shape = value.shape();
        if shape != Shape::Null {
            self.write_str(" ")?;
        }
        match shape {
            Shape::Sequence => self.write_node(value, Parent::Map, depth)?,
            Shape::Entries => {
                self.write_str("{")?;
                self.write_newline()?;
                self.write_node(value, Parent::Map, depth + 1)?;
                self.write_indent(depth)?;
                self.write_str("}")?;
            }
            Shape::Null | Shape::Scalar => self.write_scalar(value, Parent::Map, depth + 1)?,
        }

        if terminate {
            self.write_str(";")?;
        }
        Ok(())
    }

    fn write_map(&mut self, map: &Map, parent: Parent, depth: usize) -> Result<(), UclError> {
        let terminate = self.terminates(parent);
        let entries = map.ordered();

        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                self.write_newline()?;
            }
            let value = value.map_or(FieldValue::Null, FieldValue::Value);
            self.write_entry(key, &value, depth, terminate)?;
        }
        if !entries.is_empty() {
            self.write_newline()?;
        }
        Ok(())
    }

    fn write_pairs(
        &mut self,
        pairs: &[(FieldValue<'_>, FieldValue<'_>)],
        parent: Parent,
        depth: usize,
    ) -> Result<(), UclError> {
        let terminate = self.terminates(parent);

        for (i, (key, value)) in pairs.iter().enumerate() {
            let key = match key {
                FieldValue::Str(s) => *s,
                FieldValue::Value(Value::String(s)) => s.as_str(),
                other => {
                    return Err(EncodeError::KeyMustBeAString {
                        found: other.kind_name(),
                    }
                    .into());
                }
            };
            if i > 0 {
                self.write_newline()?;
            }
            self.write_entry(key, value, depth, terminate)?;
        }
        if !pairs.is_empty() {
            self.write_newline()?;
        }
        Ok(())
    }

    fn write_record(&mut self, record: &dyn Record, depth: usize) -> Result<(), UclError> {
        let mut fields = Vec::new();
        self.collect_fields(record, &mut fields)?;

        for (i, (name, value)) in fields.iter().enumerate() {
            if i > 0 {
                self.write_newline()?;
            }
            self.write_entry(name, value, depth, true)?;
        }
        if !fields.is_empty() {
            self.write_newline()?;
        }
        Ok(())
    }

    /// Resolves output names, flattening embedded records in place
    fn collect_fields<'r>(
        &self,
        record: &'r dyn Record,
        out: &mut Vec<(String, FieldValue<'r>)>,
    ) -> Result<(), UclError> {
        for field in record.fields()? {
            let tag = field.tag_for(&self.options.field_tag);
            if tag == Some("-") {
                continue;
            }

            if field.embedded {
                if let FieldValue::Record(inner) = field.value {
                    self.collect_fields(inner, out)?;
                }
                continue;
            }

            let renamed = tag
                .and_then(|text| text.split(',').next())
                .filter(|name| !name.is_empty());
            let name = match renamed {
                Some(name) => name.to_string(),
                None if field.exported => field.name.to_string(),
                None => continue,
            };
            out.push((name, field.value));
        }
        Ok(())
    }

    fn write_seq(&mut self, items: &[FieldValue<'_>], depth: usize) -> Result<(), UclError> {
        self.write_str("[")?;

        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write_str(",")?;
            }
            self.write_newline()?;
            match item.shape() {
                Shape::Sequence => {
                    self.write_indent(depth + 1)?;
                    self.write_node(item, Parent::Array, depth + 1)?;
                }
                Shape::Entries => {
                    self.write_indent(depth + 1)?;
                    self.write_str("{")?;
                    self.write_newline()?;
                    self.write_node(item, Parent::Array, depth + 2)?;
                    self.write_indent(depth + 1)?;
                    self.write_str("}")?;
                }
                Shape::Null | Shape::Scalar => self.write_scalar(item, Parent::Array, depth + 1)?,
            }
        }

        if !items.is_empty() {
            self.write_newline()?;
            self.write_indent(depth)?;
        }
        // a heredoc terminator must end its line
        if self.newline.is_empty() && items.last().is_some_and(is_heredoc_item) {
            self.write_str("\n")?;
        }
        self.write_str("]")
    }

    fn write_scalar(
        &mut self,
        value: &FieldValue<'_>,
        parent: Parent,
        depth: usize,
    ) -> Result<(), UclError> {
        if parent == Parent::Array {
            self.write_indent(depth)?;
        }

        match value {
            FieldValue::Null | FieldValue::Value(Value::Null) => {
                if !self.options.null_literal.is_empty() {
                    write!(self.writer, " {}", self.options.null_literal)?;
                }
                Ok(())
            }
            FieldValue::Bool(b) => self.write_str(if *b { "true" } else { "false" }),
            FieldValue::Int(n) => self.write_str(&n.to_string()),
            FieldValue::UInt(n) => self.write_str(&n.to_string()),
            FieldValue::Float(n) => self.write_str(&n.to_string()),
            FieldValue::Str(s) => self.write_str(&render_scalar(s, parent)),
            FieldValue::Value(Value::String(s)) => self.write_str(&render_scalar(s, parent)),
            other => Err(EncodeError::custom(format!(
                "cannot write {} as a scalar",
                other.kind_name()
            ))
            .into()),
        }
    }
}

/// Renders a string scalar written as a map value.
///
/// Long text with several line breaks becomes a heredoc, the empty string is
/// `""`, a slash literal that scans back unchanged is written as is and
/// everything else goes through [`quote_if_needed`].
pub fn format_scalar(s: &str) -> Cow<'_, str> {
    render_scalar(s, Parent::Map)
}

fn render_scalar(s: &str, parent: Parent) -> Cow<'_, str> {
    if fits_heredoc(s) {
        Cow::Owned(format!("<<{HEREDOC_TAG}\n{s}\n{HEREDOC_TAG}"))
    } else if s.is_empty() {
        Cow::Borrowed("\"\"")
    } else if is_slash_literal(s) && (parent == Parent::Map || is_closed_slash_literal(s)) {
        // only a closing `/` ends a literal before the `,` or `]` that follows
        Cow::Borrowed(s)
    } else {
        quote_if_needed(s)
    }
}

/// True when `s` is long enough for a heredoc and no body line would end it
fn fits_heredoc(s: &str) -> bool {
    s.len() > HEREDOC_MIN_LEN
        && s.bytes().filter(|&b| b == b'\n').count() > HEREDOC_MIN_NEWLINES
        && !s.ends_with('\r')
        && !s.split('\n').any(|line| {
            line.strip_prefix(HEREDOC_TAG).is_some_and(|rest| {
                rest.is_empty() || rest == "\r" || rest.starts_with([';', ','])
            })
        })
}

fn is_heredoc_item(item: &FieldValue<'_>) -> bool {
    match item {
        FieldValue::Str(s) => fits_heredoc(s),
        FieldValue::Value(Value::String(s)) => fits_heredoc(s),
        _ => false,
    }
}

fn is_closed_slash_literal(s: &str) -> bool {
    s.len() > 1 && s.ends_with('/')
}

/// True when `s` scans back as a single slash-literal token
fn is_slash_literal(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('/') else {
        return false;
    };
    let body = rest.strip_suffix('/').unwrap_or(rest);
    !rest.starts_with('*')
        && !body
            .bytes()
            .any(|b| b <= b' ' || matches!(b, b'/' | b';' | b'\\'))
}

/// Renders a map key: `""` when empty, otherwise [`quote_if_needed`]
pub fn quote_key(key: &str) -> Cow<'_, str> {
    if key.is_empty() {
        Cow::Borrowed("\"\"")
    } else {
        quote_if_needed(key)
    }
}

/// Leaves ASCII-alphanumeric text bare and quotes anything else
pub fn quote_if_needed(s: &str) -> Cow<'_, str> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(quote(s))
    }
}

/// Double-quotes text, escaping quotes, backslashes and control characters
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{0007}' => out.push_str("\\a"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{000B}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{7F}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                let _ = if (c as u32) <= 0xFFFF {
                    write!(out, "\\u{:04x}", c as u32)
                } else {
                    write!(out, "\\U{:08x}", c as u32)
                };
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
