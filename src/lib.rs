//! # UCL Codec
//!
//! A streaming reader and writer for UCL, the nginx-style configuration
//! language, with serde integration for typed extraction.
//!
//! ## Overview
//!
//! Decoding runs in two stages. The [`Scanner`] turns any `io::Read` into
//! classified tokens, keeping its state across fixed-size reads, and the
//! [`Parser`] assembles those tokens into a [`Map`] of [`Value`]s. The
//! [`Encoder`] writes documents back out in a form the parser reads back to an
//! equal tree.
//!
//! ## Key Features
//!
//! - **Streaming Input**: Inputs of any size are read in 4 KiB chunks
//! - **Relaxed Syntax**: Optional `=`/`:`, optional `;`, `key1 key2 value` nesting
//! - **Repeated Keys**: Collected into arrays in order of appearance
//! - **Multiple String Formats**: Double-quoted, single-quoted, slash literals and heredocs
//! - **Key Order**: Maps remember the order in which keys first appeared
//! - **Round-Trip Encoding**: Decode, encode and decode again gives an equal tree
//! - **Records**: Encode your own types through a field-table trait
//!
//! ## Basic Usage
//!
//! ```rust
//! use ucl_codec::{decode_str, to_string};
//!
//! let doc = decode_str("server { host localhost; port 8080; }\nlisten 80; listen 443;")?;
//! assert_eq!(doc["server"]["host"].as_str(), Some("localhost"));
//! assert_eq!(doc["server"]["port"].as_i64(), Some(8080));
//! assert_eq!(doc["listen"].as_array().map(|a| a.len()), Some(2));
//!
//! let text = to_string(&doc)?;
//! assert_eq!(decode_str(&text)?, doc);
//! # Ok::<(), ucl_codec::UclError>(())
//! ```
//!
//! ## Typed Extraction
//!
//! ```rust
//! use serde::Deserialize;
//! use ucl_codec::from_str;
//!
//! #[derive(Debug, Deserialize)]
//! struct ServerConfig {
//!     name: String,
//!     port: u16,
//!     debug: bool,
//! }
//!
//! let ucl_text = r#"
//!     name = "my-server"
//!     port = 8080
//!     debug = true
//! "#;
//!
//! let config: ServerConfig = from_str(ucl_text)?;
//! assert_eq!(config.port, 8080);
//! # Ok::<(), ucl_codec::UclError>(())
//! ```
//!
//! ## Encoding Records
//!
//! ```rust
//! use ucl_codec::{to_string_record, EncodeError, EncoderOptions, Field, Record};
//!
//! struct Listener {
//!     port: u16,
//!     tls: bool,
//! }
//!
//! impl Record for Listener {
//!     fn fields(&self) -> Result<Vec<Field<'_>>, EncodeError> {
//!         Ok(vec![
//!             Field::new("Port", &self.port).tag("ucl", "port"),
//!             Field::new("Tls", &self.tls),
//!         ])
//!     }
//! }
//!
//! let text = to_string_record(&Listener { port: 443, tls: true }, &EncoderOptions::compact())?;
//! assert_eq!(text, "port 443;Tls true;");
//! # Ok::<(), ucl_codec::UclError>(())
//! ```
//!
//! ## Error Handling
//!
//! Decoding stops at the first error; lexical and structural errors carry the
//! line where they were detected:
//!
//! ```rust
//! use ucl_codec::{decode_str, LexError, UclError};
//!
//! match decode_str("section {\n  a 1;\n]") {
//!     Err(UclError::Lex(LexError::MisplacedCloser { closer, line })) => {
//!         assert_eq!(closer, ']');
//!         assert_eq!(line, 3);
//!     }
//!     other => panic!("unexpected result: {:?}", other),
//! }
//! ```
//!
//! ## Diagnostics
//!
//! With [`DecoderOptions::trace`] enabled (the default) the scanner and parser
//! emit `tracing` events; they cost nothing unless a subscriber is installed.

pub mod deserializer;
pub mod encoder;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod value;

// Re-export main types and functions
pub use deserializer::{
    ValueDeserializer, from_reader, from_reader_with_options, from_str, from_value,
};
pub use encoder::{
    Encoder, EncoderOptions, Field, FieldValue, Record, ToField, format_scalar, quote,
    quote_if_needed,
};
pub use error::{EncodeError, LexError, ParseError, SerdeError, UclError};
pub use parser::{DecoderOptions, Parser};
pub use scanner::{Scanner, Token, TokenKind, unescape};
pub use value::{Array, KEY_ORDER, Map, Value};

use std::io::{Read, Write};

/// Decodes a whole document from a reader with default options
pub fn decode<R: Read>(reader: R) -> Result<Map, UclError> {
    Parser::new(reader).ucl()
}

/// Decodes a whole document from a reader
pub fn decode_with_options<R: Read>(reader: R, options: DecoderOptions) -> Result<Map, UclError> {
    Parser::with_options(reader, options).ucl()
}

/// Decodes a document held in memory
pub fn decode_str(input: &str) -> Result<Map, UclError> {
    decode(input.as_bytes())
}

/// Writes a value (usually a document [`Map`]) to a writer
pub fn encode<W, T>(writer: W, value: &T, options: &EncoderOptions) -> Result<(), UclError>
where
    W: Write,
    T: ToField + ?Sized,
{
    Encoder::with_options(writer, options.clone()).encode(value)
}

/// Writes a record to a writer
pub fn encode_record<W: Write>(
    writer: W,
    record: &dyn Record,
    options: &EncoderOptions,
) -> Result<(), UclError> {
    Encoder::with_options(writer, options.clone()).encode_record(record)
}

/// Encodes a value to a string with default options
pub fn to_string<T: ToField + ?Sized>(value: &T) -> Result<String, UclError> {
    to_string_with_options(value, &EncoderOptions::default())
}

/// Encodes a value to a string
pub fn to_string_with_options<T: ToField + ?Sized>(
    value: &T,
    options: &EncoderOptions,
) -> Result<String, UclError> {
    let mut out = Vec::new();
    encode(&mut out, value, options)?;
    into_text(out)
}

/// Encodes a record to a string
pub fn to_string_record(record: &dyn Record, options: &EncoderOptions) -> Result<String, UclError> {
    let mut out = Vec::new();
    encode_record(&mut out, record, options)?;
    into_text(out)
}

fn into_text(bytes: Vec<u8>) -> Result<String, UclError> {
    String::from_utf8(bytes).map_err(|e| EncodeError::custom(e).into())
}
