//! Schema-driven ASN.1 BER/DER TLV codec.
//!
//! Two symmetric surfaces: [`parser::Parser`] walks a [`schema::Schema`]
//! against a byte buffer and produces a [`value::Value`] tree; [`builder::Builder`]
//! walks the same schema against a tree and emits bytes. Primitive leaves are
//! opaque to the core: callers supply `decode`/`encode` callbacks (text
//! codecs, OID, INTEGER, BIT STRING, ... are the caller's concern, not
//! this crate's).

pub mod builder;
pub mod error;
pub mod header;
pub mod length;
pub mod parser;
pub mod schema;
pub mod tag;
pub mod util;
pub mod value;

pub use builder::{Builder, BuilderOptions};
pub use error::{TlvError, TlvResult};
pub use parser::{Parser, ParserOptions};
pub use schema::{choice, constructed, primitive, primitive_with_codec, repeated, Codec, ConstructedOptions, PrimitiveOptions, Schema};
pub use tag::{Tag, TagClass};
pub use value::Value;
