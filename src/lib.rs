//! # binform — declarative binary format engine
//!
//! Describe the layout of a binary format once and use that single
//! description three ways: **parse** bytes into structured values,
//! **build** bytes back from values, and compute the encoded **size**.
//! The building block is the [`Construct`] trait; the library ships a set
//! of composable constructs that nest, repeat, adapt through user
//! transforms, depend on previously parsed fields, and reference each
//! other recursively.
//!
//! ## Construct kinds
//!
//! - Leaves: [`Pass`], [`Flag`], [`Bytes`], [`Integer`], [`Float`],
//!   [`Padding`], [`Const`]
//! - Adapters: [`Adapted`], [`Repeat`], [`RepeatExactly`], [`Prefixed`],
//!   [`Padded`], [`Aligned`]
//! - Text: [`PaddedString`], [`PascalString`], [`CString`], [`Line`]
//! - Aggregates: [`Struct`], [`Contextual`], [`Computed`]
//! - Conditionals: [`If`], [`Switch`], [`Enum`], [`Raise`]
//! - Bit-level: [`BitFields`]
//! - Stream and diagnostics: [`Offset`], [`Tell`], [`Debug`], [`Checksum`]
//!
//! ## Example
//!
//! A tiny image record whose pixel count depends on two earlier fields:
//!
//! ```
//! use binform::{record, Bytes, Const, Construct, Contextual, Integer, Struct, Value};
//!
//! let bitmap = Struct::new()
//!     .field("signature", Const::new(b"BMP".to_vec()))
//!     .field("width", Integer::new(1))
//!     .field("height", Integer::new(1))
//!     .field(
//!         "pixels",
//!         Contextual::new(|ctx| {
//!             Ok(Box::new(Bytes::new(ctx.uint("width")? * ctx.uint("height")?)))
//!         }),
//!     );
//!
//! let parsed = bitmap.parse(b"BMP\x03\x02\x07\x08\x09\x0b\x0c\x0d").expect("parse");
//! assert_eq!(parsed.as_record().unwrap()["width"], Value::Uint(3));
//!
//! let bytes = bitmap
//!     .build(&Value::Record(record([
//!         ("width", Value::Uint(1)),
//!         ("height", Value::Uint(2)),
//!         ("pixels", Value::Bytes(vec![0xaa, 0xbb])),
//!     ])))
//!     .expect("build");
//! assert_eq!(bytes, b"BMP\x01\x02\xaa\xbb");
//! ```
//!
//! ## Contracts
//!
//! - Fields parse and build strictly in declaration order; a field's value
//!   is visible in the [`Context`] to every later sibling and to user
//!   callbacks.
//! - Every construct is transactional: on failure the stream position and
//!   the context scope are restored to their entry state, which is what
//!   lets [`Repeat`] treat a child failure as a clean end of sequence.
//! - Constructs are immutable after creation and freely shareable across
//!   threads ([`shared`] wraps one in an `Arc`).

pub mod adapter;
pub mod aggregate;
pub mod bits;
pub mod checksum;
pub mod cond;
pub mod construct;
pub mod context;
pub mod error;
pub mod inspect;
pub mod leaf;
pub mod stream;
pub mod text;
pub mod value;

pub use adapter::{Adapted, Aligned, Padded, Prefixed, Repeat, RepeatExactly};
pub use aggregate::{Computed, Contextual, Struct};
pub use bits::BitFields;
pub use checksum::Checksum;
pub use cond::{Enum, If, Raise, Switch};
pub use construct::{shared, Construct, Recursive};
pub use context::Context;
pub use error::{Error, ErrorKind, Result};
pub use inspect::{Debug, Offset, Tell};
pub use leaf::{Bytes, Const, Endianness, Flag, Float, Integer, Padding, Pass};
pub use stream::Stream;
pub use text::{CString, Line, PadDirection, PaddedString, PascalString, TextEncoding};
pub use value::{record, Record, Value};
