//! The construct contract: parse, build, and sizeof over one declaration.
//!
//! Every codec in the library implements [`Construct`]. The three
//! operations share a transactional guarantee: when a construct fails, the
//! stream position and the context scope are restored to their state at
//! construct entry. Combinators call children through [`parse_child`] /
//! [`build_child`], which enforce the rollback; Repeat relies on it to read
//! a child failure as a clean end-of-sequence.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::stream::Stream;
use crate::value::{Record, Value};

/// Predicate over the context (If).
pub type PredicateFn = Arc<dyn Fn(&Context) -> std::result::Result<bool, String> + Send + Sync>;
/// Context-dependent value (Computed, Switch selector).
pub type ValueFn = Arc<dyn Fn(&Context) -> std::result::Result<Value, String> + Send + Sync>;
/// Value transform (Adapted).
pub type MapFn = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;
/// Context-dependent byte string (Checksum data source).
pub type BytesFn = Arc<dyn Fn(&Context) -> std::result::Result<Vec<u8>, String> + Send + Sync>;
/// Digest function (Checksum).
pub type HashFn = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;
/// Late construct factory (Contextual).
pub type FactoryFn =
    Arc<dyn Fn(&Context) -> std::result::Result<Box<dyn Construct>, String> + Send + Sync>;

/// A three-way codec: one declaration drives parsing, building, and size
/// computation. Constructs are immutable after creation and freely
/// shareable across threads.
pub trait Construct: fmt::Debug + Send + Sync {
    /// Decode a value starting at the stream's current position.
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value>;

    /// Encode `value` at the stream's current position. A `Some` return is
    /// the value the enclosing Struct records in its scope under this
    /// field's name (Tell, Computed, Enum, and Checksum produce these).
    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>>;

    /// Exact encoded length under `ctx`, or SizeofUnknown when the length
    /// depends on data not yet seen.
    fn sizeof(&self, ctx: &Context) -> Result<u64>;

    /// Whether an enclosing Struct should flatten this construct's record
    /// fields into its own scope.
    fn embedded(&self) -> bool {
        false
    }

    /// Parse `data` from the start. Trailing bytes are allowed; use
    /// [`Construct::parse_strict`] to forbid them.
    fn parse(&self, data: &[u8]) -> Result<Value> {
        let mut ctx = Context::new();
        self.parse_with(data, &mut ctx)
    }

    /// Parse `data`, failing with FramingError when any input remains after
    /// the construct's grammar is satisfied.
    fn parse_strict(&self, data: &[u8]) -> Result<Value> {
        let mut ctx = Context::new();
        let mut stream = Stream::reader(data);
        let value = parse_child(self, &mut stream, &mut ctx)?;
        let left = stream.remaining();
        if left != 0 {
            return Err(Error::new(
                ErrorKind::Framing(format!("{} trailing byte(s) after parse", left)),
                stream.position(),
            ));
        }
        Ok(value)
    }

    /// Parse with a caller-seeded root context.
    fn parse_with(&self, data: &[u8], ctx: &mut Context) -> Result<Value> {
        let mut stream = Stream::reader(data);
        parse_child(self, &mut stream, ctx)
    }

    /// Build `value`, returning the accumulated bytes.
    fn build(&self, value: &Value) -> Result<Vec<u8>> {
        let mut ctx = Context::new();
        self.build_with(value, &mut ctx)
    }

    /// Build with a caller-seeded root context.
    fn build_with(&self, value: &Value, ctx: &mut Context) -> Result<Vec<u8>> {
        let mut stream = Stream::writer();
        build_child(self, value, &mut stream, ctx)?;
        Ok(stream.into_bytes())
    }

    /// [`Construct::sizeof`] under an empty root context.
    fn size(&self) -> Result<u64> {
        self.sizeof(&Context::new())
    }
}


impl<T: Construct + ?Sized> Construct for Arc<T> {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        (**self).parse_stream(stream, ctx)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        (**self).build_stream(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        (**self).sizeof(ctx)
    }

    fn embedded(&self) -> bool {
        (**self).embedded()
    }
}

impl Construct for Box<dyn Construct> {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        (**self).parse_stream(stream, ctx)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        (**self).build_stream(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        (**self).sizeof(ctx)
    }

    fn embedded(&self) -> bool {
        (**self).embedded()
    }
}

/// Share a construct so one definition can appear in several places.
pub fn shared(c: impl Construct + 'static) -> Arc<dyn Construct> {
    Arc::new(c)
}

/// Call a child's parse inside a transaction: on failure the stream
/// position and the context are restored to their entry state before the
/// error propagates.
pub(crate) fn parse_child<C: Construct + ?Sized>(
    c: &C,
    stream: &mut Stream,
    ctx: &mut Context,
) -> Result<Value> {
    let pos = stream.position();
    let mark = ctx.mark();
    match c.parse_stream(stream, ctx) {
        Ok(value) => Ok(value),
        Err(e) => {
            stream.seek(pos);
            ctx.restore(mark);
            Err(e)
        }
    }
}

/// Transactional wrapper for a child's build, mirroring [`parse_child`].
pub(crate) fn build_child<C: Construct + ?Sized>(
    c: &C,
    value: &Value,
    stream: &mut Stream,
    ctx: &mut Context,
) -> Result<Option<Value>> {
    let pos = stream.position();
    let mark = ctx.mark();
    match c.build_stream(value, stream, ctx) {
        Ok(ctx_value) => Ok(ctx_value),
        Err(e) => {
            stream.seek(pos);
            ctx.restore(mark);
            Err(e)
        }
    }
}

pub(crate) fn adapter_error(cause: String, position: u64) -> Error {
    Error::new(ErrorKind::Adapter(cause), position)
}

pub(crate) fn type_error(expected: &'static str, found: &Value, position: u64) -> Error {
    Error::new(
        ErrorKind::Type {
            expected,
            found: found.type_name(),
        },
        position,
    )
}

/// Late-bound indirection for recursive formats: create the handle first,
/// reference it inside the definition, then [`Recursive::define`] the real
/// construct once.
///
/// ```
/// use binform::{Construct, Integer, Recursive, Struct};
/// let node = Recursive::new();
/// node.define(
///     Struct::new()
///         .field("depth", Integer::new(1)),
/// );
/// assert!(node.parse(b"\x07").is_ok());
/// ```
#[derive(Clone)]
pub struct Recursive {
    slot: Arc<OnceLock<Arc<dyn Construct>>>,
}

impl Recursive {
    pub fn new() -> Self {
        Recursive {
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Bind the definition. Panics when called twice.
    pub fn define(&self, c: impl Construct + 'static) {
        let fresh = self.slot.set(Arc::new(c)).is_ok();
        assert!(fresh, "recursive construct defined twice");
    }

    fn get(&self, position: u64) -> Result<&Arc<dyn Construct>> {
        self.slot.get().ok_or_else(|| {
            adapter_error("recursive construct used before define".to_string(), position)
        })
    }
}

impl Default for Recursive {
    fn default() -> Self {
        Recursive::new()
    }
}

impl fmt::Debug for Recursive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Not printing the target: the graph may be cyclic.
        f.write_str("Recursive(..)")
    }
}

impl Construct for Recursive {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        self.get(stream.position())?.parse_stream(stream, ctx)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        self.get(stream.position())?.build_stream(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.get(0)?.sizeof(ctx)
    }

    fn embedded(&self) -> bool {
        self.slot.get().map(|c| c.embedded()).unwrap_or(false)
    }
}

/// Expect a record build input, surfacing a Type error otherwise.
pub(crate) fn expect_record<'v>(value: &'v Value, position: u64) -> Result<&'v Record> {
    value
        .as_record()
        .ok_or_else(|| type_error("record", value, position))
}
