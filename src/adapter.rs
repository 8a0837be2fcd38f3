//! Constructs that wrap a child and transform its value or framing:
//! Adapted, Repeat, RepeatExactly, Prefixed, Padded, Aligned.

use std::fmt;
use std::sync::Arc;

use crate::construct::{adapter_error, build_child, parse_child, type_error, Construct, MapFn};
use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::stream::Stream;
use crate::value::Value;

/// Stop predicate over the items accumulated so far (Repeat).
pub type UntilFn = Arc<dyn Fn(&[Value]) -> std::result::Result<bool, String> + Send + Sync>;

/// Applies a user transform to the value before building and/or after
/// parsing the wrapped construct. Transform failures surface as
/// AdapterFailure with the cause attached.
pub struct Adapted {
    inner: Arc<dyn Construct>,
    before_build: Option<MapFn>,
    after_parse: Option<MapFn>,
}

impl Adapted {
    pub fn new(inner: impl Construct + 'static) -> Self {
        Adapted {
            inner: Arc::new(inner),
            before_build: None,
            after_parse: None,
        }
    }

    pub fn before_build(
        mut self,
        f: impl Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.before_build = Some(Arc::new(f));
        self
    }

    pub fn after_parse(
        mut self,
        f: impl Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.after_parse = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Adapted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapted")
            .field("inner", &self.inner)
            .field("before_build", &self.before_build.as_ref().map(|_| ".."))
            .field("after_parse", &self.after_parse.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Construct for Adapted {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let value = parse_child(&self.inner, stream, ctx)?;
        match &self.after_parse {
            Some(f) => f(value).map_err(|e| adapter_error(e, stream.position())),
            None => Ok(value),
        }
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let value = match &self.before_build {
            Some(f) => f(value.clone()).map_err(|e| adapter_error(e, stream.position()))?,
            None => value.clone(),
        };
        self.inner.build_stream(&value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner.sizeof(ctx)
    }

    fn embedded(&self) -> bool {
        self.inner.embedded()
    }
}

/// Repeats the wrapped construct. The greedy form parses until the child
/// fails cleanly (the transactional contract leaves the stream where the
/// last complete item ended); the bounded form enforces `min <= len < max`
/// and an optional stop predicate over the accumulated items.
pub struct Repeat {
    inner: Arc<dyn Construct>,
    min: u64,
    max: Option<u64>,
    until: Option<UntilFn>,
}

impl Repeat {
    /// Greedy: parse items until the stream ends or the child fails.
    pub fn new(inner: impl Construct + 'static) -> Self {
        Repeat {
            inner: Arc::new(inner),
            min: 0,
            max: None,
            until: None,
        }
    }

    /// Bounded: the item count must satisfy `min <= count < max`.
    pub fn bounded(inner: impl Construct + 'static, min: u64, max: u64) -> Self {
        assert!(max > min, "repeat bound must satisfy max > min");
        Repeat {
            inner: Arc::new(inner),
            min,
            max: Some(max),
            until: None,
        }
    }

    /// Stop repeating once the predicate holds for the accumulated items;
    /// the item that satisfied it is kept.
    pub fn until(
        mut self,
        f: impl Fn(&[Value]) -> std::result::Result<bool, String> + Send + Sync + 'static,
    ) -> Self {
        self.until = Some(Arc::new(f));
        self
    }

    fn stop(&self, items: &[Value], position: u64) -> Result<bool> {
        match &self.until {
            Some(f) => f(items).map_err(|e| adapter_error(e, position)),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repeat")
            .field("inner", &self.inner)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("until", &self.until.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Construct for Repeat {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let cap = self.max.map(|m| m - 1);
        let mut items = Vec::new();
        while cap.map_or(true, |c| (items.len() as u64) < c) {
            match parse_child(&self.inner, stream, ctx) {
                Ok(item) => items.push(item),
                Err(e) => {
                    // Stream and scope were rolled back: a clean end of
                    // sequence, unless the minimum is not met.
                    if (items.len() as u64) < self.min {
                        return Err(e);
                    }
                    return Ok(Value::List(items));
                }
            }
            if self.stop(&items, stream.position())? {
                break;
            }
        }
        if (items.len() as u64) < self.min {
            return Err(Error::new(
                ErrorKind::LengthMismatch {
                    declared: self.min,
                    actual: items.len() as u64,
                },
                stream.position(),
            ));
        }
        Ok(Value::List(items))
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let items = value
            .as_list()
            .ok_or_else(|| type_error("list", value, stream.position()))?;
        let n = items.len() as u64;
        if n < self.min || self.max.is_some_and(|m| n >= m) {
            return Err(Error::new(
                ErrorKind::LengthMismatch {
                    declared: self.min,
                    actual: n,
                },
                stream.position(),
            ));
        }
        for (i, item) in items.iter().enumerate() {
            build_child(&self.inner, item, stream, ctx)?;
            if self.stop(&items[..=i], stream.position())? {
                break;
            }
        }
        Ok(None)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        match (self.max, &self.until) {
            (Some(max), None) if max == self.min + 1 => {
                Ok(self.min * self.inner.sizeof(ctx)?)
            }
            _ => Err(Error::new(
                ErrorKind::SizeofUnknown("variable-count repeat".to_string()),
                0,
            )),
        }
    }
}

/// Repeats the wrapped construct exactly `n` times.
#[derive(Debug)]
pub struct RepeatExactly {
    inner: Repeat,
}

impl RepeatExactly {
    pub fn new(inner: impl Construct + 'static, n: u64) -> Self {
        RepeatExactly {
            inner: Repeat::bounded(inner, n, n + 1),
        }
    }
}

impl Construct for RepeatExactly {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        self.inner.parse_stream(stream, ctx)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        self.inner.build_stream(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner.sizeof(ctx)
    }
}

/// Length-prefixed framing: a length field followed by exactly that many
/// bytes, inside which the wrapped construct must consume everything.
#[derive(Debug)]
pub struct Prefixed {
    length: Arc<dyn Construct>,
    inner: Arc<dyn Construct>,
}

impl Prefixed {
    pub fn new(length: impl Construct + 'static, inner: impl Construct + 'static) -> Self {
        Prefixed {
            length: Arc::new(length),
            inner: Arc::new(inner),
        }
    }
}

impl Construct for Prefixed {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let at = stream.position();
        let length = parse_child(&self.length, stream, ctx)?;
        let n = length
            .as_uint()
            .ok_or_else(|| type_error("uint", &length, at))?;
        let window = stream.read_exact(n)?;
        let mut sub = Stream::reader(window);
        let value = parse_child(&self.inner, &mut sub, ctx)?;
        let left = sub.remaining();
        if left != 0 {
            return Err(Error::new(
                ErrorKind::Framing(format!(
                    "prefixed window of {} byte(s) left {} unconsumed",
                    n, left
                )),
                stream.position(),
            ));
        }
        Ok(value)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let mut sub = Stream::writer();
        build_child(&self.inner, value, &mut sub, ctx)?;
        let body = sub.into_bytes();
        build_child(
            &self.length,
            &Value::Uint(body.len() as u64),
            stream,
            ctx,
        )?;
        stream.write_all(&body)?;
        Ok(None)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        Ok(self.length.sizeof(ctx)? + self.inner.sizeof(ctx)?)
    }
}

/// Fixes the total encoded size to exactly `length` bytes: the wrapped
/// construct parses from a window of that size (trailing bytes discarded)
/// and its encoding is padded up to it on build.
#[derive(Debug)]
pub struct Padded {
    length: u64,
    inner: Arc<dyn Construct>,
    pad: u8,
}

impl Padded {
    pub fn new(length: u64, inner: impl Construct + 'static) -> Self {
        Padded {
            length,
            inner: Arc::new(inner),
            pad: 0,
        }
    }

    pub fn pad_byte(mut self, pad: u8) -> Self {
        self.pad = pad;
        self
    }
}

impl Construct for Padded {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let window = stream.read_exact(self.length)?;
        let mut sub = Stream::reader(window);
        parse_child(&self.inner, &mut sub, ctx)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let mut sub = Stream::writer();
        let ctx_value = build_child(&self.inner, value, &mut sub, ctx)?;
        let mut body = sub.into_bytes();
        if body.len() as u64 > self.length {
            return Err(Error::new(
                ErrorKind::LengthMismatch {
                    declared: self.length,
                    actual: body.len() as u64,
                },
                stream.position(),
            ));
        }
        body.resize(self.length as usize, self.pad);
        stream.write_all(&body)?;
        Ok(ctx_value)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.length)
    }
}

/// Rounds the bytes consumed/produced by the wrapped construct up to a
/// multiple of `modulus`, zero-filling on build and skipping on parse.
#[derive(Debug)]
pub struct Aligned {
    modulus: u64,
    inner: Arc<dyn Construct>,
}

impl Aligned {
    /// # Panics
    ///
    /// Panics when `modulus` is zero.
    pub fn new(modulus: u64, inner: impl Construct + 'static) -> Self {
        assert!(modulus > 0, "alignment modulus must be positive");
        Aligned {
            modulus,
            inner: Arc::new(inner),
        }
    }

    fn pad_after(&self, consumed: u64) -> u64 {
        (self.modulus - consumed % self.modulus) % self.modulus
    }
}

impl Construct for Aligned {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let before = stream.position();
        let value = parse_child(&self.inner, stream, ctx)?;
        let pad = self.pad_after(stream.position() - before);
        stream.read_exact(pad)?;
        Ok(value)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let before = stream.position();
        let ctx_value = build_child(&self.inner, value, stream, ctx)?;
        let pad = self.pad_after(stream.position() - before);
        stream.write_all(&vec![0u8; pad as usize])?;
        Ok(ctx_value)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        let size = self.inner.sizeof(ctx)?;
        Ok(size + self.pad_after(size))
    }
}
