//! Stream manipulators and diagnostics: Offset, Tell, Debug.

use std::sync::Arc;
use std::time::Instant;

use crate::construct::{build_child, parse_child, Construct};
use crate::context::Context;
use crate::error::Result;
use crate::stream::Stream;
use crate::value::Value;

/// Runs the wrapped construct at an absolute stream offset, then restores
/// the position. The enclosing cursor does not advance, so sizeof is 0.
#[derive(Debug)]
pub struct Offset {
    offset: u64,
    inner: Arc<dyn Construct>,
}

impl Offset {
    pub fn new(offset: u64, inner: impl Construct + 'static) -> Self {
        Offset {
            offset,
            inner: Arc::new(inner),
        }
    }
}

impl Construct for Offset {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let fallback = stream.position();
        stream.seek(self.offset);
        let result = parse_child(&self.inner, stream, ctx);
        stream.seek(fallback);
        result
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let fallback = stream.position();
        stream.seek(self.offset);
        let result = build_child(&self.inner, value, stream, ctx);
        stream.seek(fallback);
        result
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }
}

/// Reports the current stream position as an unsigned integer, consuming
/// and producing no bytes. Two Tells around a field measure its encoded
/// size; a Tell plus a relative offset gives an absolute pointer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tell;

impl Construct for Tell {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::Uint(stream.position()))
    }

    fn build_stream(
        &self,
        _value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        Ok(Some(Value::Uint(stream.position())))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }
}

/// Pass-through that emits a tracing event per operation with the entry
/// and exit positions and the elapsed time. Semantics of the wrapped
/// construct are untouched; without a subscriber the events cost nothing.
#[derive(Debug)]
pub struct Debug {
    label: String,
    inner: Arc<dyn Construct>,
}

impl Debug {
    pub fn new(label: impl Into<String>, inner: impl Construct + 'static) -> Self {
        Debug {
            label: label.into(),
            inner: Arc::new(inner),
        }
    }
}

impl Construct for Debug {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let enter = stream.position();
        let started = Instant::now();
        let result = parse_child(&self.inner, stream, ctx);
        tracing::trace!(
            label = %self.label,
            enter,
            exit = stream.position(),
            elapsed_us = started.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "parse"
        );
        result
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let enter = stream.position();
        let started = Instant::now();
        let result = build_child(&self.inner, value, stream, ctx);
        tracing::trace!(
            label = %self.label,
            enter,
            exit = stream.position(),
            elapsed_us = started.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "build"
        );
        result
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner.sizeof(ctx)
    }

    fn embedded(&self) -> bool {
        self.inner.embedded()
    }
}
