//! Aggregates: Struct (ordered named fields), Contextual (late-bound
//! parameters), Computed (virtual field).
//!
//! A Struct is where the context mechanism comes together: each field's
//! value lands in the scope before the next field runs, so later fields
//! (and their predicates, selectors, and contextual factories) can depend
//! on earlier ones during both parse and build.

use std::fmt;
use std::sync::Arc;

use crate::construct::{
    adapter_error, build_child, expect_record, parse_child, Construct, FactoryFn, ValueFn,
};
use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::stream::Stream;
use crate::value::{Record, Value};

/// Ordered sequence of named fields, parsed and built in declaration
/// order.
///
/// Field names starting with `_` are internal framing: they stay visible
/// in the scope during the operation but are omitted from the parsed
/// record and never required as build input. Missing build input reaches
/// the child as [`Value::Unit`]; only constructs that can build from
/// context (Const, Padding, Computed, Tell, Checksum, a false If) accept
/// that.
#[derive(Debug, Default)]
pub struct Struct {
    fields: Vec<(String, Arc<dyn Construct>)>,
    embedded: bool,
}

impl Struct {
    pub fn new() -> Self {
        Struct::default()
    }

    /// Append a field.
    ///
    /// # Panics
    ///
    /// Panics when `name` is already declared.
    pub fn field(mut self, name: impl Into<String>, construct: impl Construct + 'static) -> Self {
        let name = name.into();
        assert!(
            !self.fields.iter().any(|(n, _)| *n == name),
            "duplicate field name {name:?}"
        );
        self.fields.push((name, Arc::new(construct)));
        self
    }

    /// Flatten this struct's fields into the enclosing struct's scope and
    /// record instead of nesting them under one name.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    fn parse_fields(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let mut record = Record::new();
        for (name, field) in &self.fields {
            let value = parse_child(field, stream, ctx).map_err(|e| e.within(name))?;
            if field.embedded() {
                let found = value.type_name();
                let Value::Record(sub) = value else {
                    return Err(Error::new(
                        ErrorKind::Type {
                            expected: "record",
                            found,
                        },
                        stream.position(),
                    )
                    .within(name));
                };
                for (key, sub_value) in sub {
                    ctx.set(key.clone(), sub_value.clone());
                    record.insert(key, sub_value);
                }
            } else {
                ctx.set(name.clone(), value.clone());
                if !name.starts_with('_') {
                    record.insert(name.clone(), value);
                }
            }
        }
        Ok(Value::Record(record))
    }

    fn build_fields(&self, record: &Record, stream: &mut Stream, ctx: &mut Context) -> Result<()> {
        for (name, field) in &self.fields {
            let input = if field.embedded() {
                Value::Record(record.clone())
            } else {
                record.get(name).cloned().unwrap_or(Value::Unit)
            };
            let produced =
                build_child(field, &input, stream, ctx).map_err(|e| e.within(name))?;
            if let Some(value) = produced {
                ctx.set(name.clone(), value);
            }
        }
        Ok(())
    }
}

impl Construct for Struct {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        if self.embedded {
            return self.parse_fields(stream, ctx);
        }
        ctx.push_scope();
        let result = self.parse_fields(stream, ctx);
        ctx.pop_scope();
        result
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let record = expect_record(value, stream.position())?;
        if self.embedded {
            self.build_fields(record, stream, ctx)?;
            return Ok(None);
        }
        ctx.push_scope_seeded(record);
        let result = self.build_fields(record, stream, ctx);
        ctx.pop_scope();
        result.map(|()| None)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        let mut total = 0;
        for (name, field) in &self.fields {
            total += field.sizeof(ctx).map_err(|e| e.within(name))?;
        }
        Ok(total)
    }

    fn embedded(&self) -> bool {
        self.embedded
    }
}

/// Produces the construct to use from the context, anew on every parse,
/// build, and sizeof. This is how a field's shape depends on previously
/// parsed values:
///
/// ```
/// use binform::{Bytes, Construct, Contextual, Integer, Struct, Value};
/// let entry = Struct::new()
///     .field("length", Integer::new(1))
///     .field(
///         "data",
///         Contextual::new(|ctx| Ok(Box::new(Bytes::new(ctx.uint("length")?)))),
///     );
/// let parsed = entry.parse(b"\x03abcdef").expect("parse");
/// assert_eq!(
///     parsed.as_record().unwrap()["data"],
///     Value::Bytes(b"abc".to_vec()),
/// );
/// ```
pub struct Contextual {
    factory: FactoryFn,
}

impl Contextual {
    pub fn new(
        factory: impl Fn(&Context) -> std::result::Result<Box<dyn Construct>, String>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Contextual {
            factory: Arc::new(factory),
        }
    }

    fn produce(&self, ctx: &Context, position: u64) -> Result<Box<dyn Construct>> {
        (self.factory)(ctx).map_err(|e| adapter_error(e, position))
    }
}

impl fmt::Debug for Contextual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Contextual(..)")
    }
}

impl Construct for Contextual {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let inner = self.produce(ctx, stream.position())?;
        inner.parse_stream(stream, ctx)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let inner = self.produce(ctx, stream.position())?;
        inner.build_stream(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        // A factory that cannot run under this context means the size
        // depends on data not yet seen.
        self.produce(ctx, 0)
            .map_err(|e| Error::new(ErrorKind::SizeofUnknown(e.to_string()), 0))?
            .sizeof(ctx)
    }
}

/// Virtual field: touches no bytes, evaluates a function of the context,
/// and surfaces the result in the scope and the parsed record. On build
/// the computed value always wins over whatever the caller supplied.
pub struct Computed {
    value: ValueFn,
}

impl Computed {
    pub fn new(
        f: impl Fn(&Context) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Computed { value: Arc::new(f) }
    }

    /// A fixed value independent of the context.
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        Computed {
            value: Arc::new(move |_| Ok(value.clone())),
        }
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Computed(..)")
    }
}

impl Construct for Computed {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        (self.value)(ctx).map_err(|e| adapter_error(e, stream.position()))
    }

    fn build_stream(
        &self,
        _value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let computed = (self.value)(ctx).map_err(|e| adapter_error(e, stream.position()))?;
        Ok(Some(computed))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }
}
