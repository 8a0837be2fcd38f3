//! Conditional constructs: If, Switch, Enum, Raise.

use std::fmt;
use std::sync::Arc;

use crate::construct::{adapter_error, parse_child, Construct, PredicateFn, ValueFn};
use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::leaf::Pass;
use crate::stream::Stream;
use crate::value::Value;

/// Delegates to one of two branches depending on a context predicate. The
/// default else-branch is [`Pass`], so a false predicate parses to unit
/// and builds nothing.
pub struct If {
    predicate: PredicateFn,
    then_branch: Arc<dyn Construct>,
    else_branch: Arc<dyn Construct>,
}

impl If {
    pub fn new(
        predicate: impl Fn(&Context) -> std::result::Result<bool, String> + Send + Sync + 'static,
        then_branch: impl Construct + 'static,
    ) -> Self {
        If {
            predicate: Arc::new(predicate),
            then_branch: Arc::new(then_branch),
            else_branch: Arc::new(Pass),
        }
    }

    pub fn with_else(mut self, else_branch: impl Construct + 'static) -> Self {
        self.else_branch = Arc::new(else_branch);
        self
    }

    fn branch(&self, ctx: &Context, position: u64) -> Result<&Arc<dyn Construct>> {
        let hit = (self.predicate)(ctx).map_err(|e| adapter_error(e, position))?;
        Ok(if hit {
            &self.then_branch
        } else {
            &self.else_branch
        })
    }
}

impl fmt::Debug for If {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("If")
            .field("then_branch", &self.then_branch)
            .field("else_branch", &self.else_branch)
            .finish_non_exhaustive()
    }
}

impl Construct for If {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        self.branch(ctx, stream.position())?.parse_stream(stream, ctx)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        self.branch(ctx, stream.position())?
            .build_stream(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        // A predicate that cannot be evaluated under this context means
        // the size is not known yet, not that the construct is broken.
        self.branch(ctx, 0)
            .map_err(|e| Error::new(ErrorKind::SizeofUnknown(e.to_string()), 0))?
            .sizeof(ctx)
    }
}

/// Dispatches to the case whose key equals the selector's result, falling
/// back to the default when one was given and failing with SwitchNoMatch
/// otherwise.
pub struct Switch {
    selector: ValueFn,
    cases: Vec<(Value, Arc<dyn Construct>)>,
    default: Option<Arc<dyn Construct>>,
}

impl Switch {
    pub fn new(
        selector: impl Fn(&Context) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Switch {
            selector: Arc::new(selector),
            cases: Vec::new(),
            default: None,
        }
    }

    pub fn case(mut self, key: impl Into<Value>, construct: impl Construct + 'static) -> Self {
        self.cases.push((key.into(), Arc::new(construct)));
        self
    }

    pub fn default(mut self, construct: impl Construct + 'static) -> Self {
        self.default = Some(Arc::new(construct));
        self
    }

    fn select(&self, ctx: &Context, position: u64) -> Result<&Arc<dyn Construct>> {
        let key = (self.selector)(ctx).map_err(|e| adapter_error(e, position))?;
        self.cases
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, c)| c)
            .or(self.default.as_ref())
            .ok_or_else(|| Error::new(ErrorKind::SwitchNoMatch(key), position))
    }
}

impl fmt::Debug for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switch")
            .field("cases", &self.cases)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl Construct for Switch {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        self.select(ctx, stream.position())?.parse_stream(stream, ctx)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        self.select(ctx, stream.position())?
            .build_stream(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.select(ctx, 0)
            .map_err(|e| {
                if matches!(e.kind(), ErrorKind::Adapter(_)) {
                    Error::new(ErrorKind::SizeofUnknown(e.to_string()), 0)
                } else {
                    e
                }
            })?
            .sizeof(ctx)
    }
}

/// Maps raw wire values to labels. Parsing yields the label; building
/// accepts the label (or the exact raw value) and always records the
/// label in the scope.
#[derive(Debug)]
pub struct Enum {
    inner: Arc<dyn Construct>,
    cases: Vec<(String, Value)>,
}

impl Enum {
    pub fn new(
        inner: impl Construct + 'static,
        cases: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> Self {
        Enum {
            inner: Arc::new(inner),
            cases: cases
                .into_iter()
                .map(|(label, raw)| (label.to_string(), raw))
                .collect(),
        }
    }
}

impl Construct for Enum {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let at = stream.position();
        let raw = parse_child(&self.inner, stream, ctx)?;
        let label = self
            .cases
            .iter()
            .find(|(_, r)| *r == raw)
            .map(|(l, _)| l.clone())
            .ok_or_else(|| Error::new(ErrorKind::UnknownEnumValue(raw), at))?;
        Ok(Value::Str(label))
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let at = stream.position();
        let (label, raw) = match value {
            Value::Str(label) => self
                .cases
                .iter()
                .find(|(l, _)| l == label)
                .ok_or_else(|| Error::new(ErrorKind::UnknownEnumLabel(label.clone()), at))?,
            other => self
                .cases
                .iter()
                .find(|(_, r)| r == other)
                .ok_or_else(|| Error::new(ErrorKind::UnknownEnumValue(other.clone()), at))?,
        };
        self.inner.build_stream(raw, stream, ctx)?;
        Ok(Some(Value::Str(label.clone())))
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner.sizeof(ctx)
    }
}

/// Fails every operation with the given message. Useful as a Switch
/// default that forbids unknown variants.
#[derive(Debug, Clone)]
pub struct Raise {
    message: String,
}

impl Raise {
    pub fn new(message: impl Into<String>) -> Self {
        Raise {
            message: message.into(),
        }
    }

    fn error(&self, position: u64) -> Error {
        Error::new(ErrorKind::Raised(self.message.clone()), position)
    }
}

impl Construct for Raise {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        Err(self.error(stream.position()))
    }

    fn build_stream(
        &self,
        _value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        Err(self.error(stream.position()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Err(self.error(0))
    }
}
