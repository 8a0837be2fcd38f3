//! Compute-or-verify checksum field.

use std::fmt;
use std::sync::Arc;

use crate::construct::{adapter_error, parse_child, type_error, BytesFn, Construct, HashFn};
use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::stream::Stream;
use crate::value::Value;

/// A checksum over bytes drawn from the context. Parsing reads the field
/// and verifies it against the recomputed digest; building computes the
/// digest and writes it (a caller-supplied value must match it).
pub struct Checksum {
    field: Arc<dyn Construct>,
    hash: HashFn,
    data: BytesFn,
}

impl Checksum {
    pub fn new(
        field: impl Construct + 'static,
        hash: impl Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
        data: impl Fn(&Context) -> std::result::Result<Vec<u8>, String> + Send + Sync + 'static,
    ) -> Self {
        Checksum {
            field: Arc::new(field),
            hash: Arc::new(hash),
            data: Arc::new(data),
        }
    }

    fn digest(&self, ctx: &Context, position: u64) -> Result<Vec<u8>> {
        let data = (self.data)(ctx).map_err(|e| adapter_error(e, position))?;
        Ok((self.hash)(&data))
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checksum")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl Construct for Checksum {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let at = stream.position();
        let parsed = parse_child(&self.field, stream, ctx)?;
        let actual = parsed
            .as_bytes()
            .ok_or_else(|| type_error("bytes", &parsed, at))?;
        let expected = self.digest(ctx, at)?;
        if actual != expected.as_slice() {
            return Err(Error::new(
                ErrorKind::ChecksumMismatch {
                    actual: hex(actual),
                    expected: hex(&expected),
                },
                at,
            ));
        }
        Ok(parsed)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let at = stream.position();
        let digest = self.digest(ctx, at)?;
        if !value.is_unit() {
            let supplied = value
                .as_bytes()
                .ok_or_else(|| type_error("bytes", value, at))?;
            if supplied != digest.as_slice() {
                return Err(Error::new(
                    ErrorKind::ChecksumMismatch {
                        actual: hex(supplied),
                        expected: hex(&digest),
                    },
                    at,
                ));
            }
        }
        let digest = Value::Bytes(digest);
        self.field.build_stream(&digest, stream, ctx)?;
        Ok(Some(digest))
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.field.sizeof(ctx)
    }
}
