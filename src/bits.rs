//! Sub-byte packed fields.

use crate::construct::{expect_record, type_error, Construct};
use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::stream::Stream;
use crate::value::{Record, Value};

/// Named unsigned fields packed MSB-first. The whole group is
/// byte-aligned: it occupies ⌈total_bits / 8⌉ bytes and trailing bits are
/// zero.
///
/// Field names starting with `_` are bit padding: zero on build, omitted
/// from the parsed record. Any other field omitted from the build input is
/// built as zero.
#[derive(Debug)]
pub struct BitFields {
    fields: Vec<(String, u32)>,
    length: u64,
    embedded: bool,
}

impl BitFields {
    /// # Panics
    ///
    /// Panics on a duplicate name or a field wider than 64 bits.
    pub fn new(fields: impl IntoIterator<Item = (&'static str, u32)>) -> Self {
        let fields: Vec<(String, u32)> = fields
            .into_iter()
            .map(|(name, width)| (name.to_string(), width))
            .collect();
        let mut total = 0u64;
        for (i, (name, width)) in fields.iter().enumerate() {
            assert!(*width <= 64, "bit field {name:?} is wider than 64 bits");
            assert!(
                !fields[..i].iter().any(|(n, _)| n == name),
                "duplicate bit field name {name:?}"
            );
            total += u64::from(*width);
        }
        BitFields {
            fields,
            length: total.div_ceil(8),
            embedded: false,
        }
    }

    /// Flatten these fields into the enclosing struct's scope and record.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }
}

fn extract(buf: &[u8], start_bit: u64, width: u32) -> u64 {
    let mut value = 0u64;
    for i in 0..u64::from(width) {
        let bit = start_bit + i;
        let byte = buf[(bit / 8) as usize];
        value = (value << 1) | u64::from((byte >> (7 - bit % 8)) & 1);
    }
    value
}

fn deposit(buf: &mut [u8], start_bit: u64, width: u32, value: u64) {
    for i in 0..u64::from(width) {
        let bit = start_bit + i;
        if (value >> (u64::from(width) - 1 - i)) & 1 != 0 {
            buf[(bit / 8) as usize] |= 1 << (7 - bit % 8);
        }
    }
}

impl Construct for BitFields {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        let buf = stream.read_exact(self.length)?;
        let mut record = Record::new();
        let mut bit = 0u64;
        for (name, width) in &self.fields {
            let value = extract(&buf, bit, *width);
            bit += u64::from(*width);
            if !name.starts_with('_') {
                record.insert(name.clone(), Value::Uint(value));
            }
        }
        Ok(Value::Record(record))
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let record = expect_record(value, stream.position())?;
        let mut buf = vec![0u8; self.length as usize];
        let mut bit = 0u64;
        for (name, width) in &self.fields {
            let field_value = if name.starts_with('_') {
                0
            } else {
                match record.get(name) {
                    Some(v) => v
                        .as_uint()
                        .ok_or_else(|| type_error("uint", v, stream.position()))?,
                    None => 0,
                }
            };
            if *width < 64 && field_value >> width != 0 {
                return Err(Error::new(
                    ErrorKind::OutOfRange {
                        value: field_value as i128,
                        bits: *width,
                    },
                    stream.position(),
                ));
            }
            deposit(&mut buf, bit, *width, field_value);
            bit += u64::from(*width);
        }
        stream.write_all(&buf)?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.length)
    }

    fn embedded(&self) -> bool {
        self.embedded
    }
}
