//! Fixed-shape leaf constructs: Pass, Flag, Bytes, Integer, Float,
//! Padding, Const.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::sync::Arc;

use crate::construct::{parse_child, type_error, Construct};
use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::stream::Stream;
use crate::value::Value;

/// Byte order for multi-byte integers and floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

/// Parses to unit, builds nothing, size 0. Useful as the empty branch of
/// conditionals.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pass;

impl Construct for Pass {
    fn parse_stream(&self, _stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::Unit)
    }

    fn build_stream(
        &self,
        _value: &Value,
        _stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }
}

/// One byte: zero parses as false, anything else as true; builds as
/// 0x01/0x00.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flag;

impl Construct for Flag {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        let b = stream.read_exact(1)?;
        Ok(Value::Bool(b[0] != 0))
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let v = value
            .as_bool()
            .ok_or_else(|| type_error("bool", value, stream.position()))?;
        stream.write_all(if v { b"\x01" } else { b"\x00" })?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(1)
    }
}

/// Raw byte string, either fixed-length or greedy (consumes the stream to
/// its end on parse).
#[derive(Debug, Clone, Copy)]
pub struct Bytes {
    length: Option<u64>,
}

impl Bytes {
    pub fn new(length: u64) -> Self {
        Bytes {
            length: Some(length),
        }
    }

    /// Parsing consumes every remaining byte; sizeof is unknown.
    pub fn greedy() -> Self {
        Bytes { length: None }
    }
}

impl Construct for Bytes {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        match self.length {
            Some(n) => Ok(Value::Bytes(stream.read_exact(n)?)),
            None => Ok(Value::Bytes(stream.read_to_end())),
        }
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let data = value
            .as_bytes()
            .ok_or_else(|| type_error("bytes", value, stream.position()))?;
        if let Some(n) = self.length {
            if data.len() as u64 != n {
                return Err(Error::new(
                    ErrorKind::LengthMismatch {
                        declared: n,
                        actual: data.len() as u64,
                    },
                    stream.position(),
                ));
            }
        }
        stream.write_all(data)?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        self.length.ok_or_else(|| {
            Error::new(
                ErrorKind::SizeofUnknown("greedy Bytes has no fixed size".to_string()),
                0,
            )
        })
    }
}

/// Fixed-width integer. Defaults to unsigned big-endian.
#[derive(Debug, Clone, Copy)]
pub struct Integer {
    length: u32,
    signed: bool,
    endianness: Endianness,
}

impl Integer {
    /// Unsigned big-endian integer of `length` bytes.
    ///
    /// # Panics
    ///
    /// Panics unless `length` is 1, 2, 4, or 8.
    pub fn new(length: u32) -> Self {
        Integer::with(length, false, Endianness::Big)
    }

    /// # Panics
    ///
    /// Panics unless `length` is 1, 2, 4, or 8.
    pub fn with(length: u32, signed: bool, endianness: Endianness) -> Self {
        assert!(
            matches!(length, 1 | 2 | 4 | 8),
            "integer length must be 1, 2, 4, or 8, got {length}"
        );
        Integer {
            length,
            signed,
            endianness,
        }
    }

    fn fits(&self, value: i128) -> bool {
        let bits = self.length * 8;
        if self.signed {
            let half = 1i128 << (bits - 1);
            (-half..half).contains(&value)
        } else {
            value >= 0 && (self.length == 8 || value < (1i128 << bits))
        }
    }
}

impl Construct for Integer {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        let buf = stream.read_exact(self.length as u64)?;
        let n = self.length as usize;
        Ok(match (self.signed, self.endianness) {
            (false, Endianness::Big) => Value::Uint(BigEndian::read_uint(&buf, n)),
            (false, Endianness::Little) => Value::Uint(LittleEndian::read_uint(&buf, n)),
            (true, Endianness::Big) => Value::Int(BigEndian::read_int(&buf, n)),
            (true, Endianness::Little) => Value::Int(LittleEndian::read_int(&buf, n)),
        })
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let wide: i128 = if self.signed {
            value
                .as_int()
                .ok_or_else(|| type_error("int", value, stream.position()))? as i128
        } else {
            match value.as_uint() {
                Some(v) => v as i128,
                // A negative int is in range for no width; report it
                // as out of range rather than a type error.
                None => match value.as_int() {
                    Some(v) => v as i128,
                    None => return Err(type_error("uint", value, stream.position())),
                },
            }
        };
        if !self.fits(wide) {
            return Err(Error::new(
                ErrorKind::OutOfRange {
                    value: wide,
                    bits: self.length * 8,
                },
                stream.position(),
            ));
        }
        let n = self.length as usize;
        let mut buf = [0u8; 8];
        match (self.signed, self.endianness) {
            (false, Endianness::Big) => BigEndian::write_uint(&mut buf[..n], wide as u64, n),
            (false, Endianness::Little) => LittleEndian::write_uint(&mut buf[..n], wide as u64, n),
            (true, Endianness::Big) => BigEndian::write_int(&mut buf[..n], wide as i64, n),
            (true, Endianness::Little) => LittleEndian::write_int(&mut buf[..n], wide as i64, n),
        }
        stream.write_all(&buf[..n])?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.length as u64)
    }
}

/// IEEE 754 float of 4 or 8 bytes. Defaults to big-endian.
#[derive(Debug, Clone, Copy)]
pub struct Float {
    length: u32,
    endianness: Endianness,
}

impl Float {
    /// # Panics
    ///
    /// Panics unless `length` is 4 or 8.
    pub fn new(length: u32) -> Self {
        Float::with(length, Endianness::Big)
    }

    /// # Panics
    ///
    /// Panics unless `length` is 4 or 8.
    pub fn with(length: u32, endianness: Endianness) -> Self {
        assert!(
            matches!(length, 4 | 8),
            "float length must be 4 or 8, got {length}"
        );
        Float { length, endianness }
    }
}

impl Construct for Float {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        let buf = stream.read_exact(self.length as u64)?;
        Ok(match (self.length, self.endianness) {
            (4, Endianness::Big) => Value::F32(BigEndian::read_f32(&buf)),
            (4, Endianness::Little) => Value::F32(LittleEndian::read_f32(&buf)),
            (_, Endianness::Big) => Value::F64(BigEndian::read_f64(&buf)),
            (_, Endianness::Little) => Value::F64(LittleEndian::read_f64(&buf)),
        })
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let v = value
            .as_f64()
            .ok_or_else(|| type_error("float", value, stream.position()))?;
        let mut buf = [0u8; 8];
        let n = self.length as usize;
        match (self.length, self.endianness) {
            (4, Endianness::Big) => BigEndian::write_f32(&mut buf[..4], v as f32),
            (4, Endianness::Little) => LittleEndian::write_f32(&mut buf[..4], v as f32),
            (_, Endianness::Big) => BigEndian::write_f64(&mut buf[..8], v),
            (_, Endianness::Little) => LittleEndian::write_f64(&mut buf[..8], v),
        }
        stream.write_all(&buf[..n])?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.length as u64)
    }
}

/// `n` bytes whose content is ignored on parse and zeroed on build. The
/// build input is ignored entirely.
#[derive(Debug, Clone, Copy)]
pub struct Padding {
    length: u64,
}

impl Padding {
    pub fn new(length: u64) -> Self {
        Padding { length }
    }
}

impl Construct for Padding {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        stream.read_exact(self.length)?;
        Ok(Value::Unit)
    }

    fn build_stream(
        &self,
        _value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        stream.write_all(&vec![0u8; self.length as usize])?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.length)
    }
}

/// A constant value: building writes it (the input must be the value
/// itself or `Unit`), parsing verifies it.
#[derive(Debug)]
pub struct Const {
    inner: Arc<dyn Construct>,
    value: Value,
}

impl Const {
    /// Literal byte signature, the common case.
    pub fn new(literal: impl Into<Vec<u8>>) -> Self {
        let literal = literal.into();
        Const {
            inner: Arc::new(Bytes::new(literal.len() as u64)),
            value: Value::Bytes(literal),
        }
    }

    /// Constant of an arbitrary construct and value.
    pub fn with(inner: impl Construct + 'static, value: Value) -> Self {
        Const {
            inner: Arc::new(inner),
            value,
        }
    }
}

impl Construct for Const {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let at = stream.position();
        let found = parse_child(&self.inner, stream, ctx)?;
        if found != self.value {
            return Err(Error::new(
                ErrorKind::ConstMismatch {
                    expected: self.value.clone(),
                    found,
                },
                at,
            ));
        }
        Ok(found)
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        if !value.is_unit() && *value != self.value {
            return Err(Error::new(
                ErrorKind::ConstMismatch {
                    expected: self.value.clone(),
                    found: value.clone(),
                },
                stream.position(),
            ));
        }
        self.inner.build_stream(&self.value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner.sizeof(ctx)
    }
}
