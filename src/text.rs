//! Byte ↔ text constructs with a framing policy: PaddedString (fixed
//! width), PascalString (length-prefixed), CString (NUL-terminated), Line
//! (CRLF-terminated).

use std::sync::Arc;

use crate::construct::{adapter_error, build_child, parse_child, type_error, Construct};
use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::stream::Stream;
use crate::value::Value;

/// Supported text encodings. Encode/decode failures surface as
/// AdapterFailure with the cause attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Ascii,
}

impl TextEncoding {
    fn encode(&self, s: &str) -> std::result::Result<Vec<u8>, String> {
        match self {
            TextEncoding::Utf8 => Ok(s.as_bytes().to_vec()),
            TextEncoding::Latin1 => s
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c))
                        .map_err(|_| format!("{c:?} is not representable in latin-1"))
                })
                .collect(),
            TextEncoding::Ascii => {
                if s.is_ascii() {
                    Ok(s.as_bytes().to_vec())
                } else {
                    Err("string contains non-ASCII characters".to_string())
                }
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> std::result::Result<String, String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| format!("invalid utf-8: {e}")),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Ascii => {
                if bytes.is_ascii() {
                    // Safe per the check above; avoid a second validation.
                    Ok(String::from_utf8_lossy(bytes).into_owned())
                } else {
                    Err("byte string contains non-ASCII bytes".to_string())
                }
            }
        }
    }
}

/// Which side of a fixed-width string receives the padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadDirection {
    Right,
    Left,
    Center,
}

/// Text occupying exactly `length` bytes on the wire; shorter values are
/// padded, and the padding is stripped again on parse.
#[derive(Debug)]
pub struct PaddedString {
    length: u64,
    encoding: TextEncoding,
    pad: u8,
    direction: PadDirection,
}

impl PaddedString {
    pub fn new(length: u64, encoding: TextEncoding) -> Self {
        PaddedString {
            length,
            encoding,
            pad: 0,
            direction: PadDirection::Right,
        }
    }

    pub fn pad_byte(mut self, pad: u8) -> Self {
        self.pad = pad;
        self
    }

    pub fn direction(mut self, direction: PadDirection) -> Self {
        self.direction = direction;
        self
    }

    fn strip<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let start = match self.direction {
            PadDirection::Right => 0,
            PadDirection::Left | PadDirection::Center => {
                data.iter().position(|&b| b != self.pad).unwrap_or(data.len())
            }
        };
        let end = match self.direction {
            PadDirection::Left => data.len(),
            PadDirection::Right | PadDirection::Center => data
                .iter()
                .rposition(|&b| b != self.pad)
                .map(|i| i + 1)
                .unwrap_or(start),
        };
        &data[start..end.max(start)]
    }
}

impl Construct for PaddedString {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        let data = stream.read_exact(self.length)?;
        let text = self
            .encoding
            .decode(self.strip(&data))
            .map_err(|e| adapter_error(e, stream.position()))?;
        Ok(Value::Str(text))
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let s = value
            .as_str()
            .ok_or_else(|| type_error("string", value, stream.position()))?;
        let encoded = self
            .encoding
            .encode(s)
            .map_err(|e| adapter_error(e, stream.position()))?;
        if encoded.len() as u64 > self.length {
            return Err(Error::new(
                ErrorKind::LengthMismatch {
                    declared: self.length,
                    actual: encoded.len() as u64,
                },
                stream.position(),
            ));
        }
        let total = self.length as usize;
        let missing = total - encoded.len();
        let before = match self.direction {
            PadDirection::Right => 0,
            PadDirection::Left => missing,
            PadDirection::Center => missing / 2,
        };
        let mut out = Vec::with_capacity(total);
        out.resize(before, self.pad);
        out.extend_from_slice(&encoded);
        out.resize(total, self.pad);
        stream.write_all(&out)?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.length)
    }
}

/// Length-prefixed text: the length construct encodes the byte count of
/// the encoded string.
#[derive(Debug)]
pub struct PascalString {
    length: Arc<dyn Construct>,
    encoding: TextEncoding,
}

impl PascalString {
    pub fn new(length: impl Construct + 'static, encoding: TextEncoding) -> Self {
        PascalString {
            length: Arc::new(length),
            encoding,
        }
    }
}

impl Construct for PascalString {
    fn parse_stream(&self, stream: &mut Stream, ctx: &mut Context) -> Result<Value> {
        let at = stream.position();
        let length = parse_child(&self.length, stream, ctx)?;
        let n = length
            .as_uint()
            .ok_or_else(|| type_error("uint", &length, at))?;
        let data = stream.read_exact(n)?;
        let text = self
            .encoding
            .decode(&data)
            .map_err(|e| adapter_error(e, stream.position()))?;
        Ok(Value::Str(text))
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let s = value
            .as_str()
            .ok_or_else(|| type_error("string", value, stream.position()))?;
        let encoded = self
            .encoding
            .encode(s)
            .map_err(|e| adapter_error(e, stream.position()))?;
        build_child(
            &self.length,
            &Value::Uint(encoded.len() as u64),
            stream,
            ctx,
        )?;
        stream.write_all(&encoded)?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Err(Error::new(
            ErrorKind::SizeofUnknown("PascalString has no fixed size".to_string()),
            0,
        ))
    }
}

/// Text terminated by a zero byte. The terminator is consumed on parse and
/// appended on build; the decoded value excludes it.
#[derive(Debug)]
pub struct CString {
    encoding: TextEncoding,
}

impl CString {
    pub fn new(encoding: TextEncoding) -> Self {
        CString { encoding }
    }
}

impl Construct for CString {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        let mut data = Vec::new();
        loop {
            match stream.read_byte() {
                Some(0) => break,
                Some(b) => data.push(b),
                None => {
                    return Err(Error::new(
                        ErrorKind::Framing("C string without NUL terminator".to_string()),
                        stream.position(),
                    ))
                }
            }
        }
        let text = self
            .encoding
            .decode(&data)
            .map_err(|e| adapter_error(e, stream.position()))?;
        Ok(Value::Str(text))
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let s = value
            .as_str()
            .ok_or_else(|| type_error("string", value, stream.position()))?;
        let encoded = self
            .encoding
            .encode(s)
            .map_err(|e| adapter_error(e, stream.position()))?;
        stream.write_all(&encoded)?;
        stream.write_all(b"\x00")?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Err(Error::new(
            ErrorKind::SizeofUnknown("CString has no fixed size".to_string()),
            0,
        ))
    }
}

/// Text terminated by CRLF (0x0D 0x0A), the staple of text-based network
/// protocols. The decoded value excludes the terminator.
#[derive(Debug)]
pub struct Line {
    encoding: TextEncoding,
}

impl Line {
    /// UTF-8 line.
    pub fn new() -> Self {
        Line {
            encoding: TextEncoding::Utf8,
        }
    }

    pub fn with(encoding: TextEncoding) -> Self {
        Line { encoding }
    }
}

impl Default for Line {
    fn default() -> Self {
        Line::new()
    }
}

impl Construct for Line {
    fn parse_stream(&self, stream: &mut Stream, _ctx: &mut Context) -> Result<Value> {
        let mut data: Vec<u8> = Vec::new();
        loop {
            match stream.read_byte() {
                Some(b) => {
                    data.push(b);
                    if data.ends_with(b"\r\n") {
                        data.truncate(data.len() - 2);
                        break;
                    }
                }
                None => {
                    return Err(Error::new(
                        ErrorKind::Framing("line without CRLF terminator".to_string()),
                        stream.position(),
                    ))
                }
            }
        }
        let text = self
            .encoding
            .decode(&data)
            .map_err(|e| adapter_error(e, stream.position()))?;
        Ok(Value::Str(text))
    }

    fn build_stream(
        &self,
        value: &Value,
        stream: &mut Stream,
        _ctx: &mut Context,
    ) -> Result<Option<Value>> {
        let s = value
            .as_str()
            .ok_or_else(|| type_error("string", value, stream.position()))?;
        let encoded = self
            .encoding
            .encode(s)
            .map_err(|e| adapter_error(e, stream.position()))?;
        stream.write_all(&encoded)?;
        stream.write_all(b"\r\n")?;
        Ok(None)
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Err(Error::new(
            ErrorKind::SizeofUnknown("Line has no fixed size".to_string()),
            0,
        ))
    }
}
