//! Seekable byte stream shared by parse and build.
//!
//! One type serves both directions: parse wraps the input bytes, build
//! starts empty and accumulates output. Seeking past the end of an output
//! stream zero-fills the gap on the next write, which is what Offset relies
//! on.

use std::io::{Read, Write};

use crate::error::{Error, ErrorKind, Result};

#[derive(Debug)]
pub struct Stream {
    cur: std::io::Cursor<Vec<u8>>,
}

impl Stream {
    /// An input stream over the given bytes, positioned at the start.
    pub fn reader(data: impl Into<Vec<u8>>) -> Self {
        Stream {
            cur: std::io::Cursor::new(data.into()),
        }
    }

    /// An empty output stream.
    pub fn writer() -> Self {
        Stream {
            cur: std::io::Cursor::new(Vec::new()),
        }
    }

    pub fn position(&self) -> u64 {
        self.cur.position()
    }

    pub fn seek(&mut self, pos: u64) {
        self.cur.set_position(pos);
    }

    /// Bytes from the current position to the end.
    pub fn remaining(&self) -> u64 {
        (self.cur.get_ref().len() as u64).saturating_sub(self.cur.position())
    }

    /// Read exactly `n` bytes or fail with UnexpectedEnd, leaving the
    /// position where it was.
    pub fn read_exact(&mut self, n: u64) -> Result<Vec<u8>> {
        let found = self.remaining();
        if found < n {
            return Err(Error::new(
                ErrorKind::UnexpectedEnd {
                    needed: n - found,
                    found,
                },
                self.position(),
            ));
        }
        let mut buf = vec![0u8; n as usize];
        self.cur
            .read_exact(&mut buf)
            .map_err(|_| self.unexpected_end(n))?;
        Ok(buf)
    }

    /// Read a single byte, or `None` at end of stream.
    pub fn read_byte(&mut self) -> Option<u8> {
        let mut b = [0u8; 1];
        match self.cur.read_exact(&mut b) {
            Ok(()) => Some(b[0]),
            Err(_) => None,
        }
    }

    /// Read every byte from the current position to the end.
    pub fn read_to_end(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Reading from an in-memory cursor cannot fail.
        let _ = self.cur.read_to_end(&mut buf);
        buf
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        // A gap left by a forward seek is zero-filled by Cursor<Vec<u8>>.
        self.cur
            .write_all(data)
            .map_err(|e| Error::new(ErrorKind::Adapter(e.to_string()), self.position()))
    }

    /// Consume the stream, returning the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.cur.into_inner()
    }

    fn unexpected_end(&self, needed: u64) -> Error {
        Error::new(
            ErrorKind::UnexpectedEnd {
                needed,
                found: self.remaining(),
            },
            self.position(),
        )
    }
}
