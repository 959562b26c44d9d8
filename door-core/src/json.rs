//! Flat JSON request bodies written straight into a bounded buffer.

use core::fmt::{self, Write};

/// Write `s` as a JSON string literal, quotes included.
pub fn write_str<W: Write>(out: &mut W, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

/// Builds a flat JSON object member by member.
pub struct ObjectWriter<'w, W: Write> {
    out: &'w mut W,
    first: bool,
}

impl<'w, W: Write> ObjectWriter<'w, W> {
    pub fn new(out: &'w mut W) -> Result<Self, fmt::Error> {
        out.write_char('{')?;
        Ok(Self { out, first: true })
    }

    fn key(&mut self, key: &str) -> fmt::Result {
        if !self.first {
            self.out.write_char(',')?;
        }
        self.first = false;
        write_str(self.out, key)?;
        self.out.write_char(':')
    }

    pub fn str(&mut self, key: &str, value: &str) -> Result<&mut Self, fmt::Error> {
        self.key(key)?;
        write_str(self.out, value)?;
        Ok(self)
    }

    pub fn u64(&mut self, key: &str, value: u64) -> Result<&mut Self, fmt::Error> {
        self.key(key)?;
        write!(self.out, "{}", value)?;
        Ok(self)
    }

    pub fn finish(self) -> fmt::Result {
        self.out.write_char('}')
    }
}
