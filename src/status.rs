//! Status line parsing and expected-code matching.
//!
//! Every command answers with exactly one status line: a three digit code, a
//! space, and free text. Callers state what they expect with an
//! [`ExpectedCode`]; anything else becomes [`Error::Status`].

use crate::error::{Error, Result};

/// How much of a response code must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedCode {
    /// Accept any code without validation
    Any,
    /// Hundreds digit must match, `HundredsDigit(2)` accepts 200-299
    HundredsDigit(u8),
    /// Hundreds and tens digits must match, `TensAndHundreds(22)` accepts 220-229
    TensAndHundreds(u8),
    /// Code must match exactly
    Exact(u16),
}

impl ExpectedCode {
    /// Decode the compact numeric convention: 0 accepts anything, 1-9 match
    /// the hundreds digit, 10-99 the first two digits, 100-999 exactly.
    pub fn from_compact(code: u16) -> Self {
        match code {
            0 => ExpectedCode::Any,
            1..=9 => ExpectedCode::HundredsDigit(code as u8),
            10..=99 => ExpectedCode::TensAndHundreds(code as u8),
            _ => ExpectedCode::Exact(code),
        }
    }

    /// Check a response code against this expectation.
    pub fn matches(&self, code: u16) -> bool {
        match *self {
            ExpectedCode::Any => true,
            ExpectedCode::HundredsDigit(d) => code / 100 == d as u16,
            ExpectedCode::TensAndHundreds(d) => code / 10 == d as u16,
            ExpectedCode::Exact(expected) => code == expected,
        }
    }
}

impl From<u16> for ExpectedCode {
    fn from(code: u16) -> Self {
        ExpectedCode::from_compact(code)
    }
}

/// A parsed status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Three digit response code
    pub code: u16,
    /// Text after the code
    pub message: String,
}

impl StatusLine {
    /// Parse a status line, with or without its line terminator.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let bytes = line.as_bytes();
        if bytes.len() < 4 || bytes[3] != b' ' {
            return Err(Error::Protocol(format!("short response: {line:?}")));
        }
        let code = parse_status_code(&bytes[..3])
            .ok_or_else(|| Error::Protocol(format!("invalid response code: {line}")))?;
        Ok(Self {
            code,
            message: line[4..].to_string(),
        })
    }

    /// Turn this line into a status error unless it satisfies `expected`.
    pub fn expect(self, expected: ExpectedCode) -> Result<Self> {
        if expected.matches(self.code) {
            Ok(self)
        } else {
            Err(Error::Status {
                code: self.code,
                message: self.message,
            })
        }
    }

    /// True when the status text carries the `[COMPRESS=GZIP]` marker.
    pub fn is_gzip_compressed(&self) -> bool {
        self.message.contains(GZIP_MARKER)
    }
}

/// Marker placed in a status line when the following block is compressed.
pub const GZIP_MARKER: &str = "[COMPRESS=GZIP]";

/// Parse a 3-digit ASCII status code from bytes.
fn parse_status_code(data: &[u8]) -> Option<u16> {
    if data.len() < 3 {
        return None;
    }
    // Each byte must be an ASCII digit
    if !data[0].is_ascii_digit() || !data[1].is_ascii_digit() || !data[2].is_ascii_digit() {
        return None;
    }
    let code = (data[0] - b'0') as u16 * 100
        + (data[1] - b'0') as u16 * 10
        + (data[2] - b'0') as u16;
    Some(code)
}
