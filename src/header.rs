//! Article header parsing.
//!
//! Headers are RFC 822 style `Key: value` lines, folded onto following lines
//! that start with a space or tab, ended by an empty line or by the end of
//! the block. NNTP gives repeated keys no comma-joining semantics, so every
//! occurrence is kept as its own value.

use crate::error::{Error, Result};
use crate::pipeline::ChunkSource;
use crate::response::decode_text;

/// Ordered multi-map from canonical header name to raw values.
///
/// Keys keep the order in which they were first seen; values keep wire
/// order within a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a complete header block held in memory.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut parser = HeaderParser::new();
        for line in data.split_inclusive(|&b| b == b'\n') {
            if parser.feed_line(line)? {
                break;
            }
        }
        Ok(parser.finish())
    }

    /// Add a value under `key`, after any existing values.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        let key = canonical_key(key);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    /// First value for `key`, looked up case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// All values for `key`, looked up case-insensitively.
    pub fn get_all(&self, key: &str) -> &[String] {
        let key = canonical_key(key);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        !self.get_all(key).is_empty()
    }

    /// Iterate keys with their values in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no header is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as `Key: value` lines, one per value, LF terminated.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for (key, values) in &self.entries {
            for value in values {
                out.extend_from_slice(key.as_bytes());
                out.extend_from_slice(b": ");
                out.extend_from_slice(value.as_bytes());
                out.push(b'\n');
            }
        }
    }
}

/// Incremental header parser fed one line at a time.
#[derive(Debug, Default)]
pub struct HeaderParser {
    headers: Headers,
    current: Option<(String, String)>,
    done: bool,
}

impl HeaderParser {
    /// Fresh parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line, terminator included.
    ///
    /// Returns `true` once the blank line ending the header was seen.
    pub fn feed_line(&mut self, line: &[u8]) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        let folded = matches!(line.first(), Some(b' ' | b'\t'));
        let text = decode_text(chop_line(line));

        if folded {
            let Some((_, value)) = self.current.as_mut() else {
                return Err(malformed(&text));
            };
            value.push(' ');
            value.push_str(text.trim_start_matches([' ', '\t']));
            return Ok(false);
        }

        self.flush();
        if text.is_empty() {
            self.done = true;
            return Ok(true);
        }

        let Some(colon) = text.find(':') else {
            return Err(malformed(&text));
        };
        let key = &text[..colon];
        if key.contains(' ') {
            return Err(malformed(&text));
        }
        let value = text[colon + 1..].trim_start_matches([' ', '\t']);
        self.current = Some((key.to_string(), value.to_string()));
        Ok(false)
    }

    /// Finish parsing and return the headers seen so far.
    pub fn finish(mut self) -> Headers {
        self.flush();
        self.headers
    }

    fn flush(&mut self) {
        if let Some((key, value)) = self.current.take() {
            self.headers.append(&key, value);
        }
    }
}

/// Read a header block from a line source, stopping at the blank line or
/// at the end of the source.
pub async fn read_headers<L: ChunkSource + ?Sized>(lines: &mut L) -> Result<Headers> {
    let mut parser = HeaderParser::new();
    while let Some(line) = lines.next_chunk().await? {
        if parser.feed_line(&line)? {
            break;
        }
    }
    Ok(parser.finish())
}

/// Canonical form of a header key: first letter and every letter after a
/// hyphen upper case, the rest lower case. Keys with characters outside the
/// RFC 7230 token set are returned unchanged.
pub fn canonical_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_string();
    }
    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Strip trailing CR, LF and tab.
fn chop_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| !matches!(b, b'\r' | b'\n' | b'\t'))
        .map_or(0, |i| i + 1);
    &line[..end]
}

fn malformed(line: &str) -> Error {
    Error::Protocol(format!("malformed header line: {line}"))
}
