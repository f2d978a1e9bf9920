//! Overview records (OVER, XOVER and XZVER).
//!
//! Each line holds at least eight tab separated fields: number, subject,
//! from, date, message-id, references, bytes, lines, followed by any extra
//! fields the server is configured to add.

use crate::error::{Error, Result};
use crate::pipeline::ChunkSource;
use crate::response::{decode_text, trim_line_end};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Number of fields every overview line must carry.
pub const MIN_FIELDS: usize = 8;

/// One-line summary of an article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverviewRecord {
    /// Article number in the group
    pub number: u64,
    /// Subject header, empty if missing
    pub subject: String,
    /// From header, empty if missing
    pub from: String,
    /// Parsed Date header, `None` if missing or unparseable
    pub date: Option<DateTime<Utc>>,
    /// Message-ID header, empty if missing
    pub message_id: String,
    /// Message-IDs from the References header
    pub references: Vec<String>,
    /// Article size in bytes (`:bytes`)
    pub bytes: u64,
    /// Article size in lines (`:lines`), 0 when unspecified
    pub lines: u64,
    /// Additional fields, verbatim
    pub extra: Vec<String>,
}

impl OverviewRecord {
    /// Parse one overview line, with or without its terminator.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_matches([' ', '\r', '\n']);
        let mut fields: Vec<String> = line.split('\t').map(str::to_string).collect();
        if fields.len() < MIN_FIELDS {
            return Err(Error::Protocol(format!(
                "short header listing line: {line} ({} fields)",
                fields.len()
            )));
        }

        let number = fields[0].parse().map_err(|_| {
            Error::Protocol(format!("bad message number '{}' in line: {line}", fields[0]))
        })?;

        let bytes = repair_split_references(&mut fields, line)?;

        let lines = if fields[7].is_empty() {
            0
        } else {
            fields[7].parse().map_err(|_| {
                Error::Protocol(format!("bad line count {:?} in line {line:?}", fields[7]))
            })?
        };

        let references = fields[5]
            .split(' ')
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        let extra = fields.split_off(MIN_FIELDS);

        Ok(Self {
            number,
            subject: std::mem::take(&mut fields[1]),
            from: std::mem::take(&mut fields[2]),
            date: parse_date(&fields[3]),
            message_id: std::mem::take(&mut fields[4]),
            references,
            bytes,
            lines,
            extra,
        })
    }
}

/// Work around servers that put unescaped tabs inside the references field.
///
/// While the presumed bytes field does not parse and there are still at
/// least eight fields, glue it onto references and try the next one. This
/// can misread other malformed lines; it is only here for those servers.
fn repair_split_references(fields: &mut Vec<String>, line: &str) -> Result<u64> {
    while fields.len() >= MIN_FIELDS {
        match fields[6].parse() {
            Ok(bytes) => return Ok(bytes),
            Err(_) => {
                let stray = fields.remove(6);
                debug!(stray = %stray, "gluing stray overview field onto references");
                fields[5].push_str(&stray);
            }
        }
    }
    Err(Error::Protocol(format!("bad byte count in line: {line}")))
}

/// Parse an RFC 5322 date, falling back to the lenient RFC 822 parser for
/// the obsolete forms found in old articles.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    mail_parser::DateTime::parse_rfc822(value)
        .and_then(|date| DateTime::from_timestamp(date.to_timestamp(), 0))
}

/// Decode overview lines until a "." line or the end of the source.
pub async fn read_overview<L: ChunkSource + ?Sized>(lines: &mut L) -> Result<Vec<OverviewRecord>> {
    let mut records = Vec::new();
    while let Some(line) = lines.next_chunk().await? {
        let text = decode_text(&line);
        let text = trim_line_end(&text);
        if text == "." {
            break;
        }
        records.push(OverviewRecord::parse(text)?);
    }
    Ok(records)
}
