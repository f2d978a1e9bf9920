//! NNTP response types and parsing.
//!
//! These are the thin parsers for single-line statuses and plain listings.
//! Headers and overview records have their own modules.

use crate::body::BodyReader;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::pipeline::ChunkSource;
use crate::runtime::AsyncStream;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Time format of the DATE response (`yyyyMMddHHmmss`).
pub const SERVER_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Information about a single newsgroup.
///
/// Produced by GROUP, LISTGROUP, LIST ACTIVE and NEWGROUPS. A snapshot,
/// never refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupStatus {
    /// Group name
    pub name: String,
    /// Estimated number of articles
    pub count: u64,
    /// Lowest article number
    pub low: u64,
    /// Highest article number
    pub high: u64,
    /// Posting status (`y`, `n`, `m`, ...), empty when the response has none
    pub status: String,
}

/// Result of LISTGROUP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupListing {
    /// Status of the selected group
    pub status: GroupStatus,
    /// Article numbers in server order
    pub articles: Vec<u64>,
}

/// Article number and message-id returned by STAT, NEXT and LAST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticlePointer {
    /// Article number, 0 when the article is not in the current group
    pub number: u64,
    /// Message-ID
    pub message_id: String,
}

/// An article with its header read and its body still on the wire.
///
/// The body borrows the session, so no other command can be issued until
/// the article is dropped. Whatever is left unread is drained before the
/// next command goes out.
pub struct Article<'a, S: AsyncStream> {
    /// Parsed header block
    pub headers: Headers,
    /// Remaining body
    pub body: BodyReader<'a, S>,
}

impl<S: AsyncStream> Article<'_, S> {
    /// Message-ID header, if present.
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("Message-Id")
    }
}

impl<S: AsyncStream> std::fmt::Debug for Article<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message_id() {
            Some(id) => write!(f, "[NNTP article {id}]"),
            None => write!(f, "[NNTP article]"),
        }
    }
}

/// Decode server text to a `String`.
///
/// Valid UTF-8 is taken as is. Anything else is read as Windows-1252, which
/// assigns a character to every byte and so covers legacy Latin-1 servers.
pub fn decode_text(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252.decode_without_bom_handling(data).0.into_owned(),
    }
}

/// Strip one trailing CRLF or LF.
pub(crate) fn trim_line_end(line: &str) -> &str {
    line.strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .unwrap_or(line)
}

/// Collect text lines from a line source until a "." line or its end.
pub async fn read_text_lines<L: ChunkSource + ?Sized>(lines: &mut L) -> Result<Vec<String>> {
    let mut out = Vec::new();
    while let Some(line) = lines.next_chunk().await? {
        let text = decode_text(&line);
        let text = trim_line_end(&text);
        if text == "." {
            break;
        }
        out.push(text.to_string());
    }
    Ok(out)
}

/// Parse the text of a 211 GROUP response: `count low high [name ...]`.
///
/// On malformed input the error carries whatever numbers parsed, under the
/// requested group name.
pub fn parse_group_status(line: &str, requested: &str) -> Result<GroupStatus> {
    let mut status = GroupStatus {
        name: requested.to_string(),
        ..GroupStatus::default()
    };
    let fields: Vec<&str> = line.splitn(4, ' ').collect();
    let bad = |status: GroupStatus| Error::GroupStatus {
        partial: Box::new(status),
        line: line.to_string(),
    };
    if fields.len() < 3 {
        return Err(bad(status));
    }
    for (i, field) in fields.iter().take(3).enumerate() {
        let Ok(n) = field.parse::<u64>() else {
            return Err(bad(status));
        };
        match i {
            0 => status.count = n,
            1 => status.low = n,
            _ => status.high = n,
        }
    }
    if let Some(name) = fields.get(3).and_then(|rest| rest.split_whitespace().next()) {
        status.name = name.to_string();
    }
    Ok(status)
}

/// Parse LIST ACTIVE / NEWGROUPS lines: `name high low status`.
pub fn parse_groups(lines: &[String]) -> Result<Vec<GroupStatus>> {
    lines.iter().map(|line| parse_active_line(line)).collect()
}

fn parse_active_line(line: &str) -> Result<GroupStatus> {
    let fields: Vec<&str> = line.trim().splitn(4, ' ').collect();
    if fields.len() < 4 {
        return Err(Error::Protocol(format!("short group info line: {line}")));
    }
    let number = |s: &str| {
        s.parse::<u64>()
            .map_err(|_| Error::Protocol(format!("bad number in line: {line}")))
    };
    Ok(GroupStatus {
        name: fields[0].to_string(),
        count: 0,
        high: number(fields[1])?,
        low: number(fields[2])?,
        status: fields[3].to_string(),
    })
}

/// Parse the 223 response text of STAT, NEXT and LAST: `number message-id [comment]`.
pub fn parse_article_pointer(line: &str, verb: &str) -> Result<ArticlePointer> {
    let fields: Vec<&str> = line.splitn(3, ' ').collect();
    if fields.len() < 2 {
        return Err(Error::Protocol(format!("bad response to {verb}: {line}")));
    }
    let number = fields[0]
        .parse()
        .map_err(|_| Error::Protocol(format!("bad article number in response to {verb}: {line}")))?;
    Ok(ArticlePointer {
        number,
        message_id: fields[1].to_string(),
    })
}

/// Sort message-ids by byte order and drop duplicates.
pub fn dedup_message_ids(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids.dedup();
    ids
}

/// Parse the 111 DATE response text.
pub fn parse_server_date(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, SERVER_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::Protocol(format!("invalid time: {text}")))
}
