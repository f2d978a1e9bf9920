//! NNTP command types and encoding.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;

/// Time format used by NEWGROUPS and NEWNEWS (`yyyyMMdd HHmmss`).
pub const NEW_SINCE_FORMAT: &str = "%Y%m%d %H%M%S";

/// NNTP commands that can be sent to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Request server capabilities
    Capabilities,

    /// List server extensions
    ListExtensions,

    /// Switch to reader mode
    ModeReader,

    /// Authenticate with username
    AuthInfoUser(String),

    /// Authenticate with password
    AuthInfoPass(String),

    /// Ask for the server's clock
    Date,

    /// Request help text
    Help,

    /// List groups created since the given time
    NewGroups(DateTime<Utc>),

    /// List articles posted to matching groups since the given time
    NewNews {
        /// Wildmat pattern for newsgroups
        wildmat: String,
        /// Lower time bound
        since: DateTime<Utc>,
    },

    /// LIST with optional keyword and wildmat
    List {
        /// Keyword such as ACTIVE or NEWSGROUPS
        keyword: Option<String>,
        /// Wildmat filter, only sent with a keyword
        pattern: Option<String>,
    },

    /// Select a newsgroup
    Group(String),

    /// Select a newsgroup and list its article numbers
    ListGroup {
        /// Group name
        group: String,
        /// Optional article range
        range: Option<ArticleRange>,
    },

    /// Get article status by message-id or number
    Stat(ArticleSpec),

    /// Advance the current article pointer
    Next,

    /// Move the current article pointer back
    Last,

    /// Retrieve full article by message-id or number
    Article(ArticleSpec),

    /// Retrieve article headers by message-id or number
    Head(ArticleSpec),

    /// Retrieve article body by message-id or number
    Body(ArticleSpec),

    /// Start posting an article
    Post,

    /// Lone "." ending a posted article
    EndOfArticle,

    /// Enable gzip-compressed multi-line responses
    XFeatureCompressGzip,

    /// Compressed overview (yEnc + DEFLATE)
    Xzver(ArticleRange),

    /// Overview (RFC 3977)
    Over(ArticleRange),

    /// Overview (legacy name)
    Xover(ArticleRange),

    /// Terminate connection
    Quit,
}

/// Article specification - either message-id or article number
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleSpec {
    /// Article number within current group
    Number(u64),
    /// Message-ID in angle brackets
    MessageId(String),
    /// Current article (no parameter)
    Current,
}

/// Inclusive article number range, `start-` when open ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleRange {
    /// First article number
    pub start: u64,
    /// Last article number, `None` for "to the end of the group"
    pub end: Option<u64>,
}

impl ArticleRange {
    /// Closed range `start-end`.
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Open range `start-`.
    pub fn starting_at(start: u64) -> Self {
        Self { start, end: None }
    }
}

impl fmt::Display for ArticleRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}

impl Command {
    /// Encode command as bytes for transmission to server
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = self.line()?.into_bytes();
        bytes.extend_from_slice(b"\r\n");
        Ok(bytes)
    }

    /// The command line without terminator, safe to log.
    pub fn log_line(&self) -> String {
        match self {
            Command::AuthInfoPass(_) => "AUTHINFO PASS ****".to_string(),
            other => other
                .line()
                .unwrap_or_else(|e| format!("<unencodable command: {e}>")),
        }
    }

    fn line(&self) -> Result<String> {
        let command_line = match self {
            Command::Capabilities => "CAPABILITIES".to_string(),
            Command::ListExtensions => "LIST EXTENSIONS".to_string(),
            Command::ModeReader => "MODE READER".to_string(),
            Command::AuthInfoUser(user) => {
                validate_parameter(user)?;
                format!("AUTHINFO USER {user}")
            }
            Command::AuthInfoPass(pass) => {
                validate_parameter(pass)?;
                format!("AUTHINFO PASS {pass}")
            }
            Command::Date => "DATE".to_string(),
            Command::Help => "HELP".to_string(),
            Command::NewGroups(since) => {
                format!("NEWGROUPS {} GMT", since.format(NEW_SINCE_FORMAT))
            }
            Command::NewNews { wildmat, since } => {
                validate_parameter(wildmat)?;
                format!("NEWNEWS {wildmat} {} GMT", since.format(NEW_SINCE_FORMAT))
            }
            Command::List { keyword, pattern } => match (keyword, pattern) {
                (None, None) => "LIST".to_string(),
                (Some(keyword), None) => {
                    validate_parameter(keyword)?;
                    format!("LIST {keyword}")
                }
                (Some(keyword), Some(pattern)) => {
                    validate_parameter(keyword)?;
                    validate_parameter(pattern)?;
                    format!("LIST {keyword} {pattern}")
                }
                (None, Some(_)) => {
                    return Err(Error::InvalidCommand(
                        "LIST pattern requires a keyword".to_string(),
                    ))
                }
            },
            Command::Group(group) => {
                validate_parameter(group)?;
                format!("GROUP {group}")
            }
            Command::ListGroup { group, range } => {
                validate_parameter(group)?;
                match range {
                    Some(range) => format!("LISTGROUP {group} {range}"),
                    None => format!("LISTGROUP {group}"),
                }
            }
            Command::Stat(spec) => with_spec("STAT", spec)?,
            Command::Next => "NEXT".to_string(),
            Command::Last => "LAST".to_string(),
            Command::Article(spec) => with_spec("ARTICLE", spec)?,
            Command::Head(spec) => with_spec("HEAD", spec)?,
            Command::Body(spec) => with_spec("BODY", spec)?,
            Command::Post => "POST".to_string(),
            Command::EndOfArticle => ".".to_string(),
            Command::XFeatureCompressGzip => "XFEATURE COMPRESS GZIP".to_string(),
            Command::Xzver(range) => format!("XZVER {range}"),
            Command::Over(range) => format!("OVER {range}"),
            Command::Xover(range) => format!("XOVER {range}"),
            Command::Quit => "QUIT".to_string(),
        };
        Ok(command_line)
    }
}

fn with_spec(verb: &str, spec: &ArticleSpec) -> Result<String> {
    let arg = spec.encode()?;
    if arg.is_empty() {
        Ok(verb.to_string())
    } else {
        Ok(format!("{verb} {arg}"))
    }
}

impl ArticleSpec {
    fn encode(&self) -> Result<String> {
        match self {
            ArticleSpec::Number(num) => Ok(num.to_string()),
            ArticleSpec::MessageId(id) => {
                if !id.starts_with('<') || !id.ends_with('>') {
                    return Err(Error::InvalidCommand(
                        "Message-ID must be enclosed in angle brackets".to_string(),
                    ));
                }
                validate_parameter(id)?;
                Ok(id.clone())
            }
            ArticleSpec::Current => Ok(String::new()),
        }
    }
}

impl From<u64> for ArticleSpec {
    fn from(number: u64) -> Self {
        ArticleSpec::Number(number)
    }
}

impl From<&str> for ArticleSpec {
    /// Empty selects the current article, digits an article number,
    /// anything else is taken as a message-id.
    fn from(id: &str) -> Self {
        if id.is_empty() {
            ArticleSpec::Current
        } else if let Ok(number) = id.parse() {
            ArticleSpec::Number(number)
        } else {
            ArticleSpec::MessageId(id.to_string())
        }
    }
}

/// Validate that a parameter doesn't contain invalid characters
fn validate_parameter(param: &str) -> Result<()> {
    if param.contains('\r') || param.contains('\n') {
        return Err(Error::InvalidCommand(
            "Parameters cannot contain line breaks".to_string(),
        ));
    }
    if param.is_empty() {
        return Err(Error::InvalidCommand(
            "Parameters cannot be empty".to_string(),
        ));
    }
    Ok(())
}
