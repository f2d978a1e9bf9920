//! Generic async NNTP session.
//!
//! [`NntpClient`] combines the sans-io [`Client`] with a stream implementing
//! [`AsyncStream`], so the same session code runs on tokio, async-std, smol
//! or an in-memory [`MockStream`](crate::mock::MockStream).
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "tokio-runtime")]
//! # {
//! use nntp_session::net_client::NntpClient;
//! use nntp_session::runtime::TokioStream;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = NntpClient::<TokioStream>::connect("news.example.com:119").await?;
//! let group = client.group("misc.test").await?;
//! for record in client.overview(group.low, group.high).await? {
//!     println!("{} {}", record.number, record.subject);
//! }
//! client.quit().await?;
//! # Ok(())
//! # }
//! # }
//! ```

use crate::body::{BodyReader, LineMode};
use crate::client::Quirks;
use crate::command::ArticleRange;
use crate::config::ClientConfig;
use crate::header::{read_headers, Headers};
use crate::overview::{read_overview, OverviewRecord};
use crate::pipeline::{Inflate, LineSplitter, YencDecoder};
use crate::response::{
    decode_text, dedup_message_ids, parse_article_pointer, parse_group_status, parse_groups,
    parse_server_date, read_text_lines, Article, ArticlePointer, GroupListing, GroupStatus,
};
use crate::runtime::AsyncStream;
use crate::status::{ExpectedCode, StatusLine};
use crate::{ArticleSpec, Client, Command, Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

/// NNTP session over any async stream.
///
/// Commands are strictly sequential. Operations that return a
/// [`BodyReader`] or an [`Article`] keep the session borrowed until the
/// body is dropped; an unread remainder is drained before the next command.
///
/// # Type Parameters
///
/// * `S` - The stream type implementing [`AsyncStream`], typically one of:
///   - [`TokioStream`](crate::runtime::TokioStream) for tokio
///   - [`AsyncStdStream`](crate::runtime::AsyncStdStream) for async-std
///   - [`SmolStream`](crate::runtime::SmolStream) for smol
pub struct NntpClient<S: AsyncStream> {
    /// The sans-io client handling framing and session state.
    client: Client,
    /// The async stream for network I/O.
    stream: S,
    config: ClientConfig,
    read_buf: Vec<u8>,
    /// Whether posting is allowed on this connection.
    posting_allowed: bool,
    greeting: String,
}

impl<S: AsyncStream> NntpClient<S> {
    /// Connect to an NNTP server and read its greeting.
    ///
    /// # Arguments
    ///
    /// * `addr` - Server address in format "host:port"
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_config(addr, ClientConfig::default()).await
    }

    /// Connect with explicit settings.
    pub async fn connect_with_config(addr: &str, config: ClientConfig) -> Result<Self> {
        let stream = S::connect(addr)
            .await
            .map_err(|e| Error::Connection(format!("failed to connect to {addr}: {e}")))?;
        Self::from_stream_with_config(stream, config).await
    }

    /// Start a session on an already established transport, for example a
    /// TLS stream set up by the caller.
    pub async fn from_stream(stream: S) -> Result<Self> {
        Self::from_stream_with_config(stream, ClientConfig::default()).await
    }

    /// Start a session on an established transport with explicit settings.
    ///
    /// The greeting must be a 2xx status; 200 means posting is allowed.
    pub async fn from_stream_with_config(stream: S, config: ClientConfig) -> Result<Self> {
        let mut session = Self {
            client: Client::with_config(&config),
            stream,
            read_buf: vec![0; config.read_chunk_size.max(1)],
            config,
            posting_allowed: false,
            greeting: String::new(),
        };
        let greeting = session
            .read_status()
            .await?
            .expect(ExpectedCode::HundredsDigit(2))?;
        session.posting_allowed = greeting.code == 200;
        session.greeting = greeting.message;
        debug!(posting_allowed = session.posting_allowed, "connected");
        Ok(session)
    }

    /// Send one command and validate its status line.
    ///
    /// A body left unread by an earlier operation is drained first. A
    /// status that does not satisfy `expected` is returned as
    /// [`Error::Status`].
    pub async fn execute(&mut self, expected: ExpectedCode, command: &Command) -> Result<StatusLine> {
        self.drain_pending().await?;
        let request = self.client.encode_command(command)?;
        debug!(command = %command.log_line(), "sending command");
        self.stream.write_all(&request).await?;
        self.read_status().await?.expect(expected)
    }

    /// Fail on a closed session, then read off any body left unread.
    async fn drain_pending(&mut self) -> Result<()> {
        self.client.ensure_open()?;
        if self.client.body_pending() {
            debug!("draining unread response body");
            BodyReader::new(self, LineMode::Text).discard().await?;
        }
        Ok(())
    }

    async fn read_status(&mut self) -> Result<StatusLine> {
        let line = self.read_line().await?;
        let status = StatusLine::parse(&decode_text(&line))?;
        debug!(code = status.code, message = %status.message, "received status");
        Ok(status)
    }

    /// Read one raw line, terminator included, refilling from the stream.
    pub(crate) async fn read_line(&mut self) -> Result<Bytes> {
        loop {
            if let Some(line) = self.client.take_line()? {
                trace!(len = line.len(), "line received");
                return Ok(line);
            }
            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionLost);
            }
            self.client.feed_bytes(&self.read_buf[..n]);
        }
    }

    pub(crate) fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    /// Log in with AUTHINFO USER, sending AUTHINFO PASS only when the
    /// server asks for it with a 3xx code.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let user = Command::AuthInfoUser(username.to_string());
        match self.execute(ExpectedCode::HundredsDigit(2), &user).await {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.status_code(), Some(300..=399)) => {
                let pass = Command::AuthInfoPass(password.to_string());
                self.execute(ExpectedCode::HundredsDigit(2), &pass).await?;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Switch a mode-switching server to reader mode.
    pub async fn mode_reader(&mut self) -> Result<()> {
        let status = self
            .execute(ExpectedCode::TensAndHundreds(20), &Command::ModeReader)
            .await?;
        self.posting_allowed = status.code == 200;
        Ok(())
    }

    /// Capability lines announced by the server.
    pub async fn capabilities(&mut self) -> Result<Vec<String>> {
        self.execute(ExpectedCode::Exact(101), &Command::Capabilities)
            .await?;
        BodyReader::new(self, LineMode::Text).read_lines().await
    }

    /// Extensions listed by LIST EXTENSIONS.
    pub async fn list_extensions(&mut self) -> Result<Vec<String>> {
        self.execute(ExpectedCode::Exact(202), &Command::ListExtensions)
            .await?;
        BodyReader::new(self, LineMode::Text).read_lines().await
    }

    /// Current time on the server.
    pub async fn date(&mut self) -> Result<DateTime<Utc>> {
        let status = self.execute(ExpectedCode::Exact(111), &Command::Date).await?;
        parse_server_date(&status.message)
    }

    /// Ask the server to compress multi-line responses
    /// (`XFEATURE COMPRESS GZIP`).
    pub async fn enable_compression(&mut self) -> Result<()> {
        self.execute(ExpectedCode::Exact(290), &Command::XFeatureCompressGzip)
            .await?;
        Ok(())
    }

    /// Groups created since `since`.
    pub async fn new_groups(&mut self, since: DateTime<Utc>) -> Result<Vec<GroupStatus>> {
        let status = self
            .execute(ExpectedCode::Exact(231), &Command::NewGroups(since))
            .await?;
        let lines = self.read_listing(&status).await?;
        parse_groups(&lines)
    }

    /// Raw LIST output. `pattern` is only sent together with a `keyword`.
    pub async fn list(&mut self, keyword: Option<&str>, pattern: Option<&str>) -> Result<Vec<String>> {
        let command = Command::List {
            keyword: keyword.map(str::to_string),
            pattern: pattern.map(str::to_string),
        };
        let status = self.execute(ExpectedCode::Exact(215), &command).await?;
        self.read_listing(&status).await
    }

    /// Active groups, optionally filtered by a wildmat.
    pub async fn list_active(&mut self, pattern: Option<&str>) -> Result<Vec<GroupStatus>> {
        let lines = self.list(Some("ACTIVE"), pattern).await?;
        parse_groups(&lines)
    }

    /// Message-ids of articles posted to groups matching `group` since
    /// `since`, sorted and without duplicates.
    pub async fn new_news(&mut self, group: &str, since: DateTime<Utc>) -> Result<Vec<String>> {
        let command = Command::NewNews {
            wildmat: group.to_string(),
            since,
        };
        self.execute(ExpectedCode::Exact(230), &command).await?;
        let ids = BodyReader::new(self, LineMode::Text).read_lines().await?;
        Ok(dedup_message_ids(ids))
    }

    /// Select a group.
    ///
    /// A malformed status line fails with [`Error::GroupStatus`], which
    /// still carries the requested name and whatever numbers parsed.
    pub async fn group(&mut self, name: &str) -> Result<GroupStatus> {
        let status = self
            .execute(ExpectedCode::Exact(211), &Command::Group(name.to_string()))
            .await?;
        parse_group_status(&status.message, name)
    }

    /// Select a group and list its article numbers, optionally limited to
    /// `range`.
    pub async fn list_group(&mut self, name: &str, range: Option<ArticleRange>) -> Result<GroupListing> {
        let command = Command::ListGroup {
            group: name.to_string(),
            range,
        };
        let status = self.execute(ExpectedCode::Exact(211), &command).await?;
        let mut group = if status.message.splitn(4, ' ').count() >= 3 {
            parse_group_status(&status.message, name)?
        } else {
            GroupStatus::default()
        };
        group.name = name.to_string();

        let mut articles = Vec::new();
        let mut body = BodyReader::new(self, LineMode::Text);
        while let Some(line) = body.next_line().await? {
            let text = decode_text(&line);
            let text = text.trim();
            let number = text
                .parse()
                .map_err(|_| Error::Protocol(format!("bad article number in listing: {text}")))?;
            articles.push(number);
        }
        Ok(GroupListing {
            status: group,
            articles,
        })
    }

    /// Server help text.
    pub async fn help(&mut self) -> Result<BodyReader<'_, S>> {
        self.execute(ExpectedCode::Exact(100), &Command::Help).await?;
        Ok(BodyReader::new(self, LineMode::Text))
    }

    /// Look up an article, returning its number in the current group
    /// (0 if it is not there) and its message-id.
    pub async fn stat(&mut self, spec: impl Into<ArticleSpec>) -> Result<ArticlePointer> {
        self.article_pointer(Command::Stat(spec.into()), "STAT").await
    }

    /// Select the next article.
    pub async fn next(&mut self) -> Result<ArticlePointer> {
        self.article_pointer(Command::Next, "NEXT").await
    }

    /// Select the previous article.
    pub async fn last(&mut self) -> Result<ArticlePointer> {
        self.article_pointer(Command::Last, "LAST").await
    }

    async fn article_pointer(&mut self, command: Command, verb: &str) -> Result<ArticlePointer> {
        let status = self.execute(ExpectedCode::Exact(223), &command).await?;
        parse_article_pointer(&status.message, verb)
    }

    /// Retrieve an article with its header parsed and its body left on the
    /// wire.
    pub async fn article(&mut self, spec: impl Into<ArticleSpec>) -> Result<Article<'_, S>> {
        self.execute(ExpectedCode::Exact(220), &Command::Article(spec.into()))
            .await?;
        let mut body = BodyReader::new(self, LineMode::Text);
        let headers = read_headers(&mut body).await?;
        Ok(Article { headers, body })
    }

    /// Retrieve a whole article as plain text.
    pub async fn article_text(&mut self, spec: impl Into<ArticleSpec>) -> Result<BodyReader<'_, S>> {
        self.execute(ExpectedCode::Exact(220), &Command::Article(spec.into()))
            .await?;
        Ok(BodyReader::new(self, LineMode::Text))
    }

    /// Retrieve an article header as plain text.
    pub async fn head_text(&mut self, spec: impl Into<ArticleSpec>) -> Result<BodyReader<'_, S>> {
        self.execute(ExpectedCode::Exact(221), &Command::Head(spec.into()))
            .await?;
        Ok(BodyReader::new(self, LineMode::Text))
    }

    /// Retrieve and parse an article header.
    pub async fn head(&mut self, spec: impl Into<ArticleSpec>) -> Result<Headers> {
        let mut body = self.head_text(spec).await?;
        let headers = read_headers(&mut body).await?;
        body.discard().await?;
        Ok(headers)
    }

    /// Retrieve an article body.
    pub async fn body(&mut self, spec: impl Into<ArticleSpec>) -> Result<BodyReader<'_, S>> {
        self.execute(ExpectedCode::Exact(222), &Command::Body(spec.into()))
            .await?;
        Ok(BodyReader::new(self, LineMode::Text))
    }

    /// Post an article given in plain text format.
    ///
    /// Lines are sent CRLF terminated and dot-stuffed; the server must
    /// answer POST with 3xx and the final "." with 240.
    pub async fn post_raw(&mut self, article: &[u8]) -> Result<()> {
        self.execute(ExpectedCode::HundredsDigit(3), &Command::Post)
            .await?;
        let payload = encode_article(article);
        debug!(bytes = payload.len(), "sending article");
        self.stream.write_all(&payload).await?;
        self.execute(ExpectedCode::Exact(240), &Command::EndOfArticle)
            .await?;
        Ok(())
    }

    /// Post an article built from headers and an optional body.
    pub async fn post(&mut self, headers: &Headers, body: Option<&[u8]>) -> Result<()> {
        let mut article = Vec::new();
        headers.write_to(&mut article);
        if let Some(body) = body {
            article.push(b'\n');
            article.extend_from_slice(body);
        }
        self.post_raw(&article).await
    }

    /// Send QUIT and close the transport.
    ///
    /// The session is closed afterwards whatever the outcome; every later
    /// call fails with [`Error::Closed`].
    pub async fn quit(&mut self) -> Result<()> {
        self.client.ensure_open()?;
        let result = self.execute(ExpectedCode::Any, &Command::Quit).await;
        let shutdown = self.stream.shutdown().await;
        self.client.close();
        result?;
        shutdown?;
        Ok(())
    }

    /// Overview records for articles `begin..=end` of the current group.
    ///
    /// Tries XZVER first unless this connection already refused it, then
    /// OVER, then XOVER if OVER is not recognized. When XOVER fails too the
    /// OVER error is returned.
    pub async fn overview(&mut self, begin: u64, end: u64) -> Result<Vec<OverviewRecord>> {
        let range = ArticleRange::new(begin, end);
        // Errors here are not XZVER's to absorb.
        self.drain_pending().await?;

        if self.client.quirks().should_try_xzver() {
            match self.execute(ExpectedCode::Exact(224), &Command::Xzver(range)).await {
                Ok(_) => {
                    if !self.client.quirks().xzver_supported {
                        debug!("XZVER accepted, using compressed overviews");
                    }
                    self.client.quirks_mut().xzver_supported = true;
                    return self.read_xzver().await;
                }
                Err(err) => {
                    debug!(error = %err, "XZVER refused, falling back to OVER");
                    self.client.quirks_mut().xzver_unsupported = true;
                }
            }
        }

        let status = match self.execute(ExpectedCode::Exact(224), &Command::Over(range)).await {
            Ok(status) => status,
            Err(err) if err.is_command_not_recognized() => {
                match self.execute(ExpectedCode::Exact(224), &Command::Xover(range)).await {
                    Ok(status) => status,
                    Err(xerr) => {
                        debug!(error = %xerr, "XOVER failed too");
                        return Err(err);
                    }
                }
            }
            Err(err) => return Err(err),
        };

        if status.is_gzip_compressed() {
            let body = BodyReader::new(self, LineMode::Binary);
            let mut lines = LineSplitter::new(Inflate::zlib_or_gzip(body));
            let records = read_overview(&mut lines).await?;
            lines.into_inner().finish().await?;
            Ok(records)
        } else {
            let mut body = BodyReader::new(self, LineMode::Text);
            read_overview(&mut body).await
        }
    }

    /// Decode an XZVER block: yEnc framing around raw DEFLATE around
    /// plain overview lines, followed by the "." terminator.
    async fn read_xzver(&mut self) -> Result<Vec<OverviewRecord>> {
        let body = BodyReader::new(self, LineMode::Text);
        let mut lines = LineSplitter::new(Inflate::raw(YencDecoder::new(body)));
        let records = read_overview(&mut lines).await?;
        let yenc = lines.into_inner().finish().await?;
        let mut body = yenc.finish().await?;
        if let Some(line) = body.next_line().await? {
            return Err(Error::Protocol(format!(
                "unexpected data after XZVER: {:?}",
                decode_text(&line)
            )));
        }
        Ok(records)
    }

    /// Text lines of a listing, inflating it when the status carries the
    /// `[COMPRESS=GZIP]` marker.
    async fn read_listing(&mut self, status: &StatusLine) -> Result<Vec<String>> {
        if status.is_gzip_compressed() {
            let body = BodyReader::new(self, LineMode::Binary);
            let mut lines = LineSplitter::new(Inflate::zlib_or_gzip(body));
            let text = read_text_lines(&mut lines).await?;
            lines.into_inner().finish().await?;
            Ok(text)
        } else {
            BodyReader::new(self, LineMode::Text).read_lines().await
        }
    }

    /// Check if posting is allowed on this connection.
    ///
    /// Taken from the greeting (200 allowed, 201 prohibited) and updated
    /// by MODE READER.
    pub fn is_posting_allowed(&self) -> bool {
        self.posting_allowed
    }

    /// Text of the server greeting.
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// XZVER knowledge gathered on this connection.
    pub fn quirks(&self) -> Quirks {
        self.client.quirks()
    }

    /// Settings this session was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether QUIT has been sent.
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// The underlying transport.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

/// Turn a plain text article into POST payload: every line CRLF terminated,
/// lines starting with "." get another one.
fn encode_article(article: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(article.len() + article.len() / 32 + 2);
    for line in article.split_inclusive(|&b| b == b'\n') {
        let line = line
            .strip_suffix(b"\n")
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .unwrap_or(line);
        if line.starts_with(b".") {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out
}
