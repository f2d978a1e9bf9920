//! RFC3977 compliance tests for the NNTP session.
//!
//! These tests replay the exchanges from RFC3977 against a scripted
//! [`MockStream`] and check both what the client sent and what it made of
//! the answers.

use chrono::{TimeZone, Utc};
use nntp_session::mock::encode::dot_block;
use nntp_session::mock::MockStream;
use nntp_session::{ArticleRange, ArticleSpec, Error, Headers, NntpClient};

const GREETING: &str = "200 news.example.com InterNetNews NNRP server ready";

async fn connect(stream: MockStream) -> NntpClient<MockStream> {
    NntpClient::from_stream(stream).await.unwrap()
}

/// Test greeting handling as per RFC3977 Section 5.1
#[tokio::test]
async fn test_rfc3977_greeting() {
    let client = connect(MockStream::new().greeting(GREETING)).await;
    assert!(client.is_posting_allowed());
    assert_eq!(client.greeting(), "news.example.com InterNetNews NNRP server ready");

    let client = connect(MockStream::new().greeting("201 NNTP Service Ready, posting prohibited")).await;
    assert!(!client.is_posting_allowed());

    let err = NntpClient::from_stream(MockStream::new().greeting("502 Service permanently unavailable"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.status_code(), Some(502));
}

/// Test capabilities exchange as per RFC3977 Section 5.2
#[tokio::test]
async fn test_rfc3977_capabilities() {
    let stream = MockStream::new().greeting(GREETING).expect(
        "CAPABILITIES",
        dot_block(
            "101 Capability list:",
            &["VERSION 2", "READER", "NEWNEWS", "OVER MSGID", "POST"],
        ),
    );
    let mut client = connect(stream).await;
    let caps = client.capabilities().await.unwrap();
    assert_eq!(caps, ["VERSION 2", "READER", "NEWNEWS", "OVER MSGID", "POST"]);
}

/// Test mode reader command as per RFC3977 Section 5.3
#[tokio::test]
async fn test_rfc3977_mode_reader() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("MODE READER", "201 Posting prohibited\r\n");
    let mut client = connect(stream).await;
    client.mode_reader().await.unwrap();
    assert!(!client.is_posting_allowed());
}

/// Test AUTHINFO USER/PASS as per RFC4643 Section 2.3
#[tokio::test]
async fn test_authinfo_password_requested() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("AUTHINFO USER alice", "381 Enter passphrase\r\n")
        .expect("AUTHINFO PASS s3cret", "281 Authentication accepted\r\n");
    let handle = stream.handle();
    let mut client = connect(stream).await;
    client.authenticate("alice", "s3cret").await.unwrap();
    assert_eq!(handle.written(), ["AUTHINFO USER alice", "AUTHINFO PASS s3cret"]);
}

#[tokio::test]
async fn test_authinfo_user_only() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("AUTHINFO USER alice", "281 Authentication accepted\r\n");
    let handle = stream.handle();
    let mut client = connect(stream).await;
    client.authenticate("alice", "unused").await.unwrap();
    assert_eq!(handle.written(), ["AUTHINFO USER alice"]);
}

#[tokio::test]
async fn test_authinfo_rejected() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("AUTHINFO USER alice", "381 Enter passphrase\r\n")
        .expect("AUTHINFO PASS wrong", "481 Authentication failed\r\n");
    let mut client = connect(stream).await;
    let err = client.authenticate("alice", "wrong").await.unwrap_err();
    assert_eq!(err.status_code(), Some(481));
}

/// Test group selection as per RFC3977 Section 6.1.1
#[tokio::test]
async fn test_rfc3977_group_selection() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("GROUP misc.test", "211 1234 3000 4234 misc.test\r\n")
        .expect("GROUP example.is.sob.bradner.or.barber", "411 example.is.sob.bradner.or.barber is unknown\r\n");
    let mut client = connect(stream).await;

    let group = client.group("misc.test").await.unwrap();
    assert_eq!(group.name, "misc.test");
    assert_eq!((group.count, group.low, group.high), (1234, 3000, 4234));

    let err = client
        .group("example.is.sob.bradner.or.barber")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(411));
    assert_eq!(err.to_string(), "411 example.is.sob.bradner.or.barber is unknown");
}

#[tokio::test]
async fn test_group_malformed_status_keeps_partial() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("GROUP misc.test", "211 1234 3000 lots misc.test\r\n");
    let mut client = connect(stream).await;
    match client.group("misc.test").await {
        Err(Error::GroupStatus { partial, .. }) => {
            assert_eq!(partial.name, "misc.test");
            assert_eq!(partial.count, 1234);
            assert_eq!(partial.low, 3000);
        }
        other => panic!("expected partial group status, got {other:?}"),
    }
}

/// Test LISTGROUP as per RFC3977 Section 6.1.2
#[tokio::test]
async fn test_rfc3977_listgroup() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect(
            "LISTGROUP misc.test 3000-3002",
            dot_block("211 2000 3000 3002 misc.test list follows", &["3000", "3002"]),
        )
        .expect(
            "LISTGROUP alt.test",
            dot_block("211 list follows", &["7"]),
        );
    let mut client = connect(stream).await;

    let listing = client
        .list_group("misc.test", Some(ArticleRange::new(3000, 3002)))
        .await
        .unwrap();
    assert_eq!(listing.status.name, "misc.test");
    assert_eq!(listing.status.count, 2000);
    assert_eq!(listing.articles, [3000, 3002]);

    let listing = client.list_group("alt.test", None).await.unwrap();
    assert_eq!(listing.status.name, "alt.test");
    assert_eq!(listing.status.high, 0);
    assert_eq!(listing.articles, [7]);
}

/// Test LAST and NEXT as per RFC3977 Sections 6.1.3 and 6.1.4
#[tokio::test]
async fn test_rfc3977_last_next() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("NEXT", "223 3001 <45223423@example.com> retrieved\r\n")
        .expect("LAST", "223 3000 <45223422@example.com> retrieved\r\n")
        .expect("LAST", "422 No previous article to retrieve\r\n");
    let mut client = connect(stream).await;

    let next = client.next().await.unwrap();
    assert_eq!(next.number, 3001);
    assert_eq!(next.message_id, "<45223423@example.com>");

    let last = client.last().await.unwrap();
    assert_eq!(last.number, 3000);

    let err = client.last().await.unwrap_err();
    assert!(err.is_transient());
}

/// Test STAT as per RFC3977 Section 6.2.4
#[tokio::test]
async fn test_rfc3977_stat() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("STAT <45223423@example.com>", "223 0 <45223423@example.com>\r\n")
        .expect("STAT 3000234", "423 No article with that number\r\n");
    let mut client = connect(stream).await;

    let ptr = client.stat("<45223423@example.com>").await.unwrap();
    assert_eq!(ptr.number, 0);
    assert_eq!(ptr.message_id, "<45223423@example.com>");

    let err = client.stat(ArticleSpec::Number(3000234)).await.unwrap_err();
    assert_eq!(err.status_code(), Some(423));
}

fn sample_article(status: &str) -> Vec<u8> {
    dot_block(
        status,
        &[
            "Path: pathost!demo!whitehouse!not-for-mail",
            "From: \"Demo User\" <nobody@example.net>",
            "Newsgroups: misc.test",
            "Subject: I am just a test article",
            "Date: 6 Oct 1998 04:38:40 -0500",
            "Organization: An Example Net, Uncertain, Texas",
            "Message-ID: <45223423@example.com>",
            "",
            "This is just a test article.",
            ".A line starting with a dot",
        ],
    )
}

/// Test ARTICLE as per RFC3977 Section 6.2.1
#[tokio::test]
async fn test_rfc3977_article() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("ARTICLE 3000", sample_article("220 3000 <45223423@example.com>"));
    let mut client = connect(stream).await;

    let mut article = client.article(ArticleSpec::Number(3000)).await.unwrap();
    assert_eq!(article.message_id(), Some("<45223423@example.com>"));
    assert_eq!(article.headers.get("subject"), Some("I am just a test article"));
    assert_eq!(format!("{article:?}"), "[NNTP article <45223423@example.com>]");

    let body = article.body.read_to_end().await.unwrap();
    assert_eq!(
        body,
        b"This is just a test article.\n.A line starting with a dot\n".to_vec()
    );
    assert!(article.body.is_finished());
}

/// Test ARTICLE in plain text form
#[tokio::test]
async fn test_article_text() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("ARTICLE <45223423@example.com>", sample_article("220 0 <45223423@example.com>"));
    let mut client = connect(stream).await;

    let text = client
        .article_text("<45223423@example.com>")
        .await
        .unwrap()
        .read_to_string()
        .await
        .unwrap();
    assert!(text.starts_with("Path: pathost!demo!whitehouse!not-for-mail\n"));
    assert!(text.ends_with("\n\nThis is just a test article.\n.A line starting with a dot\n"));
}

/// Test HEAD as per RFC3977 Section 6.2.2
#[tokio::test]
async fn test_rfc3977_head() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect(
            "HEAD 3000",
            dot_block(
                "221 3000 <45223423@example.com>",
                &[
                    "Path: pathost!demo!whitehouse!not-for-mail",
                    "Subject: I am just a test",
                    "  article",
                    "Message-ID: <45223423@example.com>",
                ],
            ),
        )
        .expect("HEAD", dot_block("221 3000 <45223423@example.com>", &["Subject: x"]))
        .expect("DATE", "111 19990623135624\r\n");
    let mut client = connect(stream).await;

    let headers = client.head(3000u64).await.unwrap();
    assert_eq!(headers.get("Subject"), Some("I am just a test article"));
    assert_eq!(headers.len(), 3);

    let text = client
        .head_text(ArticleSpec::Current)
        .await
        .unwrap()
        .read_lines()
        .await
        .unwrap();
    assert_eq!(text, ["Subject: x"]);

    let date = client.date().await.unwrap();
    assert_eq!(date, Utc.with_ymd_and_hms(1999, 6, 23, 13, 56, 24).unwrap());
}

/// Test BODY as per RFC3977 Section 6.2.3
#[tokio::test]
async fn test_rfc3977_body() {
    let stream = MockStream::new().greeting(GREETING).expect(
        "BODY <45223423@example.com>",
        dot_block("222 0 <45223423@example.com>", &["This is just a test article."]),
    );
    let mut client = connect(stream).await;
    let lines = client
        .body("<45223423@example.com>")
        .await
        .unwrap()
        .read_lines()
        .await
        .unwrap();
    assert_eq!(lines, ["This is just a test article."]);
}

/// Test POST as per RFC3977 Section 6.3.1
#[tokio::test]
async fn test_rfc3977_post() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("POST", "340 Input article; end with <CR-LF>.<CR-LF>\r\n")
        .absorb_article("240 Article received OK\r\n");
    let handle = stream.handle();
    let mut client = connect(stream).await;

    let mut headers = Headers::new();
    headers.append("from", "\"Demo User\" <nobody@example.net>");
    headers.append("newsgroups", "misc.test");
    headers.append("subject", "I am just a test article");
    client
        .post(&headers, Some(b"This is just a test article.\n.hidden\n"))
        .await
        .unwrap();

    assert_eq!(
        handle.written(),
        [
            "POST",
            "From: \"Demo User\" <nobody@example.net>",
            "Newsgroups: misc.test",
            "Subject: I am just a test article",
            "",
            "This is just a test article.",
            "..hidden",
            ".",
        ]
    );
    assert!(handle.is_finished());
}

#[tokio::test]
async fn test_rfc3977_post_refused() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("POST", "440 Posting not permitted\r\n");
    let handle = stream.handle();
    let mut client = connect(stream).await;
    let err = client.post_raw(b"Subject: x\n\nbody\n").await.unwrap_err();
    assert_eq!(err.status_code(), Some(440));
    assert_eq!(handle.written(), ["POST"]);
}

#[tokio::test]
async fn test_rfc3977_post_failed() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("POST", "340 Input article; end with <CR-LF>.<CR-LF>\r\n")
        .absorb_article("441 Posting failed\r\n");
    let mut client = connect(stream).await;
    let err = client.post_raw(b"Subject: x\r\n\r\nbody\r\n").await.unwrap_err();
    assert_eq!(err.status_code(), Some(441));
}

/// Test LIST ACTIVE as per RFC3977 Section 7.6.3
#[tokio::test]
async fn test_rfc3977_list_active() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect(
            "LIST ACTIVE",
            dot_block(
                "215 list of newsgroups follows",
                &["misc.test 3002322 3000234 y", "comp.risks 442001 441099 m"],
            ),
        )
        .expect(
            "LIST ACTIVE comp.*",
            dot_block("215 list of newsgroups follows", &["comp.risks 442001 441099 m"]),
        );
    let mut client = connect(stream).await;

    let groups = client.list_active(None).await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, "misc.test");
    assert_eq!(groups[0].high, 3002322);
    assert_eq!(groups[0].low, 3000234);
    assert_eq!(groups[1].status, "m");

    let groups = client.list_active(Some("comp.*")).await.unwrap();
    assert_eq!(groups[0].name, "comp.risks");
}

/// Test LIST NEWSGROUPS as raw lines as per RFC3977 Section 7.6.6
#[tokio::test]
async fn test_rfc3977_list_newsgroups() {
    let stream = MockStream::new().greeting(GREETING).expect(
        "LIST NEWSGROUPS",
        dot_block(
            "215 information follows",
            &["misc.test General Usenet testing", "alt.rfc-writers.recovery RFC Writers Recovery"],
        ),
    );
    let mut client = connect(stream).await;
    let lines = client.list(Some("NEWSGROUPS"), None).await.unwrap();
    assert_eq!(lines[0], "misc.test General Usenet testing");
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn test_list_extensions() {
    let stream = MockStream::new().greeting(GREETING).expect(
        "LIST EXTENSIONS",
        dot_block("202 Extensions supported:", &["OVER", "XFEATURE-COMPRESS"]),
    );
    let mut client = connect(stream).await;
    assert_eq!(client.list_extensions().await.unwrap(), ["OVER", "XFEATURE-COMPRESS"]);
}

/// Test NEWGROUPS as per RFC3977 Section 7.3
#[tokio::test]
async fn test_rfc3977_newgroups() {
    let stream = MockStream::new().greeting(GREETING).expect(
        "NEWGROUPS 19990624 000000 GMT",
        dot_block(
            "231 list of new newsgroups follows",
            &["alt.rfc-writers.recovery 4 1 y", "tx.natives.recovery 89 56 y"],
        ),
    );
    let mut client = connect(stream).await;
    let since = Utc.with_ymd_and_hms(1999, 6, 24, 0, 0, 0).unwrap();
    let groups = client.new_groups(since).await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].name, "tx.natives.recovery");
    assert_eq!((groups[1].high, groups[1].low), (89, 56));
}

/// Test NEWNEWS as per RFC3977 Section 7.4
#[tokio::test]
async fn test_rfc3977_newnews_sorted_unique() {
    let stream = MockStream::new().greeting(GREETING).expect(
        "NEWNEWS news.*,sci.* 19990624 000000 GMT",
        dot_block(
            "230 list of new articles by message-id follows",
            &[
                "<i.am.a.new.article@example.com>",
                "<i.am.another.new.article@example.com>",
                "<i.am.a.new.article@example.com>",
            ],
        ),
    );
    let mut client = connect(stream).await;
    let since = Utc.with_ymd_and_hms(1999, 6, 24, 0, 0, 0).unwrap();
    let ids = client.new_news("news.*,sci.*", since).await.unwrap();
    assert_eq!(
        ids,
        [
            "<i.am.a.new.article@example.com>",
            "<i.am.another.new.article@example.com>",
        ]
    );
}

/// Test DATE as per RFC3977 Section 7.1
#[tokio::test]
async fn test_rfc3977_date() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("DATE", "111 19990623135624\r\n")
        .expect("DATE", "111 yesterday\r\n");
    let mut client = connect(stream).await;
    let date = client.date().await.unwrap();
    assert_eq!(date, Utc.with_ymd_and_hms(1999, 6, 23, 13, 56, 24).unwrap());
    assert!(client.date().await.unwrap_err().is_protocol());
}

/// Test HELP as per RFC3977 Section 7.2
#[tokio::test]
async fn test_rfc3977_help() {
    let stream = MockStream::new().greeting(GREETING).expect(
        "HELP",
        dot_block(
            "100 Help text follows",
            &["This is some help text.  There is no specific", "formatting requirement for this test."],
        ),
    );
    let mut client = connect(stream).await;
    let mut help = client.help().await.unwrap();
    let lines = help.read_lines().await.unwrap();
    assert_eq!(lines.len(), 2);
    assert!(help.is_finished());
}

#[tokio::test]
async fn test_enable_compression() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("XFEATURE COMPRESS GZIP", "290 feature enabled\r\n")
        .expect("XFEATURE COMPRESS GZIP", "500 Unknown command\r\n");
    let mut client = connect(stream).await;
    client.enable_compression().await.unwrap();
    assert!(client
        .enable_compression()
        .await
        .unwrap_err()
        .is_command_not_recognized());
}

/// Test QUIT as per RFC3977 Section 5.4
#[tokio::test]
async fn test_rfc3977_quit() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("QUIT", "205 closing connection\r\n");
    let handle = stream.handle();
    let mut client = connect(stream).await;

    client.quit().await.unwrap();
    assert!(client.is_closed());
    assert!(handle.is_shutdown());

    assert!(matches!(client.date().await, Err(Error::Closed)));
    assert!(matches!(client.quit().await, Err(Error::Closed)));
    assert_eq!(handle.written(), ["QUIT"]);
}
