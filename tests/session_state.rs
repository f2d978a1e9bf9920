//! Session bookkeeping: draining unread bodies, connection loss, closing
//! and local command validation.

use nntp_session::mock::encode::dot_block;
use nntp_session::mock::MockStream;
use nntp_session::{ArticleSpec, ClientConfig, Error, NntpClient};

const GREETING: &str = "200 news.example.com ready";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn connect(stream: MockStream) -> NntpClient<MockStream> {
    init_tracing();
    NntpClient::from_stream(stream).await.unwrap()
}

fn three_lines() -> Vec<u8> {
    dot_block(
        "222 3000 <45223423@example.com>",
        &["line one", "line two", "line three"],
    )
}

#[tokio::test]
async fn test_partially_read_body_is_drained() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("BODY 3000", three_lines())
        .expect("DATE", "111 20240101000000\r\n");
    let handle = stream.handle();
    let mut client = connect(stream).await;

    {
        let mut body = client.body(3000u64).await.unwrap();
        let first = body.next_line().await.unwrap().unwrap();
        assert_eq!(&first[..], b"line one\n");
    }
    client.date().await.unwrap();
    assert_eq!(handle.written(), ["BODY 3000", "DATE"]);
    assert!(handle.is_finished());
}

#[tokio::test]
async fn test_unread_body_is_drained_with_small_reads() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("BODY 3000", three_lines())
        .expect("STAT 3000", "223 3000 <45223423@example.com>\r\n")
        .with_read_limit(4);
    let handle = stream.handle();
    let mut client = connect(stream).await;

    drop(client.body(ArticleSpec::Number(3000)).await.unwrap());
    let ptr = client.stat(3000u64).await.unwrap();
    assert_eq!(ptr.message_id, "<45223423@example.com>");
    assert!(handle.reads() > 10);
}

#[tokio::test]
async fn test_finished_body_returns_none_forever() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("BODY 3000", three_lines());
    let handle = stream.handle();
    let mut client = connect(stream).await;

    let mut body = client.body(3000u64).await.unwrap();
    assert_eq!(body.read_lines().await.unwrap().len(), 3);
    assert!(body.is_finished());
    let reads = handle.reads();
    assert!(body.next_line().await.unwrap().is_none());
    assert_eq!(handle.reads(), reads);
}

#[tokio::test]
async fn test_article_body_left_unread() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect(
            "ARTICLE 1",
            dot_block("220 1 <a@b>", &["Subject: hi", "", "body", "more body"]),
        )
        .expect("NEXT", "223 2 <c@d> retrieved\r\n");
    let mut client = connect(stream).await;

    let subject = {
        let article = client.article(1u64).await.unwrap();
        article.headers.get("Subject").map(str::to_string)
    };
    assert_eq!(subject.as_deref(), Some("hi"));
    assert_eq!(client.next().await.unwrap().number, 2);
}

#[tokio::test]
async fn test_connection_lost_mid_body() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("BODY 1", "222 1 <a@b>\r\nonly line\r\n");
    let mut client = connect(stream).await;

    let mut body = client.body(1u64).await.unwrap();
    assert_eq!(&body.next_line().await.unwrap().unwrap()[..], b"only line\n");
    assert!(matches!(body.next_line().await, Err(Error::ConnectionLost)));
}

#[tokio::test]
async fn test_connection_lost_before_greeting() {
    let result = NntpClient::from_stream(MockStream::new()).await;
    assert!(matches!(result, Err(Error::ConnectionLost)));
}

#[tokio::test]
async fn test_short_status_line() {
    let stream = MockStream::new().greeting(GREETING).expect("DATE", "11\r\n");
    let mut client = connect(stream).await;
    assert!(client.date().await.unwrap_err().is_protocol());
}

#[tokio::test]
async fn test_line_limit() {
    let long = format!("111 {}\r\n", "x".repeat(64));
    let stream = MockStream::new()
        .greeting("200 ok")
        .expect("DATE", long)
        .with_read_limit(8);
    init_tracing();
    let config = ClientConfig::default().with_max_line_length(16);
    let mut client = NntpClient::from_stream_with_config(stream, config)
        .await
        .unwrap();
    assert!(client.date().await.unwrap_err().is_protocol());
}

#[tokio::test]
async fn test_invalid_argument_never_reaches_the_wire() {
    let stream = MockStream::new().greeting(GREETING);
    let handle = stream.handle();
    let mut client = connect(stream).await;

    let err = client.group("misc.test\r\nQUIT").await.unwrap_err();
    assert!(matches!(err, Error::InvalidCommand(_)));
    assert!(handle.written().is_empty());
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_quit_closes_even_on_error_reply() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("QUIT", "400 bye anyway\r\n");
    let handle = stream.handle();
    let mut client = connect(stream).await;

    client.quit().await.unwrap();
    assert!(client.is_closed());
    assert!(handle.is_shutdown());
    assert!(matches!(client.capabilities().await, Err(Error::Closed)));
}

#[tokio::test]
async fn test_quit_drains_pending_body() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("BODY 3000", three_lines())
        .expect("QUIT", "205 closing connection\r\n");
    let handle = stream.handle();
    let mut client = connect(stream).await;

    drop(client.body(3000u64).await.unwrap());
    client.quit().await.unwrap();
    assert!(handle.is_finished());
    assert_eq!(handle.written(), ["BODY 3000", "QUIT"]);
}

#[tokio::test]
async fn test_second_quit_touches_nothing() {
    let stream = MockStream::new()
        .greeting(GREETING)
        .expect("QUIT", "205 closing connection\r\n");
    let handle = stream.handle();
    let mut client = connect(stream).await;

    client.quit().await.unwrap();
    assert!(matches!(client.quit().await, Err(Error::Closed)));
    assert_eq!(handle.shutdowns(), 1);
    assert_eq!(handle.written(), ["QUIT"]);
}
