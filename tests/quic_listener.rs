//! QUIC listener behavior, end to end.

use gopher_server::config::Transport;

mod common;

#[tokio::test]
async fn streams_on_one_connection_are_independent() {
    let site = common::site();
    let server = common::start(&site.config(&[Transport::Quic]), site.application(false)).await;
    let (endpoint, connection) = common::quic_connect(server.addr(Transport::Quic), &site.cert).await;

    let (first, second) = tokio::join!(
        common::quic_request(&connection, b"example\r\n"),
        common::quic_request(&connection, b"docs/a.txt"),
    );
    assert_eq!(first, b"hello\r\n.\r\n");
    assert_eq!(second, b"a\r\n.\r\n");

    // Finishing streams leaves the connection usable.
    assert_eq!(common::quic_request(&connection, b"blob.bin").await, [0u8, 159, 146, 150]);
    assert!(connection.close_reason().is_none());

    connection.close(0u32.into(), b"done");
    endpoint.wait_idle().await;
    server.stop().await;
}

#[tokio::test]
async fn empty_stream_requests_the_root() {
    let site = common::site();
    let server = common::start(&site.config(&[Transport::Quic]), site.application(false)).await;
    let (_endpoint, connection) = common::quic_connect(server.addr(Transport::Quic), &site.cert).await;

    assert_eq!(common::quic_request(&connection, b"").await, b"welcome\r\n.\r\n");

    server.stop().await;
}

#[tokio::test]
async fn negotiates_gopher_alpn() {
    let site = common::site();
    let server = common::start(&site.config(&[Transport::Quic]), site.application(false)).await;
    let (_endpoint, connection) = common::quic_connect(server.addr(Transport::Quic), &site.cert).await;

    let protocol = connection
        .handshake_data()
        .and_then(|data| data.downcast::<quinn::crypto::rustls::HandshakeData>().ok())
        .and_then(|data| data.protocol);
    assert_eq!(protocol.as_deref(), Some(&b"gopher"[..]));

    server.stop().await;
}

#[tokio::test]
async fn oversized_and_invalid_selectors() {
    let site = common::site();
    let mut config = site.config(&[Transport::Quic]);
    config.limits.max_selector_bytes = 16;
    let server = common::start(&config, site.application(false)).await;
    let (_endpoint, connection) = common::quic_connect(server.addr(Transport::Quic), &site.cert).await;

    let bad_selector = b"3Bad selector.\t\terror.host\t0\r\n.\r\n";
    assert_eq!(common::quic_request(&connection, &[b'a'; 64]).await, bad_selector);
    assert_eq!(common::quic_request(&connection, b"a\r\nb").await, bad_selector);
    assert_eq!(
        common::quic_request(&connection, b"missing").await,
        b"3Not found.\t\terror.host\t0\r\n.\r\n"
    );

    server.stop().await;
}

#[tokio::test]
async fn all_transports_agree() {
    let site = common::site();
    let server = common::start(
        &site.config(&[Transport::Tcp, Transport::Tls, Transport::Quic]),
        site.application(true),
    )
    .await;
    let (_endpoint, connection) = common::quic_connect(server.addr(Transport::Quic), &site.cert).await;

    let plain = common::tcp_request(server.addr(Transport::Tcp), b"example\r\n").await;
    let secured = common::tls_request(server.addr(Transport::Tls), &site.cert, b"example\r\n").await;
    let quic = common::quic_request(&connection, b"example\r\n").await;
    assert_eq!(plain, b"hello\r\n.\r\n");
    assert_eq!(secured, plain);
    assert_eq!(quic, plain);

    server.stop().await;
}

#[tokio::test]
async fn connections_over_the_limit_are_refused() {
    let site = common::site();
    let mut config = site.config(&[Transport::Quic]);
    config.limits.max_connections = 1;
    let server = common::start(&config, site.application(false)).await;
    let addr = server.addr(Transport::Quic);

    let (first_endpoint, first) = common::quic_connect(addr, &site.cert).await;
    let refused = common::quic_try_connect(addr, &site.cert).await.unwrap_err();
    assert!(
        matches!(
            refused,
            quinn::ConnectionError::ConnectionClosed(ref close)
                if close.error_code == quinn::TransportErrorCode::CONNECTION_REFUSED
        ),
        "unexpected error {refused:?}"
    );

    // The admitted connection keeps working.
    assert_eq!(common::quic_request(&first, b"example").await, b"hello\r\n.\r\n");

    // Its slot frees up once it closes.
    first.close(0u32.into(), b"done");
    first_endpoint.wait_idle().await;
    let mut admitted = None;
    for _ in 0..40 {
        if let Ok(connected) = common::quic_try_connect(addr, &site.cert).await {
            admitted = Some(connected);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    let (_endpoint, connection) = admitted.expect("slot was never released");
    assert_eq!(common::quic_request(&connection, b"example").await, b"hello\r\n.\r\n");

    server.stop().await;
}
