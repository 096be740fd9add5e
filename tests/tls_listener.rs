//! TLS listener behavior, end to end.

use gopher_server::config::Transport;

mod common;

#[tokio::test]
async fn serves_the_same_bytes_as_plain_tcp() {
    let site = common::site();
    let server = common::start(
        &site.config(&[Transport::Tcp, Transport::Tls]),
        site.application(false),
    )
    .await;
    let tcp = server.addr(Transport::Tcp);
    let tls = server.addr(Transport::Tls);

    for selector in [&b"example\r\n"[..], &b"blob.bin\r\n"[..], &b"missing\r\n"[..], &b"a\tb\r\n"[..]] {
        let plain = common::tcp_request(tcp, selector).await;
        let secured = common::tls_request(tls, &site.cert, selector).await;
        assert_eq!(plain, secured);
    }
    assert_eq!(common::tls_request(tls, &site.cert, b"example\r\n").await, b"hello\r\n.\r\n");

    server.stop().await;
}

#[tokio::test]
async fn untrusted_clients_fail_the_handshake() {
    let site = common::site();
    let other = common::site();
    let server = common::start(&site.config(&[Transport::Tls]), site.application(false)).await;
    let addr = server.addr(Transport::Tls);

    let verified = tokio::spawn({
        let cert = other.cert.clone();
        async move { common::tls_request(addr, &cert, b"example\r\n").await }
    })
    .await;
    assert!(verified.is_err());

    // The listener keeps serving after a failed handshake.
    assert_eq!(common::tls_request(addr, &site.cert, b"example\r\n").await, b"hello\r\n.\r\n");

    server.stop().await;
}

#[tokio::test]
async fn missing_certificate_fails_to_bind() {
    let site = common::site();
    let mut config = site.config(&[Transport::Tls]);
    if let Some(tls) = config.listeners[0].tls.as_mut() {
        tls.cert_path = site.dir.path().join("absent.crt");
    }
    let err = gopher_server::GopherServer::bind(&config, site.application(false))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("absent.crt"));
}
