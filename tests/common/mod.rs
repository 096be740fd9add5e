//! Shared utilities for listener integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use gopher_server::config::{ListenerConfig, ServerConfig, TlsConfig, Transport};
use gopher_server::handlers::DirectoryHandler;
use gopher_server::{Application, GopherServer, Shutdown};
use quinn::crypto::rustls::QuicClientConfig;
use rustls::pki_types::{CertificateDer, ServerName};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;

/// A served directory tree plus a self-signed certificate for `localhost`.
pub struct Site {
    pub dir: TempDir,
    pub root: PathBuf,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cert: CertificateDer<'static>,
}

/// Build the fixture tree:
///
/// ```text
/// site/index        "welcome\n"
/// site/example      "hello\n"
/// site/blob.bin     [0, 159, 146, 150]
/// site/docs/index   "docs index\n"
/// site/docs/a.txt   "a\n"
/// outside.txt       "secret\n"
/// ```
pub fn site() -> Site {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("site");
    std::fs::create_dir_all(root.join("docs")).unwrap();
    std::fs::write(root.join("index"), "welcome\n").unwrap();
    std::fs::write(root.join("example"), "hello\n").unwrap();
    std::fs::write(root.join("blob.bin"), [0u8, 159, 146, 150]).unwrap();
    std::fs::write(root.join("docs/index"), "docs index\n").unwrap();
    std::fs::write(root.join("docs/a.txt"), "a\n").unwrap();
    std::fs::write(dir.path().join("outside.txt"), "secret\n").unwrap();

    let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_path = dir.path().join("server.crt");
    let key_path = dir.path().join("key.pem");
    std::fs::write(&cert_path, generated.cert.pem()).unwrap();
    std::fs::write(&key_path, generated.key_pair.serialize_pem()).unwrap();

    Site {
        root,
        cert_path,
        key_path,
        cert: generated.cert.der().clone(),
        dir,
    }
}

impl Site {
    pub fn tls(&self) -> TlsConfig {
        TlsConfig {
            cert_path: self.cert_path.clone(),
            key_path: self.key_path.clone(),
            key_passphrase: None,
            alpn_protocols: Vec::new(),
        }
    }

    /// A listener on an ephemeral loopback port.
    pub fn listener(&self, transport: Transport) -> ListenerConfig {
        ListenerConfig {
            transport,
            bind_address: "127.0.0.1:0".to_string(),
            advertised_port: None,
            tls: transport.is_secure().then(|| self.tls()),
        }
    }

    /// Server config with one listener per transport given.
    pub fn config(&self, transports: &[Transport]) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.directory.root = self.root.clone();
        config.listeners = transports.iter().map(|t| self.listener(*t)).collect();
        config.limits.shutdown_grace_secs = 2;
        config
    }

    pub fn application(&self, generate_menus: bool) -> Application {
        let handler = DirectoryHandler::new(&self.root)
            .unwrap()
            .with_generate_menus(generate_menus);
        Application::new(handler)
    }
}

/// A server running in the background.
pub struct RunningServer {
    pub addrs: Vec<(Transport, SocketAddr)>,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl RunningServer {
    pub fn addr(&self, transport: Transport) -> SocketAddr {
        self.addrs
            .iter()
            .find(|(t, _)| *t == transport)
            .map(|(_, addr)| *addr)
            .unwrap()
    }

    /// Trigger shutdown and wait for the server to finish draining.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(std::time::Duration::from_secs(10), self.handle)
            .await
            .expect("server did not stop")
            .unwrap();
    }
}

pub async fn start(config: &ServerConfig, application: Application) -> RunningServer {
    let server = GopherServer::bind(config, application).await.unwrap();
    let addrs = server.local_addrs();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(shutdown.subscribe()));
    RunningServer {
        addrs,
        shutdown,
        handle,
    }
}

/// Send `request` over plain TCP and read until the server closes.
pub async fn tcp_request(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

fn provider() -> Arc<rustls::crypto::CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn roots(cert: &CertificateDer<'static>) -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();
    roots.add(cert.clone()).unwrap();
    roots
}

/// Send `request` over TLS, trusting only `cert`.
pub async fn tls_request(addr: SocketAddr, cert: &CertificateDer<'static>, request: &[u8]) -> Vec<u8> {
    let config = rustls::ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots(cert))
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let stream = TcpStream::connect(addr).await.unwrap();
    let server_name = ServerName::try_from("localhost").unwrap();
    let mut stream = connector.connect(server_name, stream).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

/// Open a QUIC connection offering ALPN `gopher`, trusting only `cert`.
pub async fn quic_connect(addr: SocketAddr, cert: &CertificateDer<'static>) -> (quinn::Endpoint, quinn::Connection) {
    quic_try_connect(addr, cert).await.unwrap()
}

/// Like [`quic_connect`], but hands back a failed handshake.
pub async fn quic_try_connect(
    addr: SocketAddr,
    cert: &CertificateDer<'static>,
) -> Result<(quinn::Endpoint, quinn::Connection), quinn::ConnectionError> {
    let mut crypto = rustls::ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .with_root_certificates(roots(cert))
        .with_no_client_auth();
    crypto.alpn_protocols = vec![b"gopher".to_vec()];
    let client_config = quinn::ClientConfig::new(Arc::new(QuicClientConfig::try_from(crypto).unwrap()));

    let mut endpoint = quinn::Endpoint::client("127.0.0.1:0".parse().unwrap()).unwrap();
    endpoint.set_default_client_config(client_config);
    let connection = endpoint.connect(addr, "localhost").unwrap().await?;
    Ok((endpoint, connection))
}

/// Send `request` on a fresh bidirectional stream and read the reply.
pub async fn quic_request(connection: &quinn::Connection, request: &[u8]) -> Vec<u8> {
    let (mut send, mut recv) = connection.open_bi().await.unwrap();
    // The server may stop reading an oversized selector early.
    let _ = send.write_all(request).await;
    let _ = send.finish();
    recv.read_to_end(1 << 20).await.unwrap()
}
