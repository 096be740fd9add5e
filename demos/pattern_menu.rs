//! Pattern-routed Gopher site on plain TCP.
//!
//! ```text
//! cargo run --example pattern_menu
//! printf 'hello/world\r\n' | nc localhost 7000
//! ```

use gopher_server::config::{ListenerConfig, ServerConfig};
use gopher_server::handlers::{HandlerError, Params, PatternHandler};
use gopher_server::lifecycle::{shutdown_signal, Shutdown};
use gopher_server::observability::logging;
use gopher_server::{Application, GopherServer, Menu, Request};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging("debug");

    let handler = PatternHandler::new()
        .register_sync("", |request: &Request, _: &Params| {
            let mut menu = Menu::new().info("hello world example menu")?;
            for name in ["foo", "bar", "baz"] {
                menu = menu.item('0', name, format!("hello/{name}"), request.hostname(), request.port())?;
            }
            Ok::<_, HandlerError>(menu)
        })?
        .register("hello/(?P<name>.+)", |_: Request, params: Params| async move {
            Ok::<_, HandlerError>(format!("hello {}", params.get("name").unwrap_or_default()))
        })?;

    let config = ServerConfig {
        hostname: "localhost".to_string(),
        listeners: vec![ListenerConfig {
            bind_address: "0.0.0.0:7000".to_string(),
            ..ListenerConfig::default()
        }],
        ..ServerConfig::default()
    };

    let server = GopherServer::bind(&config, Application::new(handler)).await?;
    let shutdown = Shutdown::new();
    let serving = tokio::spawn(server.run(shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();
    serving.await?;
    Ok(())
}
