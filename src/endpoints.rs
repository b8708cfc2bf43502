//! Endpoint server for exposing metrics and health checks

use crate::metrics::metrics;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start the endpoint server on `0.0.0.0:port`
pub async fn endpoint_server(port: u16) -> io::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Metrics endpoint listening on {}", addr);
    serve(listener).await
}

/// Accept connections on `listener` forever
pub async fn serve(listener: TcpListener) -> io::Result<()> {
    loop {
        match listener.accept().await {
            Ok((mut socket, peer)) => {
                tokio::spawn(async move {
                    let mut buf = [0; 1024];
                    match socket.read(&mut buf).await {
                        Ok(n) => {
                            let response = respond(&buf[..n]);
                            if let Err(e) = socket.write_all(response.as_bytes()).await {
                                tracing::debug!(%peer, error = %e, "Failed to write response");
                            }
                        }
                        Err(e) => {
                            tracing::error!("Failed to read from socket: {}", e);
                        }
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

fn respond(request: &[u8]) -> String {
    let request = String::from_utf8_lossy(request);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    match path {
        "/metrics" => match metrics().encode_text() {
            Ok(body) => http_response("200 OK", "text/plain; version=0.0.4", &body),
            Err(e) => http_response("500 Internal Server Error", "text/plain", &e.to_string()),
        },
        "/health" => http_response("200 OK", "text/plain", "ok"),
        _ => http_response("404 Not Found", "text/plain", "not found"),
    }
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}
