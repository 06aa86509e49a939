// Server loop module
// Accepts connections until a shutdown signal, then drains in-flight ones

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::logger;
use crate::pipeline::Pipeline;

const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Serve until `shutdown` resolves
///
/// After shutdown no new connections are accepted. In-flight connections get
/// up to `performance.request_timeout` to finish.
pub async fn start_server_loop(
    listener: TcpListener,
    pipeline: Arc<Pipeline>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &pipeline, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => break,
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));

    let deadline = tokio::time::Instant::now()
        + Duration::from_secs(pipeline.config().performance.request_timeout);
    while active_connections.load(Ordering::SeqCst) > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(DRAIN_POLL).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::load_with_port("this-config-file-does-not-exist", None).unwrap();
        cfg.logging.access_log = false;
        cfg.logging.http_log = false;
        cfg.performance.keep_alive = false;
        cfg.static_files.dir = dir.path().to_string_lossy().into_owned();

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let pipeline = Arc::new(Pipeline::new(Arc::new(cfg)));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            start_server_loop(listener, pipeline, async {
                let _ = rx.await;
            })
            .await
            .map_err(|e| e.to_string())
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/products HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        assert!(raw.ends_with(r#"{"msg":"Get Products"}"#));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
