// Connection handling module
// Accepts a single TCP connection and serves it through the pipeline

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::logger;
use crate::pipeline::Pipeline;

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `pipeline` - Shared request pipeline
/// * `conn_counter` - Active connection counter
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    pipeline: &Arc<Pipeline>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = pipeline.config().performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(pipeline),
        Arc::clone(conn_counter),
    );
}

/// Serve one connection on its own task.
///
/// The whole connection is bounded by `performance.request_timeout`; a
/// request that never finalizes is dropped with a warning instead of
/// hanging forever.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    pipeline: Arc<Pipeline>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let performance = &pipeline.config().performance;
        let timeout_duration = Duration::from_secs(performance.request_timeout);

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive);

        let service_pipeline = Arc::clone(&pipeline);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let pipeline = Arc::clone(&service_pipeline);
                async move { Ok::<_, Infallible>(pipeline.handle(req, Some(peer_addr)).await) }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
