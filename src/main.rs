use std::sync::Arc;

use rest_stub_server::config::Config;
use rest_stub_server::logger;
use rest_stub_server::pipeline::Pipeline;
use rest_stub_server::server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; PORT may come from the real environment
    let _ = dotenvy::dotenv();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Create the Tokio runtime, sizing worker threads from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let listener = match server::create_listener(addr) {
        Ok(l) => l,
        Err(e) => {
            logger::log_error(&format!("Failed to bind {addr}: {e}"));
            return Err(e.into());
        }
    };

    logger::log_server_start(&addr, &cfg);

    let pipeline = Arc::new(Pipeline::new(Arc::new(cfg)));
    server::start_server_loop(listener, pipeline, server::shutdown_signal()).await
}
