use hemmer_provider_putio::{init_logging, serve, PutioProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting put.io provider");

    serve(PutioProvider::new()).await
}
