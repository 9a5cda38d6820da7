use moodchef::{Config, Services, pages, start_server};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    let services = Services::from_config(&config)?;
    info!(
        backend = %config.backend_url,
        cache = %config.cache_path.display(),
        "Starting moodchef"
    );

    start_server(
        pages::router_config(&services, &config.static_dir),
        &config.bind_addr,
    )
    .await?;

    Ok(())
}
