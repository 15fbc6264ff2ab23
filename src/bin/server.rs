use anyhow::Result;
use image_filter_relay::{
    config::load_env_file, create_router, AppState, Credentials, HttpImageFilter, S3Client,
    ServerConfig,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = load_env_file(Path::new(".env"));

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting image filter server");

    if let Err(e) = dotenv {
        warn!("Ignoring unreadable .env file: {}", e);
    }

    let server_config = ServerConfig::from_env();

    // Resolve dependencies before any route is bound
    let state = match Credentials::from_env() {
        Ok(credentials) => {
            info!("AWS credentials retrieved successfully: {}", credentials);
            if credentials.bucket_name.is_none() {
                warn!("S3_BUCKET_NAME is not set; uploads will fail");
            }

            let s3_client = S3Client::from_credentials(&credentials).await;
            let filter = HttpImageFilter::new(server_config.tmp_dir.clone());
            Some(AppState::new(
                Arc::new(filter),
                Arc::new(s3_client),
                credentials.bucket_name,
            ))
        }
        Err(e) => {
            error!("Failed to initialize AWS SDK: {}", e);
            warn!("Serving / only; /filteredimage is unavailable");
            None
        }
    };

    let app = create_router(state);

    let addr = server_config.bind_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
