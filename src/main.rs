pub mod api;
pub mod conf;
pub mod db;
pub mod error;
pub mod page;
pub mod search;
pub mod session;

use tracing_subscriber::{EnvFilter, fmt};

use crate::conf::Settings;
use crate::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let settings = Settings::new()?;
    tracing::info!("Starting job board on {}", settings.listen_addr);

    api::server::start_server(&settings).await
}
