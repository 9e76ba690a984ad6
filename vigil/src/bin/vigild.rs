//! The ingestion daemon: wire connectors from the environment, start the
//! scheduler, run until interrupted.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use vigil::{Settings, Vigil};
use vigil_catalog::CatalogStore;
use vigil_twitch::TwitchConnector;
use vigil_youtube::YouTubeConnector;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env();
    let catalog = CatalogStore::connect(&settings.catalog).await?;

    let mut builder = Vigil::builder()
        .catalog(catalog)
        .schedule(settings.schedule.clone())
        .keywords(settings.keywords.clone());

    match settings.youtube {
        Some(config) => {
            builder = builder.connector(Arc::new(YouTubeConnector::builder(config).build()?));
        }
        None => info!("YOUTUBE_API_KEY not set, youtube connector disabled"),
    }
    match settings.twitch {
        Some(config) => {
            builder = builder.connector(Arc::new(TwitchConnector::builder(config).build()?));
        }
        None => info!("TWITCH_CLIENT_ID/SECRET not set, twitch connector disabled"),
    }

    let vigil = Arc::new(builder.build()?);
    for platform in &settings.disabled_platforms {
        vigil.disable_platform(*platform);
    }
    vigil.authenticate_all().await;

    let handle = vigil.start();
    info!(tasks = handle.task_count(), "vigild running, ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    for report in vigil.status_reports() {
        info!(
            connector = %report.connector,
            status = %report.status,
            quota_consumed = report.quota_consumed,
            errors = report.error_count,
            "final connector status"
        );
    }
    handle.shutdown();
    Ok(())
}
