use std::sync::Arc;
use swipe_review::{
    api::start_server,
    config::AppConfig,
    controller::ReviewController,
    dispatch::NotificationDispatcher,
    journal::SessionJournal,
    remote::{ClassificationSink, LoggingSink, StaticTransactionSource, SwipeApiClient, TransactionSource},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    info!("Swipe Review - Session API");
    info!("Port: {}", config.api_port);

    let (source, sink): (Arc<dyn TransactionSource>, Arc<dyn ClassificationSink>) =
        if config.offline {
            info!("Offline mode: serving the bundled sample deck");
            (Arc::new(StaticTransactionSource::demo()), Arc::new(LoggingSink))
        } else {
            info!("Finance API: {}", config.base_url);
            let client = Arc::new(SwipeApiClient::from_config(&config)?);
            (client.clone(), client)
        };

    let (dispatcher, _worker) = NotificationDispatcher::spawn(sink);
    let controller = Arc::new(ReviewController::new(
        source,
        dispatcher,
        Arc::new(SessionJournal::new()),
        config.user_id,
        config.swipe_threshold,
    ));

    info!("Controller initialized for user {}", config.user_id);

    start_server(controller, config.api_port).await?;

    Ok(())
}
