use imagecompare::{create_router, init, AppState, Config, GeminiClient, Result, ResultExt};

use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up GOOGLE_API_KEY and friends from a local .env file
    dotenv::dotenv().ok();

    // Initialize the application
    init()?;

    let config = Config::from_env()?;
    log::debug!("Loaded configuration: {:?}", config);

    let model = GeminiClient::new(
        &config.api_key,
        &config.api_base,
        &config.model,
        config.model_timeout,
    )?;
    log::info!("Using model {}", config.model);

    let addr = config.bind_addr()?;
    let state = AppState::new(config, Arc::new(model));
    let app = create_router(state);

    // Set up the server
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    log::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("Shutdown signal received");
}
