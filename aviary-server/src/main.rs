use aviary_backend::config::Config;
use aviary_backend::logging::init_logging;
use aviary_backend::model::Catalog;
use aviary_backend::module::{CardRenderer, FilterController, Gallery, ImageResolver};
use std::sync::Arc;
use tracing::{error, info};

mod routes;
use routes::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let _logging_guard = init_logging("logs", "aviary-server", &config.server.log_level)?;
    info!("Aviary server starting...");

    let state = match Catalog::load(config.catalog_path.as_deref()).await {
        Ok(catalog) => {
            let gallery = Arc::new(Gallery::new(
                &catalog,
                CardRenderer::new(&config.resolver.endpoints),
                FilterController::new(&config.filter),
            ));

            let resolver = ImageResolver::new(config.resolver.clone())?;
            info!("Image sources: {}", resolver.strategy_names().join(" -> "));

            // Second pass runs in the background; the page is served meanwhile
            let background = gallery.clone();
            let gallery_config = config.gallery.clone();
            tokio::spawn(async move {
                let report = background.resolve_all(&resolver, &gallery_config).await;
                info!(
                    "Gallery complete: {} resolved, {} placeholders",
                    report.resolved, report.placeholders
                );
            });

            AppState::Ready(gallery)
        }
        Err(e) => {
            error!("Failed to load bird catalog: {}", e);
            AppState::Unavailable(Arc::from(e.to_string()))
        }
    };

    let app = build_router(state, config.server.enable_cors);

    let addr = config.server.server_address();
    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
