use anyhow::Result;
use tracing::{debug, error, info, trace};

use super::initdb::init_database;
use super::serve::run_server;
use crate::config::{Settings, initialize_app_state};
use crate::router::create_router;

pub async fn migrate_and_serve(settings: Settings) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");

    init_database(&settings.database_url).await?;

    let state = match initialize_app_state(&settings).await {
        Ok(state) => {
            debug!("Application state initialized successfully");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    run_server(create_router(state), &settings.bind_address).await
}
