mod config;
mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use config::ServerConfig;
use routes::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wirecore::events::{IggyEventBus, IggyEventBusConfig, IggyForwarder};
use wireruntime::{RuntimeConfig, Stores, WireRuntime};
use wirestore::SqliteStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting Wireflow server");

    let config = ServerConfig::from_env()?;

    let store = Arc::new(SqliteStore::connect(&config.database_url).await?);

    let mut builder = WireRuntime::builder(wirenodes::default_registry())
        .stores(Stores::shared(store))
        .config(RuntimeConfig::default());

    if let Some(url) = &config.iggy_url {
        let bus = IggyEventBus::connect(IggyEventBusConfig::from_connection_string(url.clone())).await?;
        builder = builder.forward_events(Arc::new(IggyForwarder::new(Arc::new(bus))));
        info!("Mirroring status events to Iggy");
    }

    let runtime = Arc::new(builder.build());

    info!(
        "✅ Runtime initialized with {} node types",
        runtime.registry().list_node_types().len()
    );

    let app_state = web::Data::new(AppState { runtime });

    let bind_address = config.bind_address();
    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
