use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use governance_adapter::{
    api::routes::api_router,
    blockchain::services::EthersServiceFactory,
    config::Config,
    governance::GovernanceAdapter,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "governance_adapter=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let adapter = GovernanceAdapter::new(&config, Arc::new(EthersServiceFactory))?;
    match adapter.resolve_provider().await {
        Ok(provider) => tracing::info!(
            chain_id = provider.chain_id,
            rpc_url = %provider.rpc_url,
            "Governance provider resolved"
        ),
        Err(e) => tracing::warn!("Governance provider unavailable: {}", e),
    }

    let app_state = AppState {
        adapter: Arc::new(adapter),
    };

    let app = api_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
        )
        .with_state(app_state);

    let ip: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((ip, config.server.port));
    tracing::info!("Governance adapter listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
