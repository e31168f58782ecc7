use reservations_services::{
    cache::LocalCacheStore,
    config::Config,
    remote::{Credential, DriveGateway, OAuthCredentialProvider},
    reservations::ReservationService,
    routes, telemetry,
};
use std::net::{IpAddr, SocketAddr};
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const BUILD_DATE: &str = env!("BUILD_DATE");
const BUILD_COMMIT: &str = env!("BUILD_COMMIT");
const BUILD_BRANCH: &str = env!("BUILD_BRANCH");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration, logging through a bootstrap subscriber
    let config: Config = telemetry::with_bootstrap(Config::init)?;

    // Initialize tracing
    telemetry::init_tracing(&config)?;

    // Print build information
    print_build_info();

    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        data_path = %config.data_path().display(),
        "Configuration loaded"
    );

    let store = LocalCacheStore::new(config.data_path());
    store.ensure_exists().await?;

    let service = match config.remote_target() {
        Some(target) => {
            let credential = Credential::load(config.google_token(), config.google_token_file())?;
            let client = reqwest::Client::builder()
                .timeout(config.remote_timeout())
                .build()?;
            let credentials = OAuthCredentialProvider::new(credential, client.clone());
            let gateway = DriveGateway::new(client, credentials);
            ReservationService::with_remote(store, gateway, target.clone())
        }
        None => ReservationService::<DriveGateway>::new(store),
    };

    // Build the application router
    let route = routes(service, config.clone()).await;

    // Create socket address
    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));

    info!("Starting server on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route).await?;

    Ok(())
}

/// Print build information
fn print_build_info() {
    info!("===========================================");
    info!("  Reservation Services");
    info!("===========================================");
    info!("Build Date:   {}", BUILD_DATE);
    info!("Build Commit: {}", BUILD_COMMIT);
    info!("Build Branch: {}", BUILD_BRANCH);
    info!("===========================================");
}
