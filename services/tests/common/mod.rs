//! Shared test utilities for integration tests.
//!
//! Every test app keeps its cache in its own temporary directory, so tests can
//! run in parallel and inspect the file on disk afterwards.

use axum_test::TestServer;
use reservations_services::{
    cache::LocalCacheStore,
    config::Config,
    remote::{MockRemoteGateway, RemoteTarget},
    reservations::{ReservationDocument, ReservationService},
    routes,
};
use std::path::PathBuf;
use tempfile::TempDir;

/// Admin password configured for every test app.
pub const TEST_ADMIN_PASSWORD: &str = "test-admin-password";

/// Folder and file name used for the remote copy in tests.
#[allow(dead_code)]
pub const TEST_FOLDER_ID: &str = "test-folder";
#[allow(dead_code)]
pub const TEST_REMOTE_NAME: &str = "reservas.json";

/// A running test server plus the pieces a test may want to inspect.
pub struct TestApp {
    pub server: TestServer,
    pub gateway: MockRemoteGateway,
    pub data_path: PathBuf,
    // Held so the directory outlives the server.
    _dir: TempDir,
}

impl TestApp {
    /// Reads the cache file straight from disk.
    #[allow(dead_code)]
    pub async fn stored(&self) -> ReservationDocument {
        LocalCacheStore::new(&self.data_path).read().await
    }
}

fn config_for(data_path: PathBuf) -> Config {
    Config::new_for_test(data_path).with_admin_password(TEST_ADMIN_PASSWORD)
}

/// App without any remote copy.
#[allow(dead_code)]
pub async fn create_local_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let data_path = dir.path().join("data").join("reservas_temp.json");
    let service = ReservationService::<MockRemoteGateway>::new(LocalCacheStore::new(&data_path));
    let app = routes(service, config_for(data_path.clone())).await;

    TestApp {
        server: TestServer::new(app).expect("test server should start"),
        gateway: MockRemoteGateway::new(),
        data_path,
        _dir: dir,
    }
}

/// App mirroring to an in-memory remote folder.
#[allow(dead_code)]
pub async fn create_remote_app(gateway: MockRemoteGateway) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let data_path = dir.path().join("data").join("reservas_temp.json");
    let target = RemoteTarget::Named {
        folder_id: TEST_FOLDER_ID.to_owned(),
        name: TEST_REMOTE_NAME.to_owned(),
    };
    let service = ReservationService::with_remote(
        LocalCacheStore::new(&data_path),
        gateway.clone(),
        target.clone(),
    );
    let config = config_for(data_path.clone()).with_remote_target(target);
    let app = routes(service, config).await;

    TestApp {
        server: TestServer::new(app).expect("test server should start"),
        gateway,
        data_path,
        _dir: dir,
    }
}
