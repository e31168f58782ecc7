use crate::remote::RemoteTarget;
use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_DATA_PATH: &str = "data/reservas_temp.json";
pub const DEFAULT_REMOTE_FILE_NAME: &str = "reservas.json";
pub const DEFAULT_TOKEN_FILE: &str = "token_drive.json";
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "prod")]
    Prod,
}

impl Env {
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Local => "local",
            Env::Test => "test",
            Env::Prod => "prod",
        }
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// The final, validated configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    server_addr: String,
    port: u16,
    admin_password: String,
    data_path: PathBuf,
    // Remote sync. `remote_target` is `None` for local-only deployments.
    remote_target: Option<RemoteTarget>,
    google_token: Option<String>,
    google_token_file: PathBuf,
    remote_timeout: Duration,
}

// An intermediate struct for deserializing environment variables
// where most fields are optional.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    server_addr: Option<String>,
    port: Option<u16>,
    admin_password: Option<String>,
    data_path: Option<String>,
    // Remote sync configuration (optional)
    drive_file_id: Option<String>,
    google_folder_id: Option<String>,
    remote_file_name: Option<String>,
    // Credential sources
    google_token: Option<String>,
    google_token_file: Option<String>,
    remote_timeout_secs: Option<u64>,
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// Remote sync is disabled and the cache lives at `data_path`.
    /// Available for both unit tests and integration tests.
    pub fn new_for_test(data_path: impl Into<PathBuf>) -> Self {
        Self {
            env: Env::Test,
            server_addr: "127.0.0.1".to_owned(),
            port: 8080,
            admin_password: "test-admin-password".to_owned(),
            data_path: data_path.into(),
            remote_target: None,
            google_token: None,
            google_token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        }
    }

    pub fn with_admin_password(mut self, password: impl Into<String>) -> Self {
        self.admin_password = password.into();
        self
    }

    pub fn with_remote_target(mut self, target: RemoteTarget) -> Self {
        self.remote_target = Some(target);
        self
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn remote_target(&self) -> Option<&RemoteTarget> {
        self.remote_target.as_ref()
    }

    /// Base64-encoded credential JSON, as supplied through `GOOGLE_TOKEN`.
    pub fn google_token(&self) -> Option<&str> {
        self.google_token.as_deref()
    }

    pub fn google_token_file(&self) -> &Path {
        &self.google_token_file
    }

    pub fn remote_timeout(&self) -> Duration {
        self.remote_timeout
    }

    /// Initializes configuration by reading from environment variables
    /// and applying environment-aware defaults.
    pub fn init() -> anyhow::Result<Self> {
        info!("Loading configuration from environment variables");

        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            server_addr,
            port,
            admin_password,
            data_path,
            drive_file_id,
            google_folder_id,
            remote_file_name,
            google_token,
            google_token_file,
            remote_timeout_secs,
        } = raw_config;

        let server_addr = match server_addr {
            Some(addr) => {
                info!("Using provided SERVER_ADDR: {}", addr);
                addr
            }
            None => {
                let default_addr = match env {
                    Env::Local => "127.0.0.1",
                    _ => "0.0.0.0",
                };
                info!(
                    "SERVER_ADDR not set, defaulting to {} for {} environment",
                    default_addr, env
                );
                default_addr.to_owned()
            }
        };

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local) => {
                info!("PORT not set, defaulting to 8080 for local environment");
                8080
            }
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        // The admin password is required for production, optional for local/test
        let admin_password = match admin_password {
            Some(password) if !password.is_empty() => password,
            _ if matches!(env, Env::Local | Env::Test) => {
                info!("ADMIN_PASSWORD not set, using default for {} environment", env);
                "default-admin-password-for-local-development-only".to_owned()
            }
            _ => anyhow::bail!("ADMIN_PASSWORD must be set for {} environment", env),
        };

        let remote_target = match (drive_file_id, google_folder_id) {
            (Some(file_id), _) => Some(RemoteTarget::FileId(file_id)),
            (None, Some(folder_id)) => Some(RemoteTarget::Named {
                folder_id,
                name: remote_file_name.unwrap_or_else(|| DEFAULT_REMOTE_FILE_NAME.to_owned()),
            }),
            (None, None) => {
                info!("Neither DRIVE_FILE_ID nor GOOGLE_FOLDER_ID set, remote sync disabled");
                None
            }
        };

        Ok(Config {
            env,
            server_addr,
            port,
            admin_password,
            data_path: PathBuf::from(data_path.as_deref().unwrap_or(DEFAULT_DATA_PATH)),
            remote_target,
            google_token,
            google_token_file: PathBuf::from(
                google_token_file.as_deref().unwrap_or(DEFAULT_TOKEN_FILE),
            ),
            remote_timeout: Duration::from_secs(
                remote_timeout_secs.unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS),
            ),
        })
    }
}
