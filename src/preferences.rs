use std::{fs, io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

const DEFAULT_DB_PASS: &str = "THISISVERYBAD PLEASE CHANGE ME";

#[derive(Debug, Error)]
pub enum PrefError {
    #[error("could not access config file: {0}")]
    Io(#[from] io::Error),
    #[error("could not parse config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("could not write default config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Postgres,
    Memory,
}

#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Preferences {
    http_ip: String,
    port: u16,
    store: StoreKind,
    db_ip: String,
    db_port: u16,
    db_name: String,
    db_user: String,
    db_pass: String,
    db_pool_size: u32,
    db_timeout_secs: u64,
    run_migrations: bool,
    enable_test_data: bool,
    log_level: String,
    https_cert_path: Option<String>,
    https_key_path: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            http_ip: String::from("0.0.0.0"),
            port: 5000,
            store: StoreKind::Postgres,
            db_ip: String::from("127.0.0.1"),
            db_port: 5432,
            db_name: String::from("urlinfo"),
            db_user: String::from("postgres"),
            db_pass: String::from(DEFAULT_DB_PASS),
            db_pool_size: 10,
            db_timeout_secs: 5,
            run_migrations: true,
            enable_test_data: false,
            log_level: String::from("info"),
            https_cert_path: None,
            https_key_path: None,
        }
    }
}

impl Preferences {
    pub fn http_ip(&self) -> &str {
        self.http_ip.as_str()
    }
    pub fn port(&self) -> u16 {
        self.port
    }
    pub fn store(&self) -> StoreKind {
        self.store
    }
    pub fn db_ip(&self) -> &str {
        self.db_ip.as_str()
    }
    pub fn db_port(&self) -> u16 {
        self.db_port
    }
    pub fn db_name(&self) -> &str {
        self.db_name.as_str()
    }
    pub fn db_user(&self) -> &str {
        self.db_user.as_str()
    }
    pub fn db_pass(&self) -> &str {
        self.db_pass.as_str()
    }
    pub fn db_pool_size(&self) -> u32 {
        self.db_pool_size
    }
    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }
    pub fn run_migrations(&self) -> bool {
        self.run_migrations
    }
    pub fn enable_test_data(&self) -> bool {
        self.enable_test_data
    }
    /// Falls back to `INFO` when the configured level isn't one tracing knows.
    pub fn log_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
    pub fn uses_default_password(&self) -> bool {
        self.db_pass == DEFAULT_DB_PASS
    }
    /// Both halves are needed to serve HTTPS.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.https_cert_path, &self.https_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
            _ => None,
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, PrefError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads the config at `path`, writing out a default one first if the file doesn't exist.
    pub fn load_config(path: impl AsRef<Path>) -> Result<Self, PrefError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(buff) => Self::from_toml(&buff),
            Err(err) if err.kind() == io::ErrorKind::NotFound => create_default_config(path),
            Err(err) => Err(PrefError::Io(err)),
        }
    }
}

fn create_default_config(path: &Path) -> Result<Preferences, PrefError> {
    let new_pref = Preferences::default();
    fs::write(path, toml::to_string(&new_pref)?)?;
    Ok(new_pref)
}
