//! Settings of the `bilancio` binary.
//!
//! Values come from a TOML file (`settings.toml` by default, see the sample
//! at the repository root) and may be overridden by environment variables
//! prefixed with `BILANCIO`, e.g. `BILANCIO__SERVER__PORT=8080`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    /// Secret expected in the `x-cron-token` header of `POST /cron`.
    pub cron_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Engine {
    /// IANA name, e.g. `Europe/Rome`. UTC when missing.
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    #[serde(default)]
    pub engine: Engine,
    pub scheduler: Option<Scheduler>,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("BILANCIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
