use crate::error::ConfigError;
use crate::settings::Settings;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{DatabaseSettings, PoolSettings, TimeoutSettings, MAX_TIMEOUT_SECS};

/// Prefix for environment overrides, e.g. `CATALOG__DATABASE__PASSWORD`.
pub const ENV_PREFIX: &str = "CATALOG";

/// Loads the application settings.
///
/// Sources are layered lowest to highest: built-in defaults, the TOML file at
/// `path` (skipped when it does not exist), then `CATALOG__*` environment
/// variables. A `.env` file in the working directory is read first if present.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();

    let builder = defaults()?
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    finish(builder)
}

/// Builds settings from an in-memory TOML document layered over the defaults.
/// Environment variables are not consulted.
pub fn parse_settings(toml: &str) -> Result<Settings, ConfigError> {
    finish(defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    let settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.validate()?;
    tracing::debug!(database = ?settings.database, "Configuration loaded.");
    Ok(settings)
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = config::Config::builder()
        .set_default("database.host", "127.0.0.1")?
        .set_default("database.port", 3306)?
        .set_default("database.username", "root")?
        .set_default("database.password", "")?
        .set_default("database.name", "ecommerce")?
        .set_default("database.pool.max_open_connections", 20)?
        .set_default("database.pool.max_idle_connections", 20)?
        .set_default("database.pool.max_lifetime_secs", 300)?
        .set_default("database.pool.idle_timeout_secs", 600)?
        .set_default("database.timeouts.connect_secs", 5)?
        .set_default("database.timeouts.ddl_secs", 5)?
        .set_default("database.timeouts.ping_secs", 5)?
        .set_default("database.timeouts.statement_secs", 5)?;
    Ok(builder)
}
