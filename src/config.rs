use anyhow::Result;
use config::{Config, Environment, File};
use sea_orm::Database;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::schemas::AppState;

/// Runtime settings, layered as: built-in defaults, optional `foodgram.toml`,
/// plain environment variables (`DATABASE_URL`, `BIND_ADDRESS`, `MEDIA_ROOT`)
/// and finally `FOODGRAM_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    /// Directory recipe images are stored under
    pub media_root: PathBuf,
    /// Page size used when a list request carries no `limit`
    pub default_page_size: u64,
}

/// Variables read without the `FOODGRAM_` prefix.
const PLAIN_ENV_KEYS: [&str; 3] = ["DATABASE_URL", "BIND_ADDRESS", "MEDIA_ROOT"];

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env(std::env::vars())
    }

    /// Builds the settings from the given environment variables.
    fn from_env(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let plain: HashMap<String, String> = vars
            .iter()
            .filter(|(key, _)| PLAIN_ENV_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        debug!("Plain environment settings: {:?}", plain.keys().collect::<Vec<_>>());

        let settings = Config::builder()
            .set_default("database_url", "sqlite://foodgram.db?mode=rwc")?
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("media_root", "media")?
            .set_default("default_page_size", 6)?
            .add_source(File::with_name("foodgram").required(false))
            .add_source(Environment::default().source(Some(plain)))
            .add_source(
                Environment::with_prefix("FOODGRAM")
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Applies values given on the command line on top of the loaded settings.
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        self
    }
}

/// Initialize application state: connect to the database and make sure the
/// media directory exists.
pub async fn initialize_app_state(settings: &Settings) -> Result<AppState> {
    info!("Connecting to database: {}", settings.database_url);
    let db = Database::connect(&settings.database_url).await?;

    tokio::fs::create_dir_all(&settings.media_root).await?;
    debug!("Media root: {}", settings.media_root.display());

    Ok(AppState {
        db,
        media_root: settings.media_root.clone(),
        default_page_size: settings.default_page_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_override_settings() {
        let settings = Settings {
            database_url: "sqlite://a.db".to_string(),
            bind_address: "127.0.0.1:1".to_string(),
            media_root: PathBuf::from("media"),
            default_page_size: 6,
        };

        let settings = settings.with_overrides(Some("sqlite://b.db".to_string()), None);

        assert_eq!(settings.database_url, "sqlite://b.db");
        assert_eq!(settings.bind_address, "127.0.0.1:1");
    }

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn prefixed_variables_win_over_plain_ones() {
        let settings = Settings::from_env(env(&[
            ("DATABASE_URL", "sqlite://plain.db"),
            ("FOODGRAM_DATABASE_URL", "sqlite://prefixed.db"),
            ("MEDIA_ROOT", "/srv/media"),
            ("FOODGRAM_DEFAULT_PAGE_SIZE", "10"),
        ]))
        .unwrap();

        assert_eq!(settings.database_url, "sqlite://prefixed.db");
        assert_eq!(settings.media_root, PathBuf::from("/srv/media"));
        assert_eq!(settings.default_page_size, 10);
        assert_eq!(settings.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn unrelated_variables_are_ignored() {
        let settings = Settings::from_env(env(&[("PATH", "/usr/bin"), ("BIND_ADDRESS", "127.0.0.1:8080")])).unwrap();

        assert_eq!(settings.bind_address, "127.0.0.1:8080");
        assert_eq!(settings.database_url, "sqlite://foodgram.db?mode=rwc");
    }
}
