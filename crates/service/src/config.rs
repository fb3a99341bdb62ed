//! Layered settings: a `config`-crate base file, an `APP_ENV`-keyed overlay,
//! and `MONIKER_`-prefixed environment variables, cached behind a
//! `once_cell::sync::OnceCell` exactly as `control::config` caches its own
//! `Settings`. Every field carries a default so the service boots cleanly
//! with no config files present at all -- files only need to exist when a
//! deployment wants to override a default.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::Deserialize;

mod app_env;

pub use app_env::{app_env, AppEnv};

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_catalog_path() -> String {
    "catalog.yaml".to_string()
}

fn default_reload_interval_seconds() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_seconds() -> u64 {
    30
}

fn default_cache_max_entries() -> usize {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl CorsSettings {
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors: CorsSettings,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: CorsSettings::default(),
        }
    }
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_path")]
    pub path: String,
    #[serde(default = "default_reload_interval_seconds")]
    pub reload_interval_seconds: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            reload_interval_seconds: default_reload_interval_seconds(),
        }
    }
}

impl CatalogSettings {
    pub fn path(&self) -> &Path {
        Path::new(&self.path)
    }

    pub fn reload_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reload_interval_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ttl_seconds: default_cache_ttl_seconds(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            application: ApplicationSettings::default(),
            catalog: CatalogSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// Loads settings once and caches them for the life of the process.
/// Subsequent calls are no-ops. Intended to be called exactly once, early in
/// `main`/`cmd::serve`; later calls with a different `config_path` are
/// silently ignored, matching the `OnceCell` semantics of the teacher's
/// `control::config::settings`.
pub fn load_settings(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = build_settings(config_path)?;
    let _ = SETTINGS.set(settings);
    Ok(())
}

/// Returns the cached settings, loading them with no explicit config path
/// if `load_settings` has not already run (useful for tests and for library
/// callers that only need a `Registry` and not the full CLI).
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| build_settings(None).expect("failed to load settings"))
}

fn build_settings(config_path: Option<PathBuf>) -> anyhow::Result<Settings> {
    let mut builder = config::Config::builder();

    if let Some(explicit) = &config_path {
        builder = builder.add_source(config::File::from(explicit.clone()).required(true));
    } else {
        let config_dir = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("config");
        builder = builder
            .add_source(config::File::from(config_dir.join("base")).required(false))
            .add_source(
                config::File::from(config_dir.join(app_env().as_str())).required(false),
            );
    }

    let builder = builder.add_source(
        config::Environment::with_prefix("MONIKER")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_config_sources() {
        let settings = build_settings(None).unwrap();
        assert_eq!(settings.application.port, 8080);
        assert_eq!(settings.catalog.reload_interval_seconds, 60);
        assert!(settings.cache.enabled);
    }
}
