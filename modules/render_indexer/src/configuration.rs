use std::path::PathBuf;

use anyhow::{bail, Result};
use config::{Config, Environment};
use tracing::warn;

pub const DEFAULT_FLUSH_INTERVAL: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Fjall,
    Memory,
}

#[derive(Debug, Clone)]
pub struct RenderIndexerConfig {
    pub render_topic: String,
    pub unrender_topic: String,
    pub flush_interval: usize,
    pub checkpoint_dir: PathBuf,
    pub store: StoreKind,
    pub database_path: String,
    pub clear_on_start: bool,
}

impl RenderIndexerConfig {
    /// Layer module defaults, the module's own section and `NC_` prefixed
    /// environment variables, in increasing precedence
    pub fn try_load(config: &Config) -> Result<Self> {
        let full_config = Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config.default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config.clone())
            .add_source(Environment::with_prefix("NC"))
            .build()?;
        Self::from_layered(&full_config)
    }

    fn from_layered(config: &Config) -> Result<Self> {
        // Environment keys arrive snake_cased and win over the kebab-cased file keys
        let lookup = |key: &str| {
            config.get_string(&key.replace('-', "_")).or_else(|_| config.get_string(key)).ok()
        };

        let store = match lookup("store").as_deref() {
            None | Some("fjall") => StoreKind::Fjall,
            Some("memory") => StoreKind::Memory,
            Some(other) => bail!("Unknown record store '{other}'"),
        };

        Ok(Self {
            render_topic: config.get_string("render-topic")?,
            unrender_topic: config.get_string("unrender-topic")?,
            flush_interval: coerce_flush_interval(lookup("flush-interval").as_deref()),
            checkpoint_dir: resolve_checkpoint_dir(lookup("checkpoint-dir").as_deref()),
            store,
            database_path: config.get_string("database-path")?,
            clear_on_start: config.get_bool("clear-on-start").unwrap_or(false),
        })
    }
}

/// Non-positive or unparsable intervals fall back to the default
pub fn coerce_flush_interval(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_FLUSH_INTERVAL;
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 1 => n as usize,
        _ => {
            warn!(
                value = raw,
                "Invalid flush interval, using default of {DEFAULT_FLUSH_INTERVAL}"
            );
            DEFAULT_FLUSH_INTERVAL
        }
    }
}

/// A missing checkpoint directory falls back to the platform temp directory
pub fn resolve_checkpoint_dir(raw: Option<&str>) -> PathBuf {
    match raw.map(str::trim) {
        Some(dir) if !dir.is_empty() && PathBuf::from(dir).is_dir() => PathBuf::from(dir),
        Some(dir) => {
            warn!(
                value = dir,
                "Checkpoint directory does not exist, using the temp directory"
            );
            std::env::temp_dir()
        }
        None => std::env::temp_dir(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_interval_accepts_positive_values() {
        assert_eq!(coerce_flush_interval(Some("5")), 5);
        assert_eq!(coerce_flush_interval(Some(" 12 ")), 12);
    }

    #[test]
    fn flush_interval_falls_back_on_bad_values() {
        assert_eq!(coerce_flush_interval(None), DEFAULT_FLUSH_INTERVAL);
        assert_eq!(coerce_flush_interval(Some("0")), DEFAULT_FLUSH_INTERVAL);
        assert_eq!(coerce_flush_interval(Some("-4")), DEFAULT_FLUSH_INTERVAL);
        assert_eq!(coerce_flush_interval(Some("thirty")), DEFAULT_FLUSH_INTERVAL);
    }

    #[test]
    fn checkpoint_dir_falls_back_to_temp() {
        let missing = std::env::temp_dir().join("no-such-checkpoint-dir-for-render-indexer");
        assert_eq!(
            resolve_checkpoint_dir(missing.to_str()),
            std::env::temp_dir()
        );
        assert_eq!(resolve_checkpoint_dir(None), std::env::temp_dir());
    }

    #[test]
    fn checkpoint_dir_kept_when_present() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_checkpoint_dir(dir.path().to_str()), dir.path());
    }

    #[test]
    fn loads_defaults_and_module_overrides() {
        let module = Config::builder()
            .set_override("flush-interval", "7")
            .unwrap()
            .set_override("store", "memory")
            .unwrap()
            .build()
            .unwrap();
        let defaults = Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config.default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(module)
            .build()
            .unwrap();

        let cfg = RenderIndexerConfig::from_layered(&defaults).unwrap();
        assert_eq!(cfg.render_topic, "ledger.render");
        assert_eq!(cfg.unrender_topic, "ledger.unrender");
        assert_eq!(cfg.flush_interval, 7);
        assert_eq!(cfg.store, StoreKind::Memory);
        assert!(!cfg.clear_on_start);
    }

    #[test]
    fn snake_case_key_takes_precedence() {
        let config = Config::builder()
            .set_override("render-topic", "r")
            .unwrap()
            .set_override("unrender-topic", "u")
            .unwrap()
            .set_override("database-path", "db")
            .unwrap()
            .set_override("flush-interval", "7")
            .unwrap()
            .set_override("flush_interval", "0")
            .unwrap()
            .build()
            .unwrap();

        let cfg = RenderIndexerConfig::from_layered(&config).unwrap();
        assert_eq!(cfg.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(cfg.store, StoreKind::Fjall);
    }
}
