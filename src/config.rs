// src/config.rs
//! Pipeline configuration: defaults, environment overrides, optional TOML.

use std::fs;
use std::path::Path;
use std::thread;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

pub const DEFAULT_STORAGE_PATH: &str = ":memory:";
pub const DEFAULT_RING_CAPACITY: usize = 1024;
pub const DEFAULT_MAX_RECORDS: usize = 10_000;
pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub const ENV_STORAGE_PATH: &str = "HYPERINGEST_DB_PATH";
pub const ENV_RING_CAPACITY: &str = "HYPERINGEST_RING_CAPACITY";
pub const ENV_WORKERS: &str = "HYPERINGEST_WORKERS";
pub const ENV_MAX_RECORDS: &str = "HYPERINGEST_MAX_RECORDS";
pub const ENV_BATCH_SIZE: &str = "HYPERINGEST_BATCH_SIZE";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub storage_path: String,
    pub ring_capacity: usize,
    pub workers: usize,
    pub max_records: usize,
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_path: DEFAULT_STORAGE_PATH.to_string(),
            ring_capacity: DEFAULT_RING_CAPACITY,
            workers: thread::available_parallelism().map(|n| n.get()).unwrap_or(2),
            max_records: DEFAULT_MAX_RECORDS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl PipelineConfig {
    /// Defaults overridden by `HYPERINGEST_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(path) = std::env::var(ENV_STORAGE_PATH) {
            if !path.trim().is_empty() {
                cfg.storage_path = path;
            }
        }
        if let Some(v) = env_usize(ENV_RING_CAPACITY) {
            cfg.ring_capacity = v;
        }
        if let Some(v) = env_usize(ENV_WORKERS) {
            cfg.workers = v;
        }
        if let Some(v) = env_usize(ENV_MAX_RECORDS) {
            cfg.max_records = v;
        }
        if let Some(v) = env_usize(ENV_BATCH_SIZE) {
            cfg.batch_size = v;
        }
        cfg
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing pipeline config")
    }

    /// Loads from a TOML file when given, otherwise from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let content = fs::read_to_string(p)
                    .with_context(|| format!("reading config from {}", p.display()))?;
                Self::from_toml_str(&content)
            }
            None => Ok(Self::from_env()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.ring_capacity > 0 && self.ring_capacity.is_power_of_two(),
            "ring_capacity must be a positive power of two, got {}",
            self.ring_capacity
        );
        ensure!(self.workers > 0, "workers must be at least 1");
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(self.max_records > 0, "max_records must be at least 1");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_defaults() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
            storage_path = "pipeline.duckdb"
            ring_capacity = 256
            batch_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage_path, "pipeline.duckdb");
        assert_eq!(cfg.ring_capacity, 256);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.max_records, DEFAULT_MAX_RECORDS);
        cfg.validate().unwrap();
    }

    #[test]
    fn validate_rejects_odd_capacity() {
        let cfg = PipelineConfig {
            ring_capacity: 1000,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply() {
        std::env::set_var(ENV_RING_CAPACITY, "64");
        std::env::set_var(ENV_BATCH_SIZE, "10");
        std::env::remove_var(ENV_STORAGE_PATH);

        let cfg = PipelineConfig::from_env();
        assert_eq!(cfg.ring_capacity, 64);
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.storage_path, DEFAULT_STORAGE_PATH);

        std::env::remove_var(ENV_RING_CAPACITY);
        std::env::remove_var(ENV_BATCH_SIZE);
    }
}
