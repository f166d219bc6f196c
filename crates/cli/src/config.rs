// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `partix.toml` loading

use anyhow::{Context, Result};
use partix_engine::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "partix.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub engine: EngineConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Registry write-ahead log
    pub wal: PathBuf,
    /// Database the commands operate in
    pub database: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            wal: PathBuf::from("partix.wal"),
            database: 1,
        }
    }
}

impl CliConfig {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load `path`, or `partix.toml` in the working directory if it exists
    ///
    /// A relative WAL path is resolved against the config file's directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config =
            Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
        if config.storage.wal.is_relative() {
            if let Some(dir) = path.parent() {
                config.storage.wal = dir.join(&config.storage.wal);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
