// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Config file persistence.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use vpdf_core::AppConfig;
use vpdf_core::error::Result;

const CONFIG_FILE: &str = "config.json";

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Persisted config from the data dir, if present and readable.
pub fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = config_path(data_dir);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Ignoring unreadable config");
            None
        }
    }
}

/// Config from an explicit file; unlike `load_config`, errors are reported.
pub fn read_config_file(path: &Path) -> Result<AppConfig> {
    let data = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&data)?;
    config.validate()?;
    Ok(config)
}

pub fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    let path = config_path(data_dir);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    info!(path = %path.display(), "Config saved");
    Ok(path)
}
