//! Local lookup sources: the identity marker, the fleet config table and
//! the common-parameters table.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use uav_model::DroneConfig;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no .hwid marker file in {0}")]
    IdentityMissing(String),

    #[error("{count} .hwid marker files in {dir}, expected exactly one")]
    IdentityAmbiguous { dir: String, count: usize },

    #[error("marker file '{0}' does not name an integer hardware id")]
    IdentityInvalid(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Table {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("no row for hardware id {hw_id} in {path}")]
    ConfigMissing { hw_id: u32, path: String },
}

/// Resolves the hardware identity from the `<id>.hwid` marker in `dir`.
///
/// Exactly one marker must exist; none, several, or a non-integer stem
/// are distinct resolution errors.
pub fn read_hw_id(dir: &Path) -> Result<u32, SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SourceError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut markers = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("hwid"))
        {
            markers.push(path);
        }
    }

    match markers.as_slice() {
        [] => Err(SourceError::IdentityMissing(dir.display().to_string())),
        [marker] => {
            let stem = marker
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            let hw_id = stem
                .parse::<u32>()
                .map_err(|_| SourceError::IdentityInvalid(marker.display().to_string()))?;
            info!(hw_id, marker = %marker.display(), "hardware identity resolved");
            Ok(hw_id)
        }
        many => Err(SourceError::IdentityAmbiguous {
            dir: dir.display().to_string(),
            count: many.len(),
        }),
    }
}

/// Finds this airframe's row in the fleet config table. First match wins;
/// rows after it are not read.
pub fn lookup_config(path: &Path, hw_id: u32) -> Result<DroneConfig, SourceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| SourceError::Table {
        path: path.display().to_string(),
        source: e,
    })?;

    for row in reader.deserialize::<DroneConfig>() {
        let row = row.map_err(|e| SourceError::Table {
            path: path.display().to_string(),
            source: e,
        })?;
        if row.hw_id == hw_id {
            info!(
                hw_id,
                pos_id = row.pos_id,
                ip = %row.ip,
                control_port = row.control_port,
                command_port = row.command_port,
                "config row resolved"
            );
            return Ok(row);
        }
    }
    Err(SourceError::ConfigMissing {
        hw_id,
        path: path.display().to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct CommonParamRow {
    param_name: String,
    param_value: String,
}

/// Loads the whole common-parameters table, preserving row order.
pub fn load_common_params(path: &Path) -> Result<Vec<(String, String)>, SourceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| SourceError::Table {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut entries = Vec::new();
    for row in reader.deserialize::<CommonParamRow>() {
        let row = row.map_err(|e| SourceError::Table {
            path: path.display().to_string(),
            source: e,
        })?;
        entries.push((
            row.param_name.trim().to_string(),
            row.param_value.trim().to_string(),
        ));
    }
    Ok(entries)
}
