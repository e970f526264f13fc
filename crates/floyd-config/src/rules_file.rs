//! The persisted "always" permission rule file.
//!
//! `ask`'s session scope is never written here (it lives only in the
//! running process); only rules granted or denied with `always` scope, plus
//! the static rule list a user hand-edits, are persisted.

use std::path::PathBuf;

use directories::ProjectDirs;
use floyd_core::PermissionRule;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<PermissionRule>,
}

/// The path to the permissions file, `~/.config/floyd/permissions.toml`
/// (or the platform equivalent).
pub fn permissions_file_path() -> ConfigResult<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "floyd").ok_or(ConfigError::NoConfigDir)?;
    Ok(dirs.config_dir().join("permissions.toml"))
}

/// Load the persisted rule list. Returns an empty list if no file exists
/// yet — a fresh install has no "always" overrides.
pub fn load_permission_rules() -> ConfigResult<Vec<PermissionRule>> {
    let path = permissions_file_path()?;
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: RulesFile = toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parsed.rules)
}

/// Persist the rule list, replacing whatever was there.
pub fn save_permission_rules(rules: &[PermissionRule]) -> ConfigResult<()> {
    let path = permissions_file_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let file = RulesFile {
        rules: rules.to_vec(),
    };
    let text = toml::to_string_pretty(&file).expect("permission rules always serialize");
    std::fs::write(&path, text).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}
