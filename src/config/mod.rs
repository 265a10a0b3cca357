//! Configuration for `issue_store`.
//!
//! Configuration sources and precedence (highest wins), trimmed from the
//! teacher's multi-layer CLI/DB precedence chain to the two layers this
//! library actually owns:
//!
//! 1. Environment variable overrides (`BEADS_ID_PREFIX`, etc.)
//! 2. Project config (`<beads_dir>/config.yaml`)
//! 3. Built-in defaults
//!
//! CLI overrides and a DB-config layer belong to the external CLI
//! collaborator (spec.md §1) and are not modeled here.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::id::{DEFAULT_MAX_DEPTH, DEFAULT_PREFIX, DEFAULT_SLUG_LENGTH};
use crate::model::{IssueType, Priority};

/// The recognised configuration keys (spec §6.3). Unknown keys are
/// tolerated and simply ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub id_prefix: String,
    pub id_length: usize,
    pub allowed_prefixes: Vec<String>,
    pub max_depth: usize,
    pub custom_types: Vec<String>,
    pub custom_statuses: Vec<String>,
    pub default_priority: Priority,
    pub default_type: IssueType,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_PREFIX.to_string(),
            id_length: DEFAULT_SLUG_LENGTH,
            allowed_prefixes: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            custom_types: Vec::new(),
            custom_statuses: Vec::new(),
            default_priority: Priority::MEDIUM,
            default_type: IssueType::Task,
        }
    }
}

impl StoreConfig {
    /// Load `<beads_dir>/config.yaml` (if present) layered under
    /// environment overrides, falling back to defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(beads_dir: &Path) -> Result<Self> {
        let mut raw = load_project_layer(beads_dir)?;
        raw.extend(load_env_layer());
        Ok(Self::from_raw(&raw))
    }

    fn from_raw(raw: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let id_prefix = raw
            .get("id.prefix")
            .map(|v| v.trim_end_matches('-').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.id_prefix);
        let id_length = raw
            .get("id.length")
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.id_length);
        let allowed_prefixes = raw
            .get("allowed_prefixes")
            .map(|v| split_csv(v))
            .unwrap_or_default();
        let max_depth = raw
            .get("hierarchy.max_depth")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_depth);
        let custom_types = raw.get("types.custom").map(|v| split_csv(v)).unwrap_or_default();
        let custom_statuses = raw
            .get("status.custom")
            .map(|v| split_csv(v))
            .unwrap_or_default();
        let default_priority = raw
            .get("defaults.priority")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.default_priority);
        let default_type = raw
            .get("defaults.type")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.default_type);

        Self {
            id_prefix,
            id_length,
            allowed_prefixes,
            max_depth,
            custom_types,
            custom_statuses,
            default_priority,
            default_type,
        }
    }

    /// Whether `type_name` is acceptable: one of the built-ins or listed in
    /// `types.custom`.
    #[must_use]
    pub fn accepts_type(&self, type_name: &str) -> bool {
        let builtins = ["task", "bug", "feature", "epic", "chore", "gate", "molecule"];
        builtins.contains(&type_name) || self.custom_types.iter().any(|t| t == type_name)
    }

    /// Whether `status_name` is acceptable: one of the built-ins or listed
    /// in `status.custom`.
    #[must_use]
    pub fn accepts_status(&self, status_name: &str) -> bool {
        let builtins = [
            "open",
            "in-progress",
            "blocked",
            "deferred",
            "hooked",
            "pinned",
            "closed",
            "tombstone",
        ];
        builtins.contains(&status_name) || self.custom_statuses.iter().any(|s| s == status_name)
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_project_layer(beads_dir: &Path) -> Result<HashMap<String, String>> {
    let path = beads_dir.join("config.yaml");
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let contents = fs::read_to_string(&path).map_err(|source| crate::error::BeadsError::Io {
        path: path.clone(),
        source,
    })?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&contents).map_err(|source| crate::error::BeadsError::Yaml { path, source })?;
    Ok(flatten_yaml(&value))
}

/// Flatten a nested YAML mapping into dotted keys (`id: {prefix: bd}` ->
/// `id.prefix = bd`), matching the dotted key names in spec §6.3.
fn flatten_yaml(value: &serde_yaml::Value) -> HashMap<String, String> {
    let mut out = HashMap::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &serde_yaml::Value, prefix: String, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let Some(key) = k.as_str() else { continue };
                let full_key = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(v, full_key, out);
            }
        }
        serde_yaml::Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        serde_yaml::Value::Number(n) => {
            out.insert(prefix, n.to_string());
        }
        serde_yaml::Value::Bool(b) => {
            out.insert(prefix, b.to_string());
        }
        _ => {}
    }
}

fn load_env_layer() -> HashMap<String, String> {
    let mut out = HashMap::new();
    let mapping = [
        ("BEADS_ID_PREFIX", "id.prefix"),
        ("BEADS_ID_LENGTH", "id.length"),
        ("BEADS_ALLOWED_PREFIXES", "allowed_prefixes"),
        ("BEADS_MAX_DEPTH", "hierarchy.max_depth"),
        ("BEADS_CUSTOM_TYPES", "types.custom"),
        ("BEADS_CUSTOM_STATUSES", "status.custom"),
        ("BEADS_DEFAULT_PRIORITY", "defaults.priority"),
        ("BEADS_DEFAULT_TYPE", "defaults.type"),
    ];
    for (env_key, config_key) in mapping {
        if let Ok(value) = env::var(env_key) {
            if !value.trim().is_empty() {
                out.insert(config_key.to_string(), value);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_no_config_file() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig::load(temp.path()).unwrap();
        assert_eq!(config.id_prefix, "bd");
        assert_eq!(config.max_depth, 3);
    }

    #[test]
    fn loads_dotted_keys_from_yaml() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("config.yaml"),
            "id:\n  prefix: proj-\n  length: 6\nhierarchy:\n  max_depth: 5\ntypes:\n  custom: design,spike\n",
        )
        .unwrap();
        let config = StoreConfig::load(temp.path()).unwrap();
        assert_eq!(config.id_prefix, "proj");
        assert_eq!(config.id_length, 6);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.custom_types, vec!["design", "spike"]);
    }

    #[test]
    fn accepts_custom_type_once_configured() {
        let mut config = StoreConfig::default();
        assert!(!config.accepts_type("design"));
        config.custom_types.push("design".to_string());
        assert!(config.accepts_type("design"));
        assert!(config.accepts_type("task"));
    }
}
