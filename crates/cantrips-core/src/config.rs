//! Project configuration file support.
//!
//! Loads `{ modules = { name = "versionSpec" }, <module> = { settings } }`
//! from an explicit path or the first known file name in the working directory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::models::ModuleSpec;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CANTRIPS_CONFIG";

/// File names searched in the working directory, in order.
pub const CONFIG_FILES: [&str; 4] = [
    ".cantrips.toml",
    ".cantrips.json",
    "cantrips.toml",
    "cantrips.json",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CantripsConfig {
    /// Module name to version spec
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
    /// Per-module settings, keyed by module name
    #[serde(flatten)]
    pub settings: BTreeMap<String, Value>,
}

impl CantripsConfig {
    /// Load from `explicit` if given, else discover a config file in `working_dir`.
    ///
    /// A missing discovered file yields an empty config. An explicit path must exist.
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) if !path.exists() => Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::load_from_path(path),
            None => match Self::discover(working_dir) {
                Some(path) => Self::load_from_path(&path),
                None => {
                    debug!(dir = %working_dir.display(), "No config file found");
                    Ok(Self::default())
                }
            },
        }
    }

    /// First config file present in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |reason: String| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        };
        let config: CantripsConfig = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?
        };

        debug!(path = %path.display(), modules = config.modules.len(), "Loaded config");
        Ok(config)
    }

    /// Configured modules in name order.
    pub fn module_specs(&self) -> Vec<ModuleSpec> {
        self.modules
            .iter()
            .map(|(name, version)| ModuleSpec::new(name.clone(), version.clone()))
            .collect()
    }

    /// Settings block for `module`; empty when absent or not a table.
    pub fn settings_for(&self, module: &str) -> Map<String, Value> {
        self.settings
            .get(module)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_missing_config_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let config = CantripsConfig::load(None, temp.path()).unwrap();
        assert_eq!(config, CantripsConfig::default());
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = CantripsConfig::load(Some(&temp.path().join("nope.toml")), temp.path())
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_loads_toml_with_module_settings() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("cantrips.toml"),
            r#"
[modules]
deploy = "git@github.com/acme/deploy.git#v2"
tools = "file:./tools"

[deploy]
region = "eu-west-1"
replicas = 3
"#,
        )
        .unwrap();

        let config = CantripsConfig::load(None, temp.path()).unwrap();
        assert_eq!(
            config.module_specs(),
            vec![
                ModuleSpec::new("deploy", "git@github.com/acme/deploy.git#v2"),
                ModuleSpec::new("tools", "file:./tools"),
            ]
        );
        assert_eq!(
            Value::Object(config.settings_for("deploy")),
            json!({"region": "eu-west-1", "replicas": 3})
        );
        assert!(config.settings_for("tools").is_empty());
    }

    #[test]
    fn test_discovery_prefers_dotfiles() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("cantrips.toml"), "[modules]\na = \"1.0.0\"\n").unwrap();
        fs::write(
            temp.path().join(".cantrips.json"),
            json!({"modules": {"b": "2.0.0"}}).to_string(),
        )
        .unwrap();

        let config = CantripsConfig::load(None, temp.path()).unwrap();
        assert_eq!(config.module_specs(), vec![ModuleSpec::new("b", "2.0.0")]);
    }

    #[test]
    fn test_unparsable_config_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("cantrips.json"), "{not json").unwrap();
        let err = CantripsConfig::load(None, temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
