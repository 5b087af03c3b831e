//! Module manifest (`cantrips.toml` / `cantrips.json`).
//!
//! The manifest tells the host how to start a module process and, optionally,
//! how to install its dependencies and build it after a Git checkout.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ResolutionError;

/// Manifest file names, in lookup order.
pub const MANIFEST_FILES: [&str; 2] = ["cantrips.toml", "cantrips.json"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl EntryPoint {
    /// Program to spawn; relative paths resolve against the module directory.
    pub fn program(&self, module_dir: &Path) -> PathBuf {
        let command = Path::new(&self.command);
        if command.is_relative() && self.command.contains('/') {
            module_dir.join(command)
        } else {
            command.to_path_buf()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub entry: EntryPoint,
    /// Dependency installation command, e.g. `["npm", "ci"]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<Vec<String>>,
    /// Build command run in place after installation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Vec<String>>,
}

impl ModuleManifest {
    /// First manifest file present in `dir`.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        MANIFEST_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load the manifest of `module` from `dir`, if one exists.
    pub fn load_optional(dir: &Path, module: &str) -> Result<Option<Self>, ResolutionError> {
        let Some(path) = Self::find(dir) else {
            return Ok(None);
        };

        let content = std::fs::read_to_string(&path).map_err(ResolutionError::io(module))?;
        let invalid = |reason: String| ResolutionError::InvalidManifest {
            module: module.to_string(),
            reason: format!("{}: {reason}", path.display()),
        };

        let manifest: ModuleManifest = if path.extension().map(|e| e == "toml").unwrap_or(false) {
            toml::from_str(&content).map_err(|e| invalid(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?
        };
        Ok(Some(manifest))
    }

    /// Load the manifest of `module` from `dir`; a missing manifest is an error.
    pub fn load(dir: &Path, module: &str) -> Result<Self, ResolutionError> {
        Self::load_optional(dir, module)?.ok_or_else(|| ResolutionError::MissingManifest {
            module: module.to_string(),
            dir: dir.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_toml_manifest() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("cantrips.toml"),
            "build = [\"make\"]\n\n[entry]\ncommand = \"./bin/plugin\"\nargs = [\"--stdio\"]\n",
        )
        .unwrap();

        let manifest = ModuleManifest::load(temp.path(), "demo").unwrap();
        assert_eq!(manifest.entry.args, vec!["--stdio".to_string()]);
        assert_eq!(manifest.build, Some(vec!["make".to_string()]));
        assert_eq!(manifest.install, None);
        assert_eq!(
            manifest.entry.program(temp.path()),
            temp.path().join("bin/plugin")
        );
    }

    #[test]
    fn test_toml_takes_precedence_over_json() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("cantrips.json"),
            r#"{"entry": {"command": "node"}}"#,
        )
        .unwrap();
        assert_eq!(
            ModuleManifest::load(temp.path(), "demo").unwrap().entry.command,
            "node"
        );

        std::fs::write(
            temp.path().join("cantrips.toml"),
            "[entry]\ncommand = \"python3\"\n",
        )
        .unwrap();
        assert_eq!(
            ModuleManifest::load(temp.path(), "demo").unwrap().entry.command,
            "python3"
        );
    }

    #[test]
    fn test_missing_manifest() {
        let temp = tempfile::tempdir().unwrap();
        assert!(ModuleManifest::load_optional(temp.path(), "demo").unwrap().is_none());
        assert!(matches!(
            ModuleManifest::load(temp.path(), "demo"),
            Err(ResolutionError::MissingManifest { .. })
        ));
    }

    #[test]
    fn test_invalid_manifest_names_module() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("cantrips.json"), "{not json").unwrap();
        let err = ModuleManifest::load(temp.path(), "demo").unwrap_err();
        assert!(err.to_string().contains("demo"));
    }

    #[test]
    fn test_bare_program_is_looked_up_on_path() {
        let entry = EntryPoint {
            command: "node".to_string(),
            args: vec!["index.js".to_string()],
        };
        assert_eq!(entry.program(Path::new("/mods/x")), PathBuf::from("node"));
    }
}
