use serde::{Deserialize, Serialize};
use std::fmt;

/// Version-spec prefix selecting a module from the working tree.
pub const LOCAL_PREFIX: &str = "file:";
/// Version-spec prefix selecting a module cloned over SSH.
pub const GIT_PREFIX: &str = "git@";
/// Shared storage bucket for all local modules.
pub const LOCAL_BUCKET: &str = "local";
/// Ref used when a Git version spec carries no `#ref`.
pub const DEFAULT_GIT_REF: &str = "master";

/// A configured module: `name = versionSpec`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    pub version_spec: String,
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>, version_spec: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_spec: version_spec.into(),
        }
    }
}

/// Where a module's code comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Local,
    Git,
    Npm,
}

impl ModuleType {
    /// Classify a version spec; the first matching prefix wins.
    pub fn classify(version_spec: &str) -> Self {
        if version_spec.starts_with(LOCAL_PREFIX) {
            ModuleType::Local
        } else if version_spec.starts_with(GIT_PREFIX) {
            ModuleType::Git
        } else {
            ModuleType::Npm
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleType::Local => "local",
            ModuleType::Git => "git",
            ModuleType::Npm => "npm",
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Git version spec split into repository and optional ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitSpec<'a> {
    /// Everything before the first `#`, as passed to `git clone`.
    pub repository: &'a str,
    pub reference: Option<&'a str>,
}

impl<'a> GitSpec<'a> {
    pub fn parse(version_spec: &'a str) -> Self {
        let (repository, reference) = match version_spec.split_once('#') {
            Some((repository, reference)) => (repository, Some(reference)),
            None => (version_spec, None),
        };
        Self {
            repository,
            reference: reference.filter(|r| !r.is_empty()),
        }
    }

    /// Repository with the `git@` prefix and `.git` suffix removed.
    pub fn cleaned_repository(&self) -> &'a str {
        let repository = self
            .repository
            .strip_prefix(GIT_PREFIX)
            .unwrap_or(self.repository);
        repository.strip_suffix(".git").unwrap_or(repository)
    }

    pub fn reference_or_default(&self) -> &'a str {
        self.reference.unwrap_or(DEFAULT_GIT_REF)
    }
}

/// Storage path of a module, relative to the modules root.
pub fn derive_path(name: &str, version_spec: &str, module_type: ModuleType) -> String {
    match module_type {
        ModuleType::Local => LOCAL_BUCKET.to_string(),
        ModuleType::Npm => format!("{name}/{version_spec}"),
        ModuleType::Git => {
            let git = GitSpec::parse(version_spec);
            format!(
                "{name}/{}/{}",
                git.cleaned_repository(),
                git.reference_or_default()
            )
        }
    }
}

/// A classified module with its storage path fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    name: String,
    version: String,
    module_type: ModuleType,
    path: String,
}

impl ResolvedModule {
    pub fn new(spec: &ModuleSpec) -> Self {
        let module_type = ModuleType::classify(&spec.version_spec);
        Self {
            path: derive_path(&spec.name, &spec.version_spec, module_type),
            name: spec.name.clone(),
            version: spec.version_spec.clone(),
            module_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn module_type(&self) -> ModuleType {
        self.module_type
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Ledger projection of this module.
    pub fn cache_entry(&self) -> CacheEntry {
        CacheEntry {
            name: self.name.clone(),
            module_type: self.module_type,
            version: self.version.clone(),
            path: self.path.clone(),
        }
    }
}

/// Identity of a previously resolved module, as persisted in `modules.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    pub version: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_spec_is_local_bucket() {
        for spec in ["file:./modules/deploy", "file:", "file:/abs/path"] {
            let module = ResolvedModule::new(&ModuleSpec::new("deploy", spec));
            assert_eq!(module.module_type(), ModuleType::Local);
            assert_eq!(module.path(), "local");
        }
    }

    #[test]
    fn test_git_spec_with_ref() {
        let module = ResolvedModule::new(&ModuleSpec::new("foo", "git@host/repo.git#dev"));
        assert_eq!(module.module_type(), ModuleType::Git);
        assert_eq!(module.path(), "foo/host/repo/dev");
    }

    #[test]
    fn test_git_spec_without_ref_defaults_to_master() {
        let module = ResolvedModule::new(&ModuleSpec::new("foo", "git@host/repo.git"));
        assert_eq!(module.path(), "foo/host/repo/master");

        let empty_ref = ResolvedModule::new(&ModuleSpec::new("foo", "git@host/repo.git#"));
        assert_eq!(empty_ref.path(), "foo/host/repo/master");
    }

    #[test]
    fn test_git_spec_splits_on_first_hash() {
        let git = GitSpec::parse("git@host/repo.git#feature#2");
        assert_eq!(git.repository, "git@host/repo.git");
        assert_eq!(git.reference, Some("feature#2"));
    }

    #[test]
    fn test_everything_else_is_npm() {
        for spec in ["1.0.0", "^2.3.1", "latest", "github:user/repo"] {
            let module = ResolvedModule::new(&ModuleSpec::new("left-pad", spec));
            assert_eq!(module.module_type(), ModuleType::Npm);
            assert_eq!(module.path(), format!("left-pad/{spec}"));
        }
    }

    #[test]
    fn test_cache_entry_serializes_type_field() {
        let entry = ResolvedModule::new(&ModuleSpec::new("m", "1.0.0")).cache_entry();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "m", "type": "npm", "version": "1.0.0", "path": "m/1.0.0"})
        );
    }
}
