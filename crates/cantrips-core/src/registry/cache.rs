use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ResolutionError;
use crate::models::CacheEntry;

/// Ledger file name inside the modules directory.
pub const LEDGER_FILE: &str = "modules.json";

#[derive(Serialize)]
struct LedgerFile {
    modules: Vec<Value>,
}

#[derive(Deserialize)]
struct RawLedger {
    #[serde(default)]
    modules: Vec<Value>,
}

/// Persistent ledger of resolved modules.
///
/// Entries are matched on all four fields, so any change to a module's
/// name, type, version or path is a cache miss. Entries that do not parse
/// never match but are written back untouched.
#[derive(Debug)]
pub struct ModuleCache {
    path: PathBuf,
    entries: Vec<CacheEntry>,
    unrecognized: Vec<Value>,
}

impl ModuleCache {
    /// Create the modules directory and ledger if needed, then load it.
    pub fn open(modules_dir: &Path) -> Result<Self, ResolutionError> {
        fs::create_dir_all(modules_dir).map_err(ledger_error)?;
        let path = modules_dir.join(LEDGER_FILE);

        if !path.exists() {
            let cache = Self {
                path,
                entries: Vec::new(),
                unrecognized: Vec::new(),
            };
            cache.save()?;
            return Ok(cache);
        }

        let content = fs::read_to_string(&path).map_err(ledger_error)?;
        let raw: RawLedger = serde_json::from_str(&content).map_err(|e| {
            ResolutionError::Ledger(format!("{} is not a valid ledger: {e}", path.display()))
        })?;

        let mut entries = Vec::new();
        let mut unrecognized = Vec::new();
        for value in raw.modules {
            match serde_json::from_value::<CacheEntry>(value.clone()) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(ledger = %path.display(), error = %e, "Ignoring malformed ledger entry");
                    unrecognized.push(value);
                }
            }
        }

        debug!(ledger = %path.display(), count = entries.len(), "Loaded module ledger");
        Ok(Self {
            path,
            entries,
            unrecognized,
        })
    }

    pub fn is_cached(&self, entry: &CacheEntry) -> bool {
        self.entries.iter().any(|cached| cached == entry)
    }

    /// Append an entry and rewrite the ledger.
    pub fn record(&mut self, entry: CacheEntry) -> Result<(), ResolutionError> {
        self.entries.push(entry);
        self.save()
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), ResolutionError> {
        let mut modules = self
            .entries
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ResolutionError::Ledger(e.to_string()))?;
        modules.extend(self.unrecognized.iter().cloned());

        let json = serde_json::to_string_pretty(&LedgerFile { modules })
            .map_err(|e| ResolutionError::Ledger(e.to_string()))?;
        fs::write(&self.path, json).map_err(ledger_error)
    }
}

fn ledger_error(err: std::io::Error) -> ResolutionError {
    ResolutionError::Ledger(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModuleType;
    use serde_json::json;

    fn entry() -> CacheEntry {
        CacheEntry {
            name: "foo".to_string(),
            module_type: ModuleType::Npm,
            version: "1.0.0".to_string(),
            path: "foo/1.0.0".to_string(),
        }
    }

    #[test]
    fn test_open_creates_empty_ledger() {
        let temp = tempfile::tempdir().unwrap();
        let modules_dir = temp.path().join("modules");

        let cache = ModuleCache::open(&modules_dir).unwrap();
        assert!(cache.entries().is_empty());

        let content: Value =
            serde_json::from_str(&fs::read_to_string(modules_dir.join(LEDGER_FILE)).unwrap())
                .unwrap();
        assert_eq!(content, json!({"modules": []}));
    }

    #[test]
    fn test_loads_entries_from_file() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join(LEDGER_FILE),
            json!({"modules": [{"name": "foo", "type": "npm", "version": "1.0.0", "path": "foo/1.0.0"}]})
                .to_string(),
        )
        .unwrap();

        let cache = ModuleCache::open(temp.path()).unwrap();
        assert!(cache.is_cached(&entry()));
    }

    #[test]
    fn test_any_field_change_is_a_miss() {
        let temp = tempfile::tempdir().unwrap();
        let mut cache = ModuleCache::open(temp.path()).unwrap();
        cache.record(entry()).unwrap();

        let mut version = entry();
        version.version = "1.0.1".to_string();
        let mut kind = entry();
        kind.module_type = ModuleType::Git;
        let mut path = entry();
        path.path = "foo/other".to_string();
        let mut name = entry();
        name.name = "bar".to_string();

        assert!(cache.is_cached(&entry()));
        for changed in [version, kind, path, name] {
            assert!(!cache.is_cached(&changed));
        }
    }

    #[test]
    fn test_record_rewrites_file() {
        let temp = tempfile::tempdir().unwrap();
        let mut cache = ModuleCache::open(temp.path()).unwrap();
        cache.record(entry()).unwrap();
        cache.record(entry()).unwrap();

        let content: Value =
            serde_json::from_str(&fs::read_to_string(cache.path()).unwrap()).unwrap();
        let expected = json!({"name": "foo", "type": "npm", "version": "1.0.0", "path": "foo/1.0.0"});
        assert_eq!(content, json!({"modules": [expected.clone(), expected]}));

        let reopened = ModuleCache::open(temp.path()).unwrap();
        assert_eq!(reopened.entries().len(), 2);
    }

    #[test]
    fn test_malformed_entries_are_ignored_but_kept() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join(LEDGER_FILE),
            json!({"modules": [
                {"name": "foo", "type": "npm", "version": "1.0.0", "path": "foo/1.0.0"},
                {"name": "broken"},
                "garbage"
            ]})
            .to_string(),
        )
        .unwrap();

        let mut cache = ModuleCache::open(temp.path()).unwrap();
        assert_eq!(cache.entries(), &[entry()]);
        assert!(!cache.is_cached(&CacheEntry {
            name: "broken".to_string(),
            ..entry()
        }));

        let mut other = entry();
        other.name = "bar".to_string();
        other.path = "bar/1.0.0".to_string();
        cache.record(other).unwrap();

        let content: Value =
            serde_json::from_str(&fs::read_to_string(cache.path()).unwrap()).unwrap();
        assert_eq!(
            content,
            json!({"modules": [
                {"name": "foo", "type": "npm", "version": "1.0.0", "path": "foo/1.0.0"},
                {"name": "bar", "type": "npm", "version": "1.0.0", "path": "bar/1.0.0"},
                {"name": "broken"},
                "garbage"
            ]})
        );
    }

    #[test]
    fn test_unparsable_ledger_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join(LEDGER_FILE), "not json").unwrap();
        assert!(matches!(
            ModuleCache::open(temp.path()),
            Err(ResolutionError::Ledger(_))
        ));
    }
}
