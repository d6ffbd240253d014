use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use er_core::store::{Store, StoreError};

/// `Store` over a JSON file shaped like the synced store:
/// `{"rules": [...], "darkMode": true}`. A missing file reads as empty.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(StoreError::Read(format!("Failed to read '{}': {}", self.path.display(), e)))
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::Malformed(format!("'{}' is not a JSON object", self.path.display()))),
            Err(e) => Err(StoreError::Malformed(format!("'{}': {}", self.path.display(), e))),
        }
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Write(format!("Failed to create '{}': {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(all))
            .map_err(|e| StoreError::Write(format!("Failed to serialize JSON: {}", e)))?;
        fs::write(&self.path, json)
            .map_err(|e| StoreError::Write(format!("Failed to write '{}': {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use er_core::store::{RuleRepository, DARK_MODE_KEY, RULES_KEY};
    use serde_json::json;

    #[test]
    fn test_missing_file_reads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RuleRepository::new(FileStore::new(dir.path().join("none.json")));
        assert!(repo.load_rules().unwrap().is_empty());
        assert!(repo.dark_mode().unwrap());
    }

    #[test]
    fn test_set_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/store.json");
        let mut store = FileStore::new(&path);
        store.set(DARK_MODE_KEY, json!(false)).unwrap();
        store.set(RULES_KEY, json!([{"url": "a.com", "selector": ".a", "enabled": true}])).unwrap();

        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["darkMode"], json!(false));
        assert_eq!(on_disk["rules"][0]["url"], json!("a.com"));
    }

    #[test]
    fn test_repository_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut repo = RuleRepository::new(FileStore::new(&path));
        repo.add("example.com", ".ad-banner, .promo").unwrap();
        repo.add("news.example", "#paywall").unwrap();
        repo.remove(0).unwrap();

        let repo = RuleRepository::new(FileStore::new(&path));
        let rules = repo.load_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].url, "news.example");
    }

    #[test]
    fn test_unreadable_record_dropped_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(
            &path,
            r#"{"rules": [{"url": "a.com", "selector": ".a"}, {"selector": ".orphan"}], "darkMode": false}"#,
        )
        .unwrap();

        let mut repo = RuleRepository::new(FileStore::new(&path));
        assert_eq!(repo.load_rule_records().unwrap().skipped, 1);
        repo.set_enabled(0, false).unwrap();

        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["rules"], json!([{"url": "a.com", "selector": ".a", "enabled": false}]));
        assert_eq!(on_disk["darkMode"], json!(false));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2]").unwrap();
        let store = FileStore::new(&path);
        assert!(matches!(store.get(RULES_KEY), Err(StoreError::Malformed(_))));
    }
}
