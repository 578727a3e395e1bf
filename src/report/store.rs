use crate::error::{AnalyzerError, Result};
use crate::report::record::{AnalyzerResult, ResultRecord};
use fs2::FileExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

/// Sink for analyzer results, shared by every analyzer of a job.
///
/// `update_data` is a per-key upsert: it replaces the entries named in the
/// record and leaves every other analyzer's entry untouched.
pub trait ResultStore: Send + Sync {
    fn update_data(&self, working_dir: &Path, record: &ResultRecord) -> Result<()>;

    fn load(&self, working_dir: &Path) -> Result<Map<String, Value>>;

    fn get(&self, working_dir: &Path, analyzer: &str) -> Result<Option<AnalyzerResult>> {
        match self.load(working_dir)?.remove(analyzer) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

/// Stores each job's results as a JSON document inside its working directory.
///
/// Updates hold an exclusive advisory lock on `.<file_name>.lock` in the
/// same directory, so writers in other store instances or other processes
/// cannot interleave their read-modify-write. Readers need no lock since the
/// document is replaced atomically.
pub struct JsonFileStore {
    file_name: String,
}

impl JsonFileStore {
    pub fn new<S: Into<String>>(file_name: S) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn results_path(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(&self.file_name)
    }

    fn lock_path(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(format!(".{}.lock", self.file_name))
    }

    /// Blocks until this process holds the job's write lock. Released when
    /// the returned file is closed.
    fn lock(&self, working_dir: &Path) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path(working_dir))?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read_document(&self, path: &Path) -> Result<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            other => Err(AnalyzerError::Store {
                message: format!(
                    "{} must hold a JSON object, found {}",
                    path.display(),
                    json_kind(&other)
                ),
            }),
        }
    }

    fn write_document(&self, working_dir: &Path, document: &Map<String, Value>) -> Result<()> {
        let mut temp = NamedTempFile::new_in(working_dir)?;
        serde_json::to_writer_pretty(&mut temp, document)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(self.results_path(working_dir))
            .map_err(|e| AnalyzerError::Io(e.error))?;
        Ok(())
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new("results.json")
    }
}

impl ResultStore for JsonFileStore {
    fn update_data(&self, working_dir: &Path, record: &ResultRecord) -> Result<()> {
        let _lock = self.lock(working_dir)?;

        let path = self.results_path(working_dir);
        let mut document = self.read_document(&path)?;
        document.extend(record.to_json()?);
        self.write_document(working_dir, &document)
    }

    fn load(&self, working_dir: &Path) -> Result<Map<String, Value>> {
        self.read_document(&self.results_path(working_dir))
    }
}

/// In-process store keyed by working directory.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<PathBuf, Map<String, Value>>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `update_data` calls received so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn documents(&self) -> MutexGuard<'_, HashMap<PathBuf, Map<String, Value>>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultStore for MemoryStore {
    fn update_data(&self, working_dir: &Path, record: &ResultRecord) -> Result<()> {
        let entry = record.to_json()?;
        self.documents()
            .entry(working_dir.to_path_buf())
            .or_default()
            .extend(entry);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self, working_dir: &Path) -> Result<Map<String, Value>> {
        Ok(self.documents().get(working_dir).cloned().unwrap_or_default())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::record::ANALYZER_NAME;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn ok_record(line: &str) -> ResultRecord {
        ResultRecord::new(
            ANALYZER_NAME,
            AnalyzerResult::success(vec![line.to_string()], None),
        )
    }

    #[test]
    fn test_json_store_creates_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::default();

        store.update_data(temp_dir.path(), &ok_record("first")).unwrap();

        let content = fs::read_to_string(temp_dir.path().join("results.json")).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(
            value,
            json!({"binwalk": {"status": "ok", "output": ["first"]}})
        );
    }

    #[test]
    fn test_json_store_preserves_other_analyzers() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("results.json"),
            r#"{"exiftool": {"status": "ok", "output": ["Make: Canon"]}}"#,
        )
        .unwrap();

        let store = JsonFileStore::default();
        store.update_data(temp_dir.path(), &ok_record("first")).unwrap();
        store.update_data(temp_dir.path(), &ok_record("second")).unwrap();

        let document = store.load(temp_dir.path()).unwrap();
        assert_eq!(document.len(), 2);
        assert!(document.contains_key("exiftool"));

        let binwalk = store.get(temp_dir.path(), ANALYZER_NAME).unwrap().unwrap();
        assert_eq!(
            binwalk,
            AnalyzerResult::success(vec!["second".to_string()], None)
        );
    }

    #[test]
    fn test_json_store_rejects_non_object_document() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("results.json"), "[1, 2, 3]").unwrap();

        let store = JsonFileStore::default();
        let result = store.update_data(temp_dir.path(), &ok_record("x"));
        assert!(matches!(result, Err(AnalyzerError::Store { .. })));
    }

    #[test]
    fn test_json_store_missing_document_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new("custom.json");
        assert!(store.load(temp_dir.path()).unwrap().is_empty());
        assert!(store.get(temp_dir.path(), ANALYZER_NAME).unwrap().is_none());
    }

    #[test]
    fn test_json_store_concurrent_writers_keep_all_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::default());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let dir = temp_dir.path().to_path_buf();
                std::thread::spawn(move || {
                    let record = ResultRecord::new(
                        format!("analyzer{}", i),
                        AnalyzerResult::success(Vec::new(), None),
                    );
                    store.update_data(&dir, &record).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.load(temp_dir.path()).unwrap().len(), 8);
    }

    #[test]
    fn test_separate_json_stores_do_not_lose_updates() {
        let temp_dir = TempDir::new().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let dir = temp_dir.path().to_path_buf();
                std::thread::spawn(move || {
                    let store = JsonFileStore::default();
                    for round in 0..5 {
                        let record = ResultRecord::new(
                            format!("analyzer{}", i),
                            AnalyzerResult::success(vec![round.to_string()], None),
                        );
                        store.update_data(&dir, &record).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let document = JsonFileStore::default().load(temp_dir.path()).unwrap();
        assert_eq!(document.len(), 8);
        assert_eq!(document["analyzer3"]["output"][0], "4");
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = MemoryStore::new();
        let dir = Path::new("/jobs/abc");

        store.update_data(dir, &ok_record("one")).unwrap();
        assert_eq!(store.write_count(), 1);
        assert!(store.get(dir, ANALYZER_NAME).unwrap().unwrap().is_ok());
        assert!(store.load(Path::new("/jobs/other")).unwrap().is_empty());
    }
}
