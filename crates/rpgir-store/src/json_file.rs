//! Reference file backend: one JSON document per project directory.
//!
//! The document lives at `<dir>/rpg.json`. Writes go through a temp file in
//! the same directory followed by a rename, so a crashed write never leaves a
//! half-written document behind. The CAS check reads the currently stored
//! revision immediately before the rename; this store is not safe against
//! concurrent writers in separate processes, which matches the single-writer
//! session model.
//!
//! The idempotency cache is in-memory only: replay protection covers the
//! lifetime of the serving process, which is the window in which the calling
//! agent retries a timed-out tool call.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use rpgir_core::Document;

use crate::error::StoreError;
use crate::traits::{DocumentStore, SaveOptions};

const DOCUMENT_FILE: &str = "rpg.json";
const TEMP_FILE: &str = "rpg.json.tmp";

/// A [`DocumentStore`] backed by a single JSON file in a project directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    responses: HashMap<String, Value>,
}

impl JsonFileStore {
    /// Opens a store rooted at the given project directory, creating the
    /// directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(JsonFileStore {
            dir,
            responses: HashMap::new(),
        })
    }

    /// Path of the stored document.
    pub fn document_path(&self) -> PathBuf {
        self.dir.join(DOCUMENT_FILE)
    }

    fn stored_rev(&self) -> Result<Option<u64>, StoreError> {
        match fs::read_to_string(self.document_path()) {
            Ok(contents) => {
                let doc: Document = serde_json::from_str(&contents)?;
                Ok(Some(doc.rev))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self) -> Result<Document, StoreError> {
        match fs::read_to_string(self.document_path()) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, doc: &Document, options: SaveOptions) -> Result<(), StoreError> {
        match self.stored_rev()? {
            None if options.allow_create => {}
            None => return Err(StoreError::NotFound),
            Some(actual) => {
                if actual != options.expected_rev {
                    return Err(StoreError::RevisionConflict {
                        expected: options.expected_rev,
                        actual,
                    });
                }
            }
        }
        let tmp = self.dir.join(TEMP_FILE);
        let contents = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, self.document_path())?;
        Ok(())
    }

    fn has_response(&self, request_id: &str) -> bool {
        self.responses.contains_key(request_id)
    }

    fn get_response(&self, request_id: &str) -> Option<Value> {
        self.responses.get(request_id).cloned()
    }

    fn set_response(&mut self, request_id: &str, response: Value) {
        self.responses.insert(request_id.to_string(), response);
    }
}
