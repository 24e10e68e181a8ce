//! In-memory store backend, used by the engine tests and as the simplest
//! reference implementation of the CAS contract.

use std::collections::HashMap;

use serde_json::Value;

use rpgir_core::Document;

use crate::error::StoreError;
use crate::traits::{DocumentStore, SaveOptions};

/// A [`DocumentStore`] holding everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Option<Document>,
    responses: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> Result<Document, StoreError> {
        self.doc.clone().ok_or(StoreError::NotFound)
    }

    fn save(&mut self, doc: &Document, options: SaveOptions) -> Result<(), StoreError> {
        match &self.doc {
            None if options.allow_create => {}
            None => return Err(StoreError::NotFound),
            Some(current) => {
                if current.rev != options.expected_rev {
                    return Err(StoreError::RevisionConflict {
                        expected: options.expected_rev,
                        actual: current.rev,
                    });
                }
            }
        }
        self.doc = Some(doc.clone());
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
