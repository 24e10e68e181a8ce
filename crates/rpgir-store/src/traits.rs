//! The [`DocumentStore`] trait defining the persistence contract.
//!
//! The mutation framework consumes the store exclusively through this trait,
//! so backends are swappable without touching engine logic. The trait is
//! synchronous: a document is a single small aggregate and every mutation is
//! a whole-document write.

use serde_json::Value;

use rpgir_core::Document;

use crate::error::StoreError;

/// Options for a compare-and-swap save.
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// The revision the caller believes is currently stored. The write must
    /// be rejected with [`StoreError::RevisionConflict`] if it differs.
    pub expected_rev: u64,
    /// Allow the write when no document exists yet (session creation).
    pub allow_create: bool,
}

/// The persistence contract for plan documents.
pub trait DocumentStore {
    /// Loads the current document. Fails with [`StoreError::NotFound`] when
    /// none has been created.
    fn load(&self) -> Result<Document, StoreError>;

    /// Persists a document under the compare-and-swap contract.
    fn save(&mut self, doc: &Document, options: SaveOptions) -> Result<(), StoreError>;

    /// Whether a response was already cached for this request id.
    fn has_response(&self, request_id: &str) -> bool;

    /// The cached response for a request id, if any.
    fn get_response(&self, request_id: &str) -> Option<Value>;

    /// Caches a response under a request id for idempotent replay.
    fn set_response(&mut self, request_id: &str, response: Value);
}
