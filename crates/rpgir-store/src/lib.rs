//! Persistence boundary for plan documents.
//!
//! Provides the [`DocumentStore`] trait defining the storage contract the
//! mutation framework runs against, plus two backends:
//!
//! - [`MemoryStore`]: everything in process memory (tests, embedding).
//! - [`JsonFileStore`]: the reference single-JSON-document-per-project-directory
//!   layout.
//!
//! Saves follow a compare-and-swap contract keyed on the stored revision, and
//! every backend carries a request-id keyed idempotency cache so retried tool
//! calls replay their original response instead of re-executing.
//!
//! [`content_hash`] lives here too: the 16-hex-char SHA-256 identity of a
//! document's canonical form.

pub mod error;
pub mod hash;
pub mod json_file;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use hash::content_hash;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{DocumentStore, SaveOptions};
