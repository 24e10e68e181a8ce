//! The plan-graph engine: phase-gated editing operations, the
//! optimistic-concurrency mutation framework, the file-layout planner, the
//! batch scheduler, exports, and the tool surface that ties them together.
//!
//! The flow for a mutating tool call is always the same: replay a cached
//! response if the request id was seen before, otherwise load the document,
//! run the operation on a working copy, shape-check, canonicalize, bump the
//! revision, rehash, and persist with a compare-and-swap. Read-only tools
//! observe the stored document and never bump the revision.

pub mod error;
pub mod export;
pub mod layout;
pub mod ops;
pub mod schedule;
pub mod service;
pub mod tools;
pub mod txn;

pub use error::OpError;
pub use schedule::{emit_impl_batches, ImplTask, TaskHints};
pub use service::PlanSession;
pub use tools::ToolResponse;
pub use txn::{run_mutation, run_query, MutationOutcome};
