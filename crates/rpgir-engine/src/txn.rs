//! The mutation framework: the optimistic-concurrency transaction wrapper
//! every graph edit runs through.
//!
//! Request flow: replay a cached response when the `requestId` was seen
//! before; otherwise load the current document, clone it, run the mutator on
//! the clone, shape-check, canonicalize, bump `rev` by exactly one, rehash,
//! and persist with a compare-and-swap on the base revision. Domain errors
//! and shape failures abort before persistence and leave the document
//! untouched. Successful responses and CAS rejections are cached under the
//! request id so a retried tool call replays instead of re-executing.
//!
//! This module is the only caller of the canonicalizer and the only writer
//! to the store.

use serde_json::Value;
use tracing::{debug, info, warn};

use rpgir_core::{canonicalize, Document, ErrorCode};
use rpgir_store::{content_hash, DocumentStore, SaveOptions, StoreError};

use crate::error::OpError;
use crate::tools::ToolResponse;

/// What a mutator tells the framework about its work.
#[derive(Debug)]
pub struct MutationOutcome {
    /// `false` means the document was not touched: no rev bump, no persist.
    pub changed: bool,
    /// Tool-specific result payload.
    pub result: Value,
}

impl MutationOutcome {
    pub fn changed(result: Value) -> Self {
        MutationOutcome {
            changed: true,
            result,
        }
    }

    pub fn unchanged(result: Value) -> Self {
        MutationOutcome {
            changed: false,
            result,
        }
    }
}

/// Runs one mutation transaction.
///
/// The mutator receives the working copy to edit and a reference to the
/// untouched current document for lookups that must not observe partial
/// edits.
pub fn run_mutation<S, F>(
    store: &mut S,
    tool: &str,
    request_id: Option<&str>,
    mutator: F,
) -> ToolResponse
where
    S: DocumentStore,
    F: FnOnce(&mut Document, &Document) -> Result<MutationOutcome, OpError>,
{
    if let Some(id) = request_id {
        if let Some(cached) = store.get_response(id) {
            if let Ok(response) = serde_json::from_value::<ToolResponse>(cached) {
                debug!(tool, request_id = id, "replaying cached response");
                return response;
            }
        }
    }

    let current = match store.load() {
        Ok(doc) => doc,
        Err(err) => {
            warn!(tool, error = %err, "failed to load document");
            return ToolResponse::failure(vec![err.into()], "");
        }
    };
    let base_rev = current.rev;
    let mut working = current.clone();

    let outcome = match mutator(&mut working, &current) {
        Ok(outcome) => outcome,
        Err(err) => {
            debug!(tool, base_rev, code = %err.code, "mutation rejected");
            return ToolResponse::failure(vec![err], current.hash.clone());
        }
    };

    if !outcome.changed {
        let response = ToolResponse::success(outcome.result, current.hash.clone());
        cache(store, request_id, &response);
        return response;
    }

    let shape_errors = rpgir_check::validate_shape(&working);
    if !shape_errors.is_empty() {
        debug!(tool, base_rev, count = shape_errors.len(), "draft failed shape check");
        let errors = shape_errors
            .into_iter()
            .map(|e| OpError::new(e.code, e.message))
            .collect();
        return ToolResponse::failure(errors, current.hash.clone());
    }

    let mut committed = canonicalize(&working);
    committed.rev = base_rev + 1;
    committed.hash = content_hash(&committed);

    match store.save(
        &committed,
        SaveOptions {
            expected_rev: base_rev,
            allow_create: false,
        },
    ) {
        Ok(()) => {
            info!(tool, rev = committed.rev, hash = %committed.hash, "mutation committed");
            let response = ToolResponse::success(outcome.result, committed.hash.clone());
            cache(store, request_id, &response);
            response
        }
        Err(err @ StoreError::RevisionConflict { .. }) => {
            warn!(tool, base_rev, "compare-and-swap lost the race");
            let response = ToolResponse::failure(
                vec![OpError::new(ErrorCode::StaleRev, err.to_string())],
                current.hash.clone(),
            );
            cache(store, request_id, &response);
            response
        }
        Err(err) => {
            warn!(tool, error = %err, "persist failed");
            ToolResponse::failure(vec![err.into()], current.hash.clone())
        }
    }
}

/// Runs a read-only tool against the current document.
pub fn run_query<S, F>(store: &S, tool: &str, reader: F) -> ToolResponse
where
    S: DocumentStore,
    F: FnOnce(&Document) -> Result<Value, OpError>,
{
    let current = match store.load() {
        Ok(doc) => doc,
        Err(err) => {
            warn!(tool, error = %err, "failed to load document");
            return ToolResponse::failure(vec![err.into()], "");
        }
    };
    match reader(&current) {
        Ok(result) => ToolResponse::success(result, current.hash.clone()),
        Err(err) => ToolResponse::failure(vec![err], current.hash.clone()),
    }
}

fn cache<S: DocumentStore>(store: &mut S, request_id: Option<&str>, response: &ToolResponse) {
    if let Some(id) = request_id {
        if let Ok(value) = serde_json::to_value(response) {
            store.set_response(id, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::document::{NodeDef, NodeKind};
    use rpgir_store::MemoryStore;
    use serde_json::json;

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut doc = canonicalize(&Document::new("demo", "demo project"));
        doc.rev = 1;
        doc.hash = content_hash(&doc);
        store
            .save(
                &doc,
                SaveOptions {
                    expected_rev: 0,
                    allow_create: true,
                },
            )
            .unwrap();
        store
    }

    fn add_marker_node(doc: &mut Document) {
        doc.nodes
            .push(NodeDef::new("marker@1", NodeKind::Atom, "marker node"));
    }

    #[test]
    fn successful_mutation_bumps_rev_and_rehashes() {
        let mut store = seeded_store();
        let before = store.load().unwrap();
        let response = run_mutation(&mut store, "test", None, |working, _| {
            add_marker_node(working);
            Ok(MutationOutcome::changed(json!({"node": "marker@1"})))
        });
        assert!(response.ok);
        let after = store.load().unwrap();
        assert_eq!(after.rev, before.rev + 1);
        assert_ne!(after.hash, before.hash);
        assert_eq!(response.ir_hash, after.hash);
    }

    #[test]
    fn domain_error_leaves_document_untouched() {
        let mut store = seeded_store();
        let before = store.load().unwrap();
        let response = run_mutation(&mut store, "test", None, |working, _| {
            add_marker_node(working);
            Err(OpError::nothing_to_do("nope"))
        });
        assert!(!response.ok);
        assert_eq!(response.ir_hash, before.hash);
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn shape_failure_aborts_without_persisting() {
        let mut store = seeded_store();
        let before = store.load().unwrap();
        let response = run_mutation(&mut store, "test", None, |working, _| {
            working
                .nodes
                .push(NodeDef::new("Bad Id!", NodeKind::Atom, ""));
            Ok(MutationOutcome::changed(json!({})))
        });
        assert!(!response.ok);
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn no_op_mutator_keeps_the_revision() {
        let mut store = seeded_store();
        let before = store.load().unwrap();
        let response = run_mutation(&mut store, "test", None, |_, _| {
            Ok(MutationOutcome::unchanged(json!({"noop": true})))
        });
        assert!(response.ok);
        assert_eq!(store.load().unwrap().rev, before.rev);
    }

    #[test]
    fn replay_returns_the_identical_response_without_reexecuting() {
        let mut store = seeded_store();
        let first = run_mutation(&mut store, "test", Some("req-1"), |working, _| {
            add_marker_node(working);
            Ok(MutationOutcome::changed(json!({"node": "marker@1"})))
        });
        let rev_after_first = store.load().unwrap().rev;

        let second = run_mutation(&mut store, "test", Some("req-1"), |working, _| {
            working
                .nodes
                .push(NodeDef::new("other@1", NodeKind::Atom, "should not run"));
            Ok(MutationOutcome::changed(json!({"node": "other@1"})))
        });
        assert_eq!(first, second);
        assert_eq!(store.load().unwrap().rev, rev_after_first);
        assert!(store.load().unwrap().node("other@1").is_none());
    }

    #[test]
    fn domain_errors_are_not_cached() {
        let mut store = seeded_store();
        let first = run_mutation(&mut store, "test", Some("req-2"), |_, _| {
            Err(OpError::nothing_to_do("first attempt"))
        });
        assert!(!first.ok);
        // A retry with the same id re-executes and can now succeed.
        let second = run_mutation(&mut store, "test", Some("req-2"), |working, _| {
            add_marker_node(working);
            Ok(MutationOutcome::changed(json!({"node": "marker@1"})))
        });
        assert!(second.ok);
    }
}
