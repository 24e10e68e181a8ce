//! Validation-driven lifecycle operations.
//!
//! `validate_graph` is the only operation that advances the phase: on a clean
//! full validation, `skeleton -> typing` or `typing -> ready`. The validation
//! outcome (`lastValidatedAt`, `lastValidationErrors`) is persisted whether or
//! not errors were found; the errors themselves are informational, not fatal.

use chrono::Utc;
use serde_json::json;

use rpgir_core::document::Document;
use rpgir_core::canonicalize;

use crate::error::OpError;
use crate::txn::MutationOutcome;

/// Runs full validation, records the outcome on the document, and advances
/// the phase when the graph is clean. Legal in any phase.
pub fn validate_graph(doc: &mut Document) -> Result<MutationOutcome, OpError> {
    let report = rpgir_check::validate_full(doc);

    doc.last_validated_at = Some(Utc::now().to_rfc3339());
    doc.last_validation_errors = report.errors.len() as u32;

    let mut advanced = false;
    if report.is_clean() {
        if let Some(next) = doc.phase.next() {
            doc.phase = next;
            advanced = true;
        }
    }

    let result = json!({
        "errors": report.errors,
        "summary": report.summary,
        "phase": doc.phase,
        "advanced": advanced,
    });
    // The validation metadata itself changed, so this always persists.
    Ok(MutationOutcome::changed(result))
}

/// Rewrites the document into canonical form. No-op (and no rev bump) when
/// it is already canonical. Legal in any phase.
pub fn canonicalize_ir(doc: &mut Document) -> Result<MutationOutcome, OpError> {
    let mut canon = canonicalize(doc);
    canon.hash = doc.hash.clone();
    if canon == *doc {
        return Ok(MutationOutcome::unchanged(json!({"canonical": true})));
    }
    *doc = canon;
    Ok(MutationOutcome::changed(json!({"canonical": false})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::document::{EdgeDef, NodeDef, NodeKind, Phase, PortDef};

    fn clean_pair() -> Document {
        let mut doc = Document::new("demo", "demo");
        let mut producer = NodeDef::new("producer@1", NodeKind::Module, "produces");
        producer.outputs.push(PortDef::new("payload"));
        let mut consumer = NodeDef::new("consumer@1", NodeKind::Module, "consumes");
        consumer.inputs.push(PortDef::new("payload"));
        doc.nodes.push(producer);
        doc.nodes.push(consumer);
        doc.edges
            .push(EdgeDef::new("producer@1", "payload", "consumer@1", "payload"));
        doc
    }

    #[test]
    fn clean_validation_advances_the_phase() {
        let mut doc = clean_pair();
        let outcome = validate_graph(&mut doc).unwrap();
        assert!(outcome.changed);
        assert_eq!(doc.phase, Phase::Typing);
        assert_eq!(outcome.result["advanced"], true);
        assert_eq!(doc.last_validation_errors, 0);
        assert!(doc.last_validated_at.is_some());
    }

    #[test]
    fn failed_validation_records_but_never_advances() {
        let mut doc = clean_pair();
        doc.edges.clear();
        let outcome = validate_graph(&mut doc).unwrap();
        assert!(outcome.changed);
        assert_eq!(doc.phase, Phase::Skeleton);
        assert_eq!(outcome.result["advanced"], false);
        assert_eq!(doc.last_validation_errors, 1);
    }

    #[test]
    fn phase_never_regresses_past_ready() {
        let mut doc = clean_pair();
        doc.phase = Phase::Ready;
        validate_graph(&mut doc).unwrap();
        assert_eq!(doc.phase, Phase::Ready);
    }

    #[test]
    fn canonicalize_is_a_no_op_on_canonical_documents() {
        let mut doc = canonicalize(&clean_pair());
        let outcome = canonicalize_ir(&mut doc).unwrap();
        assert!(!outcome.changed);

        // clean_pair lists producer before consumer, which is not sorted order.
        let mut scrambled = clean_pair();
        let outcome = canonicalize_ir(&mut scrambled).unwrap();
        assert!(outcome.changed);
        assert_eq!(scrambled.nodes[0].id, "consumer@1");
    }
}
