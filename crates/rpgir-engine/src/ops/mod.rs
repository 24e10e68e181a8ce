//! Graph-editing operations, each phase-gated and run inside the mutation
//! framework.
//!
//! Every operation is a pure function of the working document and its
//! parameters: it either edits the working copy and reports a
//! [`MutationOutcome`](crate::txn::MutationOutcome), or returns a typed
//! [`OpError`](crate::error::OpError) that aborts the transaction.

pub mod edge;
pub mod node;
pub mod patch;
pub mod port;
pub mod refactor;
pub mod validate;

use rpgir_core::document::{Document, Phase};

use crate::error::OpError;

/// Raises `INVALID_PHASE` unless the document is in one of the allowed
/// phases.
pub fn ensure_phase(doc: &Document, allowed: &[Phase], tool: &str) -> Result<(), OpError> {
    if allowed.contains(&doc.phase) {
        return Ok(());
    }
    let legal: Vec<&str> = allowed.iter().map(|p| p.as_str()).collect();
    Err(OpError::invalid_phase(format!(
        "{} is not legal in phase '{}' (allowed: {})",
        tool,
        doc.phase.as_str(),
        legal.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::ErrorCode;

    #[test]
    fn phase_gate() {
        let mut doc = Document::new("demo", "demo");
        assert!(ensure_phase(&doc, &[Phase::Skeleton], "add_node").is_ok());
        doc.phase = Phase::Typing;
        let err = ensure_phase(&doc, &[Phase::Skeleton], "add_node").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPhase);
        assert!(err.message.contains("typing"));
    }
}
