//! Shape validation: the cheap, schema-only pass run after every mutation
//! before anything is persisted.
//!
//! Checks identifier grammar, non-empty summaries, duplicate node ids, and
//! duplicate port names per direction within a node. Full validation layers
//! the expensive graph analyses on top of this.

use std::collections::HashSet;

use rpgir_core::document::{Document, NodeDef, PortDirection};
use rpgir_core::ident::{is_valid_node_id, is_valid_port_name};
use rpgir_core::types::TypeExpr;
use rpgir_core::ErrorCode;

use crate::diagnostics::ValidationError;

/// Runs the shape check and returns every finding.
pub fn validate_shape(doc: &Document) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for node in &doc.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            errors.push(
                ValidationError::new(
                    ErrorCode::DupNodeId,
                    format!("duplicate node id '{}'", node.id),
                )
                .with_node(&node.id),
            );
        }
        if !is_valid_node_id(&node.id) {
            errors.push(
                ValidationError::new(
                    ErrorCode::SchemaInvalid,
                    format!("node id '{}' does not match the id grammar", node.id),
                )
                .with_node(&node.id),
            );
        }
        if node.summary.trim().is_empty() {
            errors.push(
                ValidationError::new(
                    ErrorCode::SchemaInvalid,
                    format!("node '{}' has an empty summary", node.id),
                )
                .with_node(&node.id),
            );
        }
        check_ports(node, PortDirection::Input, &mut errors);
        check_ports(node, PortDirection::Output, &mut errors);
    }

    errors
}

fn check_ports(node: &NodeDef, direction: PortDirection, errors: &mut Vec<ValidationError>) {
    let mut seen: HashSet<&str> = HashSet::new();
    for port in node.ports(direction) {
        if !is_valid_port_name(&port.name) {
            errors.push(
                ValidationError::new(
                    ErrorCode::SchemaInvalid,
                    format!(
                        "port name '{}' on node '{}' does not match the port grammar",
                        port.name, node.id
                    ),
                )
                .with_node(&node.id)
                .with_port(&port.name),
            );
        }
        if !seen.insert(port.name.as_str()) {
            errors.push(
                ValidationError::new(
                    ErrorCode::SchemaInvalid,
                    format!(
                        "duplicate {} port '{}' on node '{}'",
                        direction.as_str(),
                        port.name,
                        node.id
                    ),
                )
                .with_node(&node.id)
                .with_port(&port.name),
            );
        }
        if let Some(TypeExpr::Literal { value_type, value }) = &port.ty {
            if !TypeExpr::literal_value_matches(*value_type, value) {
                errors.push(
                    ValidationError::new(
                        ErrorCode::SchemaInvalid,
                        format!(
                            "literal type on port '{}' of node '{}' has a value outside its value type",
                            port.name, node.id
                        ),
                    )
                    .with_node(&node.id)
                    .with_port(&port.name),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::document::{NodeKind, PortDef};
    use rpgir_core::types::ScalarName;
    use serde_json::json;

    fn doc_with(nodes: Vec<NodeDef>) -> Document {
        let mut doc = Document::new("demo", "demo project");
        doc.nodes = nodes;
        doc
    }

    #[test]
    fn clean_document_has_no_findings() {
        let mut node = NodeDef::new("worker@1", NodeKind::Atom, "does work");
        node.inputs.push(PortDef::new("task"));
        node.outputs.push(PortDef::new("result"));
        assert!(validate_shape(&doc_with(vec![node])).is_empty());
    }

    #[test]
    fn duplicate_node_ids_are_reported() {
        let a = NodeDef::new("worker@1", NodeKind::Atom, "one");
        let b = NodeDef::new("worker@1", NodeKind::Atom, "two");
        let errors = validate_shape(&doc_with(vec![a, b]));
        assert!(errors.iter().any(|e| e.code == ErrorCode::DupNodeId));
    }

    #[test]
    fn bad_id_empty_summary_and_dup_ports() {
        let mut node = NodeDef::new("Bad Id", NodeKind::Atom, "  ");
        node.inputs.push(PortDef::new("x"));
        node.inputs.push(PortDef::new("x"));
        let errors = validate_shape(&doc_with(vec![node]));
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.code == ErrorCode::SchemaInvalid)
                .count(),
            3
        );
    }

    #[test]
    fn same_port_name_on_both_directions_is_fine() {
        let mut node = NodeDef::new("echo@1", NodeKind::Atom, "echoes");
        node.inputs.push(PortDef::new("payload"));
        node.outputs.push(PortDef::new("payload"));
        assert!(validate_shape(&doc_with(vec![node])).is_empty());
    }

    #[test]
    fn literal_value_type_mismatch_is_schema_invalid() {
        let mut node = NodeDef::new("lit@1", NodeKind::Atom, "literal");
        node.outputs.push(PortDef::typed(
            "flag",
            TypeExpr::Literal {
                value_type: ScalarName::Bool,
                value: json!("yes"),
            },
        ));
        let errors = validate_shape(&doc_with(vec![node]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::SchemaInvalid);
    }
}
