//! Port saturation: every required input needs exactly one producer.
//!
//! Ordering-only edges carry no data and do not count as producers. An input
//! with more than one producer is an error whether or not it is required.

use rpgir_core::document::Document;
use rpgir_core::ErrorCode;

use crate::diagnostics::ValidationError;

pub fn check_saturation(doc: &Document) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for node in &doc.nodes {
        for port in &node.inputs {
            let producers = doc.producers_of(&node.id, &port.name);
            if producers.is_empty() && port.required {
                errors.push(
                    ValidationError::new(
                        ErrorCode::UnconnectedRequiredInput,
                        format!(
                            "required input '{}' on node '{}' has no producer",
                            port.name, node.id
                        ),
                    )
                    .with_node(&node.id)
                    .with_port(&port.name),
                );
            } else if producers.len() > 1 {
                errors.push(
                    ValidationError::new(
                        ErrorCode::ConstraintViolation,
                        format!(
                            "input '{}' on node '{}' has {} producers, expected at most one",
                            port.name,
                            node.id,
                            producers.len()
                        ),
                    )
                    .with_node(&node.id)
                    .with_port(&port.name),
                );
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::document::{EdgeDef, NodeDef, NodeKind, PortDef};

    fn pipeline() -> Document {
        let mut doc = Document::new("demo", "demo");
        let mut src = NodeDef::new("src@1", NodeKind::Module, "source");
        src.outputs.push(PortDef::new("out"));
        let mut dst = NodeDef::new("dst@1", NodeKind::Module, "sink");
        dst.inputs.push(PortDef::new("in"));
        doc.nodes.push(src);
        doc.nodes.push(dst);
        doc
    }

    #[test]
    fn unconnected_required_input() {
        let errors = check_saturation(&pipeline());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::UnconnectedRequiredInput);
    }

    #[test]
    fn optional_input_may_stay_unconnected() {
        let mut doc = pipeline();
        doc.node_mut("dst@1").unwrap().inputs[0].required = false;
        assert!(check_saturation(&doc).is_empty());
    }

    #[test]
    fn two_producers_is_an_error_even_for_optional_inputs() {
        let mut doc = pipeline();
        doc.node_mut("dst@1").unwrap().inputs[0].required = false;
        let mut other = NodeDef::new("other@1", NodeKind::Module, "second source");
        other.outputs.push(PortDef::new("out"));
        doc.nodes.push(other);
        doc.edges.push(EdgeDef::new("src@1", "out", "dst@1", "in"));
        doc.edges.push(EdgeDef::new("other@1", "out", "dst@1", "in"));
        let errors = check_saturation(&doc);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::ConstraintViolation);
    }

    #[test]
    fn ordering_edges_do_not_satisfy_inputs() {
        let mut doc = pipeline();
        let mut edge = EdgeDef::new("src@1", "out", "dst@1", "in");
        edge.order_before = true;
        doc.edges.push(edge);
        let errors = check_saturation(&doc);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::UnconnectedRequiredInput);
    }

    #[test]
    fn exactly_one_producer_is_clean() {
        let mut doc = pipeline();
        doc.edges.push(EdgeDef::new("src@1", "out", "dst@1", "in"));
        assert!(check_saturation(&doc).is_empty());
    }
}
