//! Port operations: add, remove, retype, rename.

use serde_json::json;

use rpgir_core::document::{Document, Phase, PortDef};
use rpgir_core::ident::is_valid_port_name;
use rpgir_core::{CoreError, PortDirection};

use crate::error::OpError;
use crate::ops::ensure_phase;
use crate::tools::{AddPortParams, RemovePortParams, RenamePortParams, SetPortTypeParams};
use crate::txn::MutationOutcome;

fn require_node_mut<'a>(
    doc: &'a mut Document,
    id: &str,
) -> Result<&'a mut rpgir_core::document::NodeDef, OpError> {
    doc.node_mut(id)
        .ok_or_else(|| CoreError::NodeNotFound { id: id.to_string() }.into())
}

pub fn add_port(doc: &mut Document, params: AddPortParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton, Phase::Typing], "add_port")?;
    if !is_valid_port_name(&params.name) {
        return Err(OpError::schema_invalid(format!(
            "invalid port name '{}'",
            params.name
        )));
    }
    let direction = params.direction;
    let node = require_node_mut(doc, &params.node)?;
    if node.port(direction, &params.name).is_some() {
        return Err(CoreError::DuplicatePortName {
            node: params.node.clone(),
            direction: direction.as_str().to_string(),
            port: params.name.clone(),
        }
        .into());
    }
    node.ports_mut(direction).push(PortDef {
        name: params.name.clone(),
        required: params.required,
        ty: params.ty,
    });
    Ok(MutationOutcome::changed(json!({
        "node": params.node,
        "direction": direction.as_str(),
        "port": params.name,
    })))
}

/// Removes a port. Fails while any edge still references it.
pub fn remove_port(doc: &mut Document, params: RemovePortParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton, Phase::Typing], "remove_port")?;
    doc.require_port(&params.node, params.direction, &params.name)?;
    if doc.port_referenced(&params.node, params.direction, &params.name) {
        return Err(OpError::constraint_violation(format!(
            "{} port '{}' on node '{}' is still referenced by an edge",
            params.direction.as_str(),
            params.name,
            params.node
        )));
    }
    let node = require_node_mut(doc, &params.node)?;
    node.ports_mut(params.direction)
        .retain(|p| p.name != params.name);
    Ok(MutationOutcome::changed(json!({
        "node": params.node,
        "direction": params.direction.as_str(),
        "port": params.name,
    })))
}

/// Sets (or clears) the type of a port.
pub fn set_port_type(doc: &mut Document, params: SetPortTypeParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton, Phase::Typing], "set_port_type")?;
    doc.require_port(&params.node, params.direction, &params.name)?;
    let direction = params.direction;
    let node = require_node_mut(doc, &params.node)?;
    let port = node
        .ports_mut(direction)
        .iter_mut()
        .find(|p| p.name == params.name)
        .ok_or_else(|| CoreError::PortNotFound {
            node: params.node.clone(),
            direction: direction.as_str().to_string(),
            port: params.name.clone(),
        })?;

    let next = params.ty.map(|t| t.normalized());
    let result = json!({
        "node": params.node,
        "direction": direction.as_str(),
        "port": params.name,
    });
    if port.ty == next {
        Ok(MutationOutcome::unchanged(result))
    } else {
        port.ty = next;
        Ok(MutationOutcome::changed(result))
    }
}

/// Renames a port and cascades the rename to every edge referencing it.
pub fn rename_port(doc: &mut Document, params: RenamePortParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(
        doc,
        &[Phase::Skeleton, Phase::Typing, Phase::Ready],
        "rename_port",
    )?;
    if !is_valid_port_name(&params.to) {
        return Err(OpError::schema_invalid(format!(
            "invalid port name '{}'",
            params.to
        )));
    }
    doc.require_port(&params.node, params.direction, &params.from)?;
    if params.from == params.to {
        return Err(OpError::nothing_to_do(format!(
            "port '{}' is already named '{}'",
            params.from, params.to
        )));
    }
    let direction = params.direction;
    {
        let node = require_node_mut(doc, &params.node)?;
        if node.port(direction, &params.to).is_some() {
            return Err(OpError::schema_invalid(format!(
                "node '{}' already has {} port '{}'",
                params.node,
                direction.as_str(),
                params.to
            )));
        }
        for port in node.ports_mut(direction) {
            if port.name == params.from {
                port.name = params.to.clone();
            }
        }
    }
    for edge in &mut doc.edges {
        match direction {
            PortDirection::Output => {
                if edge.from == params.node && edge.from_port == params.from {
                    edge.from_port = params.to.clone();
                }
            }
            PortDirection::Input => {
                if edge.to == params.node && edge.to_port == params.from {
                    edge.to_port = params.to.clone();
                }
            }
        }
    }
    Ok(MutationOutcome::changed(json!({
        "node": params.node,
        "direction": direction.as_str(),
        "from": params.from,
        "to": params.to,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::document::{EdgeDef, NodeDef, NodeKind};
    use rpgir_core::types::{ScalarName, TypeExpr};
    use rpgir_core::ErrorCode;

    fn doc_with_nodes() -> Document {
        let mut doc = Document::new("demo", "demo");
        let mut producer = NodeDef::new("producer@1", NodeKind::Module, "produces");
        producer.outputs.push(PortDef::new("out"));
        let mut consumer = NodeDef::new("consumer@1", NodeKind::Module, "consumes");
        consumer.inputs.push(PortDef::new("in"));
        doc.nodes.push(producer);
        doc.nodes.push(consumer);
        doc
    }

    #[test]
    fn add_port_rejects_duplicates() {
        let mut doc = doc_with_nodes();
        let params = AddPortParams {
            node: "producer@1".into(),
            direction: PortDirection::Output,
            name: "out".into(),
            required: true,
            ty: None,
        };
        assert_eq!(
            add_port(&mut doc, params).unwrap_err().code,
            ErrorCode::SchemaInvalid
        );
    }

    #[test]
    fn remove_port_blocked_by_edges() {
        let mut doc = doc_with_nodes();
        doc.edges
            .push(EdgeDef::new("producer@1", "out", "consumer@1", "in"));
        let params = RemovePortParams {
            node: "producer@1".into(),
            direction: PortDirection::Output,
            name: "out".into(),
        };
        assert_eq!(
            remove_port(&mut doc, params).unwrap_err().code,
            ErrorCode::ConstraintViolation
        );
    }

    #[test]
    fn set_port_type_normalizes_and_detects_no_ops() {
        let mut doc = doc_with_nodes();
        doc.phase = Phase::Typing;
        let ty = TypeExpr::Scalar {
            name: ScalarName::String,
        };
        let params = SetPortTypeParams {
            node: "producer@1".into(),
            direction: PortDirection::Output,
            name: "out".into(),
            ty: Some(ty.clone()),
        };
        assert!(set_port_type(&mut doc, params.clone()).unwrap().changed);
        assert!(!set_port_type(&mut doc, params).unwrap().changed);
    }

    #[test]
    fn rename_port_cascades_to_edges() {
        let mut doc = doc_with_nodes();
        doc.edges
            .push(EdgeDef::new("producer@1", "out", "consumer@1", "in"));
        rename_port(
            &mut doc,
            RenamePortParams {
                node: "producer@1".into(),
                direction: PortDirection::Output,
                from: "out".into(),
                to: "payload".into(),
            },
        )
        .unwrap();
        assert_eq!(doc.edges[0].from_port, "payload");
        assert!(doc
            .node("producer@1")
            .unwrap()
            .port(PortDirection::Output, "payload")
            .is_some());
    }

    #[test]
    fn rename_port_rejects_collision() {
        let mut doc = doc_with_nodes();
        doc.node_mut("producer@1")
            .unwrap()
            .outputs
            .push(PortDef::new("payload"));
        let err = rename_port(
            &mut doc,
            RenamePortParams {
                node: "producer@1".into(),
                direction: PortDirection::Output,
                from: "out".into(),
                to: "payload".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaInvalid);
    }

    #[test]
    fn identity_rename_is_nothing_to_do() {
        let mut doc = doc_with_nodes();
        let err = rename_port(
            &mut doc,
            RenamePortParams {
                node: "producer@1".into(),
                direction: PortDirection::Output,
                from: "out".into(),
                to: "out".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NothingToDo);
    }

    #[test]
    fn missing_port_surfaces_missing_port() {
        let mut doc = doc_with_nodes();
        let err = remove_port(
            &mut doc,
            RemovePortParams {
                node: "producer@1".into(),
                direction: PortDirection::Input,
                name: "nope".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingPort);
    }
}
