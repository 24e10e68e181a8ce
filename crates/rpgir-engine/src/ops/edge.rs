//! Edge operations: connect, disconnect, adapter insertion.

use serde_json::json;

use rpgir_check::{find_cycle, is_assignable, try_plan_coercion};
use rpgir_core::document::{Document, EdgeDef, NodeDef, NodeKind, Phase};
use rpgir_core::ident::{mint_node_id, sanitize_port_name};
use rpgir_core::types::TypeExpr;
use rpgir_core::{ErrorCode, PortDirection};

use crate::error::OpError;
use crate::ops::ensure_phase;
use crate::tools::{AddEdgeParams, InsertAdapterParams, RemoveEdgeParams};
use crate::txn::MutationOutcome;

const ALL_PHASES: [Phase; 3] = [Phase::Skeleton, Phase::Typing, Phase::Ready];

fn port_type<'a>(
    doc: &'a Document,
    node: &str,
    direction: PortDirection,
    port: &str,
) -> Option<&'a TypeExpr> {
    doc.node(node)
        .and_then(|n| n.port(direction, port))
        .and_then(|p| p.ty.as_ref())
}

/// Connects two ports.
///
/// Endpoints must exist; exact duplicates are rejected. For data edges whose
/// endpoints are both typed, direct assignability is tried first, then the
/// coercion planner; a planned non-`id` coercion is attached to the edge.
/// The insert is rejected with `CYCLE` when it would close a data cycle.
pub fn add_edge(doc: &mut Document, params: AddEdgeParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &ALL_PHASES, "add_edge")?;
    doc.require_port(&params.from, PortDirection::Output, &params.from_port)?;
    doc.require_port(&params.to, PortDirection::Input, &params.to_port)?;
    if doc.has_edge(&params.from, &params.from_port, &params.to, &params.to_port) {
        return Err(OpError::constraint_violation(format!(
            "edge '{}.{}->{}.{}' already exists",
            params.from, params.from_port, params.to, params.to_port
        )));
    }

    let mut edge = EdgeDef::new(&params.from, &params.from_port, &params.to, &params.to_port);
    edge.order_before = params.order_before;

    if !params.order_before {
        let source_ty = port_type(doc, &params.from, PortDirection::Output, &params.from_port);
        let target_ty = port_type(doc, &params.to, PortDirection::Input, &params.to_port);
        if let (Some(source_ty), Some(target_ty)) = (source_ty, target_ty) {
            if !is_assignable(source_ty, target_ty) {
                match try_plan_coercion(Some(source_ty), Some(target_ty)) {
                    Some(plan) if !plan.is_id() => edge.coercion = Some(plan),
                    // An `id` plan despite failed assignability is an anomaly;
                    // treat it like no plan at all.
                    _ => {
                        return Err(OpError::new(
                            ErrorCode::TypeMismatch,
                            format!(
                                "source type of '{}.{}' is not assignable to '{}.{}' and no coercion exists",
                                params.from, params.from_port, params.to, params.to_port
                            ),
                        ));
                    }
                }
            }
        }
    }

    let key = edge.key();
    let coercion_label = edge.coercion.as_ref().map(|c| c.label());
    doc.edges.push(edge);

    if let Some(path) = find_cycle(doc) {
        return Err(OpError::new(
            ErrorCode::Cycle,
            format!("edge '{key}' would close a data cycle: {}", path.join(" -> ")),
        ));
    }

    Ok(MutationOutcome::changed(json!({
        "edge": key,
        "coercion": coercion_label,
    })))
}

/// Removes an edge by its exact endpoint tuple.
pub fn remove_edge(doc: &mut Document, params: RemoveEdgeParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &ALL_PHASES, "remove_edge")?;
    let before = doc.edges.len();
    doc.edges
        .retain(|e| !e.matches(&params.from, &params.from_port, &params.to, &params.to_port));
    if doc.edges.len() == before {
        return Err(OpError::nothing_to_do(format!(
            "no edge '{}.{}->{}.{}'",
            params.from, params.from_port, params.to, params.to_port
        )));
    }
    Ok(MutationOutcome::changed(json!({
        "edge": format!("{}.{}->{}.{}", params.from, params.from_port, params.to, params.to_port),
    })))
}

/// Splits an existing edge through a freshly minted single-input,
/// single-output adapter node.
///
/// The adapter's input takes the source port's type and the output takes the
/// target port's type; `order_before` is preserved on both halves, and any
/// coercion previously attached to the edge is dropped (the adapter now owns
/// the conversion).
pub fn insert_adapter(
    doc: &mut Document,
    params: InsertAdapterParams,
) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Typing, Phase::Ready], "insert_adapter")?;
    let position = doc
        .edges
        .iter()
        .position(|e| e.matches(&params.from, &params.from_port, &params.to, &params.to_port))
        .ok_or_else(|| {
            OpError::nothing_to_do(format!(
                "no edge '{}.{}->{}.{}' to adapt",
                params.from, params.from_port, params.to, params.to_port
            ))
        })?;
    let original = doc.edges.remove(position);

    let source_ty = port_type(doc, &params.from, PortDirection::Output, &params.from_port).cloned();
    let target_ty = port_type(doc, &params.to, PortDirection::Input, &params.to_port).cloned();

    let raw_name = params
        .name
        .unwrap_or_else(|| format!("{} to {} adapter", params.from_port, params.to_port));
    let adapter_id = mint_node_id(&raw_name, doc.nodes.iter().map(|n| n.id.as_str()));

    let in_port = sanitize_port_name(&params.from_port);
    let out_port = sanitize_port_name(&params.to_port);
    let mut adapter = NodeDef::new(
        &adapter_id,
        NodeKind::Adapter,
        &format!(
            "adapts '{}.{}' to '{}.{}'",
            params.from, params.from_port, params.to, params.to_port
        ),
    );
    adapter.inputs.push(rpgir_core::document::PortDef {
        name: in_port.clone(),
        required: true,
        ty: source_ty,
    });
    adapter.outputs.push(rpgir_core::document::PortDef {
        name: out_port.clone(),
        required: true,
        ty: target_ty,
    });
    doc.nodes.push(adapter);

    let mut upstream = EdgeDef::new(&params.from, &params.from_port, &adapter_id, &in_port);
    upstream.order_before = original.order_before;
    let mut downstream = EdgeDef::new(&adapter_id, &out_port, &params.to, &params.to_port);
    downstream.order_before = original.order_before;
    doc.edges.push(upstream);
    doc.edges.push(downstream);

    Ok(MutationOutcome::changed(json!({
        "adapter": adapter_id,
        "replaced": original.key(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::document::PortDef;
    use rpgir_core::types::ScalarName;

    fn scalar(name: ScalarName) -> TypeExpr {
        TypeExpr::Scalar { name }
    }

    fn typed_pair(source: Option<TypeExpr>, target: Option<TypeExpr>) -> Document {
        let mut doc = Document::new("demo", "demo");
        doc.phase = Phase::Typing;
        let mut producer = NodeDef::new("producer@1", NodeKind::Module, "produces");
        producer.outputs.push(PortDef {
            name: "out".into(),
            required: true,
            ty: source,
        });
        let mut consumer = NodeDef::new("consumer@1", NodeKind::Module, "consumes");
        consumer.inputs.push(PortDef {
            name: "in".into(),
            required: true,
            ty: target,
        });
        doc.nodes.push(producer);
        doc.nodes.push(consumer);
        doc
    }

    fn connect(doc: &mut Document) -> Result<MutationOutcome, OpError> {
        add_edge(
            doc,
            AddEdgeParams {
                from: "producer@1".into(),
                from_port: "out".into(),
                to: "consumer@1".into(),
                to_port: "in".into(),
                order_before: false,
            },
        )
    }

    #[test]
    fn add_edge_checks_endpoints() {
        let mut doc = typed_pair(None, None);
        let err = add_edge(
            &mut doc,
            AddEdgeParams {
                from: "ghost@1".into(),
                from_port: "out".into(),
                to: "consumer@1".into(),
                to_port: "in".into(),
                order_before: false,
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingNode);
    }

    #[test]
    fn add_edge_rejects_duplicates() {
        let mut doc = typed_pair(None, None);
        connect(&mut doc).unwrap();
        assert_eq!(
            connect(&mut doc).unwrap_err().code,
            ErrorCode::ConstraintViolation
        );
    }

    #[test]
    fn coercible_edge_carries_a_plan() {
        let mut doc = typed_pair(
            Some(scalar(ScalarName::String)),
            Some(scalar(ScalarName::Number)),
        );
        let outcome = connect(&mut doc).unwrap();
        assert_eq!(outcome.result["coercion"], "scalar/stringToNumber");
        assert!(doc.edges[0].coercion.is_some());
    }

    #[test]
    fn incompatible_edge_is_a_type_mismatch() {
        let mut doc = typed_pair(
            Some(scalar(ScalarName::Number)),
            Some(scalar(ScalarName::Bool)),
        );
        assert_eq!(connect(&mut doc).unwrap_err().code, ErrorCode::TypeMismatch);
        assert!(doc.edges.is_empty() || doc.edges[0].coercion.is_none());
    }

    #[test]
    fn assignable_edge_has_no_coercion() {
        let mut doc = typed_pair(
            Some(scalar(ScalarName::String)),
            Some(scalar(ScalarName::String)),
        );
        let outcome = connect(&mut doc).unwrap();
        assert_eq!(outcome.result["coercion"], serde_json::Value::Null);
    }

    #[test]
    fn closing_a_cycle_is_rejected() {
        let mut doc = typed_pair(None, None);
        doc.node_mut("producer@1")
            .unwrap()
            .inputs
            .push(PortDef::optional("feedback"));
        doc.node_mut("consumer@1")
            .unwrap()
            .outputs
            .push(PortDef::new("echo"));
        connect(&mut doc).unwrap();
        let err = add_edge(
            &mut doc,
            AddEdgeParams {
                from: "consumer@1".into(),
                from_port: "echo".into(),
                to: "producer@1".into(),
                to_port: "feedback".into(),
                order_before: false,
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Cycle);
    }

    #[test]
    fn ordering_edges_skip_type_checks_and_cycles() {
        let mut doc = typed_pair(
            Some(scalar(ScalarName::Number)),
            Some(scalar(ScalarName::Bool)),
        );
        let outcome = add_edge(
            &mut doc,
            AddEdgeParams {
                from: "producer@1".into(),
                from_port: "out".into(),
                to: "consumer@1".into(),
                to_port: "in".into(),
                order_before: true,
            },
        )
        .unwrap();
        assert!(outcome.changed);
    }

    #[test]
    fn remove_edge_not_found_is_nothing_to_do() {
        let mut doc = typed_pair(None, None);
        let err = remove_edge(
            &mut doc,
            RemoveEdgeParams {
                from: "producer@1".into(),
                from_port: "out".into(),
                to: "consumer@1".into(),
                to_port: "in".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NothingToDo);
    }

    #[test]
    fn adapter_splits_the_edge_and_takes_the_types() {
        let mut doc = typed_pair(
            Some(scalar(ScalarName::String)),
            Some(scalar(ScalarName::Number)),
        );
        connect(&mut doc).unwrap();
        let outcome = insert_adapter(
            &mut doc,
            InsertAdapterParams {
                from: "producer@1".into(),
                from_port: "out".into(),
                to: "consumer@1".into(),
                to_port: "in".into(),
                name: None,
            },
        )
        .unwrap();
        let adapter_id = outcome.result["adapter"].as_str().unwrap().to_string();
        let adapter = doc.node(&adapter_id).unwrap();
        assert_eq!(adapter.kind, NodeKind::Adapter);
        assert_eq!(adapter.inputs[0].ty, Some(scalar(ScalarName::String)));
        assert_eq!(adapter.outputs[0].ty, Some(scalar(ScalarName::Number)));
        assert_eq!(doc.edges.len(), 2);
        assert!(doc.edges.iter().all(|e| e.coercion.is_none()));
        assert!(doc.has_edge("producer@1", "out", &adapter_id, "out"));
        assert!(doc.has_edge(&adapter_id, "in", "consumer@1", "in"));
    }

    #[test]
    fn adapter_without_edge_is_nothing_to_do() {
        let mut doc = typed_pair(None, None);
        let err = insert_adapter(
            &mut doc,
            InsertAdapterParams {
                from: "producer@1".into(),
                from_port: "out".into(),
                to: "consumer@1".into(),
                to_port: "in".into(),
                name: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NothingToDo);
    }
}
