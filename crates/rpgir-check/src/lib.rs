//! Validators and the coercion planner for the resource plan graph.
//!
//! Two composable passes, both pure:
//! - [`validate_shape`]: schema-only check run after every mutation before
//!   anything persists (identifier grammar, summaries, duplicate ids/ports).
//! - [`validate_full`]: shape plus edge-endpoint existence, port saturation,
//!   buffer-aware cycle detection, structural type compatibility, and
//!   constraint/policy checks. Never throws; returns an ordered error list
//!   and a summary that is computed even when errors exist.

pub mod assign;
pub mod coercion;
pub mod cycle;
pub mod diagnostics;
pub mod policy;
pub mod saturation;
pub mod shape;

pub use assign::{is_assignable, ports_compatible};
pub use coercion::try_plan_coercion;
pub use cycle::find_cycle;
pub use diagnostics::{ValidationError, ValidationReport, ValidationSummary};
pub use shape::validate_shape;

use rpgir_core::document::{Document, PortDirection};
use rpgir_core::ErrorCode;

/// Runs the full validation pass.
pub fn validate_full(doc: &Document) -> ValidationReport {
    let mut errors = validate_shape(doc);

    // Edge endpoints must exist before any per-edge analysis can be trusted.
    for edge in &doc.edges {
        for (node_id, direction, port) in [
            (&edge.from, PortDirection::Output, &edge.from_port),
            (&edge.to, PortDirection::Input, &edge.to_port),
        ] {
            match doc.node(node_id) {
                None => errors.push(
                    ValidationError::new(
                        ErrorCode::MissingNode,
                        format!("edge '{}' references unknown node '{}'", edge.key(), node_id),
                    )
                    .with_edge(edge.key()),
                ),
                Some(node) => {
                    if node.port(direction, port).is_none() {
                        errors.push(
                            ValidationError::new(
                                ErrorCode::MissingPort,
                                format!(
                                    "edge '{}' references unknown {} port '{}' on '{}'",
                                    edge.key(),
                                    direction.as_str(),
                                    port,
                                    node_id
                                ),
                            )
                            .with_edge(edge.key())
                            .with_node(node_id),
                        );
                    }
                }
            }
        }
    }

    let saturation_errors = saturation::check_saturation(doc);
    let unconnected_required_inputs = saturation_errors
        .iter()
        .filter(|e| e.code == ErrorCode::UnconnectedRequiredInput)
        .count();
    errors.extend(saturation_errors);

    let cycle_path = cycle::find_cycle(doc);
    let cycles = usize::from(cycle_path.is_some());
    if let Some(path) = cycle_path {
        errors.push(ValidationError::new(
            ErrorCode::Cycle,
            format!("data cycle: {}", path.join(" -> ")),
        ));
    }

    let mut type_mismatches = 0;
    for edge in &doc.edges {
        if edge.order_before {
            continue;
        }
        let source_ty = doc
            .node(&edge.from)
            .and_then(|n| n.port(PortDirection::Output, &edge.from_port))
            .and_then(|p| p.ty.as_ref());
        let target_ty = doc
            .node(&edge.to)
            .and_then(|n| n.port(PortDirection::Input, &edge.to_port))
            .and_then(|p| p.ty.as_ref());
        let (Some(source_ty), Some(target_ty)) = (source_ty, target_ty) else {
            continue;
        };
        if !assign::is_assignable(source_ty, target_ty)
            && coercion::try_plan_coercion(Some(source_ty), Some(target_ty)).is_none()
        {
            type_mismatches += 1;
            errors.push(
                ValidationError::new(
                    ErrorCode::TypeMismatch,
                    format!(
                        "edge '{}': source type is not assignable to the target and no coercion exists",
                        edge.key()
                    ),
                )
                .with_edge(edge.key()),
            );
        }
    }

    errors.extend(policy::check_constraints(doc));

    ValidationReport {
        summary: ValidationSummary {
            nodes: doc.nodes.len(),
            edges: doc.edges.len(),
            unconnected_required_inputs,
            type_mismatches,
            cycles,
        },
        errors,
    }
}
