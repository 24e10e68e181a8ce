//! Snapshots, graphviz views, and plan scoring.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use rpgir_core::document::{Document, Phase};
use rpgir_core::types::TypeExpr;
use rpgir_core::{canonicalize, PortDirection};

use crate::error::OpError;
use crate::schedule::schedule_batches;
use crate::tools::{GraphvizView, SnapshotFormat};

/// Serializes the canonical document as JSON or YAML text.
pub fn export_snapshot(doc: &Document, format: SnapshotFormat) -> Result<Value, OpError> {
    let canon = canonicalize(doc);
    let text = match format {
        SnapshotFormat::Json => serde_json::to_string_pretty(&canon)
            .map_err(|e| OpError::schema_invalid(format!("snapshot serialization failed: {e}")))?,
        SnapshotFormat::Yaml => serde_yaml::to_string(&canon)
            .map_err(|e| OpError::schema_invalid(format!("snapshot serialization failed: {e}")))?,
    };
    Ok(json!({ "snapshot": text }))
}

/// Renders a graphviz dot view: `rpg` shows the plan graph itself, `impl`
/// groups nodes into their scheduled implementation batches.
pub fn export_graphviz(doc: &Document, view: GraphvizView) -> Result<Value, OpError> {
    let dot = match view {
        GraphvizView::Rpg => rpg_dot(doc),
        GraphvizView::Impl => impl_dot(doc)?,
    };
    Ok(json!({ "dot": dot }))
}

fn dot_escape(text: &str) -> String {
    text.replace('"', "\\\"")
}

fn rpg_dot(doc: &Document) -> String {
    let canon = canonicalize(doc);
    let mut out = String::from("digraph rpg {\n  rankdir=LR;\n  node [shape=box];\n");
    for node in &canon.nodes {
        let peripheries = if node.buffer { 2 } else { 1 };
        out.push_str(&format!(
            "  \"{}\" [label=\"{}\\n({})\" peripheries={}];\n",
            dot_escape(&node.id),
            dot_escape(&node.id),
            node.kind.as_str(),
            peripheries
        ));
    }
    for edge in &canon.edges {
        let mut attrs = vec![format!(
            "label=\"{} -> {}\"",
            dot_escape(&edge.from_port),
            dot_escape(&edge.to_port)
        )];
        if edge.order_before {
            attrs.push("style=dashed".to_string());
        }
        if let Some(coercion) = &edge.coercion {
            attrs.push(format!("taillabel=\"{}\"", dot_escape(&coercion.label())));
        }
        out.push_str(&format!(
            "  \"{}\" -> \"{}\" [{}];\n",
            dot_escape(&edge.from),
            dot_escape(&edge.to),
            attrs.join(" ")
        ));
    }
    out.push_str("}\n");
    out
}

fn impl_dot(doc: &Document) -> Result<String, OpError> {
    let batches = schedule_batches(doc)?;
    let mut out = String::from("digraph impl {\n  rankdir=TB;\n  node [shape=box];\n");
    for (index, batch) in batches.iter().enumerate() {
        out.push_str(&format!(
            "  subgraph cluster_{index} {{\n    label=\"batch {index}\";\n"
        ));
        for id in batch {
            out.push_str(&format!("    \"{}\";\n", dot_escape(id)));
        }
        out.push_str("  }\n");
    }
    let canon = canonicalize(doc);
    for edge in &canon.edges {
        out.push_str(&format!(
            "  \"{}\" -> \"{}\";\n",
            dot_escape(&edge.from),
            dot_escape(&edge.to)
        ));
    }
    out.push_str("}\n");
    Ok(out)
}

/// The plan-graph view: nodes, ports, and edges in canonical order.
pub fn rpg_view(doc: &Document) -> Value {
    let canon = canonicalize(doc);
    json!({
        "project": canon.project,
        "phase": canon.phase,
        "rev": canon.rev,
        "nodes": canon.nodes,
        "edges": canon.edges,
    })
}

/// The implementation view: planned files plus scheduled batches.
pub fn impl_view(doc: &Document) -> Result<Value, OpError> {
    let batches = schedule_batches(doc)?;
    Ok(json!({
        "layout": doc.layout,
        "batches": batches,
    }))
}

/// Scores plan completeness on a 0-100 scale.
///
/// 40 points for the typed-port ratio, 30 for the connected-required-input
/// ratio, 20 for a clean full validation, 10 for phase progress.
pub fn score_ir(doc: &Document) -> Value {
    let mut total_ports = 0usize;
    let mut typed_ports = 0usize;
    let mut required_inputs = 0usize;
    let mut connected_required = 0usize;

    for node in &doc.nodes {
        for direction in [PortDirection::Input, PortDirection::Output] {
            for port in node.ports(direction) {
                total_ports += 1;
                if port.ty.is_some() {
                    typed_ports += 1;
                }
                if direction == PortDirection::Input && port.required {
                    required_inputs += 1;
                    if doc.producers_of(&node.id, &port.name).len() == 1 {
                        connected_required += 1;
                    }
                }
            }
        }
    }

    let ratio = |num: usize, den: usize| {
        if den == 0 {
            1.0
        } else {
            num as f64 / den as f64
        }
    };
    let typing_score = 40.0 * ratio(typed_ports, total_ports);
    let wiring_score = 30.0 * ratio(connected_required, required_inputs);
    let report = rpgir_check::validate_full(doc);
    let validation_score = if report.is_clean() { 20.0 } else { 0.0 };
    let phase_score = match doc.phase {
        Phase::Skeleton => 0.0,
        Phase::Typing => 5.0,
        Phase::Ready => 10.0,
    };
    let total = typing_score + wiring_score + validation_score + phase_score;

    json!({
        "score": total.round() as u32,
        "breakdown": {
            "typed_ports": typing_score.round() as u32,
            "connected_required_inputs": wiring_score.round() as u32,
            "validation": validation_score as u32,
            "phase": phase_score as u32,
        },
        "summary": report.summary,
    })
}

/// Type-compatibility probe used by `validate_compatibility`.
pub fn compatibility(source: Option<&TypeExpr>, target: Option<&TypeExpr>) -> Value {
    let assignable = rpgir_check::ports_compatible(source, target);
    let coercion = if assignable {
        None
    } else {
        rpgir_check::try_plan_coercion(source, target).filter(|p| !p.is_id())
    };
    let compatible = assignable || coercion.is_some();
    json!({
        "assignable": assignable,
        "compatible": compatible,
        "coercion": coercion,
    })
}

/// Canonical-order validation errors grouped by code, for `get_validation_errors`.
pub fn validation_errors(doc: &Document) -> Value {
    let report = rpgir_check::validate_full(doc);
    let mut by_code: BTreeMap<String, usize> = BTreeMap::new();
    for error in &report.errors {
        *by_code.entry(error.code.as_str().to_string()).or_default() += 1;
    }
    json!({
        "errors": report.errors,
        "summary": report.summary,
        "by_code": by_code,
    })
}
