//! Kahn's-algorithm batching of the validated graph into parallel
//! implementation tasks.
//!
//! All nodes with no unscheduled predecessor form one batch, are removed, and
//! the process repeats. Ordering-only edges constrain batching like data
//! edges do; edges sourced from a buffer node are excluded so an explicitly
//! broken loop still schedules. Anything left unscheduled is a residual cycle.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use rpgir_core::document::{Document, NodeKind, PortDirection};
use rpgir_core::types::TypeExpr;
use rpgir_core::ErrorCode;

use crate::error::OpError;

const EXTERNAL_IO_TAG: &str = "external-io";
const EXTERNAL_IO_TIMEOUT_MS: u64 = 60_000;
const MANY_PRODUCERS_RETRIES: u32 = 2;

/// One schedulable unit of implementation work.
#[derive(Debug, Clone, Serialize)]
pub struct ImplTask {
    pub node: String,
    pub kind: NodeKind,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_prompt: Option<String>,
    pub inputs: Vec<PortView>,
    pub outputs: Vec<PortView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_file: Option<String>,
    pub hints: TaskHints,
}

/// A port plus its peers on the other side of its edges.
#[derive(Debug, Clone, Serialize)]
pub struct PortView {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeExpr>,
    /// `producer.port` / `consumer.port` keys on the far side.
    pub peers: Vec<String>,
}

/// Derived execution hints for the implementing agent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
}

/// Computes the ordered parallel batches for a `ready` document with a
/// planned layout.
pub fn emit_impl_batches(doc: &Document) -> Result<Value, OpError> {
    if doc.phase != rpgir_core::document::Phase::Ready {
        return Err(OpError::invalid_phase(format!(
            "emit_impl_batches is not legal in phase '{}' (allowed: ready)",
            doc.phase.as_str()
        )));
    }
    let layout = doc.layout.as_ref().ok_or_else(|| {
        OpError::constraint_violation("no file layout planned; run plan_file_layout first")
    })?;

    let batches = schedule_batches(doc)?;
    debug!(batches = batches.len(), nodes = doc.nodes.len(), "scheduled impl batches");

    let file_of: BTreeMap<&str, (&str, &str)> = layout
        .files
        .iter()
        .map(|f| (f.node.as_str(), (f.path.as_str(), f.test_path.as_str())))
        .collect();

    let rendered: Vec<Vec<ImplTask>> = batches
        .iter()
        .map(|batch| {
            batch
                .iter()
                .filter_map(|id| doc.node(id))
                .map(|node| {
                    let (file, test_file) = match file_of.get(node.id.as_str()) {
                        Some((path, test)) => (Some(path.to_string()), Some(test.to_string())),
                        None => (None, None),
                    };
                    ImplTask {
                        node: node.id.clone(),
                        kind: node.kind,
                        summary: node.summary.clone(),
                        build_prompt: node.build_prompt.clone(),
                        inputs: port_views(doc, &node.id, PortDirection::Input),
                        outputs: port_views(doc, &node.id, PortDirection::Output),
                        file,
                        test_file,
                        hints: hints_for(doc, &node.id, node.kind),
                    }
                })
                .collect()
        })
        .collect();

    Ok(json!({
        "batches": rendered,
        "total_batches": rendered.len(),
    }))
}

/// Layered Kahn's algorithm over node ids. Deterministic: every batch is
/// sorted, and map iteration is over ordered containers only.
pub fn schedule_batches(doc: &Document) -> Result<Vec<Vec<String>>, OpError> {
    let mut indegree: BTreeMap<&str, usize> = doc.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    let mut successors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for edge in &doc.edges {
        if doc.node(&edge.from).map(|n| n.buffer).unwrap_or(false) {
            continue;
        }
        if !indegree.contains_key(edge.from.as_str()) || !indegree.contains_key(edge.to.as_str()) {
            continue;
        }
        if successors
            .entry(edge.from.as_str())
            .or_default()
            .insert(edge.to.as_str())
        {
            if let Some(count) = indegree.get_mut(edge.to.as_str()) {
                *count += 1;
            }
        }
    }

    let mut scheduled: HashSet<&str> = HashSet::new();
    let mut batches: Vec<Vec<String>> = Vec::new();
    while scheduled.len() < doc.nodes.len() {
        let ready: Vec<&str> = indegree
            .iter()
            .filter(|(id, count)| **count == 0 && !scheduled.contains(*id))
            .map(|(id, _)| *id)
            .collect();
        if ready.is_empty() {
            let mut stuck: Vec<&str> = indegree
                .keys()
                .filter(|id| !scheduled.contains(*id))
                .copied()
                .collect();
            stuck.sort_unstable();
            return Err(OpError::new(
                ErrorCode::Cycle,
                format!("residual cycle prevents scheduling: {}", stuck.join(", ")),
            ));
        }
        for id in &ready {
            scheduled.insert(*id);
            if let Some(next) = successors.get(id) {
                for succ in next {
                    if let Some(count) = indegree.get_mut(succ) {
                        *count = count.saturating_sub(1);
                    }
                }
            }
        }
        batches.push(ready.iter().map(|id| id.to_string()).collect());
    }
    Ok(batches)
}

fn port_views(doc: &Document, node_id: &str, direction: PortDirection) -> Vec<PortView> {
    let Some(node) = doc.node(node_id) else {
        return Vec::new();
    };
    node.ports(direction)
        .iter()
        .map(|port| {
            let peers = doc
                .edges
                .iter()
                .filter(|e| !e.order_before)
                .filter_map(|e| match direction {
                    PortDirection::Input if e.to == node_id && e.to_port == port.name => {
                        Some(format!("{}.{}", e.from, e.from_port))
                    }
                    PortDirection::Output if e.from == node_id && e.from_port == port.name => {
                        Some(format!("{}.{}", e.to, e.to_port))
                    }
                    _ => None,
                })
                .collect();
            PortView {
                name: port.name.clone(),
                ty: port.ty.clone(),
                peers,
            }
        })
        .collect()
}

fn hints_for(doc: &Document, node_id: &str, kind: NodeKind) -> TaskHints {
    let mut hints = TaskHints::default();
    if kind == NodeKind::Adapter {
        hints.context = Some("type-coercion".to_string());
    }
    if doc
        .node(node_id)
        .map(|n| n.tags.iter().any(|t| t == EXTERNAL_IO_TAG))
        .unwrap_or(false)
    {
        hints.timeout_ms = Some(EXTERNAL_IO_TIMEOUT_MS);
    }
    let producers: BTreeSet<(&str, &str)> = doc
        .edges
        .iter()
        .filter(|e| !e.order_before && e.to == node_id)
        .map(|e| (e.from.as_str(), e.from_port.as_str()))
        .collect();
    if producers.len() > 2 {
        hints.retry = Some(MANY_PRODUCERS_RETRIES);
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::document::{EdgeDef, NodeDef, Phase, PortDef};

    fn node(id: &str) -> NodeDef {
        let mut n = NodeDef::new(id, NodeKind::Module, "unit");
        n.inputs.push(PortDef::optional("in"));
        n.outputs.push(PortDef::new("out"));
        n
    }

    fn chain() -> Document {
        let mut doc = Document::new("demo", "demo");
        doc.phase = Phase::Ready;
        for id in ["a@1", "b@1", "c@1", "d@1"] {
            doc.nodes.push(node(id));
        }
        doc.edges.push(EdgeDef::new("a@1", "out", "b@1", "in"));
        doc.edges.push(EdgeDef::new("a@1", "out", "c@1", "in"));
        doc.edges.push(EdgeDef::new("b@1", "out", "d@1", "in"));
        doc.edges.push(EdgeDef::new("c@1", "out", "d@1", "in"));
        doc
    }

    #[test]
    fn diamond_schedules_in_three_batches() {
        let batches = schedule_batches(&chain()).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], vec!["a@1"]);
        assert_eq!(batches[1], vec!["b@1", "c@1"]);
        assert_eq!(batches[2], vec!["d@1"]);
    }

    #[test]
    fn ordering_edges_constrain_batching() {
        let mut doc = chain();
        let mut ordering = EdgeDef::new("d@1", "out", "a@1", "in");
        ordering.order_before = true;
        doc.edges.push(ordering);
        // d -> a closes a loop through ordering, so nothing can schedule.
        let err = schedule_batches(&doc).unwrap_err();
        assert_eq!(err.code, ErrorCode::Cycle);
    }

    #[test]
    fn buffer_sourced_edges_are_excluded() {
        let mut doc = chain();
        doc.node_mut("d@1").unwrap().buffer = true;
        doc.edges.push(EdgeDef::new("d@1", "out", "a@1", "in"));
        let batches = schedule_batches(&doc).unwrap();
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn residual_cycle_raises_cycle() {
        let mut doc = chain();
        doc.edges.push(EdgeDef::new("d@1", "out", "a@1", "in"));
        let err = schedule_batches(&doc).unwrap_err();
        assert_eq!(err.code, ErrorCode::Cycle);
        assert!(err.message.contains("a@1"));
    }

    #[test]
    fn emit_requires_ready_phase_and_a_layout() {
        let mut doc = chain();
        doc.phase = Phase::Typing;
        assert_eq!(
            emit_impl_batches(&doc).unwrap_err().code,
            ErrorCode::InvalidPhase
        );
        doc.phase = Phase::Ready;
        assert_eq!(
            emit_impl_batches(&doc).unwrap_err().code,
            ErrorCode::ConstraintViolation
        );
    }

    #[test]
    fn hints_cover_adapter_io_and_fan_in() {
        let mut doc = chain();
        doc.node_mut("d@1").unwrap().kind = NodeKind::Adapter;
        doc.node_mut("d@1").unwrap().tags = vec![EXTERNAL_IO_TAG.into()];
        // A third distinct producer port into d@1.
        doc.edges.push(EdgeDef::new("a@1", "out", "d@1", "in"));
        let hints = hints_for(&doc, "d@1", NodeKind::Adapter);
        assert_eq!(hints.context.as_deref(), Some("type-coercion"));
        assert_eq!(hints.timeout_ms, Some(EXTERNAL_IO_TIMEOUT_MS));
        assert_eq!(hints.retry, Some(2));
    }
}
