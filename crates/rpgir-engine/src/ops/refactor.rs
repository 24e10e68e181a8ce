//! Structural refactorings: node split and merge.

use std::collections::HashMap;

use serde_json::json;

use rpgir_core::document::{Contracts, Document, NodeDef, Phase, PortDef};
use rpgir_core::ident::mint_node_id;
use rpgir_core::PortDirection;

use crate::error::OpError;
use crate::ops::ensure_phase;
use crate::tools::{MergeNodesParams, SplitNodeParams};
use crate::txn::MutationOutcome;

/// Splits a node into parts.
///
/// Each part claims a subset of the original outputs and inputs; every
/// original port must be claimed by exactly one part. Edges are rewritten to
/// the claiming part, the original node is removed, and exact duplicate
/// edges are collapsed.
pub fn split_node(doc: &mut Document, params: SplitNodeParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton, Phase::Typing], "split_node")?;
    let original = doc.require_node(&params.node)?.clone();
    if params.parts.is_empty() {
        return Err(OpError::schema_invalid("split_node needs at least one part"));
    }

    // Every original port must be claimed exactly once across the parts.
    let mut output_claims: HashMap<&str, &str> = HashMap::new();
    let mut input_claims: HashMap<&str, &str> = HashMap::new();
    for part in &params.parts {
        for (claims, names, direction) in [
            (&mut output_claims, &part.outputs, PortDirection::Output),
            (&mut input_claims, &part.inputs, PortDirection::Input),
        ] {
            for name in names {
                if original.port(direction, name).is_none() {
                    return Err(OpError::schema_invalid(format!(
                        "part '{}' claims unknown {} port '{}'",
                        part.name,
                        direction.as_str(),
                        name
                    )));
                }
                if claims.insert(name.as_str(), part.name.as_str()).is_some() {
                    return Err(OpError::schema_invalid(format!(
                        "{} port '{}' is claimed more than once",
                        direction.as_str(),
                        name
                    )));
                }
            }
        }
    }
    for port in &original.outputs {
        if !output_claims.contains_key(port.name.as_str()) {
            return Err(OpError::schema_invalid(format!(
                "output port '{}' is not claimed by any part",
                port.name
            )));
        }
    }
    for port in &original.inputs {
        if !input_claims.contains_key(port.name.as_str()) {
            return Err(OpError::schema_invalid(format!(
                "input port '{}' is not claimed by any part",
                port.name
            )));
        }
    }

    // Mint the parts. Claims map by part *name*; resolve to minted ids after.
    let mut part_ids: HashMap<&str, String> = HashMap::new();
    let mut minted = Vec::with_capacity(params.parts.len());
    for part in &params.parts {
        let id = mint_node_id(&part.name, doc.nodes.iter().map(|n| n.id.as_str()));
        let mut node = NodeDef::new(&id, original.kind, &original.summary);
        node.language = original.language.clone();
        node.build_prompt = original.build_prompt.clone();
        node.contracts = original.contracts.clone();
        node.tags = original.tags.clone();
        node.deps = original.deps.clone();
        node.buffer = original.buffer;
        node.outputs = take_claimed(&original.outputs, &part.outputs);
        node.inputs = take_claimed(&original.inputs, &part.inputs);
        part_ids.insert(part.name.as_str(), id.clone());
        minted.push(id.clone());
        doc.nodes.push(node);
    }

    // Rewrite edges to the claiming part.
    for edge in &mut doc.edges {
        if edge.from == params.node {
            if let Some(part) = output_claims.get(edge.from_port.as_str()) {
                if let Some(id) = part_ids.get(part) {
                    edge.from = id.clone();
                }
            }
        }
        if edge.to == params.node {
            if let Some(part) = input_claims.get(edge.to_port.as_str()) {
                if let Some(id) = part_ids.get(part) {
                    edge.to = id.clone();
                }
            }
        }
    }
    doc.nodes.retain(|n| n.id != params.node);
    doc.dedup_edges();

    Ok(MutationOutcome::changed(json!({
        "removed": params.node,
        "nodes": minted,
    })))
}

/// Unions the contract clauses of the merged nodes, deduplicated in order.
/// `None` when no node carried contracts.
fn merge_contracts(originals: &[NodeDef]) -> Option<Contracts> {
    let mut merged = Contracts::default();
    let mut any = false;
    for original in originals {
        let Some(contracts) = &original.contracts else {
            continue;
        };
        any = true;
        for (clauses, source) in [
            (&mut merged.pre, &contracts.pre),
            (&mut merged.post, &contracts.post),
            (&mut merged.invariants, &contracts.invariants),
        ] {
            for clause in source {
                if !clauses.contains(clause) {
                    clauses.push(clause.clone());
                }
            }
        }
    }
    any.then_some(merged)
}

fn take_claimed(ports: &[PortDef], claimed: &[String]) -> Vec<PortDef> {
    ports
        .iter()
        .filter(|p| claimed.iter().any(|c| c == &p.name))
        .cloned()
        .collect()
}

/// Merges two or more nodes of identical kind into one.
///
/// Ports are unioned by name; a name collision is only legal when the two
/// definitions are byte-identical. Edges are rewritten to the merged node,
/// the originals are removed, and duplicates are collapsed.
pub fn merge_nodes(doc: &mut Document, params: MergeNodesParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton, Phase::Typing], "merge_nodes")?;
    if params.nodes.len() < 2 {
        return Err(OpError::schema_invalid("merge_nodes needs at least two nodes"));
    }
    let mut originals = Vec::with_capacity(params.nodes.len());
    for id in &params.nodes {
        originals.push(doc.require_node(id)?.clone());
    }
    let kind = originals[0].kind;
    if originals.iter().any(|n| n.kind != kind) {
        return Err(OpError::constraint_violation(
            "merge_nodes requires all nodes to share the same kind",
        ));
    }

    let merged_id = mint_node_id(&params.name, doc.nodes.iter().map(|n| n.id.as_str()));
    let summary = originals
        .iter()
        .map(|n| n.summary.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let mut merged = NodeDef::new(&merged_id, kind, &summary);
    merged.language = originals.iter().find_map(|n| n.language.clone());
    merged.build_prompt = originals.iter().find_map(|n| n.build_prompt.clone());
    merged.contracts = merge_contracts(&originals);
    merged.buffer = originals.iter().any(|n| n.buffer);
    for original in &originals {
        for tag in &original.tags {
            if !merged.tags.contains(tag) {
                merged.tags.push(tag.clone());
            }
        }
        for dep in &original.deps {
            if !merged.deps.contains(dep) {
                merged.deps.push(dep.clone());
            }
        }
        for direction in [PortDirection::Input, PortDirection::Output] {
            for port in original.ports(direction) {
                match merged.port(direction, &port.name) {
                    None => merged.ports_mut(direction).push(port.clone()),
                    Some(existing) if existing == port => {}
                    Some(_) => {
                        return Err(OpError::constraint_violation(format!(
                            "{} port '{}' collides with a differing definition",
                            direction.as_str(),
                            port.name
                        )));
                    }
                }
            }
        }
    }
    doc.nodes.push(merged);

    for edge in &mut doc.edges {
        if params.nodes.contains(&edge.from) {
            edge.from = merged_id.clone();
        }
        if params.nodes.contains(&edge.to) {
            edge.to = merged_id.clone();
        }
    }
    doc.nodes.retain(|n| !params.nodes.contains(&n.id));
    doc.dedup_edges();

    Ok(MutationOutcome::changed(json!({
        "node": merged_id,
        "merged": params.nodes,
    })))
}
