//! Node CRUD and constraint/contract updates.

use serde_json::json;

use rpgir_core::document::{Contracts, Document, NodeDef, Phase};
use rpgir_core::ident::{is_valid_port_name, mint_node_id};
use rpgir_core::CoreError;

use crate::error::OpError;
use crate::ops::ensure_phase;
use crate::tools::{AddNodeParams, DeleteNodeParams, SetConstraintsParams, SetContractsParams, UpdateNodeParams};
use crate::txn::MutationOutcome;

/// Adds a node to the skeleton. Mints the id as
/// `<sanitized-name>@<1 + max existing version for that name>`.
pub fn add_node(doc: &mut Document, params: AddNodeParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton], "add_node")?;
    if params.summary.trim().is_empty() {
        return Err(OpError::schema_invalid("node summary must not be empty"));
    }
    for (direction, ports) in [("input", &params.inputs), ("output", &params.outputs)] {
        let mut seen = std::collections::HashSet::new();
        for port in ports {
            if !is_valid_port_name(&port.name) {
                return Err(OpError::schema_invalid(format!(
                    "invalid {direction} port name '{}'",
                    port.name
                )));
            }
            if !seen.insert(port.name.as_str()) {
                return Err(OpError::schema_invalid(format!(
                    "duplicate {direction} port name '{}'",
                    port.name
                )));
            }
        }
    }

    let id = mint_node_id(&params.name, doc.nodes.iter().map(|n| n.id.as_str()));
    let mut node = NodeDef::new(&id, params.kind, &params.summary);
    node.inputs = params.inputs;
    node.outputs = params.outputs;
    node.language = params.language;
    node.build_prompt = params.build_prompt;
    node.tags = params.tags;
    node.deps = params.deps;
    node.buffer = params.buffer;
    doc.nodes.push(node);

    Ok(MutationOutcome::changed(json!({ "node": id })))
}

/// Updates mutable node metadata. Absent fields are left untouched.
pub fn update_node(doc: &mut Document, params: UpdateNodeParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton, Phase::Typing], "update_node")?;
    let node = doc
        .node_mut(&params.node)
        .ok_or_else(|| CoreError::NodeNotFound {
            id: params.node.clone(),
        })?;

    let before = node.clone();
    if let Some(summary) = params.summary {
        if summary.trim().is_empty() {
            return Err(OpError::schema_invalid("node summary must not be empty"));
        }
        node.summary = summary;
    }
    if let Some(language) = params.language {
        node.language = Some(language);
    }
    if let Some(build_prompt) = params.build_prompt {
        node.build_prompt = Some(build_prompt);
    }
    if let Some(tags) = params.tags {
        node.tags = tags;
    }
    if let Some(deps) = params.deps {
        node.deps = deps;
    }
    if let Some(buffer) = params.buffer {
        node.buffer = buffer;
    }

    let result = json!({ "node": params.node });
    if *node == before {
        Ok(MutationOutcome::unchanged(result))
    } else {
        Ok(MutationOutcome::changed(result))
    }
}

/// Deletes a node. A node still referenced by edges needs `force`, which
/// removes the referencing edges along with it.
pub fn delete_node(doc: &mut Document, params: DeleteNodeParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton, Phase::Typing], "delete_node")?;
    doc.require_node(&params.node)?;

    let referencing = doc
        .edges
        .iter()
        .filter(|e| e.touches(&params.node))
        .count();
    if referencing > 0 && !params.force {
        return Err(OpError::constraint_violation(format!(
            "node '{}' is referenced by {} edge(s); pass force to remove them",
            params.node, referencing
        )));
    }

    doc.edges.retain(|e| !e.touches(&params.node));
    doc.nodes.retain(|n| n.id != params.node);

    Ok(MutationOutcome::changed(json!({
        "node": params.node,
        "removed_edges": referencing,
    })))
}

/// Replaces the provided constraint sections wholesale.
pub fn set_constraints(
    doc: &mut Document,
    params: SetConstraintsParams,
) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton, Phase::Typing], "set_constraints")?;
    let before = doc.constraints.clone();
    if let Some(runtimes) = params.runtimes {
        doc.constraints.runtimes = runtimes;
    }
    if let Some(licenses) = params.licenses {
        doc.constraints.licenses = licenses;
    }
    if let Some(policy) = params.policy {
        doc.constraints.policy = policy;
    }
    if let Some(metadata) = params.metadata {
        doc.constraints.metadata = metadata;
    }
    let result = json!({ "constraints": doc.constraints });
    if doc.constraints == before {
        Ok(MutationOutcome::unchanged(result))
    } else {
        Ok(MutationOutcome::changed(result))
    }
}

/// Sets the contract clauses on a node.
pub fn set_contracts(doc: &mut Document, params: SetContractsParams) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Skeleton, Phase::Typing], "set_contracts")?;
    let node = doc
        .node_mut(&params.node)
        .ok_or_else(|| CoreError::NodeNotFound {
            id: params.node.clone(),
        })?;
    let contracts = Contracts {
        pre: params.pre,
        post: params.post,
        invariants: params.invariants,
    };
    let result = json!({ "node": params.node });
    if node.contracts.as_ref() == Some(&contracts) {
        Ok(MutationOutcome::unchanged(result))
    } else {
        node.contracts = Some(contracts);
        Ok(MutationOutcome::changed(result))
    }
}
