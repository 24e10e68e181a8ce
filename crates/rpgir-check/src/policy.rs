//! Constraint and policy checks: licenses, runtimes, tag policy, edge budget.

use std::collections::BTreeSet;

use rpgir_core::document::Document;
use rpgir_core::ErrorCode;

use crate::diagnostics::ValidationError;

/// A parsed runtime constraint of the form `engine [comparator version]`,
/// e.g. `nodejs >= 20` or just `python`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConstraint {
    pub engine: String,
    pub comparator: Option<String>,
    pub version: Option<String>,
}

/// Parses one runtime constraint string. Never fails: a bare word is a
/// version-less engine constraint; extra tokens beyond the three are ignored.
pub fn parse_runtime(raw: &str) -> Option<RuntimeConstraint> {
    let mut tokens = raw.split_whitespace();
    let engine = tokens.next()?.to_ascii_lowercase();
    let comparator = tokens.next().map(str::to_string);
    let version = tokens.next().map(str::to_string);
    Some(RuntimeConstraint {
        engine,
        comparator,
        version,
    })
}

/// Runs the constraint/policy pass.
pub fn check_constraints(doc: &Document) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let constraints = &doc.constraints;

    // License allow/deny overlap.
    let deny: BTreeSet<&str> = constraints.licenses.deny.iter().map(String::as_str).collect();
    for license in &constraints.licenses.allow {
        if deny.contains(license.as_str()) {
            errors.push(ValidationError::new(
                ErrorCode::ConstraintViolation,
                format!("license '{license}' appears in both allow and deny lists"),
            ));
        }
    }

    // Node languages must match a declared runtime by engine-name prefix.
    let runtimes: Vec<RuntimeConstraint> = constraints
        .runtimes
        .iter()
        .filter_map(|r| parse_runtime(r))
        .collect();
    if !runtimes.is_empty() {
        for node in &doc.nodes {
            if let Some(language) = &node.language {
                let lang = language.to_ascii_lowercase();
                let matched = runtimes
                    .iter()
                    .any(|r| r.engine.starts_with(&lang) || lang.starts_with(&r.engine));
                if !matched {
                    errors.push(
                        ValidationError::new(
                            ErrorCode::ConstraintViolation,
                            format!(
                                "node '{}' declares language '{}' but no runtime constraint covers it",
                                node.id, language
                            ),
                        )
                        .with_node(&node.id),
                    );
                }
            }
        }
    }

    // Denied tags.
    let denied: BTreeSet<&str> = constraints
        .policy
        .deny_tags
        .iter()
        .map(String::as_str)
        .collect();
    for node in &doc.nodes {
        for tag in &node.tags {
            if denied.contains(tag.as_str()) {
                errors.push(
                    ValidationError::new(
                        ErrorCode::PolicyViolation,
                        format!("node '{}' carries denied tag '{}'", node.id, tag),
                    )
                    .with_node(&node.id),
                );
            }
        }
    }

    // Required tags must be covered by at least one node.
    for required in &constraints.policy.require_tags {
        let covered = doc
            .nodes
            .iter()
            .any(|n| n.tags.iter().any(|t| t == required));
        if !covered {
            errors.push(ValidationError::new(
                ErrorCode::PolicyViolation,
                format!("required tag '{required}' is not carried by any node"),
            ));
        }
    }

    // Edge budget.
    if let Some(max_edges) = constraints.policy.max_edges {
        if doc.edges.len() > max_edges {
            errors.push(ValidationError::new(
                ErrorCode::PolicyViolation,
                format!(
                    "graph has {} edges, exceeding the policy maximum of {}",
                    doc.edges.len(),
                    max_edges
                ),
            ));
        }
    }

    errors
}
