//! The Resource Plan Graph document: the single unit of versioning,
//! content-hashing, and optimistic concurrency.
//!
//! [`Document`] aggregates project metadata, constraints, the node and edge
//! sets, an optional derived file layout, and lifecycle metadata. All
//! mutations flow through the engine's mutation framework, which is the only
//! caller of the canonicalizer and the persistence boundary; the data model
//! itself only provides lookups and small structural helpers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{CoercionPlan, TypeExpr};

/// Lifecycle phase of the document. Advanced only by successful full
/// validation, never regressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Skeleton,
    Typing,
    Ready,
}

impl Phase {
    /// The next phase, or `None` when already `ready`.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Skeleton => Some(Phase::Typing),
            Phase::Typing => Some(Phase::Ready),
            Phase::Ready => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Skeleton => "skeleton",
            Phase::Typing => "typing",
            Phase::Ready => "ready",
        }
    }
}

/// Node role within the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Framework,
    Module,
    Atom,
    Adapter,
    Infra,
    Test,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Framework => "framework",
            NodeKind::Module => "module",
            NodeKind::Atom => "atom",
            NodeKind::Adapter => "adapter",
            NodeKind::Infra => "infra",
            NodeKind::Test => "test",
        }
    }
}

/// Which side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        }
    }
}

fn default_true() -> bool {
    true
}

/// A named, optionally typed connection point owned by exactly one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDef {
    pub name: String,
    /// Required inputs must receive exactly one incoming edge.
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeExpr>,
}

impl PortDef {
    pub fn new(name: &str) -> Self {
        PortDef {
            name: name.to_string(),
            required: true,
            ty: None,
        }
    }

    pub fn optional(name: &str) -> Self {
        PortDef {
            name: name.to_string(),
            required: false,
            ty: None,
        }
    }

    pub fn typed(name: &str, ty: TypeExpr) -> Self {
        PortDef {
            name: name.to_string(),
            required: true,
            ty: Some(ty),
        }
    }
}

/// Behavioral contract clauses attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contracts {
    #[serde(default)]
    pub pre: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<String>,
}

/// A typed unit of future implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    /// Identity: `<sanitized-name>@<version>`, minted by `add_node`.
    pub id: String,
    pub kind: NodeKind,
    pub summary: String,
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    #[serde(default)]
    pub outputs: Vec<PortDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contracts: Option<Contracts>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deps: Vec<String>,
    /// Explicit cycle-breaker: feedback edges sourced from a buffer node are
    /// excluded from data cycle analysis.
    #[serde(default)]
    pub buffer: bool,
}

impl NodeDef {
    pub fn new(id: &str, kind: NodeKind, summary: &str) -> Self {
        NodeDef {
            id: id.to_string(),
            kind,
            summary: summary.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            language: None,
            build_prompt: None,
            contracts: None,
            tags: Vec::new(),
            deps: Vec::new(),
            buffer: false,
        }
    }

    /// Ports on the given side.
    pub fn ports(&self, direction: PortDirection) -> &[PortDef] {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    pub fn ports_mut(&mut self, direction: PortDirection) -> &mut Vec<PortDef> {
        match direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        }
    }

    pub fn port(&self, direction: PortDirection, name: &str) -> Option<&PortDef> {
        self.ports(direction).iter().find(|p| p.name == name)
    }
}

/// A directed dependency between two ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDef {
    pub from: String,
    pub from_port: String,
    pub to: String,
    pub to_port: String,
    /// Pure ordering dependency: carries no data and is excluded from data
    /// cycle analysis and port saturation.
    #[serde(default)]
    pub order_before: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coercion: Option<CoercionPlan>,
}

impl EdgeDef {
    pub fn new(from: &str, from_port: &str, to: &str, to_port: &str) -> Self {
        EdgeDef {
            from: from.to_string(),
            from_port: from_port.to_string(),
            to: to.to_string(),
            to_port: to_port.to_string(),
            order_before: false,
            coercion: None,
        }
    }

    /// Composite sort/identity key: `{from}.{fromPort}->{to}.{toPort}`.
    pub fn key(&self) -> String {
        format!(
            "{}.{}->{}.{}",
            self.from, self.from_port, self.to, self.to_port
        )
    }

    /// Exact endpoint-tuple match (ignores `order_before` and `coercion`).
    pub fn matches(&self, from: &str, from_port: &str, to: &str, to_port: &str) -> bool {
        self.from == from && self.from_port == from_port && self.to == to && self.to_port == to_port
    }

    /// `true` if the edge references the given node at all.
    pub fn touches(&self, node_id: &str) -> bool {
        self.from == node_id || self.to == node_id
    }
}

/// License allow/deny lists. Overlap between the two is a constraint error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicensePolicy {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Project-wide policy knobs checked by full validation and used by layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub deny_tags: Vec<String>,
    #[serde(default)]
    pub require_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_edges: Option<usize>,
    /// Per-node-kind directory overrides for the file layout planner.
    #[serde(default)]
    pub dir_overrides: IndexMap<String, String>,
}

/// Requirements and constraints for the whole plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Runtime constraints as `engine [comparator version]` strings,
    /// e.g. `nodejs >= 20` or `python`.
    #[serde(default)]
    pub runtimes: Vec<String>,
    #[serde(default)]
    pub licenses: LicensePolicy,
    #[serde(default)]
    pub policy: Policy,
    /// Free-form metadata bag; canonicalized recursively.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            runtimes: Vec::new(),
            licenses: LicensePolicy::default(),
            policy: Policy::default(),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Project identity and defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

/// One planned source file for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub node: String,
    pub path: String,
    pub test_path: String,
    pub language: String,
}

/// Barrel (re-export index) for one directory, TypeScript layouts only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barrel {
    pub dir: String,
    pub exports: Vec<String>,
}

/// Derived, disposable file-path projection of the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileLayout {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub barrels: Vec<Barrel>,
}

/// The Resource Plan Graph IR document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub project: ProjectMeta,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<FileLayout>,
    pub phase: Phase,
    /// Strictly increasing; bumped by exactly 1 per successful mutation.
    pub rev: u64,
    /// SHA-256 (16 hex chars) of the canonical form with `hash` stripped.
    #[serde(default)]
    pub hash: String,
    #[serde(
        rename = "lastValidatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_validated_at: Option<String>,
    #[serde(rename = "lastValidationErrors", default)]
    pub last_validation_errors: u32,
}

impl Document {
    /// A fresh skeleton-phase document with no nodes or edges.
    pub fn new(project_name: &str, summary: &str) -> Self {
        Document {
            project: ProjectMeta {
                name: project_name.to_string(),
                summary: summary.to_string(),
                default_language: None,
            },
            constraints: Constraints::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
            layout: None,
            phase: Phase::Skeleton,
            rev: 0,
            hash: String::new(),
            last_validated_at: None,
            last_validation_errors: 0,
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeDef> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeDef> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Looks up a node, surfacing a typed error when absent.
    pub fn require_node(&self, id: &str) -> Result<&NodeDef, CoreError> {
        self.node(id).ok_or_else(|| CoreError::NodeNotFound {
            id: id.to_string(),
        })
    }

    /// Looks up a port on a node, surfacing typed errors when absent.
    pub fn require_port(
        &self,
        node_id: &str,
        direction: PortDirection,
        port: &str,
    ) -> Result<&PortDef, CoreError> {
        let node = self.require_node(node_id)?;
        node.port(direction, port)
            .ok_or_else(|| CoreError::PortNotFound {
                node: node_id.to_string(),
                direction: direction.as_str().to_string(),
                port: port.to_string(),
            })
    }

    /// `true` if an edge with the exact endpoint tuple exists.
    pub fn has_edge(&self, from: &str, from_port: &str, to: &str, to_port: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.matches(from, from_port, to, to_port))
    }

    /// All non-ordering edges feeding a specific input port.
    pub fn producers_of(&self, node_id: &str, input_port: &str) -> Vec<&EdgeDef> {
        self.edges
            .iter()
            .filter(|e| !e.order_before && e.to == node_id && e.to_port == input_port)
            .collect()
    }

    /// `true` if any edge references the given node.
    pub fn node_referenced(&self, node_id: &str) -> bool {
        self.edges.iter().any(|e| e.touches(node_id))
    }

    /// `true` if any edge references the given (node, direction, port).
    pub fn port_referenced(&self, node_id: &str, direction: PortDirection, port: &str) -> bool {
        self.edges.iter().any(|e| match direction {
            PortDirection::Output => e.from == node_id && e.from_port == port,
            PortDirection::Input => e.to == node_id && e.to_port == port,
        })
    }

    /// Collapses exact duplicate edges (same endpoint tuple), keeping the
    /// first occurrence. Used after split/merge rewrites.
    pub fn dedup_edges(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.edges.retain(|e| seen.insert(e.key()));
    }
}
