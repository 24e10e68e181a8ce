//! Wire schema for the tool surface: the response envelope and the request
//! parameter structs for every tool.
//!
//! The envelope is `{ok, result?, errors?, irHash}`. `irHash` always reflects
//! the document the caller should reason about next: the new hash after a
//! committed mutation, the unchanged prior hash after any failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rpgir_core::document::{NodeKind, PortDef, PortDirection};
use rpgir_core::types::TypeExpr;

use crate::error::OpError;

/// The uniform tool response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<OpError>>,
    #[serde(rename = "irHash")]
    pub ir_hash: String,
}

impl ToolResponse {
    pub fn success(result: Value, ir_hash: impl Into<String>) -> Self {
        ToolResponse {
            ok: true,
            result: Some(result),
            errors: None,
            ir_hash: ir_hash.into(),
        }
    }

    pub fn failure(errors: Vec<OpError>, ir_hash: impl Into<String>) -> Self {
        ToolResponse {
            ok: false,
            result: None,
            errors: Some(errors),
            ir_hash: ir_hash.into(),
        }
    }
}

// ---- session & constraints ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionParams {
    pub project: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub default_language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetConstraintsParams {
    #[serde(default)]
    pub runtimes: Option<Vec<String>>,
    #[serde(default)]
    pub licenses: Option<rpgir_core::document::LicensePolicy>,
    #[serde(default)]
    pub policy: Option<rpgir_core::document::Policy>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

// ---- node operations ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodeParams {
    pub name: String,
    pub kind: NodeKind,
    pub summary: String,
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    #[serde(default)]
    pub outputs: Vec<PortDef>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub build_prompt: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default)]
    pub buffer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNodeParams {
    pub node: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub build_prompt: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub deps: Option<Vec<String>>,
    #[serde(default)]
    pub buffer: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteNodeParams {
    pub node: String,
    /// Also remove every edge referencing the node.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetContractsParams {
    pub node: String,
    #[serde(default)]
    pub pre: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<String>,
}

// ---- port operations ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPortParams {
    pub node: String,
    pub direction: PortDirection,
    pub name: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(rename = "type", default)]
    pub ty: Option<TypeExpr>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovePortParams {
    pub node: String,
    pub direction: PortDirection,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPortTypeParams {
    pub node: String,
    pub direction: PortDirection,
    pub name: String,
    /// `None` clears the type back to untyped.
    #[serde(rename = "type", default)]
    pub ty: Option<TypeExpr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePortParams {
    pub node: String,
    pub direction: PortDirection,
    pub from: String,
    pub to: String,
}

// ---- edge operations ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddEdgeParams {
    pub from: String,
    pub from_port: String,
    pub to: String,
    pub to_port: String,
    #[serde(default)]
    pub order_before: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveEdgeParams {
    pub from: String,
    pub from_port: String,
    pub to: String,
    pub to_port: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertAdapterParams {
    pub from: String,
    pub from_port: String,
    pub to: String,
    pub to_port: String,
    /// Human name for the adapter node; derived from the ports when absent.
    #[serde(default)]
    pub name: Option<String>,
}

// ---- refactoring operations ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitPartSpec {
    pub name: String,
    /// Original output port names this part claims.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Original input port names this part claims.
    #[serde(default)]
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitNodeParams {
    pub node: String,
    pub parts: Vec<SplitPartSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeNodesParams {
    pub nodes: Vec<String>,
    pub name: String,
}

// ---- patch, validation, exports ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchOp {
    /// One of `add`, `remove`, `replace`.
    pub op: String,
    /// JSON-Pointer path into the document.
    pub path: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchParams {
    pub ops: Vec<PatchOp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSnapshotParams {
    pub format: SnapshotFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphvizView {
    Rpg,
    Impl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportGraphvizParams {
    pub view: GraphvizView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateCompatibilityParams {
    pub source: Option<TypeExpr>,
    pub target: Option<TypeExpr>,
}
