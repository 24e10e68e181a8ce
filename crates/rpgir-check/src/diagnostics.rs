//! Validation diagnostics with stable wire codes and location context.
//!
//! [`ValidationError`] carries enough context for the calling agent to apply
//! a fix without further graph queries: the stable [`ErrorCode`], a human
//! message, and the node/port/edge the error points at where applicable.

use rpgir_core::ErrorCode;
use serde::{Deserialize, Serialize};

/// One validation finding. Validation never throws; it accumulates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Composite edge key `{from}.{fromPort}->{to}.{toPort}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<String>,
}

impl ValidationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ValidationError {
            code,
            message: message.into(),
            node: None,
            port: None,
            edge: None,
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn with_edge(mut self, edge: impl Into<String>) -> Self {
        self.edge = Some(edge.into());
        self
    }
}

/// Aggregate counts, computed on every full validation even when errors exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub nodes: usize,
    pub edges: usize,
    pub unconnected_required_inputs: usize,
    pub type_mismatches: usize,
    pub cycles: usize,
}

/// Result of a full validation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
