//! Core error types and the stable wire error-code enum.
//!
//! [`ErrorCode`] is part of the wire contract consumed by the planning agent:
//! the serialized names are stable strings and must never change. [`CoreError`]
//! covers failures raised by the document data model itself; higher layers map
//! it onto an [`ErrorCode`] via [`CoreError::code`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes returned on the tool surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SchemaInvalid,
    DupNodeId,
    MissingNode,
    MissingPort,
    UnconnectedRequiredInput,
    Cycle,
    TypeMismatch,
    ConstraintViolation,
    PolicyViolation,
    InvalidPhase,
    NothingToDo,
    StaleRev,
    PatchFailed,
}

impl ErrorCode {
    /// The wire string for this code (same as its serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SchemaInvalid => "SCHEMA_INVALID",
            ErrorCode::DupNodeId => "DUP_NODE_ID",
            ErrorCode::MissingNode => "MISSING_NODE",
            ErrorCode::MissingPort => "MISSING_PORT",
            ErrorCode::UnconnectedRequiredInput => "UNCONNECTED_REQUIRED_INPUT",
            ErrorCode::Cycle => "CYCLE",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::ConstraintViolation => "CONSTRAINT_VIOLATION",
            ErrorCode::PolicyViolation => "POLICY_VIOLATION",
            ErrorCode::InvalidPhase => "INVALID_PHASE",
            ErrorCode::NothingToDo => "NOTHING_TO_DO",
            ErrorCode::StaleRev => "STALE_REV",
            ErrorCode::PatchFailed => "PATCH_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the rpgir-core document model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node id was not found in the document.
    #[error("node not found: '{id}'")]
    NodeNotFound { id: String },

    /// A port was not found on the given node.
    #[error("port not found: '{node}' has no {direction} port '{port}'")]
    PortNotFound {
        node: String,
        direction: String,
        port: String,
    },

    /// Attempting to add a node whose id already exists.
    #[error("duplicate node id: '{id}'")]
    DuplicateNodeId { id: String },

    /// Attempting to add a port whose name already exists on the node.
    #[error("duplicate port name: '{node}' already has {direction} port '{port}'")]
    DuplicatePortName {
        node: String,
        direction: String,
        port: String,
    },

    /// An identifier failed the id/port-name grammar.
    #[error("invalid identifier: '{value}'")]
    InvalidIdentifier { value: String },
}

impl CoreError {
    /// Maps this error onto the stable wire code.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::NodeNotFound { .. } => ErrorCode::MissingNode,
            CoreError::PortNotFound { .. } => ErrorCode::MissingPort,
            CoreError::DuplicateNodeId { .. } => ErrorCode::DupNodeId,
            CoreError::DuplicatePortName { .. } => ErrorCode::SchemaInvalid,
            CoreError::InvalidIdentifier { .. } => ErrorCode::SchemaInvalid,
        }
    }
}
