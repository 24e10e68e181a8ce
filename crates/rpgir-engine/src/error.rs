//! Typed operation errors surfaced on the tool boundary.
//!
//! Every failure an operation can produce is an [`OpError`]: a stable wire
//! [`ErrorCode`] plus a human message. Domain errors abort the transaction
//! before persistence; the document is left exactly as it was.

use serde::{Deserialize, Serialize};

use rpgir_core::{CoreError, ErrorCode};
use rpgir_store::StoreError;

/// One typed `(code, message)` failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct OpError {
    pub code: ErrorCode,
    pub message: String,
}

impl OpError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        OpError {
            code,
            message: message.into(),
        }
    }

    pub fn schema_invalid(message: impl Into<String>) -> Self {
        OpError::new(ErrorCode::SchemaInvalid, message)
    }

    pub fn invalid_phase(message: impl Into<String>) -> Self {
        OpError::new(ErrorCode::InvalidPhase, message)
    }

    pub fn nothing_to_do(message: impl Into<String>) -> Self {
        OpError::new(ErrorCode::NothingToDo, message)
    }

    pub fn constraint_violation(message: impl Into<String>) -> Self {
        OpError::new(ErrorCode::ConstraintViolation, message)
    }
}

impl From<CoreError> for OpError {
    fn from(err: CoreError) -> Self {
        OpError::new(err.code(), err.to_string())
    }
}

impl From<StoreError> for OpError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::RevisionConflict { .. } => ErrorCode::StaleRev,
            _ => ErrorCode::SchemaInvalid,
        };
        OpError::new(code, err.to_string())
    }
}
