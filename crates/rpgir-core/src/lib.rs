pub mod canonical;
pub mod document;
pub mod error;
pub mod ident;
pub mod types;

// Re-export commonly used types
pub use canonical::{canonical_value, canonicalize};
pub use document::{
    Barrel, Constraints, Contracts, Document, EdgeDef, FileEntry, FileLayout, LicensePolicy,
    NodeDef, NodeKind, Phase, Policy, PortDef, PortDirection, ProjectMeta,
};
pub use error::{CoreError, ErrorCode};
pub use types::{CoercionPlan, FieldCoercion, ScalarCoercion, ScalarName, TypeExpr};
