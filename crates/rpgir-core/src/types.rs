//! The RPGIR structural type system.
//!
//! [`TypeExpr`] is a closed, finite tree of type constructors attached to
//! ports: scalars, arrays, records, unions, nominal opaque units, and literal
//! types. There is no registry and no recursion -- every `TypeExpr` is a
//! self-contained value, which keeps canonicalization and hashing purely
//! structural.
//!
//! [`CoercionPlan`] is the serialized output of the coercion planner: a
//! deterministic, non-adapter value transformation attached to an edge whose
//! endpoint types differ but are reconcilable.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Scalar type names. Also used as the `value_type` of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarName {
    Number,
    String,
    Bool,
}

/// A structural type expression. Always a finite tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    /// Primitive scalar: number, string, or bool.
    Scalar { name: ScalarName },

    /// Homogeneous array, covariant in its element type.
    Array { of: Box<TypeExpr> },

    /// Structural record with named fields (width subtyping on assignment).
    Record { fields: IndexMap<String, TypeExpr> },

    /// Untagged union of alternatives.
    Union { options: Vec<TypeExpr> },

    /// Nominal domain unit, e.g. `Celsius`. Compared by name only.
    Opaque { name: String },

    /// Singleton type of one scalar value.
    Literal {
        value_type: ScalarName,
        value: serde_json::Value,
    },
}

impl TypeExpr {
    /// Returns the canonical form of this type: record fields sorted by key,
    /// union options sorted by their own canonical serialization. Idempotent.
    pub fn normalized(&self) -> TypeExpr {
        match self {
            TypeExpr::Scalar { .. } | TypeExpr::Opaque { .. } | TypeExpr::Literal { .. } => {
                self.clone()
            }
            TypeExpr::Array { of } => TypeExpr::Array {
                of: Box::new(of.normalized()),
            },
            TypeExpr::Record { fields } => {
                let mut sorted: Vec<(String, TypeExpr)> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.normalized()))
                    .collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                TypeExpr::Record {
                    fields: sorted.into_iter().collect(),
                }
            }
            TypeExpr::Union { options } => {
                let mut normalized: Vec<TypeExpr> =
                    options.iter().map(|o| o.normalized()).collect();
                normalized.sort_by_key(|o| {
                    serde_json::to_string(o).unwrap_or_default()
                });
                TypeExpr::Union {
                    options: normalized,
                }
            }
        }
    }

    /// Checks that a literal value actually inhabits its declared value type.
    pub fn literal_value_matches(value_type: ScalarName, value: &serde_json::Value) -> bool {
        match value_type {
            ScalarName::Number => value.is_number(),
            ScalarName::String => value.is_string(),
            ScalarName::Bool => value.is_boolean(),
        }
    }
}

/// A scalar-to-scalar conversion from the fixed coercion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarCoercion {
    StringToNumber,
    NumberToString,
    StringToBool,
    BoolToString,
}

/// One record field mapping in a record coercion plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCoercion {
    /// Field name on the target record.
    pub target: String,
    /// Field name on the source record (may differ via the rename heuristic).
    pub source: String,
    /// How the field value itself is transformed.
    pub plan: CoercionPlan,
}

/// A deterministic value transformation reconciling two structurally close
/// port types. Attached to edges by `add_edge` when direct assignability
/// fails but the planner finds a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoercionPlan {
    /// Identity -- the types are already compatible.
    Id,
    /// One lookup-table scalar conversion.
    Scalar { op: ScalarCoercion },
    /// Element-wise mapping over an array.
    Array { element: Box<CoercionPlan> },
    /// Per-field record mapping, possibly renaming fields.
    Record { fields: Vec<FieldCoercion> },
    /// Fixed unit conversion between two opaque domain types.
    Unit { from: String, to: String },
}

impl CoercionPlan {
    /// `true` for the identity plan.
    pub fn is_id(&self) -> bool {
        matches!(self, CoercionPlan::Id)
    }

    /// Short label for views and graphviz export, e.g. `scalar/stringToNumber`.
    pub fn label(&self) -> String {
        match self {
            CoercionPlan::Id => "id".to_string(),
            CoercionPlan::Scalar { op } => {
                let op = serde_json::to_value(op)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                format!("scalar/{op}")
            }
            CoercionPlan::Array { element } => format!("array[{}]", element.label()),
            CoercionPlan::Record { fields } => format!("record/{} fields", fields.len()),
            CoercionPlan::Unit { from, to } => format!("unit/{from}->{to}"),
        }
    }
}
