//! Structural assignability.
//!
//! `is_assignable(source, target)` answers whether a value of the source type
//! can flow into a port of the target type with no transformation at all.
//! When this fails, `add_edge` falls back to the coercion planner.

use rpgir_core::{ScalarName, TypeExpr};

/// Checks structural assignability of `source` into `target`.
///
/// Rules, in precedence order:
/// - source `Union`: every option must be assignable to the target;
/// - target `Union`: the source must be assignable to at least one option;
/// - `Literal` -> `Literal`: exact value-type and value match;
/// - `Literal` -> `Scalar`: widening, value type must equal the scalar name;
/// - `Scalar`/`Opaque`: nominal equality;
/// - `Array`: covariant in the element type;
/// - `Record`: width subtyping -- every target field must exist on the source
///   with an assignable type; extra source fields are ignored.
pub fn is_assignable(source: &TypeExpr, target: &TypeExpr) -> bool {
    if let TypeExpr::Union { options } = source {
        return options.iter().all(|opt| is_assignable(opt, target));
    }
    if let TypeExpr::Union { options } = target {
        return options.iter().any(|opt| is_assignable(source, opt));
    }

    match (source, target) {
        (
            TypeExpr::Literal {
                value_type: st,
                value: sv,
            },
            TypeExpr::Literal {
                value_type: tt,
                value: tv,
            },
        ) => st == tt && sv == tv,
        (TypeExpr::Literal { value_type, .. }, TypeExpr::Scalar { name }) => value_type == name,
        (TypeExpr::Scalar { name: s }, TypeExpr::Scalar { name: t }) => s == t,
        (TypeExpr::Opaque { name: s }, TypeExpr::Opaque { name: t }) => s == t,
        (TypeExpr::Array { of: s }, TypeExpr::Array { of: t }) => is_assignable(s, t),
        (TypeExpr::Record { fields: sf }, TypeExpr::Record { fields: tf }) => tf
            .iter()
            .all(|(name, tt)| sf.get(name).is_some_and(|st| is_assignable(st, tt))),
        _ => false,
    }
}

/// Shorthand used by the validators: optional types, where a missing type on
/// either side is trivially compatible.
pub fn ports_compatible(source: Option<&TypeExpr>, target: Option<&TypeExpr>) -> bool {
    match (source, target) {
        (Some(s), Some(t)) => is_assignable(s, t),
        _ => true,
    }
}
