//! The coercion planner.
//!
//! When direct assignability fails, `add_edge` asks this planner for a
//! deterministic value transformation between the two port types. The planner
//! follows a fixed, conservative table policy:
//!
//! - scalars: String<->Number and String<->Bool, only in the listed directions;
//! - arrays: recurse on the element type;
//! - records: every target field must be satisfied by an exact source field
//!   name or its camelCase/snake_case transform -- no partial plans;
//! - opaque units: Celsius<->Fahrenheit, Milliseconds<->Seconds,
//!   BigInt<->String.
//!
//! The record rename heuristic is a guess: two unrelated fields that happen to
//! share a converted name will be paired. Callers accept that risk.

use rpgir_core::{CoercionPlan, FieldCoercion, ScalarCoercion, ScalarName, TypeExpr};

/// Plans a coercion from `source` to `target`.
///
/// A missing type on either side is trivially compatible (`id`), as are
/// structurally identical types. Returns `None` when no deterministic
/// transformation exists.
pub fn try_plan_coercion(
    source: Option<&TypeExpr>,
    target: Option<&TypeExpr>,
) -> Option<CoercionPlan> {
    let (source, target) = match (source, target) {
        (Some(s), Some(t)) => (s, t),
        _ => return Some(CoercionPlan::Id),
    };
    if source.normalized() == target.normalized() {
        return Some(CoercionPlan::Id);
    }

    match (source, target) {
        (TypeExpr::Scalar { name: s }, TypeExpr::Scalar { name: t }) => {
            scalar_table(*s, *t).map(|op| CoercionPlan::Scalar { op })
        }
        (TypeExpr::Array { of: s }, TypeExpr::Array { of: t }) => {
            let element = try_plan_coercion(Some(s), Some(t))?;
            Some(CoercionPlan::Array {
                element: Box::new(element),
            })
        }
        (TypeExpr::Record { fields: sf }, TypeExpr::Record { fields: tf }) => {
            let mut fields = Vec::with_capacity(tf.len());
            for (target_name, target_ty) in tf {
                let (source_name, source_ty) = find_source_field(sf, target_name)?;
                let plan = try_plan_coercion(Some(source_ty), Some(target_ty))?;
                fields.push(FieldCoercion {
                    target: target_name.clone(),
                    source: source_name,
                    plan,
                });
            }
            Some(CoercionPlan::Record { fields })
        }
        (TypeExpr::Opaque { name: s }, TypeExpr::Opaque { name: t }) => {
            if unit_table(s, t) {
                Some(CoercionPlan::Unit {
                    from: s.clone(),
                    to: t.clone(),
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Fixed scalar conversion table. Unlisted directions fail.
fn scalar_table(source: ScalarName, target: ScalarName) -> Option<ScalarCoercion> {
    match (source, target) {
        (ScalarName::String, ScalarName::Number) => Some(ScalarCoercion::StringToNumber),
        (ScalarName::Number, ScalarName::String) => Some(ScalarCoercion::NumberToString),
        (ScalarName::String, ScalarName::Bool) => Some(ScalarCoercion::StringToBool),
        (ScalarName::Bool, ScalarName::String) => Some(ScalarCoercion::BoolToString),
        _ => None,
    }
}

/// Fixed unit-conversion table over opaque type names, both directions.
fn unit_table(source: &str, target: &str) -> bool {
    const PAIRS: [(&str, &str); 3] = [
        ("Celsius", "Fahrenheit"),
        ("Milliseconds", "Seconds"),
        ("BigInt", "String"),
    ];
    PAIRS
        .iter()
        .any(|(a, b)| (source == *a && target == *b) || (source == *b && target == *a))
}

/// Finds the source field satisfying a target field: exact name first, then
/// the camelCase/snake_case transform of the name.
fn find_source_field<'a>(
    source_fields: &'a indexmap::IndexMap<String, TypeExpr>,
    target_name: &str,
) -> Option<(String, &'a TypeExpr)> {
    if let Some(ty) = source_fields.get(target_name) {
        return Some((target_name.to_string(), ty));
    }
    for candidate in [snake_to_camel(target_name), camel_to_snake(target_name)] {
        if candidate != target_name {
            if let Some(ty) = source_fields.get(&candidate) {
                return Some((candidate, ty));
            }
        }
    }
    None
}

fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
