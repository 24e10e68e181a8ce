//! Generic JSON-Patch application for edits outside the specialized tool set.
//!
//! Supports `add`, `remove`, and `replace` over the whole document tree. The
//! document stays strongly typed everywhere else; only this boundary works on
//! the generic JSON view, converting back to the typed model after patching.
//! Any traversal or type failure is wrapped as `PATCH_FAILED`, as is any
//! attempt to touch the engine-owned `phase`, `rev`, or `hash` fields.

use serde_json::{json, Value};

use rpgir_core::document::Document;
use rpgir_core::ErrorCode;

use crate::error::OpError;
use crate::tools::{PatchOp, PatchParams};
use crate::txn::MutationOutcome;

pub fn patch_ir(doc: &mut Document, params: PatchParams) -> Result<MutationOutcome, OpError> {
    if params.ops.is_empty() {
        return Ok(MutationOutcome::unchanged(json!({"applied": 0})));
    }
    let mut tree = serde_json::to_value(&*doc)
        .map_err(|e| patch_failed(format!("document serialization failed: {e}")))?;
    for op in &params.ops {
        apply_op(&mut tree, op)?;
    }
    let patched: Document = serde_json::from_value(tree)
        .map_err(|e| patch_failed(format!("patched document is not a valid plan: {e}")))?;
    // The lifecycle fields are engine-owned: the phase only moves through
    // validation, and rev/hash only through the commit path.
    if patched.phase != doc.phase || patched.rev != doc.rev || patched.hash != doc.hash {
        return Err(patch_failed(
            "the phase, rev, and hash fields are engine-managed and cannot be patched",
        ));
    }
    let applied = params.ops.len();
    let changed = patched != *doc;
    *doc = patched;
    let result = json!({ "applied": applied });
    if changed {
        Ok(MutationOutcome::changed(result))
    } else {
        Ok(MutationOutcome::unchanged(result))
    }
}

fn patch_failed(message: impl Into<String>) -> OpError {
    OpError::new(ErrorCode::PatchFailed, message)
}

fn apply_op(tree: &mut Value, op: &PatchOp) -> Result<(), OpError> {
    let tokens = parse_pointer(&op.path)?;
    match op.op.as_str() {
        "add" => {
            let value = op
                .value
                .clone()
                .ok_or_else(|| patch_failed(format!("add at '{}' needs a value", op.path)))?;
            add(tree, &tokens, value, &op.path)
        }
        "replace" => {
            let value = op
                .value
                .clone()
                .ok_or_else(|| patch_failed(format!("replace at '{}' needs a value", op.path)))?;
            replace(tree, &tokens, value, &op.path)
        }
        "remove" => remove(tree, &tokens, &op.path),
        other => Err(patch_failed(format!("unsupported patch op '{other}'"))),
    }
}

/// Splits a JSON-Pointer into unescaped tokens (`~1` -> `/`, `~0` -> `~`).
fn parse_pointer(path: &str) -> Result<Vec<String>, OpError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(patch_failed(format!("pointer '{path}' must start with '/'")));
    };
    Ok(rest
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Walks to the parent of the pointer's final token.
fn walk<'a>(tree: &'a mut Value, tokens: &[String], path: &str) -> Result<&'a mut Value, OpError> {
    let mut cursor = tree;
    for token in tokens {
        cursor = match cursor {
            Value::Object(map) => map
                .get_mut(token)
                .ok_or_else(|| patch_failed(format!("no key '{token}' while walking '{path}'")))?,
            Value::Array(items) => {
                let index: usize = token
                    .parse()
                    .map_err(|_| patch_failed(format!("bad array index '{token}' in '{path}'")))?;
                items
                    .get_mut(index)
                    .ok_or_else(|| patch_failed(format!("index {index} out of bounds in '{path}'")))?
            }
            _ => return Err(patch_failed(format!("cannot traverse scalar at '{path}'"))),
        };
    }
    Ok(cursor)
}

fn add(tree: &mut Value, tokens: &[String], value: Value, path: &str) -> Result<(), OpError> {
    let Some((last, parents)) = tokens.split_last() else {
        *tree = value;
        return Ok(());
    };
    let parent = walk(tree, parents, path)?;
    match parent {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let index: usize = last
                .parse()
                .map_err(|_| patch_failed(format!("bad array index '{last}' in '{path}'")))?;
            if index > items.len() {
                return Err(patch_failed(format!("index {index} out of bounds in '{path}'")));
            }
            items.insert(index, value);
            Ok(())
        }
        _ => Err(patch_failed(format!("cannot add into scalar at '{path}'"))),
    }
}

fn replace(tree: &mut Value, tokens: &[String], value: Value, path: &str) -> Result<(), OpError> {
    let target = walk(tree, tokens, path)?;
    *target = value;
    Ok(())
}

fn remove(tree: &mut Value, tokens: &[String], path: &str) -> Result<(), OpError> {
    let Some((last, parents)) = tokens.split_last() else {
        return Err(patch_failed("cannot remove the document root"));
    };
    let parent = walk(tree, parents, path)?;
    match parent {
        Value::Object(map) => {
            map.remove(last)
                .ok_or_else(|| patch_failed(format!("no key '{last}' to remove at '{path}'")))?;
            Ok(())
        }
        Value::Array(items) => {
            let index: usize = last
                .parse()
                .map_err(|_| patch_failed(format!("bad array index '{last}' in '{path}'")))?;
            if index >= items.len() {
                return Err(patch_failed(format!("index {index} out of bounds in '{path}'")));
            }
            items.remove(index);
            Ok(())
        }
        _ => Err(patch_failed(format!("cannot remove from scalar at '{path}'"))),
    }
}
