//! Deterministic file-layout planning.
//!
//! For every node (in sorted id order) the planner resolves a language, a
//! directory, and a canonical file base, then emits one code file and one
//! test file. TypeScript directories additionally collect barrel exports.
//! The layout is a derived projection stored on the document and recomputed
//! wholesale on each call; it is never independently mutated.

use std::collections::{BTreeMap, HashSet};

use serde_json::json;

use rpgir_core::document::{Barrel, Document, FileEntry, FileLayout, NodeDef, Phase};

use crate::error::OpError;
use crate::ops::ensure_phase;
use crate::txn::MutationOutcome;

const DEFAULT_LANGUAGE: &str = "typescript";

/// Plans the file layout and stores it on the document.
pub fn plan_file_layout(doc: &mut Document) -> Result<MutationOutcome, OpError> {
    ensure_phase(doc, &[Phase::Typing, Phase::Ready], "plan_file_layout")?;

    let mut nodes: Vec<&NodeDef> = doc.nodes.iter().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut files = Vec::with_capacity(nodes.len());
    let mut seen_paths: HashSet<String> = HashSet::new();
    let mut ts_exports: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for node in nodes {
        let language = resolve_language(doc, node);
        let ext = extension(&language);
        let kind = node.kind.as_str();
        let dir = doc
            .constraints
            .policy
            .dir_overrides
            .get(kind)
            .cloned()
            .unwrap_or_else(|| default_dir(&language, kind));
        let base = file_base(&node.id);

        let path = format!("{dir}/{base}.{ext}");
        let test_path = test_path_for(&language, &dir, kind, &base, ext);
        for candidate in [&path, &test_path] {
            if !seen_paths.insert(candidate.clone()) {
                return Err(OpError::schema_invalid(format!("PATH_COLLISION: {candidate}")));
            }
        }

        if matches!(language.as_str(), "typescript") {
            ts_exports.entry(dir.clone()).or_default().push(base.clone());
        }

        files.push(FileEntry {
            node: node.id.clone(),
            path,
            test_path,
            language,
        });
    }

    let barrels = ts_exports
        .into_iter()
        .map(|(dir, mut exports)| {
            exports.sort();
            Barrel { dir, exports }
        })
        .collect();

    let layout = FileLayout { files, barrels };
    let result = json!({ "layout": layout });
    let changed = doc.layout.as_ref() != Some(&layout);
    doc.layout = Some(layout);
    if changed {
        Ok(MutationOutcome::changed(result))
    } else {
        Ok(MutationOutcome::unchanged(result))
    }
}

fn resolve_language(doc: &Document, node: &NodeDef) -> String {
    node.language
        .clone()
        .or_else(|| doc.project.default_language.clone())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
        .to_ascii_lowercase()
}

fn extension(language: &str) -> &str {
    match language {
        "typescript" => "ts",
        "javascript" => "js",
        "python" => "py",
        "rust" => "rs",
        "go" => "go",
        other => other,
    }
}

fn default_dir(language: &str, kind: &str) -> String {
    match language {
        "go" => format!("internal/{kind}"),
        _ => format!("src/{kind}"),
    }
}

/// Canonical file base for a node id: `@` becomes `-v` and dots become
/// dashes, so `fetch-data@1.2` maps to `fetch-data-v1-2`.
fn file_base(id: &str) -> String {
    id.replace('@', "-v").replace('.', "-")
}

fn test_path_for(language: &str, dir: &str, kind: &str, base: &str, ext: &str) -> String {
    match language {
        "python" => format!("{dir}/test_{base}.py"),
        "rust" => format!("{dir}/{base}_test.rs"),
        "go" => format!("{dir}/{base}_test.go"),
        _ => format!("tests/{kind}/{base}.test.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpgir_core::document::NodeKind;
    use rpgir_core::ErrorCode;

    fn doc_in_typing() -> Document {
        let mut doc = Document::new("demo", "demo project");
        doc.phase = Phase::Typing;
        doc
    }

    fn node(id: &str, kind: NodeKind, language: Option<&str>) -> NodeDef {
        let mut n = NodeDef::new(id, kind, "a planned unit");
        n.language = language.map(str::to_string);
        n
    }

    #[test]
    fn typescript_defaults_with_test_tree_and_barrels() {
        let mut doc = doc_in_typing();
        doc.nodes.push(node("fetch-data@1", NodeKind::Module, None));
        doc.nodes.push(node("store-data@1", NodeKind::Module, None));
        plan_file_layout(&mut doc).unwrap();
        let layout = doc.layout.unwrap();
        assert_eq!(layout.files[0].path, "src/module/fetch-data-v1.ts");
        assert_eq!(
            layout.files[0].test_path,
            "tests/module/fetch-data-v1.test.ts"
        );
        assert_eq!(layout.barrels.len(), 1);
        assert_eq!(layout.barrels[0].dir, "src/module");
        assert_eq!(
            layout.barrels[0].exports,
            vec!["fetch-data-v1", "store-data-v1"]
        );
    }

    #[test]
    fn per_language_conventions() {
        let mut doc = doc_in_typing();
        doc.nodes.push(node("pyworker@1", NodeKind::Atom, Some("python")));
        doc.nodes.push(node("rsworker@1", NodeKind::Atom, Some("rust")));
        doc.nodes.push(node("goworker@1", NodeKind::Atom, Some("go")));
        plan_file_layout(&mut doc).unwrap();
        let layout = doc.layout.unwrap();
        let by_node: std::collections::HashMap<&str, &FileEntry> =
            layout.files.iter().map(|f| (f.node.as_str(), f)).collect();
        assert_eq!(by_node["pyworker@1"].path, "src/atom/pyworker-v1.py");
        assert_eq!(by_node["pyworker@1"].test_path, "src/atom/test_pyworker-v1.py");
        assert_eq!(by_node["rsworker@1"].test_path, "src/atom/rsworker-v1_test.rs");
        assert_eq!(by_node["goworker@1"].path, "internal/atom/goworker-v1.go");
        assert!(layout.barrels.is_empty());
    }

    #[test]
    fn dir_overrides_win() {
        let mut doc = doc_in_typing();
        doc.constraints
            .policy
            .dir_overrides
            .insert("infra".into(), "ops/stack".into());
        doc.nodes.push(node("db@1", NodeKind::Infra, None));
        plan_file_layout(&mut doc).unwrap();
        assert_eq!(doc.layout.unwrap().files[0].path, "ops/stack/db-v1.ts");
    }

    #[test]
    fn version_dots_become_dashes() {
        assert_eq!(file_base("svc@1.2.3"), "svc-v1-2-3");
    }

    #[test]
    fn path_collision_is_schema_invalid() {
        let mut doc = doc_in_typing();
        // Same directory, ids that collapse to the same base.
        doc.nodes.push(node("svc.api@1", NodeKind::Module, None));
        doc.nodes.push(node("svc-api@1", NodeKind::Module, None));
        let err = plan_file_layout(&mut doc).unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaInvalid);
        assert!(err.message.starts_with("PATH_COLLISION:"));
    }

    #[test]
    fn replanning_an_unchanged_graph_is_a_no_op() {
        let mut doc = doc_in_typing();
        doc.nodes.push(node("fetch-data@1", NodeKind::Module, None));
        assert!(plan_file_layout(&mut doc).unwrap().changed);
        assert!(!plan_file_layout(&mut doc).unwrap().changed);
    }

    #[test]
    fn rejected_in_skeleton() {
        let mut doc = Document::new("demo", "demo");
        assert_eq!(
            plan_file_layout(&mut doc).unwrap_err().code,
            ErrorCode::InvalidPhase
        );
    }
}
