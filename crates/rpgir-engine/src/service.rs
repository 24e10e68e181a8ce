//! The tool surface: one [`PlanSession`] per stored plan document, exposing
//! every tool as a method plus a string-keyed [`PlanSession::dispatch`] for
//! transport layers.
//!
//! Mutating tools run through the transaction wrapper in [`crate::txn`];
//! read-only tools go through [`crate::txn::run_query`]. `start_session` is
//! the only tool allowed to create the document.

use serde_json::{json, Value};
use tracing::info;

use rpgir_core::{canonicalize, Document};
use rpgir_store::{content_hash, DocumentStore, SaveOptions, StoreError};

use crate::error::OpError;
use crate::export;
use crate::layout;
use crate::ops;
use crate::schedule;
use crate::tools::*;
use crate::txn::{run_mutation, run_query};

/// A session over one plan document.
pub struct PlanSession<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> PlanSession<S> {
    pub fn new(store: S) -> Self {
        PlanSession { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- session ----

    /// Creates the plan document, or reports the existing one. Idempotent:
    /// calling it on an existing document is a success, not an error.
    pub fn start_session(
        &mut self,
        request_id: Option<&str>,
        params: StartSessionParams,
    ) -> ToolResponse {
        if let Some(id) = request_id {
            if let Some(cached) = self.store.get_response(id) {
                if let Ok(response) = serde_json::from_value::<ToolResponse>(cached) {
                    return response;
                }
            }
        }

        match self.store.load() {
            Ok(existing) => {
                let response = ToolResponse::success(
                    json!({
                        "project": existing.project.name,
                        "phase": existing.phase,
                        "rev": existing.rev,
                        "created": false,
                    }),
                    existing.hash,
                );
                self.cache(request_id, &response);
                response
            }
            Err(StoreError::NotFound) => {
                let mut doc = Document::new(&params.project, &params.summary);
                doc.project.default_language = params.default_language.clone();
                let mut doc = canonicalize(&doc);
                doc.rev = 1;
                doc.hash = content_hash(&doc);
                let save = self.store.save(
                    &doc,
                    SaveOptions {
                        expected_rev: 0,
                        allow_create: true,
                    },
                );
                match save {
                    Ok(()) => {
                        info!(project = %doc.project.name, hash = %doc.hash, "session started");
                        let response = ToolResponse::success(
                            json!({
                                "project": doc.project.name,
                                "phase": doc.phase,
                                "rev": doc.rev,
                                "created": true,
                            }),
                            doc.hash,
                        );
                        self.cache(request_id, &response);
                        response
                    }
                    Err(err) => ToolResponse::failure(vec![err.into()], ""),
                }
            }
            Err(err) => ToolResponse::failure(vec![err.into()], ""),
        }
    }

    fn cache(&mut self, request_id: Option<&str>, response: &ToolResponse) {
        if let Some(id) = request_id {
            if let Ok(value) = serde_json::to_value(response) {
                self.store.set_response(id, value);
            }
        }
    }

    // ---- graph edits ----

    pub fn set_constraints(
        &mut self,
        request_id: Option<&str>,
        params: SetConstraintsParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "set_constraints", request_id, |doc, _| {
            ops::node::set_constraints(doc, params)
        })
    }

    pub fn add_node(&mut self, request_id: Option<&str>, params: AddNodeParams) -> ToolResponse {
        run_mutation(&mut self.store, "add_node", request_id, |doc, _| {
            ops::node::add_node(doc, params)
        })
    }

    pub fn update_node(
        &mut self,
        request_id: Option<&str>,
        params: UpdateNodeParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "update_node", request_id, |doc, _| {
            ops::node::update_node(doc, params)
        })
    }

    pub fn delete_node(
        &mut self,
        request_id: Option<&str>,
        params: DeleteNodeParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "delete_node", request_id, |doc, _| {
            ops::node::delete_node(doc, params)
        })
    }

    pub fn set_contracts(
        &mut self,
        request_id: Option<&str>,
        params: SetContractsParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "set_contracts", request_id, |doc, _| {
            ops::node::set_contracts(doc, params)
        })
    }

    pub fn add_port(&mut self, request_id: Option<&str>, params: AddPortParams) -> ToolResponse {
        run_mutation(&mut self.store, "add_port", request_id, |doc, _| {
            ops::port::add_port(doc, params)
        })
    }

    pub fn remove_port(
        &mut self,
        request_id: Option<&str>,
        params: RemovePortParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "remove_port", request_id, |doc, _| {
            ops::port::remove_port(doc, params)
        })
    }

    pub fn set_port_type(
        &mut self,
        request_id: Option<&str>,
        params: SetPortTypeParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "set_port_type", request_id, |doc, _| {
            ops::port::set_port_type(doc, params)
        })
    }

    pub fn rename_port(
        &mut self,
        request_id: Option<&str>,
        params: RenamePortParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "rename_port", request_id, |doc, _| {
            ops::port::rename_port(doc, params)
        })
    }

    pub fn add_edge(&mut self, request_id: Option<&str>, params: AddEdgeParams) -> ToolResponse {
        run_mutation(&mut self.store, "add_edge", request_id, |doc, _| {
            ops::edge::add_edge(doc, params)
        })
    }

    pub fn remove_edge(
        &mut self,
        request_id: Option<&str>,
        params: RemoveEdgeParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "remove_edge", request_id, |doc, _| {
            ops::edge::remove_edge(doc, params)
        })
    }

    pub fn insert_adapter(
        &mut self,
        request_id: Option<&str>,
        params: InsertAdapterParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "insert_adapter", request_id, |doc, _| {
            ops::edge::insert_adapter(doc, params)
        })
    }

    pub fn split_node(
        &mut self,
        request_id: Option<&str>,
        params: SplitNodeParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "split_node", request_id, |doc, _| {
            ops::refactor::split_node(doc, params)
        })
    }

    pub fn merge_nodes(
        &mut self,
        request_id: Option<&str>,
        params: MergeNodesParams,
    ) -> ToolResponse {
        run_mutation(&mut self.store, "merge_nodes", request_id, |doc, _| {
            ops::refactor::merge_nodes(doc, params)
        })
    }

    pub fn patch_ir(&mut self, request_id: Option<&str>, params: PatchParams) -> ToolResponse {
        run_mutation(&mut self.store, "patch_ir", request_id, |doc, _| {
            ops::patch::patch_ir(doc, params)
        })
    }

    // ---- lifecycle ----

    pub fn validate_graph(&mut self, request_id: Option<&str>) -> ToolResponse {
        run_mutation(&mut self.store, "validate_graph", request_id, |doc, _| {
            ops::validate::validate_graph(doc)
        })
    }

    pub fn canonicalize_ir(&mut self, request_id: Option<&str>) -> ToolResponse {
        run_mutation(&mut self.store, "canonicalize_ir", request_id, |doc, _| {
            ops::validate::canonicalize_ir(doc)
        })
    }

    pub fn plan_file_layout(&mut self, request_id: Option<&str>) -> ToolResponse {
        run_mutation(&mut self.store, "plan_file_layout", request_id, |doc, _| {
            layout::plan_file_layout(doc)
        })
    }

    // ---- read-only tools ----

    pub fn get_ir(&self) -> ToolResponse {
        run_query(&self.store, "get_ir", |doc| {
            serde_json::to_value(canonicalize(doc))
                .map_err(|e| OpError::schema_invalid(format!("serialization failed: {e}")))
        })
    }

    pub fn get_validation_errors(&self) -> ToolResponse {
        run_query(&self.store, "get_validation_errors", |doc| {
            Ok(export::validation_errors(doc))
        })
    }

    pub fn export_snapshot(&self, params: ExportSnapshotParams) -> ToolResponse {
        run_query(&self.store, "export_snapshot", |doc| {
            export::export_snapshot(doc, params.format)
        })
    }

    pub fn export_graphviz(&self, params: ExportGraphvizParams) -> ToolResponse {
        run_query(&self.store, "export_graphviz", |doc| {
            export::export_graphviz(doc, params.view)
        })
    }

    pub fn emit_impl_batches(&self) -> ToolResponse {
        run_query(&self.store, "emit_impl_batches", schedule::emit_impl_batches)
    }

    pub fn validate_compatibility(&self, params: ValidateCompatibilityParams) -> ToolResponse {
        run_query(&self.store, "validate_compatibility", |_| {
            Ok(export::compatibility(
                params.source.as_ref(),
                params.target.as_ref(),
            ))
        })
    }

    pub fn score_ir(&self) -> ToolResponse {
        run_query(&self.store, "score_ir", |doc| Ok(export::score_ir(doc)))
    }

    pub fn get_rpg_view(&self) -> ToolResponse {
        run_query(&self.store, "get_rpg_view", |doc| Ok(export::rpg_view(doc)))
    }

    pub fn get_impl_view(&self) -> ToolResponse {
        run_query(&self.store, "get_impl_view", export::impl_view)
    }

    // ---- string-keyed dispatch ----

    /// Routes one named tool call. Unknown tools and malformed parameters are
    /// reported as `SCHEMA_INVALID`, never as a transport error.
    pub fn dispatch(&mut self, tool: &str, request_id: Option<&str>, params: Value) -> ToolResponse {
        match tool {
            "start_session" => match parse(params) {
                Ok(p) => self.start_session(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "get_ir" => self.get_ir(),
            "set_constraints" => match parse(params) {
                Ok(p) => self.set_constraints(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "add_node" => match parse(params) {
                Ok(p) => self.add_node(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "update_node" => match parse(params) {
                Ok(p) => self.update_node(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "delete_node" => match parse(params) {
                Ok(p) => self.delete_node(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "set_contracts" => match parse(params) {
                Ok(p) => self.set_contracts(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "add_port" => match parse(params) {
                Ok(p) => self.add_port(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "remove_port" => match parse(params) {
                Ok(p) => self.remove_port(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "set_port_type" => match parse(params) {
                Ok(p) => self.set_port_type(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "rename_port" => match parse(params) {
                Ok(p) => self.rename_port(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "add_edge" => match parse(params) {
                Ok(p) => self.add_edge(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "remove_edge" => match parse(params) {
                Ok(p) => self.remove_edge(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "insert_adapter" => match parse(params) {
                Ok(p) => self.insert_adapter(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "split_node" => match parse(params) {
                Ok(p) => self.split_node(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "merge_nodes" => match parse(params) {
                Ok(p) => self.merge_nodes(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "patch_ir" => match parse(params) {
                Ok(p) => self.patch_ir(request_id, p),
                Err(e) => self.parameter_failure(e),
            },
            "validate_graph" => self.validate_graph(request_id),
            "canonicalize_ir" => self.canonicalize_ir(request_id),
            "plan_file_layout" => self.plan_file_layout(request_id),
            "get_validation_errors" => self.get_validation_errors(),
            "export_snapshot" => match parse(params) {
                Ok(p) => self.export_snapshot(p),
                Err(e) => self.parameter_failure(e),
            },
            "export_graphviz" => match parse(params) {
                Ok(p) => self.export_graphviz(p),
                Err(e) => self.parameter_failure(e),
            },
            "emit_impl_batches" => self.emit_impl_batches(),
            "validate_compatibility" => match parse(params) {
                Ok(p) => self.validate_compatibility(p),
                Err(e) => self.parameter_failure(e),
            },
            "score_ir" => self.score_ir(),
            "get_rpg_view" => self.get_rpg_view(),
            "get_impl_view" => self.get_impl_view(),
            other => self.parameter_failure(OpError::schema_invalid(format!(
                "unknown tool '{other}'"
            ))),
        }
    }

    fn parameter_failure(&self, error: OpError) -> ToolResponse {
        let hash = self.store.load().map(|d| d.hash).unwrap_or_default();
        ToolResponse::failure(vec![error], hash)
    }
}

fn parse<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, OpError> {
    serde_json::from_value(params)
        .map_err(|e| OpError::schema_invalid(format!("invalid parameters: {e}")))
}
