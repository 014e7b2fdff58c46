use crate::assembler::fragments::{json_content, Info, OperationFragment, Parameter, RequestBody};
use crate::assembler::tree::responses_reference;
use crate::assembler::Assembler;
use crate::dedup::{Deduplicator, PatternKey};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::identifier::schema_id;
use crate::model::{HttpMethod, SchemaKind};
use crate::route::RouteTemplate;
use crate::schema_inferencer::{infer, Schema};
use crate::traffic::{RouteGroup, TrafficSample};
use anyhow::Result;
use log::debug;
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Builds the document tree from route groups.
///
/// Each sample whose (route, method, status) pattern was not seen before in
/// this run contributes its leaf fragments; once a group is processed, one
/// operation fragment per method is written and the route's aggregation
/// nodes are regenerated. [`OpenApiBuilder::build`] then writes the
/// tree-wide indexes and `index.yml`.
pub struct OpenApiBuilder {
    info: Info,
    server_urls: Vec<String>,
    assembler: Assembler,
    dedup: Deduplicator,
    samples_seen: usize,
    duplicates_skipped: usize,
}

/// What a run produced, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub routes: usize,
    pub operations: usize,
    pub schemas: usize,
    pub samples: usize,
    pub patterns: usize,
    pub duplicates_skipped: usize,
    pub diagnostics: usize,
}

/// Per-operation state accumulated over the samples of one route group
#[derive(Debug)]
struct PendingOperation {
    operation_id: String,
    request_body_written: bool,
    /// Query parameters known so far, starting from what earlier runs recorded
    request_params: BTreeMap<String, Schema>,
    request_params_changed: bool,
}

impl PendingOperation {
    fn new(operation_id: String, recorded_params: Option<&Schema>) -> Self {
        let request_params = match recorded_params {
            Some(Schema::Object { properties, .. }) => properties.clone(),
            _ => BTreeMap::new(),
        };
        Self {
            operation_id,
            request_body_written: false,
            request_params,
            request_params_changed: false,
        }
    }

    /// Adds the members of an inferred query schema; the first schema seen
    /// for a name wins.
    fn merge_query(&mut self, query: Schema) {
        let Schema::Object { properties, .. } = query else {
            return;
        };
        for (name, schema) in properties {
            if let Entry::Vacant(slot) = self.request_params.entry(name) {
                slot.insert(schema);
                self.request_params_changed = true;
            }
        }
    }

    fn request_params_schema(&self) -> Schema {
        Schema::Object {
            properties: self.request_params.clone(),
            required: None,
        }
    }
}

impl OpenApiBuilder {
    /// Create a new builder writing through `assembler`, with default info
    pub fn new(assembler: Assembler) -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info {
                version: "1.0.0".to_string(),
                title: "Inferred API".to_string(),
                description: "API documentation inferred from recorded traffic".to_string(),
            },
            server_urls: Vec::new(),
            assembler,
            dedup: Deduplicator::new(),
            samples_seen: 0,
            duplicates_skipped: 0,
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: String) -> Self {
        self.info = Info {
            version,
            title,
            description,
        };
        self
    }

    pub fn with_servers(mut self, server_urls: Vec<String>) -> Self {
        self.server_urls = server_urls;
        self
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    /// Process every sample of one route group.
    ///
    /// # Errors
    ///
    /// Fails on an identifier collision under the reject policy, or when a
    /// fragment cannot be written.
    pub fn add_route_group(
        &mut self,
        group: &RouteGroup,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let template = &group.template;
        debug!("Adding route group: {} ({} samples)", template, group.samples.len());

        // `None` marks an operation skipped because of an identifier collision
        let mut operations: BTreeMap<HttpMethod, Option<PendingOperation>> = BTreeMap::new();

        for sample in &group.samples {
            self.samples_seen += 1;
            let key = PatternKey::new(template.clone(), sample.method, sample.status);
            if !self.dedup.observe(key) {
                self.duplicates_skipped += 1;
                continue;
            }

            if !operations.contains_key(&sample.method) {
                let registered = self
                    .assembler
                    .register_operation(template, sample.method, diagnostics)?;
                let params_id =
                    schema_id(sample.method, template.as_str(), SchemaKind::RequestParams);
                let pending = registered.map(|operation_id| {
                    PendingOperation::new(operation_id, self.assembler.tree().schema(&params_id))
                });
                operations.insert(sample.method, pending);
            }
            let Some(Some(pending)) = operations.get_mut(&sample.method) else {
                continue;
            };

            self.add_sample(template, sample, pending, diagnostics)?;
        }

        for (method, pending) in &operations {
            let Some(pending) = pending else {
                continue;
            };
            if pending.request_params_changed {
                let schema = pending.request_params_schema();
                self.assembler
                    .write_request_params_schema(template, *method, schema)?;
            }
            let fragment = self.operation_fragment(template, *method, pending, diagnostics);
            self.assembler.write_operation(template, *method, &fragment)?;
        }

        self.assembler.rebuild_route(template)
    }

    fn add_sample(
        &mut self,
        template: &RouteTemplate,
        sample: &TrafficSample,
        pending: &mut PendingOperation,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let method = sample.method;

        if !pending.request_body_written {
            if let Some(schema) = sample
                .request_body
                .as_ref()
                .and_then(|body| structured_schema(body, diagnostics))
            {
                self.assembler
                    .write_request_body_schema(template, method, schema.with_required())?;
                pending.request_body_written = true;
            }
        }

        if let Some(query) = &sample.query {
            if let Some(schema) = infer(&Value::Object(query.clone()), diagnostics) {
                pending.merge_query(schema);
            }
        }

        let response_schema_id = match sample
            .response_body
            .as_ref()
            .and_then(|body| structured_schema(body, diagnostics))
        {
            Some(schema) => Some(self.assembler.write_response_schema(
                template,
                method,
                sample.status,
                schema.with_required(),
            )?),
            None => None,
        };

        self.assembler
            .write_response(template, method, sample.status, response_schema_id.as_deref())
    }

    fn operation_fragment(
        &self,
        template: &RouteTemplate,
        method: HttpMethod,
        pending: &PendingOperation,
        diagnostics: &mut Diagnostics,
    ) -> OperationFragment {
        let mut parameters: Vec<Parameter> = template
            .placeholders()
            .into_iter()
            .map(Parameter::path)
            .collect();
        for (name, schema) in &pending.request_params {
            match schema.scalar_kind() {
                Some(kind) => parameters.push(Parameter::query(name.clone(), kind)),
                None => diagnostics.push(
                    DiagnosticKind::DroppedSchemaMember,
                    format!(
                        "query parameter '{}' of {} {} is a {}, not a scalar",
                        name,
                        method,
                        template,
                        schema.type_name()
                    ),
                ),
            }
        }

        // A body schema recorded by an earlier run still describes this operation
        let body_id = schema_id(method, template.as_str(), SchemaKind::RequestBody);
        let request_body = self
            .assembler
            .tree()
            .schema(&body_id)
            .map(|_| RequestBody {
                content: json_content(&body_id),
            });

        OperationFragment {
            summary: format!("{} {}", method, template),
            operation_id: pending.operation_id.clone(),
            parameters,
            request_body,
            responses: responses_reference(),
        }
    }

    /// Write the tree-wide indexes and `index.yml`
    pub fn build(mut self, diagnostics: &Diagnostics) -> Result<BuildSummary> {
        debug!("Building final document tree");
        self.assembler.finish(&self.info, &self.server_urls)?;

        let tree = self.assembler.tree();
        Ok(BuildSummary {
            routes: tree.route_count(),
            operations: tree.operation_count(),
            schemas: tree.schema_count(),
            samples: self.samples_seen,
            patterns: self.dedup.len(),
            duplicates_skipped: self.duplicates_skipped,
            diagnostics: diagnostics.len(),
        })
    }
}

/// Schema of an object or array body; scalar bodies get no component schema.
fn structured_schema(body: &Value, diagnostics: &mut Diagnostics) -> Option<Schema> {
    match body {
        Value::Object(_) | Value::Array(_) => infer(body, diagnostics),
        _ => None,
    }
}
