//! Document tree assembler.
//!
//! Persists the inferred document as a tree of small YAML fragments linked by
//! relative references (see [`layout`] for the exact shape). Leaf fragments
//! are written as operations are processed; aggregation nodes (every
//! `_index.yml` that only lists references, the schema index and `index.yml`)
//! are regenerated from the in-memory [`tree::DocumentTree`], which is seeded
//! from whatever earlier runs left on disk. Content from earlier runs is
//! therefore kept, and re-running on the same input reproduces the same
//! aggregation nodes byte for byte.

pub mod fragments;
pub mod layout;
pub mod scanner;
pub mod tree;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::identifier::CollisionPolicy;
use crate::model::{HttpMethod, SchemaKind};
use crate::route::RouteTemplate;
use crate::schema_inferencer::Schema;
use crate::serializer::{read_yaml, write_yaml};
use anyhow::Result;
use fragments::{
    Components, Info, OperationFragment, Reference, ResponseFragment, RootDocument, Server,
};
use layout::{Layout, PATH_INDEX_REF};
use log::{debug, info};
use scanner::TreeScanner;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tree::DocumentTree;

pub const OPENAPI_VERSION: &str = "3.0.0";

/// Writes fragments into one output tree.
pub struct Assembler {
    layout: Layout,
    tree: DocumentTree,
    /// Routes whose aggregation nodes were already regenerated in this run
    rebuilt: BTreeSet<RouteTemplate>,
}

impl Assembler {
    /// Opens the tree rooted at `root`, loading what earlier runs left there.
    ///
    /// Schema fragments that cannot be read are reported and ignored.
    ///
    /// # Errors
    ///
    /// Fails if two existing operations claim the same identifier under
    /// [`CollisionPolicy::Reject`].
    pub fn open(
        root: PathBuf,
        policy: CollisionPolicy,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        let layout = Layout::new(root);
        let scan = TreeScanner::new(&layout).scan(diagnostics);
        let mut tree = DocumentTree::new(policy);

        for template in scan.routes {
            tree.add_route(template);
        }

        for response in scan.responses {
            if tree
                .register_operation(&response.template, response.method, diagnostics)?
                .is_some()
            {
                tree.add_response(&response.template, response.method, response.status);
            }
        }

        for location in scan.schemas {
            if tree
                .register_operation(&location.template, location.method, diagnostics)?
                .is_none()
            {
                continue;
            }
            match read_yaml::<Schema>(&location.path) {
                Ok(schema) => {
                    tree.add_schema(
                        &location.template,
                        location.method,
                        location.kind,
                        location.status,
                        schema,
                    );
                }
                Err(e) => diagnostics.push(DiagnosticKind::UnexpectedFragment, format!("{:#}", e)),
            }
        }

        info!(
            "Loaded existing tree at {}: {} routes, {} operations, {} schemas",
            layout.root().display(),
            tree.route_count(),
            tree.operation_count(),
            tree.schema_count()
        );

        Ok(Self {
            layout,
            tree,
            rebuilt: BTreeSet::new(),
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    /// Claims the identifier of an operation before any of its fragments are
    /// written. `Ok(None)` means the operation must be skipped.
    pub fn register_operation(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<String>> {
        Ok(self.tree.register_operation(template, method, diagnostics)?)
    }

    /// Writes `components/schemas/<route>/<method>/request_body.yml`.
    pub fn write_request_body_schema(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        schema: Schema,
    ) -> Result<String> {
        write_yaml(&schema, &self.layout.request_body_schema(template, method))?;
        Ok(self
            .tree
            .add_schema(template, method, SchemaKind::RequestBody, None, schema))
    }

    /// Writes `components/schemas/<route>/<method>/request_params.yml`.
    pub fn write_request_params_schema(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        schema: Schema,
    ) -> Result<String> {
        write_yaml(&schema, &self.layout.request_params_schema(template, method))?;
        Ok(self
            .tree
            .add_schema(template, method, SchemaKind::RequestParams, None, schema))
    }

    /// Writes `components/schemas/<route>/<method>/responses/<status>/_index.yml`.
    pub fn write_response_schema(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        status: u16,
        schema: Schema,
    ) -> Result<String> {
        write_yaml(&schema, &self.layout.response_schema(template, method, status))?;
        Ok(self
            .tree
            .add_schema(template, method, SchemaKind::Response, Some(status), schema))
    }

    /// Writes `paths/<route>/<method>/responses/<status>/_index.yml`.
    pub fn write_response(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        status: u16,
        schema_id: Option<&str>,
    ) -> Result<()> {
        let fragment = ResponseFragment::new(status, schema_id);
        write_yaml(&fragment, &self.layout.response_fragment(template, method, status))?;
        if !self.tree.add_response(template, method, status) {
            debug!("Response {} written for unregistered {} {}", status, method, template);
        }
        Ok(())
    }

    /// Writes `paths/<route>/<method>/_index.yml`.
    pub fn write_operation(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        fragment: &OperationFragment,
    ) -> Result<()> {
        write_yaml(fragment, &self.layout.operation_index(template, method))
    }

    /// Regenerates the route index and the response indexes of one route.
    pub fn rebuild_route(&mut self, template: &RouteTemplate) -> Result<()> {
        let Some(route) = self.tree.route(template) else {
            return Ok(());
        };

        for (method, operation) in &route.operations {
            if operation.statuses.is_empty() {
                continue;
            }
            write_yaml(
                &self.tree.response_index(template, *method),
                &self.layout.responses_index(template, *method),
            )?;
        }
        write_yaml(&self.tree.method_index(template), &self.layout.route_index(template))?;

        self.rebuilt.insert(template.clone());
        Ok(())
    }

    /// Regenerates `paths/_index.yml`.
    pub fn rebuild_path_index(&self) -> Result<()> {
        write_yaml(&self.tree.path_index(), &self.layout.path_index())
    }

    /// Regenerates `components/schemas/_index.yml`.
    pub fn rebuild_schema_index(&self) -> Result<()> {
        write_yaml(&self.tree.schema_index(), &self.layout.schema_index())
    }

    /// Writes `index.yml`, inlining every component schema.
    pub fn write_root_index(&self, info: &Info, server_urls: &[String]) -> Result<()> {
        let document = RootDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: info.clone(),
            servers: server_urls
                .iter()
                .map(|url| Server { url: url.clone() })
                .collect(),
            paths: Reference::new(PATH_INDEX_REF),
            components: Components {
                schemas: self.tree.schema_index(),
            },
        };
        write_yaml(&document, &self.layout.root_index())
    }

    /// Regenerates every aggregation node not yet rebuilt in this run, then
    /// the path index, the schema index and `index.yml`.
    pub fn finish(&mut self, info: &Info, server_urls: &[String]) -> Result<()> {
        let pending: Vec<RouteTemplate> = self
            .tree
            .routes()
            .map(|(template, _)| template.clone())
            .filter(|template| !self.rebuilt.contains(template))
            .collect();
        for template in &pending {
            self.rebuild_route(template)?;
        }

        self.rebuild_path_index()?;
        self.rebuild_schema_index()?;
        self.write_root_index(info, server_urls)?;

        info!(
            "Assembled document tree at {}: {} routes, {} operations, {} schemas",
            self.layout.root().display(),
            self.tree.route_count(),
            self.tree.operation_count(),
            self.tree.schema_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::parameterize;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn info() -> Info {
        Info {
            version: "1.0.0".to_string(),
            title: "Test API".to_string(),
            description: "Inferred from traffic".to_string(),
        }
    }

    fn write_get_posts(assembler: &mut Assembler, diagnostics: &mut Diagnostics) {
        let template = parameterize("/v1/posts");
        assembler
            .register_operation(&template, HttpMethod::Get, diagnostics)
            .unwrap();
        let id = assembler
            .write_response_schema(&template, HttpMethod::Get, 200, Schema::String)
            .unwrap();
        assembler
            .write_response(&template, HttpMethod::Get, 200, Some(id.as_str()))
            .unwrap();
        assembler.rebuild_route(&template).unwrap();
    }

    fn open(temp_dir: &TempDir, diagnostics: &mut Diagnostics) -> Assembler {
        Assembler::open(temp_dir.path().to_path_buf(), CollisionPolicy::Reject, diagnostics)
            .unwrap()
    }

    #[test]
    fn test_aggregation_nodes() {
        let temp_dir = TempDir::new().unwrap();
        let mut diagnostics = Diagnostics::new();
        let mut assembler = open(&temp_dir, &mut diagnostics);

        write_get_posts(&mut assembler, &mut diagnostics);
        assembler.finish(&info(), &[]).unwrap();

        let root = temp_dir.path();
        assert_eq!(
            fs::read_to_string(root.join("paths/_index.yml")).unwrap(),
            "/v1/posts:\n  $ref: v1-posts/_index.yml\n"
        );
        assert_eq!(
            fs::read_to_string(root.join("paths/v1-posts/_index.yml")).unwrap(),
            "get:\n  $ref: get/_index.yml\n"
        );
        assert_eq!(
            fs::read_to_string(root.join("paths/v1-posts/get/responses/_index.yml")).unwrap(),
            "'200':\n  $ref: 200/_index.yml\n"
        );
        assert_eq!(
            fs::read_to_string(root.join("components/schemas/_index.yml")).unwrap(),
            "GetPostsResponse:\n  type: string\n"
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_reopen_keeps_earlier_content() {
        let temp_dir = TempDir::new().unwrap();
        let mut diagnostics = Diagnostics::new();

        let mut first = open(&temp_dir, &mut diagnostics);
        write_get_posts(&mut first, &mut diagnostics);
        first.finish(&info(), &[]).unwrap();
        let schema_index =
            fs::read_to_string(temp_dir.path().join("components/schemas/_index.yml")).unwrap();

        let mut second = open(&temp_dir, &mut diagnostics);
        assert_eq!(second.tree().operation_count(), 1);
        assert_eq!(second.tree().schema("GetPostsResponse"), Some(&Schema::String));
        second.finish(&info(), &[]).unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("components/schemas/_index.yml")).unwrap(),
            schema_index
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unreadable_schema_fragment_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let broken = temp_dir.path().join("components/schemas/v1-posts/post/request_body.yml");
        fs::create_dir_all(broken.parent().unwrap()).unwrap();
        fs::write(&broken, "type: [not, a, schema\n").unwrap();

        let mut diagnostics = Diagnostics::new();
        let assembler = open(&temp_dir, &mut diagnostics);

        assert_eq!(assembler.tree().schema_count(), 0);
        assert_eq!(diagnostics.count(DiagnosticKind::UnexpectedFragment), 1);
    }

    #[test]
    fn test_root_index() {
        let temp_dir = TempDir::new().unwrap();
        let mut diagnostics = Diagnostics::new();
        let mut assembler = open(&temp_dir, &mut diagnostics);
        write_get_posts(&mut assembler, &mut diagnostics);

        assembler
            .finish(&info(), &["https://api.example.com".to_string()])
            .unwrap();

        let document: RootDocument = read_yaml(&temp_dir.path().join("index.yml")).unwrap();
        assert_eq!(document.openapi, "3.0.0");
        assert_eq!(document.info, info());
        assert_eq!(document.servers[0].url, "https://api.example.com");
        assert_eq!(document.paths.target, "paths/_index.yml");
        assert!(document.components.schemas.contains_key("GetPostsResponse"));
    }
}
