//! In-memory model of the document tree.
//!
//! The tree holds what every aggregation node is derived from: the routes,
//! the operations under them with their recorded response statuses, and the
//! component schemas. It is seeded from the fragments already on disk and
//! updated as leaf fragments are written, so aggregation nodes never need to
//! be re-derived from the file system.

use crate::assembler::fragments::Reference;
use crate::assembler::layout::RESPONSES_DIR;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::identifier::{schema_id, CollisionPolicy, IdentifierRegistry};
use crate::model::{HttpMethod, SchemaKind};
use crate::route::{to_directory_name, RouteTemplate};
use crate::schema_inferencer::Schema;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationNode {
    pub operation_id: String,
    pub statuses: BTreeSet<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteNode {
    pub operations: BTreeMap<HttpMethod, OperationNode>,
}

#[derive(Debug, Clone)]
struct SchemaEntry {
    /// Response status the schema was inferred from; `None` for request schemas
    status: Option<u16>,
    schema: Schema,
}

#[derive(Debug)]
pub struct DocumentTree {
    routes: BTreeMap<RouteTemplate, RouteNode>,
    schemas: BTreeMap<String, SchemaEntry>,
    identifiers: IdentifierRegistry,
}

impl DocumentTree {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            routes: BTreeMap::new(),
            schemas: BTreeMap::new(),
            identifiers: IdentifierRegistry::new(policy),
        }
    }

    /// Records a route, possibly without any operation yet.
    pub fn add_route(&mut self, template: RouteTemplate) {
        self.routes.entry(template).or_default();
    }

    /// Claims the operation identifier for `method` on `template`.
    ///
    /// Returns `Ok(None)` if the operation must be skipped because its
    /// identifier belongs to another operation.
    pub fn register_operation(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<String>> {
        let Some(operation_id) = self.identifiers.register(template, method, diagnostics)? else {
            return Ok(None);
        };

        self.routes
            .entry(template.clone())
            .or_default()
            .operations
            .entry(method)
            .or_insert_with(|| OperationNode {
                operation_id: operation_id.clone(),
                statuses: BTreeSet::new(),
            });
        Ok(Some(operation_id))
    }

    /// Records a response status of a registered operation.
    ///
    /// Returns `false` if the operation was never registered.
    pub fn add_response(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        status: u16,
    ) -> bool {
        match self
            .routes
            .get_mut(template)
            .and_then(|route| route.operations.get_mut(&method))
        {
            Some(operation) => {
                operation.statuses.insert(status);
                true
            }
            None => false,
        }
    }

    /// Records a component schema and returns its identifier.
    ///
    /// All response statuses of an operation share one response schema
    /// identifier, owned by the lowest status recorded. Any other schema
    /// replaces the previous one under the same identifier.
    pub fn add_schema(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        kind: SchemaKind,
        status: Option<u16>,
        schema: Schema,
    ) -> String {
        let id = schema_id(method, template.as_str(), kind);

        let keep_existing = matches!(
            (self.schemas.get(&id), status),
            (Some(SchemaEntry { status: Some(owner), .. }), Some(incoming)) if *owner < incoming
        );
        if !keep_existing {
            self.schemas.insert(id.clone(), SchemaEntry { status, schema });
        }
        id
    }

    pub fn route(&self, template: &RouteTemplate) -> Option<&RouteNode> {
        self.routes.get(template)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&RouteTemplate, &RouteNode)> {
        self.routes.iter()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn operation_count(&self) -> usize {
        self.routes.values().map(|route| route.operations.len()).sum()
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    pub fn schema(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id).map(|entry| &entry.schema)
    }

    /// Content of `paths/_index.yml`: every route template to its directory.
    pub fn path_index(&self) -> BTreeMap<String, Reference> {
        self.routes
            .keys()
            .map(|template| {
                (
                    template.as_str().to_string(),
                    Reference::to_index(&to_directory_name(template)),
                )
            })
            .collect()
    }

    /// Content of `paths/<route>/_index.yml`.
    ///
    /// Only methods with at least one recorded response are listed.
    pub fn method_index(&self, template: &RouteTemplate) -> BTreeMap<String, Reference> {
        self.routes
            .get(template)
            .map(|route| {
                route
                    .operations
                    .iter()
                    .filter(|(_, operation)| !operation.statuses.is_empty())
                    .map(|(method, _)| {
                        (method.as_str().to_string(), Reference::to_index(method.as_str()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Content of `paths/<route>/<method>/responses/_index.yml`.
    pub fn response_index(
        &self,
        template: &RouteTemplate,
        method: HttpMethod,
    ) -> BTreeMap<String, Reference> {
        self.routes
            .get(template)
            .and_then(|route| route.operations.get(&method))
            .map(|operation| {
                operation
                    .statuses
                    .iter()
                    .map(|status| (status.to_string(), Reference::to_index(&status.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Content of `components/schemas/_index.yml`.
    pub fn schema_index(&self) -> BTreeMap<String, Schema> {
        self.schemas
            .iter()
            .map(|(id, entry)| (id.clone(), entry.schema.clone()))
            .collect()
    }
}

/// Reference from an operation fragment to its response index
pub fn responses_reference() -> Reference {
    Reference::to_index(RESPONSES_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::error::Error;
    use crate::route::parameterize;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_method_index_lists_only_answered_methods() {
        let mut diagnostics = Diagnostics::new();
        let mut tree = DocumentTree::new(CollisionPolicy::Reject);
        let template = parameterize("/v1/posts");

        tree.register_operation(&template, HttpMethod::Get, &mut diagnostics).unwrap();
        tree.register_operation(&template, HttpMethod::Post, &mut diagnostics).unwrap();
        assert!(tree.add_response(&template, HttpMethod::Post, 201));

        let index = tree.method_index(&template);
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["post"]);
        assert_eq!(index["post"].target, "post/_index.yml");
    }

    #[test]
    fn test_add_response_requires_registration() {
        let mut tree = DocumentTree::new(CollisionPolicy::Reject);
        assert!(!tree.add_response(&parameterize("/v1/posts"), HttpMethod::Get, 200));
    }

    #[test]
    fn test_path_and_response_indexes() {
        let mut diagnostics = Diagnostics::new();
        let mut tree = DocumentTree::new(CollisionPolicy::Reject);
        let template = parameterize("/v1/posts/1/comments");

        tree.register_operation(&template, HttpMethod::Get, &mut diagnostics).unwrap();
        tree.add_response(&template, HttpMethod::Get, 404);
        tree.add_response(&template, HttpMethod::Get, 200);
        tree.add_route(parameterize("/v1/albums"));

        let paths = tree.path_index();
        assert_eq!(
            paths.keys().collect::<Vec<_>>(),
            vec!["/v1/albums", "/v1/posts/{post_id}/comments"]
        );
        assert_eq!(
            paths["/v1/posts/{post_id}/comments"].target,
            "v1-posts-{post_id}-comments/_index.yml"
        );

        let responses = tree.response_index(&template, HttpMethod::Get);
        assert_eq!(responses.keys().collect::<Vec<_>>(), vec!["200", "404"]);
        assert_eq!(responses["404"].target, "404/_index.yml");
        assert_eq!(tree.route_count(), 2);
        assert_eq!(tree.operation_count(), 1);
    }

    #[test]
    fn test_lowest_status_owns_response_schema() {
        let mut tree = DocumentTree::new(CollisionPolicy::Reject);
        let template = parameterize("/v1/posts");

        let (get, response) = (HttpMethod::Get, SchemaKind::Response);
        let id = tree.add_schema(&template, get, response, Some(404), Schema::String);
        tree.add_schema(&template, get, response, Some(200), Schema::Boolean);
        tree.add_schema(&template, get, response, Some(500), Schema::Integer);

        assert_eq!(id, "GetPostsResponse");
        assert_eq!(tree.schema(&id), Some(&Schema::Boolean));
        assert_eq!(tree.schema_count(), 1);
    }

    #[test]
    fn test_request_schema_is_replaced() {
        let mut tree = DocumentTree::new(CollisionPolicy::Reject);
        let template = parameterize("/v1/posts");

        let (post, body) = (HttpMethod::Post, SchemaKind::RequestBody);
        tree.add_schema(&template, post, body, None, Schema::String);
        let id = tree.add_schema(&template, post, body, None, Schema::Integer);

        assert_eq!(tree.schema(&id), Some(&Schema::Integer));
        assert_eq!(tree.schema_index().keys().collect::<Vec<_>>(), vec!["PostPostsRequestBody"]);
    }

    #[test]
    fn test_colliding_operation_is_skipped_under_warn() {
        let mut diagnostics = Diagnostics::new();
        let mut tree = DocumentTree::new(CollisionPolicy::Warn);

        let first = tree
            .register_operation(&parameterize("/v1/posts"), HttpMethod::Get, &mut diagnostics)
            .unwrap();
        let second = tree
            .register_operation(&parameterize("/v2/posts"), HttpMethod::Get, &mut diagnostics)
            .unwrap();

        assert_eq!(first.as_deref(), Some("getPosts"));
        assert_eq!(second, None);
        assert_eq!(tree.operation_count(), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::IdentifierCollision), 1);
    }

    #[test]
    fn test_colliding_operation_is_rejected() {
        let mut diagnostics = Diagnostics::new();
        let mut tree = DocumentTree::new(CollisionPolicy::Reject);

        tree.register_operation(&parameterize("/v1/posts"), HttpMethod::Get, &mut diagnostics)
            .unwrap();
        let result =
            tree.register_operation(&parameterize("/v2/posts"), HttpMethod::Get, &mut diagnostics);

        assert!(matches!(result, Err(Error::IdentifierCollision { .. })));
    }
}
