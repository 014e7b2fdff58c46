//! Canonical locations of every fragment in the document tree.
//!
//! ```text
//! index.yml
//! paths/_index.yml
//! paths/<route>/_index.yml
//! paths/<route>/<method>/_index.yml
//! paths/<route>/<method>/responses/_index.yml
//! paths/<route>/<method>/responses/<status>/_index.yml
//! components/schemas/_index.yml
//! components/schemas/<route>/<method>/request_body.yml
//! components/schemas/<route>/<method>/request_params.yml
//! components/schemas/<route>/<method>/responses/<status>/_index.yml
//! ```
//!
//! `<route>` is the directory name of the route template (see
//! [`crate::route::to_directory_name`]) and `<method>` the lowercase method.

use crate::model::HttpMethod;
use crate::route::{to_directory_name, RouteTemplate};
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "_index.yml";
pub const ROOT_INDEX_FILE: &str = "index.yml";
pub const PATHS_DIR: &str = "paths";
pub const RESPONSES_DIR: &str = "responses";
pub const REQUEST_BODY_FILE: &str = "request_body.yml";
pub const REQUEST_PARAMS_FILE: &str = "request_params.yml";

/// Location of the path index relative to the tree root, as referenced from `index.yml`.
pub const PATH_INDEX_REF: &str = "paths/_index.yml";

/// Fragment locations under one output root.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths_root(&self) -> PathBuf {
        self.root.join(PATHS_DIR)
    }

    pub fn schemas_root(&self) -> PathBuf {
        self.root.join("components").join("schemas")
    }

    pub fn root_index(&self) -> PathBuf {
        self.root.join(ROOT_INDEX_FILE)
    }

    pub fn path_index(&self) -> PathBuf {
        self.paths_root().join(INDEX_FILE)
    }

    pub fn schema_index(&self) -> PathBuf {
        self.schemas_root().join(INDEX_FILE)
    }

    pub fn route_index(&self, template: &RouteTemplate) -> PathBuf {
        self.paths_root()
            .join(to_directory_name(template))
            .join(INDEX_FILE)
    }

    pub fn operation_index(&self, template: &RouteTemplate, method: HttpMethod) -> PathBuf {
        self.operation_dir(template, method).join(INDEX_FILE)
    }

    pub fn responses_index(&self, template: &RouteTemplate, method: HttpMethod) -> PathBuf {
        self.operation_dir(template, method)
            .join(RESPONSES_DIR)
            .join(INDEX_FILE)
    }

    pub fn response_fragment(
        &self,
        template: &RouteTemplate,
        method: HttpMethod,
        status: u16,
    ) -> PathBuf {
        self.operation_dir(template, method)
            .join(RESPONSES_DIR)
            .join(status.to_string())
            .join(INDEX_FILE)
    }

    pub fn request_body_schema(&self, template: &RouteTemplate, method: HttpMethod) -> PathBuf {
        self.schema_dir(template, method).join(REQUEST_BODY_FILE)
    }

    pub fn request_params_schema(&self, template: &RouteTemplate, method: HttpMethod) -> PathBuf {
        self.schema_dir(template, method).join(REQUEST_PARAMS_FILE)
    }

    pub fn response_schema(
        &self,
        template: &RouteTemplate,
        method: HttpMethod,
        status: u16,
    ) -> PathBuf {
        self.schema_dir(template, method)
            .join(RESPONSES_DIR)
            .join(status.to_string())
            .join(INDEX_FILE)
    }

    fn operation_dir(&self, template: &RouteTemplate, method: HttpMethod) -> PathBuf {
        self.paths_root()
            .join(to_directory_name(template))
            .join(method.as_str())
    }

    fn schema_dir(&self, template: &RouteTemplate, method: HttpMethod) -> PathBuf {
        self.schemas_root()
            .join(to_directory_name(template))
            .join(method.as_str())
    }
}

/// Parses a status-code directory name: exactly three ASCII digits.
pub fn parse_status_dir(name: &str) -> Option<u16> {
    if name.len() == 3 && name.bytes().all(|b| b.is_ascii_digit()) {
        name.parse().ok()
    } else {
        None
    }
}

/// Parses a method directory name, which must be the lowercase method.
pub fn parse_method_dir(name: &str) -> Option<HttpMethod> {
    HttpMethod::ALL.into_iter().find(|m| m.as_str() == name)
}
