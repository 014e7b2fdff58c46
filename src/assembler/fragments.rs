//! Shapes of the fragments persisted in the document tree.
//!
//! These mirror the OpenAPI 3.0 objects they stand for. Fragments only ever
//! hold plain mappings, sequences and scalars, and aggregation nodes hold
//! references only.

use crate::assembler::layout::INDEX_FILE;
use crate::schema_inferencer::{ScalarKind, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Reference to another fragment of the tree, relative to the referring file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub target: String,
}

impl Reference {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Reference to the `_index.yml` of a child directory
    pub fn to_index(child: &str) -> Self {
        Self::new(format!("{}/{}", child, INDEX_FILE))
    }
}

/// Reference to a component schema.
///
/// Written under `$$ref` rather than `$ref`: the bundler resolves every `$ref`
/// relative to the fragment file, which would fail for component pointers.
/// The toolchain rewrites these keys after bundling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReference {
    #[serde(rename = "$$ref")]
    pub target: String,
}

impl SchemaReference {
    pub fn component(schema_id: &str) -> Self {
        Self {
            target: format!("#/components/schemas/{}", schema_id),
        }
    }
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: SchemaReference,
}

/// `content` map with a single JSON entry pointing at a component schema
pub fn json_content(schema_id: &str) -> BTreeMap<String, MediaType> {
    let mut content = BTreeMap::new();
    content.insert(
        JSON_MEDIA_TYPE.to_string(),
        MediaType {
            schema: SchemaReference::component(schema_id),
        },
    );
    content
}

/// Parameter location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: ScalarKind,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub name: String,
    pub required: bool,
    pub schema: ParameterSchema,
}

impl Parameter {
    /// Path parameters are always required integers.
    pub fn path(name: impl Into<String>) -> Self {
        Self {
            location: ParameterLocation::Path,
            name: name.into(),
            required: true,
            schema: ParameterSchema {
                kind: ScalarKind::Integer,
            },
        }
    }

    /// Query parameters are never required: absence is never observed.
    pub fn query(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            location: ParameterLocation::Query,
            name: name.into(),
            required: false,
            schema: ParameterSchema { kind },
        }
    }
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    pub content: BTreeMap<String, MediaType>,
}

/// `paths/<route>/<method>/_index.yml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFragment {
    pub summary: String,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: Reference,
}

/// `paths/<route>/<method>/responses/<status>/_index.yml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFragment {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

impl ResponseFragment {
    pub fn new(status: u16, schema_id: Option<&str>) -> Self {
        Self {
            description: response_description(status).to_string(),
            content: schema_id.map(json_content),
        }
    }
}

/// Generic description for a status code class
pub fn response_description(status: u16) -> &'static str {
    if (200..300).contains(&status) {
        "Expected response to a valid request"
    } else {
        "Error response"
    }
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub version: String,
    pub title: String,
    pub description: String,
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub schemas: BTreeMap<String, Schema>,
}

/// `index.yml`, the root of the multi-file document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootDocument {
    pub openapi: String,
    pub info: Info,
    pub servers: Vec<Server>,
    pub paths: Reference,
    pub components: Components,
}
