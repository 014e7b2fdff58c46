//! Small closed vocabularies shared by the whole pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP methods an operation can be recorded under.
///
/// The lowercase form is used for directory names and map keys in the
/// document tree, the uppercase form for human-facing summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// Lowercase name, as used in the document tree.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    /// Parses a method name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == lowered)
            .ok_or_else(|| format!("unsupported HTTP method: {}", s))
    }
}

/// Which part of an exchange a component schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaKind {
    RequestParams,
    RequestBody,
    Response,
}

impl SchemaKind {
    /// Suffix appended to the operation identifier to form the schema identifier.
    pub fn label(&self) -> &'static str {
        match self {
            SchemaKind::RequestParams => "RequestParams",
            SchemaKind::RequestBody => "RequestBody",
            SchemaKind::Response => "Response",
        }
    }
}
