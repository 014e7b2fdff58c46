//! Route templates: turning observed request paths into parameterized
//! templates, and templates into directory names and back.
//!
//! A concrete path such as `/v1/posts/100/comments/2` becomes the template
//! `/v1/posts/{post_id}/comments/{comment_id}`. A numeric segment is only
//! treated as an identifier when it directly follows a resource-name segment,
//! and the placeholder is named after that resource with a trailing plural `s`
//! removed. This is a structural heuristic, not a type check: alphabetic or
//! UUID-like identifiers are never parameterized.
//!
//! Templates are stored on disk as one directory per route. The directory name
//! drops the leading `/` and joins segments with `-`
//! (`v1-posts-{post_id}-comments`). The document tree is rebuilt by reversing
//! this mapping, so it has to be lossless: `%` and `-` inside a segment and a
//! leading `.` are percent-escaped, and the root route `/` gets a reserved
//! name.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Separator between path segments in a directory name.
const DELIMITER: char = '-';

/// Directory name reserved for the root route `/`.
const ROOT_DIRECTORY_NAME: &str = "%2F";

/// A request path with identifier segments replaced by named placeholders.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RouteTemplate(String);

impl RouteTemplate {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments without the empty segment before the leading `/`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').skip(1)
    }

    /// Placeholder names in path order, without braces (`post_id`).
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments().filter_map(placeholder_name).collect()
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Converts a concrete path into a route template.
///
/// Applying it to a template returns the same template.
///
/// # Example
///
/// ```
/// use openapi_from_traffic::route::parameterize;
///
/// let template = parameterize("/v1/posts/100/comments/2");
/// assert_eq!(template.as_str(), "/v1/posts/{post_id}/comments/{comment_id}");
/// ```
pub fn parameterize(path: &str) -> RouteTemplate {
    let mut segments: Vec<String> = normalize(path).split('/').map(str::to_string).collect();

    for i in 1..segments.len() {
        if !is_identifier_value(&segments[i]) || !is_resource_name(&segments[i - 1]) {
            continue;
        }
        segments[i] = format!("{{{}_id}}", singular(&segments[i - 1]));
    }

    RouteTemplate(segments.join("/"))
}

/// Flattens a template into a single directory name.
pub fn to_directory_name(template: &RouteTemplate) -> String {
    let path = template.as_str();
    if path == "/" {
        return ROOT_DIRECTORY_NAME.to_string();
    }

    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let name = trimmed
        .split('/')
        .map(escape_segment)
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string());

    match name.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => name,
    }
}

/// Recovers the template a directory name was produced from.
///
/// Only names produced by [`to_directory_name`] are accepted.
pub fn from_directory_name(name: &str) -> Result<RouteTemplate> {
    if name.is_empty() {
        return Err(invalid_name(name, "empty name"));
    }
    if name == ROOT_DIRECTORY_NAME {
        return Ok(RouteTemplate("/".to_string()));
    }

    let segments = name
        .split(DELIMITER)
        .map(|token| unescape_token(token).map_err(|message| invalid_name(name, &message)))
        .collect::<Result<Vec<_>>>()?;

    let template = RouteTemplate(format!("/{}", segments.join("/")));
    if to_directory_name(&template) != name {
        return Err(invalid_name(name, "not a canonical route directory name"));
    }
    Ok(template)
}

/// Extracts path parameter values from a concrete path.
///
/// Pairs are returned in path order. Segments that are already placeholders
/// carry no value and are skipped, as are digit runs too long for a `u64`.
///
/// # Example
///
/// ```
/// use openapi_from_traffic::route::extract_path_params;
///
/// let params = extract_path_params("/v1/posts/100/comments/2");
/// assert_eq!(params, vec![("post_id".to_string(), 100), ("comment_id".to_string(), 2)]);
/// ```
pub fn extract_path_params(path: &str) -> Vec<(String, u64)> {
    let concrete = normalize(path);
    let template = parameterize(&concrete);

    template
        .as_str()
        .split('/')
        .zip(concrete.split('/'))
        .filter_map(|(templated, concrete_segment)| {
            let name = placeholder_name(templated)?;
            let value = concrete_segment.parse::<u64>().ok()?;
            Some((name.to_string(), value))
        })
        .collect()
}

/// Whether a single segment is a placeholder of the form `{...id}`.
pub fn is_parameterized(segment: &str) -> bool {
    placeholder_name(segment).is_some()
}

/// Resource name with a trailing plural `s` removed.
pub(crate) fn singular(resource: &str) -> &str {
    resource.strip_suffix('s').unwrap_or(resource)
}

fn placeholder_name(segment: &str) -> Option<&str> {
    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    if inner.ends_with("id") {
        Some(inner)
    } else {
        None
    }
}

fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

fn is_identifier_value(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn is_resource_name(segment: &str) -> bool {
    !segment.is_empty()
        && !is_parameterized(segment)
        && !segment.bytes().all(|b| b.is_ascii_digit())
}

fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '-' => escaped.push_str("%2D"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape_token(token: &str) -> std::result::Result<String, String> {
    let mut decoded = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            decoded.push(c);
            continue;
        }
        let code: String = chars.by_ref().take(2).collect();
        match code.as_str() {
            "25" => decoded.push('%'),
            "2D" => decoded.push('-'),
            "2E" => decoded.push('.'),
            _ => return Err(format!("unknown escape sequence '%{}'", code)),
        }
    }
    Ok(decoded)
}

fn invalid_name(name: &str, message: &str) -> Error {
    Error::InvalidDirectoryName {
        name: name.to_string(),
        message: message.to_string(),
    }
}
