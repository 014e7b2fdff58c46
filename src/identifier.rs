//! Operation and schema identifiers derived from route templates.
//!
//! Identifiers are built from the method and the non-placeholder segments of
//! the template, so they stay stable across runs without any stored state:
//!
//! | method | path | operation id |
//! | --- | --- | --- |
//! | GET | `/v1/posts/100/comments/2` | `getPostComment` |
//! | POST | `/v1/posts/{post_id}/comments` | `postPostComments` |
//! | POST | `/v1/foo_bar_baz` | `postFooBarBaz` |
//!
//! A segment addressed by an id placeholder is written in its singular form,
//! so `/posts/{post_id}` reads `Post` while `/posts` reads `Posts`.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};
use crate::model::{HttpMethod, SchemaKind};
use crate::route::{is_parameterized, parameterize, singular, RouteTemplate};
use clap::ValueEnum;
use log::debug;
use std::collections::HashMap;

/// Characters that split a segment into camel-case words.
const WORD_DELIMITERS: [char; 2] = ['_', '-'];

/// Derives the operation identifier for a method and a concrete or
/// parameterized path.
pub fn operation_id(method: HttpMethod, path: &str) -> String {
    let template = parameterize(path);
    let placeholders = template.placeholders();

    let mut segments: Vec<&str> = template.segments().collect();
    if segments.len() > 1 && is_version_segment(segments[0]) {
        segments.remove(0);
    }

    let resource: String = segments
        .iter()
        .filter(|segment| !is_parameterized(segment))
        .map(|segment| {
            let singular_form = singular(segment);
            let id_name = format!("{}_id", singular_form);
            if placeholders.iter().any(|p| *p == id_name) {
                capitalize(singular_form)
            } else {
                capitalize(segment)
            }
        })
        .collect();

    camel_case(&format!("{}{}", method.as_str(), resource))
}

/// Derives the component schema identifier, e.g. `PostAlbumsRequestBody`.
pub fn schema_id(method: HttpMethod, path: &str, kind: SchemaKind) -> String {
    let operation = operation_id(method, path);
    let mut chars = operation.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", first.to_uppercase(), chars.as_str(), kind.label()),
        None => kind.label().to_string(),
    }
}

/// What to do when two operations derive the same identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CollisionPolicy {
    /// Abort the run
    #[default]
    Reject,
    /// Keep the first operation, skip the later one and record a diagnostic
    Warn,
}

/// Tracks which operation owns each identifier within one document.
#[derive(Debug)]
pub struct IdentifierRegistry {
    policy: CollisionPolicy,
    owners: HashMap<String, (RouteTemplate, HttpMethod)>,
}

impl IdentifierRegistry {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            owners: HashMap::new(),
        }
    }

    /// Registers an operation and returns its identifier.
    ///
    /// Returns `Ok(None)` when the identifier already belongs to a different
    /// operation and the policy is [`CollisionPolicy::Warn`]; the caller must
    /// then skip the operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentifierCollision`] under [`CollisionPolicy::Reject`].
    pub fn register(
        &mut self,
        template: &RouteTemplate,
        method: HttpMethod,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<String>> {
        let identifier = operation_id(method, template.as_str());

        match self.owners.get(&identifier) {
            None => {
                debug!("Registered {} for {} {}", identifier, method, template);
                self.owners
                    .insert(identifier.clone(), (template.clone(), method));
                Ok(Some(identifier))
            }
            Some((owner, owner_method)) if owner == template && *owner_method == method => {
                Ok(Some(identifier))
            }
            Some((owner, owner_method)) => {
                let existing = format!("{} {}", owner_method, owner);
                let incoming = format!("{} {}", method, template);
                match self.policy {
                    CollisionPolicy::Reject => Err(Error::IdentifierCollision {
                        identifier,
                        existing,
                        incoming,
                    }),
                    CollisionPolicy::Warn => {
                        diagnostics.push(
                            DiagnosticKind::IdentifierCollision,
                            format!(
                                "{} already belongs to {}; skipping {}",
                                identifier, existing, incoming
                            ),
                        );
                        Ok(None)
                    }
                }
            }
        }
    }
}

fn is_version_segment(segment: &str) -> bool {
    match segment.strip_prefix('v') {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().chain(rest.chars()).collect()
        }
        None => String::new(),
    }
}

/// Joins delimiter-separated words, keeping the first word as-is.
fn camel_case(raw: &str) -> String {
    let mut words = raw.split(&WORD_DELIMITERS[..]);
    let mut joined = words.next().unwrap_or_default().to_string();
    for word in words {
        joined.push_str(&capitalize(word));
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_id_concrete_path() {
        assert_eq!(
            operation_id(HttpMethod::Get, "/v1/posts/100/comments/2"),
            "getPostComment"
        );
    }

    #[test]
    fn test_operation_id_template_path() {
        assert_eq!(
            operation_id(HttpMethod::Post, "/v1/posts/{post_id}/comments"),
            "postPostComments"
        );
        assert_eq!(
            operation_id(HttpMethod::Get, "/v1/posts/1/comments"),
            "getPostComments"
        );
    }

    #[test]
    fn test_operation_id_underscored_segment() {
        assert_eq!(
            operation_id(HttpMethod::Post, "/v1/foo_bar_baz"),
            "postFooBarBaz"
        );
        assert_eq!(
            operation_id(HttpMethod::Get, "/v1/ai_recommended_menus"),
            "getAiRecommendedMenus"
        );
    }

    #[test]
    fn test_operation_id_hyphenated_segment() {
        assert_eq!(
            operation_id(HttpMethod::Get, "/v1/user-profiles/3"),
            "getUserProfile"
        );
    }

    #[test]
    fn test_operation_id_without_version() {
        assert_eq!(operation_id(HttpMethod::Delete, "/albums/5"), "deleteAlbum");
        assert_eq!(operation_id(HttpMethod::Get, "/v1"), "getV1");
    }

    #[test]
    fn test_schema_id() {
        let comment = "/v1/posts/100/comments/2";
        let comments = "/v1/posts/{post_id}/comments";
        let cases = [
            (HttpMethod::Get, comment, SchemaKind::RequestParams, "GetPostCommentRequestParams"),
            (HttpMethod::Post, "/v1/albums", SchemaKind::RequestBody, "PostAlbumsRequestBody"),
            (HttpMethod::Get, comment, SchemaKind::Response, "GetPostCommentResponse"),
            (HttpMethod::Post, comments, SchemaKind::RequestBody, "PostPostCommentsRequestBody"),
        ];
        for (method, path, kind, expected) in cases {
            assert_eq!(schema_id(method, path, kind), expected);
        }
    }

    #[test]
    fn test_registry_accepts_same_operation_twice() {
        let mut registry = IdentifierRegistry::new(CollisionPolicy::Reject);
        let mut diagnostics = Diagnostics::new();
        let template = parameterize("/v1/posts");

        let first = registry.register(&template, HttpMethod::Get, &mut diagnostics).unwrap();
        let second = registry.register(&template, HttpMethod::Get, &mut diagnostics).unwrap();

        assert_eq!(first.as_deref(), Some("getPosts"));
        assert_eq!(first, second);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_registry_rejects_collision() {
        let mut registry = IdentifierRegistry::new(CollisionPolicy::Reject);
        let mut diagnostics = Diagnostics::new();

        registry
            .register(&parameterize("/v1/posts"), HttpMethod::Get, &mut diagnostics)
            .unwrap();
        let result =
            registry.register(&parameterize("/v2/posts"), HttpMethod::Get, &mut diagnostics);

        match result {
            Err(Error::IdentifierCollision { identifier, .. }) => {
                assert_eq!(identifier, "getPosts")
            }
            other => panic!("expected collision error, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_warns_on_collision() {
        let mut registry = IdentifierRegistry::new(CollisionPolicy::Warn);
        let mut diagnostics = Diagnostics::new();

        registry
            .register(&parameterize("/v1/posts"), HttpMethod::Get, &mut diagnostics)
            .unwrap();
        let skipped = registry
            .register(&parameterize("/v2/posts"), HttpMethod::Get, &mut diagnostics)
            .unwrap();

        assert!(skipped.is_none());
        assert_eq!(diagnostics.count(DiagnosticKind::IdentifierCollision), 1);
    }
}
