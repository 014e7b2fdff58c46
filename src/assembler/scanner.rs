use crate::assembler::layout::{
    parse_method_dir, parse_status_dir, Layout, INDEX_FILE, REQUEST_BODY_FILE, REQUEST_PARAMS_FILE,
    RESPONSES_DIR,
};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{HttpMethod, SchemaKind};
use crate::route::{from_directory_name, RouteTemplate};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Scanner for a document tree left behind by earlier runs.
///
/// The scanner walks `paths/` and `components/schemas/` and classifies every
/// file by its position in the canonical layout. Aggregation nodes and
/// operation fragments are not read: aggregation nodes are always rebuilt,
/// and operation fragments carry nothing the tree needs. Hidden entries are
/// skipped, and anything else that does not fit the layout is reported as an
/// [`DiagnosticKind::UnexpectedFragment`] and left untouched.
///
/// # Example
///
/// ```no_run
/// use openapi_from_traffic::assembler::layout::Layout;
/// use openapi_from_traffic::assembler::scanner::TreeScanner;
/// use openapi_from_traffic::diagnostics::Diagnostics;
/// use std::path::PathBuf;
///
/// let layout = Layout::new(PathBuf::from(".build"));
/// let mut diagnostics = Diagnostics::new();
/// let result = TreeScanner::new(&layout).scan(&mut diagnostics);
/// println!("Found {} routes", result.routes.len());
/// ```
pub struct TreeScanner<'a> {
    layout: &'a Layout,
}

/// Location of a response fragment found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLocation {
    pub template: RouteTemplate,
    pub method: HttpMethod,
    pub status: u16,
}

/// A schema fragment found on disk, not yet read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLocation {
    pub template: RouteTemplate,
    pub method: HttpMethod,
    pub kind: SchemaKind,
    /// Set for response schemas only
    pub status: Option<u16>,
    pub path: PathBuf,
}

/// Result of scanning an existing document tree.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Route directories under `paths/`, in directory-name order
    pub routes: Vec<RouteTemplate>,
    pub responses: Vec<ResponseLocation>,
    pub schemas: Vec<SchemaLocation>,
}

impl<'a> TreeScanner<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Scans both halves of the tree.
    ///
    /// A missing tree is an empty tree. Entries that cannot be accessed are
    /// recorded in `diagnostics` and scanning continues.
    pub fn scan(&self, diagnostics: &mut Diagnostics) -> ScanResult {
        let mut result = ScanResult::default();
        self.scan_paths(&mut result, diagnostics);
        self.scan_schemas(&mut result, diagnostics);

        debug!(
            "Scanned existing tree: {} routes, {} responses, {} schemas",
            result.routes.len(),
            result.responses.len(),
            result.schemas.len()
        );
        result
    }

    fn scan_paths(&self, result: &mut ScanResult, diagnostics: &mut Diagnostics) {
        let root = self.layout.paths_root();
        walk(&root, diagnostics, |components, is_dir, path, diagnostics| {
            if is_dir {
                return match components {
                    [route] => match parse_route(route, path, diagnostics) {
                        Some(template) => {
                            result.routes.push(template);
                            Visit::Descend
                        }
                        None => Visit::Skip,
                    },
                    [_, method] => check_method_dir(method, path, diagnostics),
                    _ => Visit::Descend,
                };
            }

            match components {
                // Aggregation nodes and operation fragments
                [INDEX_FILE]
                | [_, INDEX_FILE]
                | [_, _, INDEX_FILE]
                | [_, _, RESPONSES_DIR, INDEX_FILE] => {}
                [route, method, RESPONSES_DIR, status, INDEX_FILE] => {
                    match (route_of(route), parse_method_dir(method), parse_status_dir(status)) {
                        (Some(template), Some(method), Some(status)) => {
                            result.responses.push(ResponseLocation {
                                template,
                                method,
                                status,
                            });
                        }
                        _ => unexpected(path, diagnostics),
                    }
                }
                _ => unexpected(path, diagnostics),
            }
            Visit::Descend
        });
    }

    fn scan_schemas(&self, result: &mut ScanResult, diagnostics: &mut Diagnostics) {
        let root = self.layout.schemas_root();
        walk(&root, diagnostics, |components, is_dir, path, diagnostics| {
            if is_dir {
                return match components {
                    [route] => match parse_route(route, path, diagnostics) {
                        Some(_) => Visit::Descend,
                        None => Visit::Skip,
                    },
                    [_, method] => check_method_dir(method, path, diagnostics),
                    _ => Visit::Descend,
                };
            }

            let location = match components {
                [INDEX_FILE] => return Visit::Descend,
                [route, method, file] => match *file {
                    REQUEST_BODY_FILE => {
                        schema_location(route, method, SchemaKind::RequestBody, None, path)
                    }
                    REQUEST_PARAMS_FILE => {
                        schema_location(route, method, SchemaKind::RequestParams, None, path)
                    }
                    _ => None,
                },
                [route, method, RESPONSES_DIR, status, INDEX_FILE] => {
                    parse_status_dir(status).and_then(|status| {
                        schema_location(route, method, SchemaKind::Response, Some(status), path)
                    })
                }
                _ => None,
            };

            match location {
                Some(location) => result.schemas.push(location),
                None => unexpected(path, diagnostics),
            }
            Visit::Descend
        });
    }
}

enum Visit {
    Descend,
    Skip,
}

/// Walks `root` in file-name order, handing each entry's relative path
/// components to `visit`.
fn walk<F>(root: &Path, diagnostics: &mut Diagnostics, mut visit: F)
where
    F: FnMut(&[&str], bool, &Path, &mut Diagnostics) -> Visit,
{
    if !root.exists() {
        debug!("No existing tree at {}", root.display());
        return;
    }

    let mut entries = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let warning = format!("Failed to access path: {}", e);
                warn!("{}", warning);
                diagnostics.push(DiagnosticKind::UnexpectedFragment, warning);
                continue;
            }
        };

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let components: Option<Vec<&str>> = relative.iter().map(|c| c.to_str()).collect();
        let Some(components) = components else {
            unexpected(path, diagnostics);
            continue;
        };

        let is_dir = entry.file_type().is_dir();
        if let Visit::Skip = visit(&components, is_dir, path, diagnostics) {
            if is_dir {
                entries.skip_current_dir();
            }
        }
    }
}

fn parse_route(name: &str, path: &Path, diagnostics: &mut Diagnostics) -> Option<RouteTemplate> {
    match from_directory_name(name) {
        Ok(template) => Some(template),
        Err(e) => {
            diagnostics.push(
                DiagnosticKind::UnexpectedFragment,
                format!("{}: {}", path.display(), e),
            );
            None
        }
    }
}

fn route_of(name: &str) -> Option<RouteTemplate> {
    from_directory_name(name).ok()
}

fn check_method_dir(name: &str, path: &Path, diagnostics: &mut Diagnostics) -> Visit {
    if parse_method_dir(name).is_some() {
        Visit::Descend
    } else {
        diagnostics.push(
            DiagnosticKind::UnexpectedFragment,
            format!("{}: not an HTTP method directory", path.display()),
        );
        Visit::Skip
    }
}

fn schema_location(
    route: &str,
    method: &str,
    kind: SchemaKind,
    status: Option<u16>,
    path: &Path,
) -> Option<SchemaLocation> {
    Some(SchemaLocation {
        template: route_of(route)?,
        method: parse_method_dir(method)?,
        kind,
        status,
        path: path.to_path_buf(),
    })
}

fn unexpected(path: &Path, diagnostics: &mut Diagnostics) {
    diagnostics.push(
        DiagnosticKind::UnexpectedFragment,
        format!("{}: not part of the document layout", path.display()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::parameterize;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}\n").unwrap();
    }

    #[test]
    fn test_scan_missing_tree() {
        let temp_dir = TempDir::new().unwrap();
        let layout = Layout::new(temp_dir.path().join("nothing-here"));
        let mut diagnostics = Diagnostics::new();

        let result = TreeScanner::new(&layout).scan(&mut diagnostics);

        assert!(result.routes.is_empty());
        assert!(result.responses.is_empty());
        assert!(result.schemas.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_scan_classifies_fragments() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "paths/_index.yml");
        touch(root, "paths/v1-posts/_index.yml");
        touch(root, "paths/v1-posts/post/_index.yml");
        touch(root, "paths/v1-posts/post/responses/_index.yml");
        touch(root, "paths/v1-posts/post/responses/201/_index.yml");
        touch(root, "paths/v1-posts-{post_id}-comments/get/responses/200/_index.yml");
        touch(root, "components/schemas/_index.yml");
        touch(root, "components/schemas/v1-posts/post/request_body.yml");
        touch(root, "components/schemas/v1-posts/post/responses/201/_index.yml");

        let layout = Layout::new(root.to_path_buf());
        let mut diagnostics = Diagnostics::new();
        let result = TreeScanner::new(&layout).scan(&mut diagnostics);

        assert!(diagnostics.is_empty(), "{:?}", diagnostics.entries());
        assert_eq!(
            result.routes,
            vec![parameterize("/v1/posts"), parameterize("/v1/posts/1/comments")]
        );
        assert_eq!(
            result.responses,
            vec![
                ResponseLocation {
                    template: parameterize("/v1/posts"),
                    method: HttpMethod::Post,
                    status: 201
                },
                ResponseLocation {
                    template: parameterize("/v1/posts/1/comments"),
                    method: HttpMethod::Get,
                    status: 200
                },
            ]
        );

        let kinds: Vec<_> = result.schemas.iter().map(|s| (s.kind, s.status)).collect();
        assert_eq!(
            kinds,
            vec![(SchemaKind::RequestBody, None), (SchemaKind::Response, Some(201))]
        );
    }

    #[test]
    fn test_scan_reports_unexpected_entries() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "paths/v1-posts/fetch/_index.yml");
        touch(root, "paths/v1-posts/get/notes.txt");
        touch(root, "paths/v1-posts/get/responses/2000/_index.yml");
        touch(root, "paths/not-canonical-%41/get/_index.yml");
        touch(root, "components/schemas/v1-posts/get/extra.yml");

        let layout = Layout::new(root.to_path_buf());
        let mut diagnostics = Diagnostics::new();
        let result = TreeScanner::new(&layout).scan(&mut diagnostics);

        assert_eq!(result.routes, vec![parameterize("/v1/posts")]);
        assert!(result.responses.is_empty());
        assert!(result.schemas.is_empty());
        assert_eq!(diagnostics.count(DiagnosticKind::UnexpectedFragment), 5);
    }

    #[test]
    fn test_scan_skips_hidden_entries() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "paths/.cache/whatever.yml");
        touch(root, "paths/v1-posts/get/.DS_Store");

        let layout = Layout::new(root.to_path_buf());
        let mut diagnostics = Diagnostics::new();
        let result = TreeScanner::new(&layout).scan(&mut diagnostics);

        assert_eq!(result.routes, vec![parameterize("/v1/posts")]);
        assert!(diagnostics.is_empty());
    }
}
