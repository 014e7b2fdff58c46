//! Input boundary: recorded traffic records and their decoding into samples.
//!
//! Records come from a traffic-log store. The store itself is not queried
//! here; [`TrafficSource`] is the seam, and [`JsonFileSource`] reads records
//! exported to a file, either as a JSON array or as JSON Lines. Each record may
//! also be wrapped in a search hit (`{"_source": {...}}`).

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::Error;
use crate::model::HttpMethod;
use crate::route::{parameterize, RouteTemplate};
use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Status codes that map onto a three-digit `responses/<status>` directory
const VALID_STATUS: RangeInclusive<u16> = 100..=999;

/// Source of raw traffic records.
pub trait TrafficSource {
    /// Loads every available record.
    ///
    /// Records that cannot be read individually are skipped and recorded in
    /// `diagnostics`; failing to read the source as a whole is an error.
    fn load(&self, diagnostics: &mut Diagnostics) -> Result<Vec<TrafficRecord>>;
}

/// One recorded request/response exchange, as stored by the traffic log.
#[derive(Debug, Clone, Deserialize)]
pub struct TrafficRecord {
    pub request: RecordedRequest,
    pub response: RecordedResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedRequest {
    #[serde(default)]
    pub path: String,
    pub method: String,
    /// Query parameters as a JSON-encoded object
    #[serde(default)]
    pub query: String,
    /// Request body as JSON text, empty when there was none
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedResponse {
    pub status_code: u16,
    /// Response body as JSON text, possibly empty or malformed
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Hit {
        #[serde(rename = "_source")]
        source: TrafficRecord,
    },
    Record(TrafficRecord),
}

impl From<RawEntry> for TrafficRecord {
    fn from(entry: RawEntry) -> Self {
        match entry {
            RawEntry::Hit { source } => source,
            RawEntry::Record(record) => record,
        }
    }
}

/// A decoded record, ready for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSample {
    /// Concrete request path without query string
    pub path: String,
    pub method: HttpMethod,
    pub query: Option<Map<String, Value>>,
    pub request_body: Option<Value>,
    pub status: u16,
    pub response_body: Option<Value>,
}

/// All samples that parameterize to the same route template.
#[derive(Debug, Clone)]
pub struct RouteGroup {
    pub template: RouteTemplate,
    pub samples: Vec<TrafficSample>,
}

impl TrafficRecord {
    /// Decodes a record into a sample.
    ///
    /// Unparsable bodies and queries degrade to "absent" with a diagnostic. A
    /// record without a path, with an unknown method or with a status code
    /// outside 100..=999 (aborted requests are often logged as 0) is dropped.
    pub fn into_sample(self, diagnostics: &mut Diagnostics) -> Option<TrafficSample> {
        let path = self
            .request
            .path
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();
        if path.is_empty() {
            diagnostics.push(DiagnosticKind::MalformedSample, "record without request path");
            return None;
        }

        let method = match self.request.method.parse::<HttpMethod>() {
            Ok(method) => method,
            Err(message) => {
                let message = format!("{} ({})", message, path);
                diagnostics.push(DiagnosticKind::MalformedSample, message);
                return None;
            }
        };

        let context = format!("{} {}", method, path);
        let status = self.response.status_code;
        if !VALID_STATUS.contains(&status) {
            diagnostics.push(
                DiagnosticKind::MalformedSample,
                format!("status code {} of {} is not an HTTP status", status, context),
            );
            return None;
        }

        let query = match parse_json_text(&self.request.query, "query", &context, diagnostics) {
            Some(Value::Object(members)) if !members.is_empty() => Some(members),
            Some(Value::Object(_)) | None => None,
            Some(other) => {
                diagnostics.push(
                    DiagnosticKind::MalformedSample,
                    format!("query of {} is not an object: {}", context, other),
                );
                None
            }
        };
        let request_body =
            parse_json_text(&self.request.content, "request body", &context, diagnostics);
        let response_body =
            parse_json_text(&self.response.content, "response body", &context, diagnostics);

        Some(TrafficSample {
            path,
            method,
            query,
            request_body,
            status,
            response_body,
        })
    }
}

fn parse_json_text(
    raw: &str,
    what: &str,
    context: &str,
    diagnostics: &mut Diagnostics,
) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            diagnostics.push(
                DiagnosticKind::MalformedSample,
                format!("unparsable {} for {}: {}", what, context, e),
            );
            None
        }
    }
}

/// Decodes records and groups the resulting samples by route template.
///
/// Groups are ordered by template; samples keep their input order.
pub fn group_by_route(
    records: Vec<TrafficRecord>,
    diagnostics: &mut Diagnostics,
) -> Vec<RouteGroup> {
    let mut groups: BTreeMap<RouteTemplate, Vec<TrafficSample>> = BTreeMap::new();

    for record in records {
        if let Some(sample) = record.into_sample(diagnostics) {
            let template = parameterize(&sample.path);
            groups.entry(template).or_default().push(sample);
        }
    }

    debug!("Grouped samples into {} routes", groups.len());
    groups
        .into_iter()
        .map(|(template, samples)| RouteGroup { template, samples })
        .collect()
}

/// Reads traffic records exported to a JSON or JSON Lines file.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrafficSource for JsonFileSource {
    fn load(&self, diagnostics: &mut Diagnostics) -> Result<Vec<TrafficRecord>> {
        debug!("Reading traffic records from {}", self.path.display());
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read traffic file: {}", self.path.display()))?;

        if content.trim_start().starts_with('[') {
            let entries: Vec<Value> =
                serde_json::from_str(&content).map_err(|e| Error::InvalidInput {
                    file: self.path.clone(),
                    message: e.to_string(),
                })?;

            let mut records = Vec::with_capacity(entries.len());
            for (index, entry) in entries.into_iter().enumerate() {
                match serde_json::from_value::<RawEntry>(entry) {
                    Ok(entry) => records.push(entry.into()),
                    Err(e) => diagnostics.push(
                        DiagnosticKind::MalformedSample,
                        format!("{}[{}]: {}", self.path.display(), index, e),
                    ),
                }
            }
            return Ok(records);
        }

        let mut records = Vec::new();
        let mut failed_lines = 0;
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RawEntry>(line) {
                Ok(entry) => records.push(entry.into()),
                Err(e) => {
                    failed_lines += 1;
                    diagnostics.push(
                        DiagnosticKind::MalformedSample,
                        format!("{}:{}: {}", self.path.display(), number + 1, e),
                    );
                }
            }
        }

        // Not a single readable line: the file is not JSON Lines at all.
        if records.is_empty() && failed_lines > 0 {
            return Err(Error::InvalidInput {
                file: self.path.clone(),
                message: "neither a JSON array nor JSON Lines".to_string(),
            }
            .into());
        }
        Ok(records)
    }
}
