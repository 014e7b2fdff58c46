//! Run-scoped filter that lets each observed traffic pattern through once.

use crate::model::HttpMethod;
use crate::route::RouteTemplate;
use log::debug;
use std::collections::HashSet;

/// One distinct observed pattern: a route, a method and a response status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternKey {
    pub template: RouteTemplate,
    pub method: HttpMethod,
    pub status: u16,
}

impl PatternKey {
    pub fn new(template: RouteTemplate, method: HttpMethod, status: u16) -> Self {
        Self {
            template,
            method,
            status,
        }
    }
}

/// Set of patterns seen so far in the current run.
///
/// There is no eviction: a pattern observed once stays suppressed until the
/// deduplicator is dropped at the end of the run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<PatternKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `key` is observed, `false` afterwards.
    pub fn observe(&mut self, key: PatternKey) -> bool {
        let first = !self.seen.contains(&key);
        if first {
            self.seen.insert(key);
        } else {
            debug!(
                "Skipping duplicate pattern {} {} {}",
                key.method, key.template, key.status
            );
        }
        first
    }

    /// Number of distinct patterns observed.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
