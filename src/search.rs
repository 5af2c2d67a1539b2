//! Live search over the hierarchy.
//!
//! Every non-empty keystroke issues a query. Responses can arrive out of
//! order, so each query carries a sequence number and only the response to
//! the latest one is applied.

use crate::client::{ApiClient, ClientError};
use crate::hierarchy::{Hierarchy, HierarchyEntry};
use crate::model::{EntityKind, SearchResult};
use crate::selection::SelectedPath;
use tracing::debug;

/// Results of one kind, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultGroup<'a> {
    pub kind: EntityKind,
    pub results: Vec<&'a SearchResult>,
}

/// Group results under LOB, Subject Area, Database, Table regardless of
/// the order the backend returned them in. Empty groups are omitted.
pub fn group_results(results: &[SearchResult]) -> Vec<ResultGroup<'_>> {
    EntityKind::ORDER
        .iter()
        .map(|kind| ResultGroup {
            kind: *kind,
            results: results.iter().filter(|r| r.kind == *kind).collect(),
        })
        .filter(|g| !g.results.is_empty())
        .collect()
}

/// Path a result points at: the result's own level plus its ancestors.
pub fn result_path(result: &SearchResult) -> SelectedPath {
    let name = result.name.clone();
    match result.kind {
        EntityKind::Lob => SelectedPath {
            lob: Some(name),
            ..SelectedPath::default()
        },
        EntityKind::SubjectArea => SelectedPath {
            lob: result.lob.clone(),
            subject: Some(name),
            ..SelectedPath::default()
        },
        EntityKind::Database => SelectedPath {
            lob: result.lob.clone(),
            subject: result.subject.clone(),
            database: Some(name),
            table: None,
        },
        EntityKind::Table => SelectedPath {
            lob: result.lob.clone(),
            subject: result.subject.clone(),
            database: result.database.clone(),
            table: Some(name),
        },
    }
}

/// A query that has been issued and not yet answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub seq: u64,
    pub query: String,
}

#[derive(Debug, Default)]
pub struct SearchBar {
    query: String,
    seq: u64,
    pending: Option<u64>,
    results: Vec<SearchResult>,
    error: Option<String>,
}

impl SearchBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn groups(&self) -> Vec<ResultGroup<'_>> {
        group_results(&self.results)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Record a keystroke. Returns the query to send, or `None` when the
    /// box is now empty, in which case results are cleared and any request
    /// still in flight becomes stale.
    pub fn input(&mut self, query: impl Into<String>) -> Option<SearchTicket> {
        self.query = query.into();
        self.seq += 1;
        self.error = None;
        if self.query.trim().is_empty() {
            self.pending = None;
            self.results.clear();
            return None;
        }
        self.pending = Some(self.seq);
        Some(SearchTicket {
            seq: self.seq,
            query: self.query.clone(),
        })
    }

    /// Apply a response. Returns false and leaves state alone when the
    /// ticket has been superseded by a later keystroke.
    pub fn apply(
        &mut self,
        ticket: &SearchTicket,
        response: Result<Vec<SearchResult>, ClientError>,
    ) -> bool {
        if self.pending != Some(ticket.seq) {
            debug!(seq = ticket.seq, query = %ticket.query, "dropping stale search response");
            return false;
        }
        self.pending = None;
        match response {
            Ok(results) => {
                self.results = results;
                self.error = None;
            }
            Err(e) => {
                self.results.clear();
                self.error = Some(e.user_message());
            }
        }
        true
    }

    /// Keystroke plus request plus apply, for callers that do not overlap
    /// queries themselves.
    pub async fn search(&mut self, client: &ApiClient, query: impl Into<String>) -> bool {
        let Some(ticket) = self.input(query) else {
            return false;
        };
        let response = client.search(&ticket.query).await;
        self.apply(&ticket, response)
    }

    /// Write the chosen result's path and reset the box.
    pub fn select(&mut self, result: &SearchResult, path: &mut SelectedPath) {
        *path = result_path(result);
        self.query.clear();
        self.results.clear();
        self.pending = None;
        self.seq += 1;
    }
}

/// Offline search over an already loaded hierarchy.
#[derive(Debug, Clone, Default)]
pub struct LocalIndex {
    entries: Vec<HierarchyEntry>,
}

impl LocalIndex {
    pub fn new(hierarchy: &Hierarchy) -> Self {
        Self {
            entries: hierarchy.entries(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive substring match on name or breadcrumb, as search
    /// results so they group and select the same way as remote ones.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.breadcrumb.to_lowercase().contains(&needle)
            })
            .map(|e| SearchResult {
                name: e.name.clone(),
                kind: e.kind,
                lob: ancestor(&e.path.lob, e.kind, EntityKind::Lob),
                subject: ancestor(&e.path.subject, e.kind, EntityKind::SubjectArea),
                database: ancestor(&e.path.database, e.kind, EntityKind::Database),
            })
            .collect()
    }
}

fn ancestor(level: &Option<String>, kind: EntityKind, level_kind: EntityKind) -> Option<String> {
    if level_kind < kind { level.clone() } else { None }
}
