//! Turns a flat relationship list into a [`GraphIR`].
//!
//! Projection never fails as a whole: a table whose metadata cannot be
//! fetched is still drawn, as a placeholder card named `Table {id}`.

use crate::client::{ApiClient, ClientError};
use crate::ir::{GraphEdge, GraphIR, GraphNode, NodeData};
use crate::layout::GridLayout;
use crate::model::{Relationship, Table, TableId};
use async_trait::async_trait;
use futures::future::join_all;
use rand::Rng;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Display;
use tracing::{debug, warn};

/// Source of table metadata for the projector.
#[async_trait(?Send)]
pub trait TableResolver {
    type Error: Display;

    /// `Ok(None)` when the table is unknown.
    async fn resolve(&self, id: &TableId) -> Result<Option<Table>, Self::Error>;
}

#[async_trait(?Send)]
impl TableResolver for ApiClient {
    type Error = ClientError;

    async fn resolve(&self, id: &TableId) -> Result<Option<Table>, ClientError> {
        match self.table(id).await {
            Ok(table) => Ok(Some(table)),
            Err(e) if e.status() == Some(reqwest::StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait(?Send)]
impl TableResolver for HashMap<TableId, Table> {
    type Error = Infallible;

    async fn resolve(&self, id: &TableId) -> Result<Option<Table>, Infallible> {
        Ok(self.get(id).cloned())
    }
}

/// Looks up a pre-fetched catalog first and asks `fallback` only for ids
/// the catalog does not hold.
pub struct CatalogResolver<'a, R> {
    catalog: HashMap<TableId, Table>,
    fallback: &'a R,
}

impl<'a, R: TableResolver> CatalogResolver<'a, R> {
    pub fn new(tables: impl IntoIterator<Item = Table>, fallback: &'a R) -> Self {
        Self {
            catalog: tables.into_iter().map(|t| (t.id.clone(), t)).collect(),
            fallback,
        }
    }
}

#[async_trait(?Send)]
impl<'a, R: TableResolver> TableResolver for CatalogResolver<'a, R> {
    type Error = R::Error;

    async fn resolve(&self, id: &TableId) -> Result<Option<Table>, R::Error> {
        if let Some(table) = self.catalog.get(id) {
            return Ok(Some(table.clone()));
        }
        self.fallback.resolve(id).await
    }
}

/// Table ids referenced by `relationships`, in order of first appearance.
pub fn referenced_tables(relationships: &[Relationship]) -> Vec<TableId> {
    let mut ids: Vec<TableId> = Vec::new();
    for rel in relationships {
        for id in [&rel.from_table_id, &rel.to_table_id] {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
    }
    ids
}

async fn resolve_node<R: TableResolver + ?Sized>(
    resolver: &R,
    id: &TableId,
) -> (Table, bool) {
    match resolver.resolve(id).await {
        Ok(Some(table)) => (table, true),
        Ok(None) => {
            warn!(table_id = %id, "table not found, using placeholder");
            (Table::placeholder(id), false)
        }
        Err(e) => {
            warn!(table_id = %id, error = %e, "failed to resolve table, using placeholder");
            (Table::placeholder(id), false)
        }
    }
}

pub struct Projector {
    grid: GridLayout,
}

impl Default for Projector {
    fn default() -> Self {
        Self {
            grid: GridLayout::default(),
        }
    }
}

impl Projector {
    pub fn new(grid: GridLayout) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }

    /// Full projection: one node per referenced table on the grid, one edge
    /// per ordered `(from, to)` table pair. Every lookup is issued in
    /// parallel and all of them finish before any node is emitted.
    pub async fn project<R: TableResolver + ?Sized>(
        &self,
        relationships: &[Relationship],
        resolver: &R,
    ) -> GraphIR {
        let ids = referenced_tables(relationships);
        debug!(
            relationships = relationships.len(),
            tables = ids.len(),
            "projecting relationships"
        );

        let resolved = join_all(ids.iter().map(|id| resolve_node(resolver, id))).await;

        let mut nodes: Vec<GraphNode> = ids
            .into_iter()
            .zip(resolved)
            .enumerate()
            .map(|(index, (id, (table, ok)))| GraphNode {
                id,
                position: self.grid.position(index),
                data: NodeData {
                    table,
                    resolved: ok,
                    foreign_keys: Vec::new(),
                },
            })
            .collect();

        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut by_pair: HashMap<(TableId, TableId), usize> = HashMap::new();

        for rel in relationships {
            let key = (rel.from_table_id.clone(), rel.to_table_id.clone());
            let index = *by_pair.entry(key).or_insert_with(|| {
                edges.push(GraphEdge {
                    id: GraphIR::edge_id(&rel.from_table_id, &rel.to_table_id),
                    source: rel.from_table_id.clone(),
                    target: rel.to_table_id.clone(),
                    label: String::new(),
                    relationships: Vec::new(),
                });
                edges.len() - 1
            });

            let edge = &mut edges[index];
            if has_column_pair(edge, rel) {
                continue;
            }
            push_line(edge, rel.clone());
        }

        for rel in relationships {
            mark_foreign_key(&mut nodes, rel);
        }

        GraphIR { nodes, edges }
    }

    /// Merge one newly created relationship into a graph that is already on
    /// screen.
    ///
    /// An edge joining the same two tables in either direction gets the new
    /// label line appended. Otherwise any missing table gets a jittered grid
    /// slot and a new edge is created.
    pub async fn add_relationship<R, G>(
        &self,
        graph: &mut GraphIR,
        rel: Relationship,
        resolver: &R,
        rng: &mut G,
    ) where
        R: TableResolver + ?Sized,
        G: Rng + ?Sized,
    {
        if let Some(index) = graph.edge_between(&rel.from_table_id, &rel.to_table_id) {
            let edge = &mut graph.edges[index];
            if !edge.relationships.iter().any(|r| r.links_same_columns(&rel)) {
                debug!(edge = %edge.id, "appending relationship to existing edge");
                push_line(edge, rel.clone());
            }
            mark_foreign_key(&mut graph.nodes, &rel);
            return;
        }

        for id in [&rel.from_table_id, &rel.to_table_id] {
            if graph.contains_node(id) {
                continue;
            }
            let (table, ok) = resolve_node(resolver, id).await;
            let position = self.grid.jittered(graph.nodes.len(), rng);
            graph.nodes.push(GraphNode {
                id: id.clone(),
                position,
                data: NodeData {
                    table,
                    resolved: ok,
                    foreign_keys: Vec::new(),
                },
            });
        }

        let base = GraphIR::edge_id(&rel.from_table_id, &rel.to_table_id);
        let id = match rel.id {
            Some(rel_id) => format!("{base}-{rel_id}"),
            None => base,
        };
        let mut edge = GraphEdge {
            id,
            source: rel.from_table_id.clone(),
            target: rel.to_table_id.clone(),
            label: String::new(),
            relationships: Vec::new(),
        };
        mark_foreign_key(&mut graph.nodes, &rel);
        push_line(&mut edge, rel);
        graph.edges.push(edge);
    }
}

/// Drop the relationship with `id` from whichever edge carries it. An edge
/// left without lines is removed; nodes stay. Returns false when no edge
/// held the relationship.
pub fn remove_relationship(graph: &mut GraphIR, id: i64) -> bool {
    let Some(index) = graph
        .edges
        .iter()
        .position(|e| e.relationships.iter().any(|r| r.id == Some(id)))
    else {
        return false;
    };

    let edge = &mut graph.edges[index];
    edge.relationships.retain(|r| r.id != Some(id));
    if edge.relationships.is_empty() {
        graph.edges.remove(index);
    } else {
        edge.label = edge
            .relationships
            .iter()
            .map(Relationship::label_line)
            .collect::<Vec<_>>()
            .join("\n");
    }
    true
}

/// Within one ordered `(from, to)` group only the column pair matters.
fn has_column_pair(edge: &GraphEdge, rel: &Relationship) -> bool {
    edge.relationships
        .iter()
        .any(|r| r.from_column == rel.from_column && r.to_column == rel.to_column)
}

fn push_line(edge: &mut GraphEdge, rel: Relationship) {
    if !edge.label.is_empty() {
        edge.label.push('\n');
    }
    edge.label.push_str(&rel.label_line());
    edge.relationships.push(rel);
}

fn mark_foreign_key(nodes: &mut [GraphNode], rel: &Relationship) {
    if let Some(node) = nodes.iter_mut().find(|n| n.id == rel.from_table_id) {
        if !node.data.foreign_keys.contains(&rel.from_column) {
            node.data.foreign_keys.push(rel.from_column.clone());
        }
    }
}
