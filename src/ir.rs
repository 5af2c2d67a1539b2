//! Graph model handed to the canvas: one node per table, one edge per
//! ordered table pair.

use crate::model::{Multiplicity, Relationship, Table, TableId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub table: Table,
    /// False when the table metadata could not be fetched.
    pub resolved: bool,
    /// Columns that appear as the source side of a projected relationship.
    #[serde(default)]
    pub foreign_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: TableId,
    pub position: Position,
    pub data: NodeData,
}

impl GraphNode {
    pub fn label(&self) -> &str {
        &self.data.table.name
    }

    pub fn is_foreign_key(&self, column: &str) -> bool {
        self.data.foreign_keys.iter().any(|c| c == column) || self.data.table.is_foreign_key(column)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.data.table.is_primary_key(column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: TableId,
    pub target: TableId,
    /// Newline-joined `"{from} → {to} ({cardinality})"` lines.
    pub label: String,
    /// Relationships behind each label line, same order.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl GraphEdge {
    pub fn label_lines(&self) -> Vec<&str> {
        if self.label.is_empty() {
            Vec::new()
        } else {
            self.label.split('\n').collect()
        }
    }

    /// True if the edge joins `a` and `b` in either direction.
    pub fn connects(&self, a: &TableId, b: &TableId) -> bool {
        (&self.source == a && &self.target == b) || (&self.source == b && &self.target == a)
    }

    /// Start/end markers taken from the first relationship on the edge,
    /// flipped when that relationship runs target → source.
    pub fn end_markers(&self) -> (Multiplicity, Multiplicity) {
        for rel in &self.relationships {
            let (from_end, to_end) = rel.cardinality.ends();
            if rel.from_table_id == self.source && rel.to_table_id == self.target {
                return (from_end, to_end);
            }
            if rel.from_table_id == self.target && rel.to_table_id == self.source {
                return (to_end, from_end);
            }
        }
        (Multiplicity::One, Multiplicity::One)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphIR {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphIR {
    pub fn edge_id(source: &TableId, target: &TableId) -> String {
        format!("e{source}-{target}")
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &TableId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_mut(&mut self, id: &TableId) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    pub fn contains_node(&self, id: &TableId) -> bool {
        self.node(id).is_some()
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Index of the edge joining `a` and `b` in either direction.
    pub fn edge_between(&self, a: &TableId, b: &TableId) -> Option<usize> {
        self.edges.iter().position(|e| e.connects(a, b))
    }

    pub fn relationship_count(&self) -> usize {
        self.edges.iter().map(|e| e.relationships.len()).sum()
    }
}
