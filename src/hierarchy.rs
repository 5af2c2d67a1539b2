//! Organizational hierarchy: LOB → Subject Area → Database → Table.

use crate::model::EntityKind;
use crate::selection::SelectedPath;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: String,
    pub name: String,
    pub level: EntityKind,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn child(&self, name: &str) -> Option<&HierarchyNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }
}

/// The whole tree as served by `GET /hierarchy`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, WireLob>")]
pub struct Hierarchy {
    pub lobs: Vec<HierarchyNode>,
}

/// A flattened node with its ancestry, used for local search.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyEntry {
    pub kind: EntityKind,
    pub name: String,
    pub path: SelectedPath,
    pub breadcrumb: String,
}

impl Hierarchy {
    pub fn new(lobs: Vec<HierarchyNode>) -> Self {
        Self { lobs }
    }

    pub fn lob(&self, name: &str) -> Option<&HierarchyNode> {
        self.lobs.iter().find(|l| l.name == name)
    }

    pub fn lob_names(&self) -> Vec<&str> {
        self.lobs.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn subject_areas(&self, lob: &str) -> &[HierarchyNode] {
        self.lob(lob).map(|l| l.children.as_slice()).unwrap_or(&[])
    }

    pub fn databases(&self, lob: &str, subject: &str) -> &[HierarchyNode] {
        self.lob(lob)
            .and_then(|l| l.child(subject))
            .map(|s| s.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn tables(&self, lob: &str, subject: &str, database: &str) -> &[HierarchyNode] {
        self.lob(lob)
            .and_then(|l| l.child(subject))
            .and_then(|s| s.child(database))
            .map(|d| d.children.as_slice())
            .unwrap_or(&[])
    }

    /// Deepest node named by `path`, or `None` if any set level is unknown.
    pub fn resolve(&self, path: &SelectedPath) -> Option<&HierarchyNode> {
        let mut node = self.lob(path.lob.as_deref()?)?;
        for name in [&path.subject, &path.database, &path.table] {
            match name {
                Some(name) => node = node.child(name)?,
                None => break,
            }
        }
        Some(node)
    }

    /// Depth-first listing of every node with its path and breadcrumb.
    pub fn entries(&self) -> Vec<HierarchyEntry> {
        let mut out = Vec::new();
        for lob in &self.lobs {
            let lob_path = SelectedPath::default().with_lob(&lob.name);
            out.push(entry(lob, lob_path.clone()));
            for subject in &lob.children {
                let subject_path = lob_path.clone().with_subject(&subject.name);
                out.push(entry(subject, subject_path.clone()));
                for database in &subject.children {
                    let database_path = subject_path.clone().with_database(&database.name);
                    out.push(entry(database, database_path.clone()));
                    for table in &database.children {
                        out.push(entry(table, database_path.clone().with_table(&table.name)));
                    }
                }
            }
        }
        out
    }
}

fn entry(node: &HierarchyNode, path: SelectedPath) -> HierarchyEntry {
    HierarchyEntry {
        kind: node.level,
        name: node.name.clone(),
        breadcrumb: path.breadcrumb(),
        path,
    }
}

#[derive(Debug, Deserialize)]
struct WireLob {
    name: String,
    #[serde(default)]
    subject_areas: BTreeMap<String, WireSubjectArea>,
}

#[derive(Debug, Deserialize)]
struct WireSubjectArea {
    name: String,
    #[serde(default)]
    databases: BTreeMap<String, WireDatabase>,
}

#[derive(Debug, Deserialize)]
struct WireDatabase {
    name: String,
    #[serde(default)]
    tables: BTreeMap<String, String>,
}

impl From<BTreeMap<String, WireLob>> for Hierarchy {
    fn from(wire: BTreeMap<String, WireLob>) -> Self {
        let lobs = wire
            .into_iter()
            .map(|(id, lob)| {
                let subjects = lob
                    .subject_areas
                    .into_iter()
                    .map(|(id, sa)| {
                        let databases = sa
                            .databases
                            .into_iter()
                            .map(|(id, db)| {
                                let tables = db
                                    .tables
                                    .into_iter()
                                    .map(|(id, name)| node(id, name, EntityKind::Table, Vec::new()))
                                    .collect();
                                node(id, db.name, EntityKind::Database, tables)
                            })
                            .collect();
                        node(id, sa.name, EntityKind::SubjectArea, databases)
                    })
                    .collect();
                node(id, lob.name, EntityKind::Lob, subjects)
            })
            .collect();

        Hierarchy {
            lobs: order_siblings("(root)", lobs),
        }
    }
}

fn node(id: String, name: String, level: EntityKind, children: Vec<HierarchyNode>) -> HierarchyNode {
    let children = order_siblings(&name, children);
    HierarchyNode {
        id,
        name,
        level,
        children,
    }
}

/// Order siblings by numeric id and drop repeated names (first wins).
fn order_siblings(parent: &str, mut nodes: Vec<HierarchyNode>) -> Vec<HierarchyNode> {
    nodes.sort_by_key(|n| id_sort_key(&n.id));

    let mut seen = HashSet::new();
    nodes.retain(|n| {
        if seen.insert(n.name.clone()) {
            true
        } else {
            tracing::warn!(parent, name = %n.name, id = %n.id, "dropping duplicate hierarchy name");
            false
        }
    });
    nodes
}

fn id_sort_key(id: &str) -> (u8, i64, String) {
    match id.parse::<i64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, id.to_string()),
    }
}
