//! Cascading filter menu over the hierarchy.
//!
//! The tree is fetched once; hovering an item opens the next level beside
//! it and clicking any item writes the whole chain to the [`SelectedPath`].

use crate::client::{ApiClient, ClientError};
use crate::hierarchy::{Hierarchy, HierarchyNode};
use crate::model::EntityKind;
use crate::selection::SelectedPath;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("unknown {kind}: {name}")]
    NotFound { kind: &'static str, name: String },
    #[error("menu chain must name 1 to 4 levels, got {0}")]
    BadDepth(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub name: String,
    pub kind: EntityKind,
    pub has_children: bool,
    pub hovered: bool,
}

/// One open column of the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub kind: EntityKind,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Default)]
pub struct FilterBar {
    hierarchy: Hierarchy,
    open: bool,
    /// Names hovered at each level, outermost first.
    hover: Vec<String>,
}

impl FilterBar {
    pub fn new(hierarchy: Hierarchy) -> Self {
        Self {
            hierarchy,
            open: false,
            hover: Vec::new(),
        }
    }

    pub async fn load(client: &ApiClient) -> Result<Self, ClientError> {
        let hierarchy = client.hierarchy().await?;
        debug!(lobs = hierarchy.lobs.len(), "hierarchy loaded");
        Ok(Self::new(hierarchy))
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.hover.clear();
    }

    /// Hover the item `name` at `level` (0 = LOB). Deeper hovers are
    /// dropped since their parent changed.
    pub fn hover(&mut self, level: usize, name: impl Into<String>) {
        if level > self.hover.len() || level > 3 {
            return;
        }
        self.hover.truncate(level);
        self.hover.push(name.into());
    }

    /// Columns currently visible: the LOB list plus one submenu per hovered
    /// item that has children.
    pub fn menus(&self) -> Vec<Menu> {
        if !self.open {
            return Vec::new();
        }
        let mut menus = vec![menu(EntityKind::Lob, &self.hierarchy.lobs, self.hover.first())];
        let mut siblings: &[HierarchyNode] = &self.hierarchy.lobs;

        for (depth, name) in self.hover.iter().enumerate() {
            let Some(node) = siblings.iter().find(|n| &n.name == name) else {
                break;
            };
            if node.children.is_empty() || depth + 1 >= EntityKind::ORDER.len() {
                break;
            }
            menus.push(menu(
                EntityKind::ORDER[depth + 1],
                &node.children,
                self.hover.get(depth + 1),
            ));
            siblings = &node.children;
        }
        menus
    }

    /// Select the item reached by `chain` (LOB first). Every ancestor is
    /// written along with it and deeper levels are cleared.
    pub fn choose(&mut self, chain: &[&str], path: &mut SelectedPath) -> Result<(), NavigationError> {
        if chain.is_empty() || chain.len() > 4 {
            return Err(NavigationError::BadDepth(chain.len()));
        }
        let mut siblings: &[HierarchyNode] = &self.hierarchy.lobs;
        for (depth, name) in chain.iter().enumerate() {
            let node = siblings
                .iter()
                .find(|n| n.name == *name)
                .ok_or_else(|| NavigationError::NotFound {
                    kind: EntityKind::ORDER[depth].label(),
                    name: name.to_string(),
                })?;
            siblings = &node.children;
        }

        let mut next = SelectedPath::default();
        next.select_lob(chain[0]);
        if let Some(subject) = chain.get(1) {
            next.select_subject(*subject);
        }
        if let Some(database) = chain.get(2) {
            next.select_database(*database);
        }
        if let Some(table) = chain.get(3) {
            next.select_table(*table);
        }
        *path = next;
        self.close();
        Ok(())
    }

    /// Button caption for the current selection.
    pub fn caption(path: &SelectedPath) -> String {
        if path.is_empty() {
            "Filter".to_string()
        } else {
            path.breadcrumb()
        }
    }
}

fn menu(kind: EntityKind, nodes: &[HierarchyNode], hovered: Option<&String>) -> Menu {
    Menu {
        kind,
        items: nodes
            .iter()
            .map(|n| MenuItem {
                name: n.name.clone(),
                kind,
                has_children: !n.children.is_empty(),
                hovered: hovered == Some(&n.name),
            })
            .collect(),
    }
}
