//! Placement and geometry for the canvas: grid positions for freshly
//! projected nodes, card boxes, edge anchors, label offsets and fit-to-view.

use crate::ir::{GraphIR, GraphNode, Position};
use crate::measure::TextMetrics;
use crate::model::TableId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Attributes shown on a collapsed schema card.
pub const COLLAPSED_ATTRIBUTES: usize = 5;

/// Deterministic grid: `x = (i % columns) * col_width`,
/// `y = (i / columns) * row_height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: usize,
    pub col_width: f64,
    pub row_height: f64,
    /// Max offset applied by [`GridLayout::jittered`] on each axis.
    pub jitter: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: 3,
            col_width: 600.0,
            row_height: 320.0,
            jitter: 40.0,
        }
    }
}

impl GridLayout {
    pub fn position(&self, index: usize) -> Position {
        let columns = self.columns.max(1);
        Position {
            x: (index % columns) as f64 * self.col_width,
            y: (index / columns) as f64 * self.row_height,
        }
    }

    /// Grid slot `index` nudged by a random offset, for nodes added to a
    /// graph that is already on screen.
    pub fn jittered<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Position {
        let base = self.position(index);
        if self.jitter <= 0.0 {
            return base;
        }
        Position {
            x: base.x + rng.gen_range(-self.jitter..=self.jitter),
            y: base.y + rng.gen_range(-self.jitter..=self.jitter),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    fn include(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x + w);
        self.max_y = self.max_y.max(y + h);
    }
}

/// Pan offset and zoom applied to graph coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub const MIN_ZOOM: f64 = 0.1;
    pub const MAX_ZOOM: f64 = 2.0;

    /// Viewport that centers `bounds` inside a `width × height` screen with
    /// `padding` (fraction of the content size) around it.
    pub fn fit(bounds: &Bounds, width: f64, height: f64, padding: f64) -> Self {
        let content_w = bounds.width().max(1.0) * (1.0 + padding);
        let content_h = bounds.height().max(1.0) * (1.0 + padding);
        let zoom = (width / content_w)
            .min(height / content_h)
            .clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        let (cx, cy) = bounds.center();
        Self {
            x: width / 2.0 - cx * zoom,
            y: height / 2.0 - cy * zoom,
            zoom,
        }
    }

    pub fn to_graph(&self, screen_x: f64, screen_y: f64) -> (f64, f64) {
        ((screen_x - self.x) / self.zoom, (screen_y - self.y) / self.zoom)
    }
}

/// A placed schema card.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: TableId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub header_height: f64,
    pub subtitle: Option<String>,
    /// Attribute rows drawn on the card.
    pub rows: Vec<String>,
    /// Show-more / show-less row, when the table has more than
    /// [`COLLAPSED_ATTRIBUTES`] attributes.
    pub toggle: Option<String>,
}

impl LayoutNode {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    /// Handle on the right edge where outgoing edges start.
    pub fn source_anchor(&self) -> (f64, f64) {
        (self.x + self.width, self.y + self.height / 2.0)
    }

    /// Handle on the left edge where incoming edges end.
    pub fn target_anchor(&self) -> (f64, f64) {
        (self.x, self.y + self.height / 2.0)
    }
}

/// A straight edge with its label position.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    pub id: String,
    /// Position of the edge in [`GraphIR::edges`].
    pub index: usize,
    pub from_point: (f64, f64),
    pub to_point: (f64, f64),
    pub label_point: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub bounds: Bounds,
}

impl Layout {
    pub fn node_at(&self, x: f64, y: f64) -> Option<&LayoutNode> {
        // topmost card wins; later nodes are drawn on top
        self.nodes.iter().rev().find(|n| n.contains(x, y))
    }
}

/// Offset that moves a label off the line, perpendicular to the edge
/// direction: `(sin θ · d, −cos θ · d)`.
pub fn label_offset(from: (f64, f64), to: (f64, f64), distance: f64) -> (f64, f64) {
    let angle = (to.1 - from.1).atan2(to.0 - from.0);
    (angle.sin() * distance, -angle.cos() * distance)
}

/// Attribute rows and toggle text for a card.
pub fn card_rows(node: &GraphNode, expanded: bool) -> (Vec<String>, Option<String>) {
    let attributes = node.data.table.attribute_names();
    let total = attributes.len();
    if total <= COLLAPSED_ATTRIBUTES {
        return (attributes.into_iter().map(str::to_string).collect(), None);
    }
    if expanded {
        (
            attributes.into_iter().map(str::to_string).collect(),
            Some("Show less".to_string()),
        )
    } else {
        (
            attributes
                .into_iter()
                .take(COLLAPSED_ATTRIBUTES)
                .map(str::to_string)
                .collect(),
            Some(format!("Show {} more", total - COLLAPSED_ATTRIBUTES)),
        )
    }
}

pub fn card_subtitle(node: &GraphNode) -> Option<String> {
    let table = &node.data.table;
    match (&table.schema_name, &table.database_name) {
        (Some(schema), Some(db)) => Some(format!("{db}.{schema}")),
        (Some(schema), None) => Some(schema.clone()),
        (None, Some(db)) => Some(db.clone()),
        (None, None) => None,
    }
}

pub struct LayoutEngine {
    metrics: TextMetrics,
    label_distance: f64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self {
            metrics: TextMetrics::default(),
            label_distance: 20.0,
        }
    }
}

impl LayoutEngine {
    pub fn metrics(&self) -> &TextMetrics {
        &self.metrics
    }

    /// Size every card at its stored position and route every edge as a
    /// straight segment between handles.
    pub fn layout(&self, ir: &GraphIR, expanded: &HashSet<TableId>) -> Layout {
        let mut bounds: Option<Bounds> = None;

        let nodes: Vec<LayoutNode> = ir
            .nodes
            .iter()
            .map(|node| {
                let (rows, toggle) = card_rows(node, expanded.contains(&node.id));
                let subtitle = card_subtitle(node);
                let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
                let (width, height) = self.metrics.card_size(
                    node.label(),
                    subtitle.as_deref(),
                    &row_refs,
                    toggle.as_deref(),
                );
                let (x, y) = (node.position.x, node.position.y);
                match bounds.as_mut() {
                    Some(b) => b.include(x, y, width, height),
                    None => {
                        bounds = Some(Bounds {
                            min_x: x,
                            min_y: y,
                            max_x: x + width,
                            max_y: y + height,
                        })
                    }
                }
                LayoutNode {
                    id: node.id.clone(),
                    x,
                    y,
                    width,
                    height,
                    header_height: self.metrics.header_height(subtitle.is_some()),
                    subtitle,
                    rows,
                    toggle,
                }
            })
            .collect();

        let edges: Vec<LayoutEdge> = ir
            .edges
            .iter()
            .enumerate()
            .filter_map(|(index, edge)| {
                let from = nodes.iter().find(|n| n.id == edge.source)?;
                let to = nodes.iter().find(|n| n.id == edge.target)?;
                let from_point = from.source_anchor();
                let to_point = to.target_anchor();
                let (dx, dy) = label_offset(from_point, to_point, self.label_distance);
                let mid = (
                    (from_point.0 + to_point.0) / 2.0,
                    (from_point.1 + to_point.1) / 2.0,
                );
                Some(LayoutEdge {
                    id: edge.id.clone(),
                    index,
                    from_point,
                    to_point,
                    label_point: (mid.0 + dx, mid.1 + dy),
                })
            })
            .collect();

        Layout {
            nodes,
            edges,
            bounds: bounds.unwrap_or(Bounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 0.0,
                max_y: 0.0,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{GraphEdge, NodeData};
    use crate::model::Table;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn node(id: &str, x: f64, y: f64, attrs: usize) -> GraphNode {
        let table = Table::new(id, format!("t{id}"))
            .with_attributes((0..attrs).map(|i| format!("col_{i}")));
        GraphNode {
            id: id.into(),
            position: Position::new(x, y),
            data: NodeData {
                table,
                resolved: true,
                foreign_keys: vec![],
            },
        }
    }

    #[test]
    fn test_grid_positions() {
        let grid = GridLayout::default();
        assert_eq!(grid.position(0), Position::new(0.0, 0.0));
        assert_eq!(grid.position(2), Position::new(1200.0, 0.0));
        assert_eq!(grid.position(4), Position::new(600.0, 320.0));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let grid = GridLayout::default();
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..20 {
            let p = grid.jittered(i, &mut rng);
            let base = grid.position(i);
            assert!((p.x - base.x).abs() <= grid.jitter);
            assert!((p.y - base.y).abs() <= grid.jitter);
        }
    }

    #[test]
    fn test_label_offset_is_perpendicular() {
        // horizontal edge pointing right: label goes straight up
        let (dx, dy) = label_offset((0.0, 0.0), (100.0, 0.0), 20.0);
        assert!(dx.abs() < 1e-9);
        assert!((dy + 20.0).abs() < 1e-9);

        // vertical edge pointing down: label goes right
        let (dx, dy) = label_offset((0.0, 0.0), (0.0, 100.0), 20.0);
        assert!((dx - 20.0).abs() < 1e-9);
        assert!(dy.abs() < 1e-9);

        let (dx, dy) = label_offset((0.0, 0.0), (30.0, 40.0), 20.0);
        assert!(((dx * dx + dy * dy).sqrt() - 20.0).abs() < 1e-9);
        // dot product with direction is zero
        assert!((dx * 30.0 + dy * 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_card_rows_collapse_after_five() {
        let small = node("1", 0.0, 0.0, 3);
        assert_eq!(card_rows(&small, false), (vec!["col_0".into(), "col_1".into(), "col_2".into()], None));

        let big = node("2", 0.0, 0.0, 8);
        let (rows, toggle) = card_rows(&big, false);
        assert_eq!(rows.len(), 5);
        assert_eq!(toggle.as_deref(), Some("Show 3 more"));

        let (rows, toggle) = card_rows(&big, true);
        assert_eq!(rows.len(), 8);
        assert_eq!(toggle.as_deref(), Some("Show less"));
    }

    #[test]
    fn test_layout_edges_use_handles() {
        let ir = GraphIR {
            nodes: vec![node("1", 0.0, 0.0, 2), node("2", 600.0, 0.0, 2)],
            edges: vec![GraphEdge {
                id: "e1-2".into(),
                source: "1".into(),
                target: "2".into(),
                label: "a → b (one-to-one)".into(),
                relationships: vec![],
            }],
        };
        let layout = LayoutEngine::default().layout(&ir, &HashSet::new());

        assert_eq!(layout.nodes.len(), 2);
        assert_eq!(layout.edges.len(), 1);
        let from = &layout.nodes[0];
        let edge = &layout.edges[0];
        assert_eq!(edge.from_point, from.source_anchor());
        assert_eq!(edge.to_point, (600.0, layout.nodes[1].height / 2.0));
        // label sits above a left-to-right horizontal edge
        assert!(edge.label_point.1 < edge.from_point.1);
        assert_eq!(layout.bounds.min_x, 0.0);
        assert_eq!(layout.bounds.max_x, 600.0 + layout.nodes[1].width);
    }

    #[test]
    fn test_edges_to_missing_nodes_are_skipped() {
        let ir = GraphIR {
            nodes: vec![node("1", 0.0, 0.0, 1)],
            edges: vec![GraphEdge {
                id: "e1-9".into(),
                source: "1".into(),
                target: "9".into(),
                label: String::new(),
                relationships: vec![],
            }],
        };
        let layout = LayoutEngine::default().layout(&ir, &HashSet::new());
        assert!(layout.edges.is_empty());
    }

    #[test]
    fn test_fit_centers_content() {
        let bounds = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1000.0,
            max_y: 500.0,
        };
        let vp = Viewport::fit(&bounds, 1300.0, 650.0, 0.3);
        assert!((vp.zoom - 1.0).abs() < 1e-9);
        let (cx, cy) = bounds.center();
        assert!((vp.x + cx * vp.zoom - 650.0).abs() < 1e-9);
        assert!((vp.y + cy * vp.zoom - 325.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_clamps_zoom() {
        let tiny = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1.0,
            max_y: 1.0,
        };
        assert_eq!(Viewport::fit(&tiny, 1000.0, 1000.0, 0.3).zoom, Viewport::MAX_ZOOM);
    }

    #[test]
    fn test_node_hit_testing() {
        let ir = GraphIR {
            nodes: vec![node("1", 0.0, 0.0, 1), node("2", 50.0, 10.0, 1)],
            edges: vec![],
        };
        let layout = LayoutEngine::default().layout(&ir, &HashSet::new());
        assert_eq!(layout.node_at(60.0, 20.0).unwrap().id, TableId::from("2"));
        assert_eq!(layout.node_at(5.0, 5.0).unwrap().id, TableId::from("1"));
        assert!(layout.node_at(-5.0, -5.0).is_none());
    }
}
