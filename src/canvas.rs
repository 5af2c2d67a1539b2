//! Interactive state of the diagram surface.
//!
//! Timestamps are passed in by the host as a monotonic [`Duration`] since
//! its own clock origin, so the same code runs under a native runtime and
//! in the browser.

use crate::ir::{GraphIR, Position};
use crate::layout::{Layout, LayoutEngine, LayoutNode, Viewport};
use crate::model::TableId;
use crate::selection::SelectedPath;
use crate::svg::{Frame, SvgRenderer};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

pub const FIT_DEBOUNCE: Duration = Duration::from_millis(100);
pub const FIT_PADDING: f64 = 0.3;
pub const EXPORT_MARGIN: f64 = 40.0;

#[derive(Debug, Clone, PartialEq)]
struct Drag {
    id: TableId,
    /// Pointer position minus node origin, in graph units.
    grab: (f64, f64),
}

/// What a click on the surface hit.
#[derive(Debug, Clone, PartialEq)]
pub enum Hit {
    /// A card body; the table is now selected.
    Table(TableId),
    /// The show-more / show-less row of a card.
    Toggle(TableId),
    Empty,
}

pub struct Canvas {
    graph: GraphIR,
    engine: LayoutEngine,
    layout: Layout,
    viewport: Viewport,
    width: f64,
    height: f64,
    expanded: HashSet<TableId>,
    darkmode: bool,
    fit_due: Option<Duration>,
    drag: Option<Drag>,
}

impl Canvas {
    pub fn new(width: f64, height: f64, darkmode: bool) -> Self {
        let engine = LayoutEngine::default();
        let graph = GraphIR::default();
        let layout = engine.layout(&graph, &HashSet::new());
        Self {
            graph,
            engine,
            layout,
            viewport: Viewport::default(),
            width,
            height,
            expanded: HashSet::new(),
            darkmode,
            fit_due: None,
            drag: None,
        }
    }

    pub fn graph(&self) -> &GraphIR {
        &self.graph
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn darkmode(&self) -> bool {
        self.darkmode
    }

    pub fn set_darkmode(&mut self, darkmode: bool) {
        self.darkmode = darkmode;
    }

    pub fn is_expanded(&self, id: &TableId) -> bool {
        self.expanded.contains(id)
    }

    /// True while an auto-fit is scheduled but not yet applied.
    pub fn fit_pending(&self) -> bool {
        self.fit_due.is_some()
    }

    /// Replace the whole graph. Expansion state of tables that are gone is
    /// forgotten and a fit is scheduled.
    pub fn set_graph(&mut self, graph: GraphIR, now: Duration) {
        self.expanded.retain(|id| graph.contains_node(id));
        self.graph = graph;
        self.drag = None;
        self.relayout();
        self.schedule_fit(now);
    }

    /// Mutate the graph in place (incremental add, removal) and schedule a
    /// fit.
    pub fn update_graph<T>(&mut self, now: Duration, f: impl FnOnce(&mut GraphIR) -> T) -> T {
        let out = f(&mut self.graph);
        self.relayout();
        self.schedule_fit(now);
        out
    }

    pub fn resize(&mut self, width: f64, height: f64, now: Duration) {
        self.width = width;
        self.height = height;
        self.schedule_fit(now);
    }

    fn schedule_fit(&mut self, now: Duration) {
        // a later change pushes the deadline back
        self.fit_due = Some(now + FIT_DEBOUNCE);
    }

    /// Apply a scheduled fit once its debounce window has passed. Returns
    /// true when the viewport changed.
    pub fn poll_fit(&mut self, now: Duration) -> bool {
        match self.fit_due {
            Some(due) if now >= due => {
                self.fit_due = None;
                self.fit_view();
                true
            }
            _ => false,
        }
    }

    pub fn fit_view(&mut self) {
        if self.layout.nodes.is_empty() {
            self.viewport = Viewport::default();
            return;
        }
        self.viewport = Viewport::fit(&self.layout.bounds, self.width, self.height, FIT_PADDING);
        debug!(zoom = self.viewport.zoom, "fit view");
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.x += dx;
        self.viewport.y += dy;
    }

    /// Zoom by `factor` keeping the graph point under the cursor fixed.
    pub fn zoom_at(&mut self, factor: f64, screen_x: f64, screen_y: f64) {
        let (gx, gy) = self.viewport.to_graph(screen_x, screen_y);
        let zoom = (self.viewport.zoom * factor).clamp(Viewport::MIN_ZOOM, Viewport::MAX_ZOOM);
        self.viewport = Viewport {
            x: screen_x - gx * zoom,
            y: screen_y - gy * zoom,
            zoom,
        };
    }

    fn node_at_screen(&self, screen_x: f64, screen_y: f64) -> Option<(&LayoutNode, f64, f64)> {
        let (gx, gy) = self.viewport.to_graph(screen_x, screen_y);
        self.layout.node_at(gx, gy).map(|n| (n, gx, gy))
    }

    /// Start dragging the card under the pointer, if any.
    pub fn begin_drag(&mut self, screen_x: f64, screen_y: f64) -> Option<TableId> {
        let (node, gx, gy) = self.node_at_screen(screen_x, screen_y)?;
        let drag = Drag {
            id: node.id.clone(),
            grab: (gx - node.x, gy - node.y),
        };
        let id = drag.id.clone();
        self.drag = Some(drag);
        Some(id)
    }

    pub fn drag_to(&mut self, screen_x: f64, screen_y: f64) {
        let Some(drag) = &self.drag else {
            return;
        };
        let (gx, gy) = self.viewport.to_graph(screen_x, screen_y);
        let position = Position::new(gx - drag.grab.0, gy - drag.grab.1);
        let id = drag.id.clone();
        if let Some(node) = self.graph.node_mut(&id) {
            node.position = position;
            self.relayout();
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn toggle_expanded(&mut self, id: &TableId) {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.clone());
        }
        self.relayout();
    }

    /// Select the table of node `id` in `path`. Ancestors already chosen
    /// stay as they are.
    pub fn select_node(&self, id: &TableId, path: &mut SelectedPath) -> bool {
        match self.graph.node(id) {
            Some(node) => {
                path.select_table(node.label());
                true
            }
            None => false,
        }
    }

    /// Handle a click at a screen point.
    pub fn click(&mut self, screen_x: f64, screen_y: f64, path: &mut SelectedPath) -> Hit {
        let Some((node, _, gy)) = self.node_at_screen(screen_x, screen_y) else {
            return Hit::Empty;
        };
        let id = node.id.clone();
        if node.toggle.is_some() && self.on_toggle_row(node, gy) {
            self.toggle_expanded(&id);
            return Hit::Toggle(id);
        }
        self.select_node(&id, path);
        Hit::Table(id)
    }

    fn on_toggle_row(&self, node: &LayoutNode, gy: f64) -> bool {
        let m = self.engine.metrics();
        let top = node.y + node.header_height + m.padding_y + node.rows.len() as f64 * m.line_height;
        gy >= top && gy <= top + m.line_height
    }

    fn relayout(&mut self) {
        self.layout = self.engine.layout(&self.graph, &self.expanded);
    }

    /// SVG of the current screen: pan/zoom applied, legend pinned.
    pub fn render(&self) -> String {
        let frame = Frame {
            width: self.width,
            height: self.height,
            viewport: self.viewport,
        };
        SvgRenderer::new(self.darkmode).render(&self.graph, &self.layout, &frame)
    }

    /// SVG of the whole graph at 1:1, independent of the viewport.
    pub fn export_svg(&self) -> String {
        let frame = Frame::around(&self.layout, EXPORT_MARGIN);
        SvgRenderer::new(self.darkmode).render(&self.graph, &self.layout, &frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{GraphNode, NodeData};
    use crate::model::Table;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn graph(attrs: usize) -> GraphIR {
        let nodes = [("1", 0.0), ("2", 600.0)]
            .into_iter()
            .map(|(id, x)| GraphNode {
                id: id.into(),
                position: Position::new(x, 0.0),
                data: NodeData {
                    table: Table::new(id, format!("table_{id}"))
                        .with_attributes((0..attrs).map(|i| format!("c{i}"))),
                    resolved: true,
                    foreign_keys: vec![],
                },
            })
            .collect();
        GraphIR {
            nodes,
            edges: vec![],
        }
    }

    #[test]
    fn test_fit_is_debounced() {
        let mut canvas = Canvas::new(1200.0, 800.0, false);
        canvas.set_graph(graph(2), ms(0));
        assert!(canvas.fit_pending());
        assert!(!canvas.poll_fit(ms(50)));

        // resize inside the window pushes the deadline
        canvas.resize(1000.0, 700.0, ms(80));
        assert!(!canvas.poll_fit(ms(120)));
        assert!(canvas.poll_fit(ms(180)));
        assert!(!canvas.fit_pending());

        let bounds = canvas.layout().bounds;
        let (cx, _) = bounds.center();
        let vp = canvas.viewport();
        assert!((vp.x + cx * vp.zoom - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_keeps_cursor_point() {
        let mut canvas = Canvas::new(800.0, 600.0, false);
        canvas.pan(30.0, 10.0);
        let before = canvas.viewport().to_graph(200.0, 150.0);
        canvas.zoom_at(1.5, 200.0, 150.0);
        let after = canvas.viewport().to_graph(200.0, 150.0);
        assert!((before.0 - after.0).abs() < 1e-9);
        assert!((before.1 - after.1).abs() < 1e-9);

        canvas.zoom_at(100.0, 0.0, 0.0);
        assert_eq!(canvas.viewport().zoom, Viewport::MAX_ZOOM);
    }

    #[test]
    fn test_drag_moves_node() {
        let mut canvas = Canvas::new(800.0, 600.0, false);
        canvas.set_graph(graph(2), ms(0));
        let id = canvas.begin_drag(10.0, 10.0).unwrap();
        assert_eq!(id, TableId::from("1"));
        canvas.drag_to(110.0, 60.0);
        canvas.end_drag();

        let node = canvas.graph().node(&id).unwrap();
        assert_eq!(node.position, Position::new(100.0, 50.0));
        assert_eq!(canvas.layout().nodes[0].x, 100.0);

        // moving after release does nothing
        canvas.drag_to(400.0, 400.0);
        assert_eq!(canvas.graph().node(&id).unwrap().position, Position::new(100.0, 50.0));
    }

    #[test]
    fn test_click_selects_table() {
        let mut canvas = Canvas::new(800.0, 600.0, false);
        canvas.set_graph(graph(2), ms(0));
        let mut path = SelectedPath::default()
            .with_lob("Retail")
            .with_subject("Sales")
            .with_database("shop");

        assert_eq!(canvas.click(610.0, 10.0, &mut path), Hit::Table("2".into()));
        assert_eq!(path.table.as_deref(), Some("table_2"));
        assert_eq!(path.database.as_deref(), Some("shop"));

        assert_eq!(canvas.click(400.0, 500.0, &mut path), Hit::Empty);
    }

    #[test]
    fn test_click_toggle_row_expands() {
        let mut canvas = Canvas::new(800.0, 600.0, false);
        canvas.set_graph(graph(8), ms(0));
        let node = canvas.layout().nodes[0].clone();
        assert_eq!(node.toggle.as_deref(), Some("Show 3 more"));

        let m = crate::measure::TextMetrics::default();
        let toggle_y = node.y + node.header_height + m.padding_y + 5.0 * m.line_height + 5.0;
        let mut path = SelectedPath::default();
        assert_eq!(canvas.click(10.0, toggle_y, &mut path), Hit::Toggle("1".into()));
        assert!(canvas.is_expanded(&"1".into()));
        assert_eq!(canvas.layout().nodes[0].rows.len(), 8);
        assert!(path.table.is_none());
    }

    #[test]
    fn test_set_graph_forgets_stale_expansion() {
        let mut canvas = Canvas::new(800.0, 600.0, false);
        canvas.set_graph(graph(8), ms(0));
        canvas.toggle_expanded(&"2".into());
        assert!(canvas.is_expanded(&"2".into()));

        let mut smaller = graph(8);
        smaller.nodes.truncate(1);
        canvas.set_graph(smaller, ms(10));
        assert!(!canvas.is_expanded(&"2".into()));
    }

    #[test]
    fn test_update_graph_schedules_fit() {
        let mut canvas = Canvas::new(800.0, 600.0, false);
        canvas.set_graph(graph(1), ms(0));
        canvas.poll_fit(ms(200));
        let removed = canvas.update_graph(ms(300), |g| g.nodes.pop().is_some());
        assert!(removed);
        assert_eq!(canvas.layout().nodes.len(), 1);
        assert!(canvas.fit_pending());
    }

    #[test]
    fn test_render_applies_viewport() {
        let mut canvas = Canvas::new(800.0, 600.0, true);
        canvas.set_graph(graph(1), ms(0));
        canvas.pan(15.0, 25.0);
        let svg = canvas.render();
        assert!(svg.contains(r#"width="800""#));
        assert!(svg.contains("translate(15 25)"));
        assert!(canvas.export_svg().contains("translate(40 40)"));
    }
}
