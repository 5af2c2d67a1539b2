use crate::ir::{GraphEdge, GraphIR, GraphNode};
use crate::layout::{Layout, LayoutEdge, LayoutNode, Viewport};
use crate::measure::TextMetrics;
use crate::model::Multiplicity;
use std::collections::HashMap;
use std::fmt::{self, Write};

const PK_COLOR: &str = "#facc15";
const FK_COLOR: &str = "#60a5fa";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub background: &'static str,
    pub card: &'static str,
    pub header: &'static str,
    pub border: &'static str,
    pub stroke: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
    pub label_bg: &'static str,
}

impl Theme {
    pub const LIGHT: Theme = Theme {
        background: "#ffffff",
        card: "#ffffff",
        header: "#f3f4f6",
        border: "#333",
        stroke: "#333",
        text: "#111827",
        muted: "#6b7280",
        label_bg: "#ffffff",
    };

    pub const DARK: Theme = Theme {
        background: "#111827",
        card: "#1f2937",
        header: "#374151",
        border: "#9ca3af",
        stroke: "#9CA3AF",
        text: "#f3f4f6",
        muted: "#9ca3af",
        label_bg: "#1f2937",
    };

    pub fn for_mode(darkmode: bool) -> Self {
        if darkmode { Self::DARK } else { Self::LIGHT }
    }
}

/// Output surface: pixel size of the document and the pan/zoom applied to
/// the graph layer. The legend is drawn outside the transformed layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub viewport: Viewport,
}

impl Frame {
    /// Frame that shows the whole layout at 1:1 with a margin, for export.
    pub fn around(layout: &Layout, margin: f64) -> Self {
        let b = &layout.bounds;
        Self {
            width: b.width() + margin * 2.0,
            height: b.height() + margin * 2.0,
            viewport: Viewport {
                x: margin - b.min_x,
                y: margin - b.min_y,
                zoom: 1.0,
            },
        }
    }
}

pub struct SvgRenderer {
    metrics: TextMetrics,
    theme: Theme,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            metrics: TextMetrics::default(),
            theme: Theme::LIGHT,
        }
    }
}

impl SvgRenderer {
    pub fn new(darkmode: bool) -> Self {
        Self {
            metrics: TextMetrics::default(),
            theme: Theme::for_mode(darkmode),
        }
    }

    pub fn render(&self, ir: &GraphIR, layout: &Layout, frame: &Frame) -> String {
        let mut svg = String::new();
        match self.write_document(&mut svg, ir, layout, frame) {
            Ok(()) => svg,
            Err(_) => String::new(),
        }
    }

    fn write_document(
        &self,
        svg: &mut String,
        ir: &GraphIR,
        layout: &Layout,
        frame: &Frame,
    ) -> fmt::Result {
        let t = &self.theme;
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = frame.width,
            h = frame.height
        )?;
        writeln!(
            svg,
            r#"<style>
  .card-bg {{ fill: {card}; }}
  .card-header {{ fill: {header}; }}
  .card-border {{ fill: none; stroke: {border}; stroke-width: 1.5; }}
  .card-border.unresolved {{ stroke-dasharray: 4 3; }}
  .card-title {{ font-family: sans-serif; font-size: 14px; font-weight: bold; fill: {text}; }}
  .card-subtitle {{ font-family: sans-serif; font-size: 11px; fill: {muted}; }}
  .attr {{ font-family: monospace; font-size: 12px; fill: {text}; }}
  .attr-empty {{ font-family: sans-serif; font-size: 12px; font-style: italic; fill: {muted}; }}
  .toggle {{ font-family: sans-serif; font-size: 11px; fill: {fk}; cursor: pointer; }}
  .edge {{ stroke: {stroke}; stroke-width: 1.5; fill: none; }}
  .edge-label {{ font-family: sans-serif; font-size: 11px; fill: {text}; }}
  .edge-label-bg {{ fill: {label_bg}; fill-opacity: 0.9; }}
  .legend {{ font-family: sans-serif; font-size: 12px; fill: {text}; }}
</style>"#,
            card = t.card,
            header = t.header,
            border = t.border,
            text = t.text,
            muted = t.muted,
            fk = FK_COLOR,
            stroke = t.stroke,
            label_bg = t.label_bg,
        )?;
        self.write_markers(svg)?;
        writeln!(
            svg,
            r#"<rect width="100%" height="100%" fill="{}" />"#,
            t.background
        )?;

        let node_map: HashMap<&str, &GraphNode> =
            ir.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        let vp = &frame.viewport;
        writeln!(
            svg,
            r#"<g transform="translate({} {}) scale({})">"#,
            vp.x, vp.y, vp.zoom
        )?;

        // edges first so cards sit on top of them
        for edge in &layout.edges {
            if let Some(ir_edge) = ir.edges.get(edge.index) {
                self.write_edge(svg, edge, ir_edge)?;
            }
        }
        for node in &layout.nodes {
            if let Some(ir_node) = node_map.get(node.id.as_str()) {
                self.write_node(svg, node, ir_node)?;
            }
        }
        for edge in &layout.edges {
            if let Some(ir_edge) = ir.edges.get(edge.index) {
                self.write_edge_label(svg, edge, ir_edge)?;
            }
        }
        writeln!(svg, "</g>")?;

        self.write_legend(svg)?;
        writeln!(svg, "</svg>")
    }

    fn write_markers(&self, svg: &mut String) -> fmt::Result {
        let stroke = self.theme.stroke;
        writeln!(svg, "<defs>")?;
        // bar across the line
        writeln!(
            svg,
            r#"<marker id="{}" viewBox="0 0 20 20" refX="18" refY="10" markerWidth="14" markerHeight="14" orient="auto-start-reverse"><path d="M 12 2 L 12 18" stroke="{stroke}" stroke-width="2" fill="none" /></marker>"#,
            Multiplicity::One.marker_id()
        )?;
        // crow's foot
        writeln!(
            svg,
            r#"<marker id="{}" viewBox="0 0 20 20" refX="18" refY="10" markerWidth="14" markerHeight="14" orient="auto-start-reverse"><path d="M 4 10 L 18 2 M 4 10 L 18 10 M 4 10 L 18 18" stroke="{stroke}" stroke-width="2" fill="none" /></marker>"#,
            Multiplicity::Many.marker_id()
        )?;
        writeln!(svg, "</defs>")
    }

    fn write_node(&self, svg: &mut String, layout: &LayoutNode, node: &GraphNode) -> fmt::Result {
        let m = &self.metrics;
        let (x, y, w, h) = (layout.x, layout.y, layout.width, layout.height);
        let header_h = layout.header_height;

        writeln!(
            svg,
            r#"<g class="card" data-id="{}">"#,
            escape_xml(node.id.as_str())
        )?;
        writeln!(
            svg,
            r#"<rect class="card-bg" x="{x}" y="{y}" width="{w}" height="{h}" rx="6" />"#
        )?;
        writeln!(
            svg,
            r#"<rect class="card-header" x="{x}" y="{y}" width="{w}" height="{header_h}" rx="6" />"#
        )?;
        // square off the header's bottom corners
        writeln!(
            svg,
            r#"<rect class="card-header" x="{}" y="{}" width="{w}" height="6" />"#,
            x,
            y + header_h - 6.0
        )?;

        let title_y = y + m.header_padding + m.line_height * 0.75;
        writeln!(
            svg,
            r#"<text class="card-title" x="{}" y="{}">{}</text>"#,
            x + m.padding_x,
            title_y,
            escape_xml(node.label())
        )?;
        if let Some(subtitle) = &layout.subtitle {
            writeln!(
                svg,
                r#"<text class="card-subtitle" x="{}" y="{}">{}</text>"#,
                x + m.padding_x,
                title_y + m.line_height,
                escape_xml(subtitle)
            )?;
        }
        writeln!(
            svg,
            r#"<line x1="{x}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1" />"#,
            y + header_h,
            x + w,
            y + header_h,
            self.theme.border
        )?;

        let mut row_y = y + header_h + m.padding_y + m.line_height * 0.7;
        if layout.rows.is_empty() {
            writeln!(
                svg,
                r#"<text class="attr-empty" x="{}" y="{row_y}">No attributes</text>"#,
                x + m.padding_x
            )?;
        }
        for attr in &layout.rows {
            let dot_x = x + m.padding_x + 4.0;
            let dot_y = row_y - 4.0;
            if node.is_primary_key(attr) {
                writeln!(
                    svg,
                    r#"<circle cx="{dot_x}" cy="{dot_y}" r="4" fill="{PK_COLOR}" />"#
                )?;
            } else if node.is_foreign_key(attr) {
                writeln!(
                    svg,
                    r#"<circle cx="{dot_x}" cy="{dot_y}" r="4" fill="{FK_COLOR}" />"#
                )?;
            }
            writeln!(
                svg,
                r#"<text class="attr" x="{}" y="{row_y}">{}</text>"#,
                x + m.padding_x + m.marker_width,
                escape_xml(attr)
            )?;
            row_y += m.line_height;
        }
        if let Some(toggle) = &layout.toggle {
            writeln!(
                svg,
                r#"<text class="toggle" x="{}" y="{row_y}">{}</text>"#,
                x + m.padding_x,
                escape_xml(toggle)
            )?;
        }

        let class = if node.data.resolved {
            "card-border"
        } else {
            "card-border unresolved"
        };
        writeln!(
            svg,
            r#"<rect class="{class}" x="{x}" y="{y}" width="{w}" height="{h}" rx="6" />"#
        )?;
        writeln!(svg, "</g>")
    }

    fn write_edge(&self, svg: &mut String, layout: &LayoutEdge, edge: &GraphEdge) -> fmt::Result {
        let (x1, y1) = layout.from_point;
        let (x2, y2) = layout.to_point;
        let (start, end) = edge.end_markers();
        writeln!(
            svg,
            r#"<line class="edge" data-id="{}" x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" marker-start="url(#{})" marker-end="url(#{})" />"#,
            escape_xml(&edge.id),
            start.marker_id(),
            end.marker_id()
        )
    }

    fn write_edge_label(
        &self,
        svg: &mut String,
        layout: &LayoutEdge,
        edge: &GraphEdge,
    ) -> fmt::Result {
        let lines = edge.label_lines();
        if lines.is_empty() {
            return Ok(());
        }
        let (cx, cy) = layout.label_point;
        let (w, h) = self.metrics.label_size(&lines);
        writeln!(
            svg,
            r#"<rect class="edge-label-bg" x="{}" y="{}" width="{w}" height="{h}" rx="3" />"#,
            cx - w / 2.0,
            cy - h / 2.0
        )?;

        let line_h = self.metrics.label_line_height;
        let first_y = cy - h / 2.0 + 4.0 + line_h * 0.8;
        write!(
            svg,
            r#"<text class="edge-label" x="{cx}" y="{first_y}" text-anchor="middle">"#
        )?;
        for (i, line) in lines.iter().enumerate() {
            let dy = if i == 0 { 0.0 } else { line_h };
            write!(
                svg,
                r#"<tspan x="{cx}" dy="{dy}">{}</tspan>"#,
                escape_xml(line)
            )?;
        }
        writeln!(svg, "</text>")
    }

    fn write_legend(&self, svg: &mut String) -> fmt::Result {
        let t = &self.theme;
        writeln!(
            svg,
            r#"<g class="legend" transform="translate(12 12)"><rect width="130" height="56" rx="6" fill="{}" stroke="{}" />"#,
            t.card, t.border
        )?;
        writeln!(
            svg,
            r#"<circle cx="16" cy="19" r="5" fill="{PK_COLOR}" /><text class="legend" x="28" y="23">Primary Key</text>"#
        )?;
        writeln!(
            svg,
            r#"<circle cx="16" cy="39" r="5" fill="{FK_COLOR}" /><text class="legend" x="28" y="43">Foreign Key</text>"#
        )?;
        writeln!(svg, "</g>")
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{NodeData, Position};
    use crate::layout::LayoutEngine;
    use crate::model::{Cardinality, ColumnInfo, Relationship, RelationshipType, Table};
    use std::collections::HashSet;

    fn column(name: &str, primary_key: bool) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            data_type: None,
            primary_key,
            foreign_key: None,
            nullable: true,
        }
    }

    fn sample() -> GraphIR {
        let mut customers = Table::new("1", "customers");
        customers.columns = vec![column("id", true), column("name", false)];
        let orders = Table::new("2", "orders").with_attributes(["id", "customer_id"]);
        let rel = Relationship {
            id: Some(1),
            from_table_id: "2".into(),
            from_column: "customer_id".into(),
            to_table_id: "1".into(),
            to_column: "id".into(),
            cardinality: Cardinality::ManyToOne,
            relationship_type: RelationshipType::ForeignKey,
        };
        GraphIR {
            nodes: vec![
                GraphNode {
                    id: "2".into(),
                    position: Position::new(0.0, 0.0),
                    data: NodeData {
                        table: orders,
                        resolved: true,
                        foreign_keys: vec!["customer_id".into()],
                    },
                },
                GraphNode {
                    id: "1".into(),
                    position: Position::new(600.0, 0.0),
                    data: NodeData {
                        table: customers,
                        resolved: true,
                        foreign_keys: vec![],
                    },
                },
            ],
            edges: vec![GraphEdge {
                id: "e2-1".into(),
                source: "2".into(),
                target: "1".into(),
                label: rel.label_line(),
                relationships: vec![rel],
            }],
        }
    }

    fn render(ir: &GraphIR, darkmode: bool) -> String {
        let layout = LayoutEngine::default().layout(ir, &HashSet::new());
        let frame = Frame::around(&layout, 40.0);
        SvgRenderer::new(darkmode).render(ir, &layout, &frame)
    }

    #[test]
    fn test_render_cards_and_edge() {
        let svg = render(&sample(), false);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("customers"));
        assert!(svg.contains("orders"));
        assert!(svg.contains(r#"class="edge""#));
        assert!(svg.contains("customer_id → id (many-to-one)"));
        assert!(svg.contains(r#"marker-start="url(#many)""#));
        assert!(svg.contains(r#"marker-end="url(#one)""#));
    }

    #[test]
    fn test_key_dots_and_legend() {
        let svg = render(&sample(), false);
        assert!(svg.contains(&format!(r#"fill="{PK_COLOR}""#)));
        assert!(svg.contains(&format!(r#"fill="{FK_COLOR}""#)));
        assert!(svg.contains("Primary Key"));
        assert!(svg.contains("Foreign Key"));
    }

    #[test]
    fn test_dark_mode_stroke() {
        let svg = render(&sample(), true);
        assert!(svg.contains("stroke: #9CA3AF"));
        let light = render(&sample(), false);
        assert!(!light.contains("#9CA3AF"));
    }

    #[test]
    fn test_multiline_label_uses_tspans() {
        let mut ir = sample();
        ir.edges[0].label.push_str("\nid → id (one-to-one)");
        let svg = render(&ir, false);
        assert_eq!(svg.matches("<tspan").count(), 2);
    }

    #[test]
    fn test_escapes_names() {
        let mut ir = sample();
        ir.nodes[0].data.table.name = "a<b>&c".into();
        let svg = render(&ir, false);
        assert!(svg.contains("a&lt;b&gt;&amp;c"));
    }

    #[test]
    fn test_unresolved_card_is_dashed() {
        let mut ir = sample();
        ir.nodes[1].data.resolved = false;
        let svg = render(&ir, false);
        assert!(svg.contains("card-border unresolved"));
    }

    #[test]
    fn test_edges_with_colliding_ids_both_render() {
        let mut ir = sample();
        let mut other = ir.edges[0].clone();
        other.source = "1".into();
        other.target = "2".into();
        other.label = "id → customer_id (one-to-many)".into();
        // edge ids can repeat when table ids contain '-'
        other.id = ir.edges[0].id.clone();
        ir.edges.push(other);

        let svg = render(&ir, false);
        assert_eq!(svg.matches(r#"class="edge""#).count(), 2);
        assert!(svg.contains("customer_id → id (many-to-one)"));
        assert!(svg.contains("id → customer_id (one-to-many)"));
    }

    #[test]
    fn test_empty_graph_still_has_legend() {
        let svg = render(&GraphIR::default(), false);
        assert!(svg.contains("Primary Key"));
        assert!(!svg.contains(r#"class="card""#));
    }
}
