use unicode_width::UnicodeWidthStr;

pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    pub label_line_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub header_padding: f64,
    pub marker_width: f64,
    pub min_node_width: f64,
    pub min_node_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 20.0,
            label_line_height: 14.0,
            padding_x: 12.0,
            padding_y: 8.0,
            header_padding: 6.0,
            marker_width: 14.0,
            min_node_width: 160.0,
            min_node_height: 60.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    pub fn header_height(&self, has_subtitle: bool) -> f64 {
        let lines = if has_subtitle { 2.0 } else { 1.0 };
        self.line_height * lines + self.header_padding * 2.0
    }

    /// Size of a schema card. `rows` are the visible attribute rows;
    /// `toggle` is the show-more/show-less row when present. An empty card
    /// still reserves one row for its placeholder text.
    pub fn card_size(
        &self,
        title: &str,
        subtitle: Option<&str>,
        rows: &[&str],
        toggle: Option<&str>,
    ) -> (f64, f64) {
        let title_width = self.text_width(title);
        let subtitle_width = subtitle.map(|s| self.text_width(s)).unwrap_or(0.0);
        let row_width = rows
            .iter()
            .map(|r| self.text_width(r) + self.marker_width)
            .fold(0.0, f64::max);
        let toggle_width = toggle.map(|t| self.text_width(t)).unwrap_or(0.0);

        let content_width = title_width
            .max(subtitle_width)
            .max(row_width)
            .max(toggle_width)
            + self.padding_x * 2.0;
        let width = content_width.max(self.min_node_width);

        let body_rows = (rows.len() + usize::from(toggle.is_some())).max(1);
        let body_height = body_rows as f64 * self.line_height + self.padding_y * 2.0;
        let height = (self.header_height(subtitle.is_some()) + body_height).max(self.min_node_height);

        (width, height)
    }

    /// Bounding box of a multi-line edge label.
    pub fn label_size(&self, lines: &[&str]) -> (f64, f64) {
        let width = lines
            .iter()
            .map(|l| self.text_width(l) * 0.8)
            .fold(0.0, f64::max);
        (
            width + 16.0,
            lines.len() as f64 * self.label_line_height + 8.0,
        )
    }
}
