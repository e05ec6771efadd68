//! Grid rendering for tabular sections.
//!
//! [`render_table`] starts at a given `y`, draws row by row and returns the
//! `y` just below the last row. Rows are kept whole: when one would cross
//! the bottom margin a new page is started and the header row is drawn again
//! before the row.

use log::debug;

use crate::error::RenderWarning;
use crate::layout::metrics::{ascent_mm, line_height_mm};
use crate::layout::{wrap_text, Color, FontStyle, RenderContext};

/// Column width hint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    /// Fixed width in mm.
    Absolute(f32),
    /// Share of the width left after absolute columns, by weight.
    Proportional(f32),
}

/// Rows of pre-formatted cells plus an optional header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellMatrix {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    pub widths: Vec<ColumnWidth>,
}

impl CellMatrix {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            header: None,
            rows,
            widths: Vec::new(),
        }
    }

    pub fn with_header<S: Into<String>>(mut self, header: impl IntoIterator<Item = S>) -> Self {
        self.header = Some(header.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_widths(mut self, widths: Vec<ColumnWidth>) -> Self {
        self.widths = widths;
        self
    }

    pub fn column_count(&self) -> usize {
        self.header
            .iter()
            .chain(self.rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    /// Resolve the width hints against the available width.
    ///
    /// Columns without a hint get a proportional weight of 1. The result is
    /// not rebalanced: absolute widths that overrun `available` stay as given.
    pub fn resolve_widths(&self, available: f32) -> Vec<f32> {
        let columns = self.column_count();
        let hint = |i: usize| {
            self.widths
                .get(i)
                .copied()
                .unwrap_or(ColumnWidth::Proportional(1.0))
        };

        let mut fixed = 0.0;
        let mut weights = 0.0;
        for i in 0..columns {
            match hint(i) {
                ColumnWidth::Absolute(w) => fixed += w,
                ColumnWidth::Proportional(p) => weights += p.max(0.0),
            }
        }
        let flexible = (available - fixed).max(0.0);

        (0..columns)
            .map(|i| match hint(i) {
                ColumnWidth::Absolute(w) => w,
                ColumnWidth::Proportional(p) if weights > 0.0 => flexible * p.max(0.0) / weights,
                ColumnWidth::Proportional(_) => 0.0,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderTheme {
    /// Every cell boxed.
    Grid,
    /// No borders.
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStyle {
    pub theme: BorderTheme,
    pub font_size: f32,
    pub padding: f32,
    pub header_fill: Option<Color>,
    pub header_text: Color,
    pub border_color: Color,
    pub border_thickness: f32,
    /// Bold first column, used for label/value tables.
    pub bold_first_column: bool,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            theme: BorderTheme::Grid,
            font_size: 9.0,
            padding: 1.5,
            header_fill: Some(Color::BRAND),
            header_text: Color::WHITE,
            border_color: Color::LIGHT_GREY,
            border_thickness: 0.3,
            bold_first_column: false,
        }
    }
}

impl TableStyle {
    pub fn plain() -> Self {
        Self {
            theme: BorderTheme::Plain,
            header_fill: None,
            header_text: Color::BLACK,
            ..Self::default()
        }
    }
}

struct LaidOutRow {
    cells: Vec<Vec<String>>,
    height: f32,
}

fn lay_out_row(cells: &[String], widths: &[f32], style: &TableStyle, header: bool) -> LaidOutRow {
    let line_h = line_height_mm(style.font_size);
    let wrapped: Vec<Vec<String>> = widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let text = cells.get(i).map(String::as_str).unwrap_or("");
            let font = cell_font(style, header, i);
            wrap_text(text, (w - 2.0 * style.padding).max(1.0), style.font_size, font)
        })
        .collect();
    let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);

    LaidOutRow {
        cells: wrapped,
        height: lines as f32 * line_h + 2.0 * style.padding,
    }
}

fn cell_font(style: &TableStyle, header: bool, column: usize) -> FontStyle {
    if header || (style.bold_first_column && column == 0) {
        FontStyle::Bold
    } else {
        FontStyle::Regular
    }
}

fn draw_row(
    ctx: &mut RenderContext,
    row: &LaidOutRow,
    widths: &[f32],
    style: &TableStyle,
    header: bool,
    top: f32,
) {
    let line_h = line_height_mm(style.font_size);
    let mut x = ctx.content_left();

    for (i, width) in widths.iter().enumerate() {
        let fill = if header { style.header_fill } else { None };
        let stroke = match style.theme {
            BorderTheme::Grid => Some((style.border_color, style.border_thickness)),
            BorderTheme::Plain => None,
        };
        if fill.is_some() || stroke.is_some() {
            ctx.rect(x, top, *width, row.height, fill, stroke);
        }

        let color = if header { style.header_text } else { Color::BLACK };
        let font = cell_font(style, header, i);
        let mut baseline = top + style.padding + ascent_mm(style.font_size);
        for line in &row.cells[i] {
            ctx.colored_text(x + style.padding, baseline, line, style.font_size, font, color);
            baseline += line_h;
        }
        x += width;
    }
}

/// Height `matrix` takes when drawn `available` mm wide without breaking
/// across pages.
pub fn measure_table(matrix: &CellMatrix, style: &TableStyle, available: f32) -> f32 {
    let widths = matrix.resolve_widths(available);
    if widths.is_empty() {
        return 0.0;
    }
    let header = matrix
        .header
        .as_ref()
        .map(|cells| lay_out_row(cells, &widths, style, true).height)
        .unwrap_or(0.0);
    matrix
        .rows
        .iter()
        .map(|cells| lay_out_row(cells, &widths, style, false).height)
        .sum::<f32>()
        + header
}

/// Draw `matrix` starting at `start_y` on the current page.
///
/// Returns the `y` just below the table, on whatever page the table ended.
pub fn render_table(
    ctx: &mut RenderContext,
    matrix: &CellMatrix,
    style: &TableStyle,
    start_y: f32,
) -> f32 {
    let widths = matrix.resolve_widths(ctx.content_width());
    if widths.is_empty() {
        return start_y;
    }

    let header = matrix
        .header
        .as_ref()
        .map(|cells| lay_out_row(cells, &widths, style, true));
    let header_height = header.as_ref().map(|h| h.height).unwrap_or(0.0);

    let mut y = start_y;
    let mut at_page_top = y <= ctx.content_top();

    // Keep the header together with the first body row.
    let first_height = matrix
        .rows
        .first()
        .map(|r| lay_out_row(r, &widths, style, false).height)
        .unwrap_or(0.0);
    if !at_page_top && y + header_height + first_height > ctx.bottom_limit() {
        ctx.new_page();
        y = ctx.content_top();
        at_page_top = true;
    }

    if let Some(ref h) = header {
        draw_row(ctx, h, &widths, style, true, y);
        y += h.height;
    }

    for (index, cells) in matrix.rows.iter().enumerate() {
        let row = lay_out_row(cells, &widths, style, false);

        if y + row.height > ctx.bottom_limit() && !(at_page_top && index == 0) {
            debug!("table continues on a new page before row {}", index + 1);
            ctx.new_page();
            y = ctx.content_top();
            if let Some(ref h) = header {
                draw_row(ctx, h, &widths, style, true, y);
                y += h.height;
            }
        }

        if y + row.height > ctx.bottom_limit() {
            ctx.warn(RenderWarning::OversizedRow { height: row.height });
        }

        draw_row(ctx, &row, &widths, style, false, y);
        y += row.height;
        at_page_top = false;
    }

    y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<Vec<String>> {
        (1..=n)
            .map(|i| vec![format!("row-{i}"), format!("{i}.00")])
            .collect()
    }

    #[test]
    fn test_resolve_widths_mixed_hints() {
        let matrix = CellMatrix::new(rows(1)).with_header(["A", "B", "C"]).with_widths(vec![
            ColumnWidth::Absolute(30.0),
            ColumnWidth::Proportional(1.0),
            ColumnWidth::Proportional(3.0),
        ]);
        let widths = matrix.resolve_widths(150.0);
        assert_eq!(widths, vec![30.0, 30.0, 90.0]);
    }

    #[test]
    fn test_resolve_widths_defaults_to_equal_shares() {
        let matrix = CellMatrix::new(rows(2));
        assert_eq!(matrix.resolve_widths(100.0), vec![50.0, 50.0]);
    }

    #[test]
    fn test_measure_table_counts_wrapped_lines() {
        let style = TableStyle::default();
        let short = CellMatrix::new(vec![vec!["Address".into(), "Dublin".into()]]);
        let long = CellMatrix::new(vec![vec![
            "Address".into(),
            "Granary Building Upper Hanover Street ".repeat(10),
        ]]);
        let one_line = measure_table(&short, &style, 180.0);
        let expected = line_height_mm(style.font_size) + 2.0 * style.padding;
        assert!((one_line - expected).abs() < 1e-4);
        assert!(measure_table(&long, &style, 180.0) > 3.0 * one_line);

        let with_header = short.clone().with_header(["Field", "Value"]);
        assert!((measure_table(&with_header, &style, 180.0) - 2.0 * one_line).abs() < 1e-4);
    }

    #[test]
    fn test_short_table_stays_on_page() {
        let mut ctx = RenderContext::a4("t");
        let matrix = CellMatrix::new(rows(3)).with_header(["Name", "Amount"]);
        let start = ctx.y();
        let end = render_table(&mut ctx, &matrix, &TableStyle::default(), start);
        assert!(end > start);
        assert_eq!(ctx.page_count(), 1);
        // does not move the caller's cursor
        assert_eq!(ctx.y(), start);
    }

    #[test]
    fn test_rows_appear_once_in_order_with_repeated_header() {
        let mut ctx = RenderContext::a4("t");
        let matrix = CellMatrix::new(rows(120)).with_header(["Name", "Amount"]);
        let start = ctx.y();
        let end = render_table(&mut ctx, &matrix, &TableStyle::default(), start);
        let doc = ctx.finish();

        assert!(doc.page_count() > 1);
        assert!(end <= doc.geometry.bottom_limit());

        let mut seen = Vec::new();
        for page in &doc.pages {
            let texts: Vec<&str> = page.texts().collect();
            assert_eq!(texts.first().copied(), Some("Name"), "header must lead every page");
            seen.extend(
                texts
                    .iter()
                    .filter(|t| t.starts_with("row-"))
                    .map(|t| t.to_string()),
            );
        }
        let expected: Vec<String> = (1..=120).map(|i| format!("row-{i}")).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_header_is_not_orphaned() {
        let mut ctx = RenderContext::a4("t");
        let start = ctx.bottom_limit() - 5.0;
        let matrix = CellMatrix::new(rows(2)).with_header(["Name", "Amount"]);
        render_table(&mut ctx, &matrix, &TableStyle::default(), start);
        let doc = ctx.finish();
        assert!(doc.pages[0].texts().next().is_none());
        assert!(doc.pages[1].contains_text("Name"));
    }

    #[test]
    fn test_plain_theme_draws_no_borders() {
        let mut ctx = RenderContext::a4("t");
        let matrix = CellMatrix::new(rows(2));
        render_table(&mut ctx, &matrix, &TableStyle::plain(), 20.0);
        let doc = ctx.finish();
        assert!(!doc.pages[0]
            .ops
            .iter()
            .any(|op| matches!(op, crate::layout::DrawOp::Rect { .. })));
    }

    #[test]
    fn test_long_cells_wrap_and_grow_row() {
        let mut ctx = RenderContext::a4("t");
        let short = CellMatrix::new(vec![vec!["a".into(), "b".into()]]);
        let long = CellMatrix::new(vec![vec![
            "a very long description that cannot possibly fit on one line of a narrow column"
                .into(),
            "b".into(),
        ]])
        .with_widths(vec![ColumnWidth::Absolute(30.0), ColumnWidth::Absolute(30.0)]);
        let short_end = render_table(&mut ctx, &short, &TableStyle::default(), 20.0);
        let long_end = render_table(&mut ctx, &long, &TableStyle::default(), 20.0);
        assert!(long_end - 20.0 > 2.0 * (short_end - 20.0));
    }

    #[test]
    fn test_empty_matrix_returns_start() {
        let mut ctx = RenderContext::a4("t");
        let end = render_table(&mut ctx, &CellMatrix::default(), &TableStyle::default(), 42.0);
        assert_eq!(end, 42.0);
    }
}
