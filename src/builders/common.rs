//! Sections shared by every document: header band, headings, label/value
//! tables, declaration, signature block.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use super::{BuildOptions, Labels};
use crate::error::RenderWarning;
use crate::layout::metrics::{ascent_mm, line_height_mm};
use crate::layout::{Color, FontStyle, RenderContext, NORMAL_FONT_SIZE};
use crate::output::strip_data_uri_prefix;
use crate::table::{measure_table, render_table, CellMatrix, ColumnWidth, TableStyle};

/// Space between sections in mm
pub const GUTTER: f32 = 6.0;

/// Font sizes in points
pub const TITLE_FONT_SIZE: f32 = 16.0;
pub const HEADING_FONT_SIZE: f32 = 11.0;
pub const SMALL_FONT_SIZE: f32 = 8.0;

/// Header band layout
const HEADER_HEIGHT_MM: f32 = 24.0;
const LOGO_MAX_WIDTH_MM: f32 = 45.0;
const LOGO_MAX_HEIGHT_MM: f32 = 18.0;

/// Signature box in mm
pub const SIGNATURE_WIDTH_MM: f32 = 60.0;
pub const SIGNATURE_HEIGHT_MM: f32 = 25.0;

/// Width of the label column in label/value tables
const LABEL_COL_MM: f32 = 60.0;

/// Table row height used for space estimates, generous on purpose
const ESTIMATED_ROW_MM: f32 = 7.5;

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn all_blank(values: &[&str]) -> bool {
    values.iter().all(|v| is_blank(v))
}

fn amount_regex() -> &'static Regex {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    AMOUNT.get_or_init(|| {
        Regex::new(r"^(-)?€?(\d{1,3}(?:,\d{3})+|\d*)(?:\.(\d*))?$")
            .expect("static amount pattern")
    })
}

/// Add one to a string of ASCII digits.
fn increment_digits(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

/// `"12.5"` → `"€12.50"`, rounding half up on the decimal digits. Commas
/// are accepted only as thousands separators. Anything else is returned
/// trimmed but otherwise untouched; blanks stay blank.
pub fn format_euro(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let Some(caps) = amount_regex().captures(trimmed) else {
        return trimmed.to_string();
    };
    let negative = caps.get(1).is_some();
    let whole = caps.get(2).map_or("", |m| m.as_str()).replace(',', "");
    let fraction = caps.get(3).map_or("", |m| m.as_str());
    if whole.is_empty() && fraction.is_empty() {
        return trimmed.to_string();
    }

    // Whole number of cents as digits, then round on the third decimal.
    let mut cents: Vec<u8> = whole.bytes().collect();
    let mut decimals = fraction.bytes().chain(std::iter::repeat(b'0'));
    cents.extend(decimals.by_ref().take(2));
    if decimals.next().is_some_and(|d| d >= b'5') {
        increment_digits(&mut cents);
    }
    while cents.len() < 3 {
        cents.insert(0, b'0');
    }

    let first_nonzero = cents.iter().position(|d| *d != b'0').unwrap_or(cents.len());
    let digits = &cents[first_nonzero.min(cents.len() - 3)..];
    let (units, hundredths) = digits.split_at(digits.len() - 2);
    let units = String::from_utf8_lossy(units);
    let hundredths = String::from_utf8_lossy(hundredths);

    let is_zero = first_nonzero == cents.len();
    let sign = if negative && !is_zero { "-" } else { "" };
    format!("{}€{}.{}", sign, units, hundredths)
}

/// Append `suffix` unless the value is blank.
pub fn with_suffix(value: &str, suffix: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.ends_with(suffix) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, suffix)
    }
}

pub fn estimate_rows(rows: usize) -> f32 {
    rows as f32 * ESTIMATED_ROW_MM
}

/// Title, optional subtitle and reference on the left, logo on the right.
pub fn draw_header_band(
    ctx: &mut RenderContext,
    title: &str,
    subtitle: &str,
    options: &BuildOptions,
) {
    let left = ctx.content_left();
    let right = left + ctx.content_width();
    let top = ctx.y();

    ctx.colored_text(
        left,
        top + ascent_mm(TITLE_FONT_SIZE),
        title,
        TITLE_FONT_SIZE,
        FontStyle::Bold,
        Color::BRAND,
    );

    let mut info_y = top + line_height_mm(TITLE_FONT_SIZE) + ascent_mm(NORMAL_FONT_SIZE);
    if !is_blank(subtitle) {
        ctx.colored_text(left, info_y, subtitle, NORMAL_FONT_SIZE, FontStyle::Regular, Color::GREY);
        info_y += line_height_mm(NORMAL_FONT_SIZE);
    }
    if let Some(reference) = options.reference.filter(|r| !is_blank(r)) {
        let label = options.labels.get("common.reference", "Reference");
        ctx.colored_text(
            left,
            info_y,
            &format!("{}: {}", label, reference),
            SMALL_FONT_SIZE,
            FontStyle::Regular,
            Color::GREY,
        );
    }

    if let Some(logo) = options.logo {
        // A broken logo is already recorded as a warning; the band renders without it.
        let _ = ctx.draw_image_fit("logo", logo, right, top, LOGO_MAX_WIDTH_MM, LOGO_MAX_HEIGHT_MM);
    }

    let rule_y = top + HEADER_HEIGHT_MM - 2.0;
    ctx.line(left, rule_y, right, rule_y, 0.8, Color::BRAND);
    ctx.set_y(top + HEADER_HEIGHT_MM);
}

/// Reserve room for a section of `estimate` mm plus its heading, then draw
/// the heading.
pub fn begin_section(ctx: &mut RenderContext, heading: &str, estimate: f32) {
    let heading_h = line_height_mm(HEADING_FONT_SIZE) + 1.5;
    ctx.ensure_space(heading_h + estimate);

    let left = ctx.content_left();
    let baseline = ctx.y() + ascent_mm(HEADING_FONT_SIZE);
    ctx.colored_text(left, baseline, heading, HEADING_FONT_SIZE, FontStyle::Bold, Color::BRAND);
    ctx.advance(heading_h);
}

/// Draw a table at the cursor and move the cursor below it plus the gutter.
pub fn table_section(ctx: &mut RenderContext, matrix: &CellMatrix, style: &TableStyle) {
    let start = ctx.y();
    let end = render_table(ctx, matrix, style, start);
    ctx.set_y(end + GUTTER);
}

/// Two-column label/value table.
///
/// The heading and every row are reserved up front, so the block is never
/// split across pages unless it is taller than a page.
pub fn field_table(ctx: &mut RenderContext, heading: &str, fields: Vec<(String, String)>) {
    let rows = fields
        .into_iter()
        .map(|(label, value)| vec![label, value.trim().to_string()])
        .collect();
    let matrix = CellMatrix::new(rows).with_widths(vec![
        ColumnWidth::Absolute(LABEL_COL_MM),
        ColumnWidth::Proportional(1.0),
    ]);
    let style = TableStyle {
        bold_first_column: true,
        header_fill: None,
        ..TableStyle::default()
    };
    let height = measure_table(&matrix, &style, ctx.content_width());
    begin_section(ctx, heading, height);
    table_section(ctx, &matrix, &style);
}

/// Paragraph of wrapped body text under a heading.
pub fn text_section(ctx: &mut RenderContext, heading: &str, text: &str) {
    let width = ctx.content_width();
    let lines = ctx.measure_text_block(text, width, NORMAL_FONT_SIZE, FontStyle::Regular);
    begin_section(ctx, heading, lines.len() as f32 * line_height_mm(NORMAL_FONT_SIZE));

    let left = ctx.content_left();
    ctx.text_block(left, width, text, NORMAL_FONT_SIZE, FontStyle::Regular);
    ctx.advance(GUTTER);
}

fn draw_checkbox(ctx: &mut RenderContext, x: f32, y: f32, size: f32, checked: bool) {
    ctx.rect(x, y, size, size, None, Some((Color::BLACK, 0.4)));
    if checked {
        ctx.line(x + 0.6, y + 0.6, x + size - 0.6, y + size - 0.6, 0.5, Color::BLACK);
        ctx.line(x + 0.6, y + size - 0.6, x + size - 0.6, y + 0.6, 0.5, Color::BLACK);
    }
}

/// Declaration text with a tick box showing whether it was accepted.
pub fn declaration(ctx: &mut RenderContext, labels: &Labels, text: &str, accepted: bool) {
    let heading = labels.get("common.declaration", "Declaration");
    let box_size = 3.5;
    let indent = box_size + 3.0;
    let width = ctx.content_width() - indent;
    let lines = ctx.measure_text_block(text, width, NORMAL_FONT_SIZE, FontStyle::Regular);
    begin_section(ctx, &heading, lines.len() as f32 * line_height_mm(NORMAL_FONT_SIZE));

    let left = ctx.content_left();
    let top = ctx.y();
    draw_checkbox(ctx, left, top + 0.5, box_size, accepted);
    ctx.text_block(left + indent, width, text, NORMAL_FONT_SIZE, FontStyle::Regular);
    ctx.advance(GUTTER);
}

/// Decode a `data:image/png;base64,...` signature.
fn decode_signature(data_url: &str) -> Result<Vec<u8>, RenderWarning> {
    STANDARD
        .decode(strip_data_uri_prefix(data_url).trim())
        .map_err(|e| RenderWarning::DataUri {
            what: "signature".to_string(),
            reason: e.to_string(),
        })
}

/// Signature box, signer name, and date (plus place when given).
///
/// The signature image is stretched to the fixed box.
pub fn signature_block(
    ctx: &mut RenderContext,
    labels: &Labels,
    signature: Option<&str>,
    signer: &str,
    date: &str,
    place: Option<&str>,
) {
    let heading = labels.get("common.signature", "Signature");
    let detail_lines = if place.is_some() { 3.0 } else { 2.0 };
    let estimate = SIGNATURE_HEIGHT_MM + 2.0 + detail_lines * line_height_mm(NORMAL_FONT_SIZE);
    begin_section(ctx, &heading, estimate);

    let left = ctx.content_left();
    let top = ctx.y();
    ctx.rect(
        left,
        top,
        SIGNATURE_WIDTH_MM,
        SIGNATURE_HEIGHT_MM,
        None,
        Some((Color::LIGHT_GREY, 0.3)),
    );

    if let Some(data_url) = signature.filter(|s| !is_blank(s)) {
        match decode_signature(data_url) {
            Ok(bytes) => {
                let _ = ctx.draw_image(
                    "signature",
                    &bytes,
                    left,
                    top,
                    SIGNATURE_WIDTH_MM,
                    SIGNATURE_HEIGHT_MM,
                );
            }
            Err(warning) => ctx.warn(warning),
        }
    }

    ctx.set_y(top + SIGNATURE_HEIGHT_MM + 2.0);
    let mut details = vec![
        (labels.get("common.signed_by", "Signed by"), signer),
        (labels.get("common.date", "Date"), date),
    ];
    if let Some(place) = place {
        details.push((labels.get("common.place", "Place"), place));
    }

    let line_h = line_height_mm(NORMAL_FONT_SIZE);
    for (label, value) in details {
        let baseline = ctx.y() + ascent_mm(NORMAL_FONT_SIZE);
        ctx.text(left, baseline, &format!("{}:", label), NORMAL_FONT_SIZE, FontStyle::Bold);
        ctx.text(left + 25.0, baseline, value.trim(), NORMAL_FONT_SIZE, FontStyle::Regular);
        ctx.advance(line_h);
    }
    ctx.advance(GUTTER);
}

/// Single line of muted text, e.g. for an empty itemised section.
pub fn note(ctx: &mut RenderContext, text: &str) {
    let left = ctx.content_left();
    let baseline = ctx.y() + ascent_mm(NORMAL_FONT_SIZE);
    ctx.colored_text(left, baseline, text, NORMAL_FONT_SIZE, FontStyle::Regular, Color::GREY);
    ctx.advance(line_height_mm(NORMAL_FONT_SIZE) + GUTTER);
}

/// Start a document with its header band.
pub fn start_document(title: &str, subtitle: &str, options: &BuildOptions) -> RenderContext {
    let mut ctx = RenderContext::new(title, options.geometry);
    draw_header_band(&mut ctx, title, subtitle, options);
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_euro() {
        assert_eq!(format_euro("12.5"), "€12.50");
        assert_eq!(format_euro(" 1,234.567 "), "€1234.57");
        assert_eq!(format_euro("€3"), "€3.00");
        assert_eq!(format_euro("-4.1"), "-€4.10");
        assert_eq!(format_euro(""), "");
        assert_eq!(format_euro("n/a"), "n/a");
    }

    #[test]
    fn test_format_euro_commas() {
        assert_eq!(format_euro("1,234.56"), "€1234.56");
        assert_eq!(format_euro("12,345,678"), "€12345678.00");
        // a decimal comma is not a thousands separator
        assert_eq!(format_euro("12,50"), "12,50");
        assert_eq!(format_euro("1,23,456"), "1,23,456");
    }

    #[test]
    fn test_format_euro_rounds_half_up() {
        assert_eq!(format_euro("1.005"), "€1.01");
        assert_eq!(format_euro("2.675"), "€2.68");
        assert_eq!(format_euro("0.994"), "€0.99");
        assert_eq!(format_euro("9.995"), "€10.00");
        assert_eq!(format_euro("99.999"), "€100.00");
        assert_eq!(format_euro(".5"), "€0.50");
        assert_eq!(format_euro("007"), "€7.00");
        assert_eq!(format_euro("-0.001"), "€0.00");
        assert_eq!(format_euro("."), ".");
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("60.00", "%"), "60.00%");
        assert_eq!(with_suffix("60.00%", "%"), "60.00%");
        assert_eq!(with_suffix("  ", "%"), "");
    }

    #[test]
    fn test_all_blank() {
        assert!(all_blank(&["", "  ", "\t"]));
        assert!(!all_blank(&["", "Cork"]));
    }

    #[test]
    fn test_bad_signature_data_is_a_warning() {
        let mut ctx = RenderContext::a4("t");
        let bad = Some("data:image/png;base64,@@@");
        signature_block(&mut ctx, &Labels::english(), bad, "Jane", "", None);
        assert!(matches!(ctx.warnings(), [RenderWarning::DataUri { .. }]));
    }

    #[test]
    fn test_missing_signature_renders_blank_box() {
        let mut ctx = RenderContext::a4("t");
        signature_block(&mut ctx, &Labels::english(), None, "Jane", "", None);
        assert!(ctx.warnings().is_empty());
        let doc = ctx.finish();
        assert_eq!(doc.pages[0].image_count(), 0);
        assert!(doc.contains_text("Jane"));
    }

    #[test]
    fn test_broken_logo_keeps_header() {
        let options = BuildOptions {
            logo: Some(&b"not a png"[..]),
            reference: Some("AB12CD34"),
            ..BuildOptions::default()
        };
        let ctx = start_document("Title", "Sub", &options);
        assert_eq!(ctx.warnings().len(), 1);
        let doc = ctx.finish();
        assert!(doc.contains_text("Title"));
        assert!(doc.contains_text("Reference: AB12CD34"));
    }
}
