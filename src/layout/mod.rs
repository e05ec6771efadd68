//! Page and cursor bookkeeping.
//!
//! A [`RenderContext`] owns the pages of one document while it is being built.
//! Drawing calls record [`DrawOp`]s into the current page's display list; the
//! list is only turned into PDF bytes by [`pdf::write_pdf`] once every page,
//! including the page-number stamps, is complete.
//!
//! Coordinates are millimetres from the top-left corner of the page. The
//! cursor's `y` grows downwards.

pub mod metrics;
pub mod pdf;

use ::image::{DynamicImage, Rgba, RgbImage};
use log::{debug, warn};

use crate::error::RenderWarning;

pub use metrics::{line_height_mm, text_width_mm};

/// A4 dimensions in mm
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// Margins
pub const MARGIN_MM: f32 = 15.0;

/// Page number font size in points
pub const PAGE_NUMBER_FONT_SIZE: f32 = 8.0;

/// Body font size in points
pub const NORMAL_FONT_SIZE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
}

/// RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const GREY: Color = Color::rgb(0.45, 0.45, 0.45);
    pub const LIGHT_GREY: Color = Color::rgb(0.8, 0.8, 0.8);
    pub const BAND: Color = Color::rgb(0.93, 0.95, 0.97);
    pub const BRAND: Color = Color::rgb(0.09, 0.36, 0.29);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Decoded raster ready for embedding, already composited onto white.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RasterImage {
    /// Decode PNG/JPEG bytes, flattening any alpha channel against white.
    pub fn decode(bytes: &[u8]) -> Result<Self, ::image::ImageError> {
        let img = ::image::load_from_memory(bytes)?;
        Ok(Self::from_dynamic(&img))
    }

    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let rgba_image = img.to_rgba8();
        let (width, height) = rgba_image.dimensions();

        let mut rgb_image = RgbImage::new(width, height);
        for (x, y, pixel) in rgba_image.enumerate_pixels() {
            let Rgba([r, g, b, a]) = *pixel;
            let alpha = a as f32 / 255.0;
            let bg = 255.0;
            let out_r = (r as f32 * alpha + bg * (1.0 - alpha)) as u8;
            let out_g = (g as f32 * alpha + bg * (1.0 - alpha)) as u8;
            let out_b = (b as f32 * alpha + bg * (1.0 - alpha)) as u8;
            rgb_image.put_pixel(x, y, ::image::Rgb([out_r, out_g, out_b]));
        }

        Self {
            width,
            height,
            rgb: rgb_image.into_raw(),
        }
    }
}

/// One recorded drawing operation. `y` of a `Text` op is its baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        style: FontStyle,
        color: Color,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        thickness: f32,
        color: Color,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<Color>,
        stroke: Option<(Color, f32)>,
    },
    Image {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        image: RasterImage,
    },
}

/// Display list of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// Text runs on this page in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t == needle)
    }

    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count()
    }
}

/// Page size and margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            width: A4_WIDTH_MM,
            height: A4_HEIGHT_MM,
            margin_top: MARGIN_MM,
            margin_bottom: MARGIN_MM,
            margin_left: MARGIN_MM,
            margin_right: MARGIN_MM,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn bottom_limit(&self) -> f32 {
        self.height - self.margin_bottom
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// Write position within the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    pub page: usize,
    pub y: f32,
    pub geometry: PageGeometry,
}

/// Mutable state for building one document.
pub struct RenderContext {
    cursor: PageCursor,
    pages: Vec<Page>,
    warnings: Vec<RenderWarning>,
    title: String,
    stamped: bool,
}

impl RenderContext {
    pub fn new(title: impl Into<String>, geometry: PageGeometry) -> Self {
        Self {
            cursor: PageCursor {
                page: 0,
                y: geometry.margin_top,
                geometry,
            },
            pages: vec![Page::default()],
            warnings: Vec::new(),
            title: title.into(),
            stamped: false,
        }
    }

    pub fn a4(title: impl Into<String>) -> Self {
        Self::new(title, PageGeometry::a4())
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.cursor.geometry
    }

    pub fn y(&self) -> f32 {
        self.cursor.y
    }

    /// Move the cursor to a position reported by a renderer.
    pub fn set_y(&mut self, y: f32) {
        self.cursor.y = y;
    }

    pub fn page_index(&self) -> usize {
        self.cursor.page
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn content_left(&self) -> f32 {
        self.cursor.geometry.margin_left
    }

    pub fn content_top(&self) -> f32 {
        self.cursor.geometry.margin_top
    }

    pub fn content_width(&self) -> f32 {
        self.cursor.geometry.content_width()
    }

    pub fn bottom_limit(&self) -> f32 {
        self.cursor.geometry.bottom_limit()
    }

    /// Space left on the current page below `y`.
    pub fn remaining_from(&self, y: f32) -> f32 {
        self.bottom_limit() - y
    }

    /// Append a page and put the cursor at its top margin.
    pub fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor.page = self.pages.len() - 1;
        self.cursor.y = self.cursor.geometry.margin_top;
        debug!("{}: started page {}", self.title, self.cursor.page + 1);
    }

    /// Start a new page if `needed` mm would not fit below the cursor.
    ///
    /// Returns true when a page break happened.
    pub fn ensure_space(&mut self, needed: f32) -> bool {
        if self.cursor.y + needed > self.bottom_limit() {
            self.new_page();
            true
        } else {
            false
        }
    }

    pub fn advance(&mut self, height: f32) {
        self.cursor.y += height.max(0.0);
    }

    pub fn push_op(&mut self, op: DrawOp) {
        let page = self.cursor.page;
        self.pages[page].ops.push(op);
    }

    pub fn warn(&mut self, warning: RenderWarning) {
        warn!("{}: {}", self.title, warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[RenderWarning] {
        &self.warnings
    }

    pub fn text(&mut self, x: f32, y: f32, text: &str, size: f32, style: FontStyle) {
        self.colored_text(x, y, text, size, style, Color::BLACK);
    }

    pub fn colored_text(
        &mut self,
        x: f32,
        y: f32,
        text: &str,
        size: f32,
        style: FontStyle,
        color: Color,
    ) {
        if text.is_empty() {
            return;
        }
        self.push_op(DrawOp::Text {
            x,
            y,
            size,
            style,
            color,
            text: text.to_string(),
        });
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32, color: Color) {
        self.push_op(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            thickness,
            color,
        });
    }

    pub fn rect(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<Color>,
        stroke: Option<(Color, f32)>,
    ) {
        self.push_op(DrawOp::Rect {
            x,
            y,
            w,
            h,
            fill,
            stroke,
        });
    }

    /// Place an encoded image into the box `(x, y, w, h)`, stretching it.
    ///
    /// Decode failures are recorded as warnings and leave the box empty.
    pub fn draw_image(
        &mut self,
        what: &str,
        bytes: &[u8],
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    ) -> Result<(), RenderWarning> {
        match RasterImage::decode(bytes) {
            Ok(image) => {
                self.push_op(DrawOp::Image { x, y, w, h, image });
                Ok(())
            }
            Err(e) => {
                let warning = RenderWarning::ImageDecode {
                    what: what.to_string(),
                    reason: e.to_string(),
                };
                self.warn(warning.clone());
                Err(warning)
            }
        }
    }

    /// Place an image top-right aligned inside a `max_w` x `max_h` box,
    /// keeping its aspect ratio. Returns the size actually used.
    pub fn draw_image_fit(
        &mut self,
        what: &str,
        bytes: &[u8],
        right_x: f32,
        top_y: f32,
        max_w: f32,
        max_h: f32,
    ) -> Result<(f32, f32), RenderWarning> {
        let image = match RasterImage::decode(bytes) {
            Ok(image) if image.width > 0 && image.height > 0 => image,
            Ok(_) => {
                let warning = RenderWarning::ImageDecode {
                    what: what.to_string(),
                    reason: "image has no pixels".to_string(),
                };
                self.warn(warning.clone());
                return Err(warning);
            }
            Err(e) => {
                let warning = RenderWarning::ImageDecode {
                    what: what.to_string(),
                    reason: e.to_string(),
                };
                self.warn(warning.clone());
                return Err(warning);
            }
        };

        let aspect_ratio = image.width as f32 / image.height as f32;
        let (w, h) = if max_w / max_h > aspect_ratio {
            // Height-constrained
            (max_h * aspect_ratio, max_h)
        } else {
            // Width-constrained
            (max_w, max_w / aspect_ratio)
        };

        self.push_op(DrawOp::Image {
            x: right_x - w,
            y: top_y,
            w,
            h,
            image,
        });
        Ok((w, h))
    }

    /// Wrap `text` so that no line is wider than `max_width` mm.
    pub fn measure_text_block(
        &self,
        text: &str,
        max_width: f32,
        font_size: f32,
        style: FontStyle,
    ) -> Vec<String> {
        wrap_text(text, max_width, font_size, style)
    }

    /// Draw wrapped text at the cursor, breaking pages between lines.
    pub fn text_block(
        &mut self,
        x: f32,
        max_width: f32,
        text: &str,
        font_size: f32,
        style: FontStyle,
    ) {
        let line_h = line_height_mm(font_size);
        for line in self.measure_text_block(text, max_width, font_size, style) {
            self.ensure_space(line_h);
            let baseline = self.cursor.y + metrics::ascent_mm(font_size);
            self.text(x, baseline, &line, font_size, style);
            self.advance(line_h);
        }
    }

    /// Write `"{index}/{total}"` bottom-right on every page.
    ///
    /// Only the first call has an effect.
    pub fn stamp_page_numbers(&mut self) {
        if self.stamped {
            return;
        }
        self.stamped = true;

        let geometry = self.cursor.geometry;
        let total = self.pages.len();
        let baseline = geometry.height - geometry.margin_bottom / 2.0;
        let right = geometry.width - geometry.margin_right;

        for (index, page) in self.pages.iter_mut().enumerate() {
            let label = format!("{}/{}", index + 1, total);
            let width = text_width_mm(&label, PAGE_NUMBER_FONT_SIZE, FontStyle::Regular);
            page.ops.push(DrawOp::Text {
                x: right - width,
                y: baseline,
                size: PAGE_NUMBER_FONT_SIZE,
                style: FontStyle::Regular,
                color: Color::GREY,
                text: label,
            });
        }
    }

    pub fn finish(self) -> RenderedDocument {
        RenderedDocument {
            title: self.title,
            geometry: self.cursor.geometry,
            pages: self.pages,
            warnings: self.warnings,
        }
    }
}

/// A fully laid-out document, ready to serialise.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub title: String,
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
    pub warnings: Vec<RenderWarning>,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every text run in the document, page by page.
    pub fn all_texts(&self) -> Vec<&str> {
        self.pages.iter().flat_map(|p| p.texts()).collect()
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.pages.iter().any(|p| p.contains_text(needle))
    }

    /// Serialise to PDF bytes.
    pub fn to_pdf(&self) -> Result<Vec<u8>, crate::error::AppError> {
        pdf::write_pdf(self)
    }
}

/// Greedy word wrap measured with Helvetica metrics.
///
/// Explicit newlines start new lines; words longer than `max_width` are
/// broken between characters.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32, style: FontStyle) -> Vec<String> {
    let width = |s: &str| text_width_mm(s, font_size, style);
    let space_width = width(" ");
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = width(word);

            if word_width > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let mut chunk = String::new();
                let mut chunk_width = 0.0;
                for c in word.chars() {
                    let char_width = width(c.encode_utf8(&mut [0; 4]));
                    if chunk_width + char_width > max_width && !chunk.is_empty() {
                        lines.push(std::mem::take(&mut chunk));
                        chunk_width = 0.0;
                    }
                    chunk.push(c);
                    chunk_width += char_width;
                }
                current = chunk;
                current_width = chunk_width;
                continue;
            }

            if current.is_empty() {
                current = word.to_string();
                current_width = word_width;
            } else if current_width + space_width + word_width <= max_width {
                current.push(' ');
                current.push_str(word);
                current_width += space_width + word_width;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
                current_width = word_width;
            }
        }

        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let pixels = ::image::RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 128]));
        let img = DynamicImage::ImageRgba8(pixels);
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ::image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_ensure_space_breaks_page() {
        let mut ctx = RenderContext::a4("test");
        ctx.set_y(270.0);
        assert!(!ctx.ensure_space(10.0));
        assert!(ctx.ensure_space(20.0));
        assert_eq!(ctx.page_index(), 1);
        assert_eq!(ctx.page_count(), 2);
        assert_eq!(ctx.y(), MARGIN_MM);
    }

    #[test]
    fn test_advance_never_moves_up() {
        let mut ctx = RenderContext::a4("test");
        ctx.advance(12.5);
        ctx.advance(-40.0);
        assert_eq!(ctx.y(), MARGIN_MM + 12.5);
    }

    #[test]
    fn test_wrap_respects_max_width() {
        let text = "Ní mór don iarratasóir an fhoirm seo a shíniú agus a dháta a chur léi \
                    sula gcuirtear isteach í chuig na Coimisinéirí Ioncaim.";
        let lines = wrap_text(text, 60.0, 10.0, FontStyle::Regular);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, 10.0, FontStyle::Regular) <= 60.0, "{line}");
        }
        assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let iban = "IE29AIBK93115212345678IE29AIBK93115212345678";
        let lines = wrap_text(iban, 20.0, 10.0, FontStyle::Bold);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, 10.0, FontStyle::Bold) <= 20.0);
        }
    }

    #[test]
    fn test_wrap_keeps_explicit_newlines() {
        let lines = wrap_text("first\nsecond", 100.0, 10.0, FontStyle::Regular);
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_wrap_empty_text_yields_one_blank_line() {
        assert_eq!(wrap_text("", 50.0, 10.0, FontStyle::Regular), vec![String::new()]);
    }

    #[test]
    fn test_text_block_breaks_between_lines() {
        let mut ctx = RenderContext::a4("test");
        ctx.set_y(ctx.bottom_limit() - 6.0);
        let text = "one two three four five six seven eight";
        ctx.text_block(MARGIN_MM, 40.0, text, 10.0, FontStyle::Regular);
        assert_eq!(ctx.page_count(), 2);
        assert!(ctx.y() <= ctx.bottom_limit());
    }

    #[test]
    fn test_bad_image_is_a_warning() {
        let mut ctx = RenderContext::a4("test");
        let result = ctx.draw_image("logo", b"not an image", 10.0, 10.0, 20.0, 10.0);
        assert!(matches!(result, Err(RenderWarning::ImageDecode { .. })));
        assert_eq!(ctx.warnings().len(), 1);
        let doc = ctx.finish();
        assert_eq!(doc.pages[0].image_count(), 0);
    }

    #[test]
    fn test_good_image_is_recorded() {
        let mut ctx = RenderContext::a4("test");
        assert!(ctx.draw_image("logo", &png_bytes(), 10.0, 10.0, 20.0, 10.0).is_ok());
        let doc = ctx.finish();
        assert_eq!(doc.pages[0].image_count(), 1);
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn test_stamp_page_numbers_once() {
        let mut ctx = RenderContext::a4("test");
        ctx.new_page();
        ctx.new_page();
        ctx.stamp_page_numbers();
        ctx.stamp_page_numbers();
        let doc = ctx.finish();
        assert_eq!(doc.page_count(), 3);
        for (i, page) in doc.pages.iter().enumerate() {
            let stamps: Vec<_> = page.texts().filter(|t| t.contains('/')).collect();
            assert_eq!(stamps, vec![format!("{}/3", i + 1)]);
        }
    }
}
