//! Replay a [`RenderedDocument`] display list through printpdf.
//!
//! printpdf puts the origin at the bottom-left of the page, so every `y` is
//! flipped against the page height on the way out.

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef,
    Line, Mm, PdfDocument, PdfLayerReference, Point, Polygon, Px, Rgb,
};

use super::{Color, DrawOp, FontStyle, RasterImage, RenderedDocument};
use crate::error::AppError;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
        }
    }
}

/// Serialise a finished document to PDF bytes.
pub fn write_pdf(document: &RenderedDocument) -> Result<Vec<u8>, AppError> {
    let width = document.geometry.width;
    let height = document.geometry.height;

    let (doc, page1, layer1) =
        PdfDocument::new(document.title.as_str(), Mm(width), Mm(height), "Layer 1");

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::PdfError(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::PdfError(e.to_string()))?,
    };

    for (index, page) in document.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (page_idx, layer_idx) = doc.add_page(Mm(width), Mm(height), "Layer 1");
            doc.get_page(page_idx).get_layer(layer_idx)
        };

        for op in &page.ops {
            draw_op(&layer, &fonts, height, op);
        }
    }

    doc.save_to_bytes()
        .map_err(|e| AppError::PdfError(e.to_string()))
}

fn pdf_color(color: Color) -> printpdf::Color {
    printpdf::Color::Rgb(Rgb::new(color.r, color.g, color.b, None))
}

fn point(x: f32, y: f32, page_height: f32) -> (Point, bool) {
    (Point::new(Mm(x), Mm(page_height - y)), false)
}

fn draw_op(layer: &PdfLayerReference, fonts: &Fonts, page_height: f32, op: &DrawOp) {
    match op {
        DrawOp::Text {
            x,
            y,
            size,
            style,
            color,
            text,
        } => {
            layer.set_fill_color(pdf_color(*color));
            layer.use_text(
                text.as_str(),
                *size,
                Mm(*x),
                Mm(page_height - y),
                fonts.get(*style),
            );
        }
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            thickness,
            color,
        } => {
            layer.set_outline_color(pdf_color(*color));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![point(*x1, *y1, page_height), point(*x2, *y2, page_height)],
                is_closed: false,
            });
        }
        DrawOp::Rect {
            x,
            y,
            w,
            h,
            fill,
            stroke,
        } => {
            let corners = vec![
                point(*x, *y, page_height),
                point(x + w, *y, page_height),
                point(x + w, y + h, page_height),
                point(*x, y + h, page_height),
            ];
            if let Some(fill) = fill {
                layer.set_fill_color(pdf_color(*fill));
                layer.add_polygon(Polygon {
                    rings: vec![corners.clone()],
                    mode: PaintMode::Fill,
                    winding_order: WindingOrder::NonZero,
                });
            }
            if let Some((color, thickness)) = stroke {
                layer.set_outline_color(pdf_color(*color));
                layer.set_outline_thickness(*thickness);
                layer.add_line(Line {
                    points: corners,
                    is_closed: true,
                });
            }
        }
        DrawOp::Image { x, y, w, h, image } => {
            embed_image(layer, image, *x, page_height - (y + h), *w, *h);
        }
    }
}

/// Place a raster so that it fills exactly `w` x `h` mm, stretching if the
/// aspect ratios differ.
fn embed_image(layer: &PdfLayerReference, raster: &RasterImage, x: f32, y: f32, w: f32, h: f32) {
    if raster.width == 0 || raster.height == 0 || w <= 0.0 || h <= 0.0 {
        return;
    }

    let image = Image::from(ImageXObject {
        width: Px(raster.width as usize),
        height: Px(raster.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: raster.rgb.clone(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // DPI = pixels / (mm / 25.4)
    let dpi = (raster.width as f32) / (w / 25.4);
    let natural_height = raster.height as f32 * 25.4 / dpi;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            dpi: Some(dpi),
            scale_y: Some(h / natural_height),
            ..Default::default()
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RenderContext;

    #[test]
    fn test_writes_pdf_header_and_pages() {
        let mut ctx = RenderContext::a4("Test");
        ctx.text(20.0, 20.0, "Hello", 12.0, FontStyle::Bold);
        ctx.rect(20.0, 30.0, 50.0, 10.0, Some(Color::BAND), Some((Color::BLACK, 0.3)));
        ctx.new_page();
        ctx.line(20.0, 20.0, 100.0, 20.0, 0.5, Color::BLACK);
        ctx.stamp_page_numbers();

        let bytes = ctx.finish().to_pdf().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }
}
