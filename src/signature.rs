//! Freehand signature capture.
//!
//! A [`SignaturePad`] is a drawing surface of a fixed native size (CSS
//! pixels). Ink comes from pointer strokes or from an uploaded image, which
//! is stretched onto the whole surface regardless of its aspect ratio.
//! Exports are PNGs at `native size × device pixel ratio × scale`.
//!
//! ```text
//! Empty --pointer_down--> Drawing --pointer_up (ink)--> PendingAccept --accept--> Accepted
//!   ^                        |
//!   +---pointer_up (no ink)--+          clear() from any state --> Empty
//! ```

use std::io::Cursor;

use ::image::imageops::{overlay, FilterType};
use ::image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use thiserror::Error;
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::output::strip_data_uri_prefix;

/// Default pen width in CSS pixels.
const PEN_WIDTH: f32 = 2.5;

/// Largest export, in pixels, before allocating the canvas
const MAX_EXPORT_PIXELS: u64 = 16_000_000;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("signature surface is empty")]
    Empty,
    #[error("cannot {action} while in state {state:?}")]
    InvalidState {
        action: &'static str,
        state: SignatureState,
    },
    #[error("export size {0}x{1} is not usable")]
    BadSize(u32, u32),
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("could not encode PNG: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureState {
    Empty,
    Drawing,
    PendingAccept,
    Accepted,
}

/// An exported signature. Owns its pixels, so later strokes on the pad never
/// change it.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl SignatureImage {
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }

    /// Decode a `data:image/...;base64,` URI (or bare base64).
    pub fn from_data_url(data_url: &str) -> Result<Self, SignatureError> {
        let png = STANDARD
            .decode(strip_data_uri_prefix(data_url).trim())
            .map_err(|e| SignatureError::Decode(e.to_string()))?;
        let img =
            ::image::load_from_memory(&png).map_err(|e| SignatureError::Decode(e.to_string()))?;
        Ok(Self {
            width: img.width(),
            height: img.height(),
            png,
        })
    }
}

pub struct SignaturePad {
    width: u32,
    height: u32,
    device_pixel_ratio: f32,
    pen_width: f32,
    strokes: Vec<Vec<(f32, f32)>>,
    background: Option<DynamicImage>,
    state: SignatureState,
    accepted: Option<SignatureImage>,
}

impl SignaturePad {
    /// A surface of `width` x `height` CSS pixels.
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: if device_pixel_ratio > 0.0 { device_pixel_ratio } else { 1.0 },
            pen_width: PEN_WIDTH,
            strokes: Vec::new(),
            background: None,
            state: SignatureState::Empty,
            accepted: None,
        }
    }

    pub fn with_pen_width(mut self, pen_width: f32) -> Self {
        self.pen_width = pen_width;
        self
    }

    pub fn state(&self) -> SignatureState {
        self.state
    }

    pub fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_ink(&self) -> bool {
        self.background.is_some() || self.strokes.iter().any(|s| !s.is_empty())
    }

    /// The last accepted export, if any.
    pub fn accepted(&self) -> Option<&SignatureImage> {
        self.accepted.as_ref()
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.strokes.push(vec![(x, y)]);
        self.state = SignatureState::Drawing;
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.state != SignatureState::Drawing {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push((x, y));
        }
    }

    pub fn pointer_up(&mut self) {
        if self.state != SignatureState::Drawing {
            return;
        }
        self.state = if self.has_ink() {
            SignatureState::PendingAccept
        } else {
            SignatureState::Empty
        };
    }

    /// Draw an uploaded image over the whole surface and await acceptance.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<(), SignatureError> {
        let img =
            ::image::load_from_memory(bytes).map_err(|e| SignatureError::Decode(e.to_string()))?;
        debug!(
            "signature upload {}x{} stretched to {}x{}",
            img.width(),
            img.height(),
            self.width,
            self.height
        );
        self.strokes.clear();
        self.background = Some(img);
        self.state = SignatureState::PendingAccept;
        Ok(())
    }

    /// Export the surface and keep the export as the accepted signature.
    pub fn accept(&mut self, scale: f32) -> Result<SignatureImage, SignatureError> {
        match self.state {
            SignatureState::PendingAccept | SignatureState::Accepted => {}
            SignatureState::Empty => return Err(SignatureError::Empty),
            state => {
                return Err(SignatureError::InvalidState {
                    action: "accept",
                    state,
                })
            }
        }
        let image = self.export(scale)?;
        self.accepted = Some(image.clone());
        self.state = SignatureState::Accepted;
        Ok(image)
    }

    /// Wipe all ink and any accepted export.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.background = None;
        self.accepted = None;
        self.state = SignatureState::Empty;
    }

    /// PNG data URI of the current surface, or `None` while it is empty.
    pub fn data_url(&self, scale: f32) -> Option<String> {
        if !self.has_ink() {
            return None;
        }
        self.export(scale).ok().map(|img| img.to_data_url())
    }

    pub fn export_size(&self, scale: f32) -> (u32, u32) {
        let factor = self.device_pixel_ratio * scale;
        (
            (self.width as f32 * factor).round() as u32,
            (self.height as f32 * factor).round() as u32,
        )
    }

    /// Rasterise the surface at `scale` and encode it as PNG.
    pub fn export(&self, scale: f32) -> Result<SignatureImage, SignatureError> {
        if !self.has_ink() {
            return Err(SignatureError::Empty);
        }
        let (w, h) = self.export_size(scale);
        if w == 0 || h == 0 || u64::from(w) * u64::from(h) > MAX_EXPORT_PIXELS {
            return Err(SignatureError::BadSize(w, h));
        }
        let factor = self.device_pixel_ratio * scale;

        let mut canvas = match &self.background {
            Some(img) => img.resize_exact(w, h, FilterType::Triangle).to_rgba8(),
            None => RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0])),
        };

        let ink = self.rasterise_strokes(w, h, factor)?;
        overlay(&mut canvas, &ink, 0, 0);

        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| SignatureError::Encode(e.to_string()))?;

        Ok(SignatureImage {
            png: out.into_inner(),
            width: w,
            height: h,
        })
    }

    fn rasterise_strokes(&self, w: u32, h: u32, factor: f32) -> Result<RgbaImage, SignatureError> {
        let mut pixmap = Pixmap::new(w, h).ok_or(SignatureError::BadSize(w, h))?;

        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: self.pen_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        let transform = Transform::from_scale(factor, factor);

        for points in &self.strokes {
            match points.as_slice() {
                [] => {}
                [(x, y)] => {
                    // A tap leaves a dot.
                    if let Some(dot) = PathBuilder::from_circle(*x, *y, self.pen_width / 2.0) {
                        let rule = tiny_skia::FillRule::Winding;
                        pixmap.fill_path(&dot, &paint, rule, transform, None);
                    }
                }
                [(x0, y0), rest @ ..] => {
                    let mut pb = PathBuilder::new();
                    pb.move_to(*x0, *y0);
                    for (x, y) in rest {
                        pb.line_to(*x, *y);
                    }
                    if let Some(path) = pb.finish() {
                        pixmap.stroke_path(&path, &paint, &stroke, transform, None);
                    }
                }
            }
        }

        let mut ink = RgbaImage::new(w, h);
        for (pixel, out) in pixmap.pixels().iter().zip(ink.pixels_mut()) {
            let c = pixel.demultiply();
            *out = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(ink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_line(pad: &mut SignaturePad) {
        pad.pointer_down(10.0, 10.0);
        pad.pointer_move(60.0, 40.0);
        pad.pointer_move(120.0, 20.0);
        pad.pointer_up();
    }

    #[test]
    fn test_empty_pad_has_no_data_url() {
        let pad = SignaturePad::new(300, 120, 2.0);
        assert_eq!(pad.state(), SignatureState::Empty);
        assert!(pad.data_url(1.0).is_none());
    }

    #[test]
    fn test_draw_then_accept() {
        let mut pad = SignaturePad::new(300, 120, 2.0);
        pad.pointer_down(10.0, 10.0);
        assert_eq!(pad.state(), SignatureState::Drawing);
        pad.pointer_move(60.0, 40.0);
        pad.pointer_up();
        assert_eq!(pad.state(), SignatureState::PendingAccept);

        let image = pad.accept(1.5).unwrap();
        assert_eq!(pad.state(), SignatureState::Accepted);
        assert_eq!((image.width, image.height), (900, 360));
        assert!(pad.data_url(1.0).unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_clear_after_accept_returns_to_empty() {
        let mut pad = SignaturePad::new(300, 120, 1.0);
        draw_line(&mut pad);
        pad.accept(1.0).unwrap();
        pad.clear();
        assert_eq!(pad.state(), SignatureState::Empty);
        assert!(pad.data_url(1.0).is_none());
        assert!(pad.accepted().is_none());
    }

    #[test]
    fn test_accepted_copy_is_not_mutated_by_later_strokes() {
        let mut pad = SignaturePad::new(200, 80, 1.0);
        draw_line(&mut pad);
        let first = pad.accept(1.0).unwrap();

        pad.pointer_down(150.0, 70.0);
        pad.pointer_move(10.0, 70.0);
        pad.pointer_up();

        assert_eq!(pad.accepted(), Some(&first));
        let second = pad.accept(1.0).unwrap();
        assert_ne!(first.png, second.png);
    }

    #[test]
    fn test_ink_is_opaque_where_drawn() {
        let mut pad = SignaturePad::new(100, 50, 1.0).with_pen_width(4.0);
        pad.pointer_down(10.0, 25.0);
        pad.pointer_move(90.0, 25.0);
        pad.pointer_up();
        let image = pad.accept(1.0).unwrap();
        let decoded = ::image::load_from_memory(&image.png).unwrap().to_rgba8();
        assert!(decoded.get_pixel(50, 25)[3] > 200);
        assert_eq!(decoded.get_pixel(50, 5)[3], 0);
    }

    #[test]
    fn test_oversized_export_is_refused() {
        let mut pad = SignaturePad::new(600, 250, 1.0);
        draw_line(&mut pad);
        assert!(matches!(pad.export(1e9), Err(SignatureError::BadSize(..))));
        assert!(matches!(pad.export(30.0), Err(SignatureError::BadSize(..))));
        assert!(matches!(pad.accept(f32::NAN), Err(SignatureError::BadSize(0, 0))));
        // a refused export leaves the pad waiting for acceptance
        assert_eq!(pad.state(), SignatureState::PendingAccept);
        assert!(pad.accept(2.0).is_ok());
    }

    #[test]
    fn test_accept_requires_ink() {
        let mut pad = SignaturePad::new(100, 50, 1.0);
        assert!(matches!(pad.accept(1.0), Err(SignatureError::Empty)));
        pad.pointer_down(5.0, 5.0);
        assert!(matches!(
            pad.accept(1.0),
            Err(SignatureError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_upload_is_stretched_to_surface() {
        let upload =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 40, Rgba([0, 0, 255, 255])));
        let mut bytes = Cursor::new(Vec::new());
        upload.write_to(&mut bytes, ImageFormat::Png).unwrap();

        let mut pad = SignaturePad::new(200, 50, 1.0);
        pad.load_image(bytes.get_ref()).unwrap();
        assert_eq!(pad.state(), SignatureState::PendingAccept);

        let image = pad.accept(2.0).unwrap();
        assert_eq!((image.width, image.height), (400, 100));
        let decoded = ::image::load_from_memory(&image.png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(399, 99)[2], 255);
    }

    #[test]
    fn test_data_url_round_trip() {
        let mut pad = SignaturePad::new(60, 30, 1.0);
        draw_line(&mut pad);
        let image = pad.accept(1.0).unwrap();
        let parsed = SignatureImage::from_data_url(&image.to_data_url()).unwrap();
        assert_eq!(parsed, image);
    }
}
