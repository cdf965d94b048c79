use std::path::Path;

use anyhow::{Context, Result};
use image::{Pixel, Rgba, RgbaImage};

use crate::color::{BLACK, WHITE};

// ---------------------------------------------------------------------------
// Canvas: an RGBA image with a data → pixel mapping for the plot area
// ---------------------------------------------------------------------------

/// Pixels reserved around the plot area for axes.
const MARGIN: f64 = 60.0;

/// Number of tick marks drawn per axis.
const TICKS: usize = 5;

pub struct Canvas {
    img: RgbaImage,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Canvas {
    /// White canvas mapping the unit square onto the plot area.
    pub fn new(width: u32, height: u32) -> Self {
        Canvas {
            img: RgbaImage::from_pixel(width, height, WHITE),
            x_range: (0.0, 1.0),
            y_range: (0.0, 1.0),
        }
    }

    pub fn set_x_range(&mut self, lo: f64, hi: f64) {
        self.x_range = padded_range(lo, hi);
    }

    pub fn set_y_range(&mut self, lo: f64, hi: f64) {
        self.y_range = padded_range(lo, hi);
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    fn plot_left(&self) -> f64 {
        MARGIN
    }

    fn plot_right(&self) -> f64 {
        self.img.width() as f64 - MARGIN / 2.0
    }

    fn plot_top(&self) -> f64 {
        MARGIN / 2.0
    }

    fn plot_bottom(&self) -> f64 {
        self.img.height() as f64 - MARGIN
    }

    /// Data coordinates → pixel coordinates (y grows downwards).
    pub fn to_px(&self, x: f64, y: f64) -> (f64, f64) {
        let (x0, x1) = self.x_range;
        let (y0, y1) = self.y_range;
        let px = self.plot_left() + (x - x0) / (x1 - x0) * (self.plot_right() - self.plot_left());
        let py = self.plot_bottom() - (y - y0) / (y1 - y0) * (self.plot_bottom() - self.plot_top());
        (px, py)
    }

    /// Alpha-blend one pixel; out-of-bounds writes are dropped.
    pub fn blend(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x < 0 || y < 0 || x >= self.img.width() as i64 || y >= self.img.height() as i64 {
            return;
        }
        self.img.get_pixel_mut(x as u32, y as u32).blend(&color);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.img.get_pixel(x, y)
    }

    /// Fill the pixel rectangle spanned by two corners.
    pub fn fill_rect_px(&mut self, a: (f64, f64), b: (f64, f64), color: Rgba<u8>) {
        let (x0, x1) = (a.0.min(b.0).round() as i64, a.0.max(b.0).round() as i64);
        let (y0, y1) = (a.1.min(b.1).round() as i64, a.1.max(b.1).round() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.blend(x, y, color);
            }
        }
    }

    /// Outline the pixel rectangle spanned by two corners.
    pub fn stroke_rect_px(&mut self, a: (f64, f64), b: (f64, f64), color: Rgba<u8>) {
        self.line_px(a, (b.0, a.1), color);
        self.line_px((b.0, a.1), b, color);
        self.line_px(b, (a.0, b.1), color);
        self.line_px((a.0, b.1), a, color);
    }

    /// Straight line between two pixel positions, one blend per step.
    pub fn line_px(&mut self, a: (f64, f64), b: (f64, f64), color: Rgba<u8>) {
        let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0) as i64;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = a.0 + (b.0 - a.0) * t;
            let y = a.1 + (b.1 - a.1) * t;
            self.blend(x.round() as i64, y.round() as i64, color);
        }
    }

    /// Filled disc centred on a pixel position.
    pub fn dot_px(&mut self, c: (f64, f64), radius: f64, color: Rgba<u8>) {
        let r = radius.ceil() as i64;
        let (cx, cy) = (c.0.round() as i64, c.1.round() as i64);
        for dy in -r..=r {
            for dx in -r..=r {
                if ((dx * dx + dy * dy) as f64) <= radius * radius {
                    self.blend(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Line in data coordinates.
    pub fn line(&mut self, a: (f64, f64), b: (f64, f64), color: Rgba<u8>) {
        let (pa, pb) = (self.to_px(a.0, a.1), self.to_px(b.0, b.1));
        self.line_px(pa, pb, color);
    }

    /// Rectangle in data coordinates.
    pub fn fill_rect(&mut self, a: (f64, f64), b: (f64, f64), color: Rgba<u8>) {
        let (pa, pb) = (self.to_px(a.0, a.1), self.to_px(b.0, b.1));
        self.fill_rect_px(pa, pb, color);
    }

    /// Left and bottom axes with evenly spaced ticks.
    pub fn draw_axes(&mut self) {
        let (left, right) = (self.plot_left(), self.plot_right());
        let (top, bottom) = (self.plot_top(), self.plot_bottom());
        self.line_px((left, top), (left, bottom), BLACK);
        self.line_px((left, bottom), (right, bottom), BLACK);

        for i in 0..=TICKS {
            let t = i as f64 / TICKS as f64;
            let y = bottom - t * (bottom - top);
            self.line_px((left - 5.0, y), (left, y), BLACK);
            let x = left + t * (right - left);
            self.line_px((x, bottom), (x, bottom + 5.0), BLACK);
        }
    }

    /// Colour swatches stacked in the top-right corner of the plot area.
    pub fn draw_legend(&mut self, colors: &[Rgba<u8>]) {
        let right = self.plot_right() - 10.0;
        for (i, &color) in colors.iter().enumerate() {
            let top = self.plot_top() + 10.0 + i as f64 * 18.0;
            self.fill_rect_px((right - 24.0, top), (right, top + 12.0), color);
            self.stroke_rect_px((right - 24.0, top), (right, top + 12.0), BLACK);
        }
    }

    /// Encode to a file; the format follows the extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.img
            .save(path)
            .with_context(|| format!("saving chart {}", path.display()))
    }
}

/// Degenerate ranges are widened so the mapping stays finite.
fn padded_range(lo: f64, hi: f64) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        return (lo - pad, hi + pad);
    }
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_px_maps_corners() {
        let mut canvas = Canvas::new(400, 300);
        canvas.set_x_range(0.0, 10.0);
        canvas.set_y_range(0.0, 1.0);

        assert_eq!(canvas.to_px(0.0, 0.0), (60.0, 240.0));
        assert_eq!(canvas.to_px(10.0, 1.0), (370.0, 30.0));
    }

    #[test]
    fn test_degenerate_range_is_widened() {
        assert_eq!(padded_range(0.0, 0.0), (-1.0, 1.0));
        assert_eq!(padded_range(f64::NAN, 1.0), (0.0, 1.0));
        let (lo, hi) = padded_range(100.0, 100.0);
        assert!(lo < 100.0 && hi > 100.0);
    }

    #[test]
    fn test_blend_out_of_bounds_is_ignored() {
        let mut canvas = Canvas::new(10, 10);
        canvas.blend(-1, 5, BLACK);
        canvas.blend(10, 5, BLACK);
        canvas.blend(5, 5, BLACK);
        assert_eq!(canvas.pixel(5, 5), BLACK);
    }

    #[test]
    fn test_translucent_fill_blends() {
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_rect_px((0.0, 0.0), (9.0, 9.0), Rgba([0, 0, 0, 128]));
        let Rgba([r, _, _, a]) = canvas.pixel(3, 3);
        assert!(r > 100 && r < 150, "got {r}");
        assert_eq!(a, 255);
    }
}
