mod compose;
mod emit;
mod font;
mod geom;
mod preview;

use serde::Serialize;

use crate::error::{OverlayError, Result};

pub use compose::{ComposedPage, CompositorOptions, RenderMode, compose_page};
pub use emit::{emit_document, write_document};
pub use font::{FontMetrics, OverlayFont, load_font_metrics, resolve_overlay_font};
pub use geom::{Rotation, baseline_y, text_run, to_points};
pub use preview::{preview_data_uri, render_preview_png, render_preview_svg};

/// Geometry of one output page. Point dimensions are derived from the pixel
/// dimensions at `dpi`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Page {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub dpi: u32,
    pub point_width: f64,
    pub point_height: f64,
}

impl Page {
    pub fn new(pixel_width: u32, pixel_height: u32, dpi: u32) -> Result<Self> {
        if dpi == 0 {
            return Err(OverlayError::InvalidDpi(dpi));
        }
        Ok(Page {
            pixel_width,
            pixel_height,
            dpi,
            point_width: to_points(pixel_width as f64, dpi),
            point_height: to_points(pixel_height as f64, dpi),
        })
    }

    /// The image's own resolution wins when it reports a usable one.
    pub fn resolve_dpi(embedded: Option<u32>, fallback: u32) -> u32 {
        embedded.filter(|dpi| *dpi > 0).unwrap_or(fallback)
    }

    pub fn to_points(&self, pixels: f64) -> f64 {
        to_points(pixels, self.dpi)
    }
}

/// One positioned run of overlay text, in page points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub origin: (f64, f64),
    pub rotation: Rotation,
    pub font_size: f64,
    /// Percent, as for the PDF `Tz` operator.
    pub horizontal_scale: f64,
    pub text: String,
}
