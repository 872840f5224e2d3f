use tracing::debug;

use crate::hocr::Line;
use crate::page_image::PageImage;

use super::font::OverlayFont;
use super::geom::{Rotation, text_run};
use super::{Page, TextRun};

#[derive(Debug, Clone, Copy, Default)]
pub struct CompositorOptions {
    /// Render the overlay text visibly, for checking alignment by eye.
    pub debug_visible_text: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// PDF text render mode 3: neither filled nor stroked.
    Invisible,
    Fill,
}

/// A page ready for emission: the background image filling the page box and
/// the text runs drawn over it, in line then word order.
#[derive(Debug, Clone)]
pub struct ComposedPage<'a> {
    pub page: Page,
    pub image: &'a PageImage,
    pub runs: Vec<TextRun>,
    pub render_mode: RenderMode,
}

pub fn compose_page<'a>(
    page: Page,
    image: &'a PageImage,
    lines: &[Line],
    font: &OverlayFont,
    options: CompositorOptions,
) -> ComposedPage<'a> {
    let mut runs = Vec::new();
    let mut skipped = 0usize;
    for line in lines {
        let rotation = Rotation::from_baseline(&line.baseline);
        for word in &line.words {
            match text_run(&page, line, rotation, word, font) {
                Ok(run) => runs.push(run),
                Err(_) => {
                    skipped += 1;
                    debug!("compose: skipping '{}' (degenerate measurement)", word.text);
                }
            }
        }
    }
    debug!(
        "compose: {} text runs on a {}x{}pt page ({} skipped)",
        runs.len(),
        page.point_width,
        page.point_height,
        skipped
    );

    let render_mode = if options.debug_visible_text {
        RenderMode::Fill
    } else {
        RenderMode::Invisible
    };
    ComposedPage {
        page,
        image,
        runs,
        render_mode,
    }
}
