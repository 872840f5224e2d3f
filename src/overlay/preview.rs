use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use resvg::render;
use std::io::Cursor;
use tiny_skia::Pixmap;
use usvg::{Options, Tree};

use crate::hocr::Line;
use crate::page_image::PageImage;

use super::geom::baseline_y;

const LINE_STROKE: &str = "#2962ff";
const WORD_STROKE: &str = "#00c853";
const BASELINE_STROKE: &str = "#d50000";

/// The page image as a PNG data URI, for embedding in a preview SVG.
pub fn preview_data_uri(image: &PageImage) -> Result<String> {
    let mut bytes = Vec::new();
    image
        .image()
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .with_context(|| "failed to encode page image for preview")?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(&bytes)))
}

/// Draws line boxes, word boxes and the baseline each word is set on over
/// the page image, in pixel space.
pub fn render_preview_svg(image_href: &str, width: u32, height: u32, lines: &[Line]) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = escape_xml(image_href),
        w = width,
        h = height
    ));

    for line in lines {
        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="{stroke}" stroke-width="1"/>"#,
            x = line.bbox.x0,
            y = line.bbox.y0,
            w = line.bbox.width(),
            h = line.bbox.height(),
            stroke = LINE_STROKE
        ));
        for word in &line.words {
            svg.push_str(&format!(
                r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="{stroke}" stroke-width="1"><title>{text}</title></rect>"#,
                x = word.bbox.x0,
                y = word.bbox.y0,
                w = word.bbox.width(),
                h = word.bbox.height(),
                stroke = WORD_STROKE,
                text = escape_xml(&word.text)
            ));
            let start_y = baseline_y(line, word);
            let end_y = start_y + line.baseline.slope * word.bbox.width();
            svg.push_str(&format!(
                r#"<line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="{stroke}" stroke-width="1"/>"#,
                x1 = word.bbox.x0,
                y1 = start_y,
                x2 = word.bbox.x1,
                y2 = end_y,
                stroke = BASELINE_STROKE
            ));
        }
    }

    svg.push_str("</svg>");
    svg
}

pub fn render_preview_png(svg: &str) -> Result<Vec<u8>> {
    let tree = Tree::from_str(svg, &Options::default()).with_context(|| "failed to parse SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let image = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from SVG"))?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .with_context(|| "failed to encode preview PNG")?;
    Ok(bytes)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
