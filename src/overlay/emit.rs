use printpdf::lopdf::{Dictionary, Object};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, TextMatrix, TextRenderingMode,
};
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::error::{OverlayError, Result};

use super::Page;
use super::compose::{ComposedPage, RenderMode};
use super::font::OverlayFont;

const CREATOR: &str = "hocr-pdf-rust";

/// Serializes composed pages into one PDF, in order.
pub fn emit_document(pages: &[ComposedPage<'_>], font: &OverlayFont, title: &str) -> Result<Vec<u8>> {
    let Some((first, rest)) = pages.split_first() else {
        return Err(OverlayError::Pdf("no pages to emit".to_string()));
    };

    let (doc, first_page, first_layer) = PdfDocument::new(
        title,
        to_mm(first.page.point_width),
        to_mm(first.page.point_height),
        "Layer 1",
    );
    let doc = doc.with_creator(CREATOR);
    let pdf_font = register_font(&doc, font)?;

    let mut targets = vec![(first_page, first_layer)];
    for (idx, composed) in rest.iter().enumerate() {
        targets.push(doc.add_page(
            to_mm(composed.page.point_width),
            to_mm(composed.page.point_height),
            format!("Layer {}", idx + 2),
        ));
    }

    for (composed, (page, layer)) in pages.iter().zip(targets) {
        let current_page = doc.get_page(page);
        current_page.extend_with(page_boxes(&composed.page));
        draw_page(&current_page.get_layer(layer), composed, &pdf_font)?;
    }

    let mut buffer = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buffer);
        doc.save(&mut writer)
            .map_err(|err| OverlayError::Pdf(err.to_string()))?;
    }
    info!(
        "pdf: emitted {} page(s), {} bytes, font {}",
        pages.len(),
        buffer.len(),
        font.name()
    );
    Ok(buffer)
}

/// Emits the document and writes it to `path`. Nothing is written unless
/// every page composed and serialized.
pub fn write_document(
    pages: &[ComposedPage<'_>],
    font: &OverlayFont,
    title: &str,
    path: &Path,
) -> Result<()> {
    let bytes = emit_document(pages, font, title)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn register_font(doc: &PdfDocumentReference, font: &OverlayFont) -> Result<IndirectFontRef> {
    let registered = match font {
        OverlayFont::Courier => doc.add_builtin_font(BuiltinFont::Courier),
        OverlayFont::External(metrics) => doc.add_external_font(metrics.data()),
    };
    registered.map_err(|err| OverlayError::Pdf(format!("failed to add font {}: {}", font.name(), err)))
}

fn draw_page(
    layer: &PdfLayerReference,
    composed: &ComposedPage<'_>,
    font: &IndirectFontRef,
) -> Result<()> {
    // at the page's own dpi the image is exactly the page box
    let background = Image::from_dynamic_image(&composed.image.to_pdf_image()?);
    background.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            rotate: None,
            scale_x: Some(1.0),
            scale_y: Some(1.0),
            dpi: Some(composed.page.dpi as f32),
        },
    );

    for run in &composed.runs {
        let (x, y) = run.origin;
        let (cos, sin) = (run.rotation.cos as f32, run.rotation.sin as f32);
        layer.begin_text_section();
        layer.set_text_rendering_mode(text_mode(composed.render_mode));
        layer.set_font(font, run.font_size as f32);
        layer.set_text_scaling(run.horizontal_scale as f32);
        layer.set_text_matrix(TextMatrix::Raw([cos, -sin, sin, cos, x as f32, y as f32]));
        layer.write_text(run.text.clone(), font);
        layer.end_text_section();
    }
    Ok(())
}

fn text_mode(mode: RenderMode) -> TextRenderingMode {
    match mode {
        RenderMode::Invisible => TextRenderingMode::Invisible,
        RenderMode::Fill => TextRenderingMode::Fill,
    }
}

fn to_mm(points: f64) -> Mm {
    Mm((points * 25.4 / 72.0) as f32)
}

/// Page boxes straight from the point size. printpdf derives them from the
/// millimetre size, which does not survive the f32 round trip exactly.
fn page_boxes(page: &Page) -> Dictionary {
    let rect = || -> Object {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page.point_width as f32),
            Object::Real(page.point_height as f32),
        ])
    };
    Dictionary::from_iter(vec![
        ("MediaBox", rect()),
        ("TrimBox", rect()),
        ("CropBox", rect()),
    ])
}
