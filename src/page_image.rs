use exif::{In, Tag, Value};
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::error::{OverlayError, Result};

const CM_PER_INCH: f64 = 2.54;

/// A decoded page image plus the horizontal resolution stored in its header,
/// when the format carries one.
#[derive(Debug, Clone)]
pub struct PageImage {
    image: DynamicImage,
    embedded_dpi: Option<u32>,
}

impl PageImage {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
            .map_err(|err| match err {
                OverlayError::Image(message) => {
                    OverlayError::Image(format!("{}: {}", path.display(), message))
                }
                other => other,
            })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image =
            image::load_from_memory(bytes).map_err(|err| OverlayError::Image(err.to_string()))?;
        Ok(PageImage {
            image,
            embedded_dpi: header_dpi(bytes),
        })
    }

    pub fn from_image(image: DynamicImage, embedded_dpi: Option<u32>) -> Self {
        PageImage {
            image,
            embedded_dpi,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn embedded_dpi(&self) -> Option<u32> {
        self.embedded_dpi
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Converts to the image type printpdf embeds. Grey images stay grey;
    /// everything else is flattened to 8-bit RGB.
    pub(crate) fn to_pdf_image(&self) -> Result<printpdf::image_crate::DynamicImage> {
        use printpdf::image_crate::{DynamicImage as PdfImage, GrayImage, RgbImage};

        let (width, height) = self.dimensions();
        let converted = if self.image.color().has_color() {
            RgbImage::from_raw(width, height, self.image.to_rgb8().into_raw())
                .map(PdfImage::ImageRgb8)
        } else {
            GrayImage::from_raw(width, height, self.image.to_luma8().into_raw())
                .map(PdfImage::ImageLuma8)
        };
        converted.ok_or_else(|| OverlayError::Image("pixel buffer size mismatch".to_string()))
    }
}

/// Horizontal resolution from a PNG `pHYs` chunk, a JPEG JFIF header, or the
/// EXIF `XResolution` tag of a JPEG, TIFF or PNG.
pub(crate) fn header_dpi(bytes: &[u8]) -> Option<u32> {
    let dpi = match image::guess_format(bytes).ok()? {
        ImageFormat::Png => png_dpi(bytes).or_else(|| exif_dpi(bytes)),
        ImageFormat::Jpeg => jfif_dpi(bytes).or_else(|| exif_dpi(bytes)),
        ImageFormat::Tiff => exif_dpi(bytes),
        _ => None,
    }?;
    if dpi.is_finite() && dpi >= 1.0 {
        Some(dpi.round() as u32)
    } else {
        None
    }
}

fn png_dpi(bytes: &[u8]) -> Option<f64> {
    let reader = png::Decoder::new(Cursor::new(bytes)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        png::Unit::Meter => Some(dims.xppu as f64 * CM_PER_INCH / 100.0),
        // only an aspect ratio
        png::Unit::Unspecified => None,
    }
}

/// JFIF puts its APP0 segment right after SOI.
fn jfif_dpi(bytes: &[u8]) -> Option<f64> {
    let app0 = bytes.get(2..18)?;
    if app0[..2] != [0xFF, 0xE0] || &app0[4..9] != b"JFIF\0" {
        return None;
    }
    let density_x = u16::from_be_bytes([app0[12], app0[13]]) as f64;
    match app0[11] {
        1 => Some(density_x),
        2 => Some(density_x * CM_PER_INCH),
        _ => None,
    }
}

fn exif_dpi(bytes: &[u8]) -> Option<f64> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let resolution = match &exif.get_field(Tag::XResolution, In::PRIMARY)?.value {
        Value::Rational(values) => {
            let value = values.first()?;
            if value.denom == 0 {
                return None;
            }
            value.to_f64()
        }
        _ => return None,
    };
    let unit = exif
        .get_field(Tag::ResolutionUnit, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(2);
    match unit {
        2 => Some(resolution),
        3 => Some(resolution * CM_PER_INCH),
        _ => None,
    }
}
