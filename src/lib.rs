pub mod error;
pub mod hocr;
pub mod logging;
pub mod overlay;
pub mod page_image;
pub mod settings;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::hocr::Line;
use crate::overlay::{ComposedPage, CompositorOptions, OverlayFont, Page};
use crate::page_image::PageImage;
use crate::settings::Settings;

pub use crate::error::{DegenerateMeasurement, OverlayError};

/// Options for building a searchable PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    /// Used when the page image does not carry its own resolution.
    pub dpi: u32,
    pub debug_visible_text: bool,
    pub font_path: Option<PathBuf>,
    pub font_family: Option<String>,
    pub title: String,
}

impl Default for PdfOptions {
    fn default() -> Self {
        PdfOptions::from(&Settings::default())
    }
}

impl From<&Settings> for PdfOptions {
    fn from(settings: &Settings) -> Self {
        PdfOptions {
            dpi: settings.dpi,
            debug_visible_text: settings.debug_visible_text,
            font_path: settings.font_path.as_ref().map(PathBuf::from),
            font_family: settings.font_family.clone(),
            title: settings.title.clone(),
        }
    }
}

impl PdfOptions {
    fn overlay_font(&self) -> Result<OverlayFont> {
        overlay::resolve_overlay_font(self.font_path.as_deref(), self.font_family.as_deref())
            .with_context(|| "failed to resolve overlay font")
    }
}

/// Builds a one-page PDF in memory: the image as the page background with
/// the hOCR text laid invisibly over it.
pub fn process_pdf(image: &PageImage, hocr: &str, options: &PdfOptions) -> Result<Vec<u8>> {
    let font = options.overlay_font()?;
    let lines = hocr::parse_layout(hocr).with_context(|| "invalid hOCR layout")?;
    let composed = compose(image, &lines, &font, options)?;
    let bytes = overlay::emit_document(&[composed], &font, &options.title)
        .with_context(|| "failed to emit PDF")?;
    Ok(bytes)
}

/// Reads one page image and its hOCR file and writes a one-page PDF to `pdf_path`.
pub fn create_pdf(
    image_path: &Path,
    hocr_path: &Path,
    pdf_path: &Path,
    options: &PdfOptions,
) -> Result<()> {
    create_book_pdf(
        &[(image_path.to_path_buf(), hocr_path.to_path_buf())],
        pdf_path,
        options,
    )
}

/// Writes one document with a page per `(image, hocr)` pair, in order.
/// Nothing is written if any page fails.
pub fn create_book_pdf(
    pages: &[(PathBuf, PathBuf)],
    pdf_path: &Path,
    options: &PdfOptions,
) -> Result<()> {
    ensure_inputs(pages)?;
    let font = options.overlay_font()?;
    let loaded = load_pages(pages)?;
    write_pages(&loaded, &font, pdf_path, options)
}

pub struct Config {
    pub pages: Vec<(PathBuf, PathBuf)>,
    pub output: Option<PathBuf>,
    pub density: Option<u32>,
    pub debug_text: bool,
    pub font_path: Option<PathBuf>,
    pub font_family: Option<String>,
    pub preview_path: Option<PathBuf>,
    pub text_path: Option<PathBuf>,
    pub layout_json_path: Option<PathBuf>,
    pub settings_path: Option<String>,
}

/// Runs the command line flow and returns the path of the written PDF.
pub fn run(config: Config) -> Result<PathBuf> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let options = resolve_options(&config, &settings);

    ensure_inputs(&config.pages)?;
    let output = match config.output.clone() {
        Some(path) => path,
        None => default_output_path(&config.pages[0].0),
    };

    let font = options.overlay_font()?;
    let loaded = load_pages(&config.pages)?;
    write_pages(&loaded, &font, &output, &options)?;
    info!("wrote {}", output.display());

    if let Some(path) = config.text_path.as_deref() {
        write_text(&loaded, path)?;
    }
    if let Some(path) = config.layout_json_path.as_deref() {
        write_layout_json(&loaded, &options, path)?;
    }
    if let Some(path) = config.preview_path.as_deref() {
        write_previews(&loaded, path)?;
    }
    Ok(output)
}

fn resolve_options(config: &Config, settings: &Settings) -> PdfOptions {
    let mut options = PdfOptions::from(settings);
    if let Some(dpi) = config.density.filter(|dpi| *dpi > 0) {
        options.dpi = dpi;
    }
    if config.debug_text {
        options.debug_visible_text = true;
    }
    if let Some(path) = config.font_path.clone() {
        options.font_path = Some(path);
        options.font_family = None;
    }
    if let Some(family) = config.font_family.clone() {
        options.font_family = Some(family);
        if config.font_path.is_none() {
            options.font_path = None;
        }
    }
    options
}

fn default_output_path(image_path: &Path) -> PathBuf {
    image_path.with_extension("pdf")
}

fn ensure_inputs(pages: &[(PathBuf, PathBuf)]) -> Result<()> {
    if pages.is_empty() {
        return Err(anyhow!("no pages given"));
    }
    for (image_path, hocr_path) in pages {
        if !image_path.is_file() {
            return Err(anyhow!("image not found: {}", image_path.display()));
        }
        if !hocr_path.is_file() {
            return Err(anyhow!("hOCR file not found: {}", hocr_path.display()));
        }
    }
    Ok(())
}

struct LoadedPage {
    image_path: PathBuf,
    image: PageImage,
    lines: Vec<Line>,
}

fn load_pages(pages: &[(PathBuf, PathBuf)]) -> Result<Vec<LoadedPage>> {
    pages
        .iter()
        .map(|(image_path, hocr_path)| {
            let hocr = fs::read_to_string(hocr_path)
                .with_context(|| format!("failed to read hOCR: {}", hocr_path.display()))?;
            let lines = hocr::parse_layout(&hocr)
                .with_context(|| format!("invalid hOCR layout: {}", hocr_path.display()))?;
            let image = PageImage::open(image_path)
                .with_context(|| format!("failed to open image: {}", image_path.display()))?;
            Ok(LoadedPage {
                image_path: image_path.clone(),
                image,
                lines,
            })
        })
        .collect()
}

fn compose<'a>(
    image: &'a PageImage,
    lines: &[Line],
    font: &OverlayFont,
    options: &PdfOptions,
) -> Result<ComposedPage<'a>> {
    let dpi = Page::resolve_dpi(image.embedded_dpi(), options.dpi);
    let page = Page::new(image.width(), image.height(), dpi)?;
    info!(
        "page: {}x{}px at {} dpi, {} lines",
        page.pixel_width,
        page.pixel_height,
        dpi,
        lines.len()
    );
    Ok(overlay::compose_page(
        page,
        image,
        lines,
        font,
        CompositorOptions {
            debug_visible_text: options.debug_visible_text,
        },
    ))
}

fn write_pages(
    loaded: &[LoadedPage],
    font: &OverlayFont,
    pdf_path: &Path,
    options: &PdfOptions,
) -> Result<()> {
    let composed = loaded
        .iter()
        .map(|page| {
            compose(&page.image, &page.lines, font, options)
                .with_context(|| format!("failed to lay out {}", page.image_path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    overlay::write_document(&composed, font, &options.title, pdf_path)
        .with_context(|| format!("failed to write PDF: {}", pdf_path.display()))?;
    Ok(())
}

fn write_text(loaded: &[LoadedPage], path: &Path) -> Result<()> {
    let text = loaded
        .iter()
        .map(|page| hocr::layout_text(&page.lines))
        .collect::<String>();
    fs::write(path, text).with_context(|| format!("failed to write text: {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct PageLayout<'a> {
    image: String,
    dpi: u32,
    lines: &'a [Line],
}

fn write_layout_json(loaded: &[LoadedPage], options: &PdfOptions, path: &Path) -> Result<()> {
    let pages = loaded
        .iter()
        .map(|page| PageLayout {
            image: page.image_path.display().to_string(),
            dpi: Page::resolve_dpi(page.image.embedded_dpi(), options.dpi),
            lines: &page.lines,
        })
        .collect::<Vec<_>>();
    let json = serde_json::to_string_pretty(&pages).with_context(|| "failed to encode layout")?;
    fs::write(path, json).with_context(|| format!("failed to write layout: {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

/// One preview per page; with several pages the file name gets a `-N` suffix.
/// An `.svg` extension keeps the vector form, anything else is rasterized to PNG.
fn write_previews(loaded: &[LoadedPage], path: &Path) -> Result<()> {
    for (idx, page) in loaded.iter().enumerate() {
        let target = numbered_path(path, idx, loaded.len());
        let uri = overlay::preview_data_uri(&page.image)?;
        let (width, height) = page.image.dimensions();
        let svg = overlay::render_preview_svg(&uri, width, height, &page.lines);
        let is_svg = target
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("svg"))
            .unwrap_or(false);
        let bytes = if is_svg {
            svg.into_bytes()
        } else {
            overlay::render_preview_png(&svg)?
        };
        fs::write(&target, bytes)
            .with_context(|| format!("failed to write preview: {}", target.display()))?;
        info!("wrote {}", target.display());
    }
    Ok(())
}

fn numbered_path(path: &Path, idx: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "preview".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, idx + 1, ext.to_string_lossy()),
        None => format!("{}-{}", stem, idx + 1),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            pages: vec![(PathBuf::from("scan.png"), PathBuf::from("scan.hocr"))],
            output: None,
            density: None,
            debug_text: false,
            font_path: None,
            font_family: None,
            preview_path: None,
            text_path: None,
            layout_json_path: None,
            settings_path: None,
        }
    }

    #[test]
    fn default_output_replaces_extension() {
        assert_eq!(
            default_output_path(Path::new("book/0001.tif")),
            PathBuf::from("book/0001.pdf")
        );
    }

    #[test]
    fn flags_override_settings() {
        let settings = Settings {
            dpi: 400,
            font_family: Some("DejaVu Sans Mono".to_string()),
            ..Settings::default()
        };
        let mut config = config();
        config.density = Some(600);
        config.debug_text = true;
        config.font_path = Some(PathBuf::from("mono.ttf"));

        let options = resolve_options(&config, &settings);
        assert_eq!(options.dpi, 600);
        assert!(options.debug_visible_text);
        assert_eq!(options.font_path, Some(PathBuf::from("mono.ttf")));
        assert_eq!(options.font_family, None);
    }

    #[test]
    fn zero_density_keeps_settings_dpi() {
        let mut config = config();
        config.density = Some(0);
        let options = resolve_options(&config, &Settings::default());
        assert_eq!(options.dpi, 300);
    }

    #[test]
    fn numbered_preview_paths() {
        let path = Path::new("out/preview.png");
        assert_eq!(numbered_path(path, 0, 1), PathBuf::from("out/preview.png"));
        assert_eq!(numbered_path(path, 1, 3), PathBuf::from("out/preview-2.png"));
    }

    #[test]
    fn missing_inputs_are_reported_first() {
        let err = ensure_inputs(&config().pages).unwrap_err();
        assert!(err.to_string().contains("image not found: scan.png"));
        assert!(ensure_inputs(&[]).is_err());
    }
}
