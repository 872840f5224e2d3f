use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "hocr-pdf-rust",
    version,
    about = "Lay hOCR text invisibly over page images to build a searchable PDF"
)]
struct Cli {
    /// Page image (PNG, JPEG, TIFF, ...)
    #[arg(requires = "hocr")]
    image: Option<PathBuf>,

    /// hOCR file for IMAGE
    hocr: Option<PathBuf>,

    /// Additional page as an IMAGE HOCR pair; may repeat
    #[arg(long = "page", num_args = 2, value_names = ["IMAGE", "HOCR"], action = ArgAction::Append)]
    page: Vec<PathBuf>,

    /// Output PDF (default: first image with a .pdf extension)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Resolution used when the image does not report one (default: 300)
    #[arg(long = "density")]
    density: Option<u32>,

    /// Draw the text visibly to check alignment
    #[arg(long = "debug-text")]
    debug_text: bool,

    /// TrueType/OpenType font for the overlay text (default: Courier)
    #[arg(long = "font")]
    font: Option<PathBuf>,

    /// System font family for the overlay text ("monospace" for the default mono face)
    #[arg(long = "font-family")]
    font_family: Option<String>,

    /// Write an alignment preview (.svg, otherwise PNG)
    #[arg(long = "preview")]
    preview: Option<PathBuf>,

    /// Write the recognized text as plain text
    #[arg(long = "text")]
    text: Option<PathBuf>,

    /// Write the parsed lines and words as JSON
    #[arg(long = "layout-json")]
    layout_json: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    hocr_pdf_rust::logging::init(cli.verbose)?;

    let mut pages = Vec::new();
    if let (Some(image), Some(hocr)) = (cli.image, cli.hocr) {
        pages.push((image, hocr));
    }
    for pair in cli.page.chunks_exact(2) {
        pages.push((pair[0].clone(), pair[1].clone()));
    }
    if pages.is_empty() {
        return Err(anyhow!("give IMAGE and HOCR, or at least one --page IMAGE HOCR"));
    }

    let config = hocr_pdf_rust::Config {
        pages,
        output: cli.output,
        density: cli.density,
        debug_text: cli.debug_text,
        font_path: cli.font,
        font_family: cli.font_family,
        preview_path: cli.preview,
        text_path: cli.text,
        layout_json_path: cli.layout_json,
        settings_path: cli.read_settings,
    };
    let output = hocr_pdf_rust::run(config)?;
    println!("{}", output.display());
    Ok(())
}
