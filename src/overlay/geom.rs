use crate::error::DegenerateMeasurement;
use crate::hocr::{Baseline, Line, Word};

use super::font::OverlayFont;
use super::{Page, TextRun};

/// Pixel length at `dpi` to PDF points.
pub fn to_points(pixels: f64, dpi: u32) -> f64 {
    pixels * 72.0 / dpi as f64
}

/// Rotation of a line's text, derived from its baseline slope. Shared by
/// every word of the line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub cos: f64,
    pub sin: f64,
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation { cos: 1.0, sin: 0.0 };

    pub fn from_baseline(baseline: &Baseline) -> Self {
        let angle = baseline.slope.atan();
        Rotation {
            cos: angle.cos(),
            sin: angle.sin(),
        }
    }
}

/// Pixel-space y where the line's baseline passes under `word`: the word's
/// vertical midpoint, relative to the line top, projected through the slope
/// and added to the line bottom.
pub fn baseline_y(line: &Line, word: &Word) -> f64 {
    line.baseline.slope * (word.bbox.center_y() - line.bbox.y0) + line.bbox.y1
}

/// Places `word` on `page`: origin in points with the y axis flipped, font
/// size from the word height, and the horizontal scale that stretches the
/// substitute font's advance width to the word box width. The width is
/// measured on the text the font can actually write.
pub fn text_run(
    page: &Page,
    line: &Line,
    rotation: Rotation,
    word: &Word,
    font: &OverlayFont,
) -> Result<TextRun, DegenerateMeasurement> {
    let font_size = page.to_points(word.bbox.height());
    let text = font.writable_text(&word.text);
    let measured_width = font.measure(&text, font_size);
    if measured_width.is_nan() || measured_width <= 0.0 {
        return Err(DegenerateMeasurement);
    }
    let box_width = page.to_points(word.bbox.width());
    let baseline = baseline_y(line, word);

    Ok(TextRun {
        origin: (
            page.to_points(word.bbox.x0),
            page.point_height - page.to_points(baseline),
        ),
        rotation,
        font_size,
        horizontal_scale: 100.0 * box_width / measured_width,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hocr::BBox;

    const EPS: f64 = 1e-9;

    fn bbox(x0: f64, y0: f64, x1: f64, y1: f64) -> BBox {
        BBox { x0, y0, x1, y1 }
    }

    fn letter_page() -> Page {
        Page::new(2550, 3300, 300).expect("page")
    }

    fn hello_line(slope: f64) -> Line {
        Line {
            bbox: bbox(100.0, 200.0, 2400.0, 260.0),
            baseline: Baseline {
                slope,
                intercept: 0.0,
            },
            words: vec![Word {
                bbox: bbox(100.0, 205.0, 300.0, 255.0),
                text: "Hello".to_string(),
            }],
        }
    }

    #[test]
    fn converts_pixels_to_points() {
        assert_eq!(to_points(300.0, 300), 72.0);
        assert_eq!(to_points(2550.0, 300), 612.0);
        assert_eq!(to_points(150.0, 150), 72.0);
    }

    #[test]
    fn flat_baseline_is_identity_rotation() {
        let rotation = Rotation::from_baseline(&Baseline::default());
        assert_eq!(rotation, Rotation::IDENTITY);
    }

    #[test]
    fn flat_baseline_sits_on_line_bottom() {
        let mut line = hello_line(0.0);
        assert_eq!(baseline_y(&line, &line.words[0]), 260.0);
        line.words[0].bbox = bbox(400.0, 201.0, 500.0, 220.0);
        assert_eq!(baseline_y(&line, &line.words[0]), 260.0);
    }

    #[test]
    fn sloped_baseline_follows_word_midpoint() {
        let line = hello_line(0.1);
        // midpoint 230, 30 below the line top
        assert!((baseline_y(&line, &line.words[0]) - 263.0).abs() < EPS);
        let rotation = Rotation::from_baseline(&line.baseline);
        let angle = 0.1f64.atan();
        assert!((rotation.cos - angle.cos()).abs() < EPS);
        assert!((rotation.sin - angle.sin()).abs() < EPS);
        assert!((rotation.cos.powi(2) + rotation.sin.powi(2) - 1.0).abs() < EPS);
    }

    #[test]
    fn hello_world_letter_page() {
        let page = letter_page();
        let line = hello_line(0.0);
        let font = OverlayFont::Courier;
        let run = text_run(
            &page,
            &line,
            Rotation::from_baseline(&line.baseline),
            &line.words[0],
            &font,
        )
        .expect("run");

        assert!((run.origin.0 - 24.0).abs() < EPS);
        assert!((run.origin.1 - 729.6).abs() < EPS);
        assert_eq!(run.rotation, Rotation::IDENTITY);
        assert!((run.font_size - 12.0).abs() < EPS);
        let measured = font.measure("Hello", 12.0);
        assert!((run.horizontal_scale - 100.0 * 48.0 / measured).abs() < EPS);
        assert_eq!(run.text, "Hello");
    }

    #[test]
    fn scale_reproduces_box_width() {
        let page = Page::new(1000, 1000, 200).expect("page");
        let font = OverlayFont::Courier;
        for (x0, x1, text) in [(10.0, 11.0, "wide text here"), (0.0, 900.0, "x"), (5.0, 77.0, "mid")] {
            let line = Line {
                bbox: bbox(0.0, 0.0, 1000.0, 40.0),
                baseline: Baseline::default(),
                words: Vec::new(),
            };
            let word = Word {
                bbox: bbox(x0, 3.0, x1, 33.0),
                text: text.to_string(),
            };
            let run = text_run(&page, &line, Rotation::IDENTITY, &word, &font).expect("run");
            let measured = font.measure(text, run.font_size);
            assert!((run.horizontal_scale * measured / 100.0 - to_points(x1 - x0, 200)).abs() < 1e-9);
        }
    }

    #[test]
    fn ligature_is_measured_as_written() {
        let page = letter_page();
        let line = hello_line(0.0);
        let word = Word {
            bbox: bbox(400.0, 205.0, 600.0, 255.0),
            text: "\u{fb01}nd".to_string(),
        };
        let font = OverlayFont::Courier;
        let run = text_run(&page, &line, Rotation::IDENTITY, &word, &font).expect("run");
        assert_eq!(run.text, "find");
        let written = font.measure(&run.text, run.font_size);
        assert!((run.horizontal_scale * written / 100.0 - 48.0).abs() < EPS);
        assert!((run.horizontal_scale - 100.0 * 48.0 / 28.8).abs() < EPS);
    }

    #[test]
    fn unencodable_word_is_degenerate() {
        let page = letter_page();
        let line = hello_line(0.0);
        let word = Word {
            bbox: bbox(100.0, 205.0, 300.0, 255.0),
            text: "\u{6f22}\u{5b57}".to_string(),
        };
        let result = text_run(&page, &line, Rotation::IDENTITY, &word, &OverlayFont::Courier);
        assert_eq!(result.unwrap_err(), DegenerateMeasurement);
    }

    #[test]
    fn zero_height_word_is_degenerate() {
        let page = letter_page();
        let line = hello_line(0.0);
        let word = Word {
            bbox: bbox(100.0, 210.0, 300.0, 210.0),
            text: "flat".to_string(),
        };
        let result = text_run(&page, &line, Rotation::IDENTITY, &word, &OverlayFont::Courier);
        assert_eq!(result.unwrap_err(), DegenerateMeasurement);
    }

    #[test]
    fn empty_text_is_degenerate() {
        let page = letter_page();
        let line = hello_line(0.0);
        let word = Word {
            bbox: bbox(100.0, 205.0, 300.0, 255.0),
            text: String::new(),
        };
        assert!(text_run(&page, &line, Rotation::IDENTITY, &word, &OverlayFont::Courier).is_err());
    }
}
