mod text;
mod title;
mod tree;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{OverlayError, Result};

pub use text::layout_text;
pub(crate) use title::TitleProps;
use tree::{LayoutTree, NodeId};

const LINE_CLASS: &str = "ocr_line";
const WORD_CLASS: &str = "ocrx_word";

/// Pixel-space bounding box, `(x0, y0)` top-left and `(x1, y1)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Baseline {
    pub slope: f64,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    pub bbox: BBox,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub bbox: BBox,
    pub baseline: Baseline,
    pub words: Vec<Word>,
}

/// Parses an hOCR document into lines and their words, in document order.
///
/// A line without any word elements becomes a single word built from the
/// line's own box and text. Words whose text is empty are dropped.
pub fn parse_layout(document: &str) -> Result<Vec<Line>> {
    let tree = LayoutTree::parse(document)?;
    let mut lines = Vec::new();
    for line_id in tree.find_class(LayoutTree::ROOT, LINE_CLASS) {
        lines.push(parse_line(&tree, line_id)?);
    }
    debug!(
        "hocr: parsed {} lines, {} words",
        lines.len(),
        lines.iter().map(|line| line.words.len()).sum::<usize>()
    );
    Ok(lines)
}

fn parse_line(tree: &LayoutTree, line_id: NodeId) -> Result<Line> {
    let props = TitleProps::parse(tree.title(line_id).unwrap_or_default());
    let bbox = props.bbox()?.ok_or_else(|| {
        OverlayError::layout(format!("line {} has no bbox", tree.label(line_id)))
    })?;
    let baseline = match props.baseline() {
        Some(baseline) => baseline,
        None => {
            if props.get("baseline").is_some() {
                warn!(
                    "hocr: ignoring malformed baseline on line {}",
                    tree.label(line_id)
                );
            }
            Baseline::default()
        }
    };

    let word_ids = tree.find_class(line_id, WORD_CLASS);
    let mut words = Vec::with_capacity(word_ids.len().max(1));
    if word_ids.is_empty() {
        let text = tree.text(line_id);
        if !text.is_empty() {
            words.push(Word { bbox, text });
        }
    } else {
        for word_id in word_ids {
            if let Some(word) = parse_word(tree, word_id)? {
                words.push(word);
            }
        }
    }

    Ok(Line {
        bbox,
        baseline,
        words,
    })
}

fn parse_word(tree: &LayoutTree, word_id: NodeId) -> Result<Option<Word>> {
    let text = tree.text(word_id);
    if text.is_empty() {
        return Ok(None);
    }
    let props = TitleProps::parse(tree.title(word_id).unwrap_or_default());
    let bbox = props.bbox()?.ok_or_else(|| {
        OverlayError::layout(format!(
            "word {} ('{}') has no bbox",
            tree.label(word_id),
            text
        ))
    })?;
    Ok(Some(Word { bbox, text }))
}
