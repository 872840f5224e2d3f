use super::Line;

/// Plain text of a parsed layout: one output line per recognized line,
/// words separated by single spaces, blank lines left out.
pub fn layout_text(lines: &[Line]) -> String {
    let mut out = String::new();
    for line in lines {
        let text = line
            .words
            .iter()
            .map(|word| word.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if text.trim().is_empty() {
            continue;
        }
        out.push_str(&text);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hocr::parse_layout;

    #[test]
    fn joins_words_per_line() {
        let doc = r#"<div>
<span class="ocr_line" title="bbox 0 0 100 10"><span class="ocrx_word" title="bbox 0 0 40 10">Call</span> <span class="ocrx_word" title="bbox 50 0 100 10">me</span></span>
<span class="ocr_line" title="bbox 0 20 100 30"> </span>
<span class="ocr_line" title="bbox 0 40 100 50">Ishmael.</span>
</div>"#;
        let lines = parse_layout(doc).expect("parse");
        assert_eq!(layout_text(&lines), "Call me\nIshmael.\n");
    }

    #[test]
    fn empty_layout_is_empty_text() {
        assert_eq!(layout_text(&[]), "");
    }
}
