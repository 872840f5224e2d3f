use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::Face;
use ttf_parser::name_id;
use unicode_normalization::UnicodeNormalization;
use usvg::fontdb;

/// Advance of every Courier glyph, in 1/1000 em.
const COURIER_ADVANCE: f64 = 600.0;

/// Metrics of a TrueType/OpenType face used as the overlay font.
#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    family: Option<String>,
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics")
            .field("family", &self.family)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    fn advance_units(&self, text: &str) -> Option<u32> {
        let face = self.face()?;
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            if ch == ' ' {
                advance = advance.saturating_add(self.space_advance as u32);
                continue;
            }
            let glyph_advance = face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .unwrap_or(self.space_advance);
            advance = advance.saturating_add(glyph_advance as u32);
        }
        Some(advance)
    }
}

/// The substitute font the invisible text is set in. Its glyphs never match
/// the scan; only its advance widths matter, for horizontal scaling.
#[derive(Debug, Clone, Default)]
pub enum OverlayFont {
    /// The PDF base-14 Courier: fixed pitch, nothing to embed.
    #[default]
    Courier,
    External(FontMetrics),
}

impl OverlayFont {
    /// The text as it ends up in the content stream: compatibility forms
    /// such as ligatures expanded, then every character the font cannot
    /// encode dropped. Courier is limited to WinAnsi, an embedded face to
    /// the characters its cmap covers.
    pub fn writable_text(&self, text: &str) -> String {
        let normalized = text.nfkc();
        match self {
            OverlayFont::Courier => normalized
                .filter(|ch| {
                    let mut buf = [0; 4];
                    let encoded = printpdf::lopdf::Document::encode_text(
                        Some("WinAnsiEncoding"),
                        ch.encode_utf8(&mut buf),
                    );
                    !encoded.is_empty()
                })
                .collect(),
            OverlayFont::External(metrics) => match metrics.face() {
                Some(face) => normalized
                    .filter(|ch| face.glyph_index(*ch).is_some())
                    .collect(),
                None => String::new(),
            },
        }
    }

    /// Natural advance width of `text` at `font_size`, in the same unit as
    /// `font_size`.
    pub fn measure(&self, text: &str, font_size: f64) -> f64 {
        match self {
            OverlayFont::Courier => {
                let glyphs = text.chars().filter(|ch| *ch != '\n').count() as f64;
                glyphs * COURIER_ADVANCE / 1000.0 * font_size
            }
            OverlayFont::External(metrics) => match metrics.advance_units(text) {
                Some(advance) => {
                    let units = metrics.units_per_em.max(1) as f64;
                    advance as f64 * font_size / units
                }
                None => 0.0,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OverlayFont::Courier => "Courier",
            OverlayFont::External(metrics) => metrics.family().unwrap_or("external"),
        }
    }
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(&data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// Picks the overlay font: an explicit font file first, then a system family
/// looked up through fontdb, then built-in Courier.
pub fn resolve_overlay_font(
    font_path: Option<&Path>,
    font_family: Option<&str>,
) -> Result<OverlayFont> {
    if let Some(path) = font_path {
        return Ok(OverlayFont::External(load_font_metrics(path)?));
    }
    let Some(family) = font_family else {
        return Ok(OverlayFont::Courier);
    };
    if family.eq_ignore_ascii_case("courier") {
        return Ok(OverlayFont::Courier);
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let metrics = load_font_metrics_from_family(&db, family)?;
    Ok(OverlayFont::External(metrics))
}

/// printpdf embeds the first face of a collection, so that is the face
/// measured.
fn load_font_metrics_from_data(data: &[u8]) -> Result<FontMetrics> {
    let face = Face::parse(data, 0).map_err(|err| anyhow!("failed to parse font data: {}", err))?;
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    Ok(FontMetrics {
        data: Arc::new(data.to_vec()),
        units_per_em,
        space_advance,
        family: extract_family_name(&face),
    })
}

fn load_font_metrics_from_family(db: &fontdb::Database, family: &str) -> Result<FontMetrics> {
    let families = if family.eq_ignore_ascii_case("monospace") {
        vec![fontdb::Family::Monospace]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    load_font_metrics_from_db(db, id).with_context(|| format!("failed to load font: {}", family))
}

pub(crate) fn load_font_metrics_from_db(db: &fontdb::Database, id: fontdb::ID) -> Result<FontMetrics> {
    let (data, index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("font data unavailable"))?;
    if index != 0 {
        return Err(anyhow!(
            "face {} of a font collection cannot be embedded",
            index
        ));
    }
    load_font_metrics_from_data(&data)
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn courier_is_fixed_pitch() {
        let font = OverlayFont::Courier;
        assert!((font.measure("Hello", 12.0) - 36.0).abs() < 1e-9);
        assert!((font.measure("iiiii", 12.0) - font.measure("WWWWW", 12.0)).abs() < 1e-9);
    }

    #[test]
    fn courier_counts_chars_not_bytes() {
        let font = OverlayFont::Courier;
        assert!((font.measure("\u{00e9}t\u{00e9}", 10.0) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn zero_size_measures_zero() {
        assert_eq!(OverlayFont::Courier.measure("Hello", 0.0), 0.0);
    }

    #[test]
    fn defaults_to_courier() {
        let font = resolve_overlay_font(None, None).expect("font");
        assert_eq!(font.name(), "Courier");
        let font = resolve_overlay_font(None, Some("COURIER")).expect("font");
        assert!(matches!(font, OverlayFont::Courier));
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let err = resolve_overlay_font(Some(Path::new("/nonexistent/font.ttf")), None).unwrap_err();
        assert!(err.to_string().contains("failed to read font"));
    }

    #[test]
    fn garbage_font_data_is_an_error() {
        assert!(load_font_metrics_from_data(b"not a font").is_err());
    }

    #[test]
    fn ligatures_are_expanded_for_courier() {
        let font = OverlayFont::Courier;
        assert_eq!(font.writable_text("\u{fb01}nd"), "find");
        assert_eq!(font.writable_text("e\u{fb00}ort"), "effort");
        assert_eq!(font.writable_text("caf\u{00e9}"), "caf\u{00e9}");
    }

    #[test]
    fn courier_drops_what_win_ansi_cannot_encode() {
        let font = OverlayFont::Courier;
        assert_eq!(font.writable_text("\u{6f22}a"), "a");
        assert_eq!(font.writable_text("\u{6f22}\u{5b57}"), "");
    }

    fn system_fonts() -> fontdb::Database {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        db
    }

    #[test]
    fn system_face_keeps_covered_text() {
        let db = system_fonts();
        let found = db
            .faces()
            .filter(|face| face.index == 0)
            .filter_map(|face| load_font_metrics_from_db(&db, face.id).ok())
            .find(|metrics| OverlayFont::External(metrics.clone()).writable_text("Hello") == "Hello");
        let Some(metrics) = found else {
            return;
        };
        let font = OverlayFont::External(metrics);
        assert!(font.measure("Hello", 12.0) > 0.0);
        assert_eq!(font.writable_text("\u{fb01}ve"), font.writable_text("five"));
    }

    #[test]
    fn later_collection_faces_are_rejected() {
        let db = system_fonts();
        let Some(face) = db.faces().find(|face| face.index != 0) else {
            return;
        };
        let err = load_font_metrics_from_db(&db, face.id).unwrap_err();
        assert!(err.to_string().contains("font collection"));
    }
}
