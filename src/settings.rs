use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub dpi: u32,
    pub debug_visible_text: bool,
    pub title: String,
    pub font_path: Option<String>,
    pub font_family: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dpi: 300,
            debug_visible_text: false,
            title: "hocr-pdf-rust".to_string(),
            font_path: None,
            font_family: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    pdf: Option<PdfSettings>,
    font: Option<FontSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct PdfSettings {
    dpi: Option<u32>,
    debug_text: Option<bool>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    path: Option<String>,
    family: Option<String>,
}

/// Loads the built-in defaults, then `settings.toml` / `settings.local.toml`
/// from the working directory and from `~/.hocr-pdf-rust`, then `extra_path`.
/// Later files override earlier ones.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    load_settings_from(&ordered_paths)
}

fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse built-in settings")?;
    settings.merge(defaults);

    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(pdf) = incoming.pdf {
            if let Some(dpi) = pdf.dpi {
                if dpi > 0 {
                    self.dpi = dpi;
                }
            }
            if let Some(debug_text) = pdf.debug_text {
                self.debug_visible_text = debug_text;
            }
            if let Some(title) = pdf.title {
                if !title.trim().is_empty() {
                    self.title = title;
                }
            }
        }
        if let Some(font) = incoming.font {
            if let Some(path) = font.path {
                if !path.trim().is_empty() {
                    self.font_path = Some(path);
                }
            }
            if let Some(family) = font.family {
                if !family.trim().is_empty() {
                    self.font_family = Some(family);
                }
            }
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".hocr-pdf-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn built_in_defaults() {
        let settings = load_settings_from(&[]).expect("settings");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path().join("settings.toml");
        let local = dir.path().join("settings.local.toml");
        fs::write(&base, "[pdf]\ndpi = 400\ntitle = \"Book\"\n[font]\nfamily = \"DejaVu Sans Mono\"\n")
            .expect("write base");
        fs::write(&local, "[pdf]\ndpi = 600\ndebug_text = true\n").expect("write local");

        let settings = load_settings_from(&[base, local]).expect("settings");
        assert_eq!(settings.dpi, 600);
        assert!(settings.debug_visible_text);
        assert_eq!(settings.title, "Book");
        assert_eq!(settings.font_family.as_deref(), Some("DejaVu Sans Mono"));
        assert_eq!(settings.font_path, None);
    }

    #[test]
    fn unusable_values_are_ignored() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[pdf]\ndpi = 0\ntitle = \"  \"\n[font]\npath = \"\"\n").expect("write");

        let settings = load_settings_from(&[path]).expect("settings");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn missing_layers_are_skipped() {
        let dir = tempdir().expect("tempdir");
        let settings = load_settings_from(&[dir.path().join("absent.toml")]).expect("settings");
        assert_eq!(settings.dpi, 300);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[pdf\ndpi = ").expect("write");
        let err = load_settings_from(&[path]).unwrap_err();
        assert!(err.to_string().contains("failed to parse settings"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/settings.toml"))).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }
}
