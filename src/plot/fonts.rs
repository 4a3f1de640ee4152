//! TrueType font registration for chart text.
//!
//! Plotters is built without its system font backend, so text only renders once
//! a font has been registered for the `sans-serif` family. DejaVu Sans ships with
//! the crate and is used unless a font file is configured (`--font`).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use plotters::style::{FontStyle, register_font};

use crate::error::AppError;

/// Family name every chart text style uses.
pub const FONT_FAMILY: &str = "sans-serif";

static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Where the currently registered chart font came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    Bundled,
    File(PathBuf),
}

static REGISTERED: Mutex<Option<FontSource>> = Mutex::new(None);

/// Make sure a font is registered for chart text and report which one.
///
/// An explicit path is (re)registered whenever it differs from the current font.
/// An unreadable or invalid explicit font is logged and the previous font, or the
/// bundled one, is kept.
pub fn ensure_font(explicit: Option<&Path>) -> Result<FontSource, AppError> {
    let mut current = REGISTERED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(path) = explicit {
        let wanted = FontSource::File(path.to_path_buf());
        if current.as_ref() == Some(&wanted) {
            return Ok(wanted);
        }
        match register_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "registered chart font");
                *current = Some(wanted.clone());
                return Ok(wanted);
            }
            Err(reason) => tracing::warn!(path = %path.display(), reason, "chart font not usable; using default"),
        }
    }

    if let Some(source) = current.as_ref() {
        return Ok(source.clone());
    }
    register_font(FONT_FAMILY, FontStyle::Normal, BUNDLED_FONT)
        .map_err(|_| AppError::io("Failed to register the bundled chart font."))?;
    *current = Some(FontSource::Bundled);
    Ok(FontSource::Bundled)
}

fn register_file(path: &Path) -> Result<(), &'static str> {
    let bytes = std::fs::read(path).map_err(|_| "unreadable")?;
    ab_glyph::FontRef::try_from_slice(&bytes).map_err(|_| "not a TrueType/OpenType font")?;
    // Registered fonts must live for the rest of the process.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FONT_FAMILY, FontStyle::Normal, bytes).map_err(|_| "rejected by the font renderer")
}
