use std::{collections::HashMap, path::PathBuf, sync::Arc};

use crate::element::TextStyle;

/// A face chosen for a [`TextStyle`], loaded and ready to rasterize.
#[derive(Clone)]
pub struct ResolvedFont {
    pub id: fontdb::ID,
    pub font: Arc<fontdue::Font>,
    /// Italic was requested but the matched face is upright.
    pub needs_oblique: bool,
}

impl std::fmt::Debug for ResolvedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFont")
            .field("id", &self.id)
            .field("needs_oblique", &self.needs_oblique)
            .finish_non_exhaustive()
    }
}

/// Font database (`fontdb`) plus the faces loaded from it (`fontdue`).
///
/// Faces are parsed lazily the first time a style resolves to them.
pub struct FontStorage {
    font_db: fontdb::Database,
    /// Not all faces in `font_db` are necessarily loaded here.
    loaded_font: HashMap<fontdb::ID, Arc<fontdue::Font>, fxhash::FxBuildHasher>,
}

impl Default for FontStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl FontStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self {
            font_db: fontdb::Database::new(),
            loaded_font: HashMap::with_hasher(fxhash::FxBuildHasher::default()),
        }
    }
}

/// Loading fonts into fontdb.
impl FontStorage {
    /// Loads a font from binary data.
    pub fn load_font_binary(&mut self, data: impl Into<Vec<u8>>) {
        self.font_db.load_font_data(data.into());
    }

    /// Loads a font from a file path.
    pub fn load_font_file(&mut self, path: PathBuf) -> Result<(), std::io::Error> {
        self.font_db.load_font_file(path)
    }

    /// Loads all fonts from a directory.
    pub fn load_fonts_dir(&mut self, dir: PathBuf) {
        self.font_db.load_fonts_dir(dir)
    }

    /// Loads the system fonts.
    pub fn load_system_fonts(&mut self) {
        self.font_db.load_system_fonts();
    }

    pub fn is_empty(&self) -> bool {
        self.font_db.is_empty()
    }

    /// Number of known faces.
    pub fn len(&self) -> usize {
        self.font_db.len()
    }
}

/// Style resolution.
impl FontStorage {
    /// Picks a face for `style`.
    ///
    /// The requested family is tried first, then `fallback_family`, then any
    /// loaded face. `None` only when no usable face exists at all.
    pub fn resolve(&mut self, style: &TextStyle, fallback_family: &str) -> Option<ResolvedFont> {
        let requested = family_from_css(&style.font_family);
        let fallback = family_from_css(fallback_family);
        let families = [requested, fallback];
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight(style.font_weight.0),
            stretch: fontdb::Stretch::Normal,
            style: if style.is_italic {
                fontdb::Style::Italic
            } else {
                fontdb::Style::Normal
            },
        };

        let id = self.font_db.query(&query).or_else(|| {
            log::warn!(
                "No face matches family {:?}; using the first available face",
                style.font_family
            );
            self.font_db.faces().next().map(|face| face.id)
        })?;

        let upright = self
            .font_db
            .face(id)
            .is_some_and(|face| face.style == fontdb::Style::Normal);
        let font = self.font(id)?;

        Some(ResolvedFont {
            id,
            font,
            needs_oblique: style.is_italic && upright,
        })
    }

    /// Retrieves a loaded font by ID, loading it if necessary.
    pub fn font(&mut self, id: fontdb::ID) -> Option<Arc<fontdue::Font>> {
        use std::collections::hash_map::Entry;

        match self.loaded_font.entry(id) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let font_result = self.font_db.with_face_data(id, |data, index| {
                    fontdue::Font::from_bytes(
                        data,
                        fontdue::FontSettings {
                            collection_index: index,
                            scale: 40.0,
                            load_substitutions: true,
                        },
                    )
                })?;

                match font_result {
                    Ok(font) => Some(Arc::clone(entry.insert(Arc::new(font)))),
                    Err(e) => {
                        log::error!("Failed to load font (id: {:?}): {}", id, e);
                        None
                    }
                }
            }
        }
    }
}

/// Maps a CSS family name to a `fontdb` family; generic keywords become
/// generic families.
fn family_from_css(name: &str) -> fontdb::Family<'_> {
    let name = name.trim().trim_matches(|c| c == '"' || c == '\'');
    match name.to_ascii_lowercase().as_str() {
        "serif" => fontdb::Family::Serif,
        "sans-serif" => fontdb::Family::SansSerif,
        "monospace" => fontdb::Family::Monospace,
        "cursive" => fontdb::Family::Cursive,
        "fantasy" => fontdb::Family::Fantasy,
        _ => fontdb::Family::Name(name),
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_generic_families() {
        assert_eq!(family_from_css("serif"), fontdb::Family::Serif);
        assert_eq!(family_from_css(" Sans-Serif "), fontdb::Family::SansSerif);
        assert_eq!(family_from_css("monospace"), fontdb::Family::Monospace);
        assert_eq!(
            family_from_css("'Courier New'"),
            fontdb::Family::Name("Courier New")
        );
    }

    #[test]
    fn empty_storage_resolves_nothing() {
        let mut storage = FontStorage::new();
        assert!(storage.is_empty());
        assert!(storage.resolve(&TextStyle::default(), "sans-serif").is_none());
    }

    #[test]
    fn unknown_family_falls_back_to_some_face() {
        let mut storage = FontStorage::new();
        storage.load_system_fonts();
        if storage.is_empty() {
            return;
        }

        let style = TextStyle {
            font_family: "Definitely Not Installed".into(),
            ..TextStyle::default()
        };
        let resolved = storage.resolve(&style, "sans-serif").unwrap();
        assert!(!resolved.needs_oblique);

        // Second resolution reuses the loaded face.
        let again = storage.resolve(&style, "sans-serif").unwrap();
        assert!(Arc::ptr_eq(&resolved.font, &again.font));
    }
}
