//! Extension to extractor registry.
//!
//! Built once at startup from the built-in table, optionally extended with
//! `EXT=EXTRACTOR` mappings from the command line. Extensions are stored
//! lower-cased with their leading dot.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::RegistryError;

use super::{CziExtractor, MetadataExtractor, TiffExtractor};

/// Lower-cased, dot-prefixed extension of a path (`.tif`), if it has one.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

/// Maps file extensions to extractors.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: BTreeMap<String, Arc<dyn MetadataExtractor>>,
}

impl ExtractorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table: TIFF family and CZI.
    pub fn builtin() -> Self {
        let tiff: Arc<dyn MetadataExtractor> = Arc::new(TiffExtractor::new());
        let czi: Arc<dyn MetadataExtractor> = Arc::new(CziExtractor::new());

        let mut extractors = BTreeMap::new();
        for ext in [".tiff", ".tif", ".qptiff"] {
            extractors.insert(ext.to_string(), Arc::clone(&tiff));
        }
        extractors.insert(".czi".to_string(), czi);

        Self { extractors }
    }

    fn normalize_extension(extension: &str) -> Result<String, RegistryError> {
        if !extension.starts_with('.') || extension.len() < 2 {
            return Err(RegistryError::InvalidExtension(extension.to_string()));
        }
        Ok(extension.to_lowercase())
    }

    /// Register `extractor` for `extension`, replacing any existing entry.
    pub fn register(
        &mut self,
        extension: &str,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<(), RegistryError> {
        let extension = Self::normalize_extension(extension)?;
        if let Some(previous) = self.extractors.get(&extension) {
            warn!(
                "Extractor '{}' overrides '{}' for extension '{}'",
                extractor.name(),
                previous.name(),
                extension
            );
        }
        debug!("Registered extractor '{}' for '{}'", extractor.name(), extension);
        self.extractors.insert(extension, extractor);
        Ok(())
    }

    /// Point `extension` at the already-registered extractor called `name`.
    pub fn alias(&mut self, extension: &str, name: &str) -> Result<(), RegistryError> {
        let extractor = self
            .extractors
            .values()
            .find(|e| e.name() == name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownExtractor {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        self.register(extension, extractor)
    }

    /// Apply an `EXT=EXTRACTOR` mapping; the leading dot on `EXT` is optional.
    pub fn apply_mapping(&mut self, mapping: &str) -> Result<(), RegistryError> {
        let (extension, name) = mapping
            .split_once('=')
            .map(|(e, n)| (e.trim(), n.trim()))
            .filter(|(e, n)| !e.is_empty() && !n.is_empty())
            .ok_or_else(|| RegistryError::InvalidMapping(mapping.to_string()))?;

        if extension.starts_with('.') {
            self.alias(extension, name)
        } else {
            self.alias(&format!(".{}", extension), name)
        }
    }

    /// Extractor for an extension, case-insensitive.
    pub fn get(&self, extension: &str) -> Option<Arc<dyn MetadataExtractor>> {
        self.extractors.get(&extension.to_lowercase()).cloned()
    }

    /// Extractor for a path, chosen by its extension.
    pub fn get_for_path(&self, path: &Path) -> Option<Arc<dyn MetadataExtractor>> {
        file_extension(path).and_then(|ext| self.get(&ext))
    }

    /// Whether a path has a registered extension.
    pub fn supports(&self, path: &Path) -> bool {
        self.get_for_path(path).is_some()
    }

    /// Distinct extractor names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .extractors
            .values()
            .map(|e| e.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// `(extension, extractor name)` pairs sorted by extension.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.extractors
            .iter()
            .map(|(ext, e)| (ext.clone(), e.name().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.describe()).finish()
    }
}
