//! Resource locators describing where a capability implementation lives.

use super::CapabilityDomainError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Immutable description of how to find a capability implementation.
///
/// The import path is a dotted module path such as `walkers.quiz_master`.
/// Its last segment is the bare module name used when searching the module
/// search path. The optional source path points at a source artifact that
/// can be compiled at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLocator {
    import_path: String,
    source_path: Option<Utf8PathBuf>,
}

impl ResourceLocator {
    /// Creates a locator with an import path and no source artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityDomainError`] when the import path is empty or has
    /// an empty segment.
    pub fn new(import_path: impl Into<String>) -> Result<Self, CapabilityDomainError> {
        let normalized = import_path.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(CapabilityDomainError::EmptyImportPath);
        }

        if normalized.split('.').any(str::is_empty) {
            return Err(CapabilityDomainError::InvalidImportPath(normalized));
        }

        Ok(Self {
            import_path: normalized,
            source_path: None,
        })
    }

    /// Sets the filesystem path of the source artifact.
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Returns the dotted import path.
    #[must_use]
    pub fn import_path(&self) -> &str {
        &self.import_path
    }

    /// Returns the bare module name (the last import path segment).
    #[must_use]
    pub fn bare_name(&self) -> &str {
        self.import_path
            .rsplit('.')
            .next()
            .unwrap_or(self.import_path.as_str())
    }

    /// Returns the source artifact path, when one was registered.
    #[must_use]
    pub fn source_path(&self) -> Option<&Utf8Path> {
        self.source_path.as_deref()
    }

    /// Returns the directory containing the source artifact.
    #[must_use]
    pub fn source_dir(&self) -> Option<&Utf8Path> {
        self.source_path.as_deref().map(|path| {
            path.parent()
                .filter(|parent| !parent.as_str().is_empty())
                .unwrap_or_else(|| Utf8Path::new("."))
        })
    }
}
