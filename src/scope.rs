use std::path::PathBuf;
use std::sync::OnceLock;

use crate::errors::ResolutionError;
use crate::metadata::MetadataIndex;
use crate::registry::CandidateRegistry;

/// Where an index is loaded from.
#[derive(Debug, Clone)]
pub enum IndexSource {
    /// Index text supplied directly by the host.
    Inline(String),
    /// Index file on disk.
    Path(PathBuf),
}

/// Per-scope home for the candidate registry and metadata index caches.
///
/// Both indexes are loaded lazily, at most once per scope, and are
/// read-only afterwards. Concurrent first access is safe: a racing caller
/// may parse a second copy, but only one value is ever stored and all
/// callers observe it. The scope is owned by the bootstrap context and
/// passed explicitly; there is no process-wide singleton.
#[derive(Debug, Default)]
pub struct ResolutionScope {
    registry_source: Option<IndexSource>,
    metadata_source: Option<IndexSource>,
    registry: OnceLock<CandidateRegistry>,
    metadata: OnceLock<MetadataIndex>,
}

impl ResolutionScope {
    /// Create a scope with no sources. Lookups see an empty registry and an
    /// empty metadata index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the registry index source.
    pub fn with_registry_source(mut self, source: IndexSource) -> Self {
        self.registry_source = Some(source);
        self
    }

    /// Set the metadata index source. A scope without one treats every
    /// candidate as lacking precomputed metadata, which is recoverable.
    pub fn with_metadata_source(mut self, source: IndexSource) -> Self {
        self.metadata_source = Some(source);
        self
    }

    /// Seed the scope with an already-built registry.
    pub fn with_registry(self, registry: CandidateRegistry) -> Self {
        let _ = self.registry.set(registry);
        self
    }

    /// Seed the scope with an already-built metadata index.
    pub fn with_metadata(self, metadata: MetadataIndex) -> Self {
        let _ = self.metadata.set(metadata);
        self
    }

    /// Get the candidate registry, loading it on first access.
    pub fn registry(&self) -> Result<&CandidateRegistry, ResolutionError> {
        if let Some(registry) = self.registry.get() {
            return Ok(registry);
        }
        let loaded = match &self.registry_source {
            Some(IndexSource::Inline(text)) => CandidateRegistry::parse(text)?,
            Some(IndexSource::Path(path)) => CandidateRegistry::from_path(path)?,
            None => CandidateRegistry::new(),
        };
        Ok(self.registry.get_or_init(|| loaded))
    }

    /// Get the metadata index, loading it on first access.
    pub fn metadata(&self) -> Result<&MetadataIndex, ResolutionError> {
        if let Some(metadata) = self.metadata.get() {
            return Ok(metadata);
        }
        let loaded = match &self.metadata_source {
            Some(IndexSource::Inline(text)) => MetadataIndex::parse(text)?,
            Some(IndexSource::Path(path)) => MetadataIndex::from_path(path)?,
            None => MetadataIndex::empty(),
        };
        Ok(self.metadata.get_or_init(|| loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DEFAULT_MARKER;

    #[test]
    fn loads_inline_sources_once() {
        let scope = ResolutionScope::new()
            .with_registry_source(IndexSource::Inline("autoconfigure=A,B".to_string()))
            .with_metadata_source(IndexSource::Inline("A.Order=1".to_string()));

        let first = scope.registry().unwrap() as *const CandidateRegistry;
        let second = scope.registry().unwrap() as *const CandidateRegistry;
        assert_eq!(first, second);

        assert_eq!(
            scope.registry().unwrap().candidates(DEFAULT_MARKER).unwrap(),
            &["A", "B"]
        );
        assert!(scope.metadata().unwrap().was_precomputed("A"));
    }

    #[test]
    fn missing_metadata_source_yields_empty_index() {
        let scope = ResolutionScope::new();
        assert!(scope.metadata().unwrap().is_empty());
    }

    #[test]
    fn seeded_values_bypass_loading() {
        let registry = CandidateRegistry::new().with_registered("web", ["A"]);
        let scope = ResolutionScope::new()
            .with_registry(registry)
            // The source is ignored once a value is seeded.
            .with_registry_source(IndexSource::Inline("web=Z".to_string()));

        assert_eq!(scope.registry().unwrap().candidates("web").unwrap(), &["A"]);
    }

    #[test]
    fn parse_errors_propagate() {
        let scope = ResolutionScope::new()
            .with_registry_source(IndexSource::Inline("bad line".to_string()));
        assert!(scope.registry().is_err());
    }
}
