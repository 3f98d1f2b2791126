use std::collections::HashMap;
use std::path::Path;

use crate::errors::ResolutionError;
use crate::flatindex;

/// Marker under which candidates are registered when the host does not use
/// its own capability tags.
pub const DEFAULT_MARKER: &str = "autoconfigure";

/// Registry of candidate configuration units, keyed by marker capability.
///
/// The registry is a static registration table: either parsed from a flat
/// index file (`<marker>=<id>,<id>,...`, repeated keys append) shipped with
/// the application, or declared programmatically. Lookup order is
/// registration order, which makes the list deterministic per scope.
#[derive(Debug, Clone, Default)]
pub struct CandidateRegistry {
    entries: HashMap<String, Vec<String>>,
}

impl CandidateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register candidates under a marker, appending to any existing list.
    pub fn register<I, S>(&mut self, marker: impl Into<String>, candidates: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.entries.entry(marker.into()).or_default();
        list.extend(candidates.into_iter().map(Into::into));
    }

    /// Register candidates under a marker (builder style).
    pub fn with_registered<I, S>(mut self, marker: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(marker, candidates);
        self
    }

    /// Parse a registry from index text.
    pub fn parse(text: &str) -> Result<Self, ResolutionError> {
        Self::parse_named(text, "<inline>")
    }

    /// Load a registry from an index file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ResolutionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse_named(&text, &path.display().to_string())
    }

    fn parse_named(text: &str, source: &str) -> Result<Self, ResolutionError> {
        let mut registry = Self::new();
        for (marker, value) in flatindex::parse(text, source)? {
            registry.register(marker, flatindex::split_values(&value));
        }
        tracing::debug!(
            markers = registry.entries.len(),
            source,
            "loaded candidate registration index"
        );
        Ok(registry)
    }

    /// List the candidates registered for a marker, in registration order.
    ///
    /// An unknown marker or an empty candidate list is a hard
    /// misconfiguration: auto-configuration cannot proceed without its
    /// registration index, so this is never swallowed.
    pub fn candidates(&self, marker: &str) -> Result<&[String], ResolutionError> {
        match self.entries.get(marker) {
            Some(list) if !list.is_empty() => Ok(list),
            _ => Err(ResolutionError::RegistryEmpty {
                marker: marker.to_string(),
            }),
        }
    }

    /// Check whether any candidates are registered for a marker.
    pub fn has_marker(&self, marker: &str) -> bool {
        self.entries.get(marker).is_some_and(|list| !list.is_empty())
    }

    /// Number of registered markers.
    pub fn marker_count(&self) -> usize {
        self.entries.len()
    }
}
