use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::errors::ResolutionError;
use crate::flatindex;

/// Ordering hint attribute: `<id>.Order=<i32>`.
pub const ORDER_ATTRIBUTE: &str = "Order";
/// Predecessor hint attribute: `<id>.Before=<id>,...`.
pub const BEFORE_ATTRIBUTE: &str = "Before";
/// Successor hint attribute: `<id>.After=<id>,...`.
pub const AFTER_ATTRIBUTE: &str = "After";
/// Coarse applicability attribute: `<id>.Requires=<name>,...`.
pub const REQUIRES_ATTRIBUTE: &str = "Requires";

/// Default ordering value when no hint is declared. Lower sorts first.
pub const DEFAULT_ORDER: i32 = 0;

const KNOWN_ATTRIBUTES: [&str; 4] = [
    ORDER_ATTRIBUTE,
    BEFORE_ATTRIBUTE,
    AFTER_ATTRIBUTE,
    REQUIRES_ATTRIBUTE,
];

/// Lightweight facts about one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateMetadata {
    pub order: i32,
    pub before: BTreeSet<String>,
    pub after: BTreeSet<String>,
    pub requires: BTreeSet<String>,
    /// True when the facts came from the precomputed index rather than from
    /// inspecting the candidate's own declarations.
    pub was_precomputed: bool,
}

/// Precomputed index of candidate metadata, built at module build time and
/// loaded in one bulk read.
///
/// Format is the flat index: `<id>.<Attribute>=<comma-separated values>`. A
/// candidate with any entry in the index (including a bare `<id>=` marker
/// line) counts as precomputed; absent candidates resolve to default
/// metadata and are inspected on demand via a [`DeclarationSource`].
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    properties: HashMap<String, String>,
    precomputed: HashSet<String>,
}

impl MetadataIndex {
    /// Create an index with no entries. Every lookup yields defaults.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse an index from its text form.
    pub fn parse(text: &str) -> Result<Self, ResolutionError> {
        Self::parse_named(text, "<inline>")
    }

    /// Load an index file from disk in a single bulk read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ResolutionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse_named(&text, &path.display().to_string())
    }

    fn parse_named(text: &str, source: &str) -> Result<Self, ResolutionError> {
        let mut index = Self::default();
        for (key, value) in flatindex::parse(text, source)? {
            index.precomputed.insert(candidate_of(&key));
            index.properties.insert(key, value);
        }
        tracing::debug!(entries = index.properties.len(), source, "loaded metadata index");
        Ok(index)
    }

    /// Check whether the candidate has precomputed facts in this index.
    pub fn was_precomputed(&self, id: &str) -> bool {
        self.precomputed.contains(id)
    }

    /// Raw attribute lookup.
    pub fn get(&self, id: &str, attribute: &str) -> Option<&str> {
        self.properties
            .get(&format!("{id}.{attribute}"))
            .map(String::as_str)
    }

    /// Integer attribute lookup, falling back to `default` when absent or
    /// unparsable.
    pub fn get_i32(&self, id: &str, attribute: &str, default: i32) -> i32 {
        self.get(id, attribute)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Set-valued attribute lookup. Absent attributes yield an empty set.
    pub fn get_set(&self, id: &str, attribute: &str) -> BTreeSet<String> {
        self.get(id, attribute)
            .map(|value| flatindex::split_values(value).collect())
            .unwrap_or_default()
    }

    /// Resolve the full metadata record for a candidate. Never fails:
    /// candidates absent from the index yield default metadata with
    /// `was_precomputed == false`.
    pub fn candidate(&self, id: &str) -> CandidateMetadata {
        if !self.was_precomputed(id) {
            return CandidateMetadata::default();
        }
        CandidateMetadata {
            order: self.get_i32(id, ORDER_ATTRIBUTE, DEFAULT_ORDER),
            before: self.get_set(id, BEFORE_ATTRIBUTE),
            after: self.get_set(id, AFTER_ATTRIBUTE),
            requires: self.get_set(id, REQUIRES_ATTRIBUTE),
            was_precomputed: true,
        }
    }

    /// Number of raw entries in the index.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Candidate ids may themselves contain dots, so the attribute suffix is
/// only split off when it is one of the known attribute names.
fn candidate_of(key: &str) -> String {
    if let Some((id, suffix)) = key.rsplit_once('.') {
        if KNOWN_ATTRIBUTES.contains(&suffix) {
            return id.to_string();
        }
    }
    key.to_string()
}

/// A candidate's own declared ordering and applicability attributes.
///
/// Consulted when a candidate is absent from the precomputed index, e.g.
/// for dynamically added candidates built without the index generator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateDeclarations {
    pub order: i32,
    pub before: BTreeSet<String>,
    pub after: BTreeSet<String>,
    pub requires: BTreeSet<String>,
}

impl CandidateDeclarations {
    /// Create declarations with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ordering hint.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Declare candidates this one must precede.
    pub fn with_before<I, S>(mut self, before: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before.extend(before.into_iter().map(Into::into));
        self
    }

    /// Declare candidates this one must follow.
    pub fn with_after<I, S>(mut self, after: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after.extend(after.into_iter().map(Into::into));
        self
    }

    /// Declare names that must be present for this candidate to apply.
    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(requires.into_iter().map(Into::into));
        self
    }
}

/// On-demand access to a candidate's own declared attributes.
pub trait DeclarationSource: Send + Sync {
    /// Read the declarations for a candidate, or `None` if the candidate is
    /// unknown to this source.
    fn read(&self, id: &str) -> Option<CandidateDeclarations>;
}

/// A source with no declarations. The fallback of last resort: every
/// candidate resolves to default metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeclarations;

impl DeclarationSource for NoDeclarations {
    fn read(&self, _id: &str) -> Option<CandidateDeclarations> {
        None
    }
}

/// A statically declared table of candidate declarations.
#[derive(Debug, Clone, Default)]
pub struct StaticDeclarations {
    declarations: HashMap<String, CandidateDeclarations>,
}

impl StaticDeclarations {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert declarations for a candidate.
    pub fn insert(&mut self, id: impl Into<String>, declarations: CandidateDeclarations) {
        self.declarations.insert(id.into(), declarations);
    }

    /// Insert declarations for a candidate (builder style).
    pub fn with_declaration(
        mut self,
        id: impl Into<String>,
        declarations: CandidateDeclarations,
    ) -> Self {
        self.insert(id, declarations);
        self
    }
}

impl DeclarationSource for StaticDeclarations {
    fn read(&self, id: &str) -> Option<CandidateDeclarations> {
        self.declarations.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attributes() {
        let index = MetadataIndex::parse(
            "web.Order=10\n\
             web.After=core,log\n\
             core=\n",
        )
        .unwrap();

        let web = index.candidate("web");
        assert!(web.was_precomputed);
        assert_eq!(web.order, 10);
        assert_eq!(
            web.after,
            BTreeSet::from(["core".to_string(), "log".to_string()])
        );
        assert!(web.before.is_empty());
    }

    #[test]
    fn bare_marker_line_counts_as_precomputed() {
        let index = MetadataIndex::parse("core=\n").unwrap();
        assert!(index.was_precomputed("core"));
        let core = index.candidate("core");
        assert_eq!(core.order, DEFAULT_ORDER);
        assert!(core.was_precomputed);
    }

    #[test]
    fn absent_candidate_yields_defaults() {
        let index = MetadataIndex::empty();
        let metadata = index.candidate("ghost");
        assert!(!metadata.was_precomputed);
        assert_eq!(metadata, CandidateMetadata::default());
    }

    #[test]
    fn dotted_candidate_ids_resolve() {
        let index = MetadataIndex::parse("com.example.Web.Order=5\n").unwrap();
        assert!(index.was_precomputed("com.example.Web"));
        assert_eq!(index.get_i32("com.example.Web", ORDER_ATTRIBUTE, 0), 5);
    }

    #[test]
    fn unparsable_order_falls_back_to_default() {
        let index = MetadataIndex::parse("web.Order=high\n").unwrap();
        assert_eq!(index.get_i32("web", ORDER_ATTRIBUTE, DEFAULT_ORDER), 0);
    }

    #[test]
    fn static_declarations_round_trip() {
        let source = StaticDeclarations::new().with_declaration(
            "web",
            CandidateDeclarations::new()
                .with_order(-5)
                .with_after(["core"]),
        );

        let declarations = source.read("web").unwrap();
        assert_eq!(declarations.order, -5);
        assert!(declarations.after.contains("core"));
        assert!(source.read("missing").is_none());
    }

    #[test]
    fn no_declarations_is_always_empty() {
        assert!(NoDeclarations.read("anything").is_none());
    }
}
