//! Auto-configuration resolution engine.
//!
//! Given candidate configuration units contributed by independent modules,
//! the engine determines which are applicable to the running application,
//! removes duplicates and user-declared exclusions, and produces a
//! deterministic, dependency-respecting activation order for the
//! dependency-injection container to consume.
//!
//! Resolution runs once per application bootstrap: the container calls
//! [`ImportCoordinator::process`] once per annotated entry point it
//! discovers, then [`ImportCoordinator::finalize`] once to obtain the final
//! ordered `(entry point, candidate)` list.

pub mod conditions;
pub mod environment;
pub mod errors;
pub mod exclusions;
pub mod imports;
pub mod metadata;
pub mod registry;
pub mod scope;
pub mod sorting;

mod flatindex;

// Re-export key types for convenience
pub use conditions::{
    ConditionEvaluationReport, ConditionFilter, ConditionOutcome, FilterChain, PathProbe,
    PresenceFilter, PresenceProbe, RecordedOutcome, StaticProbe,
};
pub use environment::Environment;
pub use errors::ResolutionError;
pub use exclusions::{ExclusionResolver, EXCLUDE_PROPERTY};
pub use imports::{
    AutoConfigurationEntry, ImportCoordinator, ImportEvent, ImportListener, ImportResolution,
    ResolutionEntry, SelectedImport, ENABLED_PROPERTY,
};
pub use metadata::{
    CandidateDeclarations, CandidateMetadata, DeclarationSource, MetadataIndex, NoDeclarations,
    StaticDeclarations,
};
pub use registry::{CandidateRegistry, DEFAULT_MARKER};
pub use scope::{IndexSource, ResolutionScope};
pub use sorting::PrioritySorter;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
