use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::conditions::{ConditionEvaluationReport, ConditionFilter, FilterChain, PresenceProbe};
use crate::environment::Environment;
use crate::errors::ResolutionError;
use crate::exclusions::ExclusionResolver;
use crate::metadata::{DeclarationSource, NoDeclarations};
use crate::registry::DEFAULT_MARKER;
use crate::scope::ResolutionScope;
use crate::sorting::PrioritySorter;

/// Property disabling auto-configuration resolution entirely.
pub const ENABLED_PROPERTY: &str = "autoconfigure.enabled";

/// One request to resolve auto-configuration for one annotated entry point.
#[derive(Debug, Clone)]
pub struct ResolutionEntry {
    pub entry_point: String,
    pub marker: String,
    pub includes: Vec<String>,
    pub exclude_classes: Vec<String>,
    pub exclude_names: Vec<String>,
}

impl ResolutionEntry {
    /// Create an entry for an entry point, using the default marker.
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            marker: DEFAULT_MARKER.to_string(),
            includes: Vec::new(),
            exclude_classes: Vec::new(),
            exclude_names: Vec::new(),
        }
    }

    /// Set the marker capability to resolve candidates for.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Add a candidate contributed directly by the entry point, appended
    /// after the registered candidates.
    pub fn include(mut self, candidate: impl Into<String>) -> Self {
        self.includes.push(candidate.into());
        self
    }

    /// Add a class exclusion declared on the entry point.
    pub fn exclude_class(mut self, candidate: impl Into<String>) -> Self {
        self.exclude_classes.push(candidate.into());
        self
    }

    /// Add a name exclusion declared on the entry point.
    pub fn exclude_name(mut self, candidate: impl Into<String>) -> Self {
        self.exclude_names.push(candidate.into());
        self
    }
}

/// Output of resolving one entry: the surviving configurations (post-filter,
/// pre-global-sort) and the exclusions that applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoConfigurationEntry {
    configurations: Vec<String>,
    exclusions: BTreeSet<String>,
}

impl AutoConfigurationEntry {
    fn new(configurations: Vec<String>, exclusions: BTreeSet<String>) -> Self {
        Self {
            configurations,
            exclusions,
        }
    }

    /// Surviving configurations in candidate-list order.
    pub fn configurations(&self) -> &[String] {
        &self.configurations
    }

    /// Exclusions applied while resolving this entry.
    pub fn exclusions(&self) -> &BTreeSet<String> {
        &self.exclusions
    }
}

/// A finally selected candidate paired with the entry point that first
/// requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImport {
    pub entry_point: String,
    pub candidate: String,
}

/// Result of finalizing a resolution run.
#[derive(Debug)]
pub struct ImportResolution {
    /// Candidates in activation order, each with its owning entry point.
    pub selections: Vec<SelectedImport>,
    /// Diagnostic record of the run.
    pub report: ConditionEvaluationReport,
}

/// Event describing one resolved entry, fired after filtering.
#[derive(Debug)]
pub struct ImportEvent<'a> {
    pub configurations: &'a [String],
    pub exclusions: &'a BTreeSet<String>,
}

/// Observer notified once per processed entry. Diagnostic only.
pub trait ImportListener: Send + Sync {
    fn on_import(&self, event: &ImportEvent<'_>);
}

/// Accumulates resolution requests across all entry points of one
/// application bootstrap and produces the final activation order.
///
/// Two-phase protocol: [`process`](Self::process) is called once per entry
/// point discovered during scanning; [`finalize`](Self::finalize) consumes
/// the coordinator once all entry points are in. Consuming `self` keeps the
/// finalize step single-shot by construction.
pub struct ImportCoordinator {
    scope: Arc<ResolutionScope>,
    environment: Environment,
    exclusions: ExclusionResolver,
    chain: FilterChain,
    declarations: Box<dyn DeclarationSource>,
    listeners: Vec<Box<dyn ImportListener>>,
    report: ConditionEvaluationReport,
    /// Candidate -> first requesting entry point, in first-seen order.
    owners: Vec<(String, String)>,
    seen: HashSet<String>,
    entries: Vec<AutoConfigurationEntry>,
}

impl ImportCoordinator {
    /// Create a coordinator over the scope's cached indexes. The probe
    /// backs exclusion validation and any presence filters the host adds.
    pub fn new(
        scope: Arc<ResolutionScope>,
        environment: Environment,
        probe: Arc<dyn PresenceProbe>,
    ) -> Self {
        Self {
            scope,
            environment,
            exclusions: ExclusionResolver::new(probe),
            chain: FilterChain::new(),
            declarations: Box::new(NoDeclarations),
            listeners: Vec::new(),
            report: ConditionEvaluationReport::new(),
            owners: Vec::new(),
            seen: HashSet::new(),
            entries: Vec::new(),
        }
    }

    /// Append a condition filter to the chain.
    pub fn with_filter<F: ConditionFilter + 'static>(mut self, filter: F) -> Self {
        self.chain = self.chain.with_filter(filter);
        self
    }

    /// Register an import listener.
    pub fn with_listener<L: ImportListener + 'static>(mut self, listener: L) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Set the fallback source for candidates missing from the metadata
    /// index.
    pub fn with_declarations<D: DeclarationSource + 'static>(mut self, declarations: D) -> Self {
        self.declarations = Box::new(declarations);
        self
    }

    /// Diagnostic report accumulated so far.
    pub fn report(&self) -> &ConditionEvaluationReport {
        &self.report
    }

    /// Number of entries processed so far.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Resolve one entry point and accumulate its result.
    pub async fn process(&mut self, entry: ResolutionEntry) -> Result<(), ResolutionError> {
        let resolved = self.resolve_entry(&entry).await?;
        for candidate in resolved.configurations() {
            if self.seen.insert(candidate.clone()) {
                self.owners
                    .push((candidate.clone(), entry.entry_point.clone()));
            }
        }
        self.entries.push(resolved);
        Ok(())
    }

    async fn resolve_entry(
        &mut self,
        entry: &ResolutionEntry,
    ) -> Result<AutoConfigurationEntry, ResolutionError> {
        if !self.environment.get_flag(ENABLED_PROPERTY, true) {
            tracing::debug!(
                entry_point = %entry.entry_point,
                "auto-configuration disabled by override property"
            );
            return Ok(AutoConfigurationEntry::default());
        }

        let registry = self.scope.registry()?;
        let mut configurations: Vec<String> = registry.candidates(&entry.marker)?.to_vec();
        configurations.extend(entry.includes.iter().cloned());
        let configurations = remove_duplicates(configurations);

        let exclusions = self.exclusions.resolve(entry, &self.environment);
        self.exclusions.validate(&configurations, &exclusions).await?;
        let configurations: Vec<String> = configurations
            .into_iter()
            .filter(|candidate| !exclusions.contains(candidate))
            .collect();

        let metadata = self.scope.metadata()?;
        let configurations = self
            .chain
            .filter(configurations, metadata, &mut self.report)
            .await?;
        self.report.record_exclusions(exclusions.iter().cloned());

        let event = ImportEvent {
            configurations: &configurations,
            exclusions: &exclusions,
        };
        for listener in &self.listeners {
            listener.on_import(&event);
        }

        tracing::debug!(
            entry_point = %entry.entry_point,
            selected = configurations.len(),
            excluded = exclusions.len(),
            "resolved auto-configuration entry"
        );
        Ok(AutoConfigurationEntry::new(configurations, exclusions))
    }

    /// Union all accumulated entries, subtract all exclusions, sort into
    /// activation order, and pair each survivor with its owner.
    ///
    /// With no accumulated entries this returns an empty selection without
    /// invoking the sorter.
    pub fn finalize(self) -> Result<ImportResolution, ResolutionError> {
        if self.entries.is_empty() {
            return Ok(ImportResolution {
                selections: Vec::new(),
                report: self.report,
            });
        }

        let all_exclusions: HashSet<&String> =
            self.entries.iter().flat_map(|e| e.exclusions()).collect();
        let mut processed: Vec<String> = Vec::new();
        let mut merged: HashSet<&String> = HashSet::new();
        for entry in &self.entries {
            for candidate in entry.configurations() {
                if !all_exclusions.contains(candidate) && merged.insert(candidate) {
                    processed.push(candidate.clone());
                }
            }
        }

        let metadata = self.scope.metadata()?;
        let sorter = PrioritySorter::new(metadata, self.declarations.as_ref());
        let ordered = sorter.in_priority_order(&processed)?;

        let owner_of: HashMap<&String, &String> = self
            .owners
            .iter()
            .map(|(candidate, entry_point)| (candidate, entry_point))
            .collect();
        let selections: Vec<SelectedImport> = ordered
            .into_iter()
            .filter_map(|candidate| {
                owner_of.get(&candidate).map(|entry_point| SelectedImport {
                    entry_point: (*entry_point).clone(),
                    candidate: candidate.clone(),
                })
            })
            .collect();

        tracing::info!(
            selected = selections.len(),
            entries = self.entries.len(),
            "finalized auto-configuration imports"
        );
        Ok(ImportResolution {
            selections,
            report: self.report,
        })
    }
}

impl std::fmt::Debug for ImportCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportCoordinator")
            .field("entries", &self.entries.len())
            .field("filters", &self.chain.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Keep the first occurrence of each candidate, preserving order.
fn remove_duplicates(list: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    list.into_iter()
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}
