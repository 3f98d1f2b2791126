use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::conditions::PresenceProbe;
use crate::environment::Environment;
use crate::errors::ResolutionError;
use crate::imports::ResolutionEntry;

/// Property holding a comma-separated list of candidates to exclude.
pub const EXCLUDE_PROPERTY: &str = "autoconfigure.exclude";

/// Merges and validates user-declared exclusions.
pub struct ExclusionResolver {
    probe: Arc<dyn PresenceProbe>,
}

impl ExclusionResolver {
    /// Create a resolver over the injected presence probe, used to decide
    /// whether an unknown exclusion names something loadable.
    pub fn new(probe: Arc<dyn PresenceProbe>) -> Self {
        Self { probe }
    }

    /// Union of the entry point's declared class exclusions, name
    /// exclusions, and the environment exclusion-list property.
    pub fn resolve(&self, entry: &ResolutionEntry, environment: &Environment) -> BTreeSet<String> {
        let mut exclusions: BTreeSet<String> = BTreeSet::new();
        exclusions.extend(entry.exclude_classes.iter().cloned());
        exclusions.extend(entry.exclude_names.iter().cloned());
        exclusions.extend(environment.get_list(EXCLUDE_PROPERTY));
        exclusions
    }

    /// Validate exclusions against the candidate list.
    ///
    /// An exclusion that is loadable per the probe but matches no candidate
    /// is a typo that would otherwise silently no-op, so all such offenders
    /// are reported together as a fatal error. Exclusions that cannot be
    /// loaded at all are permitted: they are assumed absent from the final
    /// deployment.
    pub async fn validate(
        &self,
        candidates: &[String],
        exclusions: &BTreeSet<String>,
    ) -> Result<(), ResolutionError> {
        let known: HashSet<&str> = candidates.iter().map(String::as_str).collect();
        let mut invalid = Vec::new();
        for exclusion in exclusions {
            if !known.contains(exclusion.as_str()) && self.probe.is_present(exclusion).await {
                invalid.push(exclusion.clone());
            }
        }
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(ResolutionError::InvalidExclusions { exclusions: invalid })
        }
    }
}

impl std::fmt::Debug for ExclusionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExclusionResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::StaticProbe;

    fn resolver(present: &[&str]) -> ExclusionResolver {
        ExclusionResolver::new(Arc::new(StaticProbe::with_present(present.to_vec())))
    }

    #[test]
    fn unions_all_three_sources() {
        let entry = ResolutionEntry::new("App")
            .exclude_class("A")
            .exclude_name("B");
        let environment = Environment::new().with_property(EXCLUDE_PROPERTY, "C, A");

        let exclusions = resolver(&[]).resolve(&entry, &environment);
        assert_eq!(
            exclusions,
            BTreeSet::from(["A".to_string(), "B".to_string(), "C".to_string()])
        );
    }

    #[tokio::test]
    async fn loadable_unknown_exclusions_fail_listing_all() {
        let candidates = vec!["A".to_string()];
        let exclusions = BTreeSet::from(["D".to_string(), "E".to_string(), "A".to_string()]);

        let err = resolver(&["D", "E"])
            .validate(&candidates, &exclusions)
            .await
            .unwrap_err();
        match err {
            ResolutionError::InvalidExclusions { exclusions } => {
                assert_eq!(exclusions, vec!["D".to_string(), "E".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unloadable_exclusions_are_permitted() {
        let candidates = vec!["A".to_string()];
        let exclusions = BTreeSet::from(["Ghost".to_string()]);
        assert!(resolver(&[])
            .validate(&candidates, &exclusions)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn excluding_a_known_candidate_is_valid() {
        let candidates = vec!["A".to_string(), "B".to_string()];
        let exclusions = BTreeSet::from(["B".to_string()]);
        assert!(resolver(&["B"])
            .validate(&candidates, &exclusions)
            .await
            .is_ok());
    }
}
