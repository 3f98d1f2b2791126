pub mod outcome;
pub mod presence;
pub mod report;

pub use outcome::ConditionOutcome;
pub use presence::{PathProbe, PresenceFilter, PresenceProbe, StaticProbe};
pub use report::{ConditionEvaluationReport, RecordedOutcome};

use std::time::Instant;

use async_trait::async_trait;

use crate::errors::ResolutionError;
use crate::metadata::MetadataIndex;

/// A boolean predicate evaluated per candidate to decide applicability.
///
/// `candidates` is the working set of the whole chain: `None` slots are
/// candidates already eliminated by an earlier filter. A filter must return
/// one outcome per input slot, positionally aligned, with `None` for the
/// eliminated slots. Filters may evaluate candidates concurrently; there is
/// no ordering dependency between candidates within one pass.
#[async_trait]
pub trait ConditionFilter: Send + Sync {
    /// Short name used in logs and the evaluation report.
    fn name(&self) -> &str;

    /// Evaluate all candidates in one pass against the precomputed index.
    async fn evaluate(
        &self,
        candidates: &[Option<String>],
        index: &MetadataIndex,
    ) -> Result<Vec<Option<ConditionOutcome>>, ResolutionError>;
}

/// Ordered chain of condition filters.
///
/// Filters run sequentially and every filter always sees the full working
/// set, even slots eliminated earlier; elimination only removes a candidate
/// from semantic effect by blanking its slot. A failing filter aborts the
/// whole resolution; partial filter failure is never treated as "no match".
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn ConditionFilter>>,
}

impl FilterChain {
    /// Create an empty chain. With no filters every candidate survives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter (builder style).
    pub fn with_filter<F: ConditionFilter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Append a boxed filter.
    pub fn push(&mut self, filter: Box<dyn ConditionFilter>) {
        self.filters.push(filter);
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run every filter over the candidates and return the surviving
    /// order-preserving subsequence, recording all outcomes in the report.
    pub async fn filter(
        &self,
        configurations: Vec<String>,
        index: &MetadataIndex,
        report: &mut ConditionEvaluationReport,
    ) -> Result<Vec<String>, ResolutionError> {
        let start = Instant::now();
        let mut working: Vec<Option<String>> =
            configurations.iter().cloned().map(Some).collect();
        let mut skipped = false;

        for filter in &self.filters {
            let outcomes = filter.evaluate(&working, index).await?;
            if outcomes.len() != working.len() {
                return Err(ResolutionError::filter(
                    filter.name(),
                    format!(
                        "returned {} outcomes for {} candidates",
                        outcomes.len(),
                        working.len()
                    ),
                ));
            }
            for (slot, outcome) in working.iter_mut().zip(outcomes) {
                let (Some(candidate), Some(outcome)) = (slot.as_deref(), outcome) else {
                    continue;
                };
                report.record(candidate, filter.name(), outcome.clone());
                if !outcome.matched {
                    *slot = None;
                    skipped = true;
                }
            }
        }

        if !skipped {
            return Ok(configurations);
        }
        let result: Vec<String> = working.into_iter().flatten().collect();
        tracing::trace!(
            filtered = configurations.len() - result.len(),
            elapsed = ?start.elapsed(),
            "filtered auto-configuration candidates"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field(
                "filters",
                &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Eliminates a fixed candidate and counts the live slots it saw.
    struct DropFilter {
        target: &'static str,
        seen_live: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ConditionFilter for DropFilter {
        fn name(&self) -> &str {
            "drop"
        }

        async fn evaluate(
            &self,
            candidates: &[Option<String>],
            _index: &MetadataIndex,
        ) -> Result<Vec<Option<ConditionOutcome>>, ResolutionError> {
            let live = candidates.iter().flatten().count();
            self.seen_live.fetch_add(live, Ordering::SeqCst);
            Ok(candidates
                .iter()
                .map(|slot| {
                    slot.as_ref().map(|candidate| {
                        if candidate == self.target {
                            ConditionOutcome::no_match("dropped by test filter")
                        } else {
                            ConditionOutcome::matched("kept")
                        }
                    })
                })
                .collect())
        }
    }

    struct BrokenFilter;

    #[async_trait]
    impl ConditionFilter for BrokenFilter {
        fn name(&self) -> &str {
            "broken"
        }

        async fn evaluate(
            &self,
            _candidates: &[Option<String>],
            _index: &MetadataIndex,
        ) -> Result<Vec<Option<ConditionOutcome>>, ResolutionError> {
            Err(ResolutionError::filter("broken", "probe unavailable"))
        }
    }

    fn candidates(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_chain_keeps_everything() {
        let chain = FilterChain::new();
        let mut report = ConditionEvaluationReport::new();
        let result = chain
            .filter(candidates(&["A", "B"]), &MetadataIndex::empty(), &mut report)
            .await
            .unwrap();
        assert_eq!(result, candidates(&["A", "B"]));
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn elimination_preserves_input_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let chain = FilterChain::new().with_filter(DropFilter {
            target: "B",
            seen_live: counter,
        });
        let mut report = ConditionEvaluationReport::new();
        let result = chain
            .filter(
                candidates(&["A", "B", "C"]),
                &MetadataIndex::empty(),
                &mut report,
            )
            .await
            .unwrap();
        assert_eq!(result, candidates(&["A", "C"]));
        assert_eq!(report.unmatched(), vec!["B"]);
    }

    #[tokio::test]
    async fn later_filters_run_but_skip_eliminated_slots() {
        let first_seen = Arc::new(AtomicUsize::new(0));
        let second_seen = Arc::new(AtomicUsize::new(0));
        let chain = FilterChain::new()
            .with_filter(DropFilter {
                target: "A",
                seen_live: first_seen.clone(),
            })
            .with_filter(DropFilter {
                target: "does-not-exist",
                seen_live: second_seen.clone(),
            });
        let mut report = ConditionEvaluationReport::new();
        let result = chain
            .filter(
                candidates(&["A", "B", "C"]),
                &MetadataIndex::empty(),
                &mut report,
            )
            .await
            .unwrap();

        assert_eq!(result, candidates(&["B", "C"]));
        // First filter saw all three candidates, the second only the two
        // survivors: the eliminated slot stays in the working set as a
        // blank, so the filter still runs over the full pass.
        assert_eq!(first_seen.load(Ordering::SeqCst), 3);
        assert_eq!(second_seen.load(Ordering::SeqCst), 2);
        // The eliminated candidate gets no further recorded outcomes.
        assert_eq!(report.outcomes("A").len(), 1);
        assert_eq!(report.outcomes("B").len(), 2);
    }

    #[tokio::test]
    async fn filter_error_aborts_resolution() {
        let chain = FilterChain::new().with_filter(BrokenFilter);
        let mut report = ConditionEvaluationReport::new();
        let err = chain
            .filter(candidates(&["A"]), &MetadataIndex::empty(), &mut report)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Filter { .. }));
    }

    struct MisalignedFilter;

    #[async_trait]
    impl ConditionFilter for MisalignedFilter {
        fn name(&self) -> &str {
            "misaligned"
        }

        async fn evaluate(
            &self,
            _candidates: &[Option<String>],
            _index: &MetadataIndex,
        ) -> Result<Vec<Option<ConditionOutcome>>, ResolutionError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn misaligned_outcomes_are_a_contract_violation() {
        let chain = FilterChain::new().with_filter(MisalignedFilter);
        let mut report = ConditionEvaluationReport::new();
        let err = chain
            .filter(candidates(&["A"]), &MetadataIndex::empty(), &mut report)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Filter { filter, .. } if filter == "misaligned"));
    }
}
