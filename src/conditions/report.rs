use std::collections::BTreeMap;

use serde::Serialize;

use crate::conditions::ConditionOutcome;

/// One recorded filter evaluation for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedOutcome {
    pub filter: String,
    #[serde(flatten)]
    pub outcome: ConditionOutcome,
}

/// Diagnostic record of every condition evaluation and exclusion in one
/// resolution run.
///
/// The report is write-only during resolution and read by operators
/// afterwards; nothing in the engine consults it for decisions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConditionEvaluationReport {
    outcomes: BTreeMap<String, Vec<RecordedOutcome>>,
    exclusions: Vec<String>,
}

impl ConditionEvaluationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one filter outcome for a candidate.
    pub fn record(&mut self, candidate: &str, filter: &str, outcome: ConditionOutcome) {
        self.outcomes
            .entry(candidate.to_string())
            .or_default()
            .push(RecordedOutcome {
                filter: filter.to_string(),
                outcome,
            });
    }

    /// Record user-declared exclusions, skipping ones already recorded.
    pub fn record_exclusions<I, S>(&mut self, exclusions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for exclusion in exclusions {
            let exclusion = exclusion.into();
            if !self.exclusions.contains(&exclusion) {
                self.exclusions.push(exclusion);
            }
        }
    }

    /// Outcomes recorded for a candidate, in evaluation order.
    pub fn outcomes(&self, candidate: &str) -> &[RecordedOutcome] {
        self.outcomes
            .get(candidate)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Exclusions recorded across all entries.
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// Candidates eliminated by at least one filter.
    pub fn unmatched(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, recorded)| recorded.iter().any(|r| !r.outcome.matched))
            .map(|(candidate, _)| candidate.as_str())
            .collect()
    }

    /// Check whether anything was recorded.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty() && self.exclusions.is_empty()
    }

    /// Render the report as pretty JSON for operator diagnostics.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_outcomes_per_candidate() {
        let mut report = ConditionEvaluationReport::new();
        report.record("A", "presence", ConditionOutcome::matched("ok"));
        report.record("A", "custom", ConditionOutcome::no_match("flag off"));
        report.record("B", "presence", ConditionOutcome::matched("ok"));

        assert_eq!(report.outcomes("A").len(), 2);
        assert_eq!(report.outcomes("A")[1].filter, "custom");
        assert_eq!(report.unmatched(), vec!["A"]);
        assert!(report.outcomes("missing").is_empty());
    }

    #[test]
    fn exclusions_are_deduplicated() {
        let mut report = ConditionEvaluationReport::new();
        report.record_exclusions(["B", "C"]);
        report.record_exclusions(["B"]);
        assert_eq!(report.exclusions(), &["B", "C"]);
    }

    #[test]
    fn serializes_to_json() {
        let mut report = ConditionEvaluationReport::new();
        report.record("A", "presence", ConditionOutcome::no_match("missing dep"));
        let json = report.to_json().unwrap();
        assert!(json.contains("\"matched\": false"));
        assert!(json.contains("missing dep"));
    }
}
