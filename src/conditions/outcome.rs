use serde::Serialize;

/// Result of evaluating one condition filter against one candidate.
///
/// The reason is diagnostic only: it is collected for reporting and never
/// influences control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionOutcome {
    pub matched: bool,
    pub reason: String,
}

impl ConditionOutcome {
    /// A matching outcome.
    pub fn matched(reason: impl Into<String>) -> Self {
        Self {
            matched: true,
            reason: reason.into(),
        }
    }

    /// A non-matching outcome.
    pub fn no_match(reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConditionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.matched {
            write!(f, "matched: {}", self.reason)
        } else {
            write!(f, "did not match: {}", self.reason)
        }
    }
}
