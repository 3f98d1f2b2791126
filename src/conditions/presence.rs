use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::conditions::{ConditionFilter, ConditionOutcome};
use crate::errors::ResolutionError;
use crate::metadata::{MetadataIndex, REQUIRES_ATTRIBUTE};

/// Injected capability answering "is this named dependency present in the
/// deployment". Supplied by the host environment; the engine never performs
/// the probing itself. Probing may touch slow I/O, hence async.
#[async_trait]
pub trait PresenceProbe: Send + Sync {
    async fn is_present(&self, name: &str) -> bool;
}

/// Probe backed by a fixed set of present names. Useful for tests and for
/// deployments whose contents are known at build time.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    present: HashSet<String>,
}

impl StaticProbe {
    /// Create a probe where nothing is present.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a probe from the names that are present.
    pub fn with_present<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            present: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Mark a name as present.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.present.insert(name.into());
    }
}

#[async_trait]
impl PresenceProbe for StaticProbe {
    async fn is_present(&self, name: &str) -> bool {
        self.present.contains(name)
    }
}

/// Probe that checks for a file or directory under one of a set of roots.
#[derive(Debug, Clone)]
pub struct PathProbe {
    roots: Vec<PathBuf>,
}

impl PathProbe {
    /// Create a probe over the given roots.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl PresenceProbe for PathProbe {
    async fn is_present(&self, name: &str) -> bool {
        for root in &self.roots {
            if tokio::fs::try_exists(root.join(name)).await.unwrap_or(false) {
                return true;
            }
        }
        false
    }
}

/// Filter eliminating candidates whose precomputed `Requires` names are not
/// all present.
///
/// Only the precomputed index is consulted: a candidate without index
/// entries matches here, and its full conditions are evaluated later by the
/// container. Candidates are probed concurrently within one pass.
pub struct PresenceFilter {
    probe: Arc<dyn PresenceProbe>,
}

impl PresenceFilter {
    /// Create a filter over the injected probe.
    pub fn new(probe: Arc<dyn PresenceProbe>) -> Self {
        Self { probe }
    }

    async fn evaluate_one(&self, id: &str, index: &MetadataIndex) -> ConditionOutcome {
        let requires = index.get_set(id, REQUIRES_ATTRIBUTE);
        if requires.is_empty() {
            return ConditionOutcome::matched("no declared presence requirements");
        }
        for name in &requires {
            if !self.probe.is_present(name).await {
                return ConditionOutcome::no_match(format!(
                    "required dependency '{name}' is not present"
                ));
            }
        }
        ConditionOutcome::matched("all required dependencies present")
    }
}

impl std::fmt::Debug for PresenceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceFilter").finish_non_exhaustive()
    }
}

#[async_trait]
impl ConditionFilter for PresenceFilter {
    fn name(&self) -> &str {
        "presence"
    }

    async fn evaluate(
        &self,
        candidates: &[Option<String>],
        index: &MetadataIndex,
    ) -> Result<Vec<Option<ConditionOutcome>>, ResolutionError> {
        let evaluations = candidates.iter().map(|slot| async move {
            match slot {
                Some(id) => Some(self.evaluate_one(id, index).await),
                None => None,
            }
        });
        Ok(join_all(evaluations).await)
    }
}
