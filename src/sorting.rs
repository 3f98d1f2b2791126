use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::errors::ResolutionError;
use crate::metadata::{CandidateMetadata, DeclarationSource, MetadataIndex, DEFAULT_ORDER};

/// Sorts surviving candidates into activation order.
///
/// Three deterministic phases: lexicographic by id, stable by the declared
/// `order` hint (lower first), then a depth-first pass over the before/after
/// constraint graph. Among candidates with no relative constraint the
/// earlier phases' order is preserved, so equal inputs always produce equal
/// output.
pub struct PrioritySorter<'a> {
    index: &'a MetadataIndex,
    declarations: &'a dyn DeclarationSource,
}

impl<'a> PrioritySorter<'a> {
    /// Create a sorter over the precomputed index, with the declaration
    /// source as fallback for candidates the index does not know.
    pub fn new(index: &'a MetadataIndex, declarations: &'a dyn DeclarationSource) -> Self {
        Self {
            index,
            declarations,
        }
    }

    /// Order the candidates, honoring every before/after constraint among
    /// them. A cycle in the constraint graph is a fatal configuration error.
    pub fn in_priority_order(&self, candidates: &[String]) -> Result<Vec<String>, ResolutionError> {
        let graph = CandidateGraph::build(self.index, self.declarations, candidates);
        let mut ordered: Vec<String> = candidates.to_vec();
        ordered.sort();
        ordered.sort_by_key(|id| graph.order_of(id));
        self.sort_by_constraints(&graph, ordered)
    }

    fn sort_by_constraints(
        &self,
        graph: &CandidateGraph,
        ordered: Vec<String>,
    ) -> Result<Vec<String>, ResolutionError> {
        let survivors: HashSet<&str> = ordered.iter().map(String::as_str).collect();
        let mut to_sort: VecDeque<String> = ordered.iter().cloned().collect();
        // Referenced-but-ineligible candidates join the traversal so their
        // transitive constraints still order the survivors; graph iteration
        // is sorted, keeping the pass deterministic.
        to_sort.extend(
            graph
                .names()
                .filter(|name| !survivors.contains(name.as_str()))
                .cloned(),
        );

        let mut sorted: Vec<String> = Vec::with_capacity(graph.len());
        let mut done: HashSet<String> = HashSet::with_capacity(graph.len());
        let mut processing: Vec<String> = Vec::new();
        while let Some(current) = to_sort.pop_front() {
            if !done.contains(&current) {
                Self::visit(graph, &mut sorted, &mut done, &mut processing, current)?;
            }
        }

        sorted.retain(|id| survivors.contains(id.as_str()));
        Ok(sorted)
    }

    fn visit(
        graph: &CandidateGraph,
        sorted: &mut Vec<String>,
        done: &mut HashSet<String>,
        processing: &mut Vec<String>,
        current: String,
    ) -> Result<(), ResolutionError> {
        processing.push(current.clone());
        for after in graph.requested_after(&current) {
            if processing.iter().any(|inflight| *inflight == after) {
                return Err(ResolutionError::CycleDetected { current, after });
            }
            if !done.contains(&after) && graph.contains(&after) {
                Self::visit(graph, sorted, done, processing, after)?;
            }
        }
        processing.pop();
        done.insert(current.clone());
        sorted.push(current);
        Ok(())
    }
}

impl std::fmt::Debug for PrioritySorter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrioritySorter").finish_non_exhaustive()
    }
}

/// Constraint graph over the survivor set plus every candidate their
/// before/after declarations reach transitively. Bounded by reachability,
/// never the full candidate universe.
struct CandidateGraph {
    nodes: BTreeMap<String, CandidateMetadata>,
}

impl CandidateGraph {
    fn build(
        index: &MetadataIndex,
        declarations: &dyn DeclarationSource,
        candidates: &[String],
    ) -> Self {
        let mut graph = Self {
            nodes: BTreeMap::new(),
        };
        graph.add_all(index, declarations, candidates.to_vec(), true);
        graph
    }

    /// Insert ids and, for ids whose facts are known, their before/after
    /// references. Required ids always get a node, even with no known
    /// facts; referenced ids only join when facts exist for them.
    fn add_all(
        &mut self,
        index: &MetadataIndex,
        declarations: &dyn DeclarationSource,
        ids: Vec<String>,
        required: bool,
    ) {
        for id in ids {
            if self.nodes.contains_key(&id) {
                continue;
            }
            let (metadata, available) = Self::lookup(index, declarations, &id);
            if required || available {
                self.nodes.insert(id, metadata.clone());
            }
            if available {
                self.add_all(
                    index,
                    declarations,
                    metadata.before.iter().cloned().collect(),
                    false,
                );
                self.add_all(
                    index,
                    declarations,
                    metadata.after.iter().cloned().collect(),
                    false,
                );
            }
        }
    }

    fn lookup(
        index: &MetadataIndex,
        declarations: &dyn DeclarationSource,
        id: &str,
    ) -> (CandidateMetadata, bool) {
        if index.was_precomputed(id) {
            return (index.candidate(id), true);
        }
        match declarations.read(id) {
            Some(declared) => (
                CandidateMetadata {
                    order: declared.order,
                    before: declared.before,
                    after: declared.after,
                    requires: declared.requires,
                    was_precomputed: false,
                },
                true,
            ),
            None => (CandidateMetadata::default(), false),
        }
    }

    /// The "must come after" set: declared `after` plus every candidate
    /// whose `before` names this one.
    fn requested_after(&self, id: &str) -> BTreeSet<String> {
        let mut after = self
            .nodes
            .get(id)
            .map(|node| node.after.clone())
            .unwrap_or_default();
        for (name, node) in &self.nodes {
            if node.before.contains(id) {
                after.insert(name.clone());
            }
        }
        after
    }

    fn order_of(&self, id: &str) -> i32 {
        self.nodes
            .get(id)
            .map(|node| node.order)
            .unwrap_or(DEFAULT_ORDER)
    }

    fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    fn names(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}
