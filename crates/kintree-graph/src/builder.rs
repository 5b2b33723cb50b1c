//! Graph builder for constructing the family graph from raw records.
//!
//! The builder takes members and relationship edges and resolves each
//! edge into a parent/child or spouse link between known members.

use crate::graph::{insert_unique, FamilyGraph};
use kintree_core::{Association, Member, RelationshipEdge, RelationshipKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Counts of what happened to each edge during a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Edges that added a new link.
    pub applied: usize,
    /// Edges restating a link that already existed.
    pub duplicates: usize,
    /// Sibling edges and unrecognized relationship types.
    pub ignored: usize,
    /// Edges with an endpoint that is not a known member.
    pub dangling: usize,
    /// Edges linking a member to itself.
    pub self_referential: usize,
    /// Member records skipped because their id was already taken.
    pub duplicate_members: usize,
}

/// Builds a FamilyGraph from members and relationship edges.
///
/// The builder handles the two-pass process:
/// 1. Add all members to the graph
/// 2. Resolve edges into links once every member is known
pub struct GraphBuilder {
    graph: FamilyGraph,
    /// Edges waiting for resolution.
    pending: Vec<RelationshipEdge>,
    report: BuildReport,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            graph: FamilyGraph::new(),
            pending: Vec::new(),
            report: BuildReport::default(),
        }
    }

    /// Adds member records. The first record for an id wins.
    pub fn add_members(&mut self, members: impl IntoIterator<Item = Member>) {
        for member in members {
            let id = member.id.clone();
            if !self.graph.insert_member(member) {
                warn!("Skipping duplicate member record {}", id);
                self.report.duplicate_members += 1;
            }
        }
    }

    /// Queues relationship edges for resolution.
    ///
    /// Edges may be added before or after the members they mention;
    /// nothing is resolved until `build`.
    pub fn add_edges<'a>(&mut self, edges: impl IntoIterator<Item = &'a RelationshipEdge>) {
        self.pending.extend(edges.into_iter().cloned());
    }

    /// Resolves queued edges into links.
    fn resolve_edges(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for edge in &pending {
            self.apply_edge(edge);
        }
    }

    fn apply_edge(&mut self, edge: &RelationshipEdge) {
        let association =
            RelationshipKind::resolve(&edge.relationship_type, &edge.member1_id, &edge.member2_id);

        let (first, second) = match association {
            Association::Ignored => {
                trace!(
                    "Edge {} ({}) has no structural effect",
                    edge.id,
                    edge.relationship_type
                );
                self.report.ignored += 1;
                return;
            }
            Association::Parent { parent, child } => (parent, child),
            Association::Spouse(a, b) => (a, b),
        };

        if first == second {
            debug!("Skipping self-referential edge {}", edge.id);
            self.report.self_referential += 1;
            return;
        }

        if !self.graph.contains(first) || !self.graph.contains(second) {
            debug!(
                "Skipping edge {}: unknown member ({} -> {})",
                edge.id, edge.member1_id, edge.member2_id
            );
            self.report.dangling += 1;
            return;
        }

        let added = match association {
            Association::Parent { parent, child } => self.link_parent(parent, child),
            Association::Spouse(a, b) => self.link_spouses(a, b),
            Association::Ignored => false,
        };

        if added {
            self.report.applied += 1;
        } else {
            self.report.duplicates += 1;
        }
    }

    /// Both ends are known to exist.
    fn link_parent(&mut self, parent: &str, child: &str) -> bool {
        let mut added = false;
        if let Some(node) = self.graph.get_mut(parent) {
            added |= insert_unique(&mut node.children, child);
        }
        if let Some(node) = self.graph.get_mut(child) {
            added |= insert_unique(&mut node.parents, parent);
        }
        added
    }

    fn link_spouses(&mut self, a: &str, b: &str) -> bool {
        let mut added = false;
        if let Some(node) = self.graph.get_mut(a) {
            added |= insert_unique(&mut node.spouses, b);
        }
        if let Some(node) = self.graph.get_mut(b) {
            added |= insert_unique(&mut node.spouses, a);
        }
        added
    }

    /// Orders every relation list by member input order, so the result
    /// does not depend on the order edges were supplied in.
    fn normalize(&mut self) {
        let position = &self.graph.position;
        let rank = |id: &String| position.get(id).copied().unwrap_or(usize::MAX);

        for node in self.graph.nodes.values_mut() {
            node.children.sort_by_key(rank);
            node.spouses.sort_by_key(rank);
            node.parents.sort_by_key(rank);
        }
    }

    /// Returns the report for edges resolved so far.
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Finishes building and returns the graph.
    pub fn build(self) -> FamilyGraph {
        self.build_with_report().0
    }

    /// Finishes building and returns the graph with its build report.
    pub fn build_with_report(mut self) -> (FamilyGraph, BuildReport) {
        self.resolve_edges();
        self.normalize();

        debug!(
            "Built family graph: {} members, {} links applied, {} duplicate, {} ignored, {} dangling",
            self.graph.len(),
            self.report.applied,
            self.report.duplicates,
            self.report.ignored,
            self.report.dangling
        );

        (self.graph, self.report)
    }
}
