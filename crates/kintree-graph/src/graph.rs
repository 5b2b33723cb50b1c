//! Core graph data structure.
//!
//! The FamilyGraph is an arena of member nodes keyed by member id.
//! Relations are stored as id lists on each node, which keeps the
//! structure free of ownership cycles even when the data itself has them.

use crate::builder::GraphBuilder;
use kintree_core::{Member, MemberId, RelationshipEdge};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A member together with its resolved relations.
///
/// Each list holds member ids and never contains the same id twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberNode {
    pub member: Member,
    pub children: Vec<MemberId>,
    pub spouses: Vec<MemberId>,
    pub parents: Vec<MemberId>,
}

impl MemberNode {
    /// Creates a node with no relations.
    pub fn new(member: Member) -> Self {
        Self {
            member,
            children: Vec::new(),
            spouses: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.member.id
    }

    pub fn has_child(&self, id: &str) -> bool {
        self.children.iter().any(|c| c == id)
    }

    pub fn has_spouse(&self, id: &str) -> bool {
        self.spouses.iter().any(|s| s == id)
    }

    pub fn has_parent(&self, id: &str) -> bool {
        self.parents.iter().any(|p| p == id)
    }
}

/// Adds `id` to `list` unless it is already there. Returns true if added.
pub(crate) fn insert_unique(list: &mut Vec<MemberId>, id: &str) -> bool {
    if list.iter().any(|existing| existing == id) {
        return false;
    }
    list.push(id.to_string());
    true
}

/// The resolved family graph.
///
/// Built once per snapshot by [`GraphBuilder`]. Iteration follows the
/// order in which members were supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FamilyGraph {
    /// Member id to node.
    pub(crate) nodes: HashMap<MemberId, MemberNode>,

    /// Member ids in input order.
    pub(crate) order: Vec<MemberId>,

    /// Member id to its index in `order`.
    pub(crate) position: HashMap<MemberId, usize>,
}

impl FamilyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from members and raw relationship edges.
    pub fn build<'a>(
        members: impl IntoIterator<Item = Member>,
        edges: impl IntoIterator<Item = &'a RelationshipEdge>,
    ) -> Self {
        let mut builder = GraphBuilder::new();
        builder.add_members(members);
        builder.add_edges(edges);
        builder.build()
    }

    /// Inserts a member node. Returns false if the id is already taken,
    /// in which case the graph is left unchanged.
    pub(crate) fn insert_member(&mut self, member: Member) -> bool {
        if self.nodes.contains_key(&member.id) {
            return false;
        }
        let id = member.id.clone();
        self.position.insert(id.clone(), self.order.len());
        self.order.push(id.clone());
        self.nodes.insert(id, MemberNode::new(member));
        true
    }

    /// Gets a node by member id.
    pub fn get(&self, id: &str) -> Option<&MemberNode> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut MemberNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns the input position of a member.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.position.get(id).copied()
    }

    /// The underlying id-keyed node map.
    pub fn as_map(&self) -> &HashMap<MemberId, MemberNode> {
        &self.nodes
    }

    /// Iterates over all nodes in input order.
    pub fn nodes(&self) -> impl Iterator<Item = &MemberNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Member ids in input order.
    pub fn member_ids(&self) -> &[MemberId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Direct children of a member.
    pub fn children_of(&self, id: &str) -> Vec<&MemberNode> {
        self.resolve_list(id, |node| &node.children)
    }

    /// Spouses of a member.
    pub fn spouses_of(&self, id: &str) -> Vec<&MemberNode> {
        self.resolve_list(id, |node| &node.spouses)
    }

    /// Parents of a member.
    pub fn parents_of(&self, id: &str) -> Vec<&MemberNode> {
        self.resolve_list(id, |node| &node.parents)
    }

    fn resolve_list<'g>(
        &'g self,
        id: &str,
        list: impl Fn(&'g MemberNode) -> &'g Vec<MemberId>,
    ) -> Vec<&'g MemberNode> {
        self.nodes
            .get(id)
            .map(|node| {
                list(node)
                    .iter()
                    .filter_map(|other| self.nodes.get(other))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Finds groups of members whose parent/child assertions loop back on
    /// themselves, e.g. A father of B and B father of A.
    ///
    /// Groups and the members inside them are in input order. The graph is
    /// left as is; traversal already stops at these loops.
    pub fn lineage_cycles(&self) -> Vec<Vec<MemberId>> {
        let mut lineage: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in self.nodes() {
            lineage.add_node(node.id());
            for child in &node.children {
                lineage.add_edge(node.id(), child.as_str(), ());
            }
        }

        let rank = |id: &str| self.position(id).unwrap_or(usize::MAX);

        let mut cycles: Vec<Vec<MemberId>> = tarjan_scc(&lineage)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|mut component| {
                component.sort_by_key(|id| rank(*id));
                component.into_iter().map(str::to_string).collect()
            })
            .collect();

        cycles.sort_by_key(|component| rank(component[0].as_str()));
        cycles
    }
}

/// Graph statistics for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub members: usize,
    pub parent_links: usize,
    pub spouse_links: usize,
    pub roots: usize,
}

impl FamilyGraph {
    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        let parent_links = self.nodes.values().map(|n| n.children.len()).sum::<usize>();
        let spouse_links = self.nodes.values().map(|n| n.spouses.len()).sum::<usize>() / 2;

        GraphStats {
            members: self.len(),
            parent_links,
            spouse_links,
            roots: self.forest(crate::FamilyScope::All).len(),
        }
    }
}
