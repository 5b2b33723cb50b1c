//! Forest construction and cycle-safe traversal.
//!
//! A forest is the list of root members for a family scope. Walking it
//! goes depth-first: each member is followed by its spouses, which are
//! shown but never expanded, and then by each of its children in turn.
//!
//! Parent/child data is not guaranteed to be acyclic. Every walk keeps
//! the set of members on the current root-to-node path and refuses to
//! enter a member that is already on it.

use crate::graph::{FamilyGraph, MemberNode};
use kintree_core::{FamilyId, Member};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::trace;

/// Which members a forest is drawn from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyScope {
    #[default]
    All,
    Family(FamilyId),
}

impl FamilyScope {
    pub fn from_option(family: Option<impl Into<FamilyId>>) -> Self {
        match family {
            Some(id) => FamilyScope::Family(id.into()),
            None => FamilyScope::All,
        }
    }

    pub fn contains(&self, member: &Member) -> bool {
        match self {
            FamilyScope::All => true,
            FamilyScope::Family(id) => member.family_id == *id,
        }
    }
}

/// The roots of a family scope.
#[derive(Debug, Clone)]
pub struct Forest<'g> {
    graph: &'g FamilyGraph,
    scope: FamilyScope,
    roots: Vec<&'g MemberNode>,
}

impl FamilyGraph {
    /// Collects the roots for a scope.
    ///
    /// A root is an in-scope member with no parent inside the same scope.
    /// Roots keep the member input order.
    pub fn forest(&self, scope: FamilyScope) -> Forest<'_> {
        let roots: Vec<&MemberNode> = self
            .nodes()
            .filter(|node| scope.contains(&node.member))
            .filter(|node| {
                !node.parents.iter().any(|parent| {
                    self.get(parent)
                        .map_or(false, |p| scope.contains(&p.member))
                })
            })
            .collect();

        Forest {
            graph: self,
            scope,
            roots,
        }
    }

    /// Walks the descendants of a single member, as if it were a root.
    /// An unknown id yields an empty walk.
    pub fn walk_from(&self, id: &str) -> ForestWalk<'_> {
        ForestWalk::new(self, self.get(id).into_iter().collect())
    }
}

impl<'g> Forest<'g> {
    pub fn scope(&self) -> &FamilyScope {
        &self.scope
    }

    pub fn roots(&self) -> &[&'g MemberNode] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Returns a lazy depth-first walk over every tree in the forest.
    pub fn walk(&self) -> ForestWalk<'g> {
        ForestWalk::new(self.graph, self.roots.clone())
    }

    /// Materializes every tree in the forest as nested nodes.
    ///
    /// Built by folding the walk, so it shares the walk's cycle handling
    /// and never recurses per generation.
    pub fn trees(&self) -> Vec<TreeNode<'g>> {
        let mut trees = Vec::with_capacity(self.roots.len());
        // Open nodes along the current path; index equals depth.
        let mut open: Vec<TreeNode<'g>> = Vec::new();

        for entry in self.walk() {
            match entry.role {
                TreeRole::Spouse => {
                    if let Some(partner) = open.last_mut() {
                        partner.spouses.push(entry.member);
                    }
                }
                TreeRole::Root | TreeRole::Child => {
                    while open.len() > entry.depth {
                        close_node(&mut open, &mut trees);
                    }
                    open.push(TreeNode::new(entry.member));
                }
            }
        }

        while !open.is_empty() {
            close_node(&mut open, &mut trees);
        }
        trees
    }
}

/// How an entry in a walk relates to the member it hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeRole {
    Root,
    Spouse,
    Child,
}

/// One step of a forest walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TreeEntry<'g> {
    pub member: &'g Member,
    /// Generation below the root. Spouses share their partner's depth.
    pub depth: usize,
    pub role: TreeRole,
    /// The partner of a spouse or the parent of a child. `None` for roots.
    pub anchor: Option<&'g str>,
}

enum Step<'g> {
    Enter {
        node: &'g MemberNode,
        depth: usize,
        role: TreeRole,
        anchor: Option<&'g str>,
    },
    Spouse {
        node: &'g MemberNode,
        depth: usize,
        anchor: &'g str,
    },
    Leave(&'g str),
}

/// A lazy, finite, depth-first walk over one or more trees.
///
/// The walk uses an explicit stack, so deep lineages never grow the call
/// stack. It cannot be restarted; ask the forest for a new one.
pub struct ForestWalk<'g> {
    graph: &'g FamilyGraph,
    stack: Vec<Step<'g>>,
    /// Members on the current root-to-node path.
    path: HashSet<&'g str>,
}

impl<'g> ForestWalk<'g> {
    fn new(graph: &'g FamilyGraph, roots: Vec<&'g MemberNode>) -> Self {
        let stack = roots
            .into_iter()
            .rev()
            .map(|node| Step::Enter {
                node,
                depth: 0,
                role: TreeRole::Root,
                anchor: None,
            })
            .collect();

        Self {
            graph,
            stack,
            path: HashSet::new(),
        }
    }
}

impl<'g> Iterator for ForestWalk<'g> {
    type Item = TreeEntry<'g>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Step::Leave(id) => {
                    self.path.remove(id);
                }
                Step::Spouse {
                    node,
                    depth,
                    anchor,
                } => {
                    return Some(TreeEntry {
                        member: &node.member,
                        depth,
                        role: TreeRole::Spouse,
                        anchor: Some(anchor),
                    });
                }
                Step::Enter {
                    node,
                    depth,
                    role,
                    anchor,
                } => {
                    let id = node.id();
                    if !self.path.insert(id) {
                        trace!("Lineage loops back to {}; not re-entering", id);
                        continue;
                    }

                    // Pushed in reverse: spouses pop first, then children, then Leave.
                    self.stack.push(Step::Leave(id));
                    for child in node.children.iter().rev() {
                        if let Some(child) = self.graph.get(child) {
                            self.stack.push(Step::Enter {
                                node: child,
                                depth: depth + 1,
                                role: TreeRole::Child,
                                anchor: Some(id),
                            });
                        }
                    }
                    for spouse in node.spouses.iter().rev() {
                        if let Some(spouse) = self.graph.get(spouse) {
                            self.stack.push(Step::Spouse {
                                node: spouse,
                                depth,
                                anchor: id,
                            });
                        }
                    }

                    return Some(TreeEntry {
                        member: &node.member,
                        depth,
                        role,
                        anchor,
                    });
                }
            }
        }
    }
}

/// A materialized tree node for renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<'g> {
    pub member: &'g Member,
    pub spouses: Vec<&'g Member>,
    pub children: Vec<TreeNode<'g>>,
}

impl<'g> TreeNode<'g> {
    fn new(member: &'g Member) -> Self {
        Self {
            member,
            spouses: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Number of members in this subtree, spouses included.
    pub fn size(&self) -> usize {
        let mut size = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            size += 1 + node.spouses.len();
            pending.extend(node.children.iter());
        }
        size
    }
}

// Unlinks children before they drop, so a long lineage is freed without
// one drop frame per generation.
impl Drop for TreeNode<'_> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Pops the deepest open node and attaches it to its parent, or to the
/// finished trees when it is a root.
fn close_node<'g>(open: &mut Vec<TreeNode<'g>>, trees: &mut Vec<TreeNode<'g>>) {
    if let Some(node) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => trees.push(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kintree_core::RelationshipEdge;

    fn member(id: &str, family: &str) -> Member {
        Member::new(id, family, id.to_uppercase())
    }

    fn edge(a: &str, b: &str, kind: &str) -> RelationshipEdge {
        RelationshipEdge::new(format!("{}-{}-{}", a, kind, b), a, b, kind)
    }

    fn graph(ids: &[&str], edges: &[RelationshipEdge]) -> FamilyGraph {
        FamilyGraph::build(ids.iter().map(|id| member(id, "f1")), edges)
    }

    fn walk_ids<'g>(walk: ForestWalk<'g>) -> Vec<(&'g str, usize, TreeRole)> {
        walk.map(|e| (e.member.id.as_str(), e.depth, e.role))
            .collect()
    }

    #[test]
    fn test_chain_has_single_root() {
        let g = graph(&["a", "b", "c"], &[edge("a", "b", "father"), edge("b", "c", "father")]);
        let forest = g.forest(FamilyScope::All);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest.roots()[0].id(), "a");
        assert_eq!(g.get("a").unwrap().children, vec!["b"]);
        assert_eq!(g.get("b").unwrap().children, vec!["c"]);
        assert!(g.get("c").unwrap().children.is_empty());

        assert_eq!(
            walk_ids(forest.walk()),
            vec![
                ("a", 0, TreeRole::Root),
                ("b", 1, TreeRole::Child),
                ("c", 2, TreeRole::Child),
            ]
        );
    }

    #[test]
    fn test_roots_are_parentless_members() {
        let g = graph(&["a", "b", "c"], &[edge("a", "c", "father")]);
        let forest = g.forest(FamilyScope::All);
        let roots: Vec<_> = forest.roots().iter().map(|n| n.id()).collect();
        assert_eq!(roots, vec!["a", "b"]);

        let g = graph(&["a", "b", "c"], &[edge("c", "b", "son")]);
        let roots: Vec<_> = g
            .forest(FamilyScope::All)
            .roots()
            .iter()
            .map(|n| n.id())
            .collect();
        assert_eq!(roots, vec!["a", "b"]);
        let trees = g.forest(FamilyScope::All).trees();
        assert_eq!(trees[0].size(), 1);
        assert_eq!(trees[1].children[0].member.id, "c");
    }

    #[test]
    fn test_spouses_come_before_children() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[
                edge("a", "b", "spouse"),
                edge("a", "c", "father"),
                edge("b", "c", "mother"),
                edge("d", "a", "daughter"),
            ],
        );
        let forest = g.forest(FamilyScope::All);

        let roots: Vec<_> = forest.roots().iter().map(|n| n.id()).collect();
        assert_eq!(roots, vec!["a", "b"]);

        let entries: Vec<_> = forest.walk().take(4).collect();
        assert_eq!(entries[0].member.id, "a");
        assert_eq!(entries[1].member.id, "b");
        assert_eq!(entries[1].role, TreeRole::Spouse);
        assert_eq!(entries[1].anchor, Some("a"));
        assert_eq!(entries[1].depth, 0);
        assert_eq!(entries[2].member.id, "c");
        assert_eq!(entries[3].member.id, "d");
        assert_eq!(entries[3].anchor, Some("a"));
    }

    #[test]
    fn test_spouses_are_not_expanded() {
        let g = graph(
            &["a", "b", "c"],
            &[edge("a", "b", "spouse"), edge("b", "c", "mother")],
        );
        let walk: Vec<_> = walk_ids(g.walk_from("a"));

        assert_eq!(walk, vec![("a", 0, TreeRole::Root), ("b", 0, TreeRole::Spouse)]);
    }

    #[test]
    fn test_cycle_terminates() {
        let g = graph(&["a", "b"], &[edge("a", "b", "father"), edge("b", "a", "father")]);

        // Both members have a parent, so neither is a root.
        assert!(g.forest(FamilyScope::All).is_empty());

        let walk = walk_ids(g.walk_from("a"));
        assert_eq!(walk, vec![("a", 0, TreeRole::Root), ("b", 1, TreeRole::Child)]);

        let trees = g.forest(FamilyScope::All).trees();
        assert!(trees.is_empty());
    }

    #[test]
    fn test_cycle_in_materialized_tree() {
        let g = graph(
            &["root", "a", "b"],
            &[
                edge("root", "a", "father"),
                edge("a", "b", "father"),
                edge("b", "a", "father"),
            ],
        );
        let trees = g.forest(FamilyScope::All).trees();

        assert_eq!(trees.len(), 1);
        let a = &trees[0].children[0];
        assert_eq!(a.member.id, "a");
        assert_eq!(a.children[0].member.id, "b");
        assert!(a.children[0].children.is_empty());
        assert_eq!(trees[0].size(), 3);
    }

    #[test]
    fn test_shared_descendant_appears_under_each_parent() {
        // Not a cycle: d is reachable through both b and c.
        let g = graph(
            &["a", "b", "c", "d"],
            &[
                edge("a", "b", "father"),
                edge("a", "c", "father"),
                edge("b", "d", "father"),
                edge("c", "d", "mother"),
            ],
        );
        let ids: Vec<_> = g
            .forest(FamilyScope::All)
            .walk()
            .map(|e| e.member.id.clone())
            .collect();

        assert_eq!(ids, vec!["a", "b", "d", "c", "d"]);
    }

    #[test]
    fn test_family_scope() {
        let members = vec![
            member("a", "f1"),
            member("b", "f2"),
            member("c", "f2"),
            member("d", "f2"),
        ];
        let edges = vec![edge("a", "b", "father"), edge("c", "d", "mother")];
        let g = FamilyGraph::build(members, &edges);

        let f2 = g.forest(FamilyScope::Family("f2".into()));
        let roots: Vec<_> = f2.roots().iter().map(|n| n.id()).collect();
        // b's only parent lives in f1, so within f2 it is a root.
        assert_eq!(roots, vec!["b", "c"]);

        let all = g.forest(FamilyScope::All);
        let roots: Vec<_> = all.roots().iter().map(|n| n.id()).collect();
        assert_eq!(roots, vec!["a", "c"]);

        assert!(g.forest(FamilyScope::Family("none".into())).is_empty());
    }

    #[test]
    fn test_trees_serialize_nested() {
        let g = graph(
            &["a", "b", "c"],
            &[edge("a", "b", "spouse"), edge("a", "c", "mother")],
        );
        let value = serde_json::to_value(g.forest(FamilyScope::All).trees()).unwrap();

        // b has no parent, so it roots its own tree as well.
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[1]["member"]["id"], "b");
        assert_eq!(value[0]["member"]["id"], "a");
        assert_eq!(value[0]["spouses"][0]["id"], "b");
        assert_eq!(value[0]["children"][0]["member"]["id"], "c");
        assert_eq!(value[0]["children"][0]["children"], serde_json::json!([]));
    }

    #[test]
    fn test_deep_lineage_materializes() {
        let ids: Vec<String> = (0..5000).map(|i| format!("m{}", i)).collect();
        let edges: Vec<_> = ids
            .windows(2)
            .map(|pair| edge(&pair[0], &pair[1], "father"))
            .collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let g = graph(&refs, &edges);

        let forest = g.forest(FamilyScope::All);
        assert_eq!(forest.walk().count(), 5000);

        let trees = forest.trees();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].size(), 5000);

        let mut depth = 0;
        let mut node = &trees[0];
        while let Some(child) = node.children.first() {
            assert!(child.children.len() <= 1);
            node = child;
            depth += 1;
        }
        assert_eq!(depth, 4999);
        assert_eq!(node.member.id, "m4999");
    }

    #[test]
    fn test_empty_graph() {
        let g = FamilyGraph::new();
        assert!(g.forest(FamilyScope::All).is_empty());
        assert_eq!(g.forest(FamilyScope::All).walk().count(), 0);
        assert_eq!(g.walk_from("nobody").count(), 0);
    }

    #[test]
    fn test_scope_from_option() {
        assert_eq!(FamilyScope::from_option(None::<String>), FamilyScope::All);
        assert_eq!(
            FamilyScope::from_option(Some("f1")),
            FamilyScope::Family("f1".to_string())
        );
    }
}
