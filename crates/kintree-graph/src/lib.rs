//! Kintree Graph - Family relationship management
//!
//! This crate turns a flat list of relationship edges into a family
//! forest. It provides the resolved member graph, per-family trees,
//! the nuclear family of a single member and substring search over
//! members and families.
//!
//! # Architecture
//!
//! The graph is an id-keyed arena of [`MemberNode`]s. Each node lists
//! the ids of its children, spouses and parents, so nodes never hold
//! references to each other. On top of the arena:
//! - [`Forest`] picks the roots of a family scope and walks them
//!   depth-first without ever re-entering a member on the current path
//! - [`NuclearFamily`] collects a member with spouses and direct children
//! - [`SearchIndex`] answers case-insensitive substring queries
//!
//! Everything is rebuilt from a fresh snapshot per query.
//!
//! # Example
//!
//! ```
//! use kintree_core::{Member, RelationshipEdge};
//! use kintree_graph::{FamilyGraph, FamilyScope};
//!
//! let members = vec![
//!     Member::new("ram", "gupta", "Ram Gupta"),
//!     Member::new("amit", "gupta", "Amit Gupta"),
//! ];
//! let edges = vec![RelationshipEdge::new("r1", "ram", "amit", "father")];
//!
//! let graph = FamilyGraph::build(members, &edges);
//! let forest = graph.forest(FamilyScope::All);
//! assert_eq!(forest.roots()[0].id(), "ram");
//! ```

mod builder;
mod forest;
mod graph;
mod nuclear;
mod search_index;
mod store;

pub use builder::{BuildReport, GraphBuilder};
pub use forest::{FamilyScope, Forest, ForestWalk, TreeEntry, TreeNode, TreeRole};
pub use graph::{FamilyGraph, GraphStats, MemberNode};
pub use nuclear::NuclearFamily;
pub use search_index::{search, SearchIndex, SearchResult};
pub use store::{SnapshotStore, StoreError};
