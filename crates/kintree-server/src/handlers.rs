//! Request handlers for protocol methods.
//!
//! Each handler implements one method. Handlers take a fresh snapshot
//! from the source and build whatever derived view they answer with.

use crate::protocol::{codes, ForestParams, MemberParams, MembersParams, Response, SearchParams};
use kintree_core::{Member, RelationshipEdge, SnapshotSource};
use kintree_graph::{FamilyGraph, FamilyScope, GraphBuilder, SearchIndex};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

fn source_error(id: Option<Value>, e: impl std::fmt::Display) -> Response {
    Response::error(id, codes::SOURCE_UNAVAILABLE, format!("Snapshot source failed: {}", e))
}

/// Handles the graph.info method.
pub fn handle_info<S: SnapshotSource>(source: &S, id: Option<Value>) -> Response {
    let snapshot = match source.snapshot() {
        Ok(s) => s,
        Err(e) => return source_error(id, e),
    };

    let mut builder = GraphBuilder::new();
    builder.add_members(snapshot.members);
    builder.add_edges(&snapshot.relationships);
    let (graph, report) = builder.build_with_report();

    Response::success(
        id,
        serde_json::json!({
            "families": snapshot.families.len(),
            "relationships": snapshot.relationships.len(),
            "stats": graph.stats(),
            "build": report,
            "lineageCycles": graph.lineage_cycles(),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Handles the families.list method.
pub fn handle_families<S: SnapshotSource>(source: &S, id: Option<Value>) -> Response {
    match source.list_families() {
        Ok(families) => Response::success(id, families),
        Err(e) => source_error(id, e),
    }
}

/// Handles the members.list method.
pub fn handle_members<S: SnapshotSource>(
    source: &S,
    id: Option<Value>,
    params: MembersParams,
) -> Response {
    match source.list_members(params.family.as_deref()) {
        Ok(members) => Response::success(id, members),
        Err(e) => source_error(id, e),
    }
}

/// Handles the tree.forest method.
pub fn handle_forest<S: SnapshotSource>(
    source: &S,
    id: Option<Value>,
    params: ForestParams,
) -> Response {
    let start = Instant::now();
    let snapshot = match source.snapshot() {
        Ok(s) => s,
        Err(e) => return source_error(id, e),
    };

    debug!("Forest request for {:?}", params.family);

    // Children may belong to another family, so the graph always spans
    // every member; the scope only picks the roots.
    let graph = FamilyGraph::build(snapshot.members, &snapshot.relationships);
    let forest = graph.forest(FamilyScope::from_option(params.family));
    let trees = forest.trees();

    Response::success(
        id,
        serde_json::json!({
            "scope": forest.scope(),
            "roots": forest.len(),
            "trees": trees,
            "queryTime": start.elapsed().as_millis() as u64
        }),
    )
}

/// Handles the tree.nuclear method. An unknown member yields an empty
/// family rather than an error.
pub fn handle_nuclear<S: SnapshotSource>(
    source: &S,
    id: Option<Value>,
    params: MemberParams,
) -> Response {
    let snapshot = match source.snapshot() {
        Ok(s) => s,
        Err(e) => return source_error(id, e),
    };

    let graph = FamilyGraph::build(snapshot.members, &snapshot.relationships);
    let family = graph.nuclear_family(&params.member);

    #[derive(Serialize)]
    struct NuclearResult<'g> {
        seed: Option<&'g Member>,
        spouses: Vec<&'g Member>,
        children: Vec<&'g Member>,
        members: Vec<&'g Member>,
    }

    Response::success(
        id,
        NuclearResult {
            seed: family.seed,
            members: family.members(),
            spouses: family.spouses,
            children: family.children,
        },
    )
}

/// Handles the member.relationships method. An unknown member has no
/// relationships.
pub fn handle_member_relationships<S: SnapshotSource>(
    source: &S,
    id: Option<Value>,
    params: MemberParams,
) -> Response {
    let (edges, members) = match (
        source.member_relationships(&params.member),
        source.list_members(None),
    ) {
        (Ok(edges), Ok(members)) => (edges, members),
        (Err(e), _) | (_, Err(e)) => return source_error(id, e),
    };

    #[derive(Serialize)]
    struct RelatedEntry<'a> {
        relationship: &'a RelationshipEdge,
        #[serde(rename = "relatedMember")]
        related_member: Option<&'a Member>,
    }

    let entries: Vec<_> = edges
        .iter()
        .map(|edge| RelatedEntry {
            relationship: edge,
            related_member: edge
                .other_member(&params.member)
                .and_then(|other| members.iter().find(|m| m.id == other)),
        })
        .collect();

    Response::success(id, entries)
}

/// Handles the search method.
pub fn handle_search<S: SnapshotSource>(
    source: &S,
    id: Option<Value>,
    params: SearchParams,
) -> Response {
    let (members, families) = match (source.list_members(None), source.list_families()) {
        (Ok(members), Ok(families)) => (members, families),
        (Err(e), _) | (_, Err(e)) => return source_error(id, e),
    };

    debug!("Search: {}", params.query);

    let index = SearchIndex::new(&members, &families);
    Response::success(id, index.search_limited(&params.query, params.limit))
}
