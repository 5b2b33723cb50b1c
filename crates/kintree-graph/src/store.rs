//! Persistent snapshot store backed by sled.
//!
//! Each collection is stored as one bincode-encoded list, so listing
//! order is exactly insertion order.

use kintree_core::{Family, Member, RelationshipEdge, Snapshot, SnapshotSource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const FAMILIES_KEY: &str = "families";
const MEMBERS_KEY: &str = "members";
const RELATIONSHIPS_KEY: &str = "relationships";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Member not found: {0}")]
    MemberNotFound(String),
    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),
}

pub struct SnapshotStore {
    db: Db,
}

impl SnapshotStore {
    /// Opens or creates a snapshot store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        match self.db.get(key)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn write<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let bytes = bincode::serialize(items)?;
        self.db.insert(key, bytes)?;
        Ok(())
    }

    /// Replaces everything in the store with the snapshot.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.write(FAMILIES_KEY, &snapshot.families)?;
        self.write(MEMBERS_KEY, &snapshot.members)?;
        self.write(RELATIONSHIPS_KEY, &snapshot.relationships)?;
        self.db.flush()?;

        info!(
            "Saved snapshot: {} families, {} members, {} relationships",
            snapshot.families.len(),
            snapshot.members.len(),
            snapshot.relationships.len()
        );
        Ok(())
    }

    /// Loads the full snapshot. An empty store gives an empty snapshot.
    pub fn load_snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(Snapshot {
            families: self.read(FAMILIES_KEY)?,
            members: self.read(MEMBERS_KEY)?,
            relationships: self.read(RELATIONSHIPS_KEY)?,
        })
    }

    /// Inserts a family, or replaces the one with the same id in place.
    pub fn upsert_family(&self, family: Family) -> Result<(), StoreError> {
        let mut families: Vec<Family> = self.read(FAMILIES_KEY)?;
        match families.iter_mut().find(|f| f.id == family.id) {
            Some(existing) => *existing = family,
            None => families.push(family),
        }
        self.write(FAMILIES_KEY, &families)?;
        self.db.flush()?;
        Ok(())
    }

    /// Inserts a member, or replaces the one with the same id in place.
    pub fn upsert_member(&self, member: Member) -> Result<(), StoreError> {
        let mut members: Vec<Member> = self.read(MEMBERS_KEY)?;
        match members.iter_mut().find(|m| m.id == member.id) {
            Some(existing) => *existing = member,
            None => members.push(member),
        }
        self.write(MEMBERS_KEY, &members)?;
        self.db.flush()?;
        Ok(())
    }

    /// Appends a relationship edge. Endpoints and type are not checked;
    /// the graph builder skips edges it cannot use.
    pub fn add_relationship(&self, edge: RelationshipEdge) -> Result<(), StoreError> {
        let mut edges: Vec<RelationshipEdge> = self.read(RELATIONSHIPS_KEY)?;
        edges.push(edge);
        self.write(RELATIONSHIPS_KEY, &edges)?;
        self.db.flush()?;
        Ok(())
    }

    /// Removes a member and every relationship involving it.
    ///
    /// Returns the number of relationships removed with the member.
    pub fn remove_member(&self, member_id: &str) -> Result<usize, StoreError> {
        let mut members: Vec<Member> = self.read(MEMBERS_KEY)?;
        let before = members.len();
        members.retain(|m| m.id != member_id);
        if members.len() == before {
            return Err(StoreError::MemberNotFound(member_id.to_string()));
        }

        let mut edges: Vec<RelationshipEdge> = self.read(RELATIONSHIPS_KEY)?;
        let edges_before = edges.len();
        edges.retain(|e| !e.involves(member_id));
        let removed = edges_before - edges.len();

        self.write(RELATIONSHIPS_KEY, &edges)?;
        self.write(MEMBERS_KEY, &members)?;
        self.db.flush()?;

        debug!(
            "Removed member {} and {} relationships",
            member_id, removed
        );
        Ok(removed)
    }

    /// Removes a single relationship edge.
    pub fn remove_relationship(&self, relationship_id: &str) -> Result<(), StoreError> {
        let mut edges: Vec<RelationshipEdge> = self.read(RELATIONSHIPS_KEY)?;
        let before = edges.len();
        edges.retain(|e| e.id != relationship_id);
        if edges.len() == before {
            return Err(StoreError::RelationshipNotFound(relationship_id.to_string()));
        }
        self.write(RELATIONSHIPS_KEY, &edges)?;
        self.db.flush()?;
        Ok(())
    }

    /// Returns true if no family has been stored.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read::<Family>(FAMILIES_KEY)?.is_empty())
    }
}

impl SnapshotSource for SnapshotStore {
    type Error = StoreError;

    fn list_members(&self, family_id: Option<&str>) -> Result<Vec<Member>, StoreError> {
        let members: Vec<Member> = self.read(MEMBERS_KEY)?;
        Ok(match family_id {
            Some(family) => members
                .into_iter()
                .filter(|m| m.family_id == family)
                .collect(),
            None => members,
        })
    }

    fn list_families(&self) -> Result<Vec<Family>, StoreError> {
        self.read(FAMILIES_KEY)
    }

    fn list_relationships(&self) -> Result<Vec<RelationshipEdge>, StoreError> {
        self.read(RELATIONSHIPS_KEY)
    }

    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        self.load_snapshot()
    }
}
