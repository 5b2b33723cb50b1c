//! Snapshots of the record collections.
//!
//! A snapshot is everything needed to answer one query: the families,
//! the members and the raw relationship edges, exactly as the
//! persistence layer listed them. Derived structures are built from a
//! snapshot and thrown away with it.

use crate::error::Result;
use crate::record::{Family, Member, RelationshipEdge};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read access to the record collections.
///
/// This is the contract Kintree expects from whatever stores the
/// records. Listing order matters: trees and search results preserve it.
pub trait SnapshotSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists members, optionally restricted to one family.
    fn list_members(&self, family_id: Option<&str>) -> std::result::Result<Vec<Member>, Self::Error>;

    fn list_families(&self) -> std::result::Result<Vec<Family>, Self::Error>;

    fn list_relationships(&self) -> std::result::Result<Vec<RelationshipEdge>, Self::Error>;

    /// Lists every edge with `member_id` on either side.
    fn member_relationships(
        &self,
        member_id: &str,
    ) -> std::result::Result<Vec<RelationshipEdge>, Self::Error> {
        Ok(self
            .list_relationships()?
            .into_iter()
            .filter(|edge| edge.involves(member_id))
            .collect())
    }

    /// Takes a full snapshot of all three collections.
    fn snapshot(&self) -> std::result::Result<Snapshot, Self::Error> {
        Ok(Snapshot {
            families: self.list_families()?,
            members: self.list_members(None)?,
            relationships: self.list_relationships()?,
        })
    }
}

/// An in-memory copy of the record collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub families: Vec<Family>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub relationships: Vec<RelationshipEdge>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let snapshot = Self::from_json_str(&text)?;
        debug!(
            "Loaded snapshot from {}: {} families, {} members, {} relationships",
            path.display(),
            snapshot.families.len(),
            snapshot.members.len(),
            snapshot.relationships.len()
        );
        Ok(snapshot)
    }

    /// Writes the snapshot as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty() && self.members.is_empty() && self.relationships.is_empty()
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn family(&self, id: &str) -> Option<&Family> {
        self.families.iter().find(|f| f.id == id)
    }
}

impl SnapshotSource for Snapshot {
    type Error = std::convert::Infallible;

    fn list_members(
        &self,
        family_id: Option<&str>,
    ) -> std::result::Result<Vec<Member>, Self::Error> {
        Ok(self
            .members
            .iter()
            .filter(|m| family_id.map_or(true, |f| m.family_id == f))
            .cloned()
            .collect())
    }

    fn list_families(&self) -> std::result::Result<Vec<Family>, Self::Error> {
        Ok(self.families.clone())
    }

    fn list_relationships(&self) -> std::result::Result<Vec<RelationshipEdge>, Self::Error> {
        Ok(self.relationships.clone())
    }

    fn snapshot(&self) -> std::result::Result<Snapshot, Self::Error> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Gender;
    use tempfile::tempdir;

    fn small() -> Snapshot {
        Snapshot {
            families: vec![Family::new("f1", "Sharma"), Family::new("f2", "Verma")],
            members: vec![
                Member::new("a", "f1", "Krishna Sharma"),
                Member::new("b", "f2", "Mohan Verma"),
                Member::new("c", "f1", "Vikas Sharma"),
            ],
            relationships: vec![
                RelationshipEdge::new("r1", "a", "c", "father"),
                RelationshipEdge::new("r2", "b", "x", "spouse"),
            ],
        }
    }

    #[test]
    fn test_list_members_by_family_keeps_order() {
        let snapshot = small();
        let members = snapshot.list_members(Some("f1")).unwrap();
        let ids: Vec<_> = members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert_eq!(snapshot.list_members(None).unwrap().len(), 3);
        assert!(snapshot.list_members(Some("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_member_relationships() {
        let snapshot = small();
        let edges = snapshot.member_relationships("c").unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].id, "r1");
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let snapshot = Snapshot::from_json_str(r#"{"members": []}"#).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_form_entered_genders_load() {
        let json = r#"{
            "members": [
                {"id": "a", "family_id": "f1", "name": "राम", "gender": "पुरुष"},
                {"id": "b", "family_id": "f1", "name": "सीता", "gender": ""},
                {"id": "c", "family_id": "f1", "name": "अमित", "gender": "other"}
            ]
        }"#;
        let snapshot = Snapshot::from_json_str(json).unwrap();

        let genders: Vec<_> = snapshot.members.iter().map(|m| m.gender).collect();
        assert_eq!(genders, vec![Some(Gender::Male), None, None]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let snapshot = small();
        snapshot.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.member("b").unwrap().name, "Mohan Verma");
        assert!(loaded.family("f3").is_none());
    }
}
