//! Record types owned by the persistence layer.
//!
//! These mirror the JSON documents returned by the member, family and
//! relationship listings. Kintree never mutates them; it only reads a
//! snapshot and derives trees from it.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of a member record.
pub type MemberId = String;

/// Identifier of a family record.
pub type FamilyId = String;

/// Gender of a member.
///
/// Records are often entered with Hindi labels, so those are
/// accepted on input as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[serde(alias = "Male", alias = "पुरुष")]
    Male,
    #[serde(alias = "Female", alias = "महिला")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "पुरुष" => Ok(Gender::Male),
            "female" | "महिला" => Ok(Gender::Female),
            _ => Err(CoreError::UnknownGender(s.to_string())),
        }
    }
}

/// Reads gender as a free-form label. Forms submit `""` for an unset
/// gender, and a bad label must not reject the whole record.
mod gender_label {
    use super::*;
    use tracing::debug;

    pub fn serialize<S: Serializer>(
        gender: &Option<Gender>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        gender.map(|g| g.as_str()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Gender>, D::Error> {
        let label: Option<String> = Option::deserialize(deserializer)?;
        Ok(label.and_then(|label| match label.parse() {
            Ok(gender) => Some(gender),
            Err(_) => {
                if !label.trim().is_empty() {
                    debug!("Ignoring unknown gender label {:?}", label);
                }
                None
            }
        }))
    }
}

/// A person belonging to exactly one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub family_id: FamilyId,
    pub name: String,
    pub age: Option<u32>,
    pub occupation: Option<String>,
    pub contact: Option<String>,
    pub photo_url: Option<String>,
    /// Blank or unrecognized labels read as `None`.
    #[serde(default, with = "gender_label")]
    pub gender: Option<Gender>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Member {
    /// Creates a member with only the required fields set.
    pub fn new(
        id: impl Into<MemberId>,
        family_id: impl Into<FamilyId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            family_id: family_id.into(),
            name: name.into(),
            age: None,
            occupation: None,
            contact: None,
            photo_url: None,
            gender: None,
            created_at: None,
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_occupation(mut self, occupation: impl Into<String>) -> Self {
        self.occupation = Some(occupation.into());
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }
}

/// A named grouping of members. Families take no part in the
/// relationship graph itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Family {
    pub fn new(id: impl Into<FamilyId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            created_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A raw, typed association between two members.
///
/// `relationship_type` is kept as the wire string. Interpreting it is the
/// job of [`crate::RelationshipKind`], which tolerates values it does not
/// recognize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub id: String,
    pub member1_id: MemberId,
    pub member2_id: MemberId,
    pub relationship_type: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl RelationshipEdge {
    pub fn new(
        id: impl Into<String>,
        member1_id: impl Into<MemberId>,
        member2_id: impl Into<MemberId>,
        relationship_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            member1_id: member1_id.into(),
            member2_id: member2_id.into(),
            relationship_type: relationship_type.into(),
            created_at: None,
        }
    }

    /// Returns true if `member_id` is on either side of the edge.
    pub fn involves(&self, member_id: &str) -> bool {
        self.member1_id == member_id || self.member2_id == member_id
    }

    /// Returns the member on the opposite side from `member_id`, or `None`
    /// if the edge does not involve that member.
    pub fn other_member(&self, member_id: &str) -> Option<&str> {
        if self.member1_id == member_id {
            Some(&self.member2_id)
        } else if self.member2_id == member_id {
            Some(&self.member1_id)
        } else {
            None
        }
    }
}
