//! Relationship kinds and their canonical direction.
//!
//! Edges arrive as free-form strings with the direction implied by the
//! word used. A father edge and a son edge can describe the same pair
//! from opposite ends, so every kind is reduced to one [`Association`]
//! before anything is built from it.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of relationship kinds Kintree understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// member1 is the father of member2.
    Father,

    /// member1 is the mother of member2.
    Mother,

    /// member1 is the son of member2.
    Son,

    /// member1 is the daughter of member2.
    Daughter,

    /// member1 and member2 are married. Symmetric.
    Spouse,

    /// Sibling edges are recorded but never shape the tree.
    Brother,
    Sister,
}

/// A relationship reduced to its structural meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Association<'a> {
    Parent { parent: &'a str, child: &'a str },
    Spouse(&'a str, &'a str),
    Ignored,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 7] = [
        Self::Father,
        Self::Mother,
        Self::Son,
        Self::Daughter,
        Self::Spouse,
        Self::Brother,
        Self::Sister,
    ];

    /// Resolves an edge `(member1, member2)` of this kind into its
    /// canonical association.
    pub fn canonicalize<'a>(&self, member1: &'a str, member2: &'a str) -> Association<'a> {
        match self {
            Self::Father | Self::Mother => Association::Parent {
                parent: member1,
                child: member2,
            },
            Self::Son | Self::Daughter => Association::Parent {
                parent: member2,
                child: member1,
            },
            Self::Spouse => Association::Spouse(member1, member2),
            Self::Brother | Self::Sister => Association::Ignored,
        }
    }

    /// Interprets a raw relationship string. Unrecognized values map to
    /// [`Association::Ignored`] rather than an error.
    pub fn resolve<'a>(raw: &str, member1: &'a str, member2: &'a str) -> Association<'a> {
        match raw.parse::<RelationshipKind>() {
            Ok(kind) => kind.canonicalize(member1, member2),
            Err(_) => Association::Ignored,
        }
    }

    /// Returns true for kinds that establish a parent/child link.
    pub fn is_lineage(&self) -> bool {
        matches!(
            self,
            Self::Father | Self::Mother | Self::Son | Self::Daughter
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Father => "father",
            Self::Mother => "mother",
            Self::Son => "son",
            Self::Daughter => "daughter",
            Self::Spouse => "spouse",
            Self::Brother => "brother",
            Self::Sister => "sister",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownRelationship(s.to_string()))
    }
}
