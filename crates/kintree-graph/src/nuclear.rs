//! The "individual family" view of a single member.
//!
//! A nuclear family is the member, their spouses and their direct
//! children. Parents, siblings and grandchildren are left out.

use crate::graph::FamilyGraph;
use kintree_core::Member;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NuclearFamily<'g> {
    pub seed: Option<&'g Member>,
    pub spouses: Vec<&'g Member>,
    pub children: Vec<&'g Member>,
}

impl FamilyGraph {
    /// Extracts the nuclear family around `seed`. An unknown seed gives an
    /// empty family.
    pub fn nuclear_family(&self, seed: &str) -> NuclearFamily<'_> {
        let Some(node) = self.get(seed) else {
            return NuclearFamily::default();
        };

        NuclearFamily {
            seed: Some(&node.member),
            spouses: self.spouses_of(seed).into_iter().map(|n| &n.member).collect(),
            children: self.children_of(seed).into_iter().map(|n| &n.member).collect(),
        }
    }
}

impl<'g> NuclearFamily<'g> {
    /// All members of the family, seed first, then spouses, then children.
    /// A member listed in more than one role appears once, at its first
    /// position.
    pub fn members(&self) -> Vec<&'g Member> {
        let mut seen = HashSet::new();
        self.seed
            .into_iter()
            .chain(self.spouses.iter().copied())
            .chain(self.children.iter().copied())
            .filter(|member| seen.insert(member.id.as_str()))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members().iter().any(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seed.is_none()
    }
}
