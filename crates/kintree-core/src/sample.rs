//! Built-in sample data.
//!
//! Three village families with two generations each, used to seed an
//! empty store and as a fixture in tests.

use crate::record::{Family, Gender, Member, RelationshipEdge};
use crate::snapshot::Snapshot;

/// Returns the sample snapshot: 3 families, 10 members, 10 relationships.
pub fn sample_snapshot() -> Snapshot {
    let families = vec![
        Family::new("gupta", "गुप्ता परिवार").with_description("Village's oldest family"),
        Family::new("sharma", "शर्मा परिवार").with_description("Known for their farming expertise"),
        Family::new("verma", "वर्मा परिवार").with_description("Skilled craftsmen and artisans"),
    ];

    let person = |id: &str, family: &str, name: &str, age: u32, occupation: &str, gender: Gender| {
        Member::new(id, family, name)
            .with_age(age)
            .with_occupation(occupation)
            .with_gender(gender)
    };

    let members = vec![
        person("ram", "gupta", "राम गुप्ता", 65, "सरपंच", Gender::Male),
        person("sita", "gupta", "सीता गुप्ता", 60, "गृहिणी", Gender::Female),
        person("amit", "gupta", "अमित गुप्ता", 35, "शिक्षक", Gender::Male),
        person("priya", "gupta", "प्रिया गुप्ता", 30, "नर्स", Gender::Female),
        person("krishna", "sharma", "कृष्ण शर्मा", 58, "किसान", Gender::Male),
        person("radha", "sharma", "राधा शर्मा", 55, "गृहिणी", Gender::Female),
        person("vikas", "sharma", "विकास शर्मा", 32, "किसान", Gender::Male),
        person("mohan", "verma", "मोहन वर्मा", 62, "बढ़ई", Gender::Male),
        person("geeta", "verma", "गीता वर्मा", 58, "गृहिणी", Gender::Female),
        person("rohit", "verma", "रोहित वर्मा", 28, "बढ़ई", Gender::Male),
    ];

    let links = [
        ("ram", "sita", "spouse"),
        ("ram", "amit", "father"),
        ("sita", "amit", "mother"),
        ("amit", "priya", "spouse"),
        ("krishna", "radha", "spouse"),
        ("krishna", "vikas", "father"),
        ("radha", "vikas", "mother"),
        ("mohan", "geeta", "spouse"),
        ("mohan", "rohit", "father"),
        ("geeta", "rohit", "mother"),
    ];

    let relationships = links
        .iter()
        .enumerate()
        .map(|(i, (a, b, kind))| RelationshipEdge::new(format!("rel-{}", i + 1), *a, *b, *kind))
        .collect();

    Snapshot {
        families,
        members,
        relationships,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_shape() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.families.len(), 3);
        assert_eq!(snapshot.members.len(), 10);
        assert_eq!(snapshot.relationships.len(), 10);
    }

    #[test]
    fn test_sample_edges_reference_known_members() {
        let snapshot = sample_snapshot();
        for edge in &snapshot.relationships {
            assert!(snapshot.member(&edge.member1_id).is_some());
            assert!(snapshot.member(&edge.member2_id).is_some());
        }
        for member in &snapshot.members {
            assert!(snapshot.family(&member.family_id).is_some());
        }
    }
}
