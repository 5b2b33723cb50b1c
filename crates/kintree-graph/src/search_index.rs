//! Search index for substring matching over members and families.
//!
//! Each bucket gets an inverted n-gram index, so a query only has to
//! verify the documents that share all of its n-grams instead of
//! scanning every record.

use kintree_core::{Family, Member};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Minimum n-gram length for indexing.
const MIN_NGRAM_LEN: usize = 2;

/// Maximum n-gram length for indexing.
const MAX_NGRAM_LEN: usize = 4;

/// Matches from one search, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub members: Vec<Member>,
    pub families: Vec<Family>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.families.is_empty()
    }
}

/// An n-gram index over one list of documents.
///
/// Documents are identified by their position in the input list, and
/// each document carries one or more lowercased text fields.
#[derive(Debug, Default, Clone)]
struct FieldIndex {
    /// Lowercased fields per document, for verifying candidates.
    fields: Vec<Vec<String>>,
    /// Maps lowercased n-grams to document positions.
    ngram_index: HashMap<String, HashSet<usize>>,
}

impl FieldIndex {
    /// Indexes a document and returns its position.
    fn insert<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> usize {
        let position = self.fields.len();
        let lowered: Vec<String> = fields.into_iter().map(str::to_lowercase).collect();

        for field in &lowered {
            for ngram in generate_ngrams(field) {
                self.ngram_index.entry(ngram).or_default().insert(position);
            }
        }

        self.fields.push(lowered);
        position
    }

    fn matches(&self, position: usize, query_lower: &str) -> bool {
        self.fields[position]
            .iter()
            .any(|field| field.contains(query_lower))
    }

    /// Returns positions of documents with a field containing the query,
    /// in ascending order.
    fn search(&self, query_lower: &str) -> Vec<usize> {
        // Too short to have n-grams: scan.
        if query_lower.chars().count() < MIN_NGRAM_LEN {
            return (0..self.fields.len())
                .filter(|&position| self.matches(position, query_lower))
                .collect();
        }

        let mut candidates: Option<HashSet<usize>> = None;

        for ngram in generate_ngrams(query_lower) {
            let Some(positions) = self.ngram_index.get(&ngram) else {
                // If any n-gram has no matches, the query has no results
                return Vec::new();
            };
            match &mut candidates {
                None => candidates = Some(positions.clone()),
                Some(c) => c.retain(|position| positions.contains(position)),
            }
        }

        // n-gram intersection can have false positives
        let mut results: Vec<usize> = candidates
            .unwrap_or_default()
            .into_iter()
            .filter(|&position| self.matches(position, query_lower))
            .collect();

        results.sort_unstable();
        results
    }

    fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Generates n-grams for a lowercased string.
fn generate_ngrams(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut ngrams = Vec::new();

    for n in MIN_NGRAM_LEN..=MAX_NGRAM_LEN {
        if chars.len() >= n {
            for i in 0..=(chars.len() - n) {
                ngrams.push(chars[i..i + n].iter().collect());
            }
        }
    }

    ngrams
}

/// Substring search over a snapshot's members and families.
///
/// Members are matched on name and occupation, families on name and
/// description, both case-insensitively.
#[derive(Debug, Clone)]
pub struct SearchIndex<'a> {
    members: &'a [Member],
    families: &'a [Family],
    member_index: FieldIndex,
    family_index: FieldIndex,
}

impl<'a> SearchIndex<'a> {
    /// Indexes the given records.
    pub fn new(members: &'a [Member], families: &'a [Family]) -> Self {
        let mut member_index = FieldIndex::default();
        for member in members {
            member_index.insert(
                std::iter::once(member.name.as_str()).chain(member.occupation.as_deref()),
            );
        }

        let mut family_index = FieldIndex::default();
        for family in families {
            family_index.insert(
                std::iter::once(family.name.as_str()).chain(family.description.as_deref()),
            );
        }

        Self {
            members,
            families,
            member_index,
            family_index,
        }
    }

    /// Searches both buckets. A blank query matches nothing.
    pub fn search(&self, query: &str) -> SearchResult {
        self.search_limited(query, None)
    }

    /// Like `search`, keeping at most `limit` results per bucket.
    pub fn search_limited(&self, query: &str, limit: Option<usize>) -> SearchResult {
        if query.trim().is_empty() {
            return SearchResult::default();
        }

        let query_lower = query.to_lowercase();
        let limit = limit.unwrap_or(usize::MAX);

        let members = self
            .member_index
            .search(&query_lower)
            .into_iter()
            .take(limit)
            .map(|position| self.members[position].clone())
            .collect();

        let families = self
            .family_index
            .search(&query_lower)
            .into_iter()
            .take(limit)
            .map(|position| self.families[position].clone())
            .collect();

        SearchResult { members, families }
    }

    /// Returns the number of indexed records.
    pub fn len(&self) -> usize {
        self.member_index.len() + self.family_index.len()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds a throwaway index and runs one query against it.
pub fn search(query: &str, members: &[Member], families: &[Family]) -> SearchResult {
    SearchIndex::new(members, families).search(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<Member> {
        vec![
            Member::new("m1", "f1", "Vikas Sharma").with_occupation("Farmer"),
            Member::new("m2", "f1", "Radha Sharma").with_occupation("Homemaker"),
            Member::new("m3", "f2", "Rohit Verma").with_occupation("Carpenter"),
            Member::new("m4", "f2", "Geeta Verma"),
        ]
    }

    fn families() -> Vec<Family> {
        vec![
            Family::new("f1", "Sharma").with_description("Known for their farming expertise"),
            Family::new("f2", "Verma").with_description("Skilled craftsmen and artisans"),
            Family::new("f3", "Gupta"),
        ]
    }

    fn member_ids(result: &SearchResult) -> Vec<&str> {
        result.members.iter().map(|m| m.id.as_str()).collect()
    }

    fn family_ids(result: &SearchResult) -> Vec<&str> {
        result.families.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        let (members, families) = (members(), families());
        let index = SearchIndex::new(&members, &families);

        assert!(index.search("").is_empty());
        assert!(index.search("   ").is_empty());
        assert!(index.search("\t\n").is_empty());
    }

    #[test]
    fn test_search_case_insensitive() {
        let (members, families) = (members(), families());
        let index = SearchIndex::new(&members, &families);

        for query in ["vikas", "SHARMA", "farm"] {
            let result = index.search(query);
            assert!(
                member_ids(&result).contains(&"m1"),
                "query {:?} should match Vikas",
                query
            );
        }
    }

    #[test]
    fn test_buckets_are_independent() {
        let (members, families) = (members(), families());
        let index = SearchIndex::new(&members, &families);

        let result = index.search("sharma");
        assert_eq!(member_ids(&result), vec!["m1", "m2"]);
        assert_eq!(family_ids(&result), vec!["f1"]);

        let result = index.search("artisans");
        assert!(result.members.is_empty());
        assert_eq!(family_ids(&result), vec!["f2"]);

        let result = index.search("carpenter");
        assert_eq!(member_ids(&result), vec!["m3"]);
        assert!(result.families.is_empty());

        assert!(index.search("zamindar").is_empty());
    }

    #[test]
    fn test_description_and_occupation_fields() {
        let (members, families) = (members(), families());
        let result = search("farm", &members, &families);

        assert_eq!(member_ids(&result), vec!["m1"]);
        assert_eq!(family_ids(&result), vec!["f1"]);
    }

    #[test]
    fn test_short_query_scans() {
        let (members, families) = (members(), families());
        let index = SearchIndex::new(&members, &families);

        let result = index.search("g");
        assert_eq!(member_ids(&result), vec!["m4"]);
        // "farming" in the Sharma description
        assert_eq!(family_ids(&result), vec!["f1", "f3"]);
    }

    #[test]
    fn test_results_keep_input_order() {
        let members: Vec<_> = (0..20)
            .rev()
            .map(|i| Member::new(format!("m{}", i), "f1", format!("Sharma {}", i)))
            .collect();
        let result = search("sharma", &members, &[]);

        let expected: Vec<_> = members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(member_ids(&result), expected);
    }

    #[test]
    fn test_limit_applies_per_bucket() {
        let (members, families) = (members(), families());
        let index = SearchIndex::new(&members, &families);

        let result = index.search_limited("a", Some(1));
        assert_eq!(member_ids(&result), vec!["m1"]);
        assert_eq!(family_ids(&result), vec!["f1"]);
    }

    #[test]
    fn test_unicode_names() {
        let members = vec![Member::new("m1", "f1", "विकास शर्मा").with_occupation("किसान")];
        let families = vec![Family::new("f1", "शर्मा परिवार")];

        let result = search("शर्मा", &members, &families);
        assert_eq!(member_ids(&result), vec!["m1"]);
        assert_eq!(family_ids(&result), vec!["f1"]);
    }

    #[test]
    fn test_empty_data() {
        let index = SearchIndex::new(&[], &[]);
        assert!(index.is_empty());
        assert!(index.search("anything").is_empty());
    }

    #[test]
    fn test_ngrams() {
        let ngrams = generate_ngrams("abcd");
        assert!(ngrams.contains(&"ab".to_string()));
        assert!(ngrams.contains(&"bcd".to_string()));
        assert!(ngrams.contains(&"abcd".to_string()));
        assert!(generate_ngrams("a").is_empty());
    }
}
