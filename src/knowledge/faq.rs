//! Embedded FAQ corpus

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

static FAQ_JSON: &str = include_str!("../../data/faq.json");

static CORPUS: LazyLock<Vec<FaqRecord>> = LazyLock::new(|| {
    serde_json::from_str(FAQ_JSON).expect("embedded FAQ corpus is valid JSON")
});

/// One topic of curated college facts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub id: u32,
    /// Lowercase topic keywords
    pub tags: Vec<String>,
    /// Ordered `(label, value)` pairs
    pub facts: Vec<(String, String)>,
}

impl FaqRecord {
    /// Build a record from borrowed parts
    #[must_use]
    pub fn new(id: u32, tags: &[&str], facts: &[(&str, &str)]) -> Self {
        Self {
            id,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            facts: facts
                .iter()
                .map(|(label, value)| ((*label).to_string(), (*value).to_string()))
                .collect(),
        }
    }
}

/// The full FAQ corpus, parsed on first use
#[must_use]
pub fn corpus() -> &'static [FaqRecord] {
    &CORPUS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_parses() {
        let records = corpus();
        assert!(records.len() > 40);
        assert_eq!(records[0].id, 1);
        assert!(records.iter().all(|r| !r.tags.is_empty() && !r.facts.is_empty()));
    }

    #[test]
    fn test_corpus_ids_unique() {
        let mut ids: Vec<u32> = corpus().iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), corpus().len());
    }

    #[test]
    fn test_library_record() {
        let library = corpus()
            .iter()
            .find(|r| r.tags.iter().any(|t| t == "library"))
            .unwrap();
        assert!(library.facts.iter().any(|(label, _)| label == "Weekdays (Mon-Fri)"));
    }
}
