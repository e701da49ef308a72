//! Keyword relevance scoring over the FAQ corpus

use std::fmt::Write;

use super::faq::FaqRecord;

/// Upper bound on records injected into a prompt
pub const MAX_GROUNDING_RECORDS: usize = 10;

const TAG_WEIGHT: u32 = 10;
const LABEL_WEIGHT: u32 = 5;
const VALUE_WORD_WEIGHT: u32 = 2;

/// Value words this short never score
const MIN_VALUE_WORD_CHARS: usize = 4;

/// Score one record against an already lowercased query
///
/// Every tag, fact label and long fact-value word found as a substring of
/// the query adds to the score. Matches accumulate without a cap.
#[must_use]
pub fn score_record(record: &FaqRecord, query_lower: &str) -> u32 {
    let mut score = 0;

    for tag in &record.tags {
        if query_lower.contains(&tag.to_lowercase()) {
            score += TAG_WEIGHT;
        }
    }

    for (label, value) in &record.facts {
        if query_lower.contains(&label.to_lowercase()) {
            score += LABEL_WEIGHT;
        }

        for word in value.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.chars().count() >= MIN_VALUE_WORD_CHARS && query_lower.contains(&word) {
                score += VALUE_WORD_WEIGHT;
            }
        }
    }

    score
}

/// Select the records most relevant to a query
///
/// Records scoring zero are dropped. The rest are ordered by score,
/// highest first, with ties kept in corpus order, and cut to `limit`.
#[must_use]
pub fn select_relevant<'a>(records: &'a [FaqRecord], query: &str, limit: usize) -> Vec<&'a FaqRecord> {
    let query_lower = query.to_lowercase();

    let mut scored: Vec<(&FaqRecord, u32)> = records
        .iter()
        .map(|record| (record, score_record(record, &query_lower)))
        .filter(|(_, score)| *score > 0)
        .collect();

    // `sort_by` is stable, so equal scores keep corpus order
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.truncate(limit);

    tracing::debug!(
        matched = scored.len(),
        top = ?scored.first().map(|(r, s)| (r.id, *s)),
        "FAQ records selected"
    );

    scored.into_iter().map(|(record, _)| record).collect()
}

/// Format records as topic blocks for a system prompt
#[must_use]
pub fn format_grounding(records: &[&FaqRecord]) -> String {
    records
        .iter()
        .map(|record| {
            let mut section = format!("[Topic: {}]", record.tags.join(", "));
            for (label, value) in &record.facts {
                let _ = write!(section, "\n- {label}: {value}");
            }
            section
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::corpus;

    fn record(id: u32, tags: &[&str], facts: &[(&str, &str)]) -> FaqRecord {
        FaqRecord::new(id, tags, facts)
    }

    #[test]
    fn test_tag_weight() {
        let r = record(1, &["library"], &[("Hours", "9 to 5")]);
        assert_eq!(score_record(&r, "library timing"), 10);
    }

    #[test]
    fn test_label_weight_is_case_insensitive() {
        let r = record(1, &["misc"], &[("Office Hours", "9 to 5")]);
        assert_eq!(score_record(&r, "what are the office hours"), 5);
    }

    #[test]
    fn test_value_words() {
        let r = record(1, &["misc"], &[("Note", "Reading rooms, digital library")]);
        // "reading" and "library" match; "rooms," is trimmed to "rooms" and misses
        assert_eq!(score_record(&r, "reading in the library"), 4);
    }

    #[test]
    fn test_short_value_words_ignored() {
        let r = record(1, &["misc"], &[("Note", "the bus is red")]);
        assert_eq!(score_record(&r, "the bus is red"), 0);
    }

    #[test]
    fn test_scores_accumulate() {
        let r = record(
            1,
            &["hostel", "accommodation"],
            &[("Hostel Fee", "Hostel fee per semester")],
        );
        // tag "hostel" 10, label "hostel fee" 5, value words "hostel" 2 and "semester" 2
        assert_eq!(score_record(&r, "hostel fee per semester"), 19);
    }

    #[test]
    fn test_adding_matching_tag_never_lowers_score() {
        let query = "canteen food timing";
        let base = record(1, &["canteen"], &[("Timing", "Breakfast and lunch")]);
        let mut more = base.clone();
        more.tags.push("food".to_string());
        assert!(score_record(&more, query) >= score_record(&base, query));

        let mut unrelated = base.clone();
        unrelated.tags.push("parking".to_string());
        assert!(score_record(&unrelated, query) >= score_record(&base, query));
    }

    #[test]
    fn test_select_orders_by_score_and_keeps_ties_stable() {
        let records = vec![
            record(1, &["fees"], &[]),
            record(2, &["library"], &[]),
            record(3, &["library", "timings"], &[]),
            record(4, &["sports"], &[]),
            record(5, &["timings"], &[]),
        ];

        let selected = select_relevant(&records, "library timings and fees", 10);
        let ids: Vec<u32> = selected.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 2, 5]);
    }

    #[test]
    fn test_select_drops_zero_scores() {
        let records = vec![record(1, &["library"], &[])];
        assert!(select_relevant(&records, "hello there", 10).is_empty());
    }

    #[test]
    fn test_select_truncates() {
        let records: Vec<FaqRecord> = (0..15).map(|i| record(i, &["college"], &[])).collect();
        let selected = select_relevant(&records, "about the college", MAX_GROUNDING_RECORDS);
        assert_eq!(selected.len(), 10);
        assert_eq!(selected[0].id, 0);
        assert_eq!(selected[9].id, 9);
    }

    #[test]
    fn test_select_is_independent_per_call() {
        let first = select_relevant(corpus(), "library timings", 10);
        let _ = select_relevant(corpus(), "hostel fees", 10);
        let again = select_relevant(corpus(), "library timings", 10);
        assert_eq!(first, again);
    }

    #[test]
    fn test_library_query_ranks_library_first() {
        let selected = select_relevant(corpus(), "what are the library timings", 10);
        assert!(selected[0].tags.iter().any(|t| t == "library"));
    }

    #[test]
    fn test_format_grounding() {
        let r = record(7, &["library", "timings"], &[("Weekdays", "8 AM"), ("Sunday", "Closed")]);
        let formatted = format_grounding(&[&r]);
        assert_eq!(
            formatted,
            "[Topic: library, timings]\n- Weekdays: 8 AM\n- Sunday: Closed"
        );
    }

    #[test]
    fn test_format_grounding_empty() {
        assert!(format_grounding(&[]).is_empty());
    }
}
