//! System prompt for the college assistant

use crate::knowledge::{FaqRecord, MAX_GROUNDING_RECORDS, format_grounding, select_relevant};

static TEMPLATE: &str = include_str!("../data/system_prompt.txt");

const PLACEHOLDER: &str = "{college_information}";

/// Used when no FAQ record matches the query
const NO_MATCHING_FACTS: &str =
    "No specific college records matched this question. Answer from the information above, \
     and say so if you are unsure.";

/// Build the system prompt with facts relevant to `query`
#[must_use]
pub fn system_prompt(corpus: &[FaqRecord], query: &str) -> String {
    let selected = select_relevant(corpus, query, MAX_GROUNDING_RECORDS);
    let grounding = if selected.is_empty() {
        NO_MATCHING_FACTS.to_string()
    } else {
        format_grounding(&selected)
    };

    TEMPLATE.replacen(PLACEHOLDER, &grounding, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::corpus;

    #[test]
    fn test_template_has_placeholder() {
        assert_eq!(TEMPLATE.matches(PLACEHOLDER).count(), 1);
    }

    #[test]
    fn test_grounding_injected() {
        let prompt = system_prompt(corpus(), "what are the library timings");
        assert!(!prompt.contains(PLACEHOLDER));
        assert!(prompt.contains("[Topic: library, facilities, timings]"));
        assert!(prompt.contains("Dr. Mohammad Shekoor T"));
    }

    #[test]
    fn test_no_matching_facts() {
        let prompt = system_prompt(corpus(), "zzz");
        assert!(prompt.contains(NO_MATCHING_FACTS));
        assert!(!prompt.contains("[Topic:"));
    }

    #[test]
    fn test_grounding_is_limited() {
        let prompt = system_prompt(corpus(), "college campus facilities fees hostel library bus");
        assert!(prompt.matches("[Topic:").count() <= MAX_GROUNDING_RECORDS);
    }
}
