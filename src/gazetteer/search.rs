//! Free-text location lookup

use super::locations::{CAMPUS_LOCATIONS, CampusLocation, by_key};

/// Fallback keywords, checked in order; the first one contained in the
/// query decides the location
const KEYWORDS: &[(&str, &str)] = &[
    ("library", "library"),
    ("book", "library"),
    ("read", "library"),
    ("food", "canteen"),
    ("eat", "canteen"),
    ("hungry", "canteen"),
    ("lunch", "canteen"),
    ("breakfast", "canteen"),
    ("coffee", "canteen"),
    ("computer", "cse_department"),
    ("cse", "cse_department"),
    ("software", "cse_department"),
    ("it department", "cse_department"),
    ("mechanical", "mechanical_department"),
    ("workshop", "mechanical_department"),
    ("hostel", "mens_hostel"),
    ("boys hostel", "mens_hostel"),
    ("men hostel", "mens_hostel"),
    ("stay", "mens_hostel"),
    ("accommodation", "mens_hostel"),
    ("girls hostel", "ladies_hostel"),
    ("ladies hostel", "ladies_hostel"),
    ("women hostel", "ladies_hostel"),
    ("shahanas", "ladies_hostel"),
    ("football", "football_ground"),
    ("ground", "football_ground"),
    ("sports", "sports_area"),
    ("play", "sports_area"),
    ("cricket", "sports_area"),
    ("gate", "main_entrance"),
    ("entrance", "main_entrance"),
    ("entry", "main_entrance"),
    ("exit", "main_entrance"),
    ("main gate", "main_entrance"),
    ("fab lab", "fab_lab"),
    ("fablab", "fab_lab"),
    ("fabrication", "fab_lab"),
    ("makerspace", "fab_lab"),
    ("maker", "fab_lab"),
    ("innovation", "fab_lab"),
    ("prototype", "fab_lab"),
    ("computer lab", "computer_lab"),
    ("lab", "computer_lab"),
    ("reprographic", "reprographic_centre"),
    ("xerox", "reprographic_centre"),
    ("print", "reprographic_centre"),
    ("photocopy", "reprographic_centre"),
    ("atm", "atm"),
    ("cash", "atm"),
    ("money", "atm"),
    ("sbi", "atm"),
    ("bus", "bus_garage"),
    ("transport", "bus_garage"),
    ("parking", "bus_garage"),
    ("garage", "bus_garage"),
    ("academic", "academic_departments"),
    ("department", "academic_departments"),
    ("class", "academic_departments"),
    ("classroom", "academic_departments"),
];

/// Find the campus location a query refers to
///
/// Names and keys are matched first, in either direction of containment;
/// the keyword table is the fallback. Blank queries match nothing.
#[must_use]
pub fn search_location(query: &str) -> Option<&'static CampusLocation> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    let by_name = CAMPUS_LOCATIONS.iter().find(|loc| {
        let name = loc.name.to_lowercase();
        let key = loc.key.replace('_', " ");
        name.contains(&query)
            || query.contains(&name)
            || key.contains(&query)
            || query.contains(&key)
    });
    if by_name.is_some() {
        return by_name;
    }

    KEYWORDS
        .iter()
        .find(|(keyword, _)| query.contains(keyword))
        .and_then(|(keyword, key)| {
            tracing::trace!(keyword, key, "location keyword matched");
            by_key(key)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_for(query: &str) -> Option<&'static str> {
        search_location(query).map(|loc| loc.key)
    }

    #[test]
    fn test_keyword_targets_exist() {
        for (keyword, key) in KEYWORDS {
            assert!(by_key(key).is_some(), "{keyword} -> {key}");
        }
    }

    #[test]
    fn test_key_containment() {
        assert_eq!(key_for("library evide aanu?"), Some("library"));
        assert_eq!(key_for("Where is the canteen"), Some("canteen"));
        assert_eq!(key_for("take me to the fab lab"), Some("fab_lab"));
    }

    #[test]
    fn test_name_containment_both_ways() {
        assert_eq!(key_for("central library"), Some("library"));
        // query contained in a name
        assert_eq!(key_for("Shahanas"), Some("ladies_hostel"));
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(key_for("I am hungry"), Some("canteen"));
        assert_eq!(key_for("where can I get a xerox"), Some("reprographic_centre"));
        assert_eq!(key_for("where do the girls stay"), Some("mens_hostel"));
        assert_eq!(key_for("need some cash"), Some("atm"));
    }

    #[test]
    fn test_table_order_preserved() {
        // "hostel" precedes "girls hostel" in the keyword table
        assert_eq!(key_for("where is the girls hostel"), Some("mens_hostel"));
        // "computer" precedes "computer lab"; "computer lab" is caught by name first
        assert_eq!(key_for("how to reach the computer lab"), Some("computer_lab"));
        assert_eq!(key_for("computer block"), Some("cse_department"));
    }

    #[test]
    fn test_bare_lab_matches_first_name_containing_it() {
        // "lab" is contained in "campus fab lab", which comes before the computer lab
        assert_eq!(key_for("lab"), Some("fab_lab"));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(key_for("swimming pool"), None);
        assert_eq!(key_for(""), None);
        assert_eq!(key_for("   "), None);
    }
}
