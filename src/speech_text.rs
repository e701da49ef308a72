//! Text clean-up before speech synthesis
//!
//! Strips what a synthesizer would read aloud badly (emoji, markdown, URLs,
//! list markers) and expands abbreviations into Malayalam readings.

use std::sync::LazyLock;

use regex::Regex;

/// Ordered rewrite rules; each runs over the output of the previous one
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Emoji and pictographs
        (
            r"[\x{1F300}-\x{1F9FF}\x{2600}-\x{26FF}\x{2700}-\x{27BF}\x{1F000}-\x{1F02F}\x{1F0A0}-\x{1F0FF}\x{1F100}-\x{1F64F}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}]",
            "",
        ),
        // Latin glosses in parentheses repeat what was just said
        (r"\s*\([A-Za-z0-9\s.,'-]+\)", ""),
        // Markdown
        (r"\*\*(.*?)\*\*", "${1}"),
        (r"\*(.*?)\*", "${1}"),
        (r"`(.*?)`", "${1}"),
        (r"#+\s", ""),
        // List markers
        (r"(?m)^[-•]\s*", ""),
        (r"(?m)^[0-9]+\.\s*", ""),
        (r"https?://\S+", ""),
        (r"([A-Za-z0-9_]+)@([A-Za-z0-9_]+)\.([A-Za-z0-9_]+)", "${1} at ${2} dot ${3}"),
        // Titles, before any punctuation clean-up splits them
        (r"(?i)(?-u:\b)Dr\.\s*", "ഡോക്ടർ "),
        (r"(?i)(?-u:\b)Mr\.\s*", "മിസ്റ്റർ "),
        (r"(?i)(?-u:\b)Ms\.\s*", "മിസ് "),
        (r"(?i)(?-u:\b)Prof\.\s*", "പ്രൊഫസർ "),
        (r"ഡോ\.\s*", "ഡോക്ടർ "),
        (r"പ്രൊഫ\.\s*", "പ്രൊഫസർ "),
        // Degrees and institutions
        (r"(?i)(?-u:\b)B\.Tech(?-u:\b)", "ബി ടെക്"),
        (r"(?i)(?-u:\b)M\.Tech(?-u:\b)", "എം ടെക്"),
        (r"(?i)(?-u:\b)Ph\.D(?-u:\b)", "പി എച്ച് ഡി"),
        (r"(?-u:\b)CSE(?-u:\b)", "സി എസ് ഇ"),
        (r"(?-u:\b)ECE(?-u:\b)", "ഇ സി ഇ"),
        (r"(?-u:\b)EEE(?-u:\b)", "ഇ ഇ ഇ"),
        (r"(?-u:\b)MCA(?-u:\b)", "എം സി എ"),
        (r"(?-u:\b)KTU(?-u:\b)", "കെ ടി യു"),
        (r"(?-u:\b)AICTE(?-u:\b)", "എ ഐ സി ടി ഇ"),
        (r"(?-u:\b)LBS(?-u:\b)", "എൽ ബി എസ്"),
        (r"(?-u:\b)NRI(?-u:\b)", "എൻ ആർ ഐ"),
        // Money and units
        (r"₹\s*([0-9]+)", "${1} രൂപ"),
        (r"(?i)([0-9]+)\s*LPA", "${1} ലക്ഷം പ്രതിവർഷം"),
        (r"(?i)([0-9]+)\s*lakh", "${1} ലക്ഷം"),
        (r"(?i)([0-9]+)\s*crore", "${1} കോടി"),
        (r"(?i)(?-u:\b)sq\.ft(?-u:\b)", "സ്ക്വയർ ഫീറ്റ്"),
        (r"(?-u:\b)km(?-u:\b)", "കിലോമീറ്റർ"),
        (r"\+91[-\s]?([0-9]{4,5})[-\s]?([0-9]{5,6})", "പ്ലസ് 91 ${1} ${2}"),
        // Punctuation a synthesizer pauses on awkwardly
        (r"\s*-\s*", " "),
        (r"\s*:\s*", ", "),
        (r"\s*;\s*", ", "),
        (r"\s+", " "),
        (r"\.{2,}", "."),
        (r"\.\s*\.", "."),
        (r",\s*,", ","),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

/// Length of the processed-text preview returned to clients
pub const PREVIEW_CHARS: usize = 100;

/// Rewrite text so it reads naturally when synthesized
#[must_use]
pub fn prepare_for_speech(text: &str) -> String {
    let mut processed = text.to_string();
    for (regex, replacement) in RULES.iter() {
        processed = regex.replace_all(&processed, *replacement).into_owned();
    }

    let mut processed = processed.trim().to_string();
    if !processed.is_empty() && !processed.ends_with(['.', '!', '?']) {
        processed.push('.');
    }
    processed
}

/// Short preview of processed text, always ending in an ellipsis
#[must_use]
pub fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown_and_emoji() {
        assert_eq!(
            prepare_for_speech("**Library** is open 🎉 `daily`"),
            "Library is open daily."
        );
    }

    #[test]
    fn test_drops_latin_gloss() {
        assert_eq!(
            prepare_for_speech("ഡോ. മുഹമ്മദ് ഷെക്കൂർ ടി (Dr. Mohammad Shekoor T) ആണ് പ്രിൻസിപ്പൽ"),
            "ഡോക്ടർ മുഹമ്മദ് ഷെക്കൂർ ടി ആണ് പ്രിൻസിപ്പൽ."
        );
    }

    #[test]
    fn test_list_markers_and_urls() {
        let text = "Options\n- CSE\n2. Visit https://lbscek.ac.in now";
        assert_eq!(prepare_for_speech(text), "Options സി എസ് ഇ Visit now.");
    }

    #[test]
    fn test_abbreviation_next_to_malayalam_suffix() {
        assert_eq!(prepare_for_speech("CSEൽ സീറ്റ് ഉണ്ട്"), "സി എസ് ഇൽ സീറ്റ് ഉണ്ട്.");
        assert_eq!(prepare_for_speech("ദൂരം 5 kmഅകലെ"), "ദൂരം 5 കിലോമീറ്റർഅകലെ.");
    }

    #[test]
    fn test_email_spoken() {
        assert_eq!(
            prepare_for_speech("Write to office@lbscek.ac.in"),
            "Write to office at lbscek dot ac.in."
        );
    }

    #[test]
    fn test_titles_and_degrees() {
        assert_eq!(
            prepare_for_speech("Dr. Shekoor has a Ph.D"),
            "ഡോക്ടർ Shekoor has a പി എച്ച് ഡി."
        );
        assert_eq!(prepare_for_speech("B.Tech in ECE"), "ബി ടെക് in ഇ സി ഇ.");
    }

    #[test]
    fn test_money_and_units() {
        assert_eq!(prepare_for_speech("Fee is ₹ 5000"), "Fee is 5000 രൂപ.");
        assert_eq!(prepare_for_speech("Average 6 LPA"), "Average 6 ലക്ഷം പ്രതിവർഷം.");
        assert_eq!(prepare_for_speech("12 km away"), "12 കിലോമീറ്റർ away.");
    }

    #[test]
    fn test_punctuation_normalized() {
        assert_eq!(prepare_for_speech("Timing: 9 to 5; Mon - Fri"), "Timing, 9 to 5, Mon Fri.");
        assert_eq!(prepare_for_speech("Wait... what"), "Wait. what.");
        assert_eq!(prepare_for_speech("yes,, no"), "yes, no.");
    }

    #[test]
    fn test_terminal_punctuation_kept() {
        assert_eq!(prepare_for_speech("Really?"), "Really?");
        assert_eq!(prepare_for_speech("  "), "");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short"), "short...");
        let long = "a".repeat(150);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 3);
    }
}
