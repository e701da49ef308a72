//! Query language classification
//!
//! Three-way decision between Malayalam script, romanized Malayalam
//! ("Manglish") and English. Script detection always wins over the
//! lexical check.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Common romanized Malayalam words and particles, matched as whole words
/// with ASCII word boundaries
static MANGLISH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?-u:\b)(enthu|aanu|undoo|illa|venam|pokaam|vannoo|cheyyam|cheythu|eppol|evide|evideyanu|enne|ninne|njan|ningal|avar|ath|ithu|athu|engane|enthaanu|enikkum|njangal|nammal|kollaam|pattum|patilla|aaranu|edukkam|veno|vende|nokku|paranju|parayoo|ariyaam|ariyilla|evidunnu|ethra|entho|athe|namaskaram|nanni|sheriyaanu|angane|ingane|avalude|ivide|avide|kittum|kittilla|padikkam|padikkunnu|thudangi|kazhinjhu|varaam|varum|povaam|povum|cheyyan|cheyyanam|cheyth|koodi|koode|kure|valare|adipoli|pwoli|mathi|mathiyayo|vendaa|onnu|randu|moonu|naalu|anchu|puthiya|pazhaya|nalla|mosham|kollam|ningalkku|enikku|avarku|ivarkku|athinnu|ithinnu|kazhinju|kazhiyum|parayan|parayaan|ariyaan)(?-u:\b)",
    )
    .expect("valid regex")
});

/// Detected language of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Malayalam script
    Malayalam,
    /// Malayalam written in Latin script
    Manglish,
    /// Anything else
    English,
}

impl Language {
    /// Locale code used for speech synthesis
    #[must_use]
    pub const fn tts_code(self) -> &'static str {
        match self {
            Self::English => "en-IN",
            Self::Malayalam | Self::Manglish => "ml-IN",
        }
    }

    /// Wire name of the language
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Malayalam => "malayalam",
            Self::Manglish => "manglish",
            Self::English => "english",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "malayalam" => Ok(Self::Malayalam),
            "manglish" => Ok(Self::Manglish),
            "english" => Ok(Self::English),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// Whether a character falls in the Malayalam Unicode block
#[must_use]
pub const fn is_malayalam_char(c: char) -> bool {
    matches!(c, '\u{0D00}'..='\u{0D7F}')
}

/// Classify the language of a piece of text
#[must_use]
pub fn classify(text: &str) -> Language {
    if text.chars().any(is_malayalam_char) {
        Language::Malayalam
    } else if MANGLISH_REGEX.is_match(text) {
        Language::Manglish
    } else {
        Language::English
    }
}
