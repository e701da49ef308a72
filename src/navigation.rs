//! Location intents and spoken navigation answers

use crate::gazetteer::{
    CampusLocation, Coordinates, bearing_direction, college, distance_km, search_location,
};

/// Phrases that mark a query as a request for directions
const LOCATION_PHRASES: &[&str] = &[
    "where is",
    "where are",
    "how to reach",
    "how to find",
    "location of",
    "navigate to",
    "directions to",
    "find the",
    "take me to",
    "go to",
    "reach the",
    "get to",
    "way to",
    "path to",
    "route to",
    "evide",
    "evideyanu",
    "evidunnu",
    "എവിടെ",
    "എങ്ങനെ",
    "lbs location",
    "college location",
    "campus location",
    "lbs address",
    "college address",
    "campus address",
    "locate lbs",
    "locate college",
    "locate campus",
    "lbs college location",
    "lbsce location",
];

/// Prefix on navigation messages in the transcript
pub const PIN: &str = "📍 ";

/// Topic shortcuts offered to new users, as `(label, question)`
pub const QUICK_CATEGORIES: &[(&str, &str)] = &[
    ("Academics", "What courses are offered at LBS College?"),
    ("Fees", "What is the fee structure for B.Tech?"),
    ("Bus Routes", "What are the college bus routes and timings?"),
    ("Faculty", "Who are the faculty members in CSE department?"),
    ("Clubs", "What clubs are available in the college?"),
    ("Campus", "Where is the library located?"),
    ("Library", "What are the library timings?"),
    ("Hostel", "What are the hostel facilities and fees?"),
];

/// Example questions shown before the first turn
pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "What courses are offered?",
    "Where is the library?",
    "College facilities enthu okke und?",
    "Tell me about placements",
    "How to reach the canteen?",
    "Fee structure enthaanu?",
];

/// Whether the query asks where something is or how to get there
#[must_use]
pub fn is_location_query(text: &str) -> bool {
    let lower = text.to_lowercase();
    LOCATION_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// The place a navigation query is about, defaulting to the main entrance
#[must_use]
pub fn resolve_destination(text: &str) -> &'static CampusLocation {
    search_location(text).unwrap_or_else(college)
}

/// A composed navigation answer
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationReply {
    pub destination: &'static CampusLocation,
    /// Sentence to speak
    pub spoken: String,
    /// Distance from the user, when their position was known
    pub distance_km: Option<f64>,
}

impl NavigationReply {
    /// Compose the answer for a destination and an optional user position
    #[must_use]
    pub fn compose(destination: &'static CampusLocation, user: Option<Coordinates>) -> Self {
        let Some(user) = user else {
            return Self {
                destination,
                spoken: format!(
                    "Here's information about {}. {}. Click the button below to open Google Maps. Enable location services for better navigation.",
                    destination.name, destination.description
                ),
                distance_km: None,
            };
        };

        let distance = distance_km(user, destination.coordinates);
        let direction = bearing_direction(user, destination.coordinates);

        Self {
            destination,
            spoken: format!(
                "{} is approximately {} to the {direction} from your current location. You can use the button below to get turn by turn directions in Google Maps.",
                destination.name,
                distance_text(distance)
            ),
            distance_km: Some(distance),
        }
    }

    /// Transcript text: the spoken sentence behind a map pin
    #[must_use]
    pub fn display_text(&self) -> String {
        format!("{PIN}{}", self.spoken)
    }
}

/// Meters below one kilometer, otherwise kilometers to one decimal
#[must_use]
pub fn distance_text(km: f64) -> String {
    if km < 1.0 {
        format!("{} meters", (km * 1000.0).round())
    } else {
        format!("{km:.1} kilometers")
    }
}
