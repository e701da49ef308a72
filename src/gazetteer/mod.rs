//! Campus gazetteer
//!
//! Static campus places, distance and direction between coordinates, and
//! free-text lookup of a place from a query.

mod geo;
mod locations;
mod search;

pub use geo::{Coordinates, Direction, EARTH_RADIUS_KM, bearing_direction, distance_km};
pub use locations::{CAMPUS_LOCATIONS, COLLEGE_MAPS_LINK, CampusLocation, by_key, college};
pub use search::search_location;

use url::Url;

const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir/";

/// Google Maps driving directions to `destination`, optionally from `origin`
#[must_use]
pub fn maps_directions_url(destination: Coordinates, origin: Option<Coordinates>) -> String {
    let mut url = match Url::parse(DIRECTIONS_BASE) {
        Ok(url) => url,
        Err(_) => return COLLEGE_MAPS_LINK.to_string(),
    };
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("api", "1");
        if let Some(origin) = origin {
            query.append_pair("origin", &origin.to_string());
        }
        query.append_pair("destination", &destination.to_string());
        query.append_pair("travelmode", "driving");
    }
    url.into()
}
