//! Static campus location table

use super::geo::Coordinates;

/// Google Maps link for the college as a whole
pub const COLLEGE_MAPS_LINK: &str = "https://maps.app.goo.gl/ZGm4R6fiM6KgbfH97";

/// A named place on campus
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CampusLocation {
    /// Stable identifier, e.g. `ladies_hostel`
    pub key: &'static str,
    /// Display name
    pub name: &'static str,
    pub coordinates: Coordinates,
    pub description: &'static str,
    /// Short Google Maps link
    pub maps_link: &'static str,
}

const fn location(
    key: &'static str,
    name: &'static str,
    latitude: f64,
    longitude: f64,
    description: &'static str,
    maps_link: &'static str,
) -> CampusLocation {
    CampusLocation {
        key,
        name,
        coordinates: Coordinates::new(latitude, longitude),
        description,
        maps_link,
    }
}

/// All campus locations, in lookup order
pub static CAMPUS_LOCATIONS: [CampusLocation; 15] = [
    location(
        "main_entrance",
        "LBS College of Engineering (Main Entrance)",
        8.8932,
        76.6141,
        "Main entrance of LBS College of Engineering",
        "https://maps.app.goo.gl/ZGm4R6fiM6KgbfH97",
    ),
    location(
        "academic_departments",
        "Academic Departments (General Area)",
        8.8935,
        76.6145,
        "General academic departments area",
        "https://maps.app.goo.gl/2PvfbFGAkUFjFBjS6",
    ),
    location(
        "mechanical_department",
        "Dept. Of Mechanical Engineering",
        8.8938,
        76.6148,
        "Department of Mechanical Engineering",
        "https://maps.app.goo.gl/Yas8hpFy3kNim1xD8",
    ),
    location(
        "cse_department",
        "Computer Science & IT Department Building",
        8.8940,
        76.6150,
        "Department of Computer Science and Information Technology",
        "https://maps.app.goo.gl/DbwYQ6b984VTGDjm6",
    ),
    location(
        "library",
        "Central Library",
        8.8942,
        76.6143,
        "Central library with reading rooms and digital resources",
        "https://maps.app.goo.gl/fh6Z8TEsomfuoFbJ9",
    ),
    location(
        "fab_lab",
        "Campus Fab Lab",
        8.8936,
        76.6147,
        "Fabrication lab for innovation and prototyping",
        "https://maps.app.goo.gl/3rz8e5WXZ3UytSze7",
    ),
    location(
        "computer_lab",
        "Computer Lab",
        8.8939,
        76.6149,
        "Main computer laboratory",
        "https://maps.app.goo.gl/6pasZGBNrC3opwTg8",
    ),
    location(
        "reprographic_centre",
        "Reprographic Centre",
        8.8934,
        76.6144,
        "Printing and photocopying services",
        "https://maps.app.goo.gl/FZ72xAAczEwk2mgi7",
    ),
    location(
        "sports_area",
        "Multipurpose Sports Area",
        8.8928,
        76.6138,
        "Multipurpose sports and recreation area",
        "https://maps.app.goo.gl/uyPH83UZo3rjEFEBA",
    ),
    location(
        "football_ground",
        "LBS College Football Ground",
        8.8925,
        76.6135,
        "Main football ground",
        "https://maps.app.goo.gl/vjLN3ZgN2yUoxuSr5",
    ),
    location(
        "mens_hostel",
        "Men's Hostel",
        8.8945,
        76.6155,
        "Boys hostel accommodation",
        "https://maps.app.goo.gl/fQ1QAUmNk5MDepgTA",
    ),
    location(
        "ladies_hostel",
        "Shahanas Hostel (Ladies Hostel)",
        8.8948,
        76.6158,
        "Shahanas Hostel for women students",
        "https://maps.app.goo.gl/nPwgvr3U3fXSiUj47",
    ),
    location(
        "canteen",
        "College Canteen",
        8.8933,
        76.6142,
        "Food court serving breakfast, lunch, and snacks",
        "https://maps.app.goo.gl/UN4s7g16zSMiHhYz8",
    ),
    location(
        "atm",
        "College ATM (SBI ATM)",
        8.8931,
        76.6140,
        "SBI ATM for cash withdrawal",
        "https://maps.app.goo.gl/ug6jLStaQDjnVZ239",
    ),
    location(
        "bus_garage",
        "Bus Garage / Transport Area",
        8.8920,
        76.6130,
        "College bus parking and transport area",
        "https://maps.app.goo.gl/9WUemftWwmGohsRW8",
    ),
];

/// The main entrance, used when a query names no specific place
#[must_use]
pub fn college() -> &'static CampusLocation {
    &CAMPUS_LOCATIONS[0]
}

/// Look up a location by its key
#[must_use]
pub fn by_key(key: &str) -> Option<&'static CampusLocation> {
    CAMPUS_LOCATIONS.iter().find(|loc| loc.key == key)
}
