//! City reference data.
//!
//! Pure and synchronous: a static dataset embedded at compile time, with
//! helpers for the `"Name, State"` display form the location dropdown
//! uses.  The reverse lookup is an exact match on name and state; when two
//! cities share both (they can), the first wins — callers that can carry
//! the id should use [`city_by_id`] instead of round-tripping the display
//! string.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub state: String,
}

static CITIES: LazyLock<Vec<City>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../data/cities.json"))
        .expect("embedded cities.json is valid")
});

/// All known cities, in dataset order.
pub fn all() -> &'static [City] {
    &CITIES
}

/// `"Name, State"` strings for every city, in dataset order.
pub fn city_options() -> Vec<String> {
    CITIES.iter().map(format_city_display).collect()
}

/// Format a city for display.
pub fn format_city_display(city: &City) -> String {
    format!("{}, {}", city.name, city.state)
}

/// Reverse [`format_city_display`]: exact match on name and state, first
/// match wins, `None` when the option names no known city.
pub fn city_from_option(option: &str) -> Option<&'static City> {
    let (name, state) = option.split_once(", ")?;
    CITIES.iter().find(|c| c.name == name && c.state == state)
}

/// Lossless lookup by id, for callers that keep the structured identifier
/// instead of the display string.
pub fn city_by_id(id: &str) -> Option<&'static City> {
    CITIES.iter().find(|c| c.id == id)
}
