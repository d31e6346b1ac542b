//! Canonical US reporting jurisdictions and location label parsing.
//!
//! Jurisdictions are keyed by their upper-case name, which is how the
//! county-level case feed spells them. Each carries a display name for
//! reports and a two-letter code. New York City reports independently of
//! New York State, so it has its own entry that shares the `NY` code and
//! names New York as its parent.

use crate::error::{Error, Result};

/// A reporting jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jurisdiction {
    /// Upper-case key used for matching and in the grid output.
    pub name: &'static str,
    /// Title-case name used in reports.
    pub display: &'static str,
    pub code: &'static str,
    /// Containing jurisdiction for city-level entities.
    pub parent: Option<&'static str>,
}

const fn state(name: &'static str, display: &'static str, code: &'static str) -> Jurisdiction {
    Jurisdiction {
        name,
        display,
        code,
        parent: None,
    }
}

/// Every jurisdiction that gets a row per week in the dense grid.
pub static JURISDICTIONS: &[Jurisdiction] = &[
    state("ALABAMA", "Alabama", "AL"),
    state("ALASKA", "Alaska", "AK"),
    state("ARIZONA", "Arizona", "AZ"),
    state("ARKANSAS", "Arkansas", "AR"),
    state("CALIFORNIA", "California", "CA"),
    state("COLORADO", "Colorado", "CO"),
    state("CONNECTICUT", "Connecticut", "CT"),
    state("DELAWARE", "Delaware", "DE"),
    state("DISTRICT OF COLUMBIA", "District of Columbia", "DC"),
    state("FLORIDA", "Florida", "FL"),
    state("GEORGIA", "Georgia", "GA"),
    state("HAWAII", "Hawaii", "HI"),
    state("IDAHO", "Idaho", "ID"),
    state("ILLINOIS", "Illinois", "IL"),
    state("INDIANA", "Indiana", "IN"),
    state("IOWA", "Iowa", "IA"),
    state("KANSAS", "Kansas", "KS"),
    state("KENTUCKY", "Kentucky", "KY"),
    state("LOUISIANA", "Louisiana", "LA"),
    state("MAINE", "Maine", "ME"),
    state("MARYLAND", "Maryland", "MD"),
    state("MASSACHUSETTS", "Massachusetts", "MA"),
    state("MICHIGAN", "Michigan", "MI"),
    state("MINNESOTA", "Minnesota", "MN"),
    state("MISSISSIPPI", "Mississippi", "MS"),
    state("MISSOURI", "Missouri", "MO"),
    state("MONTANA", "Montana", "MT"),
    state("NEBRASKA", "Nebraska", "NE"),
    state("NEVADA", "Nevada", "NV"),
    state("NEW HAMPSHIRE", "New Hampshire", "NH"),
    state("NEW JERSEY", "New Jersey", "NJ"),
    state("NEW MEXICO", "New Mexico", "NM"),
    state("NEW YORK", "New York", "NY"),
    Jurisdiction {
        name: "NEW YORK CITY",
        display: "New York City",
        code: "NY",
        parent: Some("NEW YORK"),
    },
    state("NORTH CAROLINA", "North Carolina", "NC"),
    state("NORTH DAKOTA", "North Dakota", "ND"),
    state("OHIO", "Ohio", "OH"),
    state("OKLAHOMA", "Oklahoma", "OK"),
    state("OREGON", "Oregon", "OR"),
    state("PENNSYLVANIA", "Pennsylvania", "PA"),
    state("RHODE ISLAND", "Rhode Island", "RI"),
    state("SOUTH CAROLINA", "South Carolina", "SC"),
    state("SOUTH DAKOTA", "South Dakota", "SD"),
    state("TENNESSEE", "Tennessee", "TN"),
    state("TEXAS", "Texas", "TX"),
    state("UTAH", "Utah", "UT"),
    state("VERMONT", "Vermont", "VT"),
    state("VIRGINIA", "Virginia", "VA"),
    state("WASHINGTON", "Washington", "WA"),
    state("WEST VIRGINIA", "West Virginia", "WV"),
    state("WISCONSIN", "Wisconsin", "WI"),
    state("WYOMING", "Wyoming", "WY"),
    state("AMERICAN SAMOA", "American Samoa", "AS"),
    state("GUAM", "Guam", "GU"),
    state("NORTHERN MARIANA ISLANDS", "Northern Mariana Islands", "MP"),
    state("PUERTO RICO", "Puerto Rico", "PR"),
    state("U.S. VIRGIN ISLANDS", "U.S. Virgin Islands", "VI"),
];

/// Spellings seen in upstream feeds that differ from the canonical key.
static ALIASES: &[(&str, &str)] = &[
    ("NYC", "NEW YORK CITY"),
    ("WASHINGTON DC", "DISTRICT OF COLUMBIA"),
    ("WASHINGTON D.C.", "DISTRICT OF COLUMBIA"),
    ("D.C.", "DISTRICT OF COLUMBIA"),
    ("US VIRGIN ISLANDS", "U.S. VIRGIN ISLANDS"),
    ("VIRGIN ISLANDS", "U.S. VIRGIN ISLANDS"),
    ("NORTHERN MARIANAS", "NORTHERN MARIANA ISLANDS"),
];

/// Lookup over a fixed jurisdiction list.
#[derive(Debug, Clone, Copy)]
pub struct Registry {
    entries: &'static [Jurisdiction],
}

impl Default for Registry {
    fn default() -> Self {
        Self::us()
    }
}

impl Registry {
    /// US states, territories, DC and New York City.
    pub fn us() -> Self {
        Self {
            entries: JURISDICTIONS,
        }
    }

    pub fn all(&self) -> &'static [Jurisdiction] {
        self.entries
    }

    /// Canonical keys in registry order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|j| j.name).collect()
    }

    /// Looks up a jurisdiction by its canonical key.
    pub fn get(&self, name: &str) -> Option<&'static Jurisdiction> {
        self.entries.iter().find(|j| j.name == name)
    }

    /// Resolves a raw name variant to its canonical jurisdiction.
    ///
    /// Matching is case-insensitive and ignores repeated whitespace. Accepts
    /// the canonical key, known aliases and two-letter codes. A shared code
    /// resolves to the jurisdiction without a parent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownJurisdiction`] when nothing matches.
    pub fn canonicalize(&self, raw: &str) -> Result<&'static Jurisdiction> {
        let key = normalize_name(raw);

        if let Some(j) = self.get(&key) {
            return Ok(j);
        }
        if let Some((_, target)) = ALIASES.iter().find(|(alias, _)| *alias == key) {
            if let Some(j) = self.get(target) {
                return Ok(j);
            }
        }
        if key.len() == 2 {
            if let Some(j) = self
                .entries
                .iter()
                .find(|j| j.code == key && j.parent.is_none())
            {
                return Ok(j);
            }
        }

        Err(Error::UnknownJurisdiction(raw.to_string()))
    }
}

fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// A `county, jurisdiction` label split into upper-case parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub county: String,
    pub jurisdiction: String,
}

const LOCATION_DELIMITER: &str = ", ";

/// Splits a raw `County, JURISDICTION` label.
///
/// # Errors
///
/// Returns [`Error::MalformedLocation`] unless the label splits into exactly
/// two non-empty parts.
pub fn parse_location(raw: &str) -> Result<Location> {
    let parts: Vec<&str> = raw.split(LOCATION_DELIMITER).map(str::trim).collect();
    match parts.as_slice() {
        [county, jurisdiction] if !county.is_empty() && !jurisdiction.is_empty() => Ok(Location {
            county: county.to_uppercase(),
            jurisdiction: jurisdiction.to_uppercase(),
        }),
        _ => Err(Error::MalformedLocation(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location_uppercases_both_parts() {
        let loc = parse_location("Gaines, Texas").unwrap();
        assert_eq!(loc.county, "GAINES");
        assert_eq!(loc.jurisdiction, "TEXAS");
    }

    #[test]
    fn test_parse_location_rejects_wrong_arity() {
        assert!(matches!(
            parse_location("Texas"),
            Err(Error::MalformedLocation(_))
        ));
        assert!(matches!(
            parse_location("A, B, C"),
            Err(Error::MalformedLocation(_))
        ));
        assert!(parse_location(", Texas").is_err());
    }

    #[test]
    fn test_canonicalize_variants() {
        let registry = Registry::us();
        assert_eq!(registry.canonicalize("texas").unwrap().name, "TEXAS");
        assert_eq!(
            registry.canonicalize("  New   York City ").unwrap().name,
            "NEW YORK CITY"
        );
        assert_eq!(registry.canonicalize("NYC").unwrap().name, "NEW YORK CITY");
        assert_eq!(
            registry.canonicalize("Washington DC").unwrap().name,
            "DISTRICT OF COLUMBIA"
        );
    }

    #[test]
    fn test_shared_code_resolves_to_parent() {
        let registry = Registry::us();
        assert_eq!(registry.canonicalize("ny").unwrap().name, "NEW YORK");
    }

    #[test]
    fn test_canonicalize_unknown() {
        let registry = Registry::us();
        assert!(matches!(
            registry.canonicalize("Atlantis"),
            Err(Error::UnknownJurisdiction(_))
        ));
    }

    #[test]
    fn test_registry_keys_unique() {
        let mut names = Registry::us().names();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_city_shares_parent_code() {
        let registry = Registry::us();
        let city = registry.get("NEW YORK CITY").unwrap();
        let parent = registry.get(city.parent.unwrap()).unwrap();
        assert_eq!(city.code, parent.code);
    }
}
