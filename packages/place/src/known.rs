//! Built-in table of high-priority places.
//!
//! Resolved without any network call. Coordinates are city centres.

use envwatch_place_models::{CoordinateSource, GeoPoint, Place};

use crate::normalize::match_key;

/// An entry of the built-in table.
#[derive(Debug, Clone, Copy)]
pub struct KnownPlace {
    /// IBGE municipality code.
    pub id: &'static str,
    /// Municipality name.
    pub name: &'static str,
    /// State abbreviation.
    pub region: &'static str,
    /// Latitude of the city centre.
    pub latitude: f64,
    /// Longitude of the city centre.
    pub longitude: f64,
}

impl KnownPlace {
    /// `"Name (UF)"`.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        format!("{} ({})", self.name, self.region)
    }

    /// Whether `key` (already passed through [`match_key`]) names this place,
    /// either bare or with its state suffix.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match_key(self.name) == key || match_key(&self.canonical_name()) == key
    }

    /// Builds the resolved [`Place`] for a query that matched this entry.
    #[must_use]
    pub fn to_place(&self, query_text: &str) -> Place {
        Place {
            query_text: query_text.to_string(),
            resolved_id: self.id.to_string(),
            canonical_name: self.canonical_name(),
            coordinates: GeoPoint::new(self.latitude, self.longitude),
            coordinate_source: Some(CoordinateSource::BuiltIn),
        }
    }
}

/// Amazon municipalities most often queried, plus São Paulo as a
/// comparison baseline.
pub const KNOWN_PLACES: &[KnownPlace] = &[
    KnownPlace {
        id: "1100205",
        name: "Porto Velho",
        region: "RO",
        latitude: -8.7612,
        longitude: -63.9039,
    },
    KnownPlace {
        id: "1500602",
        name: "Altamira",
        region: "PA",
        latitude: -3.2033,
        longitude: -52.2064,
    },
    KnownPlace {
        id: "1302603",
        name: "Manaus",
        region: "AM",
        latitude: -3.1190,
        longitude: -60.0217,
    },
    KnownPlace {
        id: "1200401",
        name: "Rio Branco",
        region: "AC",
        latitude: -9.9754,
        longitude: -67.8249,
    },
    KnownPlace {
        id: "1302405",
        name: "Lábrea",
        region: "AM",
        latitude: -7.2590,
        longitude: -64.7981,
    },
    KnownPlace {
        id: "3550308",
        name: "São Paulo",
        region: "SP",
        latitude: -23.5505,
        longitude: -46.6333,
    },
];

/// Looks up a normalized key in the built-in table.
#[must_use]
pub fn lookup(key: &str) -> Option<&'static KnownPlace> {
    KNOWN_PLACES.iter().find(|place| place.matches(key))
}
