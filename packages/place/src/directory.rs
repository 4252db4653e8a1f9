//! Remote place directory and geocoder client.
//!
//! The directory is a flat JSON listing (`[{id, name, ...}]`); the geocoder
//! is a Nominatim free-text search. The public Nominatim instance allows
//! **1 request per second**; the resolver issues at most one geocode per
//! lookup.
//!
//! See <https://servicodados.ibge.gov.br/api/docs/localidades> and
//! <https://nominatim.org/release-docs/develop/api/Search/>

use async_trait::async_trait;
use envwatch_place_models::{DirectoryEntry, GeoPoint};

use crate::PlaceError;
use crate::config::{DirectoryConfig, ResolverConfig};

/// Network-facing side of place resolution.
#[async_trait]
pub trait PlaceDirectory: Send + Sync {
    /// Lists every entry of the remote directory.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError`] if the listing cannot be fetched or is not a
    /// JSON array.
    async fn list_entries(&self) -> Result<Vec<DirectoryEntry>, PlaceError>;

    /// Geocodes a free-text place name. `Ok(None)` means no candidate.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError`] if the request or response parsing fails.
    async fn geocode(&self, text: &str) -> Result<Option<GeoPoint>, PlaceError>;
}

/// [`PlaceDirectory`] backed by HTTP.
pub struct HttpPlaceDirectory {
    client: reqwest::Client,
    config: ResolverConfig,
}

impl HttpPlaceDirectory {
    /// Builds a client with the configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ResolverConfig) -> Result<Self, PlaceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PlaceDirectory for HttpPlaceDirectory {
    async fn list_entries(&self) -> Result<Vec<DirectoryEntry>, PlaceError> {
        let url = &self.config.directory.url;
        log::debug!("Listing place directory: {url}");

        let resp = self.client.get(url).send().await?.error_for_status()?;
        let body: serde_json::Value = resp.json().await?;
        let entries = parse_directory(&body, &self.config.directory)?;

        log::debug!("Place directory returned {} entries", entries.len());
        Ok(entries)
    }

    async fn geocode(&self, text: &str) -> Result<Option<GeoPoint>, PlaceError> {
        let resp = self
            .client
            .get(&self.config.geocoder.url)
            .query(&[
                ("q", text),
                ("countrycodes", self.config.geocoder.country_code.as_str()),
                ("format", "jsonv2"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PlaceError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_geocode_response(&body)
    }
}

/// Reads directory entries out of a JSON listing.
///
/// Entries without a usable id or name are skipped. Numeric ids are
/// stringified.
///
/// # Errors
///
/// Returns [`PlaceError::Parse`] if the listing is not an array.
pub fn parse_directory(
    body: &serde_json::Value,
    config: &DirectoryConfig,
) -> Result<Vec<DirectoryEntry>, PlaceError> {
    let rows = body.as_array().ok_or_else(|| PlaceError::Parse {
        message: "Directory listing is not an array".to_string(),
    })?;

    let entries = rows
        .iter()
        .filter_map(|row| {
            let id = scalar_to_string(row.pointer(&config.id_pointer)?)?;
            let name = row.pointer(&config.name_pointer)?.as_str()?.to_string();
            let region = config
                .region_pointer
                .as_deref()
                .and_then(|p| row.pointer(p))
                .and_then(serde_json::Value::as_str)
                .map(String::from);
            Some(DirectoryEntry { id, name, region })
        })
        .collect();

    Ok(entries)
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses a Nominatim `jsonv2` response.
fn parse_geocode_response(body: &serde_json::Value) -> Result<Option<GeoPoint>, PlaceError> {
    let results = body.as_array().ok_or_else(|| PlaceError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| PlaceError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| PlaceError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    GeoPoint::new(lat, lon).map(Some).ok_or_else(|| PlaceError::Parse {
        message: format!("Nominatim returned out-of-range point ({lat}, {lon})"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ibge_config() -> DirectoryConfig {
        ResolverConfig::embedded().directory
    }

    #[test]
    fn parses_ibge_listing() {
        let body = serde_json::json!([
            {
                "id": 1500602,
                "nome": "Altamira",
                "microrregiao": {"mesorregiao": {"UF": {"sigla": "PA"}}}
            },
            {
                "id": 1507300,
                "nome": "São Félix do Xingu",
                "microrregiao": null
            }
        ]);
        let entries = parse_directory(&body, &ibge_config()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "1500602");
        assert_eq!(entries[0].region.as_deref(), Some("PA"));
        assert_eq!(entries[1].region, None);
    }

    #[test]
    fn skips_entries_without_name() {
        let body = serde_json::json!([{"id": 1}, {"id": 2, "nome": "Manaus"}]);
        let entries = parse_directory(&body, &ibge_config()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Manaus");
    }

    #[test]
    fn rejects_non_array_listing() {
        let body = serde_json::json!({"error": "down"});
        assert!(parse_directory(&body, &ibge_config()).is_err());
    }

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "-3.2033",
            "lon": "-52.2064",
            "display_name": "Altamira, Pará, Brasil"
        }]);
        let point = parse_geocode_response(&body).unwrap().unwrap();
        assert!((point.latitude - -3.2033).abs() < 1e-4);
        assert!((point.longitude - -52.2064).abs() < 1e-4);
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_geocode_response(&body).unwrap().is_none());
    }
}
