use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT_LANGUAGE, REFERER};
use serde::Deserialize;
use tokio::{
    sync::Mutex,
    time::{self, Instant},
};
use vibesy_core::{gateways::geocode::GeoCodingGateway, NetworkError};
use vibesy_entities::{geo::Coordinate, geocode::GeocodeCandidate};

use crate::{into_json, transport_error};

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_LIMIT: u8 = 5;
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en";
pub const DEFAULT_USER_AGENT: &str =
    concat!("Vibesy/", env!("CARGO_PKG_VERSION"), " (location collection app)");
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub limit: u8,
    pub accept_language: String,
    pub user_agent: String,
    pub referer: Option<String>,
    /// Usage policy of the public instance: at most one request per second.
    pub min_request_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            limit: DEFAULT_LIMIT,
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: None,
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
        }
    }
}

/// Geocoder backed by an OpenStreetMap Nominatim instance.
#[derive(Debug)]
pub struct Nominatim {
    client: reqwest::Client,
    config: Config,
    last_request: Mutex<Option<Instant>>,
}

impl Nominatim {
    pub fn new(config: Config) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            client,
            config,
            last_request: Mutex::new(None),
        })
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Wait until the next request is allowed.
    async fn acquire_slot(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            time::sleep_until(last + self.config.min_request_interval).await;
        }
        *last_request = Some(Instant::now());
    }
}

fn search_url(endpoint: &str, text: &str, limit: u8) -> String {
    let encoded_text = utf8_percent_encode(text, NON_ALPHANUMERIC);
    format!("{endpoint}?format=json&q={encoded_text}&limit={limit}&addressdetails=1")
}

#[derive(Debug, Deserialize)]
struct Place {
    display_name: String,
    // Nominatim sends the degrees as strings.
    lat: String,
    lon: String,
}

fn candidates_from_places(places: Vec<Place>) -> Vec<GeocodeCandidate> {
    places
        .into_iter()
        .filter_map(|place| {
            let Place {
                display_name,
                lat,
                lon,
            } = place;
            match Coordinate::parse_lat_lng_deg(&lat, &lon) {
                Ok(pos) => Some(GeocodeCandidate { display_name, pos }),
                Err(err) => {
                    log::warn!("Skip geocoding result '{display_name}': {err}");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl GeoCodingGateway for Nominatim {
    async fn search(&self, text: &str) -> Result<Vec<GeocodeCandidate>, NetworkError> {
        self.acquire_slot().await;
        let url = search_url(&self.config.endpoint, text, self.config.limit);
        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT_LANGUAGE, &self.config.accept_language);
        if let Some(referer) = &self.config.referer {
            request = request.header(REFERER, referer);
        }
        log::debug!("Request {url}");
        let response = request.send().await.map_err(transport_error)?;
        let places: Vec<Place> = into_json(response).await?;
        Ok(candidates_from_places(places))
    }
}
