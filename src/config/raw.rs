use duration_str::deserialize_duration;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = include_str!("vibesy.default.toml");

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub api: Option<Api>,
    pub geocoding: Option<Geocoding>,
    pub live_location: Option<LiveLocation>,
    pub map: Option<Map>,
    pub locations: Option<Locations>,
}

impl Default for Config {
    fn default() -> Self {
        let cfg: Self = toml::from_str(DEFAULT_CONFIG_FILE).expect("Default configuration");
        cfg
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Api {
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Config::default().api.expect("API configuration")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Geocoding {
    pub endpoint: String,
    pub limit: u8,
    pub accept_language: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    #[serde(deserialize_with = "deserialize_duration")]
    pub debounce: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_request_interval: Duration,
}

impl Default for Geocoding {
    fn default() -> Self {
        Config::default()
            .geocoding
            .expect("Geocoding configuration")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accuracy {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
    BestForNavigation,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LiveLocation {
    pub accuracy: Accuracy,
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_interval: Duration,
    pub min_distance_meters: f64,
}

impl Default for LiveLocation {
    fn default() -> Self {
        Config::default()
            .live_location
            .expect("Live location configuration")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Map {
    pub tile_url: String,
    pub attribution: String,
    /// Latitude and longitude in degrees
    pub default_center: [f64; 2],
    pub default_zoom: u8,
    pub current_location_color: String,
    pub saved_location_color: String,
}

impl Default for Map {
    fn default() -> Self {
        Config::default().map.expect("Map configuration")
    }
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Locations {
    pub allow_unknown_coordinate: bool,
}
