use anyhow::{anyhow, Result};
use std::{env, fs, io::ErrorKind, path::Path, time::Duration};
use vibesy_core::{
    add_location::UnknownCoordinate,
    gateways::device::{Accuracy, WatchOptions},
    map::MapConfig,
};
use vibesy_entities::{
    geo::{Coordinate, Distance},
    session::AuthToken,
    view::{MapViewState, MAX_ZOOM},
};
use vibesy_gateways::nominatim;

mod raw;

const DEFAULT_CONFIG_FILE_NAME: &str = "vibesy.toml";

const ENV_NAME_API_URL: &str = "VIBESY_API_URL";
const ENV_NAME_TOKEN: &str = "VIBESY_TOKEN";
const ENV_NAME_ACCEPT_LANGUAGE: &str = "VIBESY_ACCEPT_LANGUAGE";

pub struct Config {
    pub api: Api,
    pub geocoding: Geocoding,
    pub live_location: WatchOptions,
    pub map: MapConfig,
    pub locations: Locations,
}

impl Config {
    pub fn try_load_from_file_or_default<P: AsRef<Path>>(file_path: Option<P>) -> Result<Self> {
        let file_path: &Path = file_path.as_ref().map(|p| p.as_ref()).unwrap_or_else(|| {
            log::debug!("No configuration file specified. load {DEFAULT_CONFIG_FILE_NAME}");
            Path::new(DEFAULT_CONFIG_FILE_NAME)
        });

        let raw_config = match fs::read_to_string(file_path) {
            Ok(cfg_string) => toml::from_str(&cfg_string)?,
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    log::info!(
                        "{} not found => load default configuration.",
                        file_path.display()
                    );
                    Ok(raw::Config::default())
                }
                _ => Err(err),
            }?,
        };
        let mut cfg = Self::try_from(raw_config)?;
        cfg.apply_env_overrides(|name| env::var(name).ok());
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(ENV_NAME_API_URL) {
            self.api.base_url = url;
        }
        if let Some(token) = var(ENV_NAME_TOKEN) {
            self.api.token = Some(AuthToken::new(token));
        }
        if let Some(lang) = var(ENV_NAME_ACCEPT_LANGUAGE) {
            self.geocoding.nominatim.accept_language = lang;
        }
    }
}

pub struct Api {
    pub base_url: String,
    pub token: Option<AuthToken>,
}

impl Api {
    pub fn token(&self) -> Result<&AuthToken> {
        self.token
            .as_ref()
            .ok_or_else(|| anyhow!("Missing API token: set {ENV_NAME_TOKEN} or [api] token"))
    }
}

pub struct Geocoding {
    pub nominatim: nominatim::Config,
    pub debounce: Duration,
}

pub struct Locations {
    pub unknown_coordinate: UnknownCoordinate,
}

impl From<raw::Accuracy> for Accuracy {
    fn from(from: raw::Accuracy) -> Self {
        match from {
            raw::Accuracy::Lowest => Self::Lowest,
            raw::Accuracy::Low => Self::Low,
            raw::Accuracy::Balanced => Self::Balanced,
            raw::Accuracy::High => Self::High,
            raw::Accuracy::Highest => Self::Highest,
            raw::Accuracy::BestForNavigation => Self::BestForNavigation,
        }
    }
}

impl TryFrom<raw::Config> for Config {
    type Error = anyhow::Error;
    fn try_from(from: raw::Config) -> Result<Self> {
        let raw::Config {
            api,
            geocoding,
            live_location,
            map,
            locations,
        } = from;

        let raw::Api { base_url, token } = api.unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(anyhow!("No API base URL defined"));
        }
        let api = Api {
            base_url,
            token: token.map(AuthToken::new),
        };

        let raw::Geocoding {
            endpoint,
            limit,
            accept_language,
            user_agent,
            referer,
            debounce,
            min_request_interval,
        } = geocoding.unwrap_or_default();
        if limit == 0 {
            return Err(anyhow!("The geocoding limit must be at least 1"));
        }
        let defaults = nominatim::Config::default();
        let geocoding = Geocoding {
            nominatim: nominatim::Config {
                endpoint,
                limit,
                accept_language,
                user_agent: user_agent.unwrap_or(defaults.user_agent),
                referer,
                min_request_interval,
            },
            debounce,
        };

        let raw::LiveLocation {
            accuracy,
            min_interval,
            min_distance_meters,
        } = live_location.unwrap_or_default();
        let min_distance = Distance::from_meters(min_distance_meters);
        if !min_distance.is_valid() {
            return Err(anyhow!("Invalid minimum distance {min_distance_meters}"));
        }
        let live_location = WatchOptions {
            accuracy: accuracy.into(),
            min_interval,
            min_distance,
        };

        let raw::Map {
            tile_url,
            attribution,
            default_center: [lat, lng],
            default_zoom,
            current_location_color,
            saved_location_color,
        } = map.unwrap_or_default();
        if default_zoom > MAX_ZOOM {
            return Err(anyhow!("The default zoom level must not exceed {MAX_ZOOM}"));
        }
        let center = Coordinate::try_from_lat_lng_deg(lat, lng)?;
        let map = MapConfig {
            tile_url,
            attribution,
            initial_view: MapViewState::new(center, default_zoom),
            current_location_color,
            saved_location_color,
        };

        let raw::Locations {
            allow_unknown_coordinate,
        } = locations.unwrap_or_default();
        let unknown_coordinate = if allow_unknown_coordinate {
            log::warn!("Locations without a known position will be saved at (0,0)");
            UnknownCoordinate::UseSentinel
        } else {
            UnknownCoordinate::Reject
        };
        let locations = Locations { unknown_coordinate };

        Ok(Self {
            api,
            geocoding,
            live_location,
            map,
            locations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_default_config() {
        let file: Option<&Path> = None;
        let _: Config = Config::try_load_from_file_or_default(file).unwrap();
    }

    #[test]
    fn default_config_matches_the_built_in_defaults() {
        let cfg = Config::try_from(raw::Config::default()).unwrap();
        assert_eq!(cfg.map, MapConfig::default());
        assert_eq!(cfg.live_location, vibesy_core::live::DEFAULT_WATCH_OPTIONS);
        assert_eq!(cfg.geocoding.debounce, vibesy_core::search::DEFAULT_DEBOUNCE);
        assert_eq!(
            cfg.geocoding.nominatim.endpoint,
            nominatim::DEFAULT_ENDPOINT
        );
        assert_eq!(cfg.locations.unknown_coordinate, UnknownCoordinate::Reject);
        assert!(cfg.api.token().is_err());
    }

    #[test]
    fn override_settings_from_the_environment() {
        let mut cfg = Config::try_from(raw::Config::default()).unwrap();
        cfg.apply_env_overrides(|name| match name {
            ENV_NAME_API_URL => Some("https://api.vibesy.app".to_string()),
            ENV_NAME_TOKEN => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(cfg.api.base_url, "https://api.vibesy.app");
        assert_eq!(cfg.api.token().unwrap(), &AuthToken::new("secret"));
        assert_eq!(cfg.geocoding.nominatim.accept_language, "en");
    }

    #[test]
    fn reject_invalid_map_settings() {
        let mut raw_cfg = raw::Config::default();
        raw_cfg.map = Some(raw::Map {
            default_center: [91.0, 0.0],
            ..Default::default()
        });
        assert!(Config::try_from(raw_cfg).is_err());

        let mut raw_cfg = raw::Config::default();
        raw_cfg.map = Some(raw::Map {
            default_zoom: 20,
            ..Default::default()
        });
        assert!(Config::try_from(raw_cfg).is_err());
    }

    #[test]
    fn allow_unknown_coordinates_on_request() {
        let mut raw_cfg = raw::Config::default();
        raw_cfg.locations = Some(raw::Locations {
            allow_unknown_coordinate: true,
        });
        let cfg = Config::try_from(raw_cfg).unwrap();
        assert_eq!(
            cfg.locations.unknown_coordinate,
            UnknownCoordinate::UseSentinel
        );
    }
}
