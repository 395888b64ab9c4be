use std::sync::Arc;

use anyhow::Result;
use vibesy_core::gateways::{api::LocationApi, geocode::GeoCodingGateway};
use vibesy_gateways::{api::HttpLocationApi, nominatim::Nominatim};

use crate::config;

pub fn geocoding_gateway(cfg: &config::Geocoding) -> Result<Arc<dyn GeoCodingGateway>> {
    log::debug!("Use Nominatim geocoder at {}", cfg.nominatim.endpoint);
    let gw = Nominatim::new(cfg.nominatim.clone())?;
    Ok(Arc::new(gw))
}

pub fn location_api(cfg: &config::Api) -> Arc<dyn LocationApi> {
    Arc::new(http_api(cfg))
}

pub fn http_api(cfg: &config::Api) -> HttpLocationApi {
    log::debug!("Use backend API at {}", cfg.base_url);
    HttpLocationApi::new(cfg.base_url.as_str())
}
