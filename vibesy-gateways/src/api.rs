use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{header::AUTHORIZATION, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use vibesy_boundary::{self as json, UpdateProfile, UserProfile};
use vibesy_core::{gateways::api::LocationApi, NetworkError};
use vibesy_entities::{id::Id, location::*, session::AuthToken};

use crate::{ensure_success, into_json, transport_error};

/// Client of the authorized Vibesy backend API.
#[derive(Debug, Clone)]
pub struct HttpLocationApi {
    client: reqwest::Client,
    url: String,
}

impl HttpLocationApi {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        Self { client, url }
    }

    async fn send(&self, token: &AuthToken, req: RequestBuilder) -> Result<Response, NetworkError> {
        req.header(AUTHORIZATION, token.bearer_header_value())
            .send()
            .await
            .map_err(transport_error)
    }

    async fn send_and_parse<T>(&self, token: &AuthToken, req: RequestBuilder) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(token, req).await?;
        into_json(response).await
    }

    pub async fn profile(&self, token: &AuthToken) -> Result<UserProfile, NetworkError> {
        let url = format!("{}/profile", self.url);
        self.send_and_parse(token, self.client.get(&url)).await
    }

    pub async fn update_profile(
        &self,
        token: &AuthToken,
        profile: &UpdateProfile,
    ) -> Result<UserProfile, NetworkError> {
        let url = format!("{}/profile", self.url);
        self.send_and_parse(token, self.client.put(&url).json(profile))
            .await
    }
}

fn location_url(base_url: &str, id: &Id) -> String {
    let encoded_id = utf8_percent_encode(id.as_str(), NON_ALPHANUMERIC);
    format!("{base_url}/locations/{encoded_id}")
}

/// Locations with invalid positions are skipped.
fn locations_from_json(locations: Vec<json::SavedLocation>) -> Vec<SavedLocation> {
    locations
        .into_iter()
        .filter_map(|l| {
            SavedLocation::try_from(l)
                .map_err(|err| log::warn!("Skip location: {err}"))
                .ok()
        })
        .collect()
}

#[async_trait]
impl LocationApi for HttpLocationApi {
    async fn locations(&self, token: &AuthToken) -> Result<Vec<SavedLocation>, NetworkError> {
        let url = format!("{}/locations", self.url);
        let locations: Vec<json::SavedLocation> =
            self.send_and_parse(token, self.client.get(&url)).await?;
        Ok(locations_from_json(locations))
    }

    async fn create_location(
        &self,
        token: &AuthToken,
        location: &NewLocation,
    ) -> Result<SavedLocation, NetworkError> {
        let url = format!("{}/locations", self.url);
        let body = json::NewLocation::from(location.clone());
        let created: json::SavedLocation = self
            .send_and_parse(token, self.client.post(&url).json(&body))
            .await?;
        SavedLocation::try_from(created)
            .map_err(|err| NetworkError::InvalidResponse(err.to_string()))
    }

    async fn delete_location(&self, token: &AuthToken, id: &Id) -> Result<(), NetworkError> {
        let url = location_url(&self.url, id);
        let response = self.send(token, self.client.delete(&url)).await?;
        ensure_success(response).await
    }
}
