use async_trait::async_trait;
use vibesy_entities::{id::Id, location::*, session::AuthToken};

use crate::error::NetworkError;

/// Remote store of the user's saved locations.
#[async_trait]
pub trait LocationApi: Send + Sync {
    async fn locations(&self, token: &AuthToken) -> Result<Vec<SavedLocation>, NetworkError>;
    async fn create_location(
        &self,
        token: &AuthToken,
        location: &NewLocation,
    ) -> Result<SavedLocation, NetworkError>;
    async fn delete_location(&self, token: &AuthToken, id: &Id) -> Result<(), NetworkError>;
}
