use async_trait::async_trait;
use vibesy_entities::geocode::GeocodeCandidate;

use crate::error::NetworkError;

#[async_trait]
pub trait GeoCodingGateway: Send + Sync {
    /// Resolve free text into a (possibly empty) list of candidates.
    async fn search(&self, text: &str) -> Result<Vec<GeocodeCandidate>, NetworkError>;
}
