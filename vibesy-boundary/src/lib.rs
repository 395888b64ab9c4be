use serde::{Deserialize, Deserializer, Serialize};

#[cfg(feature = "entity-conversions")]
mod conv;

#[cfg(feature = "entity-conversions")]
pub use conv::ConversionError;

#[rustfmt::skip]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct SavedLocation {
    #[serde(deserialize_with = "string_or_number")]
    pub id          : String,
    pub name        : String,
    pub latitude    : f64,
    pub longitude   : f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description : Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address     : Option<String>,
}

/// Request body of `POST /locations`.
#[rustfmt::skip]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct NewLocation {
    pub name        : String,
    pub latitude    : f64,
    pub longitude   : f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description : Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address     : Option<String>,
}

#[rustfmt::skip]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id         : String,
    pub email      : String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name       : Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio        : Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url : Option<String>,
}

/// Request body of `PUT /profile`.
#[derive(Serialize, Deserialize, Default)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq))]
pub struct UpdateProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Error body of a non-2xx API response.
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "extra-derive", derive(Debug, Clone, PartialEq, thiserror::Error))]
#[cfg_attr(feature = "extra-derive", error("{detail}"))]
pub struct Error {
    pub detail: String,
}

// The API returns numeric ids for some deployments.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}
