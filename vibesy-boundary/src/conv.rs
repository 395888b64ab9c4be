use super::*;
use e::{geo::Coordinate, geo::CoordinateError};
use std::convert::TryFrom;
use vibesy_entities as e;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("Location '{id}' has an invalid position: {source}")]
    Position {
        id: String,
        #[source]
        source: CoordinateError,
    },
}

impl TryFrom<SavedLocation> for e::location::SavedLocation {
    type Error = ConversionError;
    fn try_from(from: SavedLocation) -> Result<Self, Self::Error> {
        let SavedLocation {
            id,
            name,
            latitude,
            longitude,
            description,
            address,
        } = from;
        let pos = Coordinate::try_from_lat_lng_deg(latitude, longitude)
            .map_err(|source| ConversionError::Position {
                id: id.clone(),
                source,
            })?;
        Ok(Self {
            id: id.into(),
            name,
            pos,
            description,
            address,
        })
    }
}

impl From<e::location::SavedLocation> for SavedLocation {
    fn from(from: e::location::SavedLocation) -> Self {
        let e::location::SavedLocation {
            id,
            name,
            pos,
            description,
            address,
        } = from;
        let (latitude, longitude) = pos.to_lat_lng_deg();
        Self {
            id: id.into(),
            name,
            latitude,
            longitude,
            description,
            address,
        }
    }
}

impl From<e::location::NewLocation> for NewLocation {
    fn from(from: e::location::NewLocation) -> Self {
        let e::location::NewLocation {
            name,
            pos,
            description,
            address,
        } = from;
        let (latitude, longitude) = pos.to_lat_lng_deg();
        Self {
            name,
            latitude,
            longitude,
            description,
            address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_location_with_invalid_position() {
        let raw = SavedLocation {
            id: "7".into(),
            name: "Nowhere".into(),
            latitude: 123.0,
            longitude: 0.0,
            description: None,
            address: None,
        };
        let err = e::location::SavedLocation::try_from(raw).unwrap_err();
        assert!(matches!(err, ConversionError::Position { ref id, .. } if id == "7"));
    }

    #[test]
    fn convert_new_location() {
        let new = e::location::NewLocation {
            name: "Googleplex".into(),
            pos: Coordinate::from_lat_lng_deg(37.422, -122.084),
            description: Some("Campus".into()),
            address: None,
        };
        let NewLocation {
            name,
            latitude,
            longitude,
            description,
            address,
        } = new.into();
        assert_eq!(name, "Googleplex");
        assert_eq!(latitude, 37.422);
        assert_eq!(longitude, -122.084);
        assert_eq!(description.as_deref(), Some("Campus"));
        assert!(address.is_none());
    }
}
