use crate::geo::Coordinate;

pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 19;

/// Center and zoom level of a map, independent of the markers drawn on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewState {
    pub center: Coordinate,
    pub zoom: u8,
}

impl MapViewState {
    pub fn new(center: Coordinate, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    pub fn with_center(self, center: Coordinate) -> Self {
        Self { center, ..self }
    }
}
