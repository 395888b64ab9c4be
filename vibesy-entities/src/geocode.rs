use crate::geo::Coordinate;

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCandidate {
    pub display_name: String,
    pub pos: Coordinate,
}
