use crate::{geo::*, id::*};

/// A point of interest as stored by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedLocation {
    pub id: Id,
    pub name: String,
    pub pos: Coordinate,
    pub description: Option<String>,
    pub address: Option<String>,
}

/// Payload of a location that does not exist on the server yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub name: String,
    pub pos: Coordinate,
    pub description: Option<String>,
    pub address: Option<String>,
}
