use crate::{geo::Coordinate, geocode::GeocodeCandidate};

/// A location that is being edited but not saved yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationDraft {
    pub name: String,
    pub description: String,
    pub address: String,
    pub selected_candidate: Option<GeocodeCandidate>,
}

impl LocationDraft {
    /// The coordinate picked through geocoding, if any.
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.selected_candidate.as_ref().map(|c| c.pos)
    }

    pub fn set_address(&mut self, address: String) {
        if address != self.address {
            // The pick belongs to the previous address text.
            self.selected_candidate = None;
        }
        self.address = address;
    }

    pub fn select_candidate(&mut self, candidate: GeocodeCandidate) {
        if self.address.trim().is_empty() {
            self.address = candidate.display_name.clone();
        }
        self.selected_candidate = Some(candidate);
    }
}
