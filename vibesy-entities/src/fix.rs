use time::OffsetDateTime;

use crate::geo::Coordinate;

/// A single device-reported position sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveFix {
    pub pos: Coordinate,
    /// Radius of uncertainty in meters.
    pub accuracy: f64,
    pub timestamp: OffsetDateTime,
}
