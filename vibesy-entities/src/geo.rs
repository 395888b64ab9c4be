use itertools::Itertools;
use std::{fmt, str::FromStr};
use thiserror::Error;

const LAT_DEG_MIN: f64 = -90.0;
const LAT_DEG_MAX: f64 = 90.0;
const LNG_DEG_MIN: f64 = -180.0;
const LNG_DEG_MAX: f64 = 180.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    #[error("Invalid latitude degrees: {0}")]
    Latitude(String),
    #[error("Invalid longitude degrees: {0}")]
    Longitude(String),
    #[error("Failed to parse coordinate: {0}")]
    Format(String),
}

/// A validated geographical position in decimal degrees (WGS 84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    /// The equator/prime-meridian point that legacy clients used for "unknown".
    pub const UNKNOWN: Self = Self { lat: 0.0, lng: 0.0 };

    pub fn try_from_lat_lng_deg(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if !(LAT_DEG_MIN..=LAT_DEG_MAX).contains(&lat) {
            return Err(CoordinateError::Latitude(lat.to_string()));
        }
        if !(LNG_DEG_MIN..=LNG_DEG_MAX).contains(&lng) {
            return Err(CoordinateError::Longitude(lng.to_string()));
        }
        Ok(Self { lat, lng })
    }

    /// Panics in debug builds if the degrees are out of range.
    pub fn from_lat_lng_deg(lat: f64, lng: f64) -> Self {
        debug_assert!((LAT_DEG_MIN..=LAT_DEG_MAX).contains(&lat));
        debug_assert!((LNG_DEG_MIN..=LNG_DEG_MAX).contains(&lng));
        Self { lat, lng }
    }

    /// Parse degrees that are transmitted as text, e.g. by geocoders.
    pub fn parse_lat_lng_deg(lat_deg_str: &str, lng_deg_str: &str) -> Result<Self, CoordinateError> {
        let lat = lat_deg_str
            .trim()
            .parse::<f64>()
            .map_err(|_| CoordinateError::Latitude(lat_deg_str.to_string()))?;
        let lng = lng_deg_str
            .trim()
            .parse::<f64>()
            .map_err(|_| CoordinateError::Longitude(lng_deg_str.to_string()))?;
        Self::try_from_lat_lng_deg(lat, lng)
    }

    pub const fn lat(self) -> f64 {
        self.lat
    }

    pub const fn lng(self) -> f64 {
        self.lng
    }

    pub fn to_lat_lng_rad(self) -> (f64, f64) {
        (self.lat.to_radians(), self.lng.to_radians())
    }

    pub const fn to_lat_lng_deg(self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((lat_deg_str, lng_deg_str)) = s.split(',').collect_tuple() {
            Self::parse_lat_lng_deg(lat_deg_str, lng_deg_str)
        } else {
            Err(CoordinateError::Format(s.to_string()))
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Distance(pub f64);

impl Distance {
    pub const fn from_meters(meters: f64) -> Self {
        Self(meters)
    }

    pub const fn to_meters(self) -> f64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 >= 0.0
    }
}

const MEAN_EARTH_RADIUS: Distance = Distance::from_meters(6_371_200.0);

impl Coordinate {
    /// Calculate the great-circle distance on the surface
    /// of the earth using a special case of the Vincenty
    /// formula for numerical accuracy.
    pub fn distance(p1: Self, p2: Self) -> Distance {
        let (lat1_rad, lng1_rad) = p1.to_lat_lng_rad();
        let (lat2_rad, lng2_rad) = p2.to_lat_lng_rad();

        let (lat1_sin, lat1_cos) = (lat1_rad.sin(), lat1_rad.cos());
        let (lat2_sin, lat2_cos) = (lat2_rad.sin(), lat2_rad.cos());

        let dlng = (lng1_rad - lng2_rad).abs();
        let (dlng_sin, dlng_cos) = (dlng.sin(), dlng.cos());

        let nom1 = lat2_cos * dlng_sin;
        let nom2 = lat1_cos * lat2_sin - lat1_sin * lat2_cos * dlng_cos;

        let nom = (nom1 * nom1 + nom2 * nom2).sqrt();
        let denom = lat1_sin * lat2_sin + lat1_cos * lat2_cos * dlng_cos;

        Distance::from_meters(MEAN_EARTH_RADIUS.to_meters() * nom.atan2(denom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latitude_range() {
        assert!(Coordinate::try_from_lat_lng_deg(-90.0, 0.0).is_ok());
        assert!(Coordinate::try_from_lat_lng_deg(90.0, 0.0).is_ok());
        assert!(matches!(
            Coordinate::try_from_lat_lng_deg(-90.000001, 0.0),
            Err(CoordinateError::Latitude(_))
        ));
        assert!(matches!(
            Coordinate::try_from_lat_lng_deg(90.000001, 0.0),
            Err(CoordinateError::Latitude(_))
        ));
        assert!(Coordinate::try_from_lat_lng_deg(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn longitude_range() {
        assert!(Coordinate::try_from_lat_lng_deg(0.0, -180.0).is_ok());
        assert!(Coordinate::try_from_lat_lng_deg(0.0, 180.0).is_ok());
        assert!(matches!(
            Coordinate::try_from_lat_lng_deg(0.0, -180.000001),
            Err(CoordinateError::Longitude(_))
        ));
        assert!(matches!(
            Coordinate::try_from_lat_lng_deg(0.0, 180.000001),
            Err(CoordinateError::Longitude(_))
        ));
    }

    #[test]
    fn only_the_origin_is_unknown() {
        assert!(Coordinate::UNKNOWN.is_unknown());
        assert!(Coordinate::from_lat_lng_deg(0.0, 0.0).is_unknown());
        assert!(!Coordinate::from_lat_lng_deg(0.0, 9.1827).is_unknown());
    }

    #[test]
    fn parse_textual_degrees() {
        let c = Coordinate::parse_lat_lng_deg("37.4224857", "-122.0855846").unwrap();
        assert_eq!(c.lat(), 37.4224857);
        assert_eq!(c.lng(), -122.0855846);
        assert!(Coordinate::parse_lat_lng_deg("north", "-122.0").is_err());
        assert!(Coordinate::parse_lat_lng_deg("91.0", "0").is_err());
    }

    #[test]
    fn parse_from_str() {
        let c: Coordinate = "48.7755,9.1827".parse().unwrap();
        assert_eq!(c, Coordinate::from_lat_lng_deg(48.7755, 9.1827));
        assert_eq!(c.to_string(), "48.7755,9.1827");
        assert!("48.7755".parse::<Coordinate>().is_err());
        assert!("1,2,3".parse::<Coordinate>().is_err());
    }

    #[test]
    fn no_distance() {
        let p1 = Coordinate::from_lat_lng_deg(0.0, 0.0);
        assert_eq!(Coordinate::distance(p1, p1).to_meters(), 0.0);

        let p2 = Coordinate::from_lat_lng_deg(-25.0, 55.0);
        assert_eq!(Coordinate::distance(p2, p2).to_meters(), 0.0);

        let p1 = Coordinate::from_lat_lng_deg(-15.0, -180.0);
        let p2 = Coordinate::from_lat_lng_deg(-15.0, 180.0);
        assert!(Coordinate::distance(p1, p2).to_meters() < 0.000001);
    }

    #[test]
    fn real_distance() {
        let stuttgart = Coordinate::from_lat_lng_deg(48.7755, 9.1827);
        let mannheim = Coordinate::from_lat_lng_deg(49.4836, 8.4630);
        assert!(Coordinate::distance(stuttgart, mannheim) > Distance::from_meters(94_000.0));
        assert!(Coordinate::distance(stuttgart, mannheim) < Distance::from_meters(95_000.0));

        let new_york = Coordinate::from_lat_lng_deg(40.714268, -74.005974);
        let sidney = Coordinate::from_lat_lng_deg(-33.867138, 151.207108);
        assert!(Coordinate::distance(new_york, sidney) > Distance::from_meters(15_985_000.0));
        assert!(Coordinate::distance(new_york, sidney) < Distance::from_meters(15_995_000.0));
    }

    #[test]
    fn short_distance() {
        // Roughly 11 meters per 0.0001 degrees latitude.
        let a = Coordinate::from_lat_lng_deg(37.78825, -122.4324);
        let b = Coordinate::from_lat_lng_deg(37.78835, -122.4324);
        let d = Coordinate::distance(a, b).to_meters();
        assert!(d > 10.0 && d < 12.0);
    }

    #[test]
    fn symetric_distance() {
        let a = Coordinate::from_lat_lng_deg(80.0, 0.0);
        let b = Coordinate::from_lat_lng_deg(90.0, 20.0);
        assert_eq!(Coordinate::distance(a, b), Coordinate::distance(b, a));
    }
}
