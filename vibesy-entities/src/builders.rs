pub trait Builder {
    type Build;
    fn build() -> Self::Build;
}

pub use self::{fix_builder::*, location_builder::*};

pub mod location_builder {

    use super::*;
    use crate::{geo::*, location::*};

    #[derive(Debug)]
    pub struct SavedLocationBuild {
        location: SavedLocation,
    }

    impl SavedLocationBuild {
        pub fn id(mut self, id: &str) -> Self {
            self.location.id = id.into();
            self
        }
        pub fn name(mut self, name: &str) -> Self {
            self.location.name = name.into();
            self
        }
        pub fn pos(mut self, pos: Coordinate) -> Self {
            self.location.pos = pos;
            self
        }
        pub fn lat_lng(self, lat: f64, lng: f64) -> Self {
            self.pos(Coordinate::from_lat_lng_deg(lat, lng))
        }
        pub fn description(mut self, desc: &str) -> Self {
            self.location.description = Some(desc.into());
            self
        }
        pub fn address(mut self, address: &str) -> Self {
            self.location.address = Some(address.into());
            self
        }
        pub fn finish(self) -> SavedLocation {
            self.location
        }
    }

    impl Builder for SavedLocation {
        type Build = SavedLocationBuild;
        fn build() -> SavedLocationBuild {
            SavedLocationBuild {
                location: SavedLocation {
                    id: Default::default(),
                    name: Default::default(),
                    pos: Coordinate::UNKNOWN,
                    description: None,
                    address: None,
                },
            }
        }
    }
}

pub mod fix_builder {

    use super::*;
    use crate::{fix::*, geo::*};
    use time::{Duration, OffsetDateTime};

    #[derive(Debug)]
    pub struct LiveFixBuild {
        fix: LiveFix,
    }

    impl LiveFixBuild {
        pub fn lat_lng(mut self, lat: f64, lng: f64) -> Self {
            self.fix.pos = Coordinate::from_lat_lng_deg(lat, lng);
            self
        }
        pub fn accuracy(mut self, meters: f64) -> Self {
            self.fix.accuracy = meters;
            self
        }
        pub fn timestamp(mut self, timestamp: OffsetDateTime) -> Self {
            self.fix.timestamp = timestamp;
            self
        }
        /// Seconds after the unix epoch.
        pub fn at_secs(self, secs: i64) -> Self {
            self.timestamp(OffsetDateTime::UNIX_EPOCH + Duration::seconds(secs))
        }
        pub fn finish(self) -> LiveFix {
            self.fix
        }
    }

    impl Builder for LiveFix {
        type Build = LiveFixBuild;
        fn build() -> LiveFixBuild {
            LiveFixBuild {
                fix: LiveFix {
                    pos: Coordinate::UNKNOWN,
                    accuracy: 5.0,
                    timestamp: OffsetDateTime::UNIX_EPOCH,
                },
            }
        }
    }
}
