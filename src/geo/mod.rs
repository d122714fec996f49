pub mod gazetteer;
pub mod resolver;

pub use gazetteer::{PlaceEntry, is_known_place, lookup_place};
pub use resolver::{IpGeoClient, UserLocation, resolve_user_location};
