//! Core data models for the geocoding system.

pub mod place;

pub use place::{AddressRow, BoundingBox, GeoPoint, OsmRef, OsmType, Place, PlaceMatch};
