//! Larch - geocoding query translation and result shaping
//!
//! This library provides the query builder, locale resolver, encoders and
//! place store adapters used by the `query` server binary.

pub mod config;
pub mod elasticsearch;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod http;
pub mod locale;
pub mod models;
pub mod predicate;
pub mod ratelimit;
pub mod service;
pub mod store;
pub mod tables;

pub use error::{GeocodeError, Result};
pub use models::{OsmType, Place, PlaceMatch};
