//! # vibesy-core
//!
//! Keeps the saved locations, the device position and the map in sync.
//!
//! All I/O happens behind the traits in [`gateways`].

pub mod add_location;
pub mod error;
pub mod gateways;
pub mod live;
pub mod map;
pub mod notice;
pub mod permission;
pub mod screen;
pub mod search;
pub mod store;

pub use self::{
    error::{Error, NetworkError, PermissionError, ValidationError},
    notice::Notice,
};
