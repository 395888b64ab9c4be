#![deny(missing_debug_implementations)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(test, deny(warnings))]

//! # vibesy-entities
//!
//! Reusable, agnostic domain entities for Vibesy.
//!
//! The entities only contain generic functionality that does not reveal any application-specific business logic.

pub mod draft;
pub mod fix;
pub mod geo;
pub mod geocode;
pub mod id;
pub mod location;
pub mod session;
pub mod view;

#[cfg(any(test, feature = "builders"))]
pub mod builders;
