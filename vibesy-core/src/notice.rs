use std::fmt;

use crate::error::PermissionError;

/// A transient, user-visible message about degraded functionality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LocationUnavailable(PermissionError),
    SearchUnavailable,
    RefreshFailed,
    SaveFailed(String),
    DeleteFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::LocationUnavailable(PermissionError::ServicesDisabled) => f.write_str(
                "Location services are turned off. Please enable them in your system settings.",
            ),
            Self::LocationUnavailable(PermissionError::AccessDenied { can_ask_again: true }) => {
                f.write_str("Permission to access location was denied")
            }
            Self::LocationUnavailable(PermissionError::AccessDenied {
                can_ask_again: false,
            }) => f.write_str(
                "Permission to access location was denied. Please allow it in your settings.",
            ),
            Self::LocationUnavailable(PermissionError::Unavailable(_)) => {
                f.write_str("Error getting your location. Please check your settings.")
            }
            Self::SearchUnavailable => f.write_str("Address search is unavailable right now"),
            Self::RefreshFailed => f.write_str("Could not load your saved places"),
            Self::SaveFailed(reason) => write!(f, "Could not save the place: {reason}"),
            Self::DeleteFailed(reason) => write!(f, "Could not delete the place: {reason}"),
        }
    }
}
