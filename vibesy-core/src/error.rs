use thiserror::Error;

/// The device cannot provide the user's position.
///
/// Never fatal: callers degrade to "no live position".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("Location services are disabled")]
    ServicesDisabled,
    #[error("Permission to access location was denied")]
    AccessDenied { can_ask_again: bool },
    #[error("Location is unavailable: {0}")]
    Unavailable(String),
}

impl PermissionError {
    /// The user has to fix this in the system settings,
    /// prompting again will not help.
    pub const fn requires_system_settings(&self) -> bool {
        match self {
            Self::ServicesDisabled => true,
            Self::AccessDenied { can_ask_again } => !*can_ask_again,
            Self::Unavailable(_) => false,
        }
    }
}

/// A call to the geocoder or the backend API failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Server responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Local validation that blocks a submission before any request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The name must not be empty")]
    EmptyName,
    #[error("The position of the location is unknown")]
    UnresolvedCoordinate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("This is not allowed while the form is {0}")]
    InvalidState(&'static str),
}
