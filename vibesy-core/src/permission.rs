use std::sync::Arc;

use crate::{
    error::PermissionError,
    gateways::device::{LocationServices, PermissionStatus},
};

/// Checks the device location services and asks for foreground access.
#[derive(Clone)]
pub struct PermissionGate {
    services: Arc<dyn LocationServices>,
}

impl PermissionGate {
    pub fn new(services: Arc<dyn LocationServices>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Arc<dyn LocationServices> {
        &self.services
    }

    pub async fn check_services_enabled(&self) -> bool {
        self.services.services_enabled().await
    }

    /// `Ok(())` means access was granted.
    ///
    /// Services that are disabled at OS level are reported without
    /// prompting the user because only the system settings can fix that.
    pub async fn request_foreground_access(&self) -> Result<(), PermissionError> {
        if !self.check_services_enabled().await {
            log::warn!("Location services are disabled");
            return Err(PermissionError::ServicesDisabled);
        }
        match self.services.request_foreground_permission().await {
            Ok(PermissionStatus::Granted) => {
                log::debug!("Foreground location access granted");
                Ok(())
            }
            Ok(PermissionStatus::Denied { can_ask_again }) => {
                log::warn!("Foreground location access denied (can ask again: {can_ask_again})");
                Err(PermissionError::AccessDenied { can_ask_again })
            }
            Err(err) => {
                log::warn!("Unable to request location permission: {err}");
                Err(PermissionError::Unavailable(err.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PermissionGate").finish_non_exhaustive()
    }
}
