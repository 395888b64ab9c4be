use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use vibesy_entities::{fix::LiveFix, geo::Distance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    Lowest,
    Low,
    #[default]
    Balanced,
    High,
    Highest,
    BestForNavigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied { can_ask_again: bool },
}

/// Configuration of a continuous position subscription.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    pub min_interval: Duration,
    pub min_distance: Distance,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Fix(LiveFix),
    PermissionRevoked,
    Error(String),
}

pub type PositionSink = mpsc::UnboundedSender<PositionEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DeviceError(pub String);

/// Handle of an active platform position subscription.
pub trait PositionSubscription: Send {
    /// Stop the platform from delivering further positions.
    fn remove(&mut self);
}

#[async_trait]
pub trait LocationServices: Send + Sync {
    async fn services_enabled(&self) -> bool;
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, DeviceError>;
    async fn current_position(&self, accuracy: Accuracy) -> Result<LiveFix, DeviceError>;
    fn watch_position(
        &self,
        options: &WatchOptions,
        sink: PositionSink,
    ) -> Result<Box<dyn PositionSubscription>, DeviceError>;
}
