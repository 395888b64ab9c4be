use async_trait::async_trait;
use time::OffsetDateTime;
use vibesy_core::gateways::device::*;
use vibesy_entities::{fix::LiveFix, geo::Coordinate};

/// Location services of a device that does not move.
///
/// Without a position the services behave as if they were turned off.
#[derive(Debug, Clone)]
pub struct StaticLocationServices {
    position: Option<Coordinate>,
}

impl StaticLocationServices {
    pub const fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }

    fn fix(&self) -> Option<LiveFix> {
        self.position.map(|pos| LiveFix {
            pos,
            accuracy: 0.0,
            timestamp: OffsetDateTime::now_utc(),
        })
    }
}

struct StaticSubscription {
    // Keeps the stream open until removed.
    sink: Option<PositionSink>,
}

impl PositionSubscription for StaticSubscription {
    fn remove(&mut self) {
        if self.sink.take().is_some() {
            log::debug!("Removed static position subscription");
        }
    }
}

#[async_trait]
impl LocationServices for StaticLocationServices {
    async fn services_enabled(&self) -> bool {
        self.position.is_some()
    }

    async fn request_foreground_permission(&self) -> Result<PermissionStatus, DeviceError> {
        Ok(PermissionStatus::Granted)
    }

    async fn current_position(&self, _: Accuracy) -> Result<LiveFix, DeviceError> {
        self.fix()
            .ok_or_else(|| DeviceError("No device position configured".to_string()))
    }

    fn watch_position(
        &self,
        _: &WatchOptions,
        sink: PositionSink,
    ) -> Result<Box<dyn PositionSubscription>, DeviceError> {
        let fix = self
            .fix()
            .ok_or_else(|| DeviceError("No device position configured".to_string()))?;
        // The receiver is still alive, it was created by the caller.
        let _ = sink.send(PositionEvent::Fix(fix));
        Ok(Box::new(StaticSubscription { sink: Some(sink) }))
    }
}
