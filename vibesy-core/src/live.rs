use std::{fmt, time::Duration};

use tokio::sync::mpsc;
use vibesy_entities::{fix::LiveFix, geo::*};

use crate::{
    error::PermissionError,
    gateways::device::{Accuracy, PositionEvent, PositionSubscription, WatchOptions},
    permission::PermissionGate,
};

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MIN_DISTANCE: Distance = Distance::from_meters(10.0);

pub const DEFAULT_WATCH_OPTIONS: WatchOptions = WatchOptions {
    accuracy: Accuracy::Balanced,
    min_interval: DEFAULT_MIN_INTERVAL,
    min_distance: DEFAULT_MIN_DISTANCE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Requesting,
    Streaming,
    Stopped,
}

/// Bounds the cadence of emitted fixes.
///
/// A fix is only emitted if *both* the interval and the distance
/// to the previously emitted fix reach the thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottlePolicy {
    pub min_interval: Duration,
    pub min_distance: Distance,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            min_distance: DEFAULT_MIN_DISTANCE,
        }
    }
}

impl From<&WatchOptions> for ThrottlePolicy {
    fn from(from: &WatchOptions) -> Self {
        Self {
            min_interval: from.min_interval,
            min_distance: from.min_distance,
        }
    }
}

impl ThrottlePolicy {
    pub fn admits(&self, last: Option<&LiveFix>, next: &LiveFix) -> bool {
        let Some(last) = last else {
            return true;
        };
        // Negative durations (out of order samples) fail the conversion.
        let Ok(elapsed) = Duration::try_from(next.timestamp - last.timestamp) else {
            return false;
        };
        elapsed >= self.min_interval
            && Coordinate::distance(last.pos, next.pos) >= self.min_distance
    }
}

/// Releases the platform subscription exactly once,
/// either explicitly or when dropped.
#[derive(Default)]
pub struct SubscriptionGuard(Option<Box<dyn PositionSubscription>>);

impl SubscriptionGuard {
    pub fn new(subscription: Box<dyn PositionSubscription>) -> Self {
        Self(Some(subscription))
    }

    pub fn is_active(&self) -> bool {
        self.0.is_some()
    }

    pub fn release(&mut self) {
        if let Some(mut subscription) = self.0.take() {
            subscription.remove();
            log::debug!("Released position subscription");
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("SubscriptionGuard")
            .field(&self.is_active())
            .finish()
    }
}

/// Continuous position updates of the device.
#[derive(Debug)]
pub struct LiveLocationStream {
    gate: PermissionGate,
    options: WatchOptions,
    policy: ThrottlePolicy,
    state: StreamState,
    subscription: SubscriptionGuard,
    events: Option<mpsc::UnboundedReceiver<PositionEvent>>,
    latest: Option<LiveFix>,
}

impl LiveLocationStream {
    pub fn new(gate: PermissionGate, options: WatchOptions) -> Self {
        Self {
            gate,
            policy: ThrottlePolicy::from(&options),
            options,
            state: StreamState::Idle,
            subscription: SubscriptionGuard::default(),
            events: None,
            latest: None,
        }
    }

    pub const fn state(&self) -> StreamState {
        self.state
    }

    pub const fn latest(&self) -> Option<&LiveFix> {
        self.latest.as_ref()
    }

    /// Ask for permission and subscribe to position updates.
    ///
    /// On failure the stream ends up `Stopped` and never holds a subscription.
    pub async fn start(&mut self) -> Result<(), PermissionError> {
        match self.state {
            StreamState::Requesting | StreamState::Streaming => return Ok(()),
            StreamState::Idle | StreamState::Stopped => {}
        }
        self.state = StreamState::Requesting;
        if let Err(err) = self.gate.request_foreground_access().await {
            self.state = StreamState::Stopped;
            return Err(err);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        match self.gate.services().watch_position(&self.options, tx) {
            Ok(subscription) => {
                self.subscription = SubscriptionGuard::new(subscription);
                self.events = Some(rx);
                log::debug!("Subscribed to position updates: {:?}", self.options);
                Ok(())
            }
            Err(err) => {
                log::warn!("Unable to subscribe to position updates: {err}");
                self.state = StreamState::Stopped;
                Err(PermissionError::Unavailable(err.to_string()))
            }
        }
    }

    /// The next fix that passes the throttle policy.
    ///
    /// Returns `None` once the stream is stopped.
    pub async fn next_fix(&mut self) -> Option<LiveFix> {
        loop {
            match self.next_event().await {
                Some(PositionEvent::Fix(fix)) => {
                    if !self.policy.admits(self.latest.as_ref(), &fix) {
                        log::trace!("Skip position update at {}", fix.timestamp);
                        continue;
                    }
                    if self.state == StreamState::Requesting {
                        log::info!("Received first position fix");
                        self.state = StreamState::Streaming;
                    }
                    self.latest = Some(fix.clone());
                    return Some(fix);
                }
                Some(PositionEvent::PermissionRevoked) => {
                    log::warn!("Location permission was revoked");
                    self.stop();
                    return None;
                }
                Some(PositionEvent::Error(err)) => {
                    log::warn!("Position update failed: {err}");
                }
                None => {
                    if self.state != StreamState::Stopped {
                        log::debug!("Position updates ended");
                        self.stop();
                    }
                    return None;
                }
            }
        }
    }

    async fn next_event(&mut self) -> Option<PositionEvent> {
        let events = self.events.as_mut()?;
        let mut event = events.recv().await?;
        // Collapse a backlog of fixes into the most recent one.
        // Errors within the backlog never replace a fix.
        while matches!(event, PositionEvent::Fix(_)) {
            match events.try_recv() {
                Ok(PositionEvent::Error(err)) => {
                    log::warn!("Position update failed: {err}");
                }
                Ok(next) => event = next,
                Err(_) => break,
            }
        }
        Some(event)
    }

    pub fn stop(&mut self) {
        self.subscription.release();
        self.events = None;
        self.latest = None;
        self.state = StreamState::Stopped;
    }
}
