use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle, time};
use vibesy_entities::geocode::GeocodeCandidate;

use crate::{gateways::geocode::GeoCodingGateway, notice::Notice};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// The text of the latest search attempt.
    pub query: String,
    pub candidates: Vec<GeocodeCandidate>,
    /// A debounced request is scheduled or in flight.
    pub pending: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug)]
struct Shared {
    generation: AtomicU64,
    state: watch::Sender<SearchState>,
}

impl Shared {
    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Turns address input into geocode candidates.
///
/// Every search, selection and reset starts a new generation.
/// Responses of older generations are dropped when they arrive.
pub struct GeocodeSearchController {
    gateway: Arc<dyn GeoCodingGateway>,
    debounce: Duration,
    shared: Arc<Shared>,
    timer: Option<JoinHandle<()>>,
}

impl GeocodeSearchController {
    pub fn new(gateway: Arc<dyn GeoCodingGateway>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            gateway,
            debounce,
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                state,
            }),
            timer: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.shared.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.shared.state.borrow().clone()
    }

    pub fn candidates(&self) -> Vec<GeocodeCandidate> {
        self.shared.state.borrow().candidates.clone()
    }

    /// Schedule a geocode request for `text`.
    ///
    /// The request is sent once no further search arrived
    /// within the debounce period. Must be called within a tokio runtime.
    pub fn search(&mut self, text: &str) {
        self.abort_timer();
        let generation = self.shared.next_generation();
        let query = text.trim().to_string();
        if query.is_empty() {
            self.shared.state.send_modify(|state| {
                state.query = query;
                state.candidates.clear();
                state.pending = false;
                state.notice = None;
            });
            return;
        }
        // Results of the previous text must not be selectable anymore.
        self.shared.state.send_modify(|state| {
            state.query = query.clone();
            state.candidates.clear();
            state.notice = None;
            state.pending = true;
        });
        let shared = Arc::downgrade(&self.shared);
        let gateway = Arc::clone(&self.gateway);
        let debounce = self.debounce;
        self.timer = Some(tokio::spawn(async move {
            time::sleep(debounce).await;
            // The request itself must survive new input, only its result is discarded.
            tokio::spawn(run_request(gateway, shared, generation, query));
        }));
    }

    /// Take the candidate at `index` and invalidate the result list.
    pub fn select(&mut self, index: usize) -> Option<GeocodeCandidate> {
        let candidate = self.shared.state.borrow().candidates.get(index).cloned()?;
        self.abort_timer();
        self.shared.next_generation();
        self.shared.state.send_modify(|state| {
            state.candidates.clear();
            state.pending = false;
            state.notice = None;
        });
        log::debug!("Selected geocode candidate '{}'", candidate.display_name);
        Some(candidate)
    }

    pub fn clear(&mut self) {
        self.abort_timer();
        self.shared.next_generation();
        self.shared.state.send_replace(SearchState::default());
    }

    /// Forget the scheduled request and any response still in flight.
    pub fn cancel_pending(&mut self) {
        self.abort_timer();
        self.shared.next_generation();
        self.shared.state.send_if_modified(|state| {
            let was_pending = state.pending;
            state.pending = false;
            was_pending
        });
    }

    /// Wait until no request is scheduled or in flight.
    pub async fn settled(&self) -> SearchState {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|state| !state.pending)
            .await
            .map(|state| SearchState::clone(&state));
        settled.unwrap_or_else(|_| self.state())
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for GeocodeSearchController {
    fn drop(&mut self) {
        self.abort_timer();
    }
}

impl std::fmt::Debug for GeocodeSearchController {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("GeocodeSearchController")
            .field("debounce", &self.debounce)
            .field("generation", &self.shared.current_generation())
            .finish_non_exhaustive()
    }
}

async fn run_request(
    gateway: Arc<dyn GeoCodingGateway>,
    shared: Weak<Shared>,
    generation: u64,
    query: String,
) {
    {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if shared.current_generation() != generation {
            return;
        }
        shared.state.send_modify(|state| {
            state.candidates.clear();
            state.notice = None;
        });
    }
    log::debug!("Geocoding '{query}'");
    let result = gateway.search(&query).await;
    let Some(shared) = shared.upgrade() else {
        log::debug!("Drop geocoding result for '{query}': search is gone");
        return;
    };
    if shared.current_generation() != generation {
        log::debug!("Discard stale geocoding result for '{query}'");
        return;
    }
    match result {
        Ok(candidates) => {
            log::debug!("Found {} candidates for '{query}'", candidates.len());
            shared.state.send_modify(|state| {
                state.candidates = candidates;
                state.pending = false;
            });
        }
        Err(err) => {
            log::warn!("Geocoding '{query}' failed: {err}");
            shared.state.send_modify(|state| {
                state.candidates.clear();
                state.pending = false;
                state.notice = Some(Notice::SearchUnavailable);
            });
        }
    }
}
