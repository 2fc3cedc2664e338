//! Reflection of what the TV is currently displaying
//!
//! [`RemoteArtSession`] holds a [`CurrentArtStatus`] that only changes when
//! [`refresh`](RemoteArtSession::refresh) completes. Overlapping refreshes
//! share one request, unless the session was
//! [invalidated](RemoteArtSession::invalidate) in between: the newer refresh
//! then starts its own request and the older settlement is not recorded.
//!
//! A refresh whose callers were all dropped (e.g. by an external timeout) is
//! abandoned: the next refresh issues a new query.

use crate::client::FrameArtClient;
use crate::error::Error;
use crate::models::CurrentArtStatus;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Message of the fail-soft state when the status query fails
pub const REFRESH_FAILED_MESSAGE: &str = "Unable to retrieve the current image";

type Settlement = (CurrentArtStatus, Option<Error>);

struct Flight {
    id: u64,
    epoch: u64,
    waiters: usize,
    future: Shared<BoxFuture<'static, Settlement>>,
}

#[derive(Default)]
struct SessionState {
    settled: CurrentArtStatus,
    last_error: Option<Error>,
    flight: Option<Flight>,
    next_flight: u64,
    epoch: u64,
}

type SharedState = Arc<Mutex<SessionState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Withdraws one waiter from a flight when its caller goes away
struct WaiterGuard {
    state: SharedState,
    id: u64,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        let Some(flight) = state.flight.as_mut().filter(|flight| flight.id == self.id) else {
            return;
        };
        flight.waiters -= 1;
        if flight.waiters == 0 {
            debug!(flight = self.id, "Art refresh abandoned by its callers");
            state.flight = None;
        }
    }
}

/// Current-art state machine
///
/// Starts in `Loading`; clones share the same state.
#[derive(Clone)]
pub struct RemoteArtSession {
    client: FrameArtClient,
    state: SharedState,
}

impl std::fmt::Debug for RemoteArtSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteArtSession")
            .field("base_url", &self.client.base_url())
            .finish_non_exhaustive()
    }
}

impl RemoteArtSession {
    pub fn new(client: FrameArtClient) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Last settled state, or `Loading` while a refresh is in flight
    pub async fn status(&self) -> CurrentArtStatus {
        let state = lock(&self.state);
        match state.flight {
            Some(_) => CurrentArtStatus::Loading,
            None => state.settled.clone(),
        }
    }

    /// Error behind the current fail-soft state, if any
    pub async fn last_error(&self) -> Option<Error> {
        lock(&self.state).last_error.clone()
    }

    pub async fn is_refreshing(&self) -> bool {
        lock(&self.state).flight.is_some()
    }

    /// Mark the displayed content as changed
    ///
    /// A refresh in flight keeps running for its callers, but the next
    /// `refresh()` will not join it.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        state.epoch += 1;
        debug!(epoch = state.epoch, "Current art invalidated");
    }

    /// Query the TV and settle the state
    ///
    /// Never fails: transport or parse errors resolve to `NoCurrentImage`
    /// with [`REFRESH_FAILED_MESSAGE`], the cause being kept in
    /// [`last_error`](Self::last_error). A call made while another refresh
    /// of the same epoch is in flight joins it and gets the same settlement.
    pub async fn refresh(&self) -> CurrentArtStatus {
        let (id, future) = {
            let mut state = lock(&self.state);
            let epoch = state.epoch;

            match state.flight.as_mut().filter(|flight| flight.epoch == epoch) {
                Some(flight) => {
                    debug!(flight = flight.id, "Joining in-flight art refresh");
                    flight.waiters += 1;
                    (flight.id, flight.future.clone())
                }
                None => {
                    if let Some(stale) = &state.flight {
                        debug!(flight = stale.id, "Superseding stale art refresh");
                    }
                    state.next_flight += 1;
                    let id = state.next_flight;
                    let future = Self::query(self.client.clone()).boxed().shared();
                    state.flight = Some(Flight {
                        id,
                        epoch,
                        waiters: 1,
                        future: future.clone(),
                    });
                    (id, future)
                }
            }
        };

        let _guard = WaiterGuard {
            state: self.state.clone(),
            id,
        };
        let (status, error) = future.await;

        // Le premier appelant réveillé enregistre le résultat
        let mut state = lock(&self.state);
        if state.flight.as_ref().map(|flight| flight.id) == Some(id) {
            state.flight = None;
            state.settled = status.clone();
            state.last_error = error;
            info!(status = ?state.settled, "Current art refreshed");
        } else {
            debug!(flight = id, "Art refresh settled after being superseded");
        }
        status
    }

    async fn query(client: FrameArtClient) -> Settlement {
        match client.current_image().await {
            Ok(status) => (status, None),
            Err(err) => {
                warn!("Failed to retrieve current art: {}", err);
                (
                    CurrentArtStatus::NoCurrentImage {
                        message: REFRESH_FAILED_MESSAGE.to_string(),
                    },
                    Some(err),
                )
            }
        }
    }
}
