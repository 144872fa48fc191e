//! Single-flight coordination of token refresh.
//!
//! When several in-flight requests observe an expired access token at
//! the same moment, exactly one refresh call may reach the backend:
//! rotating refresh tokens make concurrent refreshes mutually
//! destructive. Late callers attach to the pending outcome instead of
//! starting their own cycle.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::ApiError;

use super::SessionStore;

/// Shared outcome of one refresh cycle. The error is `Arc`-wrapped so
/// every waiter receives the same failure.
pub type RefreshOutcome = Result<(), Arc<ApiError>>;

type InflightRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Deduplicates concurrent [`SessionStore::refresh_session`] calls.
///
/// Holds only the in-flight slot; the session store owns one instance
/// so store-issued and client-issued refreshes share the same cycle.
/// Cheap to clone; clones share the slot.
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
    inflight: Arc<Mutex<Option<InflightRefresh>>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one refresh cycle against `session`, or join the cycle
    /// already under way.
    ///
    /// The first caller to find the slot empty owns the cycle; everyone
    /// who checks while it runs awaits the same future and resolves
    /// with the owner's outcome. On failure the session is cleared
    /// exactly once, by the owner. The slot is emptied on every
    /// completion path, so a refresh that dies at the transport level
    /// cannot leave the coordinator stuck.
    pub async fn refresh(&self, session: &Arc<SessionStore>) -> RefreshOutcome {
        let pending = {
            let mut slot = self.inflight.lock().await;
            match slot.as_ref() {
                Some(inflight) => {
                    debug!("Joining in-flight token refresh");
                    inflight.clone()
                }
                None => {
                    let session = Arc::clone(session);
                    let slot_handle = Arc::clone(&self.inflight);
                    let cycle: InflightRefresh = async move {
                        let outcome = session.refresh_session().await.map_err(Arc::new);
                        if let Err(ref e) = outcome {
                            warn!(error = %e, "Token refresh failed; clearing session");
                            session.clear_session().await;
                        }
                        slot_handle.lock().await.take();
                        outcome
                    }
                    .boxed()
                    .shared();
                    *slot = Some(cycle.clone());
                    cycle
                }
            }
        };

        pending.await
    }
}
