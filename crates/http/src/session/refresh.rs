//! Single-flight coordination of access-token refreshes
//!
//! The first request to need a refresh becomes the driver and receives a
//! [`RefreshTicket`]. Requests arriving while it is outstanding park on a
//! one-shot channel and are released in arrival order once the driver
//! settles. Every session gets a new epoch; a refresh that settles after its
//! session ended is reported as stale and must not be committed.

use crate::client::error::RefreshFailure;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

type Waiter = oneshot::Sender<Result<String, RefreshFailure>>;

#[derive(Default)]
struct GateState {
    in_flight: bool,
    epoch: u64,
    waiters: VecDeque<Waiter>,
}

#[derive(Default)]
pub(crate) struct RefreshGate {
    state: Mutex<GateState>,
}

/// What a request that needs a fresh token should do
pub(crate) enum Admission<'a> {
    /// Run the refresh and settle the ticket
    Drive(RefreshTicket<'a>),
    /// Wait for the refresh already in flight
    Wait(oneshot::Receiver<Result<String, RefreshFailure>>),
    /// A newer token is already stored; use it
    Reuse(String),
}

/// Result of settling a refresh
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Settlement {
    Settled { released: usize },
    /// The session ended while the refresh was running
    Stale,
}

impl RefreshGate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    #[cfg(test)]
    pub(crate) fn pending_waiters(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Decide how a request gets its next token.
    ///
    /// `newer_token` is consulted only when no refresh is running, under the
    /// gate lock, so a refresh that completed between the request's 401 and
    /// this call is reused instead of triggering another one.
    pub(crate) fn admit<F>(&self, newer_token: F) -> Admission<'_>
    where
        F: FnOnce() -> Option<String>,
    {
        let mut state = self.lock();

        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!(
                queued = state.waiters.len(),
                "Refresh in flight, queueing request"
            );
            return Admission::Wait(rx);
        }

        if let Some(token) = newer_token() {
            return Admission::Reuse(token);
        }

        state.in_flight = true;
        Admission::Drive(RefreshTicket {
            gate: self,
            epoch: state.epoch,
            settled: false,
        })
    }

    /// End the current epoch: drop the in-flight marker and reject waiters
    pub(crate) fn reset(&self) {
        let waiters = {
            let mut state = self.lock();
            state.epoch = state.epoch.wrapping_add(1);
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        if !waiters.is_empty() {
            debug!(count = waiters.len(), "Rejecting requests queued behind refresh");
        }
        for waiter in waiters {
            let _ = waiter.send(Err(RefreshFailure::SessionEnded));
        }
    }

    /// Release the gate with `outcome`. `commit` runs under the gate lock,
    /// before any waiter is woken, and only if the epoch is still current.
    fn settle<C>(
        &self,
        epoch: u64,
        outcome: Result<String, RefreshFailure>,
        commit: C,
    ) -> Settlement
    where
        C: FnOnce(&Result<String, RefreshFailure>),
    {
        let mut state = self.lock();
        if state.epoch != epoch {
            return Settlement::Stale;
        }

        commit(&outcome);
        state.in_flight = false;
        let waiters = std::mem::take(&mut state.waiters);
        let released = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        Settlement::Settled { released }
    }
}

/// Held by the request driving a refresh.
///
/// Dropping it unsettled (the driving future was cancelled) releases the
/// gate and fails the queued requests rather than leaving them parked.
pub(crate) struct RefreshTicket<'a> {
    gate: &'a RefreshGate,
    epoch: u64,
    settled: bool,
}

impl RefreshTicket<'_> {
    /// Run `f` under the gate lock if this ticket's session is still the
    /// current one. Returns whether it ran.
    pub(crate) fn while_current<F>(&self, f: F) -> bool
    where
        F: FnOnce(),
    {
        let state = self.gate.lock();
        if state.epoch != self.epoch {
            return false;
        }
        f();
        true
    }

    /// Publish a new token; `commit` runs under the gate lock so the stored
    /// token and the released waiters never disagree
    pub(crate) fn succeed<C>(mut self, token: String, commit: C) -> Settlement
    where
        C: FnOnce(&str),
    {
        self.settled = true;
        self.gate.settle(self.epoch, Ok(token), |outcome| {
            if let Ok(token) = outcome {
                commit(token);
            }
        })
    }

    /// Reject the waiters; `discard` runs under the gate lock first, so no
    /// request can start another refresh with the rejected credentials
    pub(crate) fn fail<D>(mut self, failure: RefreshFailure, discard: D) -> Settlement
    where
        D: FnOnce(),
    {
        self.settled = true;
        self.gate.settle(self.epoch, Err(failure), |_| discard())
    }
}

impl Drop for RefreshTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Token refresh abandoned before completion");
            self.gate.settle(
                self.epoch,
                Err(RefreshFailure::Unavailable("refresh abandoned".into())),
                |_| {},
            );
        }
    }
}
