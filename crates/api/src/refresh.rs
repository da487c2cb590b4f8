//! Single-flight coordination for token refresh.
//!
//! When several requests hit an authorization failure at the same
//! time, exactly one of them (the leader) performs the refresh call;
//! the rest enqueue a waiter and share the leader's outcome. Waiters
//! are notified in FIFO order once the refresh settles.
//!
//! The state lock is only ever held for synchronous bookkeeping, never
//! across an `.await`, so check-then-act sequences cannot interleave.

use std::future::Future;
use std::sync::Mutex;

use tokio::sync::oneshot;
use tradewire_core::session::AuthTokens;

use crate::error::ApiError;

type Waiter = oneshot::Sender<Result<AuthTokens, ApiError>>;

enum FlightState {
    /// No refresh in flight.
    Idle,
    /// A leader is refreshing; these waiters share its outcome, in
    /// queue order.
    InFlight(Vec<Waiter>),
}

/// Coordinates at most one in-flight refresh operation.
pub struct RefreshCoordinator {
    state: Mutex<FlightState>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Idle),
        }
    }

    /// Run `op` with single-flight semantics.
    ///
    /// The first caller while idle becomes the leader and executes
    /// `op`; every caller that arrives while the flight is open gets
    /// the leader's result without `op` running again. If the leader's
    /// future is dropped mid-flight, waiters are released with a
    /// network error instead of hanging.
    pub async fn run<F, Fut>(&self, op: F) -> Result<AuthTokens, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AuthTokens, ApiError>>,
    {
        let rx = {
            let mut state = self.state.lock().expect("refresh state lock poisoned");
            match &mut *state {
                FlightState::InFlight(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                FlightState::Idle => {
                    *state = FlightState::InFlight(Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = rx {
            return match rx.await {
                Ok(result) => result,
                // The leader was dropped before settling the flight.
                Err(_) => Err(ApiError::Network("token refresh was interrupted".into())),
            };
        }

        let guard = FlightGuard { coordinator: self };
        let result = op().await;
        guard.settle(&result);
        result
    }
}

/// Closes the flight on drop so a cancelled leader cannot strand the
/// waiters in `InFlight` forever.
struct FlightGuard<'a> {
    coordinator: &'a RefreshCoordinator,
}

impl FlightGuard<'_> {
    /// Close the flight and notify waiters, oldest first.
    fn settle(self, result: &Result<AuthTokens, ApiError>) {
        for waiter in self.take_waiters() {
            let _ = waiter.send(result.clone());
        }
        std::mem::forget(self);
    }

    fn take_waiters(&self) -> Vec<Waiter> {
        let mut state = self
            .coordinator
            .state
            .lock()
            .expect("refresh state lock poisoned");
        match std::mem::replace(&mut *state, FlightState::Idle) {
            FlightState::InFlight(waiters) => waiters,
            FlightState::Idle => Vec::new(),
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Dropping the waiters' senders resolves their `rx.await` with
        // a channel error, which `run` maps to a network error.
        drop(self.take_waiters());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn tokens(n: usize) -> AuthTokens {
        AuthTokens {
            access_token: format!("access-{n}"),
            refresh_token: format!("refresh-{n}"),
        }
    }

    #[tokio::test]
    async fn single_caller_runs_op_once() {
        let coordinator = RefreshCoordinator::new();

        let result = coordinator.run(|| async { Ok(tokens(1)) }).await.unwrap();
        assert_eq!(result.access_token, "access-1");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_flight() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = Arc::clone(&coordinator);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                coordinator
                    .run(|| async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Hold the flight open long enough for every
                        // task to enqueue.
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(tokens(1))
                    })
                    .await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.access_token, "access-1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_fanned_out_to_all_waiters() {
        let coordinator = Arc::new(RefreshCoordinator::new());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let coordinator = Arc::clone(&coordinator);
            handles.push(tokio::spawn(async move {
                coordinator
                    .run(|| async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err(ApiError::SessionExpired("refresh token rejected".into()))
                    })
                    .await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(matches!(result, Err(ApiError::SessionExpired(_))));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn waiters_are_notified_in_fifo_order() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        // Leader: holds the flight open until the waiters are queued.
        let leader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .run(|| async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(tokens(1))
                    })
                    .await
            })
        };

        // Queue waiters one at a time so their queue positions are
        // deterministic.
        let mut waiters = Vec::new();
        for i in 0..4 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let coordinator = Arc::clone(&coordinator);
            let order = Arc::clone(&order);
            waiters.push(tokio::spawn(async move {
                let result = coordinator
                    .run(|| async { panic!("waiter must not run the op") })
                    .await;
                order.lock().unwrap().push(i);
                result
            }));
        }

        leader.await.unwrap().unwrap();
        for waiter in waiters {
            waiter.await.unwrap().unwrap();
        }

        // On a current-thread runtime, oneshot wakeups are processed in
        // send order, so the recorded order matches queue order.
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn second_flight_runs_after_first_settles() {
        let coordinator = RefreshCoordinator::new();
        let calls = AtomicUsize::new(0);

        let first = coordinator
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(tokens(1))
            })
            .await
            .unwrap();
        let second = coordinator
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(tokens(2))
            })
            .await
            .unwrap();

        assert_eq!(first.access_token, "access-1");
        assert_eq!(second.access_token, "access-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_leader_releases_waiters() {
        let coordinator = Arc::new(RefreshCoordinator::new());

        // Leader that never completes; abort it mid-flight.
        let leader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .run(|| async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(tokens(1))
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .run(|| async { panic!("waiter must not run the op") })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        leader.abort();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(ApiError::Network(_))));

        // The coordinator is usable again after the aborted flight.
        let retry = coordinator.run(|| async { Ok(tokens(2)) }).await.unwrap();
        assert_eq!(retry.access_token, "access-2");
    }
}
