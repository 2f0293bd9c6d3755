use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Lifecycle of the engine as seen by the orchestrator's readiness probe.
///
/// Moves `Untouched → Initializing → Ready` and never back. `Failed` is
/// terminal as well and is only entered through
/// [`ReadinessTracker::mark_failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadinessState {
    /// No readiness check has happened yet.
    Untouched = 0,
    /// Warming up; probes report unavailable.
    Initializing = 1,
    /// Accepting work.
    Ready = 2,
    /// Initialization failed; the orchestrator should terminate the engine.
    Failed = 3,
}

impl ReadinessState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Untouched,
            1 => Self::Initializing,
            2 => Self::Ready,
            _ => Self::Failed,
        }
    }
}

/// Shared readiness state with atomic, one-way transitions.
///
/// The first [`check_and_advance`](Self::check_and_advance) starts the
/// warm-up; exactly one timer is spawned even under concurrent first checks.
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    state: Arc<AtomicU8>,
    warmup: Duration,
}

impl ReadinessTracker {
    pub fn new(warmup: Duration) -> Self {
        Self {
            state: Arc::new(AtomicU8::new(ReadinessState::Untouched as u8)),
            warmup,
        }
    }

    pub fn current_state(&self) -> ReadinessState {
        ReadinessState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Start the warm-up on first use and return the resulting state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn check_and_advance(&self) -> ReadinessState {
        if self.transition(ReadinessState::Untouched, ReadinessState::Initializing) {
            log::info!("Engine initializing, ready in {:?}", self.warmup);

            let tracker = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(tracker.warmup).await;
                if tracker.transition(ReadinessState::Initializing, ReadinessState::Ready) {
                    log::info!("Engine ready");
                }
            });
        }
        self.current_state()
    }

    /// Record a fatal initialization failure. Has no effect once `Ready`.
    ///
    /// Returns `true` if the state changed.
    pub fn mark_failed(&self) -> bool {
        let result = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                match ReadinessState::from_u8(current) {
                    ReadinessState::Untouched | ReadinessState::Initializing => {
                        Some(ReadinessState::Failed as u8)
                    }
                    ReadinessState::Ready | ReadinessState::Failed => None,
                }
            });
        if result.is_ok() {
            log::error!("Engine initialization failed");
        }
        result.is_ok()
    }

    fn transition(&self, from: ReadinessState, to: ReadinessState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
