// src/pipeline/gate.rs
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

struct GateState<T> {
    signals: usize,
    value: Option<T>,
}

/// Lets one thread block until another hands it a value.
///
/// The counter makes a signal that arrives before [`wait`](Self::wait) stick,
/// so there is no lost wakeup. One value per gate.
pub struct CompletionGate<T> {
    state: Mutex<GateState<T>>,
    ready: Condvar,
}

impl<T> Default for CompletionGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompletionGate<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                signals: 0,
                value: None,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` and wakes the waiter.
    pub fn signal(&self, value: T) {
        let mut state = self.lock();
        state.value = Some(value);
        state.signals += 1;
        self.ready.notify_all();
    }

    /// Blocks until the gate was signalled and takes the value.
    ///
    /// Returns `None` if the value was already taken.
    pub fn wait(&self) -> Option<T> {
        let mut state = self.lock();
        while state.signals == 0 {
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.value.take()
    }

    pub fn is_signalled(&self) -> bool {
        self.lock().signals > 0
    }
}
