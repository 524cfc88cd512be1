//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag checked by the search between rounds.
///
/// Raising the flag never interrupts a round in progress: the search finishes
/// the current round's backpropagation and returns at the next boundary. The
/// flag stays raised until `reset`.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that searches using this token stop.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Lower the flag so the token can be used for another search.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_shared_and_sticky() {
        let token = StopToken::new();
        let other = token.clone();
        assert!(!token.is_stopped());

        other.stop();
        assert!(token.is_stopped());
        assert!(token.is_stopped());

        token.reset();
        assert!(!other.is_stopped());
    }
}
