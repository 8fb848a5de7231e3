//! Cooperative cancellation via a shared atomic flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

/// Cloneable stop flag checked by orchestrators between items.
///
/// Cancelling never interrupts a batch operation already in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token shared by the whole process; signal handlers cancel this one.
    pub fn process() -> &'static CancelToken {
        static TOKEN: LazyLock<CancelToken> = LazyLock::new(CancelToken::new);
        &TOKEN
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Set the flag, returning whether it was already set.
    pub fn cancel_again(&self) -> bool {
        self.flag.swap(true, Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn cancel_again_reports_previous() {
        let token = CancelToken::new();
        assert!(!token.cancel_again());
        assert!(token.cancel_again());
    }
}
