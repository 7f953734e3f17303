//! Cooperative cancellation.
//!
//! Services poll a [`CancelChecker`] between participants and between
//! nodes. A cancelled request stops early and returns what it has
//! collected so far; callers discard it.

pub trait CancelChecker: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// A checker that never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelChecker for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A cancellation handle shared between a request and its issuer.
///
/// Wraps `tokio_util::sync::CancellationToken`, whose `cancel` and
/// `is_cancelled` work without a runtime.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: tokio_util::sync::CancellationToken,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of this token and of its children.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// A token cancelled with this one, but cancellable on its own.
    pub fn child_token(&self) -> Self {
        Self {
            inner: self.inner.child_token(),
        }
    }
}

impl CancelChecker for CancellationToken {
    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let issued = token.clone();
        assert!(!issued.is_cancelled());
        token.cancel();
        assert!(issued.is_cancelled());
        assert!(!NeverCancel.is_cancelled());
    }

    #[test]
    fn test_child_tokens_follow_their_parent() {
        let session = CancellationToken::new();
        let first = session.child_token();
        let second = session.child_token();

        first.cancel();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!session.is_cancelled());

        session.cancel();
        assert!(second.is_cancelled());
    }
}
