//! Cooperative cancellation, consulted once per dispatched instruction.

use crate::error::DasmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    Canceled,
    DeadlineExceeded,
}

impl From<CancelReason> for DasmError {
    fn from(reason: CancelReason) -> DasmError {
        match reason {
            CancelReason::Canceled => DasmError::Canceled,
            CancelReason::DeadlineExceeded => DasmError::DeadlineExceeded,
        }
    }
}

/// A cancellation/deadline source. The VM calls `check()` between decode
/// and execute of every instruction; implementors are expected to be
/// cheap (an `AtomicBool` load, a clock comparison) since this runs on
/// the hot path.
pub trait Context: Send + Sync {
    fn check(&self) -> Option<CancelReason>;
}

/// A context that never fires; the default when no context is set.
pub struct NeverCancel;

impl Context for NeverCancel {
    fn check(&self) -> Option<CancelReason> {
        None
    }
}

/// A context that has already fired, for tests and for callers that want
/// to cancel a VM before its first step.
pub struct AlreadyCanceled(pub CancelReason);

impl Context for AlreadyCanceled {
    fn check(&self) -> Option<CancelReason> {
        Some(self.0)
    }
}
