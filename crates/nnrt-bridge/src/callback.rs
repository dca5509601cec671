//! Callback bridge.
//!
//! A consumer callback and its token travel together as a [`Completion`].
//! While an operation is in flight the completion sits in a
//! [`CompletionSlot`] shared between the submitting call and the engine
//! callback. Whoever takes it out first owns it, so it is delivered exactly
//! once or handed back to the caller, never both.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use crate::error::{BridgeError, Result};

type Callback<T, R> = Box<dyn FnOnce(T, Result<R>) + Send + 'static>;

/// A consumer callback paired with its opaque token.
#[must_use = "a completion must be completed or turned back into its token"]
pub struct Completion<T, R> {
    operation: &'static str,
    callback: Callback<T, R>,
    token: T,
}

impl<T, R> Completion<T, R> {
    /// Pair `callback` with `token` for an operation named `operation`.
    pub fn new<F>(operation: &'static str, callback: F, token: T) -> Self
    where
        F: FnOnce(T, Result<R>) + Send + 'static,
    {
        Self {
            operation,
            callback: Box::new(callback),
            token,
        }
    }

    /// Name of the operation this completion belongs to.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Invoke the callback with the token and `outcome`.
    pub fn complete(self, outcome: Result<R>) {
        (self.callback)(self.token, outcome);
    }

    /// Discard the callback and return the token.
    pub fn into_token(self) -> T {
        self.token
    }
}

impl<T, R> fmt::Debug for Completion<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

struct SlotInner<T, R> {
    completion: Mutex<Option<Completion<T, R>>>,
}

impl<T, R> SlotInner<T, R> {
    fn take(&self) -> Option<Completion<T, R>> {
        self.completion
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

impl<T, R> Drop for SlotInner<T, R> {
    fn drop(&mut self) {
        let completion = self
            .completion
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(completion) = completion {
            let operation = completion.operation();
            error!(
                "Engine released the {} completion without firing it; delivering abandonment",
                operation
            );
            completion.complete(Err(BridgeError::Abandoned(operation)));
        }
    }
}

/// Shared in-flight marker holding a [`Completion`] until someone claims it.
///
/// If the last handle to a slot is dropped while it still holds its
/// completion, the callback fires with [`BridgeError::Abandoned`].
pub struct CompletionSlot<T, R> {
    inner: Arc<SlotInner<T, R>>,
}

impl<T, R> Clone for CompletionSlot<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R> CompletionSlot<T, R> {
    /// Arm a slot with `completion`.
    pub fn new(completion: Completion<T, R>) -> Self {
        Self {
            inner: Arc::new(SlotInner {
                completion: Mutex::new(Some(completion)),
            }),
        }
    }

    /// Take the completion if nobody has yet.
    pub fn take(&self) -> Option<Completion<T, R>> {
        self.inner.take()
    }

    /// Deliver `outcome` if the completion is still here. Returns whether it was.
    pub fn complete(&self, outcome: Result<R>) -> bool {
        match self.take() {
            Some(completion) => {
                debug!("Delivering {} completion, ok={}", completion.operation(), outcome.is_ok());
                completion.complete(outcome);
                true
            }
            None => false,
        }
    }

    /// Take the completion back and return its token without firing it.
    pub fn reclaim(&self) -> Option<T> {
        self.take().map(Completion::into_token)
    }

    /// Whether the completion is still waiting.
    pub fn is_armed(&self) -> bool {
        self.inner
            .completion
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

/// Counts an operation as pending until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl InFlightGuard {
    /// Increment `counter` for the lifetime of the guard.
    pub fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds an exclusive flag until dropped.
#[derive(Debug)]
pub struct ExclusiveGuard {
    flag: Arc<AtomicBool>,
}

impl ExclusiveGuard {
    /// Set `flag`, failing if it is already set.
    pub fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for ExclusiveGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn recording_slot() -> (CompletionSlot<u32, &'static str>, mpsc::Receiver<(u32, Result<&'static str>)>) {
        let (tx, rx) = mpsc::channel();
        let completion = Completion::new("test", move |token, outcome| tx.send((token, outcome)).unwrap(), 7);
        (CompletionSlot::new(completion), rx)
    }

    #[test]
    fn test_first_taker_wins() {
        let (slot, rx) = recording_slot();
        let engine_side = slot.clone();

        assert!(engine_side.complete(Ok("done")));
        assert!(!slot.complete(Ok("again")));
        assert_eq!(slot.reclaim(), None);

        assert_eq!(rx.try_recv().unwrap(), (7, Ok("done")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reclaim_returns_token_without_firing() {
        let (slot, rx) = recording_slot();
        let engine_side = slot.clone();

        assert_eq!(slot.reclaim(), Some(7));
        assert!(!engine_side.complete(Ok("late")));
        drop(engine_side);
        drop(slot);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_slot_delivers_abandonment() {
        let (slot, rx) = recording_slot();
        let engine_side = slot.clone();
        drop(slot);
        assert!(rx.try_recv().is_err());

        drop(engine_side);
        assert_eq!(rx.try_recv().unwrap(), (7, Err(BridgeError::Abandoned("test"))));
    }

    #[test]
    fn test_guards() {
        let counter = Arc::new(AtomicUsize::new(0));
        let a = InFlightGuard::acquire(&counter);
        let b = InFlightGuard::acquire(&counter);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        drop(a);
        drop(b);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let flag = Arc::new(AtomicBool::new(false));
        let held = ExclusiveGuard::try_acquire(&flag);
        assert!(held.is_some());
        assert!(ExclusiveGuard::try_acquire(&flag).is_none());
        drop(held);
        assert!(ExclusiveGuard::try_acquire(&flag).is_some());
    }
}
