//! Blocking on a sender from synchronous code.
use crate::{
    error::WaitError, query::GetScheduler, scheduler::InlineScheduler, Connect, OperationState,
    Query, SetDone, SetError, SetValue, Sender,
};
use core::{fmt, pin::pin};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Runs `sender` to completion, blocking the current thread until it
/// completes.
///
/// Returns the sender's value, [`WaitError::Failed`] with its error, or
/// [`WaitError::Cancelled`] if it completed with the done signal.
///
/// The operation is connected to a receiver whose scheduler is
/// [`InlineScheduler`], so forwarding senders such as
/// [`schedule`](crate::schedule) complete on whichever thread starts them.
/// The operation may also be completed by another thread (for example, by
/// an [`AsyncMutex`](crate::AsyncMutex) holder handing over the lock); the
/// calling thread sleeps until that happens.
///
/// # Examples
///
/// ```
/// use hyphae::{just, just_error, sync_wait, WaitError};
///
/// assert_eq!(sync_wait(just(1)), Ok(1));
/// assert_eq!(sync_wait(just_error("oops")), Err(WaitError::Failed("oops")));
/// ```
pub fn sync_wait<S>(sender: S) -> Result<<S as Sender>::Output, WaitError<<S as Sender>::Error>>
where
    S: Sender + Connect<SyncWaitReceiver<<S as Sender>::Output, <S as Sender>::Error>>,
{
    let slot = Arc::new(Slot {
        result: Mutex::new(None),
        completed: Condvar::new(),
    });
    let receiver = SyncWaitReceiver { slot: slot.clone() };

    let mut operation = pin!(sender.connect(receiver));
    operation.as_mut().start();

    slot.wait()
}

/// The receiver [`sync_wait`] connects its sender to.
pub struct SyncWaitReceiver<T, E> {
    slot: Arc<Slot<T, E>>,
}

struct Slot<T, E> {
    result: Mutex<Option<Result<T, WaitError<E>>>>,
    completed: Condvar,
}

// === impl Slot ===

impl<T, E> Slot<T, E> {
    fn complete(&self, result: Result<T, WaitError<E>>) {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(slot.is_none(), "sync_wait receiver completed twice");
        *slot = Some(result);
        drop(slot);
        self.completed.notify_one();
    }

    fn wait(&self) -> Result<T, WaitError<E>> {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(result) = slot.take() {
                return result;
            }
            slot = self
                .completed
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

// === impl SyncWaitReceiver ===

impl<T, E> SetValue<T> for SyncWaitReceiver<T, E> {
    fn set_value(self, value: T) {
        self.slot.complete(Ok(value))
    }
}

impl<T, E> SetError<E> for SyncWaitReceiver<T, E> {
    fn set_error(self, error: E) {
        self.slot.complete(Err(WaitError::Failed(error)))
    }
}

impl<T, E> SetDone for SyncWaitReceiver<T, E> {
    fn set_done(self) {
        self.slot.complete(Err(WaitError::Cancelled))
    }
}

impl<T, E> Query<GetScheduler> for SyncWaitReceiver<T, E> {
    type Output = InlineScheduler;

    #[inline]
    fn query(&self, _: GetScheduler) -> InlineScheduler {
        InlineScheduler
    }
}

impl<T, E> fmt::Debug for SyncWaitReceiver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncWaitReceiver").finish_non_exhaustive()
    }
}
