//! An asynchronous [mutual exclusion lock].
//!
//! See the documentation on the [`AsyncMutex`] type for details.
//!
//! [mutual exclusion lock]: https://en.wikipedia.org/wiki/Mutual_exclusion
use crate::{
    loom::cell::UnsafeCell,
    util::fmt,
    Connect, OperationState, SetValue, Sender,
};
use core::{convert::Infallible, pin::Pin, ptr::NonNull};
use pin_project::pin_project;
use rhizome::{queue::Links, AtomicQueue, Linked, Queue};

#[cfg(test)]
mod tests;

/// An asynchronous [mutual exclusion lock][mutex].
///
/// Unlike a [blocking mutex], waiting for an `AsyncMutex` never blocks a
/// thread. [`async_lock`] returns a [sender] that completes with `()` once
/// the lock has been acquired; until then, the waiting operation is parked
/// in the mutex's queue and nothing runs on its behalf. When the holder
/// calls [`unlock`], the lock is handed directly to the next waiter, whose
/// receiver is completed on the unlocking thread.
///
/// This is a *raw* mutex: it does not own the data it protects, and there
/// is no guard. Whoever acquires the lock (through [`try_lock`] or
/// [`async_lock`]) is responsible for calling [`unlock`] exactly once.
///
/// # Implementation
///
/// The mutex's state is a lock-free [`AtomicQueue`] of waiters. An
/// *inactive* queue means the mutex is unlocked; an active queue means it is
/// locked, and any waiters in it were pushed by operations that found it
/// locked. The holder also owns a private FIFO buffer of waiters that have
/// already been detached from the atomic queue.
///
/// - Locking is a single atomic operation: either mark the queue active
///   (acquiring the lock) or push a waiter onto it.
/// - Unlocking first pops the private buffer. If it is empty, the holder
///   either marks the queue inactive (releasing the lock) or, if waiters
///   arrived, detaches all of them at once into the buffer and pops the
///   oldest.
///
/// Waiters are embedded in the operation states returned by connecting
/// [`async_lock`], so locking never allocates.
///
/// # Fairness
///
/// Waiters acquire the lock in the order in which they were enqueued. When
/// several operations race to enqueue themselves, the order in which their
/// atomic pushes succeed decides their place in line. A waiter that
/// arrives while older waiters are still in the holder's private buffer is
/// served after all of them.
///
/// [mutex]: https://en.wikipedia.org/wiki/Mutual_exclusion
/// [blocking mutex]: https://doc.rust-lang.org/stable/std/sync/struct.Mutex.html
/// [sender]: crate::Sender
/// [`async_lock`]: Self::async_lock
/// [`try_lock`]: Self::try_lock
/// [`unlock`]: Self::unlock
pub struct AsyncMutex {
    /// Waiters that found the mutex locked, newest first.
    ///
    /// Inactive when the mutex is unlocked.
    queue: AtomicQueue<Waiter>,

    /// Waiters already detached from `queue`, oldest first.
    ///
    /// Only the current holder may touch this.
    pending: UnsafeCell<Queue<Waiter>>,
}

/// A sender that completes once an [`AsyncMutex`] has been locked.
///
/// Returned by [`AsyncMutex::async_lock`].
#[derive(Clone, Copy)]
#[must_use = "senders do nothing unless connected and started"]
pub struct Lock<'mutex> {
    mutex: &'mutex AsyncMutex,
}

/// The operation state of a [`Lock`] sender.
///
/// Once started, this must not be dropped until its receiver has been
/// completed; while it waits, the mutex holds a pointer to it.
#[pin_project]
#[repr(C)]
pub struct LockOperation<'mutex, R> {
    /// The node linked into the mutex's queues.
    ///
    /// This must be the first field: the mutex resumes an operation through
    /// a pointer to its waiter.
    #[pin]
    waiter: Waiter,

    receiver: UnsafeCell<Option<R>>,
    mutex: &'mutex AsyncMutex,
    started: bool,
}

/// A queued lock operation.
#[repr(C)]
struct Waiter {
    links: Links<Waiter>,

    /// Completes the operation this waiter is embedded in, handing it the
    /// lock.
    resume: unsafe fn(NonNull<Waiter>),
}

// === impl AsyncMutex ===

impl AsyncMutex {
    loom_const_fn! {
        /// Returns a new, unlocked `AsyncMutex`.
        #[must_use]
        pub fn new() -> Self {
            Self {
                queue: AtomicQueue::new(),
                pending: UnsafeCell::new(Queue::new()),
            }
        }
    }

    /// Attempts to acquire the lock without waiting.
    ///
    /// Returns `true` if the mutex was unlocked and is now held by the
    /// caller, who must eventually call [`unlock`](Self::unlock). Returns
    /// `false`, without changing anything, if the mutex is already locked.
    #[must_use = "if the lock was acquired, it must be unlocked"]
    pub fn try_lock(&self) -> bool {
        let locked = self.queue.try_mark_active();
        trace!(mutex = ?fmt::ptr(self), locked, "AsyncMutex::try_lock");
        locked
    }

    /// Returns a sender that completes with `()` once the lock has been
    /// acquired.
    ///
    /// If the mutex is unlocked when the operation starts, the lock is
    /// acquired and the receiver is completed synchronously, before
    /// [`start`](OperationState::start) returns. Otherwise, the operation
    /// waits in line and is completed by the [`unlock`](Self::unlock) call
    /// that hands it the lock, on whichever thread made that call.
    ///
    /// The operation never completes with an error or the done signal.
    /// Because it may be completed on another thread, it can only be
    /// connected to receivers that are [`Send`].
    pub fn async_lock(&self) -> Lock<'_> {
        Lock { mutex: self }
    }

    /// Releases the lock, handing it to the oldest waiter if there is one.
    ///
    /// If a waiter is handed the lock, its receiver is completed before this
    /// method returns, on the calling thread. The mutex does not become
    /// unlocked in between.
    ///
    /// # Safety
    ///
    /// The caller must currently hold the lock, acquired either through
    /// [`try_lock`](Self::try_lock) or by the completion of an
    /// [`async_lock`](Self::async_lock) operation.
    pub unsafe fn unlock(&self) {
        debug_assert!(
            !self.queue.is_inactive(),
            "unlocked an `AsyncMutex` that was not locked"
        );

        let next = self.pending.with_mut(|pending| {
            // Safety: only the holder touches `pending`, and the caller
            // promises to be the holder.
            let pending = unsafe { &mut *pending };
            if pending.is_empty() {
                let mut arrived = self.queue.try_mark_inactive_or_dequeue_all();
                if arrived.is_empty() {
                    return None;
                }
                pending.append(&mut arrived);
            }
            pending.pop_front()
        });

        match next {
            Some(waiter) => {
                trace!(mutex = ?fmt::ptr(self), ?waiter, "AsyncMutex::unlock -> handing off");
                // Safety: a waiter in the queue belongs to a started, pinned
                // operation that is not completed until it is resumed.
                Waiter::resume(waiter);
            }
            None => {
                trace!(mutex = ?fmt::ptr(self), "AsyncMutex::unlock -> unlocked");
            }
        }
    }

    /// Returns `true` if the mutex is currently locked.
    ///
    /// This is a snapshot for diagnostics, and may be stale by the time it
    /// is returned.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        !self.queue.is_inactive()
    }
}

impl Default for AsyncMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncMutex {
    fn drop(&mut self) {
        debug_assert!(
            !self.is_locked(),
            "dropped an `AsyncMutex` while it was locked"
        );
    }
}

impl fmt::Debug for AsyncMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMutex")
            .field("locked", &self.is_locked())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

// Safety: `pending` is only accessed by the lock holder, and waiters are
// handed between threads through the atomic queue.
unsafe impl Sync for AsyncMutex {}

// === impl Lock ===

impl Sender for Lock<'_> {
    type Output = ();
    type Error = Infallible;
}

impl<'mutex, R> Connect<R> for Lock<'mutex>
where
    R: SetValue<()> + Send,
{
    type Operation = LockOperation<'mutex, R>;

    fn connect(self, receiver: R) -> Self::Operation {
        LockOperation {
            waiter: Waiter {
                links: Links::new(),
                resume: LockOperation::<'mutex, R>::resume,
            },
            receiver: UnsafeCell::new(Some(receiver)),
            mutex: self.mutex,
            started: false,
        }
    }
}

impl fmt::Debug for Lock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("mutex", &format_args!("{:p}", self.mutex))
            .finish()
    }
}

// === impl LockOperation ===

impl<R> LockOperation<'_, R>
where
    R: SetValue<()>,
{
    /// Completes the operation whose waiter is `waiter`.
    ///
    /// # Safety
    ///
    /// `waiter` must point to the `waiter` field of a live, started
    /// `LockOperation<'_, R>` that has not yet been completed.
    unsafe fn resume(waiter: NonNull<Waiter>) {
        // Safety: `waiter` is the first field of a `repr(C)` struct.
        let this = waiter.cast::<Self>();
        let receiver = (*this.as_ptr()).receiver.with_mut(|receiver| (*receiver).take());
        Self::complete(receiver)
    }

    fn complete(receiver: Option<R>) {
        match receiver {
            Some(receiver) => receiver.set_value(()),
            None => unsafe { unreachable_unchecked!("a lock operation was completed twice") },
        }
    }
}

impl<R> OperationState for LockOperation<'_, R>
where
    R: SetValue<()>,
{
    fn start(self: Pin<&mut Self>) {
        let this = self.project();
        debug_assert!(!*this.started, "lock operation started twice");
        *this.started = true;

        let mutex = *this.mutex;
        // Safety: the operation is pinned, and stays put until it is resumed.
        let waiter = unsafe { NonNull::from(this.waiter.get_unchecked_mut()) };
        match mutex.queue.enqueue_or_mark_active(waiter) {
            Some(_) => {
                trace!(mutex = ?fmt::ptr(mutex), "AsyncMutex::async_lock -> locked");
                let receiver = this.receiver.with_mut(|receiver| unsafe { (*receiver).take() });
                Self::complete(receiver)
            }
            // once enqueued, the operation belongs to whoever resumes it, so
            // nothing here may touch `this` again.
            None => {
                trace!(mutex = ?fmt::ptr(mutex), ?waiter, "AsyncMutex::async_lock -> waiting");
            }
        }
    }
}

impl<R> fmt::Debug for LockOperation<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockOperation")
            .field("mutex", &format_args!("{:p}", self.mutex))
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

// === impl Waiter ===

impl Waiter {
    /// # Safety
    ///
    /// `this` must point to a waiter embedded in a live, started operation
    /// that has not yet been completed.
    unsafe fn resume(this: NonNull<Waiter>) {
        let resume = (*this.as_ptr()).resume;
        resume(this)
    }
}

unsafe impl Linked<Links<Waiter>> for Waiter {
    type Handle = NonNull<Waiter>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        r
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        ptr
    }

    unsafe fn links(target: NonNull<Self>) -> NonNull<Links<Waiter>> {
        // Safety: using `ptr::addr_of!` avoids creating a temporary
        // reference, which stacked borrows dislikes.
        let links = core::ptr::addr_of_mut!((*target.as_ptr()).links);
        NonNull::new_unchecked(links)
    }
}
