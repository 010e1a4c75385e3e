//! A lock-free intrusive queue with producer-activity marking.
//!
//! See the documentation for the [`AtomicQueue`] type for details.
use crate::{
    loom::atomic::{AtomicPtr, Ordering::*},
    queue::{Links, Queue},
    Linked,
};
use core::{fmt, ptr};

/// A lock-free, multi-producer, single-consumer intrusive queue that also
/// records whether its consumer is *active*.
///
/// Producers push onto the head of a singly-linked list with a
/// compare-and-swap loop, so the list is stored newest-first. The consumer
/// never pops individual elements; instead, it detaches the whole list at
/// once and receives it as a [`Queue`], reversed into the order in which
/// the elements were pushed.
///
/// In addition to "empty" and "non-empty", the head pointer has a third
/// state, **inactive**, meaning that no consumer is currently processing
/// the queue. Producers can atomically either enqueue an element *or*, if
/// the queue is inactive, mark it active and become its consumer. Together
/// with [`try_mark_inactive_or_dequeue_all`], this is exactly the state word
/// of an asynchronous lock:
///
/// | queue state        | lock state                      |
/// |--------------------|---------------------------------|
/// | inactive           | unlocked                        |
/// | active, empty      | locked, no waiters              |
/// | active, non-empty  | locked, with waiters            |
///
/// [`try_mark_inactive_or_dequeue_all`]: AtomicQueue::try_mark_inactive_or_dequeue_all
pub struct AtomicQueue<T: Linked<Links<T>>> {
    head: AtomicPtr<T>,
}

/// The head value representing an inactive queue.
///
/// A node contains its [`Links`], which are pointer-aligned, so no node can
/// live at address 1.
#[inline(always)]
fn inactive<T>() -> *mut T {
    1usize as *mut T
}

impl<T> AtomicQueue<T>
where
    T: Linked<Links<T>>,
{
    loom_const_fn! {
        /// Returns a new, empty queue in the **inactive** state.
        #[must_use]
        pub fn new() -> Self {
            Self {
                head: AtomicPtr::new(1usize as *mut T),
            }
        }
    }

    loom_const_fn! {
        /// Returns a new, empty queue in the **active** state.
        #[must_use]
        pub fn new_active() -> Self {
            Self {
                head: AtomicPtr::new(ptr::null_mut()),
            }
        }
    }

    /// Returns `true` if the queue is currently inactive.
    ///
    /// This is a snapshot, and may be stale as soon as it is returned.
    #[inline]
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        self.head.load(Relaxed) == inactive()
    }

    /// Attempts to transition the queue from inactive to active (and
    /// empty).
    ///
    /// Returns `true` if this call activated the queue. Returns `false`,
    /// without changing anything, if the queue was already active.
    pub fn try_mark_active(&self) -> bool {
        let activated = self
            .head
            .compare_exchange(inactive(), ptr::null_mut(), Acquire, Relaxed)
            .is_ok();
        test_trace!(activated, "AtomicQueue::try_mark_active");
        activated
    }

    /// Enqueues `element` if the queue is active, or marks the queue active
    /// if it is inactive.
    ///
    /// Returns `None` if `element` was enqueued. If the queue was inactive,
    /// it is now active, `element` was **not** enqueued, and it is handed
    /// back as `Some(element)`; the caller is now the queue's consumer.
    #[must_use = "if the queue was activated, the element is returned rather than enqueued"]
    pub fn enqueue_or_mark_active(&self, element: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(element);
        let mut head = self.head.load(Relaxed);
        loop {
            if head == inactive() {
                match self
                    .head
                    .compare_exchange(head, ptr::null_mut(), Acquire, Relaxed)
                {
                    Ok(_) => {
                        test_trace!(?ptr, "AtomicQueue::enqueue_or_mark_active -> activated");
                        // Safety: `ptr` came from `into_ptr` above and was never
                        // published.
                        return Some(unsafe { T::from_ptr(ptr) });
                    }
                    Err(actual) => {
                        head = actual;
                        continue;
                    }
                }
            }

            unsafe {
                // Safety: the node is not yet visible to any other thread.
                Links::set_next(ptr, ptr::NonNull::new(head));
            }
            match self
                .head
                .compare_exchange_weak(head, ptr.as_ptr(), AcqRel, Relaxed)
            {
                Ok(_) => {
                    test_trace!(?ptr, ?head, "AtomicQueue::enqueue_or_mark_active -> enqueued");
                    return None;
                }
                Err(actual) => head = actual,
            }
        }
    }

    /// Enqueues `element` unconditionally.
    ///
    /// Returns `true` if the queue was inactive before the element was
    /// pushed, meaning that no consumer was processing it and one should be
    /// notified. The queue is no longer inactive after this call.
    pub fn enqueue(&self, element: T::Handle) -> bool {
        let ptr = T::into_ptr(element);
        let mut head = self.head.load(Relaxed);
        loop {
            let was_inactive = head == inactive();
            let next = if was_inactive {
                None
            } else {
                ptr::NonNull::new(head)
            };
            unsafe {
                // Safety: the node is not yet visible to any other thread.
                Links::set_next(ptr, next);
            }
            match self
                .head
                .compare_exchange_weak(head, ptr.as_ptr(), AcqRel, Relaxed)
            {
                Ok(_) => {
                    test_trace!(?ptr, was_inactive, "AtomicQueue::enqueue");
                    return was_inactive;
                }
                Err(actual) => head = actual,
            }
        }
    }

    /// Attempts to transition the queue from active and empty to inactive.
    ///
    /// Returns `false` if the queue has elements in it, or was already
    /// inactive.
    pub fn try_mark_inactive(&self) -> bool {
        let deactivated = self
            .head
            .compare_exchange(ptr::null_mut(), inactive(), Release, Relaxed)
            .is_ok();
        test_trace!(deactivated, "AtomicQueue::try_mark_inactive");
        deactivated
    }

    /// Detaches every element currently in the queue, leaving it active and
    /// empty.
    ///
    /// The returned [`Queue`] is in the order the elements were enqueued. If
    /// the queue is empty or inactive, an empty [`Queue`] is returned and the
    /// queue's state is unchanged.
    ///
    /// Only the queue's consumer may call this method.
    #[must_use]
    pub fn dequeue_all(&self) -> Queue<T> {
        let head = self.head.load(Relaxed);
        if head.is_null() || head == inactive() {
            return Queue::new();
        }
        // only the consumer removes elements, so the head cannot become null
        // or inactive between the load and the swap.
        let head = self.head.swap(ptr::null_mut(), Acquire);
        test_trace!(?head, "AtomicQueue::dequeue_all");
        unsafe {
            // Safety: every node reachable from `head` was published by a
            // successful push and is now owned exclusively by the consumer.
            Queue::from_newest_first(ptr::NonNull::new(head))
        }
    }

    /// Marks the queue inactive if it is empty, or detaches every element in
    /// it otherwise.
    ///
    /// Returns an empty [`Queue`] if the queue was marked inactive, or the
    /// detached elements, in the order they were enqueued. The queue stays
    /// active in the second case.
    ///
    /// Only the queue's consumer may call this method, and the queue must be
    /// active.
    #[must_use]
    pub fn try_mark_inactive_or_dequeue_all(&self) -> Queue<T> {
        if self.try_mark_inactive() {
            return Queue::new();
        }

        let head = self.head.swap(ptr::null_mut(), Acquire);
        test_trace!(?head, "AtomicQueue::try_mark_inactive_or_dequeue_all");
        debug_assert_ne!(
            head,
            inactive(),
            "try_mark_inactive_or_dequeue_all called on an inactive queue"
        );
        unsafe {
            // Safety: `try_mark_inactive` failed, so the queue is active and
            // non-empty; every reachable node is now owned by the consumer.
            Queue::from_newest_first(ptr::NonNull::new(head))
        }
    }
}

impl<T> Drop for AtomicQueue<T>
where
    T: Linked<Links<T>>,
{
    fn drop(&mut self) {
        let head = self.head.load(Relaxed);
        if head.is_null() || head == inactive() {
            return;
        }
        // Safety: we have `&mut self`, so no producers can be pushing.
        drop(unsafe { Queue::from_newest_first(ptr::NonNull::new(head)) });
    }
}

impl<T> Default for AtomicQueue<T>
where
    T: Linked<Links<T>>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AtomicQueue<T>
where
    T: Linked<Links<T>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.head.load(Relaxed);
        let mut s = f.debug_struct("AtomicQueue");
        if head == inactive() {
            s.field("head", &format_args!("<inactive>"));
        } else {
            s.field("head", &head);
        }
        s.finish()
    }
}

unsafe impl<T> Send for AtomicQueue<T> where T: Send + Linked<Links<T>> {}
unsafe impl<T> Sync for AtomicQueue<T> where T: Send + Linked<Links<T>> {}
