//! A singly-linked intrusive FIFO queue.
//!
//! See the documentation for the [`Queue`] type for details.
use crate::{loom::cell::UnsafeCell, Linked};
use core::{fmt, marker::PhantomPinned, ptr::NonNull};

/// A singly-linked intrusive FIFO queue with a single owner.
///
/// `Queue` is not thread-safe on its own: it is meant to be owned by
/// whichever execution currently has exclusive access to it (for example,
/// the holder of a lock). Batches detached from an
/// [`AtomicQueue`](crate::AtomicQueue) are returned as a `Queue`, already in
/// first-in, first-out order.
///
/// Pushing and popping are both *O*(1).
pub struct Queue<T: Linked<Links<T>>> {
    head: Option<NonNull<T>>,
    tail: Option<NonNull<T>>,
}

/// Links to other nodes in a [`Queue`] or an [`AtomicQueue`].
///
/// In order to be part of either queue, a type must contain an instance of
/// this type, and must implement the [`Linked`] trait for `Links<Self>`.
///
/// [`AtomicQueue`]: crate::AtomicQueue
pub struct Links<T> {
    next: UnsafeCell<Option<NonNull<T>>>,

    /// Linked list links must always be `!Unpin`, so that they never receive
    /// LLVM `noalias` annotations.
    _unpin: PhantomPinned,
}

/// An iterator that pops every element off a [`Queue`], front to back.
///
/// Returned by [`Queue::drain`].
pub struct Drain<'queue, T: Linked<Links<T>>> {
    queue: &'queue mut Queue<T>,
}

// === impl Queue ===

impl<T> Queue<T>
where
    T: Linked<Links<T>>,
{
    /// Returns a new, empty `Queue`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
        }
    }

    /// Returns `true` if there are no elements in this queue.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.head.is_none(), self.tail.is_none());
        self.head.is_none()
    }

    /// Appends an element to the back of the queue.
    pub fn push_back(&mut self, element: T::Handle) {
        let ptr = T::into_ptr(element);
        test_trace!(?ptr, tail = ?self.tail, "Queue::push_back");
        unsafe {
            debug_assert!(Links::next(ptr).is_none(), "element is already linked");
            match self.tail.replace(ptr) {
                Some(tail) => Links::set_next(tail, Some(ptr)),
                None => self.head = Some(ptr),
            }
        }
    }

    /// Prepends an element to the front of the queue.
    pub fn push_front(&mut self, element: T::Handle) {
        let ptr = T::into_ptr(element);
        test_trace!(?ptr, head = ?self.head, "Queue::push_front");
        unsafe {
            Links::set_next(ptr, self.head);
        }
        if self.tail.is_none() {
            self.tail = Some(ptr);
        }
        self.head = Some(ptr);
    }

    /// Removes the element at the front of the queue, returning it, or
    /// `None` if the queue is empty.
    #[must_use]
    pub fn pop_front(&mut self) -> Option<T::Handle> {
        let head = self.head?;
        unsafe {
            let next = Links::take_next(head);
            test_trace!(?head, ?next, "Queue::pop_front");
            self.head = next;
            if next.is_none() {
                self.tail = None;
            }
            Some(T::from_ptr(head))
        }
    }

    /// Moves every element of `other` onto the back of this queue, leaving
    /// `other` empty.
    pub fn append(&mut self, other: &mut Self) {
        let Some(other_head) = other.head.take() else {
            return;
        };
        let other_tail = other.tail.take();
        match self.tail {
            Some(tail) => unsafe { Links::set_next(tail, Some(other_head)) },
            None => self.head = Some(other_head),
        }
        self.tail = other_tail;
    }

    /// Returns an iterator that removes every element from the queue, front
    /// to back.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { queue: self }
    }

    /// Builds a FIFO queue from a chain of nodes linked newest-first, as
    /// produced by pushing onto the head of an [`AtomicQueue`].
    ///
    /// # Safety
    ///
    /// Every node reachable from `newest` must be live, owned by the chain,
    /// and not linked into any other queue.
    ///
    /// [`AtomicQueue`]: crate::AtomicQueue
    pub(crate) unsafe fn from_newest_first(newest: Option<NonNull<T>>) -> Self {
        let mut queue = Self::new();
        let mut curr = newest;
        // the first node visited is the newest, so it becomes the tail.
        queue.tail = curr;
        while let Some(node) = curr {
            let next = Links::take_next(node);
            Links::set_next(node, queue.head);
            queue.head = Some(node);
            curr = next;
        }
        queue
    }
}

impl<T> Drop for Queue<T>
where
    T: Linked<Links<T>>,
{
    fn drop(&mut self) {
        while let Some(element) = self.pop_front() {
            drop(element);
        }
    }
}

impl<T> Default for Queue<T>
where
    T: Linked<Links<T>>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Queue<T>
where
    T: Linked<Links<T>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}

unsafe impl<T> Send for Queue<T> where T: Send + Linked<Links<T>> {}
unsafe impl<T> Sync for Queue<T> where T: Sync + Linked<Links<T>> {}

// === impl Drain ===

impl<T> Iterator for Drain<'_, T>
where
    T: Linked<Links<T>>,
{
    type Item = T::Handle;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop_front()
    }
}

impl<T> fmt::Debug for Drain<'_, T>
where
    T: Linked<Links<T>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Drain").field(&self.queue).finish()
    }
}

// === impl Links ===

impl<T> Links<T> {
    loom_const_fn! {
        /// Returns new, unlinked links.
        #[must_use]
        pub fn new() -> Self {
            Self {
                next: UnsafeCell::new(None),
                _unpin: PhantomPinned,
            }
        }
    }

    /// Returns `true` if this node is currently linked to a successor.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.next.with(|next| unsafe { (*next).is_some() })
    }

    /// # Safety
    ///
    /// `node` must point to a live node.
    pub(crate) unsafe fn next(node: NonNull<T>) -> Option<NonNull<T>>
    where
        T: Linked<Self>,
    {
        T::links(node).as_ref().next.with(|next| *next)
    }

    /// # Safety
    ///
    /// `node` must point to a live node that the caller has exclusive access
    /// to.
    pub(crate) unsafe fn set_next(node: NonNull<T>, to: Option<NonNull<T>>)
    where
        T: Linked<Self>,
    {
        T::links(node).as_ref().next.with_mut(|next| *next = to);
    }

    /// # Safety
    ///
    /// `node` must point to a live node that the caller has exclusive access
    /// to.
    pub(crate) unsafe fn take_next(node: NonNull<T>) -> Option<NonNull<T>>
    where
        T: Linked<Self>,
    {
        T::links(node).as_ref().next.with_mut(|next| (*next).take())
    }
}

impl<T> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("next", &self.next.with(|next| unsafe { *next }))
            .finish()
    }
}

/// # Safety
///
/// Types containing [`Links`] may be `Send`: the pointers within the `Links`
/// may mutably alias another value, but the pointed-to value can only be
/// accessed through the queue that owns it.
unsafe impl<T: Send> Send for Links<T> {}

/// # Safety
///
/// Types containing [`Links`] may be `Sync`: the pointers within the `Links`
/// are only read or written through the queue that owns them.
unsafe impl<T: Sync> Sync for Links<T> {}
