#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(docsrs, deny(missing_docs))]
#![cfg_attr(not(test), no_std)]
//! Intrusive queues.
//!
//! Nodes in these queues are owned by their callers; a queue only stores
//! pointers to them. Two queues are provided:
//!
//! - [`Queue`]: a singly-linked FIFO queue, for use by a single owner.
//! - [`AtomicQueue`]: a lock-free queue that any number of producers may push
//!   onto and a single consumer detaches from in batches. The queue also
//!   tracks whether its consumer is *active*, which makes it usable as the
//!   state word of a lock: "inactive" means nobody is holding the queue.
//!
//! Both queues share the same [`queue::Links`] type, so a node can move from
//! an [`AtomicQueue`] batch into a [`Queue`] without being relinked.
#[macro_use]
pub(crate) mod util;

pub mod atomic_queue;
pub mod queue;

#[doc(inline)]
pub use atomic_queue::AtomicQueue;
#[doc(inline)]
pub use queue::Queue;

pub(crate) mod loom;

use core::ptr::NonNull;

/// Trait implemented by types which can be members of an intrusive queue.
///
/// A node type embeds a [`queue::Links`] value, and tells the queues how to
/// find it and how to convert between owning handles and raw pointers.
///
/// # Safety
///
/// Implementations must guarantee that:
///
/// - a node is neither moved nor deallocated while it is linked into a queue;
/// - the implementing type is `!Unpin`;
/// - [`Linked::links`] returns a pointer into the node it was given.
///
/// Breaking any of these corrupts the queue.
pub unsafe trait Linked<L> {
    /// The handle owning a node.
    ///
    /// Dropping a handle drops the node it refers to. Non-owning queues use
    /// [`NonNull<Self>`] as their handle, in which case dropping does
    /// nothing.
    type Handle;

    /// Converts an owning handle into a raw pointer, leaking it.
    fn into_ptr(r: Self::Handle) -> NonNull<Self>;

    /// Converts a raw pointer back into an owning handle.
    ///
    /// # Safety
    ///
    /// `ptr` must have been produced by [`Linked::into_ptr`] and must not
    /// already have been turned back into a handle.
    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle;

    /// Returns the links of the node pointed to by `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live node.
    unsafe fn links(ptr: NonNull<Self>) -> NonNull<L>;
}

#[cfg(test)]
pub(crate) mod test_util;
